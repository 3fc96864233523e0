//! Result aggregation
//!
//! The service returns one raw value per agent, keyed by agent name, in whatever
//! order its map serialises. Aggregation puts them into the fixed display order:
//!
//! ```text
//! defesa → acusacao → pesquisa → decisoes → web → relator
//! ```
//!
//! Each value is classified exactly once into an [`AgentResult`]; keys outside the
//! known list are dropped.

pub mod formatter;
pub mod types;

pub use formatter::{RenderedBody, RenderedCard, RenderedField, RenderedValue};
pub use types::{AgentDescriptor, AgentReport, AgentResult, FieldValue, KNOWN_AGENTS};

use serde_json::{Map, Value};

/// Order and classify a raw result map
pub fn aggregate(raw: Option<&Map<String, Value>>) -> Vec<AgentReport> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    let reports: Vec<AgentReport> = KNOWN_AGENTS
        .iter()
        .filter_map(|(key, name, _)| {
            let value = raw.get(*key)?;
            if is_absent(value) {
                return None;
            }
            Some(AgentReport {
                key: key.to_string(),
                display_name: name.to_string(),
                result: AgentResult::classify(value),
            })
        })
        .collect();

    let skipped: Vec<&String> = raw
        .keys()
        .filter(|key| types::agent_priority(key).is_none())
        .collect();
    if !skipped.is_empty() {
        log::debug!("[RESULTS] Ignoring results for unknown agents: {:?}", skipped);
    }

    log::debug!("[RESULTS] Aggregated {} of {} agent results", reports.len(), raw.len());
    reports
}

/// Null and empty-string results carry nothing to show
fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Order a catalog by display priority; unknown agents go last, sorted by key
pub fn order_catalog(mut agents: Vec<AgentDescriptor>) -> Vec<AgentDescriptor> {
    agents.sort_by(|a, b| {
        let pa = types::agent_priority(&a.key).unwrap_or(usize::MAX);
        let pb = types::agent_priority(&b.key).unwrap_or(usize::MAX);
        pa.cmp(&pb).then_with(|| a.key.cmp(&b.key))
    });
    agents
}

//! Agent result types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix the service puts on an agent's output when that agent failed
pub const ERROR_SENTINEL: &str = "Erro:";

/// Static information about one analysis agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    #[serde(default)]
    pub key: String,
    pub name: String,
    pub description: String,
}

/// Known agents, in display priority order
pub const KNOWN_AGENTS: [(&str, &str, &str); 6] = [
    (
        "defesa",
        "🛡️ Agente Defesa",
        "Analisa argumentos defensivos, teses e alegações da defesa",
    ),
    (
        "acusacao",
        "⚖️ Agente Acusação",
        "Analisa denúncia, alegações do MP e elementos acusatórios",
    ),
    (
        "pesquisa",
        "📚 Agente Pesquisa Jurídica",
        "Extrai legislação, jurisprudências e citações legais",
    ),
    (
        "decisoes",
        "⚖️ Agente Decisões Judiciais",
        "Analisa sentenças, decisões e fundamentação do juiz",
    ),
    (
        "web",
        "🌐 Agente Pesquisa Web",
        "Pesquisa jurisprudências recentes, doutrina e teoria jurídica atual na web",
    ),
    (
        "relator",
        "📋 Agente Relator Consolidado",
        "Consolida informações de todos os agentes em relatório único",
    ),
];

/// Position of an agent key in the priority order
pub fn agent_priority(key: &str) -> Option<usize> {
    KNOWN_AGENTS.iter().position(|(k, _, _)| *k == key)
}

/// Display name for an agent key; unknown keys are shown as-is
pub fn agent_display_name(key: &str) -> &str {
    KNOWN_AGENTS
        .iter()
        .find(|(k, _, _)| *k == key)
        .map(|(_, name, _)| *name)
        .unwrap_or(key)
}

/// The built-in catalog, used when the service catalog is unavailable
pub fn builtin_catalog() -> Vec<AgentDescriptor> {
    KNOWN_AGENTS
        .iter()
        .map(|(key, name, description)| AgentDescriptor {
            key: key.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        })
        .collect()
}

/// Value of one field inside a structured agent result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    Null,
    List(Vec<String>),
}

impl FieldValue {
    /// Convert a raw JSON value; numbers and nested records become text
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Number(n) => FieldValue::Text(n.to_string()),
            Value::Array(items) => FieldValue::List(items.iter().map(scalar_to_string).collect()),
            Value::Object(_) => FieldValue::Text(pretty_json(value)),
        }
    }

    /// Whether the field survives the inclusion filter.
    ///
    /// Empty strings and empty lists are dropped; null and booleans are kept.
    pub fn is_shown(&self) -> bool {
        match self {
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::List(items) => !items.is_empty(),
            FieldValue::Bool(_) | FieldValue::Null => true,
        }
    }
}

/// Output of one analysis agent, classified once
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AgentResult {
    Error(String),
    Structured(Vec<(String, FieldValue)>),
    PlainText(String),
}

impl AgentResult {
    /// Classify a raw value from the service.
    ///
    /// Fields of structured results are filtered here, so downstream code never
    /// sees an empty field.
    pub fn classify(raw: &Value) -> Self {
        match raw {
            Value::String(s) if s.starts_with(ERROR_SENTINEL) => AgentResult::Error(s.clone()),
            Value::String(s) => AgentResult::PlainText(s.clone()),
            Value::Object(map) => AgentResult::Structured(
                map.iter()
                    .map(|(key, value)| (key.clone(), FieldValue::from_json(value)))
                    .filter(|(_, value)| value.is_shown())
                    .collect(),
            ),
            other => AgentResult::PlainText(pretty_json(other)),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AgentResult::Error(_))
    }
}

/// One entry of an aggregated result set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentReport {
    pub key: String,
    pub display_name: String,
    pub result: AgentResult,
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_error_sentinel() {
        let result = AgentResult::classify(&json!("Erro: timeout na API"));
        assert_eq!(result, AgentResult::Error("Erro: timeout na API".to_string()));
        assert!(result.is_error());

        // Sentinel must be a prefix
        let result = AgentResult::classify(&json!("Sem Erro: tudo certo"));
        assert!(matches!(result, AgentResult::PlainText(_)));
    }

    #[test]
    fn test_classify_structured_keeps_order_and_filters() {
        let raw = json!({
            "sentenca_final": "Condenado",
            "pena_fixada": null,
            "recurso_em_liberdade": false,
            "dosimetria_completa": "",
            "decisoes_prisao": [],
            "recursos_cabiveis": ["Apelação", "Embargos"]
        });

        let AgentResult::Structured(fields) = AgentResult::classify(&raw) else {
            panic!("expected structured result");
        };
        let keys: Vec<&str> = fields.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec!["sentenca_final", "pena_fixada", "recurso_em_liberdade", "recursos_cabiveis"]
        );
        assert_eq!(fields[1].1, FieldValue::Null);
        assert_eq!(fields[2].1, FieldValue::Bool(false));
    }

    #[test]
    fn test_classify_other_values_as_text() {
        assert_eq!(AgentResult::classify(&json!(42)), AgentResult::PlainText("42".to_string()));
        let AgentResult::PlainText(text) = AgentResult::classify(&json!(["a", "b"])) else {
            panic!("expected plain text");
        };
        assert!(text.contains("\"a\""));
    }

    #[test]
    fn test_field_value_list_items_stringified() {
        let value = FieldValue::from_json(&json!(["art. 121", 3, true]));
        assert_eq!(
            value,
            FieldValue::List(vec!["art. 121".to_string(), "3".to_string(), "true".to_string()])
        );
    }

    #[test]
    fn test_agent_priority_and_names() {
        assert_eq!(agent_priority("defesa"), Some(0));
        assert_eq!(agent_priority("relator"), Some(5));
        assert_eq!(agent_priority("outro"), None);
        assert_eq!(agent_display_name("web"), "🌐 Agente Pesquisa Web");
        assert_eq!(agent_display_name("outro"), "outro");
        assert_eq!(builtin_catalog().len(), 6);
    }
}

//! Turns classified agent results into renderable units

use super::types::{AgentReport, AgentResult, FieldValue};
use serde::Serialize;
use std::fmt;

pub const NO_ITEMS: &str = "Nenhum item encontrado";
pub const NOT_PROVIDED: &str = "Não informado";
pub const YES: &str = "Sim";
pub const NO: &str = "Não";
pub const EMPTY_STATE: &str = "Nenhum resultado encontrado";

/// Labels for field keys whose derived label would lose accents or casing
const FIELD_LABELS: &[(&str, &str)] = &[
    ("resposta_acusacao", "Resposta à Acusação"),
    ("alegacoes_finais", "Alegações Finais"),
    ("advogado_responsavel", "Advogado Responsável"),
    ("teses_defensivas", "Teses Defensivas"),
    ("vicios_processuais", "Vícios Processuais"),
    ("denuncia_completa", "Denúncia Completa"),
    ("promotor_responsavel", "Promotor Responsável"),
    ("tipificacao_penal", "Tipificação Penal"),
    ("sentenca_final", "Sentença Final"),
    ("juiz_responsavel", "Juiz Responsável"),
    ("fundamentacao_legal", "Fundamentação Legal"),
    ("jurisprudencia_stf", "Jurisprudência STF"),
    ("numero_processo", "Número do Processo"),
    ("natureza_acao", "Natureza da Ação"),
    ("pena_fixada", "Pena Fixada"),
    ("regime_cumprimento", "Regime de Cumprimento"),
    ("recurso_em_liberdade", "Recurso em Liberdade"),
    ("manutencao_prisao", "Manutenção da Prisão"),
    ("dosimetria_completa", "Dosimetria da Pena"),
    ("decisoes_prisao", "Decisões sobre Prisão"),
    ("fundamentacao_juridica", "Fundamentação Jurídica"),
    ("analise_provas", "Análise das Provas"),
    ("despachos_relevantes", "Despachos Relevantes"),
    ("recursos_cabiveis", "Recursos Cabíveis"),
    ("medidas_aplicadas", "Medidas Aplicadas"),
    ("cronologia_decisoes", "Cronologia das Decisões"),
];

/// A formatted field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RenderedValue {
    Text(String),
    List(Vec<String>),
    /// Marker shown in place of a missing value
    Placeholder(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedField {
    pub label: String,
    pub value: RenderedValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RenderedBody {
    Error(String),
    Fields(Vec<RenderedField>),
    Text(String),
}

/// One agent's card, ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedCard {
    pub agent_key: String,
    pub title: String,
    pub body: RenderedBody,
    /// Failed agents have no document to download
    pub downloadable: bool,
}

/// Human label for a field key
pub fn format_field_name(key: &str) -> String {
    if let Some((_, label)) = FIELD_LABELS.iter().find(|(k, _)| *k == key) {
        return label.to_string();
    }

    key.replace('_', " ")
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Format a single field value
pub fn format_value(value: &FieldValue) -> RenderedValue {
    match value {
        FieldValue::List(items) if items.is_empty() => RenderedValue::Placeholder(NO_ITEMS),
        FieldValue::List(items) => RenderedValue::List(items.clone()),
        FieldValue::Null => RenderedValue::Placeholder(NOT_PROVIDED),
        FieldValue::Bool(true) => RenderedValue::Text(YES.to_string()),
        FieldValue::Bool(false) => RenderedValue::Text(NO.to_string()),
        FieldValue::Text(text) => RenderedValue::Text(text.clone()),
    }
}

pub fn format_field(key: &str, value: &FieldValue) -> RenderedField {
    RenderedField {
        label: format_field_name(key),
        value: format_value(value),
    }
}

pub fn format_result(result: &AgentResult) -> RenderedBody {
    match result {
        AgentResult::Error(message) => RenderedBody::Error(message.clone()),
        AgentResult::PlainText(text) => RenderedBody::Text(text.clone()),
        AgentResult::Structured(fields) => RenderedBody::Fields(
            fields
                .iter()
                .filter(|(_, value)| value.is_shown())
                .map(|(key, value)| format_field(key, value))
                .collect(),
        ),
    }
}

pub fn render_card(report: &AgentReport) -> RenderedCard {
    RenderedCard {
        agent_key: report.key.clone(),
        title: report.display_name.clone(),
        body: format_result(&report.result),
        downloadable: !report.result.is_error(),
    }
}

pub fn render_all(reports: &[AgentReport]) -> Vec<RenderedCard> {
    reports.iter().map(render_card).collect()
}

/// Plain-text rendering of a full result set, with the empty state
pub fn render_text(reports: &[AgentReport]) -> String {
    if reports.is_empty() {
        return format!("{}\nA análise não retornou resultados\n", EMPTY_STATE);
    }

    render_all(reports)
        .iter()
        .map(|card| card.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl fmt::Display for RenderedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderedValue::Text(text) => writeln!(f, "  {}", text),
            RenderedValue::Placeholder(marker) => writeln!(f, "  ({})", marker),
            RenderedValue::List(items) => {
                for item in items {
                    writeln!(f, "  • {}", item)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for RenderedCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.title)?;
        match &self.body {
            RenderedBody::Error(message) => writeln!(f, "⚠ {}", message),
            RenderedBody::Text(text) => writeln!(f, "{}", text),
            RenderedBody::Fields(fields) => {
                for field in fields {
                    writeln!(f, "{}", field.label.to_uppercase())?;
                    write!(f, "{}", field.value)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_field_name_table_and_fallback() {
        assert_eq!(format_field_name("teses_defensivas"), "Teses Defensivas");
        assert_eq!(format_field_name("jurisprudencia_stf"), "Jurisprudência STF");
        assert_eq!(format_field_name("laudos_pericias"), "Laudos Pericias");
        assert_eq!(format_field_name("autoria"), "Autoria");
        assert_eq!(format_field_name("pedidos_mp"), "Pedidos Mp");
    }

    #[test]
    fn test_format_value_precedence() {
        assert_eq!(format_value(&FieldValue::List(vec![])), RenderedValue::Placeholder(NO_ITEMS));
        assert_eq!(
            format_value(&FieldValue::List(vec!["a".into(), "b".into()])),
            RenderedValue::List(vec!["a".into(), "b".into()])
        );
        assert_eq!(format_value(&FieldValue::Null), RenderedValue::Placeholder(NOT_PROVIDED));
        assert_eq!(format_value(&FieldValue::Bool(true)), RenderedValue::Text("Sim".into()));
        assert_eq!(format_value(&FieldValue::Bool(false)), RenderedValue::Text("Não".into()));
        assert_eq!(
            format_value(&FieldValue::Text("Regime fechado".into())),
            RenderedValue::Text("Regime fechado".into())
        );
    }

    #[test]
    fn test_formatting_is_idempotent() {
        let raw = json!({
            "sentenca_final": "Absolvido",
            "manutencao_prisao": null,
            "recursos_cabiveis": ["Apelação"]
        });
        let report = AgentReport {
            key: "decisoes".into(),
            display_name: "⚖️ Agente Decisões Judiciais".into(),
            result: AgentResult::classify(&raw),
        };

        let first = render_card(&report);
        let second = render_card(&report);
        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn test_error_card_not_downloadable() {
        let report = AgentReport {
            key: "web".into(),
            display_name: "🌐 Agente Pesquisa Web".into(),
            result: AgentResult::classify(&json!("Erro: sem conexão")),
        };
        let card = render_card(&report);
        assert!(!card.downloadable);
        assert_eq!(card.body, RenderedBody::Error("Erro: sem conexão".into()));
    }

    #[test]
    fn test_render_text_empty_state() {
        assert!(render_text(&[]).starts_with(EMPTY_STATE));
    }

    #[test]
    fn test_card_display() {
        let report = AgentReport {
            key: "defesa".into(),
            display_name: "🛡️ Agente Defesa".into(),
            result: AgentResult::classify(&json!({
                "advogado_responsavel": "Dra. Silva",
                "teses_defensivas": ["Legítima defesa"]
            })),
        };
        let text = render_card(&report).to_string();
        assert!(text.starts_with("== 🛡️ Agente Defesa =="));
        assert!(text.contains("ADVOGADO RESPONSÁVEL\n  Dra. Silva"));
        assert!(text.contains("  • Legítima defesa"));
    }
}

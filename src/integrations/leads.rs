use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::core::{ApplicantFlags, PropertyCategory, SimulationResult};

const UTM_KEYS: [&str; 5] = [
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
];

/// Free-form contact fields. Any JSON scalar is accepted and kept as text;
/// anything else is dropped, so a malformed contact never rejects a request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ContactInfo {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub whatsapp: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_text))
}

/// Text form of a JSON scalar, trimmed; `None` for null, empty, arrays and objects.
fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Campaign attribution attached to a lead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMetadata {
    pub source: Option<String>,
    pub utm: BTreeMap<String, String>,
}

impl SourceMetadata {
    /// Keeps the five standard UTM keys with non-empty scalar values.
    pub fn new(source: Option<&Value>, utm: Option<&Value>) -> Self {
        let utm = utm
            .and_then(Value::as_object)
            .map(|tags| {
                UTM_KEYS
                    .iter()
                    .filter_map(|key| {
                        let value = scalar_text(tags.get(*key)?)?;
                        Some((key.to_string(), value))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            source: source.and_then(scalar_text),
            utm,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lead {
    pub contact: ContactInfo,
    pub source: SourceMetadata,
    pub property_value: f64,
    pub monthly_income: f64,
    pub category: PropertyCategory,
    pub age_years: u32,
    pub flags: ApplicantFlags,
    pub result: SimulationResult,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LeadSnapshot<'a> {
    contact: &'a ContactInfo,
    origin: Option<&'a str>,
    utm: &'a BTreeMap<String, String>,
    input: SnapshotInput,
    output: &'a SimulationResult,
    created_at: &'a DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotInput {
    property_value: f64,
    monthly_income: f64,
    category: PropertyCategory,
    age_years: u32,
    flags: ApplicantFlags,
}

impl Lead {
    pub fn title(&self) -> String {
        let name = non_empty(self.contact.name.as_deref()).unwrap_or("Sem nome");
        format!(
            "Simulação • {name} • {} • {}",
            format_brl(self.property_value),
            category_label(self.category)
        )
    }

    /// Markdown card body: client block followed by the technical summary.
    pub fn description(&self) -> String {
        let contact = &self.contact;
        let mut client = vec![
            format!("**Nome:** {}", non_empty(contact.name.as_deref()).unwrap_or("-")),
            format!("**E-mail:** {}", non_empty(contact.email.as_deref()).unwrap_or("-")),
            format!(
                "**WhatsApp:** {}",
                non_empty(contact.whatsapp.as_deref()).unwrap_or("-")
            ),
            format!(
                "**Origem:** {}",
                non_empty(self.source.source.as_deref()).unwrap_or("-")
            ),
        ];
        if !self.source.utm.is_empty() {
            let tags: Vec<String> = self
                .source
                .utm
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            client.push(format!("**UTM:** {}", tags.join(" | ")));
        }

        let result = &self.result;
        let cam = &result.constant_amortization;
        let fi = &result.fixed_installment;
        let summary = [
            format!("**Linha/Programa:** {}", result.program),
            format!("**Taxa anual:** {}", format_pct(result.annual_rate_percent)),
            format!("**Prazo:** {} meses", result.term_months),
            format!("**Subsídio:** {}", format_brl(result.subsidy)),
            String::new(),
            "**SAC**".to_string(),
            format!("- LTV: {:.0}%", cam.loan_to_value * 100.0),
            format!("- Entrada: {}", format_brl(cam.down_payment)),
            format!("- Financiamento: {}", format_brl(cam.financed_principal)),
            format!("- Parcela 1: {}", format_brl(cam.first_payment)),
            format!(
                "- Parcela final: {}",
                format_brl(cam.last_payment.unwrap_or(cam.first_payment))
            ),
            String::new(),
            "**PRICE**".to_string(),
            format!("- LTV: {:.0}%", fi.loan_to_value * 100.0),
            format!("- Entrada: {}", format_brl(fi.down_payment)),
            format!("- Financiamento: {}", format_brl(fi.financed_principal)),
            format!("- Parcela: {}", format_brl(fi.first_payment)),
        ];

        format!(
            "## Dados do cliente\n{}\n\n## Resumo técnico\n{}",
            client.join("\n"),
            summary.join("\n")
        )
    }
}

impl Lead {
    /// JSON record of what was submitted and what came back, attached to the card.
    pub fn snapshot(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&LeadSnapshot {
            contact: &self.contact,
            origin: self.source.source.as_deref(),
            utm: &self.source.utm,
            input: SnapshotInput {
                property_value: self.property_value,
                monthly_income: self.monthly_income,
                category: self.category,
                age_years: self.age_years,
                flags: self.flags,
            },
            output: &self.result,
            created_at: &self.created_at,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn category_label(category: PropertyCategory) -> &'static str {
    match category {
        PropertyCategory::New => "novo",
        PropertyCategory::Used => "usado",
    }
}

/// `1234.5` -> `R$ 1.234,50`.
pub fn format_brl(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let cents = (value.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}R$ {grouped},{:02}", cents % 100)
}

/// `4.25` -> `4,25%`.
pub fn format_pct(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    format!("{value:.2}%").replace('.', ",")
}

#[derive(Debug, Error)]
pub enum LeadError {
    #[error("lead delivery failed: {0}")]
    Delivery(String),
}

/// Best-effort destination for simulation leads.
pub trait LeadSink: Send + Sync {
    fn submit(&self, lead: &Lead) -> Result<(), LeadError>;
}

/// Writes the rendered lead card to the log.
#[derive(Debug, Default, Clone)]
pub struct LogLeadSink;

impl LeadSink for LogLeadSink {
    fn submit(&self, lead: &Lead) -> Result<(), LeadError> {
        let snapshot = lead
            .snapshot()
            .map_err(|err| LeadError::Delivery(format!("snapshot: {err}")))?;
        info!(
            title = %lead.title(),
            program = %lead.result.program,
            property_value = lead.property_value,
            %snapshot,
            "lead captured\n{}",
            lead.description()
        );
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryLeadSink {
    leads: Arc<Mutex<Vec<Lead>>>,
}

impl InMemoryLeadSink {
    pub fn leads(&self) -> Vec<Lead> {
        self.leads
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl LeadSink for InMemoryLeadSink {
    fn submit(&self, lead: &Lead) -> Result<(), LeadError> {
        let mut guard = self
            .leads
            .lock()
            .map_err(|_| LeadError::Delivery("lead store mutex poisoned".to_string()))?;
        guard.push(lead.clone());
        Ok(())
    }
}

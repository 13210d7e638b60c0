use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::core::{Applicant, ApplicantFlags, InputError, PropertyCategory};
use crate::integrations::ContactInfo;

/// Numbers arrive either as JSON numbers or as text typed into a pt-BR form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(f64),
    Text(String),
}

impl NumberInput {
    pub fn value(&self) -> Option<f64> {
        match self {
            NumberInput::Number(n) => Some(*n),
            NumberInput::Text(text) => parse_decimal(text),
        }
    }
}

/// Parses `"1.500.000,00"`, `"R$ 2.000"`, `"200.000"`, `"2000.50"` and `"2000"`.
/// A comma marks pt-BR formatting. Without one, dots followed by groups of
/// exactly three digits are thousands separators.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else if has_thousands_groups(&cleaned) {
        cleaned.replace('.', "")
    } else {
        cleaned
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn has_thousands_groups(text: &str) -> bool {
    let mut groups = text.split('.');
    let head = groups.next().unwrap_or_default();
    let digits = head.trim_start_matches('-');
    let mut tail = groups.peekable();
    !digits.is_empty()
        && digits.len() <= 3
        && tail.peek().is_some()
        && tail.all(|group| group.len() == 3 && group.bytes().all(|b| b.is_ascii_digit()))
}

/// Completed years between `birth` and `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PayloadFlags {
    pub has_savings_account: bool,
    pub previous_subsidy: bool,
    pub has_co_borrower: bool,
}

impl From<PayloadFlags> for ApplicantFlags {
    fn from(value: PayloadFlags) -> Self {
        ApplicantFlags {
            has_savings_account: value.has_savings_account,
            previous_subsidy: value.previous_subsidy,
            has_co_borrower: value.has_co_borrower,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulatePayload {
    pub property_value: Option<NumberInput>,
    pub monthly_income: Option<NumberInput>,
    pub category: Option<PropertyCategory>,
    pub age_years: Option<NumberInput>,
    /// `dd/mm/yyyy`, used when `ageYears` is absent.
    pub birth_date: Option<String>,
    pub flags: PayloadFlags,
    pub captcha_token: Option<String>,
    /// Lead-only fields below are decoded leniently and never fail a request.
    #[serde(deserialize_with = "contact_or_default")]
    pub contact: ContactInfo,
    pub source: Option<Value>,
    pub utm: Option<Value>,
}

fn contact_or_default<'de, D>(deserializer: D) -> Result<ContactInfo, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default())
}

impl SimulatePayload {
    pub fn to_applicant(&self, today: NaiveDate) -> Result<Applicant, InputError> {
        let property_value = required_number(self.property_value.as_ref(), "propertyValue")?;
        let monthly_income = required_number(self.monthly_income.as_ref(), "monthlyIncome")?;
        let category = self
            .category
            .ok_or_else(|| InputError::insufficient("category", "is required"))?;
        let age_years = self.resolve_age(today)?;

        Applicant::new(
            monthly_income,
            property_value,
            category,
            age_years,
            self.flags.into(),
        )
    }

    fn resolve_age(&self, today: NaiveDate) -> Result<u32, InputError> {
        if let Some(age) = &self.age_years {
            let age = age
                .value()
                .filter(|age| *age >= 1.0 && *age < f64::from(u32::MAX))
                .ok_or_else(|| InputError::insufficient("ageYears", "must be a positive number"))?;
            return Ok(age.floor() as u32);
        }

        let Some(raw) = self.birth_date.as_deref() else {
            return Err(InputError::insufficient("ageYears", "is required"));
        };
        let birth = NaiveDate::parse_from_str(raw.trim(), "%d/%m/%Y")
            .map_err(|_| InputError::insufficient("birthDate", "must be dd/mm/yyyy"))?;
        age_on(birth, today)
            .filter(|age| *age > 0)
            .ok_or_else(|| InputError::insufficient("birthDate", "must be in the past"))
    }
}

fn required_number(input: Option<&NumberInput>, field: &'static str) -> Result<f64, InputError> {
    let input = input.ok_or_else(|| InputError::insufficient(field, "is required"))?;
    input
        .value()
        .ok_or_else(|| InputError::insufficient(field, "must be numeric"))
}

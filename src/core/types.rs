use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyCategory {
    New,
    Used,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AmortizationSystem {
    /// Level principal repayment, declining total payment.
    ConstantAmortization,
    /// Level total payment for the whole term.
    FixedInstallment,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgramClass {
    Subsidized,
    MarketPooled,
    MarketRate,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantFlags {
    pub has_savings_account: bool,
    pub previous_subsidy: bool,
    pub has_co_borrower: bool,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    #[error("insufficient input: {field} {reason}")]
    InsufficientInput { field: &'static str, reason: String },
}

impl InputError {
    pub(crate) fn insufficient(field: &'static str, reason: impl Into<String>) -> Self {
        InputError::InsufficientInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            InputError::InsufficientInput { field, .. } => field,
        }
    }
}

/// Validated applicant data for a single simulation request.
#[derive(Debug, Clone, PartialEq)]
pub struct Applicant {
    monthly_income: f64,
    property_price: f64,
    category: PropertyCategory,
    age_years: u32,
    flags: ApplicantFlags,
}

impl Applicant {
    pub fn new(
        monthly_income: f64,
        property_price: f64,
        category: PropertyCategory,
        age_years: u32,
        flags: ApplicantFlags,
    ) -> Result<Self, InputError> {
        if !monthly_income.is_finite() || monthly_income <= 0.0 {
            return Err(InputError::insufficient(
                "monthlyIncome",
                "must be a positive number",
            ));
        }
        if !property_price.is_finite() || property_price <= 0.0 {
            return Err(InputError::insufficient(
                "propertyValue",
                "must be a positive number",
            ));
        }
        if age_years == 0 {
            return Err(InputError::insufficient("ageYears", "must be > 0"));
        }

        Ok(Self {
            monthly_income,
            property_price,
            category,
            age_years,
            flags,
        })
    }

    pub fn monthly_income(&self) -> f64 {
        self.monthly_income
    }

    pub fn property_price(&self) -> f64 {
        self.property_price
    }

    pub fn category(&self) -> PropertyCategory {
        self.category
    }

    pub fn age_years(&self) -> u32 {
        self.age_years
    }

    pub fn flags(&self) -> ApplicantFlags {
        self.flags
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffordabilityResult {
    pub principal: f64,
    pub first_payment: f64,
    pub last_payment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancingBranch {
    pub loan_to_value: f64,
    pub down_payment: f64,
    pub financed_principal: f64,
    pub first_payment: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_payment: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub program: String,
    pub program_class: ProgramClass,
    pub term_months: u32,
    pub annual_rate_percent: f64,
    pub subsidy: f64,
    pub constant_amortization: FinancingBranch,
    pub fixed_installment: FinancingBranch,
    pub documentation_cost: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeclineReason {
    NoEligibleProgram,
    FinancingBelowMinimum,
}

impl DeclineReason {
    pub fn message(self) -> &'static str {
        match self {
            DeclineReason::NoEligibleProgram => {
                "Property price exceeds the ceiling of every available credit line."
            }
            DeclineReason::FinancingBelowMinimum => {
                "Income is insufficient for the requested conditions; the down payment would be too high."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityFailure {
    pub eligible: bool,
    pub code: DeclineReason,
    pub reason: String,
}

impl EligibilityFailure {
    pub fn new(code: DeclineReason) -> Self {
        Self {
            eligible: false,
            code,
            reason: code.message().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Approved(SimulationResult),
    Declined(EligibilityFailure),
}

impl Outcome {
    pub fn approved(&self) -> Option<&SimulationResult> {
        match self {
            Outcome::Approved(result) => Some(result),
            Outcome::Declined(_) => None,
        }
    }

    pub fn declined(&self) -> Option<&EligibilityFailure> {
        match self {
            Outcome::Approved(_) => None,
            Outcome::Declined(failure) => Some(failure),
        }
    }
}

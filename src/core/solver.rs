use super::rules::AffordabilityPolicy;
use super::types::{AffordabilityResult, AmortizationSystem};

#[derive(Debug, Clone, Copy)]
pub struct SolveConfig {
    pub system: AmortizationSystem,
    pub property_price: f64,
    pub monthly_income: f64,
    pub term_months: u32,
    pub annual_rate_percent: f64,
    pub loan_to_value: f64,
    pub age_years: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Installment {
    first: f64,
    last: f64,
}

/// Monthly charges that do not depend on the amortization system.
#[derive(Debug, Clone, Copy)]
struct Encumbrances {
    fixed: f64,
    life_rate: f64,
}

impl Encumbrances {
    fn new(policy: &AffordabilityPolicy, property_price: f64, age_years: u32) -> Self {
        Self {
            fixed: policy.admin_fee + property_price * policy.property_insurance_rate,
            life_rate: policy.life_insurance_rate(age_years),
        }
    }

    fn for_principal(self, principal: f64) -> f64 {
        self.fixed + principal * self.life_rate
    }
}

pub fn monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / 100.0 / 12.0
}

/// Level payment of the fixed-installment system. A zero rate degenerates to
/// straight-line repayment.
pub fn level_payment(principal: f64, monthly_rate: f64, term_months: u32) -> f64 {
    let n = f64::from(term_months);
    if monthly_rate == 0.0 {
        return principal / n;
    }
    let growth = (1.0 + monthly_rate).powf(n);
    principal * (monthly_rate * growth) / (growth - 1.0)
}

fn core_installment(
    system: AmortizationSystem,
    principal: f64,
    monthly_rate: f64,
    term_months: u32,
) -> Installment {
    match system {
        AmortizationSystem::ConstantAmortization => {
            let slice = principal / f64::from(term_months);
            Installment {
                first: slice + principal * monthly_rate,
                last: slice + slice * monthly_rate,
            }
        }
        AmortizationSystem::FixedInstallment => {
            let level = level_payment(principal, monthly_rate, term_months);
            Installment {
                first: level,
                last: level,
            }
        }
    }
}

/// Largest principal in `[0, price * ltv]` whose first payment, charges
/// included, stays within the income cap. Runs exactly `policy.iterations`
/// bisection steps so the result is reproducible bit for bit.
pub fn solve_max_principal(config: SolveConfig, policy: &AffordabilityPolicy) -> AffordabilityResult {
    let mut result = AffordabilityResult {
        principal: 0.0,
        first_payment: 0.0,
        last_payment: 0.0,
    };

    let payment_cap = config.monthly_income * policy.payment_to_income;
    if !payment_cap.is_finite() || payment_cap <= 0.0 || config.term_months == 0 {
        return result;
    }

    let rate = monthly_rate(config.annual_rate_percent);
    let charges = Encumbrances::new(policy, config.property_price, config.age_years);

    let mut lo = 0.0;
    let mut hi = config.property_price * config.loan_to_value;
    for _ in 0..policy.iterations {
        let mid = (lo + hi) * 0.5;
        let extra = charges.for_principal(mid);
        let installment = core_installment(config.system, mid, rate, config.term_months);
        let first = installment.first + extra;

        if first <= payment_cap {
            result = AffordabilityResult {
                principal: mid,
                first_payment: first,
                last_payment: installment.last + extra,
            };
            lo = mid;
        } else {
            hi = mid;
        }
    }

    result
}

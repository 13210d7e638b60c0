use super::rules::{LoanToValue, ProgramTier, RuleBook};
use super::types::{Applicant, PropertyCategory};

/// Why a tier was chosen; kept for diagnostics and tests.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Route {
    MarketRateOverride,
    PreviousSubsidy,
    Subsidized,
    PooledMarket,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProgram<'a> {
    pub tier: &'a ProgramTier,
    pub route: Route,
    pub annual_rate: f64,
    pub term_years: u32,
    pub loan_to_value: LoanToValue,
}

impl ResolvedProgram<'_> {
    pub fn term_months(&self) -> u32 {
        self.term_years * 12
    }
}

/// Picks the tier for an income, price and category, in priority order.
/// `None` means no tier admits the price.
pub fn select_tier(
    rules: &RuleBook,
    monthly_income: f64,
    price: f64,
    category: PropertyCategory,
    previous_subsidy: bool,
) -> Option<(&ProgramTier, Route)> {
    if let Some(market) = &rules.market_rate {
        if price >= market.min_price {
            return Some((&market.tier, Route::MarketRateOverride));
        }
    }

    let pooled = &rules.pooled_market;
    let pooled_admits = pooled.admits(monthly_income, price, category);

    if previous_subsidy && pooled_admits {
        return Some((pooled, Route::PreviousSubsidy));
    }

    if let Some(tier) = rules
        .subsidized_tiers
        .iter()
        .find(|tier| tier.admits(monthly_income, price, category))
    {
        return Some((tier, Route::Subsidized));
    }

    pooled_admits.then_some((pooled, Route::PooledMarket))
}

/// Resolves the tier and derives its concrete rate, term and loan-to-value.
pub fn resolve_program<'a>(rules: &'a RuleBook, applicant: &Applicant) -> Option<ResolvedProgram<'a>> {
    let (tier, route) = select_tier(
        rules,
        applicant.monthly_income(),
        applicant.property_price(),
        applicant.category(),
        applicant.flags().previous_subsidy,
    )?;

    let term_years = tier
        .fixed_term_years
        .unwrap_or_else(|| rules.policy.term_years(applicant.age_years()));

    Some(ResolvedProgram {
        tier,
        route,
        annual_rate: tier.rate.resolve(applicant.monthly_income()),
        term_years,
        loan_to_value: tier.loan_to_value.for_category(applicant.category()),
    })
}

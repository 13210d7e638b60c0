use std::sync::OnceLock;

use super::types::{PropertyCategory, ProgramClass};

/// A value that may differ between new and used properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerCategory<T> {
    pub new: T,
    pub used: T,
}

impl<T: Copy> PerCategory<T> {
    pub fn uniform(value: T) -> Self {
        Self {
            new: value,
            used: value,
        }
    }

    pub fn get(&self, category: PropertyCategory) -> T {
        match category {
            PropertyCategory::New => self.new,
            PropertyCategory::Used => self.used,
        }
    }
}

/// Loan-to-value ceilings for one property category, one per amortization system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanToValue {
    pub constant_amortization: f64,
    pub fixed_installment: f64,
}

impl LoanToValue {
    pub fn same(value: f64) -> Self {
        Self {
            constant_amortization: value,
            fixed_installment: value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanToValueTable(PerCategory<LoanToValue>);

impl LoanToValueTable {
    pub fn uniform(value: f64) -> Self {
        Self(PerCategory::uniform(LoanToValue::same(value)))
    }

    /// Subsidized tiers restrict used properties to a lower ceiling.
    pub fn per_category(new: f64, used: f64) -> Self {
        Self(PerCategory {
            new: LoanToValue::same(new),
            used: LoanToValue::same(used),
        })
    }

    /// Pooled-market lending caps each amortization system separately.
    pub fn per_system(constant_amortization: f64, fixed_installment: f64) -> Self {
        Self(PerCategory::uniform(LoanToValue {
            constant_amortization,
            fixed_installment,
        }))
    }

    pub fn for_category(&self, category: PropertyCategory) -> LoanToValue {
        self.0.get(category)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateStep {
    pub max_income: f64,
    pub annual_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RateRule {
    FixedRate(f64),
    /// Steps are checked in order with an inclusive income bound; `above`
    /// applies once every step is exceeded.
    IncomeSteppedRate { steps: Vec<RateStep>, above: f64 },
}

impl RateRule {
    pub fn resolve(&self, monthly_income: f64) -> f64 {
        match self {
            RateRule::FixedRate(rate) => *rate,
            RateRule::IncomeSteppedRate { steps, above } => steps
                .iter()
                .find(|step| monthly_income <= step.max_income)
                .map(|step| step.annual_rate)
                .unwrap_or(*above),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramTier {
    pub program: &'static str,
    pub id: &'static str,
    pub class: ProgramClass,
    /// `None` is unbounded.
    pub income_ceiling: Option<f64>,
    pub price_ceiling: PerCategory<f64>,
    pub loan_to_value: LoanToValueTable,
    pub rate: RateRule,
    pub fixed_term_years: Option<u32>,
    pub subsidy_eligible: bool,
}

impl ProgramTier {
    pub fn label(&self) -> String {
        format!("{} — {}", self.program, self.id)
    }

    pub fn admits(&self, monthly_income: f64, price: f64, category: PropertyCategory) -> bool {
        let income_ok = self
            .income_ceiling
            .is_none_or(|ceiling| monthly_income <= ceiling);
        income_ok && price <= self.price_ceiling.get(category)
    }
}

/// Routes every property priced at or above `min_price` to `tier`.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketRateOverride {
    pub min_price: f64,
    pub tier: ProgramTier,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubsidyBreakpoint {
    pub income: f64,
    pub subsidy: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubsidyTable {
    /// Ascending by income; at least two points.
    pub breakpoints: Vec<SubsidyBreakpoint>,
    pub income_ceiling: f64,
    pub hard_cap: f64,
    pub multiplier: PerCategory<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AffordabilityPolicy {
    pub payment_to_income: f64,
    pub admin_fee: f64,
    pub property_insurance_rate: f64,
    pub life_insurance_base_rate: f64,
    pub life_insurance_age_floor: u32,
    pub life_insurance_age_loading: f64,
    pub iterations: u32,
    pub term_age_limit: u32,
    pub min_term_years: u32,
    pub max_term_years: u32,
    pub documentation_cost_rate: f64,
    /// Decline when the constant-amortization principal is below this
    /// fraction of the price. Disabled when `None`.
    pub min_financed_fraction: Option<f64>,
}

impl AffordabilityPolicy {
    pub fn term_years(&self, age_years: u32) -> u32 {
        let remaining = i64::from(self.term_age_limit) - i64::from(age_years);
        remaining.clamp(
            i64::from(self.min_term_years),
            i64::from(self.max_term_years),
        ) as u32
    }

    pub fn life_insurance_rate(&self, age_years: u32) -> f64 {
        let years_over = age_years.saturating_sub(self.life_insurance_age_floor);
        self.life_insurance_base_rate * (1.0 + f64::from(years_over) * self.life_insurance_age_loading)
    }
}

/// Every table the engine consults. Built once, read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleBook {
    /// Priority order: the first admitting tier wins.
    pub subsidized_tiers: Vec<ProgramTier>,
    pub pooled_market: ProgramTier,
    pub market_rate: Option<MarketRateOverride>,
    pub subsidy: SubsidyTable,
    pub policy: AffordabilityPolicy,
}

impl RuleBook {
    pub fn reference() -> Self {
        let subsidized_tiers = vec![
            ProgramTier {
                program: "MCMV",
                id: "Faixa 1",
                class: ProgramClass::Subsidized,
                income_ceiling: Some(2_850.0),
                price_ceiling: PerCategory::uniform(264_000.0),
                loan_to_value: LoanToValueTable::uniform(0.80),
                rate: RateRule::FixedRate(4.25),
                fixed_term_years: None,
                subsidy_eligible: true,
            },
            ProgramTier {
                program: "MCMV",
                id: "Faixa 2",
                class: ProgramClass::Subsidized,
                income_ceiling: Some(4_700.0),
                price_ceiling: PerCategory::uniform(264_000.0),
                loan_to_value: LoanToValueTable::uniform(0.80),
                rate: RateRule::IncomeSteppedRate {
                    steps: vec![
                        RateStep {
                            max_income: 3_200.0,
                            annual_rate: 5.00,
                        },
                        RateStep {
                            max_income: 4_000.0,
                            annual_rate: 6.00,
                        },
                    ],
                    above: 6.50,
                },
                fixed_term_years: None,
                subsidy_eligible: true,
            },
            ProgramTier {
                program: "MCMV",
                id: "Faixa 3",
                class: ProgramClass::Subsidized,
                income_ceiling: Some(8_600.0),
                price_ceiling: PerCategory {
                    new: 350_000.0,
                    used: 270_000.0,
                },
                loan_to_value: LoanToValueTable::per_category(0.80, 0.65),
                rate: RateRule::FixedRate(7.66),
                fixed_term_years: None,
                subsidy_eligible: false,
            },
            ProgramTier {
                program: "MCMV",
                id: "Classe Média",
                class: ProgramClass::Subsidized,
                income_ceiling: Some(12_000.0),
                price_ceiling: PerCategory::uniform(500_000.0),
                loan_to_value: LoanToValueTable::per_category(0.80, 0.60),
                rate: RateRule::FixedRate(10.00),
                fixed_term_years: None,
                subsidy_eligible: false,
            },
        ];

        let pooled_market = ProgramTier {
            program: "SBPE",
            id: "SBPE",
            class: ProgramClass::MarketPooled,
            income_ceiling: None,
            price_ceiling: PerCategory::uniform(1_500_000.0),
            loan_to_value: LoanToValueTable::per_system(0.70, 0.50),
            rate: RateRule::FixedRate(10.99),
            fixed_term_years: None,
            subsidy_eligible: false,
        };

        let market_rate = MarketRateOverride {
            min_price: 1_500_000.01,
            tier: ProgramTier {
                program: "SFI",
                id: "Taxa de Mercado",
                class: ProgramClass::MarketRate,
                income_ceiling: None,
                price_ceiling: PerCategory::uniform(f64::INFINITY),
                loan_to_value: LoanToValueTable::uniform(0.80),
                rate: RateRule::FixedRate(11.99),
                fixed_term_years: Some(35),
                subsidy_eligible: false,
            },
        };

        let subsidy = SubsidyTable {
            breakpoints: vec![
                SubsidyBreakpoint {
                    income: 1_500.0,
                    subsidy: 14_850.0,
                },
                SubsidyBreakpoint {
                    income: 2_850.0,
                    subsidy: 4_845.0,
                },
                SubsidyBreakpoint {
                    income: 3_000.0,
                    subsidy: 2_135.0,
                },
                SubsidyBreakpoint {
                    income: 4_700.0,
                    subsidy: 0.0,
                },
            ],
            income_ceiling: 4_400.0,
            hard_cap: 55_000.0,
            multiplier: PerCategory {
                new: 1.0,
                used: 0.5,
            },
        };

        let policy = AffordabilityPolicy {
            payment_to_income: 0.30,
            admin_fee: 25.0,
            property_insurance_rate: 0.000_138,
            life_insurance_base_rate: 0.000_038,
            life_insurance_age_floor: 20,
            life_insurance_age_loading: 0.05,
            iterations: 50,
            term_age_limit: 80,
            min_term_years: 1,
            max_term_years: 35,
            documentation_cost_rate: 0.045,
            min_financed_fraction: None,
        };

        Self {
            subsidized_tiers,
            pooled_market,
            market_rate: Some(market_rate),
            subsidy,
            policy,
        }
    }

    pub fn with_min_financed_fraction(mut self, fraction: Option<f64>) -> Self {
        self.policy.min_financed_fraction = fraction;
        self
    }
}

/// Process-wide reference tables.
pub fn reference_rules() -> &'static RuleBook {
    static RULES: OnceLock<RuleBook> = OnceLock::new();
    RULES.get_or_init(RuleBook::reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepped_rate_uses_inclusive_bounds() {
        let rules = reference_rules();
        let faixa2 = &rules.subsidized_tiers[1];
        assert_eq!(faixa2.rate.resolve(3_200.0), 5.00);
        assert_eq!(faixa2.rate.resolve(3_200.01), 6.00);
        assert_eq!(faixa2.rate.resolve(4_000.0), 6.00);
        assert_eq!(faixa2.rate.resolve(4_001.0), 6.50);
    }

    #[test]
    fn fixed_rate_ignores_income() {
        let rule = RateRule::FixedRate(7.66);
        assert_eq!(rule.resolve(0.0), 7.66);
        assert_eq!(rule.resolve(1_000_000.0), 7.66);
    }

    #[test]
    fn term_is_remaining_years_to_age_limit_clamped() {
        let policy = &reference_rules().policy;
        assert_eq!(policy.term_years(30), 35);
        assert_eq!(policy.term_years(45), 35);
        assert_eq!(policy.term_years(50), 30);
        assert_eq!(policy.term_years(79), 1);
        assert_eq!(policy.term_years(80), 1);
        assert_eq!(policy.term_years(95), 1);
    }

    #[test]
    fn life_insurance_loads_five_percent_per_year_over_twenty() {
        let policy = &reference_rules().policy;
        let base = policy.life_insurance_base_rate;
        assert!((policy.life_insurance_rate(20) - base).abs() < 1e-15);
        assert!((policy.life_insurance_rate(18) - base).abs() < 1e-15);
        assert!((policy.life_insurance_rate(40) - base * 2.0).abs() < 1e-15);
    }

    #[test]
    fn loan_to_value_tables_resolve_per_category_and_system() {
        let rules = reference_rules();
        let faixa3 = rules.subsidized_tiers[2].loan_to_value;
        assert_eq!(faixa3.for_category(PropertyCategory::New), LoanToValue::same(0.80));
        assert_eq!(faixa3.for_category(PropertyCategory::Used), LoanToValue::same(0.65));

        let pooled = rules.pooled_market.loan_to_value.for_category(PropertyCategory::Used);
        assert_eq!(pooled.constant_amortization, 0.70);
        assert_eq!(pooled.fixed_installment, 0.50);
    }

    #[test]
    fn reference_tables_keep_invariants() {
        let rules = reference_rules();
        let mut last_ceiling = 0.0;
        for tier in &rules.subsidized_tiers {
            let ceiling = tier.income_ceiling.expect("subsidized tiers are bounded");
            assert!(ceiling > last_ceiling, "tiers must ascend by income ceiling");
            last_ceiling = ceiling;
        }

        let all = rules
            .subsidized_tiers
            .iter()
            .chain(std::iter::once(&rules.pooled_market))
            .chain(rules.market_rate.iter().map(|m| &m.tier));
        for tier in all {
            for category in [PropertyCategory::New, PropertyCategory::Used] {
                let ltv = tier.loan_to_value.for_category(category);
                for value in [ltv.constant_amortization, ltv.fixed_installment] {
                    assert!(value > 0.0 && value <= 1.0, "{} ltv {value}", tier.label());
                }
            }
        }

        let points = &rules.subsidy.breakpoints;
        assert!(points.len() >= 2);
        assert!(points.windows(2).all(|w| w[0].income < w[1].income));
    }
}

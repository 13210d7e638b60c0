mod engine;
mod rules;
mod solver;
mod subsidy;
mod tiers;
mod types;

pub use engine::simulate;
pub use rules::{
    AffordabilityPolicy, LoanToValue, LoanToValueTable, MarketRateOverride, PerCategory,
    ProgramTier, RateRule, RateStep, RuleBook, SubsidyBreakpoint, SubsidyTable, reference_rules,
};
pub use solver::{SolveConfig, level_payment, monthly_rate, solve_max_principal};
pub use subsidy::subsidy_for;
pub use tiers::{ResolvedProgram, Route, resolve_program, select_tier};
pub use types::{
    AffordabilityResult, AmortizationSystem, Applicant, ApplicantFlags, DeclineReason,
    EligibilityFailure, FinancingBranch, InputError, Outcome, ProgramClass, PropertyCategory,
    SimulationResult,
};

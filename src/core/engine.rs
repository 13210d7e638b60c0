use super::rules::RuleBook;
use super::solver::{SolveConfig, solve_max_principal};
use super::subsidy::subsidy_for;
use super::tiers::{ResolvedProgram, resolve_program};
use super::types::{
    AffordabilityResult, AmortizationSystem, Applicant, DeclineReason, EligibilityFailure,
    FinancingBranch, Outcome, SimulationResult,
};

/// Runs one eligibility and affordability decision.
pub fn simulate(rules: &RuleBook, applicant: &Applicant) -> Outcome {
    let Some(program) = resolve_program(rules, applicant) else {
        return Outcome::Declined(EligibilityFailure::new(DeclineReason::NoEligibleProgram));
    };

    let subsidy = if program.tier.subsidy_eligible {
        subsidy_for(
            &rules.subsidy,
            applicant.monthly_income(),
            applicant.category(),
            applicant.flags().has_savings_account,
        )
    } else {
        0.0
    };

    let cam_ltv = program.loan_to_value.constant_amortization;
    let fi_ltv = program.loan_to_value.fixed_installment;
    let cam = solve_for(rules, applicant, &program, AmortizationSystem::ConstantAmortization, cam_ltv);
    let fi = solve_for(rules, applicant, &program, AmortizationSystem::FixedInstallment, fi_ltv);

    let price = applicant.property_price();
    if let Some(fraction) = rules.policy.min_financed_fraction {
        if cam.principal < price * fraction {
            return Outcome::Declined(EligibilityFailure::new(
                DeclineReason::FinancingBelowMinimum,
            ));
        }
    }

    Outcome::Approved(SimulationResult {
        program: program.tier.label(),
        program_class: program.tier.class,
        term_months: program.term_months(),
        annual_rate_percent: program.annual_rate,
        subsidy,
        constant_amortization: branch(price, subsidy, cam_ltv, cam, true),
        fixed_installment: branch(price, subsidy, fi_ltv, fi, false),
        documentation_cost: price * rules.policy.documentation_cost_rate,
    })
}

fn solve_for(
    rules: &RuleBook,
    applicant: &Applicant,
    program: &ResolvedProgram<'_>,
    system: AmortizationSystem,
    loan_to_value: f64,
) -> AffordabilityResult {
    solve_max_principal(
        SolveConfig {
            system,
            property_price: applicant.property_price(),
            monthly_income: applicant.monthly_income(),
            term_months: program.term_months(),
            annual_rate_percent: program.annual_rate,
            loan_to_value,
            age_years: applicant.age_years(),
        },
        &rules.policy,
    )
}

fn branch(
    price: f64,
    subsidy: f64,
    loan_to_value: f64,
    solved: AffordabilityResult,
    report_last: bool,
) -> FinancingBranch {
    FinancingBranch {
        loan_to_value,
        down_payment: (price - solved.principal - subsidy).max(0.0),
        financed_principal: solved.principal,
        first_payment: solved.first_payment,
        last_payment: report_last.then_some(solved.last_payment),
    }
}

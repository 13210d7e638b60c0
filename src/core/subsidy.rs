use super::rules::{SubsidyBreakpoint, SubsidyTable};
use super::types::PropertyCategory;

/// Raw interpolated curve value before cap, category multiplier and flooring.
pub fn interpolate(breakpoints: &[SubsidyBreakpoint], monthly_income: f64) -> f64 {
    let Some(last) = breakpoints.last() else {
        return 0.0;
    };
    if breakpoints.len() < 2 {
        return last.subsidy;
    }
    if monthly_income >= last.income {
        return last.subsidy;
    }

    // Incomes below the first breakpoint extrapolate the first segment.
    let segment = breakpoints
        .windows(2)
        .find(|pair| monthly_income <= pair[1].income)
        .unwrap_or(&breakpoints[breakpoints.len() - 2..]);
    let (lo, hi) = (segment[0], segment[1]);
    let slope = (hi.subsidy - lo.subsidy) / (hi.income - lo.income);
    lo.subsidy + slope * (monthly_income - lo.income)
}

/// Subsidy for a subsidy-eligible tier. Callers gate on the tier; this gates
/// on the savings account and the income ceiling.
pub fn subsidy_for(
    table: &SubsidyTable,
    monthly_income: f64,
    category: PropertyCategory,
    has_savings_account: bool,
) -> f64 {
    if !has_savings_account || monthly_income > table.income_ceiling {
        return 0.0;
    }

    let capped = interpolate(&table.breakpoints, monthly_income).min(table.hard_cap);
    let scaled = capped * table.multiplier.get(category);
    scaled.floor().max(0.0)
}

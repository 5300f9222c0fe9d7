use serde::Serialize;
use thiserror::Error;

use super::{AffordabilityTier, Inputs, compute};

#[derive(Debug, Error, PartialEq)]
pub enum SolveError {
    #[error("search bounds must be finite and >= 0")]
    InvalidBounds,
    #[error("search_max must be greater than search_min")]
    EmptySearchRange,
    #[error("tolerance must be > 0")]
    InvalidTolerance,
    #[error("max_iterations must be > 0")]
    NoIterations,
}

#[derive(Debug, Clone, Copy)]
pub struct PriceSolveConfig {
    pub target_tier: AffordabilityTier,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_price: f64,
    pub tier: AffordabilityTier,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSolveResult {
    pub target_tier: AffordabilityTier,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_price: Option<f64>,
    pub achieved_tier: Option<AffordabilityTier>,
    pub monthly_payment: Option<f64>,
    pub iterations: Vec<PriceSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

/// Highest purchase price, other inputs held fixed, whose tier is at least
/// `config.target_tier`. A dearer property never rates better, so bisection
/// on the price is sound.
///
/// Prices below the one the equity fully pays for (loan below zero) are never
/// candidates; `search_min` is raised to that price.
pub fn solve_max_purchase_price(
    inputs: &Inputs,
    config: PriceSolveConfig,
) -> Result<PriceSolveResult, SolveError> {
    validate_config(config)?;

    let lower = config.search_min.max(equity_floor(inputs));
    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let mut solved_price = None;
    let mut converged = false;
    let feasible;
    let message;

    if lower >= config.search_max {
        feasible = false;
        message = "Equity exceeds the total cost across the whole price range.".to_string();
    } else if !meets_target(inputs, config, lower) {
        feasible = false;
        message = "Target tier is out of reach even at the lower price bound.".to_string();
    } else if meets_target(inputs, config, config.search_max) {
        solved_price = Some(config.search_max);
        converged = true;
        feasible = true;
        message =
            "Upper price bound still meets the target; increase search max for a higher price."
                .to_string();
    } else {
        let mut lo = lower;
        let mut hi = config.search_max;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let tier = tier_at_price(inputs, mid);
            iterations.push(PriceSolveIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_price: mid,
                tier,
            });

            if tier <= config.target_tier {
                lo = mid;
            } else {
                hi = mid;
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                break;
            }
        }
        solved_price = Some(lo);
        feasible = true;
        message = if converged {
            "Solved maximum purchase price.".to_string()
        } else {
            "Reached max iterations before tolerance was met; returning best estimate."
                .to_string()
        };
    }

    let solved = solved_price.map(|price| compute(&with_price(inputs, price)));

    Ok(PriceSolveResult {
        target_tier: config.target_tier,
        search_min: lower,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_price,
        achieved_tier: solved.as_ref().map(|outputs| outputs.tier),
        monthly_payment: solved.as_ref().map(|outputs| outputs.monthly_payment),
        iterations,
        converged,
        feasible,
        message,
    })
}

fn with_price(inputs: &Inputs, purchase_price: f64) -> Inputs {
    Inputs {
        purchase_price,
        ..inputs.clone()
    }
}

// Price at which the equity exactly covers purchase price plus incidentals.
fn equity_floor(inputs: &Inputs) -> f64 {
    inputs.equity / (1.0 + inputs.incidental_cost_rate / 100.0)
}

fn tier_at_price(inputs: &Inputs, purchase_price: f64) -> AffordabilityTier {
    compute(&with_price(inputs, purchase_price)).tier
}

fn meets_target(inputs: &Inputs, config: PriceSolveConfig, purchase_price: f64) -> bool {
    let outputs = compute(&with_price(inputs, purchase_price));
    let loan_slack = 1e-9 * outputs.total_cost.abs().max(1.0);
    outputs.loan_amount >= -loan_slack && outputs.tier <= config.target_tier
}

fn validate_config(config: PriceSolveConfig) -> Result<(), SolveError> {
    if !config.search_min.is_finite() || !config.search_max.is_finite() || config.search_min < 0.0
    {
        return Err(SolveError::InvalidBounds);
    }
    if config.search_max <= config.search_min {
        return Err(SolveError::EmptySearchRange);
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(SolveError::InvalidTolerance);
    }
    if config.max_iterations == 0 {
        return Err(SolveError::NoIterations);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    // Zero interest and no incidental costs keep the payment linear in the
    // price: payment = (price - equity) / 360.
    fn deterministic_inputs() -> Inputs {
        Inputs {
            purchase_price: 0.0,
            equity: 100_000.0,
            interest_rate: 0.0,
            amortization_rate: 0.0,
            monthly_net_income: 3_600.0,
            current_rent: 0.0,
            loan_term_years: 30,
            incidental_cost_rate: 0.0,
            monthly_living_costs: 0.0,
        }
    }

    fn solve_config(target_tier: AffordabilityTier, search_max: f64) -> PriceSolveConfig {
        PriceSolveConfig {
            target_tier,
            search_min: 100_000.0,
            search_max,
            tolerance: 1.0,
            max_iterations: 64,
        }
    }

    #[test]
    fn max_price_solver_finds_marginal_limit() {
        // Marginal needs ratio < 45% (payment < 1620) and equity >= 10%
        // (price <= 1_000_000). The payment limit binds first at 683_200.
        let inputs = deterministic_inputs();
        let config = solve_config(AffordabilityTier::Marginal, 2_000_000.0);

        let result = solve_max_purchase_price(&inputs, config).expect("must solve");
        assert!(result.feasible);
        assert!(result.converged);
        let price = result.solved_price.expect("price expected");
        assert_close(price, 683_200.0, config.tolerance + 0.5);
        assert!(price < 683_200.0);
        assert_eq!(result.achieved_tier, Some(AffordabilityTier::Marginal));
        assert!(!result.iterations.is_empty());
    }

    #[test]
    fn max_price_solver_finds_excellent_limit() {
        // Excellent needs equity >= 20%: price <= 500_000. Payment at that
        // price is 1111.11, ratio 30.9%, so the ratio limit binds at 488_800.
        let inputs = deterministic_inputs();
        let config = solve_config(AffordabilityTier::Excellent, 2_000_000.0);

        let result = solve_max_purchase_price(&inputs, config).expect("must solve");
        let price = result.solved_price.expect("price expected");
        assert_close(price, 488_800.0, config.tolerance + 0.5);
        assert_eq!(result.achieved_tier, Some(AffordabilityTier::Excellent));
    }

    #[test]
    fn max_price_solver_reports_upper_bound_when_still_feasible() {
        let inputs = deterministic_inputs();
        let config = solve_config(AffordabilityTier::Risky, 5_000_000.0);

        let result = solve_max_purchase_price(&inputs, config).expect("must solve");
        assert!(result.feasible);
        assert_eq!(result.solved_price, Some(5_000_000.0));
        assert!(result.iterations.is_empty());
    }

    #[test]
    fn max_price_solver_reports_infeasible_when_lower_bound_fails() {
        let mut inputs = deterministic_inputs();
        inputs.monthly_net_income = 100.0;
        let config = solve_config(AffordabilityTier::Good, 1_000_000.0);

        let result = solve_max_purchase_price(&inputs, config).expect("must return result");
        assert!(!result.feasible);
        assert!(result.solved_price.is_none());
        assert!(result.achieved_tier.is_none());
    }

    #[test]
    fn max_price_solver_rejects_invalid_config() {
        let inputs = deterministic_inputs();

        let mut bad = solve_config(AffordabilityTier::Good, 50_000.0);
        assert_eq!(
            solve_max_purchase_price(&inputs, bad).expect_err("empty range"),
            SolveError::EmptySearchRange
        );

        bad = solve_config(AffordabilityTier::Good, 1_000_000.0);
        bad.tolerance = 0.0;
        assert_eq!(
            solve_max_purchase_price(&inputs, bad).expect_err("zero tolerance"),
            SolveError::InvalidTolerance
        );

        bad = solve_config(AffordabilityTier::Good, f64::INFINITY);
        assert_eq!(
            solve_max_purchase_price(&inputs, bad).expect_err("infinite bound"),
            SolveError::InvalidBounds
        );
    }

    #[test]
    fn max_price_solver_never_returns_price_below_equity() {
        // Below ~63_636 the equity would exceed the total cost and the
        // payment turns negative. At the equity-covered price the buffer is
        // only 300, so Excellent is out of reach.
        let mut inputs = deterministic_inputs();
        inputs.equity = 70_000.0;
        inputs.interest_rate = 4.0;
        inputs.incidental_cost_rate = 10.0;
        inputs.monthly_net_income = 1_000.0;
        inputs.monthly_living_costs = 700.0;
        let mut config = solve_config(AffordabilityTier::Excellent, 5_000_000.0);
        config.search_min = 0.0;

        let result = solve_max_purchase_price(&inputs, config).expect("must return result");
        assert!(!result.feasible);
        assert!(result.solved_price.is_none());
        assert_close(result.search_min, 70_000.0 / 1.1, 1e-6);
    }

    #[test]
    fn max_price_solver_lifts_lower_bound_to_equity_floor() {
        let inputs = deterministic_inputs();
        let mut config = solve_config(AffordabilityTier::Marginal, 2_000_000.0);
        config.search_min = 0.0;

        let result = solve_max_purchase_price(&inputs, config).expect("must solve");
        assert_close(result.search_min, 100_000.0, 1e-9);
        assert!(result.iterations.iter().all(|it| it.lower_bound >= 100_000.0));
        let price = result.solved_price.expect("price expected");
        assert_close(price, 683_200.0, config.tolerance + 0.5);
    }

    #[test]
    fn max_price_solver_reports_infeasible_when_range_is_below_equity() {
        let inputs = deterministic_inputs();
        let mut config = solve_config(AffordabilityTier::Risky, 90_000.0);
        config.search_min = 0.0;

        let result = solve_max_purchase_price(&inputs, config).expect("must return result");
        assert!(!result.feasible);
        assert!(result.solved_price.is_none());
    }
}

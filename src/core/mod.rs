mod engine;
mod solver;
mod types;

pub use engine::{annuity_payment, classify_tier, compute};
pub use solver::{
    PriceSolveConfig, PriceSolveIteration, PriceSolveResult, SolveError, solve_max_purchase_price,
};
pub use types::{AffordabilityTier, Inputs, Outputs, RentComparison};

use serde::Serialize;

/// One calculation's inputs. Amounts are in a single currency (monthly where
/// named so); rates are percent, e.g. `4.0` for 4% p.a.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub purchase_price: f64,
    pub equity: f64,
    pub interest_rate: f64,
    pub amortization_rate: f64,
    pub monthly_net_income: f64,
    pub current_rent: f64,
    pub loan_term_years: u32,
    pub incidental_cost_rate: f64,
    pub monthly_living_costs: f64,
}

/// Qualitative affordability rating. Variants are ordered best to worst, so
/// `tier <= target` reads as "at least as good as `target`".
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AffordabilityTier {
    Excellent,
    Good,
    Marginal,
    Risky,
}

impl AffordabilityTier {
    pub fn headline(self) -> &'static str {
        match self {
            AffordabilityTier::Excellent => {
                "Very good: the payment sits well below 30% of your income with solid equity and reserves."
            }
            AffordabilityTier::Good => {
                "Acceptable: the payment stays within the recommended 40% of your income."
            }
            AffordabilityTier::Marginal => {
                "Tight: the financing works on paper but leaves little room for surprises."
            }
            AffordabilityTier::Risky => {
                "Caution: the payment or the equity position is outside safe limits."
            }
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RentComparison {
    Higher,
    Lower,
    Equal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outputs {
    pub incidental_costs: f64,
    pub total_cost: f64,
    pub loan_amount: f64,
    pub equity_ratio: f64,
    pub monthly_rate: f64,
    pub monthly_payment: f64,
    pub affordability_ratio: f64,
    pub rent_difference: f64,
    pub rent_comparison: RentComparison,
    pub disposable_income: f64,
    pub initial_amortization_payment: f64,
    pub payoff_years: Option<f64>,
    pub tier: AffordabilityTier,
    pub headline: &'static str,
    pub low_equity_warning: bool,
    pub low_buffer_warning: bool,
    pub tips: Vec<&'static str>,
}

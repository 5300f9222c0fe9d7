use super::types::{AffordabilityTier, Inputs, Outputs, RentComparison};

const EXCELLENT_MAX_RATIO: f64 = 30.0;
const EXCELLENT_MIN_EQUITY: f64 = 20.0;
const EXCELLENT_MIN_DISPOSABLE: f64 = 500.0;

const GOOD_MAX_RATIO: f64 = 40.0;
const GOOD_MIN_EQUITY: f64 = 15.0;
const GOOD_MIN_DISPOSABLE: f64 = 200.0;

const MARGINAL_MAX_RATIO: f64 = 45.0;
const MARGINAL_MIN_EQUITY: f64 = 10.0;

const LOW_EQUITY_THRESHOLD: f64 = 20.0;
const LOW_BUFFER_THRESHOLD: f64 = 200.0;

const BURDEN_TIP_RATIO: f64 = 35.0;
const EQUITY_TIP_RATIO: f64 = 20.0;

const BURDEN_TIPS: [&str; 2] = [
    "Consider a longer loan term or a cheaper property to bring the monthly payment down.",
    "Check whether additional income or a co-borrower can strengthen the financing.",
];

const EQUITY_TIPS: [&str; 2] = [
    "Build up more equity before buying; lenders offer noticeably better rates from 20% upwards.",
    "Check whether savings plans, home-ownership grants or family support can add equity.",
];

const BASELINE_TIPS: [&str; 3] = [
    "Compare offers from several lenders; small rate differences add up over the loan term.",
    "Keep an emergency reserve of three to six months of expenses after the purchase.",
    "Budget roughly 1-2% of the purchase price per year for maintenance.",
];

/// Runs one full affordability pass. Every derived value is recomputed from
/// `inputs`; nothing is cached between calls.
///
/// `loan_term_years` must be positive; terms too large to count in months
/// saturate. Degenerate inputs (zero income, equity above the total cost)
/// yield infinite or negative figures rather than errors.
pub fn compute(inputs: &Inputs) -> Outputs {
    let incidental_costs = inputs.purchase_price * inputs.incidental_cost_rate / 100.0;
    let total_cost = inputs.purchase_price + incidental_costs;
    let loan_amount = total_cost - inputs.equity;
    let equity_ratio = inputs.equity / total_cost * 100.0;
    let monthly_rate = inputs.interest_rate / 100.0 / 12.0;

    let installments = inputs.loan_term_years.saturating_mul(12);
    let monthly_payment = annuity_payment(loan_amount, monthly_rate, installments);

    let affordability_ratio = monthly_payment / inputs.monthly_net_income * 100.0;
    let rent_difference = monthly_payment - inputs.current_rent;
    let disposable_income =
        inputs.monthly_net_income - monthly_payment - inputs.monthly_living_costs;

    let initial_amortization_payment =
        loan_amount * (inputs.interest_rate + inputs.amortization_rate) / 100.0 / 12.0;
    let payoff_years = payoff_months(loan_amount, monthly_rate, initial_amortization_payment)
        .map(|months| months / 12.0);

    let tier = classify_tier(affordability_ratio, equity_ratio, disposable_income);

    Outputs {
        incidental_costs,
        total_cost,
        loan_amount,
        equity_ratio,
        monthly_rate,
        monthly_payment,
        affordability_ratio,
        rent_difference,
        rent_comparison: compare_to_rent(rent_difference),
        disposable_income,
        initial_amortization_payment,
        payoff_years,
        tier,
        headline: tier.headline(),
        low_equity_warning: equity_ratio < LOW_EQUITY_THRESHOLD,
        low_buffer_warning: disposable_income < LOW_BUFFER_THRESHOLD,
        tips: select_tips(affordability_ratio, equity_ratio),
    }
}

/// Level monthly payment that clears `loan_amount` after `installments`
/// payments. Falls back to straight-line repayment when the rate is zero.
pub fn annuity_payment(loan_amount: f64, monthly_rate: f64, installments: u32) -> f64 {
    let n = installments as f64;
    if monthly_rate > 0.0 {
        let growth = (1.0 + monthly_rate).powf(n);
        loan_amount * (monthly_rate * growth) / (growth - 1.0)
    } else {
        loan_amount / n
    }
}

/// First matching row wins; ratio limits are strict.
pub fn classify_tier(
    affordability_ratio: f64,
    equity_ratio: f64,
    disposable_income: f64,
) -> AffordabilityTier {
    if affordability_ratio < EXCELLENT_MAX_RATIO
        && equity_ratio >= EXCELLENT_MIN_EQUITY
        && disposable_income > EXCELLENT_MIN_DISPOSABLE
    {
        AffordabilityTier::Excellent
    } else if affordability_ratio < GOOD_MAX_RATIO
        && equity_ratio >= GOOD_MIN_EQUITY
        && disposable_income > GOOD_MIN_DISPOSABLE
    {
        AffordabilityTier::Good
    } else if affordability_ratio < MARGINAL_MAX_RATIO && equity_ratio >= MARGINAL_MIN_EQUITY {
        AffordabilityTier::Marginal
    } else {
        AffordabilityTier::Risky
    }
}

fn select_tips(affordability_ratio: f64, equity_ratio: f64) -> Vec<&'static str> {
    let mut tips =
        Vec::with_capacity(BURDEN_TIPS.len() + EQUITY_TIPS.len() + BASELINE_TIPS.len());
    if affordability_ratio > BURDEN_TIP_RATIO {
        tips.extend(BURDEN_TIPS);
    }
    if equity_ratio < EQUITY_TIP_RATIO {
        tips.extend(EQUITY_TIPS);
    }
    tips.extend(BASELINE_TIPS);
    tips
}

fn compare_to_rent(rent_difference: f64) -> RentComparison {
    if rent_difference > 0.0 {
        RentComparison::Higher
    } else if rent_difference < 0.0 {
        RentComparison::Lower
    } else {
        RentComparison::Equal
    }
}

// Months until a fixed `payment` clears `loan_amount`; None if it never does.
fn payoff_months(loan_amount: f64, monthly_rate: f64, payment: f64) -> Option<f64> {
    if loan_amount <= 0.0 {
        return Some(0.0);
    }
    if !payment.is_finite() || payment <= 0.0 {
        return None;
    }
    if monthly_rate <= 0.0 {
        return Some(loan_amount / payment);
    }

    let interest_share = monthly_rate * loan_amount / payment;
    if interest_share >= 1.0 - 1e-12 {
        return None;
    }
    Some(-(1.0 - interest_share).ln() / monthly_rate.ln_1p())
}

use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    AffordabilityTier, Inputs, Outputs, PriceSolveConfig, PriceSolveResult, SolveError, compute,
    solve_max_purchase_price,
};
use crate::telemetry::{self, TelemetryError};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const MIN_LOAN_TERM_YEARS: u32 = 10;
const MAX_LOAN_TERM_YEARS: u32 = 40;
const SOLVE_MAX_ITERATIONS: u32 = 64;

/// A value outside the range the calculator accepts. Messages name the CLI
/// flag so the same text reads well on the command line and in API errors.
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("--{flag} must be a finite number >= 0")]
    Negative { flag: &'static str },
    #[error("--{flag} must be > 0")]
    NotPositive { flag: &'static str },
    #[error("--{flag} must be between {min} and {max}")]
    OutOfRange {
        flag: &'static str,
        min: f64,
        max: f64,
    },
    #[error("--equity must not exceed the total cost of {total_cost:.2}")]
    EquityExceedsTotalCost { total_cost: f64 },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to render report: {0}")]
    Render(#[from] serde_json::Error),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliTier {
    Excellent,
    Good,
    Marginal,
    Risky,
}

impl From<CliTier> for AffordabilityTier {
    fn from(value: CliTier) -> Self {
        match value {
            CliTier::Excellent => AffordabilityTier::Excellent,
            CliTier::Good => AffordabilityTier::Good,
            CliTier::Marginal => AffordabilityTier::Marginal,
            CliTier::Risky => AffordabilityTier::Risky,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ApiTier {
    #[serde(alias = "Excellent", alias = "very-good")]
    Excellent,
    #[serde(alias = "Good", alias = "acceptable")]
    Good,
    #[serde(alias = "Marginal", alias = "tight")]
    Marginal,
    #[serde(alias = "Risky")]
    Risky,
}

impl From<ApiTier> for CliTier {
    fn from(value: ApiTier) -> Self {
        match value {
            ApiTier::Excellent => CliTier::Excellent,
            ApiTier::Good => CliTier::Good,
            ApiTier::Marginal => CliTier::Marginal,
            ApiTier::Risky => CliTier::Risky,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CalculatePayload {
    purchase_price: Option<f64>,
    equity: Option<f64>,
    interest_rate: Option<f64>,
    amortization_rate: Option<f64>,
    monthly_net_income: Option<f64>,
    current_rent: Option<f64>,
    loan_term_years: Option<u32>,
    incidental_cost_rate: Option<f64>,
    monthly_living_costs: Option<f64>,

    target_tier: Option<ApiTier>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
}

#[derive(Parser, Debug)]
#[command(
    name = "affordability",
    about = "Property affordability calculator (annuity payment, burden ratio and risk tier)"
)]
struct Cli {
    #[arg(long, default_value_t = 400_000.0, help = "Purchase price of the property")]
    purchase_price: f64,
    #[arg(long, default_value_t = 70_000.0, help = "Equity brought into the purchase")]
    equity: f64,
    #[arg(long, default_value_t = 4.0, help = "Effective annual interest rate in percent")]
    interest_rate: f64,
    #[arg(
        long,
        default_value_t = 2.0,
        help = "Initial annual amortization in percent of the loan"
    )]
    amortization_rate: f64,
    #[arg(long, default_value_t = 4_000.0, help = "Monthly net household income")]
    monthly_net_income: f64,
    #[arg(long, default_value_t = 1_200.0, help = "Current monthly rent")]
    current_rent: f64,
    #[arg(long, default_value_t = 30, help = "Loan term in years (10-40)")]
    loan_term_years: u32,
    #[arg(
        long,
        default_value_t = 10.0,
        help = "Incidental purchase costs (tax, notary, agent) in percent of the price"
    )]
    incidental_cost_rate: f64,
    #[arg(long, default_value_t = 2_000.0, help = "Monthly living costs excluding rent")]
    monthly_living_costs: f64,
    #[arg(
        long,
        value_enum,
        help = "Also solve for the highest purchase price that still reaches this tier"
    )]
    max_price_for: Option<CliTier>,
    #[arg(
        long,
        default_value_t = 5_000_000.0,
        help = "Upper purchase price searched by --max-price-for"
    )]
    search_max: f64,
    #[arg(
        long,
        default_value_t = 100.0,
        help = "Price tolerance for --max-price-for"
    )]
    tolerance: f64,
    #[arg(
        long,
        default_value_t = telemetry::DEFAULT_LOG_LEVEL.to_string(),
        help = "Log filter used when RUST_LOG is unset"
    )]
    log_level: String,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: Inputs,
    solve: Option<PriceSolveConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CliReport {
    calculation: Outputs,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_price: Option<PriceSolveResult>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_inputs(cli: &Cli) -> Result<Inputs, InputError> {
    for (flag, value) in [
        ("equity", cli.equity),
        ("interest-rate", cli.interest_rate),
        ("amortization-rate", cli.amortization_rate),
        ("current-rent", cli.current_rent),
        ("monthly-living-costs", cli.monthly_living_costs),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(InputError::Negative { flag });
        }
    }

    for (flag, value) in [
        ("purchase-price", cli.purchase_price),
        ("monthly-net-income", cli.monthly_net_income),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(InputError::NotPositive { flag });
        }
    }

    if !(MIN_LOAN_TERM_YEARS..=MAX_LOAN_TERM_YEARS).contains(&cli.loan_term_years) {
        return Err(InputError::OutOfRange {
            flag: "loan-term-years",
            min: MIN_LOAN_TERM_YEARS as f64,
            max: MAX_LOAN_TERM_YEARS as f64,
        });
    }

    if !(0.0..=100.0).contains(&cli.incidental_cost_rate) {
        return Err(InputError::OutOfRange {
            flag: "incidental-cost-rate",
            min: 0.0,
            max: 100.0,
        });
    }

    let total_cost = cli.purchase_price + cli.purchase_price * cli.incidental_cost_rate / 100.0;
    if cli.equity > total_cost {
        return Err(InputError::EquityExceedsTotalCost { total_cost });
    }

    Ok(Inputs {
        purchase_price: cli.purchase_price,
        equity: cli.equity,
        interest_rate: cli.interest_rate,
        amortization_rate: cli.amortization_rate,
        monthly_net_income: cli.monthly_net_income,
        current_rent: cli.current_rent,
        loan_term_years: cli.loan_term_years,
        incidental_cost_rate: cli.incidental_cost_rate,
        monthly_living_costs: cli.monthly_living_costs,
    })
}

fn build_solve_config(cli: &Cli) -> Option<PriceSolveConfig> {
    cli.max_price_for.map(|tier| PriceSolveConfig {
        target_tier: tier.into(),
        search_min: 0.0,
        search_max: cli.search_max,
        tolerance: cli.tolerance,
        max_iterations: SOLVE_MAX_ITERATIONS,
    })
}

/// Parses the process arguments, runs one calculation and prints the JSON
/// report to stdout.
pub fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();
    telemetry::init(&cli.log_level)?;

    let report = build_cli_report(&cli)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn build_cli_report(cli: &Cli) -> Result<CliReport, CliError> {
    let inputs = build_inputs(cli)?;
    let calculation = compute(&inputs);
    debug!(
        tier = ?calculation.tier,
        affordability_ratio = calculation.affordability_ratio,
        "calculated affordability"
    );

    let max_price = match build_solve_config(cli) {
        Some(config) => Some(solve_max_purchase_price(&inputs, config)?),
        None => None,
    };

    Ok(CliReport {
        calculation,
        max_price,
    })
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/calculate",
            get(calculate_get_handler).post(calculate_post_handler),
        )
        .route(
            "/api/max-price",
            get(max_price_get_handler).post(max_price_post_handler),
        )
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "affordability HTTP API listening");
    info!("local access: http://127.0.0.1:{port}/");

    axum::serve(listener, router()).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn calculate_get_handler(
    payload: Result<Query<CalculatePayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => calculate_handler_impl(payload),
        Err(rejection) => payload_rejection_response(rejection.body_text()),
    }
}

async fn calculate_post_handler(
    payload: Result<Json<CalculatePayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => calculate_handler_impl(payload),
        Err(rejection) => payload_rejection_response(rejection.body_text()),
    }
}

async fn max_price_get_handler(
    payload: Result<Query<CalculatePayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => max_price_handler_impl(payload),
        Err(rejection) => payload_rejection_response(rejection.body_text()),
    }
}

async fn max_price_post_handler(
    payload: Result<Json<CalculatePayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => max_price_handler_impl(payload),
        Err(rejection) => payload_rejection_response(rejection.body_text()),
    }
}

fn payload_rejection_response(detail: String) -> Response {
    warn!(error = %detail, "rejected malformed payload");
    error_response(
        StatusCode::BAD_REQUEST,
        &format!("Invalid request payload: {detail}"),
    )
}

fn calculate_handler_impl(payload: CalculatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "rejected calculation request");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    let outputs = compute(&request.inputs);
    debug!(
        tier = ?outputs.tier,
        affordability_ratio = outputs.affordability_ratio,
        "calculated affordability"
    );
    json_response(StatusCode::OK, outputs)
}

fn max_price_handler_impl(payload: CalculatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "rejected max-price request");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };
    let Some(config) = request.solve else {
        return error_response(StatusCode::BAD_REQUEST, "targetTier is required");
    };

    match solve_max_purchase_price(&request.inputs, config) {
        Ok(result) => {
            debug!(
                target_tier = ?result.target_tier,
                solved_price = ?result.solved_price,
                iterations = result.iterations.len(),
                "solved maximum purchase price"
            );
            json_response(StatusCode::OK, result)
        }
        Err(err) => {
            warn!(error = %err, "rejected max-price configuration");
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<CalculatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload).map_err(|e| e.to_string())
}

fn api_request_from_payload(payload: CalculatePayload) -> Result<ApiRequest, InputError> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.purchase_price {
        cli.purchase_price = v;
    }
    if let Some(v) = payload.equity {
        cli.equity = v;
    }
    if let Some(v) = payload.interest_rate {
        cli.interest_rate = v;
    }
    if let Some(v) = payload.amortization_rate {
        cli.amortization_rate = v;
    }
    if let Some(v) = payload.monthly_net_income {
        cli.monthly_net_income = v;
    }
    if let Some(v) = payload.current_rent {
        cli.current_rent = v;
    }
    if let Some(v) = payload.loan_term_years {
        cli.loan_term_years = v;
    }
    if let Some(v) = payload.incidental_cost_rate {
        cli.incidental_cost_rate = v;
    }
    if let Some(v) = payload.monthly_living_costs {
        cli.monthly_living_costs = v;
    }

    if let Some(v) = payload.target_tier {
        cli.max_price_for = Some(v.into());
    }
    if let Some(v) = payload.search_max {
        cli.search_max = v;
    }
    if let Some(v) = payload.tolerance {
        cli.tolerance = v;
    }

    let inputs = build_inputs(&cli)?;
    Ok(ApiRequest {
        inputs,
        solve: build_solve_config(&cli),
    })
}

fn default_cli_for_api() -> Cli {
    Cli {
        purchase_price: 400_000.0,
        equity: 70_000.0,
        interest_rate: 4.0,
        amortization_rate: 2.0,
        monthly_net_income: 4_000.0,
        current_rent: 1_200.0,
        loan_term_years: 30,
        incidental_cost_rate: 10.0,
        monthly_living_costs: 2_000.0,
        max_price_for: None,
        search_max: 5_000_000.0,
        tolerance: 100.0,
        log_level: telemetry::DEFAULT_LOG_LEVEL.to_string(),
    }
}

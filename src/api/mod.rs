use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{self, ContributionTiming, DepletionLimits, InvalidArgument, SolveConfig};
use crate::report::{
    DepletionRequest, FixedGrowthRequest, VariableGrowthRequest, WithdrawalRequest,
    depletion_report, fixed_growth_report, variable_growth_report, withdrawal_report,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiContributionTiming {
    #[serde(alias = "start", alias = "startOfPeriod", alias = "start_of_period")]
    StartOfPeriod,
    #[serde(alias = "end", alias = "endOfPeriod", alias = "end_of_period")]
    EndOfPeriod,
}

impl From<ApiContributionTiming> for ContributionTiming {
    fn from(value: ApiContributionTiming) -> Self {
        match value {
            ApiContributionTiming::StartOfPeriod => ContributionTiming::StartOfPeriod,
            ApiContributionTiming::EndOfPeriod => ContributionTiming::EndOfPeriod,
        }
    }
}

/// Rates in every payload are percentages (5 means 5%).
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FixedPayload {
    contribution: Option<f64>,
    rate: Option<f64>,
    years: Option<f64>,
    timing: Option<ApiContributionTiming>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct VariablePayload {
    initial: Option<f64>,
    rates: Vec<f64>,
}

/// Query-string form of [`VariablePayload`]: `rates=5,3,-2`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct VariableQuery {
    initial: Option<f64>,
    rates: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DepletionPayload {
    balance: Option<f64>,
    withdrawal: Option<f64>,
    rate: Option<f64>,
    max_periods: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct OptimizePayload {
    balance: Option<f64>,
    rate: Option<f64>,
    target_years: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<f64>,
    max_periods: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/fixed", get(fixed_get_handler).post(fixed_post_handler))
        .route(
            "/api/variable",
            get(variable_get_handler).post(variable_post_handler),
        )
        .route(
            "/api/depletion",
            get(depletion_get_handler).post(depletion_post_handler),
        )
        .route(
            "/api/optimize",
            get(optimize_get_handler).post(optimize_post_handler),
        )
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "projection HTTP API listening");

    axum::serve(listener, router()).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

// Extractor rejections are taken as values so malformed bodies and query
// strings answer with the same `{"error": ...}` 400 as invalid arguments.

async fn fixed_get_handler(payload: Result<Query<FixedPayload>, QueryRejection>) -> Response {
    fixed_handler_impl(from_query(payload))
}

async fn fixed_post_handler(payload: Result<Json<FixedPayload>, JsonRejection>) -> Response {
    fixed_handler_impl(from_json(payload))
}

async fn variable_get_handler(query: Result<Query<VariableQuery>, QueryRejection>) -> Response {
    variable_handler_impl(from_query(query).and_then(variable_payload_from_query))
}

async fn variable_post_handler(payload: Result<Json<VariablePayload>, JsonRejection>) -> Response {
    variable_handler_impl(from_json(payload))
}

async fn depletion_get_handler(
    payload: Result<Query<DepletionPayload>, QueryRejection>,
) -> Response {
    depletion_handler_impl(from_query(payload))
}

async fn depletion_post_handler(
    payload: Result<Json<DepletionPayload>, JsonRejection>,
) -> Response {
    depletion_handler_impl(from_json(payload))
}

async fn optimize_get_handler(payload: Result<Query<OptimizePayload>, QueryRejection>) -> Response {
    optimize_handler_impl(from_query(payload))
}

async fn optimize_post_handler(payload: Result<Json<OptimizePayload>, JsonRejection>) -> Response {
    optimize_handler_impl(from_json(payload))
}

fn from_query<T>(extracted: Result<Query<T>, QueryRejection>) -> Result<T, String> {
    extracted
        .map(|Query(payload)| payload)
        .map_err(|rejection| rejection.body_text())
}

fn from_json<T>(extracted: Result<Json<T>, JsonRejection>) -> Result<T, String> {
    extracted
        .map(|Json(payload)| payload)
        .map_err(|rejection| rejection.body_text())
}

fn fixed_handler_impl(payload: Result<FixedPayload, String>) -> Response {
    let result = payload
        .and_then(fixed_request_from_payload)
        .and_then(|request| fixed_growth_report(request).map_err(|e| e.to_string()));
    report_response(result)
}

fn variable_handler_impl(payload: Result<VariablePayload, String>) -> Response {
    let result = payload
        .and_then(variable_request_from_payload)
        .and_then(|request| variable_growth_report(&request).map_err(|e| e.to_string()));
    report_response(result)
}

fn depletion_handler_impl(payload: Result<DepletionPayload, String>) -> Response {
    let result = payload
        .and_then(depletion_request_from_payload)
        .and_then(|request| depletion_report(request).map_err(|e| e.to_string()));
    report_response(result)
}

fn optimize_handler_impl(payload: Result<OptimizePayload, String>) -> Response {
    let result = payload
        .and_then(withdrawal_request_from_payload)
        .and_then(|request| withdrawal_report(request).map_err(|e| e.to_string()));
    report_response(result)
}

fn report_response<T: Serialize>(result: Result<T, String>) -> Response {
    match result {
        Ok(report) => json_response(StatusCode::OK, report),
        Err(msg) => {
            warn!(error = %msg, "rejected projection request");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn required(name: &str, value: Option<f64>) -> Result<f64, String> {
    value.ok_or_else(|| format!("{name} is required"))
}

fn percent_to_rate(percent: f64) -> f64 {
    percent / 100.0
}

fn periods(name: &'static str, value: f64) -> Result<u32, String> {
    core::period_count(name, value).map_err(|e| e.to_string())
}

fn depletion_limits(max_periods: Option<f64>) -> Result<DepletionLimits, String> {
    match max_periods {
        Some(v) => Ok(DepletionLimits {
            max_periods: periods("maxPeriods", v)?,
        }),
        None => Ok(DepletionLimits::default()),
    }
}

fn fixed_request_from_payload(payload: FixedPayload) -> Result<FixedGrowthRequest, String> {
    Ok(FixedGrowthRequest {
        contribution: required("contribution", payload.contribution)?,
        rate: percent_to_rate(required("rate", payload.rate)?),
        periods: periods("years", required("years", payload.years)?)?,
        timing: payload.timing.map(Into::into).unwrap_or_default(),
    })
}

fn variable_payload_from_query(query: VariableQuery) -> Result<VariablePayload, String> {
    let rates = match query.rates.as_deref() {
        None | Some("") => Vec::new(),
        Some(raw) => raw
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .map_err(|_| format!("rates must be numbers, found `{}`", part.trim()))
            })
            .collect::<Result<Vec<_>, _>>()?,
    };
    Ok(VariablePayload {
        initial: query.initial,
        rates,
    })
}

fn variable_request_from_payload(
    payload: VariablePayload,
) -> Result<VariableGrowthRequest, String> {
    if payload.rates.is_empty() {
        return Err(InvalidArgument::EmptyRateSequence.to_string());
    }
    Ok(VariableGrowthRequest {
        initial: required("initial", payload.initial)?,
        rates: payload.rates.into_iter().map(percent_to_rate).collect(),
    })
}

fn depletion_request_from_payload(payload: DepletionPayload) -> Result<DepletionRequest, String> {
    Ok(DepletionRequest {
        balance: required("balance", payload.balance)?,
        withdrawal: required("withdrawal", payload.withdrawal)?,
        rate: percent_to_rate(required("rate", payload.rate)?),
        limits: depletion_limits(payload.max_periods)?,
    })
}

fn withdrawal_request_from_payload(payload: OptimizePayload) -> Result<WithdrawalRequest, String> {
    let defaults = SolveConfig::default();
    let config = SolveConfig {
        tolerance: payload.tolerance.unwrap_or(defaults.tolerance),
        max_iterations: match payload.max_iterations {
            Some(v) => periods("maxIterations", v)?,
            None => defaults.max_iterations,
        },
        limits: depletion_limits(payload.max_periods)?,
    };

    Ok(WithdrawalRequest {
        balance: required("balance", payload.balance)?,
        rate: percent_to_rate(required("rate", payload.rate)?),
        target_periods: periods("targetYears", required("targetYears", payload.target_years)?)?,
        config,
    })
}

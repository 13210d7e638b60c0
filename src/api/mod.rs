mod payload;

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
    routing::post,
};
use chrono::{Local, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::core::{Outcome, RuleBook, simulate};
use crate::error::AppError;
use crate::integrations::{
    CaptchaVerifier, CorsPolicy, DisabledCaptcha, Lead, LeadSink, LogLeadSink, SourceMetadata,
    StaticTokenVerifier,
};

pub use payload::{NumberInput, PayloadFlags, SimulatePayload, age_on, parse_decimal};

const CLIENT_IP_HEADERS: [&str; 4] = [
    "cf-connecting-ip",
    "x-nf-client-connection-ip",
    "x-real-ip",
    "x-forwarded-for",
];

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub rules: Arc<RuleBook>,
    pub cors: Arc<CorsPolicy>,
    pub captcha: Arc<dyn CaptchaVerifier>,
    pub leads: Arc<dyn LeadSink>,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Self {
        let rules = RuleBook::reference()
            .with_min_financed_fraction(config.engine.min_financed_fraction);
        let tokens = &config.integrations.captcha_tokens;
        let captcha: Arc<dyn CaptchaVerifier> = if tokens.is_empty() {
            Arc::new(DisabledCaptcha)
        } else {
            Arc::new(StaticTokenVerifier::new(tokens.iter().cloned()))
        };

        Self {
            rules: Arc::new(rules),
            cors: Arc::new(CorsPolicy::new(config.integrations.allowed_origins.clone())),
            captcha,
            leads: Arc::new(LogLeadSink),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route(
            "/api/simulate",
            post(simulate_handler)
                .options(preflight_handler)
                .fallback(method_not_allowed_handler),
        )
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(config: AppConfig) -> Result<(), AppError> {
    let addr = config.server.socket_addr()?;
    let app = router(AppState::from_config(&config));

    let listener = TcpListener::bind(addr).await?;
    info!(?config.environment, %addr, "housing credit simulator listening");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    AppError::NotFound.into_response()
}

async fn method_not_allowed_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut response = AppError::MethodNotAllowed.into_response();
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("POST, OPTIONS"));
    with_headers(response, state.cors.headers_for(origin(&headers)))
}

async fn preflight_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    with_headers(
        StatusCode::NO_CONTENT.into_response(),
        state.cors.headers_for(origin(&headers)),
    )
}

async fn simulate_handler(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let origin = origin(&headers);
    let cors = state.cors.headers_for(origin);

    let response = match run_simulation(&state, &headers, origin, &body) {
        Ok(outcome) => json_response(StatusCode::OK, &outcome),
        Err(err) => {
            if err.status().is_server_error() {
                warn!(error = %err, "simulation request failed");
            }
            with_cache_control(err.into_response())
        }
    };
    with_headers(response, cors)
}

fn run_simulation(
    state: &AppState,
    headers: &HeaderMap,
    origin: Option<&str>,
    body: &[u8],
) -> Result<Outcome, AppError> {
    if !state.cors.allows(origin) {
        return Err(AppError::OriginNotAllowed);
    }

    let payload: SimulatePayload =
        serde_json::from_slice(body).map_err(|e| AppError::Payload(e.to_string()))?;

    let client_ip = client_ip(headers);
    if !state
        .captcha
        .verify(payload.captcha_token.as_deref(), client_ip.as_deref())?
    {
        return Err(AppError::CaptchaRejected);
    }

    let applicant = payload.to_applicant(Local::now().date_naive())?;
    let outcome = simulate(&state.rules, &applicant);

    match &outcome {
        Outcome::Approved(result) => {
            info!(
                program = %result.program,
                term_months = result.term_months,
                subsidy = result.subsidy,
                "simulation approved"
            );
            let lead = Lead {
                contact: payload.contact.clone(),
                source: SourceMetadata::new(payload.source.as_ref(), payload.utm.as_ref()),
                property_value: applicant.property_price(),
                monthly_income: applicant.monthly_income(),
                category: applicant.category(),
                age_years: applicant.age_years(),
                flags: applicant.flags(),
                result: result.clone(),
                created_at: Utc::now(),
            };
            dispatch_lead(Arc::clone(&state.leads), lead);
        }
        Outcome::Declined(failure) => {
            info!(code = ?failure.code, "simulation declined");
        }
    }

    Ok(outcome)
}

/// Delivery happens after the response is decided and never affects it.
fn dispatch_lead(sink: Arc<dyn LeadSink>, lead: Lead) {
    tokio::spawn(async move {
        if let Err(err) = sink.submit(&lead) {
            warn!(error = %err, "lead delivery failed");
        }
    });
}

fn origin(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    CLIENT_IP_HEADERS.iter().find_map(|name| {
        let value = headers.get(*name)?.to_str().ok()?;
        let first = value.split(',').next()?.trim();
        (!first.is_empty()).then(|| first.to_string())
    })
}

fn with_headers(mut response: Response, extra: HeaderMap) -> Response {
    response.headers_mut().extend(extra);
    response
}

fn with_cache_control(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ip_prefers_edge_headers_and_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.7"));

        headers.insert("cf-connecting-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_ip(&headers).as_deref(), Some("198.51.100.2"));

        assert_eq!(client_ip(&HeaderMap::new()), None);
    }

    #[test]
    fn json_response_disables_caching() {
        let response = json_response(StatusCode::OK, json!({ "ok": true }));
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&HeaderValue::from_static("no-store"))
        );
    }
}

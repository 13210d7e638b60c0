use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use homeloan::api::{AppState, router};
use homeloan::core::RuleBook;
use homeloan::integrations::{
    CorsPolicy, DisabledCaptcha, InMemoryLeadSink, Lead, LeadError, LeadSink, StaticTokenVerifier,
};
use serde_json::{Value, json};
use tower::ServiceExt;

struct FailingLeadSink;

impl LeadSink for FailingLeadSink {
    fn submit(&self, _lead: &Lead) -> Result<(), LeadError> {
        Err(LeadError::Delivery("crm offline".to_string()))
    }
}

fn state_with(leads: Arc<dyn LeadSink>) -> AppState {
    AppState {
        rules: Arc::new(RuleBook::reference()),
        cors: Arc::new(CorsPolicy::new(vec!["https://site.example".to_string()])),
        captcha: Arc::new(DisabledCaptcha),
        leads,
    }
}

fn app() -> Router {
    router(state_with(Arc::new(InMemoryLeadSink::default())))
}

fn scenario_body() -> Value {
    json!({
        "propertyValue": 200000,
        "monthlyIncome": 2000,
        "category": "new",
        "ageYears": 30,
        "flags": { "hasSavingsAccount": true, "previousSubsidy": false, "hasCoBorrower": false },
        "contact": { "name": "Ana", "email": "ana@example.com" },
        "source": "https://site.example/simulador",
        "utm": { "utm_source": "google" }
    })
}

fn post(body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/simulate")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ORIGIN, "https://site.example")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("router responds");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

#[tokio::test]
async fn approved_simulation_returns_both_branches() {
    let (status, body) = send(app(), post(&scenario_body())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["program"], "MCMV — Faixa 1");
    assert_eq!(body["termMonths"], 420);
    assert_eq!(body["annualRatePercent"], 4.25);
    assert_eq!(body["subsidy"], 11144.0);
    assert!(body["constantAmortization"]["lastPayment"].is_number());
    assert!(body["fixedInstallment"].get("lastPayment").is_none());
    assert!(body["fixedInstallment"]["financedPrincipal"].as_f64().expect("number") > 0.0);
    assert_eq!(body["documentationCost"], 9000.0);
}

#[tokio::test]
async fn repeated_requests_are_byte_identical() {
    let first = send(app(), post(&scenario_body())).await.1;
    let second = send(app(), post(&scenario_body())).await.1;
    assert_eq!(first.to_string(), second.to_string());
}

#[tokio::test]
async fn decline_is_a_normal_result() {
    let mut body = scenario_body();
    body["propertyValue"] = json!(1_500_000.005);
    let (status, body) = send(app(), post(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["eligible"], false);
    assert_eq!(body["code"], "no-eligible-program");
    assert!(body["reason"].as_str().is_some_and(|r| !r.is_empty()));
}

#[tokio::test]
async fn missing_field_is_a_client_error() {
    let mut body = scenario_body();
    body.as_object_mut().expect("object").remove("ageYears");
    let (status, body) = send(app(), post(&body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().expect("message").contains("ageYears"));
}

#[tokio::test]
async fn malformed_json_is_a_client_error() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/simulate")
        .body(Body::from("{not json"))
        .expect("request builds");
    let (status, _) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn disallowed_origin_is_forbidden() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/simulate")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::from(scenario_body().to_string()))
        .expect("request builds");
    let (status, _) = send(app(), request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn preflight_returns_cors_headers() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/simulate")
        .header(header::ORIGIN, "https://site.example")
        .body(Body::empty())
        .expect("request builds");
    let response = app().oneshot(request).await.expect("router responds");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("https://site.example")
    );
}

#[tokio::test]
async fn wrong_method_and_unknown_route() {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/simulate")
        .body(Body::empty())
        .expect("request builds");
    let (status, _) = send(app(), request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let request = Request::builder()
        .uri("/nowhere")
        .body(Body::empty())
        .expect("request builds");
    let (status, _) = send(app(), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("request builds");
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn captcha_rejection_blocks_the_engine() {
    let mut state = state_with(Arc::new(InMemoryLeadSink::default()));
    state.captcha = Arc::new(StaticTokenVerifier::new(["good-token"]));

    let mut body = scenario_body();
    body["captchaToken"] = json!("bad-token");
    let (status, _) = send(router(state.clone()), post(&body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    body["captchaToken"] = json!("good-token");
    let (status, body) = send(router(state), post(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["program"], "MCMV — Faixa 1");
}

#[tokio::test]
async fn approved_simulation_is_delivered_as_lead() {
    let sink = InMemoryLeadSink::default();
    let app = router(state_with(Arc::new(sink.clone())));
    let (status, _) = send(app, post(&scenario_body())).await;
    assert_eq!(status, StatusCode::OK);

    for _ in 0..100 {
        if !sink.leads().is_empty() {
            break;
        }
        tokio::task::yield_now().await;
    }
    let leads = sink.leads();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].contact.name.as_deref(), Some("Ana"));
    assert_eq!(leads[0].source.utm.get("utm_source").map(String::as_str), Some("google"));
    assert!(leads[0].title().contains("R$ 200.000,00"));
}

#[tokio::test]
async fn lead_failure_does_not_change_the_response() {
    let healthy = send(app(), post(&scenario_body())).await;
    let failing = send(router(state_with(Arc::new(FailingLeadSink))), post(&scenario_body())).await;
    assert_eq!(healthy.0, failing.0);
    assert_eq!(healthy.1.to_string(), failing.1.to_string());
}

#[tokio::test]
async fn loosely_typed_contact_and_utm_still_simulate() {
    let sink = InMemoryLeadSink::default();
    let app = router(state_with(Arc::new(sink.clone())));
    let mut body = scenario_body();
    body["contact"] = json!({ "name": "Ana", "whatsapp": 11999990000u64 });
    body["utm"] = json!({ "utm_source": "google", "utm_term": null });

    let (status, body) = send(app, post(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["program"], "MCMV — Faixa 1");

    for _ in 0..100 {
        if !sink.leads().is_empty() {
            break;
        }
        tokio::task::yield_now().await;
    }
    let leads = sink.leads();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].contact.whatsapp.as_deref(), Some("11999990000"));
    assert_eq!(leads[0].source.utm.len(), 1);
}

#[tokio::test]
async fn dotted_thousands_price_is_read_as_reais() {
    let mut body = scenario_body();
    body["propertyValue"] = json!("200.000");
    body["monthlyIncome"] = json!("2.000");
    let from_text = send(app(), post(&body)).await;
    let from_numbers = send(app(), post(&scenario_body())).await;
    assert_eq!(from_text.0, StatusCode::OK);
    assert_eq!(from_text.1.to_string(), from_numbers.1.to_string());
}

//! End-to-end tests of the HTTP API over a local store and mock connectors.

use std::sync::Arc;

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use serde_json::{json, Value};
use tempfile::TempDir;

use flowlabs_auth::{MockIdentityProvider, MockTokenVerifier};
use flowlabs_connectors::{
    AirtableConfig, AirtableSource, MockPaymentGateway, MockTextGenerator, WebhookConfig,
};
use flowlabs_core::UserId;
use flowlabs_engine::EngineConfig;
use flowlabs_gateway::{create_router, GatewayConfig, GatewayState, Services};
use flowlabs_store::RocksStore;

struct Harness {
    server: TestServer,
    identity: Arc<MockIdentityProvider>,
    generator: Arc<MockTextGenerator>,
    payments: Arc<MockPaymentGateway>,
    _dir: TempDir,
}

fn engine_config() -> EngineConfig {
    EngineConfig {
        webhook: WebhookConfig {
            demo_delay_ms: 0,
            ..WebhookConfig::default()
        },
        ..EngineConfig::default()
    }
}

fn harness_with(
    generator: MockTextGenerator,
    identity: MockIdentityProvider,
    config: EngineConfig,
) -> Harness {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RocksStore::open(dir.path()).unwrap());
    let generator = Arc::new(generator);
    let payments = Arc::new(MockPaymentGateway::new());
    let identity = Arc::new(identity);

    let services = Services::new(
        store,
        Arc::clone(&generator) as _,
        Arc::clone(&payments) as _,
        AirtableSource::new(AirtableConfig::default()).unwrap(),
        &config,
    );
    let state = GatewayState::new(
        Arc::new(services),
        Arc::new(MockTokenVerifier),
        Arc::clone(&identity),
        GatewayConfig::default(),
    );

    Harness {
        server: TestServer::new(create_router(state)).unwrap(),
        identity,
        generator,
        payments,
        _dir: dir,
    }
}

fn harness() -> Harness {
    harness_with(
        MockTextGenerator::replying("Loved your post on outbound."),
        MockIdentityProvider::new(),
        engine_config(),
    )
}

fn bearer(user: &UserId) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer test-token:{user}")).unwrap()
}

fn authed(request: TestRequest, user: &UserId) -> TestRequest {
    request.add_header(header::AUTHORIZATION, bearer(user))
}

async fn create_lead(h: &Harness, user: &UserId, name: &str, value: &str) -> Value {
    let response = authed(h.server.post("/v1/leads"), user)
        .json(&json!({
            "name": name,
            "email": format!("{}@example.com", name.to_lowercase()),
            "company": "Acme",
            "value": value,
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()
}

async fn set_status(h: &Harness, user: &UserId, lead_id: &str, status: &str) -> Value {
    let response = authed(h.server.put(&format!("/v1/leads/{lead_id}/status")), user)
        .json(&json!({ "status": status }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    response.json::<Value>()
}

fn id_of(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

// =============================================================================
// Health and authentication
// =============================================================================

#[tokio::test]
async fn health_is_public() {
    let h = harness();
    let response = h.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "healthy");
}

#[tokio::test]
async fn missing_or_bad_token_is_rejected() {
    let h = harness();

    let response = h.server.get("/v1/leads").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"]["code"], "unauthorized");

    let response = h
        .server
        .get("/v1/leads")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer garbage"))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sign_up_and_use_the_session() {
    let h = harness();

    let response = h
        .server
        .post("/v1/auth/signup")
        .json(&json!({ "email": "ops@agency.io", "password": "hunter22" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let session = response.json::<Value>();
    assert_eq!(session["user"]["email"], "ops@agency.io");

    let response = h
        .server
        .post("/v1/auth/signin")
        .json(&json!({ "email": "ops@agency.io", "password": "hunter22" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let token = response.json::<Value>()["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = h
        .server
        .get("/v1/auth/user")
        .add_header(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["email"], "ops@agency.io");

    let response = h
        .server
        .post("/v1/auth/signout")
        .add_header(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn sign_up_errors() {
    let h = harness_with(
        MockTextGenerator::replying("x"),
        MockIdentityProvider::new().with_account("taken@agency.io", "hunter22"),
        engine_config(),
    );

    let response = h
        .server
        .post("/v1/auth/signup")
        .json(&json!({ "email": "taken@agency.io", "password": "hunter22" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let response = h
        .server
        .post("/v1/auth/signup")
        .json(&json!({ "email": "new@agency.io", "password": "abc" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = h
        .server
        .post("/v1/auth/signin")
        .json(&json!({ "email": "taken@agency.io", "password": "wrong-password" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = h
        .server
        .post("/v1/auth/signin")
        .json(&json!({ "email": " ", "password": "hunter22" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sign_up_pending_confirmation() {
    let h = harness_with(
        MockTextGenerator::replying("x"),
        MockIdentityProvider::new().requiring_confirmation(),
        engine_config(),
    );

    let response = h
        .server
        .post("/v1/auth/signup")
        .json(&json!({ "email": "ops@agency.io", "password": "hunter22" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    assert_eq!(response.json::<Value>()["status"], "confirmation_required");
}

#[tokio::test]
async fn password_recovery() {
    let h = harness();
    let response = h
        .server
        .post("/v1/auth/recover")
        .json(&json!({ "email": "ops@agency.io" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    assert_eq!(h.identity.reset_requests(), vec!["ops@agency.io".to_string()]);
}

// =============================================================================
// Leads and clients
// =============================================================================

#[tokio::test]
async fn lead_crud() {
    let h = harness();
    let user = UserId::generate();

    let lead = create_lead(&h, &user, "Alice", " 1500 ").await;
    assert_eq!(lead["status"], "New");
    assert_eq!(lead["value"], 1500.0);
    let score = lead["score"].as_u64().unwrap();
    assert!((60..100).contains(&score));

    let listed = authed(h.server.get("/v1/leads"), &user).await.json::<Value>();
    assert_eq!(listed["leads"].as_array().unwrap().len(), 1);

    let updated = set_status(&h, &user, &id_of(&lead), "Replied").await;
    assert_eq!(updated["status"], "Replied");

    let response = authed(h.server.delete(&format!("/v1/leads/{}", id_of(&lead))), &user).await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    let listed = authed(h.server.get("/v1/leads"), &user).await.json::<Value>();
    assert!(listed["leads"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn lead_validation_and_bad_ids() {
    let h = harness();
    let user = UserId::generate();

    let response = authed(h.server.post("/v1/leads"), &user)
        .json(&json!({ "name": "Alice", "email": "" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["code"], "bad_request");

    let response = authed(h.server.put("/v1/leads/not-a-uuid/status"), &user)
        .json(&json!({ "status": "Replied" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lead_without_email_is_a_validation_error() {
    let h = harness();
    let user = UserId::generate();

    let response = authed(h.server.post("/v1/leads"), &user)
        .json(&json!({ "name": "Alice" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Email is required"));
}

#[tokio::test]
async fn status_names_are_parsed_leniently() {
    let h = harness();
    let user = UserId::generate();
    let lead = create_lead(&h, &user, "Alice", "0").await;
    let path = format!("/v1/leads/{}/status", id_of(&lead));

    let response = authed(h.server.put(&path), &user)
        .json(&json!({ "status": "Won" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["code"], "bad_request");

    let updated = set_status(&h, &user, &id_of(&lead), "replied").await;
    assert_eq!(updated["status"], "Replied");
}

#[tokio::test]
async fn malformed_bodies_use_the_error_format() {
    let h = harness();
    let user = UserId::generate();

    let response = authed(h.server.post("/v1/logs"), &user)
        .json(&json!({ "client": "Acme", "status": "Success" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["code"], "bad_request");

    let response = authed(h.server.post("/v1/leads"), &user)
        .text("not json")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["code"], "bad_request");
}

#[tokio::test]
async fn leads_are_scoped_to_their_owner() {
    let h = harness();
    let alice = UserId::generate();
    let mallory = UserId::generate();
    let lead = create_lead(&h, &alice, "Bob", "100").await;

    let listed = authed(h.server.get("/v1/leads"), &mallory)
        .await
        .json::<Value>();
    assert!(listed["leads"].as_array().unwrap().is_empty());

    let response = authed(
        h.server.put(&format!("/v1/leads/{}/status", id_of(&lead))),
        &mallory,
    )
    .json(&json!({ "status": "Closed" }))
    .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn conversion_creates_client_and_closes_lead() {
    let h = harness();
    let user = UserId::generate();
    let lead = create_lead(&h, &user, "Alice", "2000").await;

    let response = authed(
        h.server.post(&format!("/v1/leads/{}/convert", id_of(&lead))),
        &user,
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let conversion = response.json::<Value>();
    assert_eq!(conversion["client"]["status"], "Onboarding");
    assert_eq!(conversion["client"]["name"], "Alice");
    assert_eq!(conversion["client"]["last_active"], "Just now");
    assert_eq!(conversion["lead"]["status"], "Closed");

    let clients = authed(h.server.get("/v1/clients"), &user)
        .await
        .json::<Value>();
    let clients = clients["clients"].as_array().unwrap();
    assert_eq!(clients.len(), 1);

    let client_id = clients[0]["id"].as_str().unwrap();
    let response = authed(h.server.delete(&format!("/v1/clients/{client_id}")), &user).await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn converting_a_missing_lead() {
    let h = harness();
    let user = UserId::generate();
    let response = authed(
        h.server
            .post(&format!("/v1/leads/{}/convert", flowlabs_core::LeadId::generate())),
        &user,
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let clients = authed(h.server.get("/v1/clients"), &user)
        .await
        .json::<Value>();
    assert!(clients["clients"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn board_groups_leads() {
    let h = harness();
    let user = UserId::generate();
    let a = create_lead(&h, &user, "Alice", "0").await;
    create_lead(&h, &user, "Bob", "0").await;
    set_status(&h, &user, &id_of(&a), "Booked").await;

    let board = authed(h.server.get("/v1/leads/board"), &user)
        .await
        .json::<Value>();
    let columns = board["columns"].as_array().unwrap();
    assert_eq!(columns[0]["title"], "New Leads");
    assert_eq!(columns[0]["leads"].as_array().unwrap().len(), 1);
    let last = columns.last().unwrap();
    assert_eq!(last["leads"][0]["name"], "Alice");
}

// =============================================================================
// Personalization
// =============================================================================

#[tokio::test]
async fn personalization_requires_a_key() {
    let h = harness();
    let user = UserId::generate();
    let lead = create_lead(&h, &user, "Alice", "0").await;

    let response = authed(
        h.server
            .post(&format!("/v1/leads/{}/personalization", id_of(&lead))),
        &user,
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::PRECONDITION_FAILED);
    assert_eq!(response.json::<Value>()["error"]["code"], "not_configured");
    assert_eq!(h.generator.call_count(), 0);
}

#[tokio::test]
async fn personalization_with_user_key() {
    let h = harness();
    let user = UserId::generate();
    let lead = create_lead(&h, &user, "Alice", "0").await;

    let response = authed(h.server.put("/v1/settings"), &user)
        .json(&json!({ "gemini_api_key": "AIzaSy-user-key-1234" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = authed(
        h.server
            .post(&format!("/v1/leads/{}/personalization", id_of(&lead))),
        &user,
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let outcome = response.json::<Value>();
    assert_eq!(outcome["outcome"], "generated");
    assert_eq!(
        outcome["lead"]["personalization_line"],
        "Loved your post on outbound."
    );
    assert_eq!(h.generator.calls()[0].0, "AIzaSy-user-key-1234");

    let response = authed(
        h.server
            .put(&format!("/v1/leads/{}/personalization", id_of(&lead))),
        &user,
    )
    .json(&json!({ "line": "Congrats on the Series A!" }))
    .await;
    assert_eq!(
        response.json::<Value>()["personalization_line"],
        "Congrats on the Series A!"
    );
}

#[tokio::test]
async fn failed_generation_returns_placeholder() {
    let config = EngineConfig {
        default_text_api_key: Some("server-key".into()),
        ..engine_config()
    };
    let h = harness_with(
        MockTextGenerator::failing(),
        MockIdentityProvider::new(),
        config,
    );
    let user = UserId::generate();
    let lead = create_lead(&h, &user, "Alice", "0").await;

    let response = authed(
        h.server
            .post(&format!("/v1/leads/{}/personalization", id_of(&lead))),
        &user,
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let outcome = response.json::<Value>();
    assert_eq!(outcome["outcome"], "failed");
    assert_eq!(outcome["placeholder"], "Error: Check API Key in Settings.");
}

// =============================================================================
// Dashboard and reporting
// =============================================================================

#[tokio::test]
async fn dashboard_and_reporting_figures() {
    let h = harness();
    let user = UserId::generate();
    create_lead(&h, &user, "Alice", "1000").await;
    let bob = create_lead(&h, &user, "Bob", "2000").await;
    create_lead(&h, &user, "Carol", "3000").await;
    set_status(&h, &user, &id_of(&bob), "Closed").await;

    for status in ["Success", "Error"] {
        let response = authed(h.server.post("/v1/logs"), &user)
            .json(&json!({ "workflow": "Invoice Sync", "client": "Acme", "status": status }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
    }

    let dashboard = authed(h.server.get("/v1/dashboard"), &user)
        .await
        .json::<Value>();
    assert_eq!(dashboard["stats"]["pipeline_value"], 6000.0);
    assert_eq!(dashboard["stats"]["active_leads"], 3);
    assert_eq!(dashboard["stats"]["total_automations"], 2);
    assert_eq!(dashboard["stats"]["success_rate"], 50);
    assert!(dashboard["degraded"].as_array().unwrap().is_empty());

    let report = authed(h.server.get("/v1/reporting"), &user)
        .await
        .json::<Value>();
    assert_eq!(report["closed_revenue"], 2000.0);
    assert_eq!(report["conversion_rate"], 33);
    assert_eq!(report["weekly"].as_array().unwrap().len(), 4);

    let activity = authed(h.server.get("/v1/activity"), &user)
        .await
        .json::<Value>();
    assert_eq!(activity["activity"].as_array().unwrap().len(), 3);

    let logs = authed(h.server.get("/v1/logs"), &user)
        .await
        .json::<Value>();
    assert_eq!(logs["logs"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn empty_dashboard_is_zeroed() {
    let h = harness();
    let user = UserId::generate();
    let dashboard = authed(h.server.get("/v1/dashboard"), &user)
        .await
        .json::<Value>();
    assert_eq!(dashboard["stats"]["pipeline_value"], 0.0);
    assert_eq!(dashboard["stats"]["success_rate"], 0);
}

// =============================================================================
// Settings, campaigns, billing, assistant
// =============================================================================

#[tokio::test]
async fn settings_mask_credentials() {
    let h = harness();
    let user = UserId::generate();

    let response = authed(h.server.put("/v1/settings"), &user)
        .json(&json!({
            "gemini_api_key": "AIzaSy-secret-abcd",
            "airtable_base_id": "appXYZ",
            "subscription_tier": "enterprise"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let settings = authed(h.server.get("/v1/settings"), &user)
        .await
        .json::<Value>();
    assert_eq!(settings["gemini_api_key"], "****abcd");
    assert_eq!(settings["airtable_base_id"], "appXYZ");
    assert_eq!(settings["subscription_tier"], "free");

    let response = authed(h.server.put("/v1/settings"), &user)
        .json(&json!({ "make_webhook_url": "hook.make.com/abc" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn campaign_launch() {
    let h = harness();
    let user = UserId::generate();

    let response = authed(h.server.post("/v1/campaigns"), &user).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    create_lead(&h, &user, "Alice", "0").await;
    create_lead(&h, &user, "Bob", "0").await;

    let response = authed(h.server.post("/v1/campaigns"), &user).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let report = response.json::<Value>();
    assert_eq!(report["demo"], true);
    assert_eq!(report["updated"].as_array().unwrap().len(), 2);

    let leads = authed(h.server.get("/v1/leads"), &user)
        .await
        .json::<Value>();
    assert!(leads["leads"]
        .as_array()
        .unwrap()
        .iter()
        .all(|l| l["status"] == "Contacted"));
}

#[tokio::test]
async fn billing_flow() {
    let h = harness();
    let user = UserId::generate();

    let plans = h.server.get("/v1/billing/plans").await.json::<Value>();
    assert_eq!(plans["plans"].as_array().unwrap().len(), 4);

    let tier = authed(h.server.get("/v1/billing/subscription"), &user)
        .await
        .json::<Value>();
    assert_eq!(tier["tier"], "free");

    let response = authed(h.server.post("/v1/billing/checkout"), &user)
        .json(&json!({ "tier": "professional", "email": "ops@agency.io" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["amount"], 7900);
    assert_eq!(h.payments.requests().len(), 1);

    let response = authed(h.server.post("/v1/billing/checkout"), &user)
        .json(&json!({ "tier": "free", "email": "ops@agency.io" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = authed(h.server.post("/v1/billing/complete"), &user)
        .json(&json!({
            "plan": "Professional",
            "payment_id": "pay_123",
            "order_id": "order_test_1"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["subscription_tier"], "professional");

    let tier = authed(h.server.get("/v1/billing/subscription"), &user)
        .await
        .json::<Value>();
    assert_eq!(tier["tier"], "professional");
}

#[tokio::test]
async fn assistant_falls_back_when_generation_fails() {
    let config = EngineConfig {
        default_text_api_key: Some("server-key".into()),
        ..engine_config()
    };
    let h = harness_with(
        MockTextGenerator::failing(),
        MockIdentityProvider::new(),
        config,
    );
    let user = UserId::generate();

    let response = authed(h.server.post("/v1/assistant/chat"), &user)
        .json(&json!({
            "history": [{ "role": "user", "text": "hi" }, { "role": "model", "text": "Hello!" }],
            "message": "Why does my scenario loop?"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let reply = response.json::<Value>();
    assert_eq!(reply["degraded"], true);
    assert!(reply["text"].as_str().unwrap().contains("Settings"));
}

#[tokio::test]
async fn import_requires_data_source_credentials() {
    let h = harness();
    let user = UserId::generate();
    let response = authed(h.server.post("/v1/imports"), &user).await;
    assert_eq!(response.status_code(), StatusCode::PRECONDITION_FAILED);
}

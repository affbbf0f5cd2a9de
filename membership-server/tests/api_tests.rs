use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use membership_server::{create_app, MembershipServer};
use membership_service::{
    BenefitPublisher, BenefitStatusRequest, EntitlementPayload, InMemoryMembershipStore, MembershipResult,
    MembershipService,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

#[derive(Default)]
struct CountingPublisher {
    published: AtomicUsize,
}

#[async_trait]
impl BenefitPublisher for CountingPublisher {
    async fn publish(&self, _payload: &EntitlementPayload) -> MembershipResult<()> {
        self.published.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn suspend_benefits(&self, _request: &BenefitStatusRequest) -> MembershipResult<()> {
        Ok(())
    }

    async fn activate_benefits(&self, _request: &BenefitStatusRequest) -> MembershipResult<()> {
        Ok(())
    }

    async fn deactivate_benefits(&self, _request: &BenefitStatusRequest) -> MembershipResult<()> {
        Ok(())
    }
}

struct TestApp {
    app: Router,
    publisher: Arc<CountingPublisher>,
}

impl TestApp {
    fn new() -> Self {
        let publisher = Arc::new(CountingPublisher::default());
        let service = MembershipService::new(Arc::new(InMemoryMembershipStore::new()), publisher.clone());
        Self {
            app: create_app(MembershipServer::new(service)),
            publisher,
        }
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn post(&self, uri: &str, body: Value) -> Value {
        let (status, value) = self.send("POST", uri, Some(body)).await;
        assert_eq!(status, StatusCode::OK, "POST {uri} failed: {value}");
        value
    }
}

fn id(value: &Value) -> i64 {
    value["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_setup_and_process_category_over_http() {
    let app = TestApp::new();
    let base = "/api/v1/membership";

    let payer = app
        .post(
            &format!("{base}/payers"),
            json!({ "name": "Jubilee Insurance", "contact": null, "payer_type": "UNDERWRITER" }),
        )
        .await;
    let plan = app
        .post(
            &format!("{base}/plans"),
            json!({ "name": "Corporate Gold", "plan_type": "SCHEME", "access_mode": "CARD" }),
        )
        .await;
    let policy = app
        .post(
            &format!("{base}/policies"),
            json!({
                "plan_id": id(&plan),
                "policy_number": "POL-2024-001",
                "start_date": "2024-01-01",
                "end_date": "2024-12-31"
            }),
        )
        .await;
    let categories = app
        .post(
            &format!("{base}/categories"),
            json!({
                "policy_id": id(&policy),
                "categories": [{ "name": "Gold", "description": null, "jic_scheme_code": null,
                                 "apa_scheme_code": null, "policy_payer_code": null }]
            }),
        )
        .await;
    let category_id = categories["data"][0]["id"].as_i64().unwrap();
    let catalog = app
        .post(
            &format!("{base}/catalog"),
            json!([{ "code": "DEN", "name": "Dental", "service_group": "DENTAL" }]),
        )
        .await;
    let catalog_id = catalog["data"][0]["id"].as_i64().unwrap();

    app.post(
        &format!("{base}/benefits"),
        json!({
            "category_id": category_id,
            "parent_id": null,
            "catalog_id": catalog_id,
            "payer_id": id(&payer),
            "name": "Dental",
            "limit": 50000.0,
            "suspension_threshold": 5000.0,
            "applicable_gender": "ALL",
            "applicable_member": "ALL",
            "sharing": "INDIVIDUAL",
            "co_payment_required": false,
            "pre_auth_type": "NONE",
            "waiting_period": "ZERO_DAYS"
        }),
    )
    .await;
    app.post(
        &format!("{base}/beneficiaries"),
        json!({
            "category_id": category_id,
            "principal_id": null,
            "name": "John Kamau",
            "member_number": "LCT-001",
            "beneficiary_type": "PRINCIPAL",
            "gender": "MALE",
            "dob": "1985-07-12",
            "phone_number": null,
            "email": null,
            "nhif_number": null,
            "jic_entity_id": null,
            "apa_entity_id": null
        }),
    )
    .await;

    let summary = app.post(&format!("{base}/category/{category_id}/process"), json!({})).await;
    assert_eq!(summary["success"], true);
    assert_eq!(summary["msg"], "Completed processing benefits for category Gold");
    assert_eq!(summary["data"]["status"], "PROCESSED");
    assert_eq!(summary["data"]["published"], 1);
    assert_eq!(app.publisher.published.load(Ordering::SeqCst), 1);

    let (status, category) = app.send("GET", &format!("{base}/categories/{category_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(category["data"]["status"], "PROCESSED");
}

#[tokio::test]
async fn test_unknown_category_maps_to_not_found() {
    let app = TestApp::new();
    let (status, body) = app.send("POST", "/api/v1/membership/category/77/process", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error_type"], "not_found");
    assert_eq!(body["code"], "RESOURCE_2001");
    assert_eq!(body["msg"], "Category 77 not found");
}

#[tokio::test]
async fn test_duplicate_payer_maps_to_conflict() {
    let app = TestApp::new();
    let payer = json!({ "name": "Britam", "contact": null, "payer_type": "UNDERWRITER" });
    app.post("/api/v1/membership/payers", payer.clone()).await;

    let (status, body) = app.send("POST", "/api/v1/membership/payers", Some(payer)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_type"], "conflict");
}

#[tokio::test]
async fn test_payers_can_be_filtered_by_type() {
    let app = TestApp::new();
    app.post(
        "/api/v1/membership/payers",
        json!({ "name": "Britam", "contact": null, "payer_type": "UNDERWRITER" }),
    )
    .await;
    app.post(
        "/api/v1/membership/payers",
        json!({ "name": "Safaricom", "contact": null, "payer_type": "CORPORATE" }),
    )
    .await;

    let (status, body) = app.send("GET", "/api/v1/membership/payers?type=CORPORATE", None).await;
    assert_eq!(status, StatusCode::OK);
    let payers = body["data"].as_array().unwrap();
    assert_eq!(payers.len(), 1);
    assert_eq!(payers[0]["name"], "Safaricom");
}

#[tokio::test]
async fn test_search_without_term_is_a_bad_request() {
    let app = TestApp::new();

    for uri in [
        "/api/v1/membership/beneficiaries/search",
        "/api/v1/membership/catalog/search",
    ] {
        let (status, body) = app.send("GET", uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error_type"], "validation_error");
        assert_eq!(body["code"], "VALIDATION_1003");
        assert_eq!(body["msg"], "Query parameter 'q' is required");
    }

    let (status, body) = app.send("GET", "/api/v1/membership/beneficiaries/search?q=ab", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Search term must be at least 3 characters");
}

#[tokio::test]
async fn test_payer_codes_and_catalog_search_over_http() {
    let app = TestApp::new();
    let base = "/api/v1/membership";

    let payer = app
        .post(
            &format!("{base}/payers"),
            json!({ "name": "Jubilee Insurance", "contact": null, "payer_type": "UNDERWRITER" }),
        )
        .await;
    let payer_id = id(&payer);
    let catalog = app
        .post(
            &format!("{base}/catalog"),
            json!([
                { "code": "DEN", "name": "Dental", "service_group": "DENTAL" },
                { "code": "OPT", "name": "Optical", "service_group": "OPTICAL" }
            ]),
        )
        .await;
    let dental_id = catalog["data"][0]["id"].as_i64().unwrap();

    let mapping = app
        .post(
            &format!("{base}/payers/mappings"),
            json!({ "payer_id": payer_id, "catalog_id": dental_id, "code": "JUB-DEN" }),
        )
        .await;
    assert_eq!(mapping["data"]["code"], "JUB-DEN");

    let (status, body) = app
        .send(
            "POST",
            &format!("{base}/payers/mappings"),
            Some(json!({ "payer_id": payer_id, "catalog_id": dental_id, "code": "JUB-DEN-2" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_type"], "conflict");

    let (status, body) = app.send("GET", &format!("{base}/payers/{payer_id}/mappings"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = app.send("GET", &format!("{base}/catalog/search?q=dent"), None).await;
    assert_eq!(status, StatusCode::OK);
    let found = body["data"].as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["code"], "DEN");

    let (status, body) = app.send("GET", &format!("{base}/payers/{payer_id}/plans"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = app
        .send("POST", &format!("{base}/benefits/payers"), Some(json!({ "benefit_ids": [42] })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

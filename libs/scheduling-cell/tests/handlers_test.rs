// libs/scheduling-cell/tests/handlers_test.rs
use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scheduling_cell::router::scheduling_routes;
use scheduling_cell::services::engine::SchedulingEngine;
use scheduling_cell::store::SupabaseStore;
use shared_config::AppConfig;

const TOKEN: &str = "test-token";

fn test_app(mock_server: &MockServer) -> Router {
    let config = AppConfig {
        supabase_url: mock_server.uri(),
        supabase_anon_key: "test-anon-key".to_string(),
        persistence_timeout_seconds: 5,
    };

    let store = Arc::new(SupabaseStore::new(&config));
    let engine = Arc::new(
        SchedulingEngine::from_store(store)
            .with_persistence_timeout(StdDuration::from_secs(5)),
    );

    scheduling_routes(engine)
}

fn tomorrow_at_ten() -> DateTime<Utc> {
    (Utc::now().date_naive() + Duration::days(1))
        .and_hms_opt(10, 0, 0)
        .expect("valid time")
        .and_utc()
}

fn service_row(id: Uuid) -> Value {
    json!({
        "id": id,
        "name": "corte tesoura",
        "price": "50.00",
        "duration_minutes": 60
    })
}

fn professional_row(id: Uuid) -> Value {
    json!({
        "id": id,
        "name": "Carlos",
        "specialty": "barbeiro"
    })
}

fn appointment_row(
    id: Uuid,
    starts_at: DateTime<Utc>,
    client_id: Uuid,
    professional_id: Uuid,
    service_id: Uuid,
    status: &str,
) -> Value {
    json!({
        "id": id,
        "booked_at": Utc::now().to_rfc3339(),
        "starts_at": starts_at.to_rfc3339(),
        "client_id": client_id,
        "professional_id": professional_id,
        "service_id": service_id,
        "status": status,
        "notes": null,
        "total_value": "50.00",
        "cancellation_fee": "0.00"
    })
}

fn authed_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN));

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request"),
        None => builder.body(Body::empty()).expect("valid request"),
    }
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn booking_endpoint_returns_the_confirmation() {
    let mock_server = MockServer::start().await;
    let service_id = Uuid::new_v4();
    let client_id = Uuid::new_v4();
    let professional_id = Uuid::new_v4();
    let starts_at = tomorrow_at_ten();

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .and(query_param("id", format!("eq.{}", service_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([service_row(service_id)])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([appointment_row(
            Uuid::new_v4(),
            starts_at,
            client_id,
            professional_id,
            service_id,
            "scheduled",
        )])))
        .mount(&mock_server)
        .await;

    let request = authed_json_request(
        "POST",
        "/",
        Some(json!({
            "starts_at": starts_at.to_rfc3339(),
            "client_id": client_id,
            "professional_id": professional_id,
            "service_ids": [service_id],
            "notes": "primeira visita"
        })),
    );

    let response = test_app(&mock_server).oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["total_duration_minutes"], json!(60));
    assert_eq!(body["total_price"], json!("50.00"));
    assert_eq!(body["appointments"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn booking_over_an_occupied_window_is_a_conflict() {
    let mock_server = MockServer::start().await;
    let service_id = Uuid::new_v4();
    let professional_id = Uuid::new_v4();
    let starts_at = tomorrow_at_ten();

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([service_row(service_id)])))
        .mount(&mock_server)
        .await;

    // Another client already holds the 10:00 hour.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(
            Uuid::new_v4(),
            starts_at,
            Uuid::new_v4(),
            professional_id,
            service_id,
            "scheduled",
        )])))
        .mount(&mock_server)
        .await;

    let request = authed_json_request(
        "POST",
        "/",
        Some(json!({
            "starts_at": (starts_at + Duration::minutes(30)).to_rfc3339(),
            "client_id": Uuid::new_v4(),
            "professional_id": professional_id,
            "service_ids": [service_id],
            "notes": null
        })),
    );

    let response = test_app(&mock_server).oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn booking_an_unknown_service_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = authed_json_request(
        "POST",
        "/",
        Some(json!({
            "starts_at": tomorrow_at_ten().to_rfc3339(),
            "client_id": Uuid::new_v4(),
            "professional_id": Uuid::new_v4(),
            "service_ids": [Uuid::new_v4()],
            "notes": null
        })),
    );

    let response = test_app(&mock_server).oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancellation_endpoint_reports_the_fee() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let service_id = Uuid::new_v4();
    let client_id = Uuid::new_v4();
    let professional_id = Uuid::new_v4();
    // 61 minutes of notice lands in the 45% tier.
    let starts_at = Utc::now() + Duration::minutes(61);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(
            appointment_id,
            starts_at,
            client_id,
            professional_id,
            service_id,
            "scheduled",
        )])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([service_row(service_id)])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(
            appointment_id,
            starts_at,
            client_id,
            professional_id,
            service_id,
            "cancelled",
        )])))
        .mount(&mock_server)
        .await;

    let request = authed_json_request(
        "POST",
        &format!("/{}/cancel", appointment_id),
        Some(json!({ "client_id": client_id })),
    );

    let response = test_app(&mock_server).oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["cancellation_fee"], json!("22.50"));
    assert_eq!(body["free_cancellation"], json!(false));
}

#[tokio::test]
async fn cancellation_losing_a_transition_race_is_a_conflict() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let service_id = Uuid::new_v4();
    let client_id = Uuid::new_v4();
    let professional_id = Uuid::new_v4();
    let starts_at = Utc::now() + Duration::minutes(61);

    // The first read still sees a scheduled row.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(
            appointment_id,
            starts_at,
            client_id,
            professional_id,
            service_id,
            "scheduled",
        )])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    // By write time another transition has won: the conditional PATCH
    // matches nothing and the re-read reports the row completed.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(
            appointment_id,
            starts_at,
            client_id,
            professional_id,
            service_id,
            "completed",
        )])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([service_row(service_id)])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = authed_json_request(
        "POST",
        &format!("/{}/cancel", appointment_id),
        Some(json!({ "client_id": client_id })),
    );

    let response = test_app(&mock_server).oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn cancelling_someone_elses_appointment_is_forbidden() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(
            appointment_id,
            Utc::now() + Duration::hours(3),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "scheduled",
        )])))
        .mount(&mock_server)
        .await;

    let request = authed_json_request(
        "POST",
        &format!("/{}/cancel", appointment_id),
        Some(json!({ "client_id": Uuid::new_v4() })),
    );

    let response = test_app(&mock_server).oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn slots_endpoint_lists_the_free_day() {
    let mock_server = MockServer::start().await;
    let professional_id = Uuid::new_v4();
    let date = Utc::now().date_naive() + Duration::days(1);

    Mock::given(method("GET"))
        .and(path("/rest/v1/professionals"))
        .and(query_param("id", format!("eq.{}", professional_id)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([professional_row(professional_id)])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = authed_json_request(
        "GET",
        &format!("/slots?professional_id={}&date={}", professional_id, date),
        None,
    );

    let response = test_app(&mock_server).oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["available_slots"].as_array().map(Vec::len), Some(20));
    assert_eq!(body["available_slots"][0]["label"], json!("09:00"));
}

#[tokio::test]
async fn client_listing_endpoint_enriches_appointments() {
    let mock_server = MockServer::start().await;
    let client_id = Uuid::new_v4();
    let service_id = Uuid::new_v4();
    let professional_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(
            Uuid::new_v4(),
            Utc::now() + Duration::hours(3),
            client_id,
            professional_id,
            service_id,
            "scheduled",
        )])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([service_row(service_id)])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/professionals"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([professional_row(professional_id)])),
        )
        .mount(&mock_server)
        .await;

    let request = authed_json_request("GET", &format!("/clients/{}", client_id), None);

    let response = test_app(&mock_server).oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let appointments = body["appointments"].as_array().expect("array");
    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0]["service"]["name"], json!("corte tesoura"));
    assert_eq!(appointments[0]["professional"]["name"], json!("Carlos"));
}

#[tokio::test]
async fn missing_bearer_token_is_rejected() {
    let mock_server = MockServer::start().await;

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "starts_at": tomorrow_at_ten().to_rfc3339(),
                "client_id": Uuid::new_v4(),
                "professional_id": Uuid::new_v4(),
                "service_ids": [Uuid::new_v4()],
                "notes": null
            })
            .to_string(),
        ))
        .expect("valid request");

    let response = test_app(&mock_server).oneshot(request).await.expect("response");

    assert!(response.status().is_client_error());
}

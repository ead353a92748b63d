use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::router::doctor_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn test_config(mock_server: &MockServer) -> AppConfig {
    TestConfig::with_supabase_url(&mock_server.uri()).to_app_config()
}

fn create_test_app(config: AppConfig) -> Router {
    doctor_routes(Arc::new(config))
}

async fn mock_doctor(mock_server: &MockServer, doctor_id: Uuid) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(
                &doctor_id.to_string(),
                "Dr. Grid",
                "General Practice"
            )
        ])))
        .mount(mock_server)
        .await;
}

async fn mock_booked_slots(
    mock_server: &MockServer,
    doctor_id: Uuid,
    status_filter: &str,
    booked: serde_json::Value,
) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("status", status_filter))
        .respond_with(ResponseTemplate::new(200).set_body_json(booked))
        .mount(mock_server)
        .await;
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_list_doctors_public() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let app = create_test_app(config);

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("is_approved", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(
                &Uuid::new_v4().to_string(),
                "Dr. Adams",
                "Cardiology"
            ),
            MockSupabaseResponses::doctor_response(
                &Uuid::new_v4().to_string(),
                "Dr. Brown",
                "Dermatology"
            ),
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let doctors = body_json(response).await;
    assert_eq!(doctors.as_array().unwrap().len(), 2);
    assert_eq!(doctors[0]["name"], "Dr. Adams");
}

#[tokio::test]
async fn test_filter_doctors_by_specialty_and_fee() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let app = create_test_app(config);

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("is_approved", "eq.true"))
        .and(query_param("specialty", "eq.Cardiology"))
        .and(query_param("consultation_fee", "lte.200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(
                &Uuid::new_v4().to_string(),
                "Dr. Adams",
                "Cardiology"
            )
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/filter?specialty=Cardiology&max_fee=200")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let doctors = body_json(response).await;
    assert_eq!(doctors.as_array().unwrap().len(), 1);
    assert_eq!(doctors[0]["specialty"], "Cardiology");
}

#[tokio::test]
async fn test_get_doctor_not_found() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let app = create_test_app(config);
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri(&format!("/{}", doctor_id))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_day_slots_requires_authentication() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let app = create_test_app(config);

    let request = Request::builder()
        .method("GET")
        .uri(&format!("/{}/slots?date=2025-07-10", Uuid::new_v4()))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_day_slots_subtract_live_bookings_in_grid_order() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let app = create_test_app(config);
    let doctor_id = Uuid::new_v4();

    mock_doctor(&mock_server, doctor_id).await;
    mock_booked_slots(
        &mock_server,
        doctor_id,
        "neq.rejected",
        json!([
            { "date": "2025-07-10", "slot": "09:00" },
            { "date": "2025-07-10", "slot": "14:30" },
        ]),
    )
    .await;

    let request = Request::builder()
        .method("GET")
        .uri(&format!("/{}/slots?date=2025-07-10", doctor_id))
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let slots = body_json(response).await;
    let slots = slots.as_array().unwrap();

    // Standard grid minus the two booked slots
    assert_eq!(slots.len(), 13);
    assert!(!slots.contains(&json!("09:00")));
    assert!(!slots.contains(&json!("14:30")));
    assert_eq!(slots[0], "09:30");
    assert_eq!(slots[slots.len() - 1], "17:00");
}

#[tokio::test]
async fn test_fully_booked_day_returns_empty_list() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let app = create_test_app(config);
    let doctor_id = Uuid::new_v4();

    let all_booked: Vec<serde_json::Value> = [
        "09:00", "09:30", "10:00", "10:30", "11:00", "11:30", "12:00", "12:30",
        "14:00", "14:30", "15:00", "15:30", "16:00", "16:30", "17:00",
    ]
    .iter()
    .map(|slot| json!({ "date": "2025-07-10", "slot": slot }))
    .collect();

    mock_doctor(&mock_server, doctor_id).await;
    mock_booked_slots(&mock_server, doctor_id, "neq.rejected", json!(all_booked)).await;

    let request = Request::builder()
        .method("GET")
        .uri(&format!("/{}/slots?date=2025-07-10", doctor_id))
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let slots = body_json(response).await;
    assert_eq!(slots.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_month_availability_counts_per_day() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let app = create_test_app(config);
    let doctor_id = Uuid::new_v4();

    mock_doctor(&mock_server, doctor_id).await;
    mock_booked_slots(
        &mock_server,
        doctor_id,
        "in.(pending,approved)",
        json!([
            { "date": "2025-06-05", "slot": "09:00" },
            { "date": "2025-06-05", "slot": "10:00" },
            { "date": "2025-06-20", "slot": "14:00" },
        ]),
    )
    .await;

    let request = Request::builder()
        .method("GET")
        .uri(&format!("/{}/availability?year=2025&month=6", doctor_id))
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let availability = body_json(response).await;
    let days = availability.as_object().unwrap();

    // Every day of June is present, booked or not
    assert_eq!(days.len(), 30);
    assert_eq!(availability["2025-06-05"], 13);
    assert_eq!(availability["2025-06-20"], 14);
    assert_eq!(availability["2025-06-01"], 15);
}

#[tokio::test]
async fn test_month_availability_rejects_invalid_month() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let app = create_test_app(config);

    let request = Request::builder()
        .method("GET")
        .uri(&format!("/{}/availability?year=2025&month=13", Uuid::new_v4()))
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_day_slots_for_unknown_doctor_returns_not_found() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let app = create_test_app(config);

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri(&format!("/{}/slots?date=2025-07-10", Uuid::new_v4()))
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

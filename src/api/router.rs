//! API router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//!
//! Protected middleware stack (outermost → innermost):
//! Extension → Audit → Auth → Role gate (per group) → Handler
//!
//! The whole app is wrapped in CORS and a panic catcher that turns a
//! handler panic into the standard 500 body.

use std::any::Any;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};

use crate::api::endpoints;
use crate::api::error::ApiError;
use crate::api::middleware;
use crate::api::middleware::role::{ADMIN_ONLY, DOCTOR_ONLY, PATIENT_ONLY};
use crate::api::types::ApiContext;

/// Build the API router from a pre-constructed `ApiContext`.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost
/// protected layer). Handlers use `State<ApiContext>`.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn build_router(ctx: ApiContext) -> Router {
    let public = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/register", post(endpoints::auth::register))
        .route("/auth/login", post(endpoints::auth::login))
        .route("/auth/google", post(endpoints::auth::google))
        .with_state(ctx.clone());

    // Any authenticated role.
    let authenticated = Router::new().route(
        "/health-metrics",
        get(endpoints::health_metrics::list).post(endpoints::health_metrics::record),
    );

    let patient = Router::new()
        .route(
            "/patient/health-metrics",
            get(endpoints::patient::latest).post(endpoints::patient::record),
        )
        .route(
            "/appointments/find-doctors",
            get(endpoints::appointments::find_doctors),
        )
        .route("/appointments/book", post(endpoints::appointments::book))
        .route_layer(from_fn_with_state(PATIENT_ONLY, middleware::role::require_role));

    let doctor = Router::new()
        .route("/doctor/appointments", get(endpoints::doctor::appointments))
        .route(
            "/doctor/search-patient/:patientId",
            get(endpoints::doctor::search_patient),
        )
        .route_layer(from_fn_with_state(DOCTOR_ONLY, middleware::role::require_role));

    let admin = Router::new()
        .route("/admin/doctors", post(endpoints::admin::create_doctor))
        .route("/admin/hospitals", post(endpoints::admin::create_hospital))
        .route("/admin/schedule", post(endpoints::admin::add_schedule))
        .route_layer(from_fn_with_state(ADMIN_ONLY, middleware::role::require_role));

    let protected = authenticated
        .merge(patient)
        .merge(doctor)
        .merge(admin)
        .with_state(ctx.clone())
        // Middleware stack (innermost first, outermost last):
        .layer(from_fn(middleware::auth::require_auth))
        .layer(from_fn(middleware::audit::log_access))
        .layer(axum::Extension(ctx));

    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Router::new()
        .nest("/api", public.merge(protected))
        .layer(cors)
        .layer(CatchPanicLayer::custom(panic_response))
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::accounts::{self, NewDoctor};
    use crate::db::DbPool;
    use crate::models::{PublicUser, Role};
    use crate::token::TokenService;

    struct TestApp {
        ctx: ApiContext,
        _dir: tempfile::TempDir,
    }

    impl TestApp {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let db = DbPool::open(&dir.path().join("api.db"), 4, Duration::from_secs(2)).unwrap();
            let tokens = TokenService::new(b"router-test-secret").unwrap();
            Self {
                ctx: ApiContext::new(db, tokens),
                _dir: dir,
            }
        }

        async fn call(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(t) = token {
                builder = builder.header("Authorization", format!("Bearer {t}"));
            }
            let body = match body {
                Some(json) => {
                    builder = builder.header("Content-Type", "application/json");
                    Body::from(json.to_string())
                }
                None => Body::empty(),
            };

            let response = build_router(self.ctx.clone())
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, json)
        }

        async fn register(&self, name: &str, email: &str) -> (String, i64) {
            let (status, body) = self
                .call(
                    "POST",
                    "/api/auth/register",
                    None,
                    Some(json!({"name": name, "email": email, "password": "pa55word"})),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            (
                body["token"].as_str().unwrap().to_string(),
                body["user"]["id"].as_i64().unwrap(),
            )
        }

        async fn doctor_token(&self) -> (String, i64) {
            let created = {
                let conn = self.ctx.db.acquire().await.unwrap();
                accounts::create_doctor(
                    &conn,
                    &NewDoctor {
                        name: "Dr. Strange".into(),
                        email: "strange@example.com".into(),
                        password: "mystic".into(),
                        specialization: "Neurology".into(),
                        phone: None,
                    },
                )
                .unwrap()
            };
            (self.ctx.tokens.issue(created.user_id).unwrap(), created.doctor_id)
        }

        async fn admin_token(&self) -> String {
            let user_id = {
                let conn = self.ctx.db.acquire().await.unwrap();
                accounts::ensure_admin(
                    &conn,
                    &crate::config::AdminBootstrap {
                        name: "Root".into(),
                        email: "root@example.com".into(),
                        password: zeroize::Zeroizing::new("changeme".into()),
                    },
                )
                .unwrap();
                crate::db::repository::get_user_by_email(&conn, "root@example.com")
                    .unwrap()
                    .unwrap()
                    .id
            };
            self.ctx.tokens.issue(user_id).unwrap()
        }
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = TestApp::new();
        let (status, body) = app.call("GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn missing_token_is_401_bad_token_is_403() {
        let app = TestApp::new();
        let (status, body) = app.call("GET", "/api/health-metrics", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "AUTH_REQUIRED");

        let (status, _) = app
            .call("GET", "/api/health-metrics", Some("not.a.token"), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let other = TokenService::new(b"another-secret").unwrap().issue(1).unwrap();
        let (status, _) = app.call("GET", "/api/health-metrics", Some(&other), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn expired_token_is_403() {
        let app = TestApp::new();
        let (_, user_id) = app.register("Jane", "jane@example.com").await;
        let stale = app
            .ctx
            .tokens
            .issue_at(user_id, chrono::Utc::now() - chrono::Duration::days(8))
            .unwrap();

        let (status, body) = app.call("GET", "/api/health-metrics", Some(&stale), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["message"], "Invalid or expired token");
    }

    #[tokio::test]
    async fn rejected_and_accepted_requests_pass_the_access_log() {
        let app = TestApp::new();
        let rejected = build_router(app.ctx.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/doctor/appointments")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
        assert!(rejected.headers().contains_key("x-request-id"));
        assert!(rejected.extensions().get::<PublicUser>().is_none());

        let (token, user_id) = app.register("Jane", "jane@example.com").await;
        let accepted = build_router(app.ctx.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/health-metrics")
                    .header("Authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(accepted.status(), StatusCode::OK);
        assert!(accepted.headers().contains_key("x-request-id"));
        assert_eq!(
            accepted.extensions().get::<PublicUser>().map(|u| u.id),
            Some(user_id)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn health_answers_while_a_login_is_hashing() {
        let app = TestApp::new();
        {
            let conn = app.ctx.db.acquire().await.unwrap();
            let slow_hash = crate::crypto::hash_with_rounds("pa55word", 400_000).unwrap();
            crate::db::repository::insert_user(
                &conn,
                &crate::db::repository::NewUser {
                    name: "Slow",
                    email: "slow@example.com",
                    password_hash: Some(&slow_hash),
                    role: Role::Patient,
                    google_id: None,
                },
            )
            .unwrap();
        }

        let login_router = build_router(app.ctx.clone());
        let login = tokio::spawn(async move {
            login_router
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/api/auth/login")
                        .header("Content-Type", "application/json")
                        .body(Body::from(
                            r#"{"email":"slow@example.com","password":"pa55word"}"#,
                        ))
                        .unwrap(),
                )
                .await
                .unwrap()
                .status()
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Spawned so it competes with the login for the single worker.
        let health_router = build_router(app.ctx.clone());
        let health = tokio::spawn(async move {
            health_router
                .oneshot(
                    Request::builder()
                        .uri("/api/health")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap()
                .status()
        });

        assert_eq!(health.await.unwrap(), StatusCode::OK);
        assert!(!login.is_finished(), "login finished before health answered");
        assert_eq!(login.await.unwrap(), StatusCode::OK);
    }

    #[tokio::test]
    async fn token_for_unknown_user_is_401() {
        let app = TestApp::new();
        let ghost = app.ctx.tokens.issue(4242).unwrap();
        let (status, _) = app.call("GET", "/api/health-metrics", Some(&ghost), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_then_login() {
        let app = TestApp::new();
        let (_, user_id) = app.register("Jane", "jane@example.com").await;

        let (status, body) = app
            .call(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({"email": "jane@example.com", "password": "pa55word"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["id"].as_i64(), Some(user_id));
        let token = body["token"].as_str().unwrap();
        assert_eq!(app.ctx.tokens.verify(token), Ok(user_id));
    }

    #[tokio::test]
    async fn duplicate_registration_is_400() {
        let app = TestApp::new();
        app.register("Jane", "jane@example.com").await;
        let (status, body) = app
            .call(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({"name": "Jane", "email": "jane@example.com", "password": "x"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "User already exists");
    }

    #[tokio::test]
    async fn failed_logins_are_indistinguishable() {
        let app = TestApp::new();
        app.register("Jane", "jane@example.com").await;

        let wrong_password = app
            .call(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({"email": "jane@example.com", "password": "wrong"})),
            )
            .await;
        let unknown_email = app
            .call(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({"email": "nobody@example.com", "password": "pa55word"})),
            )
            .await;

        assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password, unknown_email);
    }

    #[tokio::test]
    async fn malformed_json_is_400_with_error_shape() {
        let app = TestApp::new();
        let response = build_router(app.ctx.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .header("Content-Type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), 4096).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn health_metrics_flow() {
        let app = TestApp::new();
        let (token, _) = app.register("Jane", "jane@example.com").await;

        let (status, body) = app
            .call(
                "POST",
                "/api/health-metrics",
                Some(&token),
                Some(json!({"weight": 70, "height": 175, "bp_systolic": 120, "bp_diastolic": 80})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert!(body["data"]["health_id"].as_i64().is_some());

        let (status, body) = app.call("GET", "/api/health-metrics", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["bmi"], 22.9);

        let (status, _) = app
            .call(
                "POST",
                "/api/health-metrics",
                Some(&token),
                Some(json!({"weight": -3})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn legacy_patient_metrics_share_the_same_log() {
        let app = TestApp::new();
        let (token, _) = app.register("Jane", "jane@example.com").await;

        let (status, body) = app
            .call("GET", "/api/patient/health-metrics", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));

        let (status, body) = app
            .call(
                "POST",
                "/api/patient/health-metrics",
                Some(&token),
                Some(json!({"weight": 70, "height": 175, "blood_pressure": "118/76"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bmi"], 22.9);

        let (_, latest) = app
            .call("GET", "/api/patient/health-metrics", Some(&token), None)
            .await;
        assert_eq!(latest["bp_systolic"], 118.0);

        let (_, list) = app.call("GET", "/api/health-metrics", Some(&token), None).await;
        assert_eq!(list["count"], 1);
    }

    #[tokio::test]
    async fn doctor_without_patient_profile_gets_404_on_metrics() {
        let app = TestApp::new();
        let (doctor, _) = app.doctor_token().await;
        let (status, _) = app.call("GET", "/api/health-metrics", Some(&doctor), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn role_gates() {
        let app = TestApp::new();
        let (patient, _) = app.register("Jane", "jane@example.com").await;
        let (doctor, _) = app.doctor_token().await;

        let (status, _) = app
            .call("GET", "/api/doctor/appointments", Some(&patient), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .call("GET", "/api/appointments/find-doctors", Some(&doctor), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .call(
                "POST",
                "/api/admin/hospitals",
                Some(&doctor),
                Some(json!({"name": "Nope"})),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        for _ in 0..2 {
            let (status, _) = app
                .call("GET", "/api/doctor/appointments", Some(&doctor), None)
                .await;
            assert_eq!(status, StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn admin_setup_search_book_and_agenda() {
        let app = TestApp::new();
        let admin = app.admin_token().await;

        let (status, body) = app
            .call(
                "POST",
                "/api/admin/doctors",
                Some(&admin),
                Some(json!({
                    "name": "Dr. House",
                    "email": "house@example.com",
                    "password": "vicodin",
                    "specialization": "Diagnostics",
                    "phone": "555-0100"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let doctor_id = body["doctor_id"].as_i64().unwrap();

        let (status, body) = app
            .call(
                "POST",
                "/api/admin/hospitals",
                Some(&admin),
                Some(json!({"name": "Princeton-Plainsboro", "address": "New Jersey"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let hospital_id = body["hospital_id"].as_i64().unwrap();

        let (status, _) = app
            .call(
                "POST",
                "/api/admin/schedule",
                Some(&admin),
                Some(json!({
                    "doctor_id": doctor_id,
                    "hospital_id": hospital_id,
                    "day_of_week": "Tuesday",
                    "start_time": "09:00",
                    "end_time": "13:00"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = app
            .call(
                "POST",
                "/api/admin/schedule",
                Some(&admin),
                Some(json!({
                    "doctor_id": doctor_id,
                    "hospital_id": hospital_id,
                    "day_of_week": "Someday",
                    "start_time": "09:00",
                    "end_time": "13:00"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (patient, _) = app.register("Jane", "jane@example.com").await;
        let (status, results) = app
            .call(
                "GET",
                "/api/appointments/find-doctors?specialization=Diagnostics&hospital=plains",
                Some(&patient),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(results[0]["doctor_id"].as_i64(), Some(doctor_id));
        assert_eq!(results[0]["slots"][0], "Tuesday 09:00-13:00");

        let (status, body) = app
            .call(
                "POST",
                "/api/appointments/book",
                Some(&patient),
                Some(json!({
                    "doctor_id": doctor_id,
                    "hospital_id": hospital_id,
                    "appointment_date": "2026-07-07",
                    "appointment_time": "10:30"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["appointment"]["id"].as_i64().is_some());

        let (status, _) = app
            .call(
                "POST",
                "/api/appointments/book",
                Some(&patient),
                Some(json!({
                    "doctor_id": 9999,
                    "hospital_id": hospital_id,
                    "appointment_date": "2026-07-07",
                    "appointment_time": "10:30"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = app
            .call(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({"email": "house@example.com", "password": "vicodin"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let doctor = body["token"].as_str().unwrap().to_string();

        let (status, agenda) = app
            .call("GET", "/api/doctor/appointments", Some(&doctor), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(agenda.as_array().unwrap().len(), 1);
        assert_eq!(agenda[0]["patient_name"], "Jane");
        assert_eq!(agenda[0]["hospital_name"], "Princeton-Plainsboro");
    }

    #[tokio::test]
    async fn doctor_searches_patient() {
        let app = TestApp::new();
        let (patient, patient_user) = app.register("Jane", "jane@example.com").await;
        let (doctor, _) = app.doctor_token().await;

        app.call(
            "POST",
            "/api/health-metrics",
            Some(&patient),
            Some(json!({"weight": 70, "height": 175})),
        )
        .await;

        let patient_id = {
            let conn = app.ctx.db.acquire().await.unwrap();
            crate::db::repository::find_patient_id_by_user(&conn, patient_user)
                .unwrap()
                .unwrap()
        };

        let (status, body) = app
            .call(
                "GET",
                &format!("/api/doctor/search-patient/{patient_id}"),
                Some(&doctor),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "jane@example.com");
        assert_eq!(body["latest_metrics"]["bmi"], 22.9);
        assert_eq!(body["report_summaries"], json!([]));

        let (status, _) = app
            .call("GET", "/api/doctor/search-patient/9999", Some(&doctor), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .call("GET", "/api/doctor/search-patient/abc", Some(&doctor), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn exhausted_pool_is_503() {
        let app = TestApp::new();
        let dir = tempfile::tempdir().unwrap();
        let db = DbPool::open(&dir.path().join("tiny.db"), 1, Duration::from_millis(50)).unwrap();
        let ctx = ApiContext::new(db.clone(), app.ctx.tokens.clone());

        let _held = db.acquire().await.unwrap();
        let response = build_router(ctx)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .header("Content-Type", "application/json")
                    .body(Body::from(r#"{"email":"a@b.c","password":"x"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn panic_becomes_internal_error() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

//! HTTP API tests through `tower::ServiceExt::oneshot`.

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use chrono::{NaiveTime, TimeZone, Utc, Weekday};
use serde_json::{Value, json};
use service_portal_auth::mocks::MockOtpSender;
use service_portal_auth::{
    GuestAuthConfig, GuestEnvironment, InMemoryGuestService, InMemoryIdentityRepository,
    InMemoryPendingOtpStore, OtpSettings,
};
use service_portal_scheduling::{
    AvailabilityPlan, BookingConfig, BookingEnvironment, BookingService, CalendarResource,
    Catalog, InMemoryAppointmentRepository, PlanId, ResourceId, UnconfiguredMeetingProvider,
    WeeklySlot,
};
use service_portal_testing::ManualClock;
use service_portal_web::{AppState, GUEST_TOKEN_HEADER, RateLimits, router};
use std::sync::Arc;
use tower::ServiceExt;

const MONDAY: &str = "2025-03-03";

struct TestApp {
    app: Router,
    resource_id: ResourceId,
    inactive_id: ResourceId,
    sender: MockOtpSender,
}

fn resource(name: &str, plan_id: PlanId, active: bool) -> CalendarResource {
    CalendarResource {
        id: ResourceId::new(),
        name: name.into(),
        timezone: chrono_tz::UTC,
        slot_duration_minutes: 30,
        draft_expiration_minutes: 10,
        plan_id,
        meeting_profile: None,
        active,
    }
}

async fn test_app(otp_enabled: bool, limits: RateLimits) -> TestApp {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap());

    let plan = AvailabilityPlan {
        id: PlanId::new(),
        name: "Monday mornings".into(),
        timezone: chrono_tz::UTC,
        slots: vec![WeeklySlot::new(
            Weekday::Mon,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            1,
        )],
    };
    let advisor = resource("Advisor", plan.id, true);
    let retired = resource("Retired desk", plan.id, false);
    let (resource_id, inactive_id) = (advisor.id, retired.id);
    let catalog = Catalog {
        plans: vec![plan],
        resources: vec![advisor, retired],
    };

    let booking = BookingService::start(
        catalog,
        BookingEnvironment::new(
            Arc::new(clock.clone()),
            Arc::new(InMemoryAppointmentRepository::new()),
            Arc::new(UnconfiguredMeetingProvider),
            BookingConfig::new(),
        ),
    )
    .await
    .unwrap();

    let sender = MockOtpSender::new();
    let guests = InMemoryGuestService::new(GuestEnvironment::new(
        InMemoryIdentityRepository::new(),
        InMemoryPendingOtpStore::new(),
        Arc::new(sender.clone()),
        Arc::new(clock),
        GuestAuthConfig::new().with_otp(
            OtpSettings::new()
                .with_enabled(otp_enabled)
                .with_sms_sender("+15550001111"),
        ),
    ));

    let state = AppState::new(booking, guests).with_limits(limits);
    TestApp {
        app: router(state),
        resource_id,
        inactive_id,
        sender,
    }
}

impl TestApp {
    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("X-Forwarded-For", "203.0.113.7");
        if let Some(token) = token {
            builder = builder.header(GUEST_TOKEN_HEADER, token);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register(&self, document: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/guests/register",
                None,
                Some(json!({ "document": document, "full_name": "Ana Gómez" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["status"], "authenticated");
        body["token"].as_str().unwrap().to_string()
    }

    async fn slots(&self) -> Vec<Value> {
        let uri = format!(
            "/api/resources/{}/slots?from={MONDAY}&to={MONDAY}",
            self.resource_id
        );
        let (status, body) = self.call(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["slots"].as_array().unwrap().clone()
    }

    async fn book_nine(&self, token: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            "/api/appointments",
            Some(token),
            Some(json!({
                "resource_id": self.resource_id,
                "start": "2025-03-03T09:00:00Z",
                "end": "2025-03-03T09:30:00Z",
            })),
        )
        .await
    }
}

fn available(slots: &[Value]) -> usize {
    slots.iter().filter(|s| s["is_available"] == true).count()
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = test_app(false, RateLimits::new()).await;

    let (status, _) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.call(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"].as_array().unwrap().len(), 2);

    let (status, _) = app.call(Method::GET, "/metrics", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_book_list_cancel_round_trip() {
    let app = test_app(false, RateLimits::new()).await;
    let token = app.register("10203040").await;

    let slots = app.slots().await;
    assert_eq!(slots.len(), 6);
    assert_eq!(available(&slots), 6);

    let (status, appointment) = app.book_nine(&token).await;
    assert_eq!(status, StatusCode::CREATED, "{appointment}");
    assert_eq!(appointment["status"], "confirmed");

    let slots = app.slots().await;
    assert_eq!(available(&slots), 5);
    assert_eq!(slots[0]["capacity_remaining"], 0);
    assert_eq!(slots[0]["is_available"], false);

    let (status, mine) = app
        .call(Method::GET, "/api/appointments/mine", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["id"], appointment["id"]);

    let cancel = format!("/api/appointments/{}/cancel", appointment["id"].as_str().unwrap());
    let (status, outcome) = app.call(Method::POST, &cancel, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{outcome}");
    assert_eq!(outcome["action"], "cancelled");
    assert_eq!(available(&app.slots().await), 6);

    let (_, mine) = app
        .call(
            Method::GET,
            "/api/appointments/mine?status=cancelled",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_full_slot_is_a_conflict() {
    let app = test_app(false, RateLimits::new()).await;
    let first = app.register("10203040").await;
    let second = app.register("50607080").await;

    let (status, _) = app.book_nine(&first).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.book_nine(&second).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CAPACITY_EXCEEDED");
}

#[tokio::test]
async fn test_cannot_cancel_someone_elses_appointment() {
    let app = test_app(false, RateLimits::new()).await;
    let owner = app.register("10203040").await;
    let intruder = app.register("50607080").await;

    let (_, appointment) = app.book_nine(&owner).await;
    let cancel = format!("/api/appointments/{}/cancel", appointment["id"].as_str().unwrap());

    let (status, body) = app.call(Method::POST, &cancel, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_booking_requires_token() {
    let app = test_app(false, RateLimits::new()).await;

    let (status, body) = app.book_nine("").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.book_nine("not-a-real-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::GET, "/api/appointments/mine", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_slot_errors() {
    let app = test_app(false, RateLimits::new()).await;

    let uri = format!("/api/resources/{}/slots?from={MONDAY}&to={MONDAY}", app.inactive_id);
    let (status, body) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "RESOURCE_INACTIVE");

    let uri = format!("/api/resources/{}/slots?from={MONDAY}&to={MONDAY}", ResourceId::new());
    let (status, body) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let uri = format!("/api/resources/{}/slots?from=2025-03-07&to={MONDAY}", app.resource_id);
    let (status, body) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_honeypot_rejected() {
    let app = test_app(false, RateLimits::new()).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/guests/register",
            None,
            Some(json!({
                "document": "10203040",
                "full_name": "Ana Gómez",
                "honeypot": "http://cheap-pills.example",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid request");

    // Nothing was registered.
    let (status, _) = app
        .call(
            Method::POST,
            "/api/guests/lookup",
            None,
            Some(json!({ "document": "10203040" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_registration_validation() {
    let app = test_app(false, RateLimits::new()).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/guests/register",
            None,
            Some(json!({ "document": "1!", "full_name": "Ana Gómez" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    app.register("10203040").await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/guests/register",
            None,
            Some(json!({ "document": "10203040", "full_name": "Someone Else" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_profile_update_and_logout() {
    let app = test_app(false, RateLimits::new()).await;
    let token = app.register("10203040").await;

    let (status, me) = app.call(Method::GET, "/api/guests/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["document"], "10203040");
    assert!(me.get("token").is_none());

    let (status, me) = app
        .call(
            Method::POST,
            "/api/guests/me",
            Some(&token),
            Some(json!({ "email": "ANA@Example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{me}");
    assert_eq!(me["email"], "ana@example.com");

    let (status, _) = app
        .call(Method::POST, "/api/guests/logout", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.call(Method::GET, "/api/guests/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_lookup_rotates_token() {
    let app = test_app(false, RateLimits::new()).await;
    let old = app.register("10203040").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/guests/lookup",
            None,
            Some(json!({ "document": "10203040" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let new = body["token"].as_str().unwrap();
    assert_ne!(new, old);

    let (status, _) = app.call(Method::GET, "/api/guests/me", Some(&old), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.call(Method::GET, "/api/guests/me", Some(new), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_otp_registration_over_http() {
    let app = test_app(true, RateLimits::new()).await;

    let (status, settings) = app.call(Method::GET, "/api/otp/settings", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["enabled"], true);
    assert_eq!(settings["sms_available"], true);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/guests/register",
            None,
            Some(json!({
                "document": "10203040",
                "full_name": "Ana Gómez",
                "phone": "+57 300 123 4567",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED, "{body}");
    assert_eq!(body["status"], "requires_otp");
    assert_eq!(body["masked_phone"], "+57***********67");

    let code = app.sender.last_code().unwrap();
    let verify = json!({ "document": "10203040", "code": code });
    let (status, session) = app
        .call(Method::POST, "/api/otp/verify", None, Some(verify.clone()))
        .await;
    assert_eq!(status, StatusCode::OK, "{session}");
    let token = session["token"].as_str().unwrap();
    assert_eq!(session["identity"]["document"], "10203040");

    let (status, body) = app
        .call(Method::POST, "/api/otp/verify", None, Some(verify))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.call(Method::GET, "/api/guests/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_resend_cooldown_is_rate_limited() {
    let app = test_app(true, RateLimits::new()).await;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/guests/register",
            None,
            Some(json!({
                "document": "10203040",
                "full_name": "Ana Gómez",
                "phone": "+57 300 123 4567",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/otp/resend",
            None,
            Some(json!({ "document": "10203040" })),
        )
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn test_client_ip_limit() {
    let app = test_app(false, RateLimits::new().with_otp_request(2)).await;
    let request = || Some(json!({ "document": "10203040" }));

    for _ in 0..2 {
        let (status, body) = app
            .call(Method::POST, "/api/otp/request", None, request())
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "OTP verification is not enabled");
    }

    let (status, body) = app
        .call(Method::POST, "/api/otp/request", None, request())
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn test_correlation_id_echoed() {
    let app = test_app(false, RateLimits::new()).await;
    let request = Request::builder()
        .uri("/health")
        .header("X-Correlation-ID", "6f1c0f5e-4a8e-4c57-9d57-0c9f1e6a2b10")
        .body(Body::empty())
        .unwrap();

    let response = app.app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("X-Correlation-ID").unwrap(),
        "6f1c0f5e-4a8e-4c57-9d57-0c9f1e6a2b10"
    );
}

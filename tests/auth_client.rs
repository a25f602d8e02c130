use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::tempdir;
use tokio::net::TcpListener;

use lms_backend::client::{
    AuthClient, AuthForm, AuthMode, ClientError, Field, NoticeLevel, SessionStore, ADMIN_ROUTE,
    TEACHER_KEY, TOKEN_KEY,
};

async fn login_ok(Json(body): Json<Value>) -> Json<Value> {
    assert_eq!(body["rememberMe"], true);
    tokio::time::sleep(Duration::from_millis(200)).await;
    Json(json!({
        "success": true,
        "message": "Login successful",
        "token": "jwt-token",
        "teacher": { "id": 1, "name": "Kamala", "email": body["email"], "profileImage": null,
                     "qualifications": { "highest_qualification": "MSc", "degrees": [],
                                         "diplomas": [], "specialization": "Physics",
                                         "experience_years": 6 } }
    }))
}

async fn register_conflict() -> (StatusCode, Json<Value>) {
    (
        StatusCode::CONFLICT,
        Json(json!({ "success": false, "message": "Email already exists" })),
    )
}

/// Serves canned replies on an ephemeral port and returns its base url.
async fn stub_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn sign_in_form() -> AuthForm {
    let mut form = AuthForm::new(AuthMode::SignIn);
    form.set_field(Field::Email, "kamala@school.lk");
    form.set_field(Field::Password, "longenough");
    form.set_remember_me(true);
    form
}

fn register_form() -> AuthForm {
    let mut form = AuthForm::new(AuthMode::Register);
    for (field, value) in [
        (Field::Name, "Kamala"),
        (Field::Email, "kamala@school.lk"),
        (Field::Password, "longenough"),
        (Field::ConfirmPassword, "longenough"),
        (Field::TelNum, "0771234567"),
        (Field::Nic, "199012345678"),
        (Field::HighestQualification, "MSc"),
        (Field::Specialization, "Physics"),
        (Field::ExperienceYears, "6"),
    ] {
        form.set_field(field, value);
    }
    form
}

#[tokio::test]
async fn successful_login_stores_session_and_redirects() {
    let base = stub_server(Router::new().route("/api/teachers/login", post(login_ok))).await;
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    let mut store = SessionStore::open(&path).unwrap();
    let client = AuthClient::new(base);

    let outcome = client
        .submit(&mut sign_in_form(), &mut store)
        .await
        .unwrap();

    assert_eq!(outcome.notice.level, NoticeLevel::Success);
    assert_eq!(outcome.notice.text, "Login successful!");
    assert_eq!(outcome.redirect, Some(ADMIN_ROUTE));
    assert!(!client.is_submitting());

    let reopened = SessionStore::open(&path).unwrap();
    assert_eq!(reopened.get(TOKEN_KEY), Some("jwt-token"));
    let teacher: Value = serde_json::from_str(reopened.get(TEACHER_KEY).unwrap()).unwrap();
    assert_eq!(teacher["email"], "kamala@school.lk");
    assert_eq!(reopened.teacher().unwrap().qualifications.experience_years, 6);
}

#[tokio::test]
async fn server_rejection_becomes_an_error_notice() {
    let base = stub_server(Router::new().route("/api/teachers/register", post(register_conflict)))
        .await;
    let dir = tempdir().unwrap();
    let mut store = SessionStore::open(dir.path().join("session.json")).unwrap();
    let client = AuthClient::new(base);

    let outcome = client
        .submit(&mut register_form(), &mut store)
        .await
        .unwrap();

    assert_eq!(outcome.notice.level, NoticeLevel::Error);
    assert_eq!(outcome.notice.text, "Email already exists");
    assert_eq!(outcome.redirect, None);
    assert_eq!(store.token(), None);
}

#[tokio::test]
async fn failure_without_message_uses_fallback_text() {
    let router = Router::new().route(
        "/api/teachers/login",
        post(|| async { Json(json!({ "success": false })) }),
    );
    let base = stub_server(router).await;
    let dir = tempdir().unwrap();
    let mut store = SessionStore::open(dir.path().join("session.json")).unwrap();

    let outcome = AuthClient::new(base)
        .submit(&mut sign_in_form(), &mut store)
        .await
        .unwrap();
    assert_eq!(outcome.notice.text, "Login failed");
}

#[tokio::test]
async fn unreachable_server_reports_a_transport_notice() {
    let port = portpicker::pick_unused_port().expect("free port");
    let dir = tempdir().unwrap();
    let mut store = SessionStore::open(dir.path().join("session.json")).unwrap();
    let client = AuthClient::new(format!("http://127.0.0.1:{port}"));

    let outcome = client
        .submit(&mut register_form(), &mut store)
        .await
        .unwrap();
    assert_eq!(outcome.notice.level, NoticeLevel::Error);
    assert_eq!(outcome.notice.text, "Error during registration");
    assert!(!client.is_submitting());
}

#[tokio::test]
async fn second_submission_while_in_flight_is_rejected() {
    let base = stub_server(Router::new().route("/api/teachers/login", post(login_ok))).await;
    let dir = tempdir().unwrap();
    let mut first_store = SessionStore::open(dir.path().join("a.json")).unwrap();
    let mut second_store = SessionStore::open(dir.path().join("b.json")).unwrap();
    let client = AuthClient::new(base);
    let mut first_form = sign_in_form();
    let mut second_form = sign_in_form();

    let (first, second) = tokio::join!(
        client.submit(&mut first_form, &mut first_store),
        client.submit(&mut second_form, &mut second_store),
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(ClientError::InFlight)));
    assert_eq!(second_store.token(), None);
}

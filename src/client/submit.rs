use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::client::form::{AuthForm, AuthMode, AuthRequest, FieldErrors};
use crate::client::session::{SessionStore, StoreError, TEACHER_KEY, TOKEN_KEY};

/// Where the UI goes after a successful sign-in or registration.
pub const ADMIN_ROUTE: &str = "/admin";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{} field(s) failed validation", .0.len())]
    Validation(FieldErrors),
    #[error("A submission is already in progress")]
    InFlight,
    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A toast-style message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    fn success(text: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub notice: Notice,
    /// Set only when the session was stored.
    pub redirect: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct ServerReply {
    #[serde(default)]
    success: bool,
    message: Option<String>,
    token: Option<String>,
    #[serde(default)]
    teacher: Value,
}

/// Clears the in-flight flag when the submission ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Posts the auth form to the teacher endpoints of the backend.
#[derive(Debug)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    in_flight: AtomicBool,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        AuthClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Validates and submits `form`.
    ///
    /// Invalid input and overlapping submissions are errors. Anything the
    /// server or network says is reported through the returned notice; on
    /// success the token and teacher profile are written to `store`.
    pub async fn submit(
        &self,
        form: &mut AuthForm,
        store: &mut SessionStore,
    ) -> Result<SubmitOutcome, ClientError> {
        if !form.validate() {
            return Err(ClientError::Validation(form.errors().clone()));
        }
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return Err(ClientError::InFlight);
        }
        let _in_flight = InFlight(&self.in_flight);

        let mode = form.mode();
        let (success_text, failure_text, transport_text) = match mode {
            AuthMode::SignIn => ("Login successful!", "Login failed", "Error during login"),
            AuthMode::Register => (
                "Registration successful!",
                "Registration failed",
                "Error during registration",
            ),
        };

        let reply = match self.post(mode, &form.request()).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Auth request to {} failed: {e}", mode.endpoint());
                return Ok(SubmitOutcome {
                    notice: Notice::error(transport_text),
                    redirect: None,
                });
            }
        };

        if !reply.success {
            let text = reply
                .message
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| failure_text.to_string());
            return Ok(SubmitOutcome {
                notice: Notice::error(text),
                redirect: None,
            });
        }

        store.set(TOKEN_KEY, reply.token.unwrap_or_default())?;
        store.set(TEACHER_KEY, reply.teacher.to_string())?;
        info!("Session stored after {}", mode.endpoint());

        Ok(SubmitOutcome {
            notice: Notice::success(success_text),
            redirect: Some(ADMIN_ROUTE),
        })
    }

    async fn post(
        &self,
        mode: AuthMode,
        request: &AuthRequest,
    ) -> Result<ServerReply, reqwest::Error> {
        let url = format!("{}/api/teachers/{}", self.base_url, mode.endpoint());
        self.http
            .post(url)
            .json(request)
            .send()
            .await?
            .json::<ServerReply>()
            .await
    }
}

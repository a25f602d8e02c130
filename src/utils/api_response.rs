use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

/// JSON envelope shared by every endpoint:
/// `{"success": bool, "message": string, ...payload, "error"?: string}`.
///
/// The payload is flattened into the envelope, so `T` must serialize as a map
/// (a struct such as `MaterialCreated { material }`).
#[derive(Serialize, Debug)]
pub struct ApiResponse<T = ()> {
    pub success: bool,
    #[serde(skip)]
    pub status_code: u16,
    pub message: String,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response carrying a payload
    pub fn success(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: true,
            status_code: status.as_u16(),
            message: message.into(),
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(status: StatusCode, message: impl Into<String>, error: Option<String>) -> Self {
        ApiResponse {
            success: false,
            status_code: status.as_u16(),
            message: message.into(),
            data: None,
            error,
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload, e.g. after an update or delete.
    pub fn ack(message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            status_code: StatusCode::OK.as_u16(),
            message: message.into(),
            data: None,
            error: None,
        }
    }
}

use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Router,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use tracing::{info, warn};
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::config::Config;
use crate::db::models::teacher::{
    AuthPayload, LoginTeacher, Qualifications, RegisterTeacher, TeacherPayload, TeacherProfile,
    TeacherRow,
};
use crate::db::queries::teacher::{delete_teacher, get_teacher, get_teachers, update_profile_image};
use crate::middleware::auth::jwt_middleware;
use crate::utils::api_response::ApiResponse;
use crate::utils::error::AppError;
use crate::utils::extract::JsonBody;

const TEACHER_COLUMNS: &str = "id, teacher_name, email, password_hash, tel_num, \
     profile_image, nic, highest_qualification, degrees, diplomas, specialization, \
     experience_years";

/// JWT Claims used for authentication.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject - teacher id as String
    pub sub: String,
    pub email: String,
    /// Expiration timestamp (UNIX TIME)
    pub exp: usize,
}

impl Claims {
    pub fn teacher_id(&self) -> Result<i32, AppError> {
        self.sub
            .parse::<i32>()
            .map_err(|_| AppError::Unauthorized("Invalid teacher id in token".into()))
    }
}

/// Signs a token for `teacher_id`. `remember` selects the long expiry.
pub fn issue_token(
    config: &Config,
    teacher_id: i32,
    email: &str,
    remember: bool,
) -> Result<String, jsonwebtoken::errors::Error> {
    let lifetime = if remember {
        config.jwt_remember_expiry_secs
    } else {
        config.jwt_expiry_secs
    };
    let claims = Claims {
        sub: teacher_id.to_string(),
        email: email.to_string(),
        exp: Utc::now().timestamp() as usize + lifetime as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

pub fn decode_token(config: &Config, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code == "23505")
}

/// Handles teacher registration.
///
/// # Returns
/// * `201 Created` - With a token and the new profile.
/// * `400 Bad Request` - If a field fails validation.
/// * `409 Conflict` - If the email is already registered.
/// * `500 Internal Server Error` - If hashing, signing or the database fails.
#[utoipa::path(
    post,
    path = "/api/teachers/register",
    tag = "Teachers",
    request_body = RegisterTeacher,
    responses(
        (status = 201, description = "Teacher registered", body = AuthPayload),
        (status = 400, description = "Invalid field"),
        (status = 409, description = "Email already exists"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterTeacher>,
) -> Result<ApiResponse<AuthPayload>, AppError> {
    payload.validate()?;
    let experience_years = payload.experience_years()?;

    let password_hash = hash(&payload.password, DEFAULT_COST)
        .map_err(|e| AppError::dependency("Password hashing failed", e))?;

    let sql = format!(
        r#"
        INSERT INTO teachers (teacher_name, email, password_hash, tel_num, nic,
            highest_qualification, degrees, diplomas, specialization, experience_years)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {TEACHER_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, TeacherRow>(&sql)
        .bind(payload.name.trim())
        .bind(&payload.email)
        .bind(&password_hash)
        .bind(&payload.tel_num)
        .bind(&payload.nic)
        .bind(&payload.highest_qualification)
        .bind(Json(&payload.degrees))
        .bind(Json(&payload.diplomas))
        .bind(&payload.specialization)
        .bind(experience_years)
        .fetch_one(&state.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Email already exists".into())
            } else {
                AppError::dependency("Registration failed", e)
            }
        })?;

    let token = issue_token(&state.config, row.id, &row.email, false)
        .map_err(|e| AppError::dependency("Token generation failed", e))?;

    info!("Teacher {} registered ({})", row.id, row.email);
    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Registration successful",
        AuthPayload {
            token,
            teacher: TeacherProfile::from(row),
        },
    ))
}

/// Handles teacher login.
///
/// # Returns
/// * `200 OK` - With a token and the profile.
/// * `401 Unauthorized` - If the email is unknown or the password is wrong.
/// * `500 Internal Server Error` - If a database or token generation error occurs.
#[utoipa::path(
    post,
    path = "/api/teachers/login",
    tag = "Teachers",
    request_body = LoginTeacher,
    responses(
        (status = 200, description = "Successful login", body = AuthPayload),
        (status = 401, description = "Invalid email or password"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginTeacher>,
) -> Result<ApiResponse<AuthPayload>, AppError> {
    let invalid = || AppError::Unauthorized("Invalid email or password".into());

    let sql = format!("SELECT {TEACHER_COLUMNS} FROM teachers WHERE email = $1");
    let row = sqlx::query_as::<_, TeacherRow>(&sql)
        .bind(&payload.email)
        .fetch_optional(&state.pool)
        .await
        .map_err(|e| AppError::dependency("Login failed", e))?;

    let Some(row) = row else {
        warn!("Login attempt for unknown email: {}", payload.email);
        return Err(invalid());
    };

    let matches = verify(&payload.password, &row.password_hash)
        .map_err(|e| AppError::dependency("Password verification error", e))?;
    if !matches {
        warn!("Invalid password attempt for teacher {}", row.id);
        return Err(invalid());
    }

    let token = issue_token(&state.config, row.id, &row.email, payload.remember_me)
        .map_err(|e| AppError::dependency("Token generation failed", e))?;

    info!("Login successful for teacher {}", row.id);
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Login successful",
        AuthPayload {
            token,
            teacher: TeacherProfile::from(row),
        },
    ))
}

#[utoipa::path(
    get,
    path = "/api/teachers/profile",
    tag = "Teachers",
    responses(
        (status = 200, description = "Profile of the authenticated teacher", body = TeacherPayload),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Teacher not found")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<ApiResponse<TeacherPayload>, AppError> {
    let teacher_id = claims.teacher_id()?;

    let sql = format!("SELECT {TEACHER_COLUMNS} FROM teachers WHERE id = $1");
    let row = sqlx::query_as::<_, TeacherRow>(&sql)
        .bind(teacher_id)
        .fetch_optional(&state.pool)
        .await
        .map_err(|e| AppError::dependency("Failed to load profile", e))?
        .ok_or_else(|| AppError::not_found("Teacher not found"))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Profile fetched successfully",
        TeacherPayload {
            teacher: TeacherProfile::from(row),
        },
    ))
}

pub fn teacher_routes(state: AppState) -> Router<AppState> {
    let secured = Router::new()
        .route("/api/teachers/profile", get(profile))
        .route("/api/teachers/get_guide", get(get_teacher))
        .route("/api/teachers/update", post(update_profile_image))
        .route("/api/teachers/delete", post(delete_teacher))
        .route_layer(from_fn_with_state(state, jwt_middleware));

    Router::new()
        .route("/api/teachers/register", post(register))
        .route("/api/teachers/login", post(login))
        .route("/api/teachers/get_guides", get(get_teachers))
        .merge(secured)
}

#[derive(OpenApi)]
#[openapi(
    paths(register, login, profile),
    components(schemas(
        RegisterTeacher,
        LoginTeacher,
        AuthPayload,
        TeacherPayload,
        TeacherProfile,
        Qualifications,
    )),
    tags(
        (name = "Teachers", description = "Teacher registration and login")
    )
)]
pub struct AuthDoc;

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::new("postgres://localhost/unused", "test-secret")
    }

    #[test]
    fn issued_token_round_trips_and_remember_extends_expiry() {
        let config = config();
        let short = decode_token(&config, &issue_token(&config, 7, "t@school.lk", false).unwrap())
            .unwrap();
        let long = decode_token(&config, &issue_token(&config, 7, "t@school.lk", true).unwrap())
            .unwrap();

        assert_eq!(short.teacher_id().unwrap(), 7);
        assert_eq!(short.email, "t@school.lk");
        assert!(long.exp > short.exp);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token(&config(), 1, "t@school.lk", false).unwrap();
        let other = Config::new("postgres://localhost/unused", "another-secret");
        assert!(decode_token(&other, &token).is_err());
    }
}

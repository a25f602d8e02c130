use axum::{extract::State, http::StatusCode, Extension};
use sqlx::PgPool;
use tracing::info;
use utoipa::OpenApi;

use crate::api::auth::Claims;
use crate::app_state::AppState;
use crate::db::models::teacher::{
    ProfileImageUpdated, ProfileImageUploadSchema, TeacherDetail, TeacherList, TeacherSummary,
    TEACHER_IMAGE_FIELD,
};
use crate::utils::api_response::ApiResponse;
use crate::utils::error::AppError;
use crate::utils::upload::{remove_paths, UploadForm};

const SUMMARY_COLUMNS: &str = "id, teacher_name AS name, email, tel_num AS phone, \
     profile_image, nic, highest_qualification, degrees, diplomas, specialization, \
     experience_years, created_at AS join_date";

/// Points the teacher at `file_name`. Returns the image it replaced, or
/// `None` when no teacher has `id`.
async fn replace_profile_image(
    pool: &PgPool,
    id: i32,
    file_name: &str,
) -> Result<Option<Option<String>>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let previous: Option<Option<String>> =
        sqlx::query_scalar("SELECT profile_image FROM teachers WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

    if previous.is_none() {
        tx.rollback().await?;
        return Ok(None);
    }

    sqlx::query("UPDATE teachers SET profile_image = $1 WHERE id = $2")
        .bind(file_name)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(previous)
}

/// Stored paths of profile images that are no longer referenced.
fn unreferenced_image(state: &AppState, file_name: Option<String>) -> Vec<String> {
    file_name
        .filter(|name| !name.is_empty())
        .map(|name| state.config.upload_dir.join(name).to_string_lossy().into_owned())
        .into_iter()
        .collect()
}

#[utoipa::path(
    post,
    path = "/api/teachers/update",
    tag = "Teachers",
    request_body(content = ProfileImageUploadSchema, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Profile image replaced", body = ProfileImageUpdated),
        (status = 400, description = "No image, or more than one"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Teacher not found"),
        (status = 500, description = "Database error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn update_profile_image(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut form: UploadForm,
) -> Result<ApiResponse<ProfileImageUpdated>, AppError> {
    form.retain_field(TEACHER_IMAGE_FIELD).await;
    let teacher_id = form.discard_on_err(claims.teacher_id()).await?;
    let image = form
        .discard_on_err(form.single_file(TEACHER_IMAGE_FIELD, "Only one image can be uploaded"))
        .await?
        .ok_or_else(|| AppError::validation("No image file provided"))?;

    let replaced = replace_profile_image(&state.pool, teacher_id, &image.file_name)
        .await
        .map_err(|e| AppError::dependency("Error updating profile image", e));

    let Some(previous) = form.discard_on_err(replaced).await? else {
        form.discard().await;
        return Err(AppError::not_found("Teacher not found"));
    };

    let stale = previous.filter(|name| *name != image.file_name);
    remove_paths(&unreferenced_image(&state, stale)).await;

    info!("Teacher {teacher_id} profile image set to {}", image.file_name);
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Profile image updated successfully",
        ProfileImageUpdated {
            profile_image: image.file_name.clone(),
        },
    ))
}

#[utoipa::path(
    get,
    path = "/api/teachers/get_guides",
    tag = "Teachers",
    responses(
        (status = 200, description = "Every teacher, ordered by name", body = TeacherList),
        (status = 500, description = "Database error")
    )
)]
pub async fn get_teachers(
    State(state): State<AppState>,
) -> Result<ApiResponse<TeacherList>, AppError> {
    let sql = format!("SELECT {SUMMARY_COLUMNS} FROM teachers ORDER BY teacher_name, id");
    let teachers = sqlx::query_as::<_, TeacherSummary>(&sql)
        .fetch_all(&state.pool)
        .await
        .map_err(|e| AppError::dependency("Error fetching teachers", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Teachers fetched successfully",
        TeacherList { teachers },
    ))
}

#[utoipa::path(
    get,
    path = "/api/teachers/get_guide",
    tag = "Teachers",
    responses(
        (status = 200, description = "The authenticated teacher", body = TeacherDetail),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Teacher not found")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn get_teacher(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<ApiResponse<TeacherDetail>, AppError> {
    let teacher_id = claims.teacher_id()?;

    let sql = format!("SELECT {SUMMARY_COLUMNS} FROM teachers WHERE id = $1");
    let teacher = sqlx::query_as::<_, TeacherSummary>(&sql)
        .bind(teacher_id)
        .fetch_optional(&state.pool)
        .await
        .map_err(|e| AppError::dependency("Error fetching teacher data", e))?
        .ok_or_else(|| AppError::not_found("Teacher not found"))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Teacher fetched successfully",
        TeacherDetail { teacher },
    ))
}

#[utoipa::path(
    post,
    path = "/api/teachers/delete",
    tag = "Teachers",
    responses(
        (status = 200, description = "Account and profile image deleted"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Teacher not found"),
        (status = 500, description = "Database error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn delete_teacher(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<ApiResponse, AppError> {
    let teacher_id = claims.teacher_id()?;

    let deleted: Option<Option<String>> =
        sqlx::query_scalar("DELETE FROM teachers WHERE id = $1 RETURNING profile_image")
            .bind(teacher_id)
            .fetch_optional(&state.pool)
            .await
            .map_err(|e| AppError::dependency("Error deleting teacher", e))?;

    let Some(profile_image) = deleted else {
        return Err(AppError::not_found("Teacher not found"));
    };
    remove_paths(&unreferenced_image(&state, profile_image)).await;

    info!("Teacher {teacher_id} deleted");
    Ok(ApiResponse::ack("Teacher deleted successfully"))
}

#[derive(OpenApi)]
#[openapi(
    paths(update_profile_image, get_teachers, get_teacher, delete_teacher),
    components(schemas(
        TeacherSummary,
        TeacherList,
        TeacherDetail,
        ProfileImageUpdated,
        ProfileImageUploadSchema,
    ))
)]
pub struct TeacherDoc;

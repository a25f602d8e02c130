use axum::{extract::State, http::StatusCode};
use sqlx::{PgConnection, PgPool};
use tracing::info;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::db::models::employee::{
    group_employee_rows, Employee, EmployeeCreated, EmployeeImageRow, EmployeeList,
    EmployeeRecord, EmployeeUpdate, EmployeeUploadSchema, NewEmployee, PROFILE_IMAGE_FIELD,
};
use crate::db::models::IdRequest;
use crate::utils::api_response::ApiResponse;
use crate::utils::error::AppError;
use crate::utils::extract::JsonBody;
use crate::utils::upload::{remove_paths, StoredFile, UploadForm};

/// Result of a write that targets an existing employee.
#[derive(Debug)]
enum EmployeeWrite {
    Missing,
    /// Stored path of an image file that is no longer referenced.
    Saved(Option<String>),
}

const ONE_PROFILE_IMAGE: &str = "Only one profile image can be uploaded.";

fn single_profile_image(form: &UploadForm) -> Result<Option<&StoredFile>, AppError> {
    form.single_file(PROFILE_IMAGE_FIELD, ONE_PROFILE_IMAGE)
}

/// Inserts or replaces the image row of `employee_id`, returning the path of
/// the file it used to point at.
async fn upsert_image(
    conn: &mut PgConnection,
    employee_id: i32,
    image: &StoredFile,
) -> Result<Option<String>, sqlx::Error> {
    let previous: Option<String> =
        sqlx::query_scalar("SELECT file_path FROM employee_images WHERE employee_id = $1")
            .bind(employee_id)
            .fetch_optional(&mut *conn)
            .await?;

    sqlx::query(
        r#"
        INSERT INTO employee_images (employee_id, file_name, file_type, file_path)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (employee_id) DO UPDATE
        SET file_name = EXCLUDED.file_name,
            file_type = EXCLUDED.file_type,
            file_path = EXCLUDED.file_path
        "#,
    )
    .bind(employee_id)
    .bind(&image.file_name)
    .bind(&image.file_type)
    .bind(&image.file_path)
    .execute(&mut *conn)
    .await?;

    Ok(previous.filter(|path| *path != image.file_path))
}

async fn insert_employee(
    pool: &PgPool,
    new: &NewEmployee,
    image: Option<&StoredFile>,
) -> Result<Employee, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let employee = sqlx::query_as::<_, Employee>(
        r#"
        INSERT INTO employees (emp_id, name, position, salary)
        VALUES ($1, $2, $3, $4)
        RETURNING id, emp_id, name, position, salary
        "#,
    )
    .bind(&new.emp_id)
    .bind(&new.name)
    .bind(&new.position)
    .bind(&new.salary)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(image) = image {
        upsert_image(&mut tx, employee.id, image).await?;
    }

    tx.commit().await?;
    Ok(employee)
}

async fn apply_update(
    pool: &PgPool,
    update: &EmployeeUpdate,
    image: Option<&StoredFile>,
) -> Result<EmployeeWrite, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let result =
        sqlx::query("UPDATE employees SET name = $1, position = $2, salary = $3 WHERE id = $4")
            .bind(&update.name)
            .bind(&update.position)
            .bind(&update.salary)
            .bind(update.id)
            .execute(&mut *tx)
            .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(EmployeeWrite::Missing);
    }

    let replaced = match image {
        Some(image) => upsert_image(&mut tx, update.id, image).await?,
        None => None,
    };

    tx.commit().await?;
    Ok(EmployeeWrite::Saved(replaced))
}

async fn remove_employee(pool: &PgPool, id: i32) -> Result<EmployeeWrite, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let image_path: Option<String> = sqlx::query_scalar(
        "DELETE FROM employee_images WHERE employee_id = $1 RETURNING file_path",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let deleted = sqlx::query("DELETE FROM employees WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if deleted.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(EmployeeWrite::Missing);
    }

    tx.commit().await?;
    Ok(EmployeeWrite::Saved(image_path))
}

#[utoipa::path(
    post,
    path = "/api/employee/add",
    tag = "Employees",
    request_body(content = EmployeeUploadSchema, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Employee added", body = EmployeeCreated),
        (status = 400, description = "A field is missing or zero"),
        (status = 500, description = "Database error")
    )
)]
pub async fn add_employee(
    State(state): State<AppState>,
    mut form: UploadForm,
) -> Result<ApiResponse<EmployeeCreated>, AppError> {
    form.retain_field(PROFILE_IMAGE_FIELD).await;
    let new = form.discard_on_err(NewEmployee::from_form(&form)).await?;
    let image = form.discard_on_err(single_profile_image(&form)).await?;

    let inserted = insert_employee(&state.pool, &new, image)
        .await
        .map_err(|e| AppError::dependency("Failed to add the employee. Please try again.", e));
    let employee = form.discard_on_err(inserted).await?;

    info!(
        "Employee {} ({}) added, profile image: {}",
        employee.id,
        employee.emp_id,
        image.is_some()
    );

    let profile_image = image.map(|file| file.file_name.clone());
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Employee added successfully!",
        EmployeeCreated {
            employee: EmployeeRecord::new(employee, profile_image),
        },
    ))
}

#[utoipa::path(
    get,
    path = "/api/employee/get",
    tag = "Employees",
    responses(
        (status = 200, description = "Employees with their profile image", body = EmployeeList),
        (status = 500, description = "Database error")
    )
)]
pub async fn get_all_employees(
    State(state): State<AppState>,
) -> Result<ApiResponse<EmployeeList>, AppError> {
    let rows = sqlx::query_as::<_, EmployeeImageRow>(
        r#"
        SELECT e.id, e.emp_id, e.name, e.position, e.salary, ei.file_name
        FROM employees e
        LEFT JOIN employee_images ei ON e.id = ei.employee_id
        ORDER BY e.id
        "#,
    )
    .fetch_all(&state.pool)
    .await
    .map_err(|e| AppError::dependency("Failed to fetch employees. Please try again.", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Employees fetched successfully",
        EmployeeList {
            employees: group_employee_rows(rows),
        },
    ))
}

#[utoipa::path(
    put,
    path = "/api/employee/update",
    tag = "Employees",
    request_body(content = EmployeeUploadSchema, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Employee updated"),
        (status = 400, description = "A field is missing or zero"),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Database error")
    )
)]
pub async fn update_employee(
    State(state): State<AppState>,
    mut form: UploadForm,
) -> Result<ApiResponse, AppError> {
    form.retain_field(PROFILE_IMAGE_FIELD).await;
    let update = form.discard_on_err(EmployeeUpdate::from_form(&form)).await?;
    let image = form.discard_on_err(single_profile_image(&form)).await?;

    let written = apply_update(&state.pool, &update, image)
        .await
        .map_err(|e| AppError::dependency("Failed to update employee. Please try again.", e));

    match form.discard_on_err(written).await? {
        EmployeeWrite::Missing => {
            form.discard().await;
            Err(AppError::not_found("Employee not found."))
        }
        EmployeeWrite::Saved(replaced) => {
            remove_paths(replaced.as_slice()).await;
            info!("Employee {} updated", update.id);
            Ok(ApiResponse::ack("Employee updated successfully!"))
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/employee/delete",
    tag = "Employees",
    request_body = IdRequest,
    responses(
        (status = 200, description = "Employee and image deleted"),
        (status = 400, description = "Id missing"),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Database error")
    )
)]
pub async fn delete_employee(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<IdRequest>,
) -> Result<ApiResponse, AppError> {
    let id = payload.required("ID is required to delete employee.")?;

    let removed = remove_employee(&state.pool, id)
        .await
        .map_err(|e| AppError::dependency("Failed to delete employee. Please try again.", e))?;

    match removed {
        EmployeeWrite::Missing => Err(AppError::not_found("Employee not found.")),
        EmployeeWrite::Saved(image_path) => {
            remove_paths(image_path.as_slice()).await;
            info!("Employee {id} deleted");
            Ok(ApiResponse::ack("Employee deleted successfully!"))
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(add_employee, get_all_employees, update_employee, delete_employee),
    components(schemas(
        Employee,
        EmployeeRecord,
        EmployeeCreated,
        EmployeeList,
        EmployeeUploadSchema,
        IdRequest,
    )),
    tags(
        (name = "Employees", description = "Staff records and profile images")
    )
)]
pub struct EmployeeDoc;

use axum::{extract::State, http::StatusCode};
use sqlx::PgPool;
use tracing::info;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::db::models::material::{
    group_material_rows, FlatMaterialList, Material, MaterialCreated, MaterialImageRow,
    MaterialList, MaterialRecord, MaterialUploadSchema, NewMaterial, UpdateMaterial,
    UpdateMaterialQuantity,
};
use crate::db::models::{truthy_id, IdRequest};
use crate::utils::api_response::ApiResponse;
use crate::utils::error::AppError;
use crate::utils::extract::JsonBody;
use crate::utils::upload::{remove_paths, StoredFile, UploadForm};

async fn insert_material(
    pool: &PgPool,
    new: &NewMaterial,
    images: &[StoredFile],
) -> Result<Material, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let material = sqlx::query_as::<_, Material>(
        r#"
        INSERT INTO materials (item_id, item_name, available_qty, unit_price)
        VALUES ($1, $2, $3, $4)
        RETURNING id, item_id, item_name, available_qty, unit_price
        "#,
    )
    .bind(&new.item_id)
    .bind(&new.item_name)
    .bind(new.available_qty)
    .bind(&new.unit_price)
    .fetch_one(&mut *tx)
    .await?;

    for image in images {
        sqlx::query(
            r#"
            INSERT INTO material_images (material_id, file_path, file_type, file_name)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(material.id)
        .bind(&image.file_path)
        .bind(&image.file_type)
        .bind(&image.file_name)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(material)
}

/// Deletes the material and its image rows. Returns the stored paths of the
/// removed images, or `None` when no material has `id`.
async fn remove_material(pool: &PgPool, id: i32) -> Result<Option<Vec<String>>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let paths: Vec<String> = sqlx::query_scalar(
        "DELETE FROM material_images WHERE material_id = $1 RETURNING file_path",
    )
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;

    let deleted = sqlx::query("DELETE FROM materials WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if deleted.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    tx.commit().await?;
    Ok(Some(paths))
}

#[utoipa::path(
    post,
    path = "/api/material/add",
    tag = "Materials",
    request_body(content = MaterialUploadSchema, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Material added", body = MaterialCreated),
        (status = 400, description = "A field is missing or zero"),
        (status = 500, description = "Database error")
    )
)]
pub async fn add_material(
    State(state): State<AppState>,
    form: UploadForm,
) -> Result<ApiResponse<MaterialCreated>, AppError> {
    let new = form.discard_on_err(NewMaterial::from_form(&form)).await?;

    let inserted = insert_material(&state.pool, &new, form.files())
        .await
        .map_err(|e| AppError::dependency("Failed to add the material. Please try again.", e));
    let material = form.discard_on_err(inserted).await?;

    info!(
        "Material {} ({}) added with {} image(s)",
        material.id,
        material.item_id,
        form.files().len()
    );

    let images = form.files().iter().map(|file| file.file_path.clone()).collect();
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Material added successfully!",
        MaterialCreated {
            material: MaterialRecord::new(material, images),
        },
    ))
}

#[utoipa::path(
    get,
    path = "/api/material/get",
    tag = "Materials",
    responses(
        (status = 200, description = "Materials with their image file names", body = MaterialList),
        (status = 500, description = "Database error")
    )
)]
pub async fn get_all_materials(
    State(state): State<AppState>,
) -> Result<ApiResponse<MaterialList>, AppError> {
    let rows = sqlx::query_as::<_, MaterialImageRow>(
        r#"
        SELECT m.id, m.item_id, m.item_name, m.available_qty, m.unit_price, mi.file_name
        FROM materials m
        LEFT JOIN material_images mi ON m.id = mi.material_id
        ORDER BY m.id, mi.id
        "#,
    )
    .fetch_all(&state.pool)
    .await
    .map_err(|e| AppError::dependency("Failed to fetch materials. Please try again.", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Materials fetched successfully",
        MaterialList {
            materials: group_material_rows(rows),
        },
    ))
}

#[utoipa::path(
    get,
    path = "/api/material/all",
    tag = "Materials",
    responses(
        (status = 200, description = "Material rows without images", body = FlatMaterialList),
        (status = 500, description = "Database error")
    )
)]
pub async fn list_materials(
    State(state): State<AppState>,
) -> Result<ApiResponse<FlatMaterialList>, AppError> {
    let materials = sqlx::query_as::<_, Material>(
        "SELECT id, item_id, item_name, available_qty, unit_price FROM materials ORDER BY id",
    )
    .fetch_all(&state.pool)
    .await
    .map_err(|e| AppError::dependency("Failed to fetch materials. Please try again.", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Materials fetched successfully",
        FlatMaterialList { materials },
    ))
}

#[utoipa::path(
    put,
    path = "/api/material/update",
    tag = "Materials",
    request_body = UpdateMaterial,
    responses(
        (status = 200, description = "Material updated"),
        (status = 400, description = "Id, quantity or price missing, or price out of range"),
        (status = 404, description = "Material not found"),
        (status = 500, description = "Database error")
    )
)]
pub async fn update_material(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<UpdateMaterial>,
) -> Result<ApiResponse, AppError> {
    let (id, available_qty, unit_price) = payload.fields()?;

    let result =
        sqlx::query("UPDATE materials SET available_qty = $1, unit_price = $2 WHERE id = $3")
            .bind(available_qty)
            .bind(&unit_price)
            .bind(id)
            .execute(&state.pool)
            .await
            .map_err(|e| AppError::dependency("Failed to update material. Please try again.", e))?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Material not found."));
    }

    info!("Material {id} updated: qty={available_qty}, price={unit_price}");
    Ok(ApiResponse::ack("Material updated successfully!"))
}

#[utoipa::path(
    put,
    path = "/api/material/update-quantity",
    tag = "Materials",
    request_body = UpdateMaterialQuantity,
    responses(
        (status = 200, description = "Quantity updated"),
        (status = 400, description = "Id or quantity missing"),
        (status = 404, description = "Material not found"),
        (status = 500, description = "Database error")
    )
)]
pub async fn update_material_quantity(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<UpdateMaterialQuantity>,
) -> Result<ApiResponse, AppError> {
    let (Some(id), Some(available_qty)) = (truthy_id(payload.id), payload.available_qty) else {
        return Err(AppError::validation("ID and Quantity are required."));
    };

    let result = sqlx::query("UPDATE materials SET available_qty = $1 WHERE id = $2")
        .bind(available_qty)
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(|e| {
            AppError::dependency("Failed to update material quantity. Please try again.", e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Material not found."));
    }

    info!("Material {id} quantity set to {available_qty}");
    Ok(ApiResponse::ack("Material quantity updated successfully!"))
}

#[utoipa::path(
    delete,
    path = "/api/material/delete",
    tag = "Materials",
    request_body = IdRequest,
    responses(
        (status = 200, description = "Material and its images deleted"),
        (status = 400, description = "Id missing"),
        (status = 404, description = "Material not found"),
        (status = 500, description = "Database error")
    )
)]
pub async fn delete_material(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<IdRequest>,
) -> Result<ApiResponse, AppError> {
    let id = payload.required("ID is required to delete material.")?;

    let removed = remove_material(&state.pool, id)
        .await
        .map_err(|e| AppError::dependency("Failed to delete material. Please try again.", e))?;

    let Some(paths) = removed else {
        return Err(AppError::not_found("Material not found."));
    };

    remove_paths(&paths).await;
    info!("Material {id} deleted with {} image(s)", paths.len());
    Ok(ApiResponse::ack("Material deleted successfully!"))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        add_material,
        get_all_materials,
        list_materials,
        update_material,
        update_material_quantity,
        delete_material,
    ),
    components(schemas(
        Material,
        MaterialRecord,
        MaterialCreated,
        MaterialList,
        FlatMaterialList,
        UpdateMaterial,
        UpdateMaterialQuantity,
        MaterialUploadSchema,
        IdRequest,
    )),
    tags(
        (name = "Materials", description = "Inventory materials and their images")
    )
)]
pub struct MaterialDoc;

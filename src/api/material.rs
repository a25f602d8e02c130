use crate::app_state::AppState;
use crate::db::queries::material::{
    add_material, delete_material, get_all_materials, list_materials, update_material,
    update_material_quantity,
};
use axum::{
    routing::{delete, get, post, put},
    Router,
};

pub fn material_routes() -> Router<AppState> {
    Router::new()
        .route("/api/material/add", post(add_material))
        .route("/api/material/get", get(get_all_materials))
        .route("/api/material/all", get(list_materials))
        .route("/api/material/update", put(update_material))
        .route("/api/material/update-quantity", put(update_material_quantity))
        .route("/api/material/delete", delete(delete_material))
}

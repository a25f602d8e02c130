use crate::app_state::AppState;
use crate::db::queries::employee::{
    add_employee, delete_employee, get_all_employees, update_employee,
};
use axum::{
    routing::{delete, get, post, put},
    Router,
};

pub fn employee_routes() -> Router<AppState> {
    Router::new()
        .route("/api/employee/add", post(add_employee))
        .route("/api/employee/get", get(get_all_employees))
        .route("/api/employee/update", put(update_employee))
        .route("/api/employee/delete", delete(delete_employee))
}

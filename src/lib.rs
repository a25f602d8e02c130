//! Inventory, staff and teacher account backend for a learning management
//! system, plus the client used by the teacher sign-in form.

pub mod api;
pub mod app_state;
pub mod client;
pub mod config;
pub mod db;
pub mod middleware;
pub mod utils;
pub mod validation;

pub mod api_response;
pub mod error;
pub mod extract;
pub mod upload;

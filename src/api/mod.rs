//! HTTP API layer: DTOs, Axum handlers and the router with Swagger UI.

pub mod dto;
pub mod handlers;
pub mod router;

pub use router::{create_api_router, ApiContext, ApiDoc};

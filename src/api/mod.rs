//! HTTP adapter over [`WikiClient`](crate::client::WikiClient).

pub mod models;
pub mod response;
pub mod routes;

pub use routes::create_router;

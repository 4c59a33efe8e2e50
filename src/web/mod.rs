//! Web API module for the gazetteer service.

pub mod error;
pub mod middleware;
pub mod routes;

pub use routes::router;

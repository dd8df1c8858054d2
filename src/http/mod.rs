//! HTTP API Module
//!
//! Exposes the relay over HTTP: task submission, listing and cancellation,
//! a Server-Sent Events stream of status changes, and the saved images.

pub mod handlers;
pub mod routes;
pub mod server;
pub mod types;

pub use handlers::AppState;
pub use routes::create_router;
pub use server::HttpServer;

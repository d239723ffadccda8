//! HTTP and WebSocket surface of the realtime server

pub mod handlers;
pub mod routes;
pub mod ws_handlers;

pub use routes::create_router;

//! HTTP API handlers for mfl-loader
//!
//! REST control endpoints plus an SSE stream of load events.

pub mod health;
pub mod load;
pub mod sse;

pub use health::health_routes;
pub use load::load_routes;
pub use sse::event_stream;

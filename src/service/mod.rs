//! Handshake Gateway REST Service
//!
//! ## Endpoints
//!
//! - `POST /ans/handshake` - Run the handshake pipeline
//! - `GET /health` - Detailed service health check
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe (vault present)

pub mod middleware;
pub mod routes;
pub mod state;

pub use middleware::{metrics_middleware, record_handshake};
pub use routes::{create_router, ErrorResponse, HANDSHAKE_PATH};
pub use state::ServiceState;

//! Observability - per-request ids and spans.

mod request_id;

pub use request_id::{RequestId, RequestIdMiddleware};

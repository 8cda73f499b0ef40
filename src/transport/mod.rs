//! HTTP plumbing: request descriptors and the retrying transport.

pub mod request;
pub mod retry;

pub use request::{MultipartSpec, RequestBody, RequestSpec};
pub use retry::{decode_envelope, RetryingTransport};

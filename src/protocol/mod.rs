//! Typed client for the upload session protocol.

mod backend;
mod client;

pub use backend::UploadBackend;
pub use client::{HttpUploadClient, OperationPolicies};

//! epo-reputation domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Digest records, digests and reputation values
//! - `protocol`: ePO remote command shape and response contract
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `usecases`: Batch submission of reputations

pub mod model;
pub mod ports;
pub mod protocol;
pub mod usecases;

pub use model::*;
pub use ports::*;
pub use protocol::{ApiCall, ApiResponse, OutputMode, Params, UploadFile};

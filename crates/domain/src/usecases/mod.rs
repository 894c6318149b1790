//! Application use cases / business logic

pub mod submit;

pub use submit::{
    DEFAULT_CHUNK_SIZE, SubmitError, SubmitReport, SubmitReputations, SubmitState, chunk_count,
};

//! Batch submission of digest records to `tie.setReputations`

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::{
    model::DigestRecord,
    ports::{EpoApi, EpoError},
    protocol::{ApiCall, ApiResponse},
};

/// Default maximum number of records per request
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Progress of a submission run, reported to an observer as it changes
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitState {
    Idle,
    /// No cached token yet; the first chunk call will fetch one
    TokenPending,
    /// About to send chunk `chunk` (1-based) of `chunk_count`
    Submitting {
        chunk: usize,
        chunk_count: usize,
        /// 0-based index of the first record in this chunk
        offset: usize,
        total: usize,
    },
    Succeeded {
        records_sent: usize,
        chunk_count: usize,
    },
    Failed {
        chunk: usize,
        chunk_count: usize,
        message: String,
    },
}

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitReport {
    pub records_sent: usize,
    pub chunk_count: usize,
    /// One response per chunk, in order
    pub responses: Vec<ApiResponse>,
}

impl SubmitReport {
    /// Whether every chunk response carried a truthy payload
    pub fn all_accepted(&self) -> bool {
        self.responses.iter().all(ApiResponse::is_truthy)
    }
}

/// Errors from a submission run. Chunks already accepted stay accepted.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("chunk {chunk} of {chunk_count} failed: {source}")]
    ChunkFailed {
        chunk: usize,
        chunk_count: usize,
        offset: usize,
        records_sent: usize,
        #[source]
        source: EpoError,
    },
    #[error("submission cancelled after {records_sent} records ({chunks_sent} of {chunk_count} chunks)")]
    Cancelled {
        records_sent: usize,
        chunks_sent: usize,
        chunk_count: usize,
    },
    #[error("Failed to encode reputations: {0}")]
    Encode(String),
}

impl SubmitError {
    /// Records the server accepted before the run stopped
    pub fn records_sent(&self) -> usize {
        match self {
            SubmitError::ChunkFailed { records_sent, .. }
            | SubmitError::Cancelled { records_sent, .. } => *records_sent,
            SubmitError::Encode(_) => 0,
        }
    }
}

/// Number of requests needed for `total` records
pub fn chunk_count(total: usize, chunk_size: usize) -> usize {
    total.div_ceil(chunk_size.max(1))
}

/// Use case for submitting reputations in request-sized chunks
pub struct SubmitReputations<A> {
    api: A,
    chunk_size: usize,
}

impl<A: EpoApi> SubmitReputations<A> {
    /// `chunk_size` below 1 is treated as 1
    pub fn new(api: A, chunk_size: usize) -> Self {
        Self {
            api,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Submit all records, one call per chunk, stopping at the first failure
    pub async fn submit<F>(
        &self,
        records: &[DigestRecord],
        on_state: F,
    ) -> Result<SubmitReport, SubmitError>
    where
        F: FnMut(&SubmitState),
    {
        let never = AtomicBool::new(false);
        self.submit_cancellable(records, &never, on_state).await
    }

    /// Like [`submit`](Self::submit), checking `cancel` before each chunk
    pub async fn submit_cancellable<F>(
        &self,
        records: &[DigestRecord],
        cancel: &AtomicBool,
        mut on_state: F,
    ) -> Result<SubmitReport, SubmitError>
    where
        F: FnMut(&SubmitState),
    {
        let total = records.len();
        let chunk_count = chunk_count(total, self.chunk_size);
        let mut responses = Vec::with_capacity(chunk_count);
        let mut records_sent = 0;

        on_state(&SubmitState::Idle);

        if total > 0 && !self.api.has_token() {
            on_state(&SubmitState::TokenPending);
        }

        for (index, chunk) in records.chunks(self.chunk_size).enumerate() {
            let number = index + 1;
            let offset = index * self.chunk_size;

            if cancel.load(Ordering::SeqCst) {
                tracing::warn!(records_sent, chunk = number, chunk_count, "Submission cancelled");
                let err = SubmitError::Cancelled {
                    records_sent,
                    chunks_sent: index,
                    chunk_count,
                };
                on_state(&SubmitState::Failed {
                    chunk: number,
                    chunk_count,
                    message: err.to_string(),
                });
                return Err(err);
            }

            on_state(&SubmitState::Submitting {
                chunk: number,
                chunk_count,
                offset,
                total,
            });

            tracing::info!(
                chunk = number,
                chunk_count,
                offset,
                total,
                size = chunk.len(),
                "Sending reputations"
            );

            let call = ApiCall::set_reputations(chunk).map_err(|e| {
                let err = SubmitError::Encode(e.to_string());
                on_state(&SubmitState::Failed {
                    chunk: number,
                    chunk_count,
                    message: err.to_string(),
                });
                err
            })?;

            match self.api.invoke(call).await {
                Ok(response) => {
                    records_sent += chunk.len();
                    responses.push(response);
                }
                Err(source) => {
                    tracing::error!(
                        chunk = number,
                        chunk_count,
                        records_sent,
                        error = %source,
                        "Chunk rejected"
                    );
                    let err = SubmitError::ChunkFailed {
                        chunk: number,
                        chunk_count,
                        offset,
                        records_sent,
                        source,
                    };
                    on_state(&SubmitState::Failed {
                        chunk: number,
                        chunk_count,
                        message: err.to_string(),
                    });
                    return Err(err);
                }
            }
        }

        on_state(&SubmitState::Succeeded {
            records_sent,
            chunk_count,
        });

        Ok(SubmitReport {
            records_sent,
            chunk_count,
            responses,
        })
    }
}

#[async_trait]
impl<A: EpoApi + ?Sized> EpoApi for &A {
    async fn invoke(&self, call: ApiCall) -> Result<ApiResponse, EpoError> {
        (*self).invoke(call).await
    }

    fn has_token(&self) -> bool {
        (*self).has_token()
    }
}

#[async_trait]
impl<A: EpoApi + ?Sized> EpoApi for std::sync::Arc<A> {
    async fn invoke(&self, call: ApiCall) -> Result<ApiResponse, EpoError> {
        self.as_ref().invoke(call).await
    }

    fn has_token(&self) -> bool {
        self.as_ref().has_token()
    }
}

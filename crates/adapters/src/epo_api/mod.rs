//! ePO API adapters

mod client;

pub use client::{EpoClient, EpoClientConfig};

use async_trait::async_trait;
use epo_reputation_domain::protocol::SET_REPUTATIONS_COMMAND;
use epo_reputation_domain::{ApiCall, ApiResponse, EpoApi, EpoError, Params};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// A call captured by [`StubEpoApi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub command: String,
    pub params: Params,
}

/// Offline ePO API for dry runs and testing.
///
/// Accepts every call with `true` unless told to fail on the n-th
/// `tie.setReputations` call.
pub struct StubEpoApi {
    fail_on: Option<(usize, EpoError)>,
    calls: Mutex<Vec<RecordedCall>>,
    token: AtomicBool,
}

impl StubEpoApi {
    /// Create a stub that accepts everything
    pub fn accepting() -> Self {
        Self {
            fail_on: None,
            calls: Mutex::new(vec![]),
            token: AtomicBool::new(false),
        }
    }

    /// Create a stub whose `call`-th (1-based) reputation submission fails with `error`
    pub fn failing_on(call: usize, error: EpoError) -> Self {
        Self {
            fail_on: Some((call, error)),
            ..Self::accepting()
        }
    }

    /// Get all calls received so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for StubEpoApi {
    fn default() -> Self {
        Self::accepting()
    }
}

#[async_trait]
impl EpoApi for StubEpoApi {
    async fn invoke(&self, call: ApiCall) -> Result<ApiResponse, EpoError> {
        if call.is_token_fetch() {
            return Ok(ApiResponse::Json(serde_json::json!("stub-token")));
        }
        self.token.store(true, Ordering::SeqCst);

        let recorded = RecordedCall {
            command: call.command().to_string(),
            params: call.merged_params(),
        };
        tracing::info!(command = %recorded.command, "[DRY RUN] Would invoke ePO command");

        let submissions = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(recorded);
            calls
                .iter()
                .filter(|c| c.command == SET_REPUTATIONS_COMMAND)
                .count()
        };

        if let Some((n, error)) = &self.fail_on {
            if call.command() == SET_REPUTATIONS_COMMAND && submissions == *n {
                return Err(error.clone());
            }
        }

        Ok(ApiResponse::Json(serde_json::json!(true)))
    }

    fn has_token(&self) -> bool {
        self.token.load(Ordering::SeqCst)
    }
}

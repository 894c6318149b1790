//! HTTP client for the ePO remote command API

use async_trait::async_trait;
use epo_reputation_domain::protocol::{self, OUTPUT_PARAM, TOKEN_COMMAND, TOKEN_PARAM};
use epo_reputation_domain::{ApiCall, ApiResponse, DigestRecord, EpoApi, EpoError, OutputMode};
use reqwest::{Client, multipart};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Once;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Guard so disabling certificate checks is reported once per process.
static INSECURE_TLS_WARNING: Once = Once::new();

fn warn_insecure_tls_once() {
    INSECURE_TLS_WARNING.call_once(|| {
        tracing::warn!("TLS certificate verification is disabled for ePO connections");
    });
}

/// Connection settings for an [`EpoClient`]
#[derive(Debug)]
pub struct EpoClientConfig {
    /// Server base URL, e.g. `https://epo.example.com:8443`
    pub url: String,
    pub username: String,
    pub password: SecretString,
    pub verify_tls: bool,
    pub timeout: Duration,
}

/// ePO API client.
///
/// Every command except `core.getSecurityToken` carries the session token,
/// which is fetched on first use and cached for the client's lifetime.
pub struct EpoClient {
    client: Client,
    url: String,
    username: String,
    password: SecretString,
    token: OnceCell<String>,
}

impl EpoClient {
    pub fn new(config: EpoClientConfig) -> Result<Self, EpoError> {
        if config.timeout.is_zero() {
            return Err(EpoError::Config(
                "Request timeout must be positive".to_string(),
            ));
        }

        if !config.verify_tls {
            warn_insecure_tls_once();
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| EpoError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.url,
            username: config.username,
            password: config.password,
            token: OnceCell::new(),
        })
    }

    /// Return the cached security token, fetching it if this is the first use
    pub async fn security_token(&self) -> Result<&str, EpoError> {
        self.ensure_configured()?;

        self.token
            .get_or_try_init(|| async {
                tracing::debug!(url = %self.url, "Fetching security token");
                let response = self.request(ApiCall::new(TOKEN_COMMAND), None).await?;
                Ok::<_, EpoError>(response.into_token())
            })
            .await
            .map(String::as_str)
    }

    /// Submit one `tie.setReputations` call carrying all `records`
    pub async fn set_reputations(
        &self,
        records: &[DigestRecord],
    ) -> Result<ApiResponse, EpoError> {
        let call = ApiCall::set_reputations(records)
            .map_err(|e| EpoError::Decode(format!("Failed to encode fileReps: {}", e)))?;
        self.invoke(call).await
    }

    fn ensure_configured(&self) -> Result<(), EpoError> {
        if self.url.trim().is_empty() {
            return Err(EpoError::Config("ePO URL is missing".to_string()));
        }
        if self.username.trim().is_empty() {
            return Err(EpoError::Config("ePO username is missing".to_string()));
        }
        if self.password.expose_secret().is_empty() {
            return Err(EpoError::Config("ePO password is missing".to_string()));
        }
        Ok(())
    }

    fn command_url(&self, command: &str) -> String {
        format!("{}/remote/{}", self.url.trim_end_matches('/'), command)
    }

    async fn request(&self, call: ApiCall, token: Option<&str>) -> Result<ApiResponse, EpoError> {
        let has_body = call.has_body();
        let (command, mut params, files, data) = call.into_request();

        let json_output =
            params.set_default(OUTPUT_PARAM, OutputMode::Json.as_str()) == OutputMode::Json.as_str();
        if let Some(token) = token {
            params.set_default(TOKEN_PARAM, token);
        }

        let url = self.command_url(&command);

        let builder = if !has_body {
            self.client.get(&url)
        } else if files.is_empty() {
            self.client.post(&url).form(&data)
        } else {
            let mut form = multipart::Form::new();
            for (key, value) in data {
                form = form.text(key, value);
            }
            for file in files {
                form = form.part(
                    file.field,
                    multipart::Part::bytes(file.bytes).file_name(file.file_name),
                );
            }
            self.client.post(&url).multipart(form)
        };

        let method = if has_body { "POST" } else { "GET" };
        tracing::debug!(
            command = %command,
            method,
            param_count = params.len(),
            "Calling ePO"
        );

        let response = builder
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .query(params.as_slice())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = body_or_read_error(response.text().await);
            tracing::warn!(command = %command, status = status.as_u16(), "ePO returned HTTP error");
            return Err(EpoError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(transport_error)?;
        let result = protocol::parse_response(&body, json_output);

        if let Err(EpoError::Api(ref message)) = result {
            tracing::warn!(command = %command, message = %message, "ePO rejected command");
        }

        result
    }
}

/// Body of an error response, or why it could not be read
fn body_or_read_error<E: std::fmt::Display>(body: Result<String, E>) -> String {
    body.unwrap_or_else(|e| format!("<failed to read response body: {}>", e))
}

fn transport_error(error: reqwest::Error) -> EpoError {
    if error.is_timeout() {
        EpoError::Timeout(error.to_string())
    } else {
        EpoError::Network(error.to_string())
    }
}

#[async_trait]
impl EpoApi for EpoClient {
    async fn invoke(&self, call: ApiCall) -> Result<ApiResponse, EpoError> {
        self.ensure_configured()?;

        if call.is_token_fetch() {
            return self.request(call, None).await;
        }

        let token = self.security_token().await?;
        self.request(call, Some(token)).await
    }

    fn has_token(&self) -> bool {
        self.token.initialized()
    }
}

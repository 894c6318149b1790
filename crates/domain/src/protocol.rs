//! ePO remote command protocol: call shape, parameter merging, response parsing

use serde_json::Value;

use crate::model::DigestRecord;
use crate::ports::EpoError;

/// Command that returns a session security token
pub const TOKEN_COMMAND: &str = "core.getSecurityToken";

/// Command that stores file reputations in TIE
pub const SET_REPUTATIONS_COMMAND: &str = "tie.setReputations";

/// Parameter selecting the response format
pub const OUTPUT_PARAM: &str = ":output";

/// Parameter carrying the security token
pub const TOKEN_PARAM: &str = "orion.user.security.token";

/// Parameter carrying the JSON encoded reputation array
pub const FILE_REPS_PARAM: &str = "fileReps";

/// Marker at the start of every successful response body
pub const SUCCESS_PREFIX: &str = "OK:";

/// Response format requested through `:output`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Json,
    Terse,
    Verbose,
    Xml,
}

impl OutputMode {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputMode::Json => "json",
            OutputMode::Terse => "terse",
            OutputMode::Verbose => "verbose",
            OutputMode::Xml => "xml",
        }
    }
}

/// Ordered string parameters where a later `set` replaces an earlier key in place
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(index) => self.0[index].1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Insert `value` unless the key is present; returns the effective value
    pub fn set_default(&mut self, key: &str, value: impl Into<String>) -> &str {
        let index = match self.position(key) {
            Some(index) => index,
            None => {
                self.0.push((key.to_string(), value.into()));
                self.0.len() - 1
            }
        };
        &self.0[index].1
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key).map(|index| self.0[index].1.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[(String, String)] {
        &self.0
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.0.iter().position(|(k, _)| k == key)
    }
}

/// A file uploaded with a command as a multipart part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A remote command invocation.
///
/// Positional arguments become `param1`, `param2`, ... Named arguments
/// override positional ones and explicit params override both.
#[derive(Debug, Clone, Default)]
pub struct ApiCall {
    command: String,
    args: Vec<String>,
    named: Vec<(String, String)>,
    params: Vec<(String, String)>,
    files: Vec<UploadFile>,
    data: Vec<(String, String)>,
}

impl ApiCall {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// `tie.setReputations` with the given records as `fileReps`
    pub fn set_reputations(records: &[DigestRecord]) -> Result<Self, serde_json::Error> {
        Ok(Self::new(SET_REPUTATIONS_COMMAND).param(FILE_REPS_PARAM, encode_file_reps(records)?))
    }

    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn named(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.named.push((key.into(), value.into()));
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn output(self, mode: OutputMode) -> Self {
        self.param(OUTPUT_PARAM, mode.as_str())
    }

    pub fn file(mut self, file: UploadFile) -> Self {
        self.files.push(file);
        self
    }

    /// Form field sent in a POST body
    pub fn data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.push((key.into(), value.into()));
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn is_token_fetch(&self) -> bool {
        self.command == TOKEN_COMMAND
    }

    /// Whether the call needs a POST body
    pub fn has_body(&self) -> bool {
        !self.files.is_empty() || !self.data.is_empty()
    }

    /// Flatten positional, named and explicit parameters with their precedence
    pub fn merged_params(&self) -> Params {
        let mut params = Params::new();
        for (index, value) in self.args.iter().enumerate() {
            params.set(format!("param{}", index + 1), value.as_str());
        }
        for (key, value) in self.named.iter().chain(self.params.iter()) {
            params.set(key.as_str(), value.as_str());
        }
        params
    }

    /// Split into the parts an HTTP transport needs
    pub fn into_request(self) -> (String, Params, Vec<UploadFile>, Vec<(String, String)>) {
        let params = self.merged_params();
        (self.command, params, self.files, self.data)
    }
}

/// Deserialized payload of a successful response
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Json(Value),
    Text(String),
}

impl ApiResponse {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ApiResponse::Json(value) => Some(value),
            ApiResponse::Text(_) => None,
        }
    }

    /// Falsy payloads (`null`, `false`, `0`, empty string/array/object) mean the
    /// command ran but did nothing
    pub fn is_truthy(&self) -> bool {
        match self {
            ApiResponse::Json(Value::Null) | ApiResponse::Json(Value::Bool(false)) => false,
            ApiResponse::Json(Value::Number(n)) => n.as_f64() != Some(0.0),
            ApiResponse::Json(Value::String(s)) => !s.is_empty(),
            ApiResponse::Json(Value::Array(a)) => !a.is_empty(),
            ApiResponse::Json(Value::Object(o)) => !o.is_empty(),
            ApiResponse::Json(Value::Bool(true)) => true,
            ApiResponse::Text(text) => !text.is_empty(),
        }
    }

    /// Read the payload as a security token
    pub fn into_token(self) -> String {
        match self {
            ApiResponse::Json(Value::String(token)) => token,
            ApiResponse::Json(other) => other.to_string(),
            ApiResponse::Text(text) => text.trim().to_string(),
        }
    }
}

/// Interpret a response body that arrived with a 2xx status.
///
/// Anything not starting with `OK:` is the server's error message, whatever
/// the requested output format.
pub fn parse_response(body: &str, json_output: bool) -> Result<ApiResponse, EpoError> {
    let Some(payload) = body.strip_prefix(SUCCESS_PREFIX) else {
        return Err(EpoError::Api(body.to_string()));
    };

    if json_output {
        serde_json::from_str(payload)
            .map(ApiResponse::Json)
            .map_err(|e| EpoError::Decode(e.to_string()))
    } else {
        Ok(ApiResponse::Text(payload.to_string()))
    }
}

/// JSON array of wire objects for the `fileReps` parameter
pub fn encode_file_reps(records: &[DigestRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string(records)
}

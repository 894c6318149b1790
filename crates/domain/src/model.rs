//! Domain models and value objects

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use md5::Md5;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest as _, Sha1};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use time::{Date, OffsetDateTime};

/// Error decoding a digest from its hex or base64 form
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DigestError {
    #[error("Invalid hex digest: {0}")]
    Hex(String),
    #[error("Invalid base64 digest: {0}")]
    Base64(String),
    #[error("Digest has wrong length: expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

/// A fixed-size binary digest.
///
/// Wire payloads carry digests as standard base64, exports and display use
/// lowercase hex. Both encodings parse back to the same bytes and a decode
/// of the wrong length is rejected, so a constructed digest is always whole.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest<const N: usize>([u8; N]);

/// MD5 digest (16 bytes)
pub type Md5Digest = Digest<16>;

/// SHA-1 digest (20 bytes)
pub type Sha1Digest = Digest<20>;

impl<const N: usize> Digest<N> {
    pub const LEN: usize = N;

    pub fn from_bytes(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, DigestError> {
        <[u8; N]>::try_from(bytes)
            .map(Self)
            .map_err(|_| DigestError::Length {
                expected: N,
                actual: bytes.len(),
            })
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    /// Lowercase hex, as used by the CSV export
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Padded standard base64, as used on the wire
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn from_hex(value: &str) -> Result<Self, DigestError> {
        let bytes = hex::decode(value.trim()).map_err(|e| DigestError::Hex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub fn from_base64(value: &str) -> Result<Self, DigestError> {
        let bytes = STANDARD
            .decode(value.trim())
            .map_err(|e| DigestError::Base64(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl<const N: usize> fmt::Debug for Digest<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl<const N: usize> fmt::Display for Digest<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl<const N: usize> Serialize for Digest<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de, const N: usize> Deserialize<'de> for Digest<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

/// Computes MD5 and SHA-1 over the same byte stream in one pass
#[derive(Clone, Default)]
pub struct FileHasher {
    md5: Md5,
    sha1: Sha1,
}

impl FileHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.md5.update(chunk);
        self.sha1.update(chunk);
    }

    pub fn finalize(self) -> (Md5Digest, Sha1Digest) {
        (
            Digest(self.md5.finalize().into()),
            Digest(self.sha1.finalize().into()),
        )
    }
}

/// Trust score attached to a file hash.
///
/// The server stores the ordinal value; the label is what users pick from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reputation {
    KnownMalicious,
    MostLikelyMalicious,
    MightBeMalicious,
    Unknown,
    MightBeTrusted,
    MostLikelyTrusted,
    KnownTrusted,
}

impl Reputation {
    /// All values, most trusted first
    pub const ALL: [Reputation; 7] = [
        Reputation::KnownTrusted,
        Reputation::MostLikelyTrusted,
        Reputation::MightBeTrusted,
        Reputation::Unknown,
        Reputation::MightBeMalicious,
        Reputation::MostLikelyMalicious,
        Reputation::KnownMalicious,
    ];

    pub fn score(self) -> u8 {
        match self {
            Reputation::KnownTrusted => 99,
            Reputation::MostLikelyTrusted => 85,
            Reputation::MightBeTrusted => 70,
            Reputation::Unknown => 50,
            Reputation::MightBeMalicious => 30,
            Reputation::MostLikelyMalicious => 15,
            Reputation::KnownMalicious => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Reputation::KnownTrusted => "Known trusted",
            Reputation::MostLikelyTrusted => "Most likely trusted",
            Reputation::MightBeTrusted => "Might be trusted",
            Reputation::Unknown => "Unknown",
            Reputation::MightBeMalicious => "Might be malicious",
            Reputation::MostLikelyMalicious => "Most likely malicious",
            Reputation::KnownMalicious => "Known malicious",
        }
    }

    /// Kebab-case name used on the command line
    pub fn slug(self) -> &'static str {
        match self {
            Reputation::KnownTrusted => "known-trusted",
            Reputation::MostLikelyTrusted => "most-likely-trusted",
            Reputation::MightBeTrusted => "might-be-trusted",
            Reputation::Unknown => "unknown",
            Reputation::MightBeMalicious => "might-be-malicious",
            Reputation::MostLikelyMalicious => "most-likely-malicious",
            Reputation::KnownMalicious => "known-malicious",
        }
    }

    pub fn from_score(score: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.score() == score)
    }

    /// Resolve a user's choice, falling back to `default` when it is not recognized
    pub fn resolve(choice: &str, default: Reputation) -> Reputation {
        match choice.parse() {
            Ok(reputation) => reputation,
            Err(e) => {
                tracing::warn!(error = %e, default = %default, "Using default reputation");
                default
            }
        }
    }
}

impl fmt::Display for Reputation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown reputation '{0}'")]
pub struct ParseReputationError(pub String);

impl FromStr for Reputation {
    type Err = ParseReputationError;

    /// Accepts the label (any case), the kebab-case name, or the ordinal score
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        if let Ok(score) = trimmed.parse::<u8>() {
            return Self::from_score(score).ok_or_else(|| ParseReputationError(s.to_string()));
        }

        Self::ALL
            .into_iter()
            .find(|r| r.label().eq_ignore_ascii_case(trimmed) || r.slug() == trimmed)
            .ok_or_else(|| ParseReputationError(s.to_string()))
    }
}

impl Serialize for Reputation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.score().to_string())
    }
}

impl<'de> Deserialize<'de> for Reputation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// One file's identity, hashes and submission-time reputation.
///
/// Serializes to the `fileReps` wire object:
/// `{name, comment, md5 (base64), sha1 (base64), reputation}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestRecord {
    name: String,
    comment: String,
    md5: Md5Digest,
    sha1: Sha1Digest,
    reputation: Reputation,
}

impl DigestRecord {
    pub fn new(
        name: impl Into<String>,
        comment: impl Into<String>,
        md5: Md5Digest,
        sha1: Sha1Digest,
        reputation: Reputation,
    ) -> Self {
        Self {
            name: name.into(),
            comment: comment.into(),
            md5,
            sha1,
            reputation,
        }
    }

    /// Hash in-memory file contents
    pub fn from_contents(
        name: impl Into<String>,
        comment: impl Into<String>,
        contents: &[u8],
        reputation: Reputation,
    ) -> Self {
        let mut hasher = FileHasher::new();
        hasher.update(contents);
        let (md5, sha1) = hasher.finalize();
        Self::new(name, comment, md5, sha1, reputation)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn md5(&self) -> &Md5Digest {
        &self.md5
    }

    pub fn sha1(&self) -> &Sha1Digest {
        &self.sha1
    }

    pub fn reputation(&self) -> Reputation {
        self.reputation
    }

    pub fn set_reputation(&mut self, reputation: Reputation) {
        self.reputation = reputation;
    }
}

/// Overwrite the reputation of every record ahead of a submission run
pub fn apply_reputation(records: &mut [DigestRecord], reputation: Reputation) {
    for record in records.iter_mut() {
        record.set_reputation(reputation);
    }
}

/// Comment stamped on new records: `"<date> <user>@WebAPI"`
pub fn submission_comment(now: OffsetDateTime, user: &str) -> String {
    format!("{} {}@WebAPI", now.date(), user)
}

/// Compact `YYYYMMDD` date, used in default export file names
pub fn compact_date(date: Date) -> String {
    format!(
        "{:04}{:02}{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Which files a directory scan picks up
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTypeFilter {
    /// Lowercase extensions without the dot; empty means every file
    extensions: Vec<String>,
}

impl FileTypeFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn is_all(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn allowed(&self) -> &[String] {
        &self.extensions
    }

    pub fn matches(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }

        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }
}

impl FromStr for FileTypeFilter {
    type Err = std::convert::Infallible;

    /// Presets `all`, `exe`, `dll`, `exe+dll`, or a comma separated extension list
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::all());
        }
        Ok(Self::extensions(trimmed.split([',', '+'])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    fn sample_record() -> DigestRecord {
        DigestRecord::from_contents(
            "setup.exe",
            "2016-11-14 alice@WebAPI",
            b"hello world",
            Reputation::KnownTrusted,
        )
    }

    #[test]
    fn test_from_contents_computes_known_digests() {
        let record = sample_record();

        assert_eq!(record.md5().to_hex(), "5eb63bbbe01eeed093cb22bb8f5acdc3");
        assert_eq!(
            record.sha1().to_hex(),
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"
        );
    }

    #[test]
    fn test_digest_hex_and_base64_decode_to_same_bytes() {
        let record = sample_record();

        let via_base64 = Md5Digest::from_base64(&record.md5().to_base64()).unwrap();
        let via_hex = Md5Digest::from_hex(&record.md5().to_hex()).unwrap();
        assert_eq!(via_base64, via_hex);
        assert_eq!(via_base64.as_bytes(), record.md5().as_bytes());

        let sha1_hex = Sha1Digest::from_base64(&record.sha1().to_base64())
            .unwrap()
            .to_hex();
        assert_eq!(Sha1Digest::from_hex(&sha1_hex).unwrap(), *record.sha1());
    }

    #[test]
    fn test_digest_rejects_wrong_length() {
        let sha1_as_md5 = Md5Digest::from_hex("2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");
        assert_eq!(
            sha1_as_md5,
            Err(DigestError::Length {
                expected: 16,
                actual: 20
            })
        );

        assert!(matches!(
            Sha1Digest::from_base64("not base64!"),
            Err(DigestError::Base64(_))
        ));
    }

    #[test]
    fn test_record_serializes_to_wire_object() {
        let value = serde_json::to_value(sample_record()).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "name": "setup.exe",
                "comment": "2016-11-14 alice@WebAPI",
                "md5": "XrY7u+Ae7tCTyyK7j1rNww==",
                "sha1": "Kq5sNclPz7QV2+lfQIuc6R7oRu0=",
                "reputation": "99"
            })
        );
    }

    #[test]
    fn test_reputation_scores() {
        let scores: Vec<u8> = Reputation::ALL.iter().map(|r| r.score()).collect();
        assert_eq!(scores, vec![99, 85, 70, 50, 30, 15, 0]);
    }

    #[test]
    fn test_reputation_parses_label_slug_and_score() {
        assert_eq!(
            "Most likely malicious".parse(),
            Ok(Reputation::MostLikelyMalicious)
        );
        assert_eq!("known trusted".parse(), Ok(Reputation::KnownTrusted));
        assert_eq!("might-be-trusted".parse(), Ok(Reputation::MightBeTrusted));
        assert_eq!("0".parse(), Ok(Reputation::KnownMalicious));
        assert!("42".parse::<Reputation>().is_err());
        assert!("trusted-ish".parse::<Reputation>().is_err());
    }

    #[test]
    fn test_reputation_resolve_falls_back_to_default() {
        assert_eq!(
            Reputation::resolve("Probably fine", Reputation::Unknown),
            Reputation::Unknown
        );
        assert_eq!(
            Reputation::resolve("Known malicious", Reputation::Unknown),
            Reputation::KnownMalicious
        );
    }

    #[test]
    fn test_apply_reputation_overwrites_all_records() {
        let mut records = vec![sample_record(), sample_record()];
        apply_reputation(&mut records, Reputation::MightBeMalicious);

        assert!(
            records
                .iter()
                .all(|r| r.reputation() == Reputation::MightBeMalicious)
        );
    }

    #[test]
    fn test_submission_comment_and_compact_date() {
        let now = Date::from_calendar_date(2016, Month::November, 14)
            .unwrap()
            .with_hms(12, 0, 0)
            .unwrap()
            .assume_utc();

        assert_eq!(submission_comment(now, "alice"), "2016-11-14 alice@WebAPI");
        assert_eq!(compact_date(now.date()), "20161114");
    }

    #[test]
    fn test_file_type_filter() {
        let exe: FileTypeFilter = "exe".parse().unwrap();
        assert!(exe.matches(Path::new("dir/SETUP.EXE")));
        assert!(!exe.matches(Path::new("dir/lib.dll")));
        assert!(!exe.matches(Path::new("README")));

        let both: FileTypeFilter = "exe+dll".parse().unwrap();
        assert_eq!(both.allowed(), ["exe", "dll"]);
        assert!(both.matches(Path::new("lib.dll")));

        let all: FileTypeFilter = "all".parse().unwrap();
        assert!(all.is_all());
        assert!(all.matches(Path::new("README")));
    }
}

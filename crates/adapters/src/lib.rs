//! epo-reputation adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `epo`: HTTP client for the ePO remote command API, plus an offline stub
//! - `scan`: Filesystem digest source
//! - `export`: CSV export of digest records

mod csv_export;
mod digests_fs;

pub mod epo_api;

/// Re-exports for ePO API adapters
pub mod epo {
    pub use crate::epo_api::{EpoClient, EpoClientConfig, RecordedCall, StubEpoApi};
}

/// Re-exports for digest sources
pub mod scan {
    pub use crate::digests_fs::FsDigestSource;
}

/// Re-exports for CSV export
pub mod export {
    pub use crate::csv_export::{CSV_HEADER, ExportError, default_file_name, export_csv, write_csv};
}

//! NodeODM integration
//!
//! - `client`: REST wrapper, every public call returns bool/Option
//! - `task`: task records and the status label table
//! - `monitor`: cancellable status polling
//! - `results`: downloaded archive extraction and product lookup

pub mod client;
pub mod monitor;
pub mod results;
pub mod task;

#[cfg(test)]
pub(crate) mod testutil;

pub use client::OdmClient;
pub use task::{TaskInfo, TaskOption, TaskStatus};

/// Failures inside the client; converted to bool/Option at its boundary
#[derive(Debug, thiserror::Error)]
pub enum OdmError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed server response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

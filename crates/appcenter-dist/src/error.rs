//! Error types for the upload pipeline.
//!
//! Every step of the orchestration has its own failure variant so a failed
//! invocation identifies exactly where it stopped (and with which HTTP
//! status) without re-running.

use std::path::PathBuf;

/// Failure of a single remote call, before the orchestrator attributes it to
/// an upload step.
///
/// `Transport` means the HTTP exchange could not be completed at all (after
/// the retry policy gave up); `Status` means the exchange completed but the
/// remote operation did not succeed: a non-2xx status, or a 2xx response
/// whose body could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The exchange never completed, even after retries.
    #[error("transport failure after {attempts} attempt(s) ({request}): {source}")]
    Transport {
        request: String,
        attempts: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The exchange completed but the call failed.
    #[error("request failed with status {status} ({request})")]
    Status { status: u16, request: String },
}

impl ApiError {
    /// Attributes this call failure to an orchestration step.
    ///
    /// Business failures become the step-specific variant produced by `step`;
    /// transport failures stay transport failures regardless of which step
    /// observed them.
    pub(crate) fn into_step(self, step: impl FnOnce(u16, String) -> UploadError) -> UploadError {
        match self {
            ApiError::Transport {
                request,
                attempts,
                source,
            } => UploadError::Transport {
                request,
                attempts,
                source,
            },
            ApiError::Status { status, request } => step(status, request),
        }
    }
}

/// Error raised by a failed upload invocation.
///
/// The invocation is binary: either every required step succeeded, or the
/// first unrecovered failure aborted it and surfaces here.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The build artifact was missing or not a regular file at orchestration
    /// start.
    #[error("build artifact not found at {path:?}")]
    ArtifactMissing { path: PathBuf },

    /// The HTTP client itself could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        #[source]
        source: reqwest::Error,
    },

    /// An HTTP exchange could not be completed after exhausting the retry
    /// bound.
    #[error("transport failure after {attempts} attempt(s) ({request}): {source}")]
    Transport {
        request: String,
        attempts: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Allocating the release upload slot failed.
    #[error("release upload preparation failed with status {status} ({request})")]
    PreparationFailed { status: u16, request: String },

    /// Uploading the build artifact to the prepared URL failed.
    #[error("binary upload failed with status {status} ({request})")]
    BinaryUploadFailed { status: u16, request: String },

    /// Committing the uploaded binary into a release failed.
    #[error("release commit failed with status {status} ({request})")]
    CommitFailed { status: u16, request: String },

    /// Distributing the committed release to the destination groups failed.
    /// The release stays committed on the service; no compensating delete is
    /// attempted.
    #[error("release distribution failed with status {status} ({request})")]
    DistributionFailed { status: u16, request: String },

    /// Allocating the symbol upload slot failed.
    #[error("symbol upload preparation failed with status {status} ({request})")]
    SymbolPreparationFailed { status: u16, request: String },

    /// Uploading the mapping file to the prepared URL failed.
    #[error("symbol upload failed with status {status} ({request})")]
    SymbolUploadFailed { status: u16, request: String },

    /// Committing the uploaded mapping file failed.
    #[error("symbol commit failed with status {status} ({request})")]
    SymbolCommitFailed { status: u16, request: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_failure_maps_to_step_variant() {
        let err = ApiError::Status {
            status: 500,
            request: "https://api.example.com/release_uploads".into(),
        };

        let mapped = err.into_step(|status, request| UploadError::PreparationFailed {
            status,
            request,
        });

        match mapped {
            UploadError::PreparationFailed { status, request } => {
                assert_eq!(status, 500);
                assert!(request.contains("release_uploads"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn transport_failure_stays_transport_regardless_of_step() {
        let err = ApiError::Transport {
            request: "https://api.example.com/release_uploads".into(),
            attempts: 4,
            source: std::io::Error::other("connection reset").into(),
        };

        let mapped = err.into_step(|status, request| UploadError::PreparationFailed {
            status,
            request,
        });

        match mapped {
            UploadError::Transport { attempts, .. } => assert_eq!(attempts, 4),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn messages_identify_step_and_status() {
        let err = UploadError::DistributionFailed {
            status: 403,
            request: "https://api.appcenter.ms/v0.1/apps/acme/app/releases/7".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("distribution"));
        assert!(msg.contains("403"));
    }
}

//! Upload orchestration.
//!
//! Two strictly sequential flows share one invocation. The release flow
//! prepares an upload slot, pushes the binary, commits it into a release and
//! distributes that release. Only after the whole release flow succeeded does
//! the symbol flow run, and only if a mapping file was configured and exists.
//! The first failed step aborts the invocation; nothing already committed on
//! the service is rolled back.

use std::path::Path;

use crate::client::{CommittedRelease, DistributionApi, DistributionClient, SymbolUploadMeta};
use crate::error::UploadError;
use crate::request::{SYMBOL_TYPE_ANDROID_PROGUARD, UploadRequest};

/// Result of a completed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Identifier of the created release.
    pub release_id: String,
    /// Whether the symbol flow ran (it is skipped when no mapping file is
    /// configured or the configured file does not exist).
    pub symbols_uploaded: bool,
}

/// Uploads and distributes one build, then its mapping file if present.
///
/// Convenience wrapper constructing the real [`DistributionClient`] from the
/// request; see [`Uploader`] for the orchestration itself.
pub fn upload(request: &UploadRequest) -> Result<UploadOutcome, UploadError> {
    let client = DistributionClient::from_request(request)?;
    Uploader::new(&client, request).run()
}

/// Sequences the remote calls for one upload invocation.
pub struct Uploader<'a, A: DistributionApi> {
    api: &'a A,
    request: &'a UploadRequest,
}

impl<'a, A: DistributionApi> Uploader<'a, A> {
    pub fn new(api: &'a A, request: &'a UploadRequest) -> Self {
        Self { api, request }
    }

    /// Runs the release flow, then the symbol flow when applicable.
    pub fn run(&self) -> Result<UploadOutcome, UploadError> {
        if !self.request.artifact.is_file() {
            return Err(UploadError::ArtifactMissing {
                path: self.request.artifact.clone(),
            });
        }

        let release = self.release_flow()?;

        let symbols_uploaded = match self.mapping_to_upload() {
            Some(mapping) => {
                self.symbol_flow(mapping)?;
                true
            }
            None => false,
        };

        Ok(UploadOutcome {
            release_id: release.release_id,
            symbols_uploaded,
        })
    }

    fn release_flow(&self) -> Result<CommittedRelease, UploadError> {
        let label = self.request.display_label();
        log::info!("preparing release upload for {}", label);

        let slot = self
            .api
            .prepare_release_upload()
            .map_err(|e| e.into_step(|status, request| UploadError::PreparationFailed { status, request }))?;

        self.api
            .upload_binary(&slot.upload_url, &self.request.artifact)
            .map_err(|e| e.into_step(|status, request| UploadError::BinaryUploadFailed { status, request }))?;

        let release = self
            .api
            .commit_release_upload(&slot.upload_id)
            .map_err(|e| e.into_step(|status, request| UploadError::CommitFailed { status, request }))?;

        log::info!(
            "committed release {} for {}; distributing to {} group(s)",
            release.release_id,
            label,
            self.request.destinations.len()
        );

        self.api
            .distribute_release(
                &release.release_id,
                &self.request.destinations,
                self.request.notify_testers,
                self.request.release_notes.as_deref(),
            )
            .map_err(|e| e.into_step(|status, request| UploadError::DistributionFailed { status, request }))?;

        Ok(release)
    }

    /// Returns the mapping file to upload, or `None` when the symbol flow
    /// should be skipped.
    fn mapping_to_upload(&self) -> Option<&Path> {
        match self.request.mapping_file.as_deref() {
            Some(path) if path.is_file() => Some(path),
            Some(path) => {
                log::info!("mapping file {:?} not found; skipping symbol upload", path);
                None
            }
            None => None,
        }
    }

    fn symbol_flow(&self, mapping: &Path) -> Result<(), UploadError> {
        let file_name = mapping
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        let meta = SymbolUploadMeta {
            symbol_type: SYMBOL_TYPE_ANDROID_PROGUARD.to_string(),
            build: self.request.build_number.to_string(),
            version: self.request.build_version.clone(),
            file_name,
        };

        let slot = self
            .api
            .prepare_symbol_upload(&meta)
            .map_err(|e| {
                e.into_step(|status, request| UploadError::SymbolPreparationFailed { status, request })
            })?;

        self.api
            .upload_symbol_file(&slot.upload_url, mapping)
            .map_err(|e| e.into_step(|status, request| UploadError::SymbolUploadFailed { status, request }))?;

        self.api
            .commit_symbol_upload(&slot.symbol_upload_id)
            .map_err(|e| e.into_step(|status, request| UploadError::SymbolCommitFailed { status, request }))?;

        log::info!("uploaded symbol mapping for release");
        Ok(())
    }
}

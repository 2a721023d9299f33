//! Typed bindings for the App Center distribution API (v0.1).
//!
//! Seven wire operations back the two upload flows: prepare/upload/commit/
//! distribute for the release binary, and prepare/upload/commit for the
//! symbol mapping file. Each is a thin wrapper that sends one request
//! through the retry policy and decodes the outcome.

use std::path::Path;
use std::time::Instant;

use reqwest::blocking::multipart::Form;
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::{ApiError, UploadError};
use crate::request::{BINARY_FORM_FIELD, UploadRequest};
use crate::transport::RetryPolicy;

const DEFAULT_BASE_URL: &str = "https://api.appcenter.ms/v0.1/apps";
const USER_AGENT: &str = "appcenter-dist-rs/0.1";
const API_TOKEN_HEADER: &str = "X-API-Token";

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Format a file size in human-readable form (MB or KB).
fn format_file_size(bytes: u64) -> String {
    if bytes >= 1_000_000 {
        format!("{} MB", bytes / 1_000_000)
    } else if bytes >= 1_000 {
        format!("{} KB", bytes / 1_000)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Get file size from path, returning 0 if unable to read metadata.
fn get_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Owner and application identifiers, as they appear in App Center URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentity {
    pub owner_name: String,
    pub app_name: String,
}

/// The seven remote operations the orchestrator sequences.
///
/// [`DistributionClient`] is the wire implementation; tests drive the
/// orchestrator with a mock instead.
pub trait DistributionApi {
    /// Allocates an upload slot for the release binary.
    fn prepare_release_upload(&self) -> Result<ReleaseUploadSlot, ApiError>;

    /// Uploads the binary to the pre-signed URL, multipart under the fixed
    /// `"ipa"` form field.
    fn upload_binary(&self, upload_url: &str, artifact: &Path) -> Result<(), ApiError>;

    /// Finalizes the uploaded binary into a release.
    fn commit_release_upload(&self, upload_id: &str) -> Result<CommittedRelease, ApiError>;

    /// Fans the release out to the destination groups. An empty list is sent
    /// as-is.
    fn distribute_release(
        &self,
        release_id: &str,
        destinations: &[String],
        notify_testers: bool,
        release_notes: Option<&str>,
    ) -> Result<(), ApiError>;

    /// Allocates an upload slot for the symbol mapping file.
    fn prepare_symbol_upload(&self, meta: &SymbolUploadMeta) -> Result<SymbolUploadSlot, ApiError>;

    /// Uploads the mapping file bytes to the pre-signed URL.
    fn upload_symbol_file(&self, upload_url: &str, mapping: &Path) -> Result<(), ApiError>;

    /// Finalizes the uploaded mapping file.
    fn commit_symbol_upload(&self, symbol_upload_id: &str) -> Result<(), ApiError>;
}

/// App Center distribution client.
///
/// All API calls carry the token in the `X-API-Token` header; the token
/// never appears in logs. Pre-signed upload URLs returned by the prepare
/// calls are used verbatim; they usually point at a different host and need
/// no token.
#[derive(Clone)]
pub struct DistributionClient {
    http: Client,
    base_url: String,
    identity: AppIdentity,
    token: String,
    retry: RetryPolicy,
}

impl std::fmt::Debug for DistributionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributionClient")
            .field("base_url", &self.base_url)
            .field("identity", &self.identity)
            .field("token", &"<redacted>")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl DistributionClient {
    pub fn new(
        identity: AppIdentity,
        token: impl Into<String>,
        retry: RetryPolicy,
    ) -> Result<Self, UploadError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| UploadError::ClientBuild { source })?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            identity,
            token: token.into(),
            retry,
        })
    }

    /// Builds a client from an upload request's identity, token and retry
    /// bound.
    pub fn from_request(request: &UploadRequest) -> Result<Self, UploadError> {
        Self::new(
            AppIdentity {
                owner_name: request.owner_name.clone(),
                app_name: request.app_name.clone(),
            },
            request.api_token.clone(),
            RetryPolicy::new(request.max_retries),
        )
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Joins `{base}/{owner}/{app}/{tail}`.
    fn app_url(&self, tail: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.identity.owner_name,
            self.identity.app_name,
            tail.trim_start_matches('/')
        )
    }
}

impl DistributionApi for DistributionClient {
    fn prepare_release_upload(&self) -> Result<ReleaseUploadSlot, ApiError> {
        let url = self.app_url("release_uploads");
        log::debug!("POST {}", url);

        let resp = self.retry.run(&url, || {
            self.http
                .post(&url)
                .header(API_TOKEN_HEADER, &self.token)
                .send()
        })?;

        parse_json(resp, &url)
    }

    fn upload_binary(&self, upload_url: &str, artifact: &Path) -> Result<(), ApiError> {
        let size = get_file_size(artifact);
        log::info!("uploading build artifact ({})", format_file_size(size));
        let started = Instant::now();

        let resp = self.retry.run(upload_url, || -> Result<Response, BoxedError> {
            // The form streams the file, so each attempt rebuilds it.
            let form = Form::new().file(BINARY_FORM_FIELD, artifact)?;
            Ok(self.http.post(upload_url).multipart(form).send()?)
        })?;
        expect_success(resp, upload_url)?;

        log::info!(
            "uploaded build artifact (took {}s)",
            started.elapsed().as_secs()
        );
        Ok(())
    }

    fn commit_release_upload(&self, upload_id: &str) -> Result<CommittedRelease, ApiError> {
        let url = self.app_url(&format!("release_uploads/{}", upload_id));
        log::debug!("PATCH {}", url);

        let resp = self.retry.run(&url, || {
            self.http
                .patch(&url)
                .header(API_TOKEN_HEADER, &self.token)
                .json(&StatusPatch::committed())
                .send()
        })?;

        parse_json(resp, &url)
    }

    fn distribute_release(
        &self,
        release_id: &str,
        destinations: &[String],
        notify_testers: bool,
        release_notes: Option<&str>,
    ) -> Result<(), ApiError> {
        let url = self.app_url(&format!("releases/{}", release_id));
        log::debug!(
            "PATCH {} ({} destination(s))",
            url,
            destinations.len()
        );

        let body = DistributeRequest {
            destinations: destinations
                .iter()
                .map(|name| DestinationRef { name })
                .collect(),
            notify_testers,
            release_notes,
        };

        let resp = self.retry.run(&url, || {
            self.http
                .patch(&url)
                .header(API_TOKEN_HEADER, &self.token)
                .json(&body)
                .send()
        })?;

        expect_success(resp, &url)
    }

    fn prepare_symbol_upload(&self, meta: &SymbolUploadMeta) -> Result<SymbolUploadSlot, ApiError> {
        let url = self.app_url("symbol_uploads");
        log::debug!("POST {} ({})", url, meta.file_name);

        let resp = self.retry.run(&url, || {
            self.http
                .post(&url)
                .header(API_TOKEN_HEADER, &self.token)
                .json(meta)
                .send()
        })?;

        parse_json(resp, &url)
    }

    fn upload_symbol_file(&self, upload_url: &str, mapping: &Path) -> Result<(), ApiError> {
        let size = get_file_size(mapping);
        log::info!("uploading mapping file ({})", format_file_size(size));

        let resp = self.retry.run(upload_url, || -> Result<Response, BoxedError> {
            let bytes = std::fs::read(mapping)?;
            Ok(self
                .http
                .put(upload_url)
                .header("x-ms-blob-type", "BlockBlob")
                .body(bytes)
                .send()?)
        })?;

        expect_success(resp, upload_url)
    }

    fn commit_symbol_upload(&self, symbol_upload_id: &str) -> Result<(), ApiError> {
        let url = self.app_url(&format!("symbol_uploads/{}", symbol_upload_id));
        log::debug!("PATCH {}", url);

        let resp = self.retry.run(&url, || {
            self.http
                .patch(&url)
                .header(API_TOKEN_HEADER, &self.token)
                .json(&StatusPatch::committed())
                .send()
        })?;

        expect_success(resp, &url)
    }
}

/// Release upload slot returned by `POST .../release_uploads`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReleaseUploadSlot {
    #[serde(alias = "uploadId")]
    pub upload_id: String,
    #[serde(alias = "uploadUrl")]
    pub upload_url: String,
}

/// Release created by committing an upload.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CommittedRelease {
    #[serde(alias = "releaseId")]
    pub release_id: String,
}

/// Symbol upload slot returned by `POST .../symbol_uploads`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SymbolUploadSlot {
    #[serde(alias = "symbolUploadId")]
    pub symbol_upload_id: String,
    #[serde(alias = "uploadUrl")]
    pub upload_url: String,
}

/// Descriptor sent when allocating a symbol upload slot. `build` is a string
/// on the wire even though the build number is numeric.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SymbolUploadMeta {
    pub symbol_type: String,
    pub build: String,
    pub version: String,
    pub file_name: String,
}

#[derive(Debug, Serialize)]
struct StatusPatch {
    status: &'static str,
}

impl StatusPatch {
    fn committed() -> Self {
        Self {
            status: "committed",
        }
    }
}

#[derive(Debug, Serialize)]
struct DistributeRequest<'a> {
    destinations: Vec<DestinationRef<'a>>,
    notify_testers: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    release_notes: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct DestinationRef<'a> {
    name: &'a str,
}

/// Decodes a JSON-returning call. A non-2xx status is a business failure; so
/// is a 2xx response whose body is missing or undecodable.
fn parse_json<T: DeserializeOwned>(resp: Response, request: &str) -> Result<T, ApiError> {
    let status = resp.status().as_u16();
    if !resp.status().is_success() {
        return Err(ApiError::Status {
            status,
            request: request.to_string(),
        });
    }

    let text = resp.text().map_err(|err| {
        log::debug!("unreadable response body for {}: {}", request, err);
        ApiError::Status {
            status,
            request: request.to_string(),
        }
    })?;

    serde_json::from_str(&text).map_err(|err| {
        log::debug!("undecodable response body for {}: {}", request, err);
        ApiError::Status {
            status,
            request: request.to_string(),
        }
    })
}

/// Checks a status-only call for success.
fn expect_success(resp: Response, request: &str) -> Result<(), ApiError> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ApiError::Status {
            status: status.as_u16(),
            request: request.to_string(),
        })
    }
}

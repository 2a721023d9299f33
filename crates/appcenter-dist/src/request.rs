//! Upload request configuration.

use std::path::PathBuf;

/// Symbol type reported to App Center for Android ProGuard/R8 mapping files.
pub const SYMBOL_TYPE_ANDROID_PROGUARD: &str = "AndroidProguard";

/// Form field name for the binary upload. The App Center upload endpoint
/// expects `"ipa"` regardless of the actual packaging format (APK, AAB, IPA).
pub const BINARY_FORM_FIELD: &str = "ipa";

/// Default number of additional attempts per HTTP call on transport failure.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Everything one upload invocation needs: artifact, identifiers, credentials
/// and distribution settings.
///
/// Immutable once built. The artifact must exist when the orchestration
/// starts; the mapping file is only processed if it exists at that point.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Path to the finished build artifact (APK/AAB/IPA).
    pub artifact: PathBuf,
    /// Optional ProGuard/R8 mapping file to upload after the release flow.
    pub mapping_file: Option<PathBuf>,
    /// Numeric build number (Android `versionCode`).
    pub build_number: u64,
    /// Human-readable build version (Android `versionName`).
    pub build_version: String,
    /// App Center owner (organization or user) name.
    pub owner_name: String,
    /// App Center application name.
    pub app_name: String,
    /// API token. Never logged.
    pub api_token: String,
    /// Distribution group names. An empty list is legal: the release is
    /// created but handed to nobody.
    pub destinations: Vec<String>,
    /// Whether testers are notified on distribution.
    pub notify_testers: bool,
    /// Optional release notes attached on distribution.
    pub release_notes: Option<String>,
    /// Additional attempts per HTTP call on transport failure.
    pub max_retries: u32,
    /// Optional flavor label, used only for log output.
    pub flavor: Option<String>,
}

impl UploadRequest {
    /// Starts building a request from the four values every upload needs.
    pub fn builder(
        artifact: impl Into<PathBuf>,
        owner_name: impl Into<String>,
        app_name: impl Into<String>,
        api_token: impl Into<String>,
    ) -> UploadRequestBuilder {
        UploadRequestBuilder {
            request: UploadRequest {
                artifact: artifact.into(),
                mapping_file: None,
                build_number: 0,
                build_version: String::new(),
                owner_name: owner_name.into(),
                app_name: app_name.into(),
                api_token: api_token.into(),
                destinations: Vec::new(),
                notify_testers: false,
                release_notes: None,
                max_retries: DEFAULT_MAX_RETRIES,
                flavor: None,
            },
        }
    }

    /// Label used in log lines: the flavor if one was set, otherwise the
    /// artifact file name.
    pub fn display_label(&self) -> String {
        match &self.flavor {
            Some(flavor) => flavor.clone(),
            None => self
                .artifact
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned(),
        }
    }
}

/// Builder for [`UploadRequest`].
#[derive(Debug, Clone)]
pub struct UploadRequestBuilder {
    request: UploadRequest,
}

impl UploadRequestBuilder {
    pub fn mapping_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.request.mapping_file = Some(path.into());
        self
    }

    pub fn build_number(mut self, number: u64) -> Self {
        self.request.build_number = number;
        self
    }

    pub fn build_version(mut self, version: impl Into<String>) -> Self {
        self.request.build_version = version.into();
        self
    }

    /// Adds one distribution group.
    pub fn destination(mut self, name: impl Into<String>) -> Self {
        self.request.destinations.push(name.into());
        self
    }

    /// Replaces the distribution group list.
    pub fn destinations(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.request.destinations = names.into_iter().collect();
        self
    }

    pub fn notify_testers(mut self, notify: bool) -> Self {
        self.request.notify_testers = notify;
        self
    }

    pub fn release_notes(mut self, notes: impl Into<String>) -> Self {
        self.request.release_notes = Some(notes.into());
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.request.max_retries = retries;
        self
    }

    pub fn flavor(mut self, flavor: impl Into<String>) -> Self {
        self.request.flavor = Some(flavor.into());
        self
    }

    pub fn build(self) -> UploadRequest {
        self.request
    }
}

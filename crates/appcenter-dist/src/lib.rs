//! Upload and distribute mobile app builds through App Center.
//!
//! This crate implements the App Center release pipeline as one sequential
//! invocation: allocate an upload slot, push the build artifact, commit it
//! into a release, distribute that release to tester groups, and, when a
//! ProGuard/R8 mapping file is available, upload the debug symbols for the
//! release in a second, strictly ordered flow.
//!
//! # Quick start
//!
//! ```ignore
//! use appcenter_dist::{UploadRequest, upload};
//!
//! let request = UploadRequest::builder(
//!     "app/build/outputs/apk/release/app-release.apk",
//!     "my-org",
//!     "my-app-android",
//!     std::env::var("APPCENTER_API_TOKEN")?,
//! )
//! .mapping_file("app/build/outputs/mapping/release/mapping.txt")
//! .build_number(42)
//! .build_version("1.2.3")
//! .destination("Beta Testers")
//! .notify_testers(true)
//! .build();
//!
//! let outcome = upload(&request)?;
//! println!("released {}", outcome.release_id);
//! ```
//!
//! # Architecture
//!
//! - [`transport`]: bounded retry around individual HTTP calls. Transport
//!   failures (the exchange never completed) are retried; error statuses are
//!   not.
//! - [`client`]: typed bindings for the seven App Center v0.1 operations,
//!   behind the [`DistributionApi`] trait so the orchestration is testable
//!   without a network.
//! - [`uploader`]: the two-flow state machine. Any step failure aborts the
//!   invocation with an error naming the step and the observed HTTP status.

pub mod client;
pub mod error;
pub mod request;
pub mod transport;
pub mod uploader;

pub use client::{
    AppIdentity, CommittedRelease, DistributionApi, DistributionClient, ReleaseUploadSlot,
    SymbolUploadMeta, SymbolUploadSlot,
};
pub use error::{ApiError, UploadError};
pub use request::{
    BINARY_FORM_FIELD, DEFAULT_MAX_RETRIES, SYMBOL_TYPE_ANDROID_PROGUARD, UploadRequest,
    UploadRequestBuilder,
};
pub use transport::RetryPolicy;
pub use uploader::{UploadOutcome, Uploader, upload};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use appcenter_dist::{UploadRequest, upload};
use config::AppcenterConfig;

mod config;

/// Environment variable holding the App Center API token.
const TOKEN_ENV: &str = "APPCENTER_API_TOKEN";

/// CLI for uploading and distributing mobile builds through App Center.
#[derive(Parser, Debug)]
#[command(name = "appcenter-dist", author, version, about = "Upload and distribute mobile builds through App Center", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a build artifact, distribute it to tester groups, and upload
    /// its mapping file if one is available.
    Upload(UploadOpts),
    /// Scaffold a starter appcenter.toml config file.
    Init {
        #[arg(long, default_value = "appcenter.toml")]
        output: PathBuf,
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct UploadOpts {
    #[arg(long, help = "Path to the build artifact (APK/AAB/IPA)")]
    artifact: Option<PathBuf>,
    #[arg(long, help = "ProGuard/R8 mapping file to upload after the release")]
    mapping_file: Option<PathBuf>,
    #[arg(long, help = "App Center owner (organization or user) name")]
    owner: Option<String>,
    #[arg(long, help = "App Center application name")]
    app: Option<String>,
    #[arg(long, help = "Numeric build number (Android versionCode)")]
    build_number: Option<u64>,
    #[arg(long, help = "Build version string (Android versionName)")]
    build_version: Option<String>,
    #[arg(
        long = "group",
        help = "Distribution group name (repeatable); overrides config groups"
    )]
    groups: Vec<String>,
    #[arg(
        long,
        value_name = "BOOL",
        help = "Notify testers on distribution; overrides the config value"
    )]
    notify_testers: Option<bool>,
    #[arg(long, help = "Inline release notes")]
    release_notes: Option<String>,
    #[arg(long, help = "Read release notes from a file")]
    release_notes_file: Option<PathBuf>,
    #[arg(long, help = "Additional attempts per HTTP call on transport failure")]
    max_retries: Option<u32>,
    #[arg(long, help = "Flavor label used in log output")]
    flavor: Option<String>,
    #[arg(long, help = "Optional path to config file")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Upload(opts) => cmd_upload(opts),
        Command::Init { output, force } => cmd_init(&output, force),
    }
}

fn cmd_upload(opts: UploadOpts) -> Result<()> {
    let config = match &opts.config {
        Some(path) => Some((AppcenterConfig::load_from_file(path)?, path.clone())),
        None => AppcenterConfig::discover()?,
    };
    if let Some((_, path)) = &config {
        log::debug!("using config file {:?}", path);
    }
    let config = config.map(|(c, _)| c).unwrap_or_default();

    let artifact = opts
        .artifact
        .or(config.build.artifact)
        .context("no artifact path; pass --artifact or set [build].artifact in appcenter.toml")?;
    let owner = opts
        .owner
        .or(config.app.owner)
        .context("no owner name; pass --owner or set [app].owner in appcenter.toml")?;
    let app = opts
        .app
        .or(config.app.name)
        .context("no app name; pass --app or set [app].name in appcenter.toml")?;
    let build_number = opts
        .build_number
        .or(config.build.number)
        .context("no build number; pass --build-number or set [build].number in appcenter.toml")?;
    let build_version = opts.build_version.or(config.build.version).context(
        "no build version; pass --build-version or set [build].version in appcenter.toml",
    )?;

    let token = std::env::var(TOKEN_ENV)
        .ok()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| anyhow!(format_credentials_error()))?;

    let groups = if opts.groups.is_empty() {
        config.distribute.groups
    } else {
        opts.groups
    };
    let notify_testers = opts
        .notify_testers
        .unwrap_or(config.distribute.notify_testers);
    let release_notes = resolve_release_notes(
        opts.release_notes,
        opts.release_notes_file.as_deref(),
        config.distribute.release_notes,
        config.distribute.release_notes_file.as_deref(),
    )?;

    let mut builder = UploadRequest::builder(artifact, &owner, &app, token)
        .build_number(build_number)
        .build_version(build_version)
        .destinations(groups)
        .notify_testers(notify_testers)
        .max_retries(opts.max_retries.unwrap_or(config.upload.max_retries));
    if let Some(mapping) = opts.mapping_file.or(config.build.mapping_file) {
        builder = builder.mapping_file(mapping);
    }
    if let Some(notes) = release_notes {
        builder = builder.release_notes(notes);
    }
    if let Some(flavor) = opts.flavor.or(config.build.flavor) {
        builder = builder.flavor(flavor);
    }
    let request = builder.build();

    println!(
        "Uploading {} to App Center ({}/{})...",
        request.display_label(),
        owner,
        app
    );

    let outcome = upload(&request)?;

    println!(
        "  Release {} created and distributed to {} group(s)",
        outcome.release_id,
        request.destinations.len()
    );
    if outcome.symbols_uploaded {
        println!("  Symbol mapping uploaded");
    }

    Ok(())
}

fn cmd_init(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!("{:?} already exists (use --force to overwrite)", output);
    }

    std::fs::write(output, AppcenterConfig::generate_starter_toml())
        .with_context(|| format!("Failed to write config file: {:?}", output))?;

    println!("Wrote starter config to {:?}", output);
    println!("Set {} in your environment or a .env file.", TOKEN_ENV);
    Ok(())
}

/// Resolves release notes with CLI over config precedence; within each
/// source, inline notes win over a notes file.
fn resolve_release_notes(
    cli_inline: Option<String>,
    cli_file: Option<&Path>,
    config_inline: Option<String>,
    config_file: Option<&Path>,
) -> Result<Option<String>> {
    if let Some(notes) = cli_inline {
        return Ok(Some(notes));
    }
    if let Some(path) = cli_file {
        return read_notes_file(path).map(Some);
    }
    if let Some(notes) = config_inline {
        return Ok(Some(notes));
    }
    if let Some(path) = config_file {
        return read_notes_file(path).map(Some);
    }
    Ok(None)
}

fn read_notes_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read release notes file: {:?}", path))
}

/// Format a helpful error message for a missing API token.
fn format_credentials_error() -> String {
    let mut message = String::from("App Center API token not configured.\n\n");

    message.push_str("Set the token using one of these methods:\n\n");

    message.push_str("  1. Environment variable:\n");
    message.push_str("     export APPCENTER_API_TOKEN=your_api_token\n\n");

    message.push_str("  2. .env file in the project root:\n");
    message.push_str("     APPCENTER_API_TOKEN=your_api_token\n\n");

    message.push_str("Get a token: https://appcenter.ms/settings/apitokens\n");

    message
}

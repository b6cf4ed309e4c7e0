//! # pixellock Binary Entry Point
//!
//! Thin command-line wrapper around the library.
//!
//! ## Usage
//!
//! ```bash
//! pixellock keygen --output my.key
//! pixellock encrypt --input photos --output sealed --recursive --key-file my.key
//! pixellock decrypt --input sealed --output restored --key "$KEY" --output-format jpg
//! pixellock stego hide --input cat.png --output cat_secret.png --message "hi"
//! pixellock stego reveal --input cat_secret.png
//! ```
//!
//! Fatal errors (bad key, bad arguments, unreadable top-level path) exit
//! non-zero. Failures of individual files inside a directory run are logged
//! and listed in the optional JSON report, but do not change the exit code.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use log::{info, warn};

use pixellock::batch::{BatchMode, BatchOptions, BatchReport, BatchRunner, TraversalPolicy};
use pixellock::common::config::{load_config, PixelLockConfig};
use pixellock::common::logging::init_logger;
use pixellock::files::{self, FileOutcome};
use pixellock::processing::{OutputFormat, StegoScheme};
use pixellock::Key;

/// Environment variable consulted when `--key` is absent.
const KEY_ENV: &str = "PIXELLOCK_KEY";

/// Older name of [`KEY_ENV`], still honoured when neither `--key` nor
/// `PIXELLOCK_KEY` is set.
const LEGACY_KEY_ENV: &str = "IMAGE_ENCRYPTION_KEY";

/// Encrypt, decrypt, and hide messages within images using AES-256-GCM and steganography
#[derive(Parser, Debug)]
#[command(name = "pixellock", author, version, about, long_about = None)]
struct Cli {
    /// Optional TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Print information about this tool and exit
    #[arg(short, long)]
    about: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new encryption key
    Keygen {
        /// File to save the generated key to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Encrypt an image or a directory of images
    #[command(alias = "e")]
    Encrypt(EncryptArgs),

    /// Decrypt an image or a directory of images
    #[command(alias = "d")]
    Decrypt(DecryptArgs),

    /// Hide or reveal a message within an image using steganography
    Stego {
        #[command(subcommand)]
        action: StegoCommand,
    },
}

/// Flags shared by every command that can walk a directory.
#[derive(Args, Debug)]
struct BatchArgs {
    /// Recursively search subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Overwrite existing files in the output location
    #[arg(long)]
    overwrite: bool,

    /// Maximum number of files processed at once
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Write a JSON report of every processed file
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct EncryptArgs {
    /// Input image file or directory
    #[arg(short, long)]
    input: PathBuf,

    /// Output encrypted file or directory
    #[arg(short, long, default_value = "encrypted_output")]
    output: PathBuf,

    /// Encryption key (base64). A new key is generated when none is given.
    #[arg(short, long, env = "PIXELLOCK_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Read the key from this file, or save a generated key to it
    #[arg(long)]
    key_file: Option<PathBuf>,

    /// Also echo a supplied key (a generated key is always printed)
    #[arg(long)]
    print_key: bool,

    #[command(flatten)]
    batch: BatchArgs,
}

#[derive(Args, Debug)]
struct DecryptArgs {
    /// Input encrypted file or directory
    #[arg(short, long)]
    input: PathBuf,

    /// Output image file or directory
    #[arg(short, long, default_value = "decrypted_output")]
    output: PathBuf,

    /// Encryption key (base64)
    #[arg(short, long, env = "PIXELLOCK_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Read the key from this file
    #[arg(long)]
    key_file: Option<PathBuf>,

    /// Suffix of encrypted files (e.g. .enc, .xyz)
    #[arg(long)]
    encrypted_ext: Option<String>,

    /// Output image format (png, jpg, jpeg)
    #[arg(long)]
    output_format: Option<OutputFormat>,

    #[command(flatten)]
    batch: BatchArgs,
}

#[derive(Subcommand, Debug)]
enum StegoCommand {
    /// Hide a message within an image
    Hide {
        /// Input image file or directory
        #[arg(short, long)]
        input: PathBuf,

        /// Output stego image file or directory
        #[arg(short, long)]
        output: PathBuf,

        /// Message to hide
        #[arg(short, long)]
        message: String,

        /// Output image format (png, jpg, jpeg)
        #[arg(long)]
        output_format: Option<OutputFormat>,

        /// Payload layout (framed, legacy)
        #[arg(long, default_value = "framed")]
        scheme: StegoScheme,

        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Reveal a hidden message from an image
    Reveal {
        /// Input stego image file
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if cli.about {
        println!("{}", about_text());
        return Ok(());
    }
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config: PixelLockConfig = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PixelLockConfig::default(),
    };

    match command {
        Command::Keygen { output } => keygen(output.as_deref()),
        Command::Encrypt(args) => encrypt(args, &config).await,
        Command::Decrypt(args) => decrypt(args, &config).await,
        Command::Stego { action } => match action {
            StegoCommand::Hide {
                input,
                output,
                message,
                output_format,
                scheme,
                batch,
            } => {
                let format = output_format.unwrap_or(config.output.format);
                let mode = BatchMode::Hide {
                    message,
                    scheme,
                    format,
                };
                dispatch(&input, &output, mode, &batch, &config).await
            }
            StegoCommand::Reveal { input } => {
                let revealed = files::reveal_file(&input)
                    .with_context(|| format!("failed to reveal message from {}", input.display()))?;
                info!("🔎 Found a {:?} payload", revealed.scheme);
                println!("Hidden Message: {}", revealed.message);
                Ok(())
            }
        },
    }
}

// ============================================================================
// KEY HANDLING
// ============================================================================

fn save_key(path: &Path, key: &Key) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("failed to save key to {}", path.display()))?;
    std::io::Write::write_all(&mut file, key.to_base64().as_bytes())
        .with_context(|| format!("failed to save key to {}", path.display()))?;
    Ok(())
}

fn read_key_file(path: &Path) -> Result<Key> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read key file {}", path.display()))?;
    Key::decode(&text).with_context(|| format!("invalid key in {}", path.display()))
}

/// Pick the key text: `--key` / `PIXELLOCK_KEY` first, then the legacy
/// variable. Blank values count as absent.
fn key_text(flag: Option<&str>, legacy_env: Option<String>) -> Option<String> {
    if let Some(encoded) = flag.filter(|k| !k.trim().is_empty()) {
        return Some(encoded.to_string());
    }
    let encoded = legacy_env.filter(|k| !k.trim().is_empty())?;
    info!("Using key from environment variable {}", LEGACY_KEY_ENV);
    Some(encoded)
}

/// Resolve a key from `--key` / the environment, then `--key-file`.
fn provided_key(key: Option<&str>, key_file: Option<&Path>) -> Result<Option<Key>> {
    if let Some(encoded) = key_text(key, std::env::var(LEGACY_KEY_ENV).ok()) {
        return Ok(Some(Key::decode(&encoded).context("invalid key")?));
    }
    match key_file {
        Some(path) if path.exists() => Ok(Some(read_key_file(path)?)),
        _ => Ok(None),
    }
}

fn about_text() -> String {
    format!(
        "PixelLock image encryption tool\nVersion: {}\nOperating System: {} {}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

fn keygen(output: Option<&Path>) -> Result<()> {
    let key = Key::generate().context("failed to generate key")?;
    println!("Generated Key (base64 encoded): {}", key.to_base64());

    if let Some(path) = output {
        save_key(path, &key)?;
        info!("🔑 Key saved to file: {}", path.display());
    }
    Ok(())
}

// ============================================================================
// COMMANDS
// ============================================================================

async fn encrypt(args: EncryptArgs, config: &PixelLockConfig) -> Result<()> {
    let key = match provided_key(args.key.as_deref(), args.key_file.as_deref())? {
        Some(key) => {
            if args.print_key {
                println!("Using provided Key (base64 encoded): {}", key.to_base64());
            }
            key
        }
        None => {
            let key = Key::generate().context("failed to generate key")?;
            println!("Generated Key (base64 encoded): {}", key.to_base64());
            match &args.key_file {
                Some(path) => {
                    save_key(path, &key)?;
                    info!("🔑 Key saved to file: {}", path.display());
                }
                None => warn!(
                    "IMPORTANT: This key is only displayed once. Do NOT lose it! Save it somewhere secure."
                ),
            }
            key
        }
    };

    let mode = BatchMode::Encrypt { key: Arc::new(key) };
    dispatch(&args.input, &args.output, mode, &args.batch, config).await
}

async fn decrypt(args: DecryptArgs, config: &PixelLockConfig) -> Result<()> {
    let Some(key) = provided_key(args.key.as_deref(), args.key_file.as_deref())? else {
        bail!(
            "a key is required: pass --key, set {} (or {}), or use --key-file",
            KEY_ENV,
            LEGACY_KEY_ENV
        );
    };

    let mut config = config.clone();
    if let Some(ext) = args.encrypted_ext {
        config.batch.encrypted_ext = ext;
    }

    let format = args.output_format.unwrap_or(config.output.format);
    let mode = BatchMode::Decrypt {
        key: Arc::new(key),
        format,
    };
    dispatch(&args.input, &args.output, mode, &args.batch, &config).await
}

/// Run `mode` on a single file or, when `input` is a directory, on every
/// qualifying file below it.
async fn dispatch(
    input: &Path,
    output: &Path,
    mode: BatchMode,
    batch: &BatchArgs,
    config: &PixelLockConfig,
) -> Result<()> {
    let metadata = fs::metadata(input)
        .with_context(|| format!("failed to stat input path {}", input.display()))?;
    let overwrite = batch.overwrite || config.batch.overwrite;

    if let BatchMode::Hide { format, .. } = &mode {
        if !format.is_lossless() {
            warn!("⚠️  {} output is lossy and will likely destroy the hidden message", format);
        }
    }

    if !metadata.is_dir() {
        return single_file(input, output, &mode, overwrite);
    }

    let mut options = BatchOptions::from(&config.batch);
    options.overwrite = overwrite;
    if batch.recursive {
        options.traversal = TraversalPolicy::Unlimited;
    }
    if let Some(jobs) = batch.jobs {
        options.max_workers = jobs;
    }

    let runner = BatchRunner::new(options);
    info!(
        "📂 Processing {} -> {} ({} worker(s))",
        input.display(),
        output.display(),
        runner.options().max_workers.max(1)
    );

    let report = runner
        .run(input, output, mode)
        .await
        .with_context(|| format!("error walking the path {}", input.display()))?;

    write_report(&report, batch.report.as_deref())
}

fn single_file(input: &Path, output: &Path, mode: &BatchMode, overwrite: bool) -> Result<()> {
    let outcome = match mode {
        BatchMode::Encrypt { key } => files::encrypt_file(input, output, key, overwrite),
        BatchMode::Decrypt { key, format } => {
            files::decrypt_file(input, output, key, *format, overwrite)
        }
        BatchMode::Hide {
            message,
            scheme,
            format,
        } => files::hide_file(input, output, message, *scheme, *format, overwrite),
    }
    .with_context(|| format!("failed to process {}", input.display()))?;

    match outcome {
        FileOutcome::Written { bytes } => {
            info!("✅ Saved {} ({} bytes)", output.display(), bytes)
        }
        FileOutcome::Skipped(_) => warn!(
            "Output file {} already exists. Overwrite with --overwrite flag.",
            output.display()
        ),
    }
    Ok(())
}

fn write_report(report: &BatchReport, path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        report
            .export_to_json(path)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        println!("Report exported to: {}", path.display());
    }
    Ok(())
}

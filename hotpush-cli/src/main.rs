//! Hotpush CLI - drive the updater from the command line.
//!
//! This binary plays the role of the host-integration layer: it feeds
//! update descriptors to the library, renders download progress, and owns
//! the self-heal decision when persisted update state turns out to be
//! malformed.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use hotpush::updater::ProgressCallback;
use hotpush::{
    PackageStore, UpdateDescriptor, UpdateError, UpdateInstaller, UpdaterConfig,
};

#[derive(Parser)]
#[command(name = "hotpush", version, about = "Over-the-air content updates")]
struct Cli {
    /// Update store directory (defaults to the platform data dir).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download an update payload and install it.
    Download {
        /// URL of the update payload.
        #[arg(long)]
        url: String,

        /// Label for the new version.
        #[arg(long)]
        label: String,

        /// Expected bundle file name inside the payload.
        #[arg(long, default_value = hotpush::updater::DEFAULT_BUNDLE_FILE_NAME)]
        bundle: String,

        /// Binary app version the update targets.
        #[arg(long)]
        app_version: Option<String>,

        /// Download only; do not flip the current-version pointer.
        #[arg(long)]
        no_install: bool,
    },

    /// Make a previously downloaded version current.
    Install {
        /// Label of the version to activate.
        #[arg(long)]
        label: String,
    },

    /// Show the current version and resolved bundle path.
    Current {
        /// Expected bundle file name.
        #[arg(long, default_value = hotpush::updater::DEFAULT_BUNDLE_FILE_NAME)]
        bundle: String,
    },

    /// Delete all update state and fall back to binary content.
    Clear,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), UpdateError> {
    let store_dir = cli.store.unwrap_or_else(default_store_dir);

    match cli.command {
        Commands::Download {
            url,
            label,
            bundle,
            app_version,
            no_install,
        } => {
            let config = UpdaterConfig::new(&store_dir).with_bundle_file_name(bundle);
            let installer = UpdateInstaller::new(config);

            let mut descriptor = UpdateDescriptor::new(&label, url);
            if let Some(version) = app_version {
                descriptor = descriptor.with_app_version(version);
            }

            let record = installer.download_update(&descriptor, Some(progress_bar_sink()))?;
            println!("downloaded version {}", record.label);
            if let Some(relative) = &record.relative_bundle_path {
                println!("bundle at {relative}");
            }

            if !no_install {
                installer.install_update(&record.label)?;
                println!("version {} is now current", record.label);
            }
            Ok(())
        }

        Commands::Install { label } => {
            let store = PackageStore::new(&store_dir);
            if store.package(&label)?.is_none() {
                eprintln!("no downloaded version with label {label}");
                process::exit(1);
            }
            store.install(&label)?;
            println!("version {label} is now current");
            Ok(())
        }

        Commands::Current { bundle } => {
            let store = PackageStore::new(&store_dir);
            match store.current_package() {
                Ok(Some(record)) => {
                    println!("current version: {}", record.label);
                    if let Some(version) = &record.app_version {
                        println!("targets binary: {version}");
                    }
                    if let Some(path) = store.current_bundle_path(&bundle)? {
                        println!("bundle path: {}", path.display());
                    }
                    Ok(())
                }
                Ok(None) => {
                    println!("no update installed; loading binary content");
                    Ok(())
                }
                Err(err @ UpdateError::MalformedData { .. }) => {
                    // Boundary self-heal: discard unreadable update state
                    // and fall back to the content shipped in the binary.
                    warn!(%err, "update state is malformed, clearing store");
                    store.clear_all()?;
                    println!("update state was malformed and has been cleared; loading binary content");
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }

        Commands::Clear => {
            PackageStore::new(&store_dir).clear_all()?;
            println!("update store cleared");
            Ok(())
        }
    }
}

fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("hotpush")
}

fn progress_bar_sink() -> ProgressCallback {
    let bar = ProgressBar::new(0);
    bar.set_style(ProgressStyle::default_bar());

    Box::new(move |progress| {
        if progress.total_bytes > 0 {
            bar.set_length(progress.total_bytes);
        }
        bar.set_position(progress.received_bytes);
        if progress.is_completed() {
            bar.finish_and_clear();
        }
    })
}

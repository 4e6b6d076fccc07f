#![deny(unused_must_use)]

use args::TopLevelCmd;
use console::ConsoleOptions;
use errors::AppError;
use heart_rate::ble::BleDiscovery;
use session::{Session, SessionEnd};
use settings::Settings;

use std::path::PathBuf;
use tokio::fs::create_dir_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[cfg(not(any(debug_assertions, feature = "portable")))]
use directories::BaseDirs;

pub mod args;
pub mod console;
pub mod errors;
pub mod heart_rate;
pub mod panic_handler;
pub mod session;
pub mod settings;

mod logging;

/// Loads settings, starts file logging, and runs one monitoring session
/// while printing its updates to stdout.
///
/// Cancelling `parent_token` (Ctrl+C) ends the session through its normal cleanup path.
pub async fn run(
    arg_config: TopLevelCmd,
    parent_token: CancellationToken,
) -> Result<SessionEnd, AppError> {
    let config_path = match &arg_config.config_override {
        Some(path) => path.clone(),
        None => default_config_path().ok_or(AppError::WorkDir)?,
    };
    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            create_dir_all(parent)
                .await
                .map_err(|e| AppError::CreateDir {
                    path: parent.to_owned(),
                    source: e,
                })?;
        }
    }

    let mut settings = Settings::load(&config_path, arg_config.config_required)?;
    arg_config.apply_overrides(&mut settings);

    let _guard =
        logging::init_file_logging(&config_path.with_extension("log"), settings.get_log_level())?;

    info!("Starting app... v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config from: {}", config_path.display());

    if arg_config.save_config {
        settings.save(&config_path)?;
        info!("Saved config to: {}", config_path.display());
    }

    let session_config = settings.session_config()?;
    let console_options = ConsoleOptions {
        report_rr_intervals: settings.misc.report_rr_intervals,
        characteristic_uuid: session_config.characteristic_uuid,
    };

    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let mut session = Session::new(
        BleDiscovery,
        session_config,
        parent_token.child_token(),
        updates_tx,
    );

    // Session and printer share this task; the printer stops once the session
    // (and with it the update sender) is dropped
    let (outcome, ()) = tokio::join!(
        async move { session.run().await },
        console::print_updates(updates_rx, console_options)
    );

    info!("Shutting down gracefully...");

    Ok(outcome?)
}

/// Returns the path of the config file to use when none was supplied.
// Debug builds and the "portable" feature always keep it next to the executable.
// Otherwise an existing config next to the executable wins over the user's config dir.
pub fn default_config_path() -> Option<PathBuf> {
    let exe_path = std::env::current_exe().ok()?;
    let config_path = exe_path.with_extension("toml");

    if is_portable() || config_path.exists() {
        Some(config_path)
    } else {
        let file_name = config_path.file_name()?.to_owned();
        get_user_dir().map(|dir| dir.join(file_name))
    }
}

#[cfg(any(debug_assertions, feature = "portable"))]
fn is_portable() -> bool {
    true
}

#[cfg(not(any(debug_assertions, feature = "portable")))]
fn is_portable() -> bool {
    false
}

#[cfg(any(debug_assertions, feature = "portable"))]
fn get_user_dir() -> Option<PathBuf> {
    None
}

#[cfg(not(any(debug_assertions, feature = "portable")))]
fn get_user_dir() -> Option<PathBuf> {
    if let Some(base_dirs) = BaseDirs::new() {
        let mut config_dir = base_dirs.config_dir().to_owned();
        config_dir.push(env!("CARGO_PKG_NAME"));
        Some(config_dir)
    } else {
        None
    }
}

use std::path::PathBuf;
use std::process::ExitCode;

use tonebridge::{DEFAULT_SETTINGS_FILE, KeyboardApp, Settings, spawn_engine};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));

    let settings = match Settings::load_or_default(&path) {
        Ok(settings) => settings,
        Err(err) => {
            error!(path = %path.display(), %err, "cannot load settings");
            eprintln!("tonebridge: {}: {err}", path.display());
            return ExitCode::FAILURE;
        }
    };
    info!(?settings, "starting");

    let engine = spawn_engine(settings);
    let result = KeyboardApp::new(&engine).run();
    engine.shutdown();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("tonebridge: terminal error: {err}");
            ExitCode::FAILURE
        }
    }
}

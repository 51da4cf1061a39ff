use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use petals_ui::run_app;

fn main() -> ExitCode {
    // Init logging; RUST_LOG overrides the default level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    info!("Petal Drift starting");
    match run_app() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Petal Drift error: {e}");
            ExitCode::FAILURE
        }
    }
}

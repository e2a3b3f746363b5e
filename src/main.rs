use std::process::ExitCode;

use clap::Parser;
use operator::{config::Args, ctrl, driver, environment::ProcessEnv, telemetry};
use tracing::Instrument;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let telemetry = match telemetry::init() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("unable to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    let setup_log = telemetry::logger("setup");
    let config = setup_log.in_scope(|| driver::configure(args, &ProcessEnv, &telemetry));

    match driver::run(&config, ctrl::new_manager, ctrl::signal_handler())
        .instrument(setup_log)
        .await
    {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

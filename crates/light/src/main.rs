use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::FmtSubscriber;
use wifirgb_light::{App, Config, SimulatedStrip};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config = Config::parse();

    let subscriber = FmtSubscriber::builder().with_max_level(config.log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
        return ExitCode::FAILURE;
    }

    let app = match App::new(&config, SimulatedStrip::new(config.leds)) {
        Ok(app) => app,
        Err(e) => {
            error!(cause = %e, "can't start wifirgb");
            return ExitCode::FAILURE;
        }
    };

    match app.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(cause = %e, "wifirgb stopped");
            ExitCode::FAILURE
        }
    }
}

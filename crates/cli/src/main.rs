//! `editkit` -- command-line client for the photo/video editing service.
//!
//! # Environment variables
//!
//! | Variable                       | Default                 | Description                      |
//! |--------------------------------|-------------------------|----------------------------------|
//! | `EDITKIT_API_URL`              | `http://localhost:5000` | Service root URL                 |
//! | `EDITKIT_POLL_INTERVAL_MS`     | `2000`                  | Milliseconds between status checks |
//! | `EDITKIT_POLL_MAX_ATTEMPTS`    | unset                   | Give up after this many checks   |
//! | `EDITKIT_REQUEST_TIMEOUT_SECS` | `300`                   | Per-request HTTP timeout         |
//! | `RUST_LOG`                     | `editkit=info`          | Log filter                       |

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use editkit_cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "editkit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match editkit_cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

//! Ambiance controller
//!
//! Single-shot binary that:
//! 1. Asks a language model to turn the prompt into a light state and song
//! 2. Applies the light state to a Hue bridge group
//! 3. Obtains a Spotify access token (stored, refreshed, or via the browser)
//! 4. Searches for the song and starts it on the active device

mod config;
mod error;
mod pipeline;

use std::process::ExitCode;
use std::sync::Arc;

use spotify_auth::SystemBrowser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::pipeline::ServiceEndpoints;

/// Command line: `ambiance [--config <path>] <prompt>`
#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<String>,
    prompt: String,
}

impl Args {
    fn parse<I: IntoIterator<Item = String>>(args: I) -> Self {
        let mut parsed = Args::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            if arg == "--config" {
                parsed.config = args.next();
            } else if parsed.prompt.is_empty() {
                parsed.prompt = arg;
            }
        }
        parsed
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    let text = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("text"));
    if text {
        registry.with(tracing_subscriber::fmt::layer()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = Args::parse(std::env::args().skip(1));
    let config_path = Config::resolve_path(args.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            let e = error::Error::from(e);
            error!(stage = e.stage(), path = %config_path.display(), error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(
        bridge = %config.bridge_ip,
        light = %config.default_light,
        model = %config.openai_model,
        token_path = %config.token_path.display(),
        "configuration loaded"
    );

    match pipeline::run(
        &config,
        &args.prompt,
        &ServiceEndpoints::default(),
        Arc::new(SystemBrowser),
    )
    .await
    {
        Ok(summary) => {
            info!(played = ?summary.played, "done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(stage = e.stage(), error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}

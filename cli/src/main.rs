//! Observe - terminal consumer for observable query routes
//!
//! Mounts one lifecycle controller and prints the reactive state every time
//! it changes. Ctrl-C unmounts and exits.
//!
//! # Usage
//!
//! ```bash
//! # Follow an account, arguments substituted into the route
//! observe -u http://localhost:5000 -r '/api/accounts/{{accountId}}' -a accountId=42
//!
//! # Extra declared arguments become query parameters
//! observe -u http://localhost:5000 -r /api/items -a page=2 -a mode=live --format json
//!
//! # Print the first received result and exit
//! observe -u http://localhost:5000 -r /api/status --once
//! ```

use clap::Parser;
use serde_json::Value as JsonValue;

use observable_cli::logging::init_logging;
use observable_cli::{CLIConfiguration, CLIError, OutputFormatter, Result};
use observable_link::{
    EventHandlers, LinkTimeouts, ObservableLinkClient, ObservableQueryController, ResultOrigin,
};

mod args;

use args::Cli;

fn event_handlers() -> EventHandlers {
    EventHandlers::new()
        .on_connect(|route| tracing::info!(route, "connected"))
        .on_disconnect(|reason| {
            tracing::warn!(route = %reason.route, code = ?reason.code, "disconnected: {}", reason.message)
        })
        .on_error(|error| {
            if error.recoverable {
                tracing::debug!(route = %error.route, "{}", error.message)
            } else {
                tracing::error!(route = %error.route, "{}", error.message)
            }
        })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = CLIConfiguration::load(&cli.config)?;

    let logging = config.resolved_logging();
    init_logging(
        cli.log_level.as_deref().unwrap_or(&logging.level),
        cli.log_format.as_deref().unwrap_or(&logging.format),
    )?;

    let url = cli
        .url
        .clone()
        .or_else(|| config.server_url().map(str::to_string))
        .ok_or_else(|| {
            CLIError::ConfigurationError("no server URL; pass --url or set [server] url".into())
        })?;

    let arguments = cli.query_arguments()?;
    let request_names = cli.request_argument_names(&arguments);

    let timeouts = if cli.fast_timeouts {
        LinkTimeouts::fast()
    } else {
        config.to_timeouts()
    };

    let client = ObservableLinkClient::builder()
        .base_url(url)
        .connection_options(config.to_connection_options())
        .timeouts(timeouts)
        .event_handlers(event_handlers())
        .build()?;

    let query = client
        .query::<JsonValue>(&cli.route, JsonValue::Null)?
        .with_arguments(request_names);
    let (controller, mut rx) = ObservableQueryController::observe(query, &arguments)?;
    let formatter = OutputFormatter::new(cli.format);

    println!("{}", formatter.format_state(&rx.borrow_and_update())?);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, unsubscribing");
                break;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                match formatter.format_state(&state) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::warn!("Skipping unprintable state: {}", e),
                }
                if cli.once && state.query_result.origin == ResultOrigin::Received {
                    break;
                }
            }
        }
    }

    controller.unmount();
    Ok(())
}

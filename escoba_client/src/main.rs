//! Terminal client for Escoba matches hosted by a remote match authority.
//!
//! The client authenticates against the gateway, then hands control to the
//! console: matches are created or joined by command and kept in sync by
//! periodic polling.

use anyhow::{Context, Result};
use escoba::{Username, session::SessionActor};
use escoba_client::{
    api_client::ApiClient,
    config::{ClientConfig, Overrides},
    console::Console,
    logging,
};
use pico_args::Arguments;
use std::{
    io::{self, Write},
    sync::Arc,
};

const HELP: &str = "\
Play Escoba against a remote match authority

USAGE:
  escoba_client [OPTIONS]

OPTIONS:
  --server URL          Gateway URL  [default: http://localhost:5000]
  --username NAME       Username for login
  --password PASS       Password for login
  --poll-ms MS          Milliseconds between match refreshes  [default: 3000]

FLAGS:
  -h, --help            Print help information

ENVIRONMENT:
  ESCOBA_SERVER_URL, ESCOBA_MATCH_PREFIX, ESCOBA_POLL_INTERVAL_MS,
  ESCOBA_REQUEST_TIMEOUT_SECS, ESCOBA_USERNAME, ESCOBA_PASSWORD, RUST_LOG
";

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = Overrides {
        server_url: pargs.opt_value_from_str("--server")?,
        poll_interval_ms: pargs.opt_value_from_str("--poll-ms")?,
        username: pargs.opt_value_from_str("--username")?,
        password: pargs.opt_value_from_str("--password")?,
    };

    logging::init();

    let config = ClientConfig::from_env(overrides)?;
    config.validate()?;

    ctrlc::set_handler(|| std::process::exit(0))?;

    run(config).await
}

async fn run(config: ClientConfig) -> Result<()> {
    let mut api_client = ApiClient::new(&config)?;
    match api_client.health().await {
        Ok(health) => tracing::info!("Gateway at {} is {}", api_client.base_url(), health.status),
        Err(e) => tracing::warn!("Gateway health check failed: {e}"),
    }

    let username = match config.username.clone() {
        Some(username) => username,
        None => {
            let default = whoami::username();
            let input = prompt(&format!("Username [{default}]: "))?;
            if input.is_empty() { default } else { input }
        }
    };
    let password = config.password_or(|| prompt("Password: ").ok())?;

    println!("Logging in as {username}...");
    if let Err(e) = api_client.login(&username, &password).await {
        println!("Login failed: {e:#}. Trying to register...");
        let email = prompt(&format!("Email [{username}@escoba.local]: "))?;
        let email = if email.is_empty() {
            format!("{username}@escoba.local")
        } else {
            email
        };
        let message = api_client
            .register(&username, &password, &email)
            .await
            .context("Failed to register")?;
        println!("{message}");
        api_client
            .login(&username, &password)
            .await
            .context("Failed to log in after registering")?;
    }
    println!("Login successful!");

    let api_client = Arc::new(api_client);
    let (actor, handle, updates) = SessionActor::new(
        Username::from(username),
        api_client.clone(),
        config.session_config(),
    );
    let actor_task = tokio::spawn(actor.run());

    Console::new(handle, api_client, updates).run().await?;

    actor_task.await.context("Session task panicked")?;
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

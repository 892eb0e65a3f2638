//! `listening-status` command-line entry point.
//!
//! Each subcommand runs one core operation and prints its result as JSON on
//! stdout. Without `LISTENING_STATUS_REDIS_URL` state lives only for the
//! duration of one invocation.

use std::ffi::OsString;
use std::io::{self, Write};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use listening_status::domain::ports::AuthorizationCallback;
use listening_status::domain::{ExternalEmail, PlatformUserId};
use listening_status::settings::StatusSettings;
use listening_status::{telemetry, wiring};
use ortho_config::OrthoConfig;
use serde_json::{Value, json};

/// `listening-status` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "listening-status",
    about = "Resolve and share what a user is listening to",
    version
)]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a user's own status, using the cache when fresh.
    Status {
        /// Platform user id.
        user: String,
    },
    /// Drop the cached status and resolve it again.
    Refresh {
        /// Platform user id.
        user: String,
    },
    /// Read another user's cached status without contacting the service.
    Peek {
        /// Platform user id.
        user: String,
    },
    /// Associate a user with their music-service account email.
    Register {
        /// Platform user id.
        user: String,
        /// Email of the music-service account.
        email: String,
    },
    /// Print the URL that starts the authorization flow.
    Connect {
        /// Platform user id.
        user: String,
    },
    /// Complete the authorization flow with the redirect's parameters.
    Callback {
        /// `state` query parameter.
        #[arg(long)]
        state: String,
        /// `code` query parameter.
        #[arg(long)]
        code: String,
    },
    /// Remove a user's registration and stored token.
    Disconnect {
        /// Platform user id.
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    telemetry::init();

    let args = CliArgs::parse();
    // Flags belong to the subcommands; settings come from the environment.
    let settings = StatusSettings::load_from_iter([OsString::from("listening-status")])
        .wrap_err("failed to load settings")?;
    let services = wiring::build(&settings)
        .await
        .wrap_err("failed to build services")?;

    let output = run(&services, args.command).await?;
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &output).wrap_err("failed to encode output")?;
    writeln!(stdout).wrap_err("failed to write output")?;
    Ok(())
}

async fn run(services: &wiring::Services, command: Command) -> Result<Value> {
    let output = match command {
        Command::Status { user } => {
            let status = services.resolver.resolve_own(&user_id(&user)?).await?;
            serde_json::to_value(status)?
        }
        Command::Refresh { user } => {
            let status = services.resolver.refresh_own(&user_id(&user)?).await?;
            serde_json::to_value(status)?
        }
        Command::Peek { user } => {
            let status = services.resolver.cached_status(&user_id(&user)?).await;
            serde_json::to_value(status)?
        }
        Command::Register { user, email } => {
            let id = user_id(&user)?;
            let address = ExternalEmail::new(&email).wrap_err("invalid email")?;
            services.connections.register_email(&id, &address).await?;
            json!({ "user": id.as_str(), "email": address.as_str() })
        }
        Command::Connect { user } => {
            let url = services
                .connections
                .authorization_url(&user_id(&user)?)
                .await?;
            json!({ "authorizationUrl": url.as_str() })
        }
        Command::Callback { state, code } => {
            let connected = services
                .connections
                .complete_authorization(&AuthorizationCallback { state, code })
                .await?;
            json!({ "connected": connected.as_str() })
        }
        Command::Disconnect { user } => {
            let id = user_id(&user)?;
            services.connections.disconnect(&id).await?;
            json!({ "disconnected": id.as_str() })
        }
    };
    Ok(output)
}

fn user_id(raw: &str) -> Result<PlatformUserId> {
    PlatformUserId::new(raw).wrap_err("invalid user id")
}

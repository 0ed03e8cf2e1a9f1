// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line front end.

use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

use crate::api::auth::LoginRequest;
use crate::api::endpoints::{NewReservation, NewReservationItem, SignUpRequest};
use crate::api::ApiClient;
use crate::config::ClientConfig;

/// Rental back-office client.
#[derive(Debug, Parser)]
#[command(name = "rentdesk", version, about = "Rental back-office API client.")]
pub struct Cli {
    #[command(flatten)]
    pub config: ClientConfig,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Sign in and persist the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "RENTDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Revoke the session and remove the persisted record.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Print the session state as JSON. Token values are never shown.
    Status,
    /// List reservations.
    Reservations {
        /// Filter by status (pending, confirmed, cancelled, ...).
        #[arg(long)]
        status: Option<String>,
    },
    /// Show one reservation.
    Reservation { id: u64 },
    /// List vehicles.
    Vehicles,
    /// Show one vehicle.
    Vehicle { id: u64 },
    /// List vehicle brands.
    Brands,
    /// List vehicle types.
    VehicleTypes,
    /// Book one or more vehicles.
    Reserve {
        /// Vehicle to include; repeat for several.
        #[arg(long = "vehicle", required = true)]
        vehicles: Vec<u64>,
        /// Start, ISO-8601 (e.g. 2026-03-01T10:00:00Z).
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        /// Book on behalf of this customer.
        #[arg(long)]
        customer: Option<u64>,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Register a staff account.
    Signup(SignupArgs),
    /// GET an arbitrary API path and print the JSON body.
    Get { path: String },
}

#[derive(Debug, Clone, clap::Args)]
pub struct SignupArgs {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub email: String,
    #[arg(long, env = "RENTDESK_NEW_PASSWORD", hide_env_values = true)]
    pub password: String,
    #[arg(long)]
    pub document_type: String,
    #[arg(long)]
    pub document_number: String,
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long)]
    pub nationality: String,
    #[arg(long)]
    pub birth_date: Option<String>,
}

impl From<SignupArgs> for SignUpRequest {
    fn from(args: SignupArgs) -> Self {
        Self {
            username: args.username,
            email: args.email,
            password: args.password,
            document_type: args.document_type,
            document_number: args.document_number,
            first_name: args.first_name,
            last_name: args.last_name,
            phone_number: args.phone,
            nationality_code: args.nationality,
            birth_date: args.birth_date,
            context: "WEB".to_owned(),
        }
    }
}

/// Session state as printed by `status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub authenticated: bool,
    pub has_refresh_token: bool,
    pub username: Option<String>,
    /// Unix seconds; absent for tokens without a readable expiry.
    pub access_expires_at: Option<u64>,
    pub refresh_scheduled: bool,
    pub session_file: String,
}

/// Run a parsed command line and return the process exit code.
pub async fn run(cli: Cli) -> i32 {
    let client = ApiClient::from_config(&cli.config);
    let result = execute(&client, &cli.config, cli.command).await;
    client.session().settle().await;
    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
            0
        }
        Err(e) => {
            debug!(err = ?e, "command failed");
            eprintln!("error: {e:#}");
            1
        }
    }
}

/// Execute one command and return what it prints.
pub async fn execute(
    client: &ApiClient,
    config: &ClientConfig,
    command: Command,
) -> anyhow::Result<String> {
    match command {
        Command::Login { email, password } => {
            let user = client.login(&LoginRequest { email, password }).await?;
            Ok(match user {
                Some(user) => format!("signed in as {}", display_name(&user.username, &user.email)),
                None => "signed in".to_owned(),
            })
        }
        Command::Logout => {
            client.logout().await;
            Ok("signed out".to_owned())
        }
        Command::Whoami => {
            let session = client.session();
            if !session.is_authenticated() {
                anyhow::bail!("not signed in");
            }
            let mut lines = Vec::new();
            match session.user() {
                Some(user) => {
                    lines.push(display_name(&user.username, &user.email).to_owned());
                    if !user.role.is_empty() {
                        lines.push(format!("role: {}", user.role));
                    }
                }
                None => lines.push("signed in (no profile)".to_owned()),
            }
            if let Some(at) = session.access_expiry().and_then(unix_secs) {
                lines.push(format!("access token expires at: {at}"));
            }
            Ok(lines.join("\n"))
        }
        Command::Status => {
            let session = client.session();
            let snapshot = session.snapshot();
            let report = StatusReport {
                authenticated: snapshot.access_token.is_some(),
                has_refresh_token: snapshot.refresh_token.is_some(),
                username: snapshot.user.map(|u| u.username),
                access_expires_at: session.access_expiry().and_then(unix_secs),
                refresh_scheduled: session.has_pending_refresh_timer(),
                session_file: config.session_path().display().to_string(),
            };
            Ok(serde_json::to_string_pretty(&report)?)
        }
        Command::Reservations { status } => {
            let items = client.list_reservations(status.as_deref()).await?;
            pretty(&items)
        }
        Command::Reservation { id } => pretty(&client.get_reservation(id).await?),
        Command::Vehicles => pretty(&client.list_vehicles().await?),
        Command::Vehicle { id } => pretty(&client.get_vehicle(id).await?),
        Command::Brands => pretty(&client.list_vehicle_brands().await?),
        Command::VehicleTypes => pretty(&client.list_vehicle_types().await?),
        Command::Reserve { vehicles, start, end, customer, note } => {
            let items = vehicles.into_iter().map(|vehicle_id| NewReservationItem { vehicle_id });
            let reservation = NewReservation {
                customer_user_id: customer,
                start_at: start,
                end_at: end,
                note,
                items: items.collect(),
            };
            pretty(&client.create_reservation(&reservation).await?)
        }
        Command::Signup(args) => {
            let user = client.sign_up(&args.into()).await?;
            Ok(format!("registered {}", display_name(&user.username, &user.email)))
        }
        Command::Get { path } => {
            let value: serde_json::Value = client.get_json(&path).await?;
            pretty(&value)
        }
    }
}

fn pretty<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn display_name<'a>(username: &'a str, email: &'a str) -> &'a str {
    if username.is_empty() {
        email
    } else {
        username
    }
}

fn unix_secs(at: SystemTime) -> Option<u64> {
    at.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;

//! mbc - terminal member client for the Mountain Backpackers Club.
//!
//! Signs members in, registers new members, shows and edits profiles, and
//! prints the club's public pages. The session token lives in the session
//! directory until `mbc logout`.

mod prompt;
mod render;

use std::io;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mbc_core::models::ProfileUpdate;
use mbc_core::{Config, Portal, PortalError};

#[derive(Parser)]
#[command(name = "mbc", version, about = "Mountain Backpackers Club member client")]
struct Cli {
    /// Backend API URL (overrides config and MBC_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in as a member
    Login {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Apply for club membership
    Register,
    /// Sign out
    Logout {
        /// Also drop cached content, ending the session entirely
        #[arg(long)]
        forget: bool,
    },
    /// Show or edit your member profile
    Profile {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },
    /// Show the site navigation menu
    Nav,
    /// Show a content page (home page when no slug is given)
    Page {
        slug: Option<String>,
        /// Print the raw HTML instead of text
        #[arg(long)]
        raw: bool,
    },
    /// Show sign-in state and where it is stored
    Status,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Change profile fields, e.g. `mbc profile edit postalCode=8001`
    Edit {
        #[arg(value_name = "FIELD=VALUE")]
        fields: Vec<String>,
        /// Prompt for a new password
        #[arg(long)]
        password: bool,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        let message = match e.downcast_ref::<PortalError>() {
            Some(PortalError::Unauthenticated) => {
                "Not signed in. Run `mbc login` first.".to_string()
            }
            Some(PortalError::AlreadySignedIn) => {
                "Already signed in. Run `mbc logout` to switch members.".to_string()
            }
            Some(portal_error) => portal_error.user_message(),
            None => format!("{:#}", e),
        };
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load_with_env();
    if let Some(url) = cli.api_url {
        config.api_url = Some(url);
    }

    let mut portal = Portal::open(config.clone())?;

    match cli.command {
        Command::Login { username } => {
            let username = match username.or_else(|| config.last_username.clone()) {
                Some(u) => u,
                None => prompt::line("Username: ")?,
            };
            let password = rpassword::prompt_password(format!("Password for {}: ", username))
                .context("Failed to read password")?;

            let member = portal.login(&username, &password).await?;

            remember_username(username);
            println!("Successfully logged in as {}.", member.display_name());
        }
        Command::Register => {
            let form = prompt::registration()?;
            let outcome = portal.register(&form).await?;
            println!("Successfully registered new membership.");
            if !outcome.signed_in {
                println!("Check {} for a confirmation email before signing in.", outcome.member.email);
            }
        }
        Command::Logout { forget } => {
            if forget {
                portal.end_session()?;
            } else {
                portal.logout()?;
            }
            println!("Logged out.");
        }
        Command::Profile { action: None } => {
            let member = portal.profile().await?;
            print!("{}", render::profile(&member));
        }
        Command::Profile {
            action: Some(ProfileAction::Edit { fields, password }),
        } => {
            let member = portal.profile().await?;
            let update = build_update(&fields, password)?;
            if update == ProfileUpdate::default() {
                anyhow::bail!("Nothing to change. Pass FIELD=VALUE pairs or --password.");
            }
            match portal.save_profile(member.id, &update).await {
                Ok(member) => {
                    println!("Profile updated.");
                    print!("{}", render::profile(&member));
                }
                Err(e) => {
                    eprintln!("Profile update failed.");
                    return Err(e.into());
                }
            }
        }
        Command::Nav => {
            let items = portal.navigation().await?;
            print!("{}", render::navigation(&items, portal.is_authenticated()));
        }
        Command::Page { slug, raw } => {
            if raw {
                let page = portal.page(slug.as_deref().unwrap_or("")).await?;
                println!("{}", page.content);
            } else {
                let (items, page) = portal.landing(slug.as_deref().unwrap_or("")).await?;
                print!("{}", render::navigation(&items, portal.is_authenticated()));
                println!();
                print!("{}", render::page(&page));
            }
        }
        Command::Status => {
            print!("{}", render::status(&portal)?);
        }
    }

    info!("mbc finished");
    Ok(())
}

/// Record the last username in the stored config file. Environment and
/// command-line overrides are left out of the file.
fn remember_username(username: String) {
    let result = Config::load().and_then(|mut stored| {
        stored.last_username = Some(username);
        stored.save()
    });
    if let Err(e) = result {
        warn!(error = %e, "Failed to save config");
    }
}

fn build_update(fields: &[String], password: bool) -> Result<ProfileUpdate> {
    let mut update = ProfileUpdate::default();
    for pair in fields {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Expected FIELD=VALUE, got {:?}", pair))?;
        update
            .set_field(name.trim(), value)
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    if password {
        let new = rpassword::prompt_password("New password: ")?;
        let confirm = rpassword::prompt_password("Confirm new password: ")?;
        if new != confirm {
            anyhow::bail!("The passwords do not match.");
        }
        update.password = Some(new);
    }
    Ok(update)
}

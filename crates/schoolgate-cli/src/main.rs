//! schoolgate - command-line front end for the school administration
//! session layer.
//!
//! Each invocation hydrates both sessions from durable storage, runs one
//! command, then prints any notices and the resulting location.

use std::io;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use schoolgate_core::{AppContext, AuthError, Config, Credentials, NavigationError};

/// Read instead of prompting when set
const ENV_PASSWORD: &str = "SCHOOLGATE_PASSWORD";

const USAGE: &str = "\
Usage: schoolgate <command> [args]

Commands:
  login <username>          Staff login
  parent-login <username>   Parent login
  logout                    Staff logout
  parent-logout             Parent logout
  whoami                    Show both sessions
  refresh                   Re-fetch the staff profile
  visit <path> [from]       Run the navigation guard
  get <path>                GET an API path and print the JSON body";

/// Initialize the tracing subscriber. The returned guard flushes the
/// background writer and must outlive `main`'s work.
fn init_tracing() -> WorkerGuard {
    // RUST_LOG controls the level (e.g. RUST_LOG=schoolgate_core=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();
    guard
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var(ENV_PASSWORD) {
        return Ok(password);
    }
    rpassword::prompt_password("Password: ").context("Failed to read password")
}

fn describe_auth_error(e: &AuthError) -> String {
    match e {
        AuthError::Transport(inner) => format!("{} ({})", e, inner),
        _ => e.to_string(),
    }
}

async fn run(ctx: &mut AppContext, args: &[String]) -> Result<()> {
    let command = args.first().map(String::as_str).unwrap_or("help");
    let arg = |i: usize, name: &str| -> Result<String> {
        args.get(i)
            .cloned()
            .with_context(|| format!("Missing <{}>\n\n{}", name, USAGE))
    };

    match command {
        "login" => {
            let credentials = Credentials::new(arg(1, "username")?, read_password()?);
            match ctx.staff.login(&credentials).await {
                Ok(user) => {
                    println!("Signed in as {} ({})", user.name, user.role);
                    ctx.router.push(user.role.landing_path())?;
                }
                Err(e) => bail!(describe_auth_error(&e)),
            }
        }
        "parent-login" => {
            let credentials = Credentials::new(arg(1, "username")?, read_password()?);
            match ctx.parent.login(&credentials).await {
                Ok(student) => println!("Signed in for {}", student.display_name()),
                Err(e) => bail!(describe_auth_error(&e)),
            }
        }
        "logout" => {
            ctx.staff.logout().await;
            println!("Staff session cleared");
        }
        "parent-logout" => {
            ctx.parent.logout();
            println!("Parent session cleared");
        }
        "whoami" => {
            match ctx.staff.user() {
                Some(user) => println!("staff:  {} ({}, id {})", user.name, user.role, user.id),
                None => println!("staff:  not signed in"),
            }
            match ctx.parent.student() {
                Some(student) => println!("parent: {}", student.display_name()),
                None => println!("parent: not signed in"),
            }
        }
        "refresh" => match ctx.staff.refresh_profile().await {
            Ok(Some(user)) => println!("Profile refreshed: {} ({})", user.name, user.role),
            Ok(None) => println!("No staff session"),
            Err(e) => bail!(describe_auth_error(&e)),
        },
        "visit" => {
            let to = arg(1, "path")?;
            if let Some(from) = args.get(2) {
                ctx.router.push(from)?;
            }
            match ctx.router.push(&to) {
                Ok(location) => println!("Allowed: {}", location),
                Err(NavigationError::Forbidden(denied)) => {
                    println!("Refused: {}", denied);
                }
                Err(e) => return Err(e.into()),
            }
        }
        "get" => {
            let path = arg(1, "path")?;
            ctx.touch();
            let body: serde_json::Value = ctx.api.get(&path).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        "help" | "-h" | "--help" => {
            println!("{}", USAGE);
            return Ok(());
        }
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = init_tracing();
    info!("schoolgate starting");

    let config = Config::load()?.with_env_overrides();
    let mut ctx = AppContext::open(config)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = run(&mut ctx, &args).await;

    for notice in ctx.router.process_pending() {
        eprintln!("! {}", notice);
    }
    if let Some(location) = ctx.router.location() {
        println!("Location: {}", location);
    }

    result
}

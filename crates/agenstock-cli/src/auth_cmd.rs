//! Auth subcommands: login, logout, status.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use crate::api::{ApiClient, ApiError, UserProfile};
use crate::config::{AuthConfig, CliConfig};

/// Auth subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum AuthAction {
    /// Log in to the AgenStock server.
    Login {
        /// Username.
        #[arg(short, long)]
        username: String,
        /// Password.
        #[arg(short, long, env = "AGENSTOCK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored access token.
    Logout,
    /// Show current auth status.
    Status,
}

/// Execute an auth subcommand.
pub async fn run(action: AuthAction, config: &mut CliConfig, base_url: &str) -> anyhow::Result<()> {
    match action {
        AuthAction::Login { username, password } => {
            login(config, base_url, &username, &password).await
        }
        AuthAction::Logout => logout(config),
        AuthAction::Status => status(config, base_url).await,
    }
}

async fn login(
    config: &mut CliConfig,
    base_url: &str,
    username: &str,
    password: &str,
) -> anyhow::Result<()> {
    let token = match ApiClient::new(base_url, None)?.login(username, password).await {
        Ok(token) => token,
        Err(ApiError::Unauthorized) => anyhow::bail!("Login failed: incorrect username or password"),
        Err(e) => return Err(anyhow::anyhow!("Login failed: {e}")),
    };

    // Confirm the token works and pick up the canonical username.
    let profile = ApiClient::new(base_url, Some(&token.access_token))?
        .current_user()
        .await?;
    let username = profile.username.unwrap_or_else(|| username.to_string());

    config.auth = Some(AuthConfig {
        username: username.clone(),
        access_token: token.access_token,
    });
    config.base_url = Some(base_url.to_string());
    config.save()?;

    let mut out = io::stdout();
    writeln!(out, "Logged in as {username}")?;
    Ok(())
}

fn logout(config: &mut CliConfig) -> anyhow::Result<()> {
    config.clear_auth();
    config.save()?;
    let mut out = io::stdout();
    writeln!(out, "Logged out")?;
    Ok(())
}

async fn status(config: &CliConfig, base_url: &str) -> anyhow::Result<()> {
    let mut out = io::stdout();
    let Some(auth) = &config.auth else {
        writeln!(out, "Not logged in")?;
        return Ok(());
    };

    writeln!(out, "Server: {base_url}")?;
    match ApiClient::new(base_url, Some(&auth.access_token))?
        .current_user()
        .await
    {
        Ok(profile) => write_profile(&mut out, &profile)?,
        Err(ApiError::Unauthorized) => {
            writeln!(out, "Logged in as: {} (token expired or revoked)", auth.username)?;
            writeln!(out, "Run `agenstock auth login` to sign in again.")?;
        }
        Err(e) => {
            writeln!(out, "Logged in as: {} (server unreachable: {e})", auth.username)?;
        }
    }
    Ok(())
}

fn write_profile(out: &mut impl Write, profile: &UserProfile) -> io::Result<()> {
    writeln!(
        out,
        "Logged in as: {}",
        profile.username.as_deref().unwrap_or_default()
    )?;
    if let Some(name) = profile.full_name.as_deref().filter(|n| !n.is_empty()) {
        writeln!(out, "Name: {name}")?;
    }
    if let Some(email) = &profile.email {
        writeln!(out, "Email: {email}")?;
    }
    if let Some(role) = &profile.role {
        writeln!(out, "Role: {role}")?;
    }
    Ok(())
}

//! Admin session commands.
//!
//! # Usage
//!
//! ```bash
//! MISSION_ADMIN_PASSWORD=... mission login -u admin
//! mission whoami
//! mission logout
//! ```

use secrecy::SecretString;

use super::{CommandError, Context};

/// Log in and persist the session.
pub async fn login(ctx: &Context, username: &str, password: String) -> Result<(), CommandError> {
    tracing::info!("Logging in to {}...", ctx.config.api_url);

    let identity = ctx
        .session
        .login(username, &SecretString::from(password))
        .await?;

    tracing::info!("Logged in as {} ({})", identity.username, identity.role);
    Ok(())
}

/// End the session. Always succeeds locally.
pub async fn logout(ctx: &Context) {
    ctx.session.init().await;
    ctx.session.logout().await;
    tracing::info!("Logged out");
}

/// Verify the stored session and print the admin it belongs to.
pub async fn whoami(ctx: &Context) -> Result<(), CommandError> {
    ctx.require_admin().await?;

    if let Some(identity) = ctx.session.identity() {
        tracing::info!("Logged in as {} ({})", identity.username, identity.role);
        tracing::info!("  Admin ID: {}", identity.id);
    }
    Ok(())
}

//! Launch countdown commands.
//!
//! # Usage
//!
//! ```bash
//! mission countdown show
//! mission countdown set --at 2027-01-01T00:00:00Z --label "Launch"
//! mission countdown set --timestamp 1999999999
//! mission countdown reset
//! ```

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use mission_client::session::{AdminGate, Anonymous};
use mission_client::settings::{BindingOptions, SettingBinding};
use mission_core::SettingKey;
use mission_core::values::{COUNTDOWN_TARGET_KEY, CountdownTarget};

use super::{CommandError, Context};

/// Print the countdown target and the time left.
pub async fn show(ctx: &Context) -> Result<(), CommandError> {
    let binding = bind(ctx, countdown_key()?, Arc::new(Anonymous));
    let target = binding.loaded().await.value;

    match target.target() {
        Some(at) => {
            tracing::info!("{}", target.label);
            tracing::info!("  Target: {}", at.to_rfc3339());
            tracing::info!("  Remaining: {}", format_remaining(target.remaining(Utc::now())));
        }
        None => tracing::info!("Countdown not configured ({})", target.label),
    }
    Ok(())
}

/// Set the countdown target.
pub async fn set(
    ctx: &Context,
    at: Option<&str>,
    timestamp: Option<i64>,
    label: String,
) -> Result<(), CommandError> {
    let target = match (at, timestamp) {
        (Some(at), _) => {
            let at = DateTime::parse_from_rfc3339(at)
                .map_err(|e| CommandError::InvalidArgument(format!("--at: {e}")))?;
            CountdownTarget::at(at.with_timezone(&Utc), label)
        }
        (None, Some(timestamp)) if timestamp > 0 => CountdownTarget { timestamp, label },
        (None, _) => {
            return Err(CommandError::InvalidArgument(
                "a positive --timestamp or --at is required".to_owned(),
            ));
        }
    };

    ctx.require_admin().await?;
    let binding = bind(ctx, countdown_key()?, Arc::new(ctx.session.clone()));
    binding.write(target.clone()).await?;

    tracing::info!("Countdown set to {} ({})", target.timestamp, target.label);
    Ok(())
}

/// Revert the countdown to its default.
pub async fn reset(ctx: &Context) -> Result<(), CommandError> {
    ctx.require_admin().await?;
    let binding = bind(ctx, countdown_key()?, Arc::new(ctx.session.clone()));
    binding.reset().await?;

    tracing::info!("Countdown reset");
    Ok(())
}

fn countdown_key() -> Result<SettingKey, CommandError> {
    Ok(SettingKey::parse(COUNTDOWN_TARGET_KEY)?)
}

fn bind(
    ctx: &Context,
    key: SettingKey,
    gate: Arc<dyn AdminGate>,
) -> SettingBinding<CountdownTarget> {
    SettingBinding::bind(
        ctx.api.clone(),
        gate,
        key,
        CountdownTarget::default(),
        BindingOptions::no_poll(),
    )
}

/// `3d 04h 05m 06s`
fn format_remaining(remaining: TimeDelta) -> String {
    let total = remaining.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    format!("{days}d {hours:02}h {minutes:02}m {seconds:02}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_remaining() {
        let remaining = TimeDelta::seconds(3 * 86_400 + 4 * 3_600 + 5 * 60 + 6);
        assert_eq!(format_remaining(remaining), "3d 04h 05m 06s");
        assert_eq!(format_remaining(TimeDelta::zero()), "0d 00h 00m 00s");
        assert_eq!(format_remaining(TimeDelta::seconds(-5)), "0d 00h 00m 00s");
    }
}

//! Settings commands.
//!
//! # Usage
//!
//! ```bash
//! mission settings get countdown_target
//! mission settings set timer_position '{"x": 24, "y": 96}'
//! mission settings reset timer_position
//! mission settings list
//! mission settings watch countdown_target --interval-ms 5000
//! ```

use std::sync::Arc;
use std::time::Duration;

use mission_client::session::Anonymous;
use mission_client::settings::{BindingOptions, SettingBinding};
use serde_json::Value;

use super::{CommandError, Context, parse_key, print_json};

/// Print a setting, or `null` when it is not configured.
pub async fn get(ctx: &Context, key: &str) -> Result<(), CommandError> {
    let key = parse_key(key)?;
    let value = ctx.api.get_setting(&key).await?;
    print_json(&value.unwrap_or(Value::Null))
}

/// Write a setting.
pub async fn set(ctx: &Context, key: &str, value: &str) -> Result<(), CommandError> {
    let key = parse_key(key)?;
    let value: Value = serde_json::from_str(value)?;
    ctx.require_admin().await?;

    let binding = bind_once(ctx, key);
    binding.write(value).await?;

    tracing::info!("Setting {} updated", binding.key());
    Ok(())
}

/// Delete a setting.
pub async fn reset(ctx: &Context, key: &str) -> Result<(), CommandError> {
    let key = parse_key(key)?;
    ctx.require_admin().await?;

    let binding = bind_once(ctx, key);
    binding.reset().await?;

    tracing::info!("Setting {} reset", binding.key());
    Ok(())
}

/// Print every stored setting.
pub async fn list(ctx: &Context) -> Result<(), CommandError> {
    ctx.require_admin().await?;
    let token = ctx.session.token().ok_or(CommandError::NotAuthenticated)?;

    let settings = ctx.api.all_settings(&token).await?;
    tracing::info!("{} settings stored", settings.len());
    print_json(&Value::Object(settings.into_iter().collect()))
}

/// Print the setting every time it changes, until Ctrl-C.
pub async fn watch(ctx: &Context, key: &str, interval_ms: Option<u64>) -> Result<(), CommandError> {
    let key = parse_key(key)?;
    let interval = match interval_ms {
        Some(0) => {
            return Err(CommandError::InvalidArgument(
                "--interval-ms must be greater than zero".to_owned(),
            ));
        }
        Some(ms) => Duration::from_millis(ms),
        None => ctx.config.poll_interval,
    };

    let binding = SettingBinding::bind(
        ctx.api.clone(),
        Arc::new(Anonymous),
        key,
        Value::Null,
        BindingOptions::every(interval),
    );
    tracing::info!(
        "Watching {} every {}ms (Ctrl-C to stop)",
        binding.key(),
        interval.as_millis()
    );

    let mut rx = binding.subscribe();
    let first = binding.loaded().await;
    print_json(&first.value)?;
    rx.mark_unchanged();

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let value = rx.borrow_and_update().value.clone();
                print_json(&value)?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopped watching");
                break;
            }
        }
    }
    Ok(())
}

/// Bind `key` for a single write, without polling.
fn bind_once(ctx: &Context, key: mission_core::SettingKey) -> SettingBinding<Value> {
    SettingBinding::bind(
        ctx.api.clone(),
        Arc::new(ctx.session.clone()),
        key,
        Value::Null,
        BindingOptions::no_poll(),
    )
}

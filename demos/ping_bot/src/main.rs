//! Ping Bot Example
//!
//! A small interactions bot showing every kind of handler:
//!
//! - `/ping`: immediate reply
//! - `/slow`: deferred ephemeral acknowledgement, then a follow-up
//! - `/admin user ban`: a grouped sub-command
//! - `/delete`: a reply carrying its own `confirm` button that times out
//! - `/fruit`: a command whose `name` option is autocompleted
//!
//! # Usage
//!
//! ```bash
//! cargo run --package ping-bot -- --config demos/ping_bot/disunity.toml
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use disunity::framework::component_key;
use disunity::prelude::*;
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

const FRUITS: &[&str] = &[
    "apple",
    "apricot",
    "banana",
    "blueberry",
    "cherry",
    "grape",
    "mango",
    "orange",
    "pear",
];

#[derive(Debug, Parser)]
#[command(version, about = "A small interactions bot for the Disunity framework")]
struct Args {
    /// Configuration file.
    #[arg(short, long, default_value = "disunity.toml")]
    config: PathBuf,

    /// Configuration profile, e.g. "production".
    #[arg(short, long)]
    profile: Option<String>,
}

// ============================================================================
// Handler Functions
// ============================================================================

async fn ping(Invoker(user): Invoker) -> String {
    format!("Pong, {}!", user.display_name())
}

/// Runs after the deferred acknowledgement has been sent.
async fn slow(ctx: Ctx) -> Result<()> {
    tokio::time::sleep(Duration::from_secs(3)).await;
    ctx.followup(MessageBody::text("Finished the slow work.").ephemeral(), Vec::new())
        .await?;
    Ok(())
}

async fn ban(options: Options, Invoker(moderator): Invoker) -> MessageBody {
    let target = options.str("user").unwrap_or("nobody");
    let reason = options.str("reason").unwrap_or("no reason given");
    info!(moderator = %moderator.id, user = target, reason, "Ban requested");
    MessageBody::text(format!("Banned <@{target}> ({reason}).")).ephemeral()
}

/// Registers a `confirm` component for this message only, so every
/// `/delete` reply has a button of its own.
async fn delete(ctx: Ctx, Invoker(user): Invoker) -> Result<MessageBody> {
    let name = confirm_name();
    ctx.register(
        component(name.clone())
            .timeout(Duration::from_secs(60))
            .handler(confirm),
    )?;

    let button = json!({
        "type": 1,
        "components": [{
            "type": 2,
            "style": 4,
            "label": "Confirm",
            "custom_id": name,
        }]
    });
    Ok(MessageBody::text(format!("{}, are you sure?", user.mention())).component_row(button))
}

/// Component keys end at the first `-`, so the tag uses the simple form.
fn confirm_name() -> String {
    format!("confirm{}", Uuid::new_v4().simple())
}

/// Clicks by anyone but the invoker leave the button in place.
async fn confirm(ctx: Ctx, CustomId(id): CustomId) -> Result<InteractionResponse, FollowupError> {
    if !ctx.check_user()? {
        return Ok(InteractionResponse::ephemeral_message(
            "Only the user who asked can confirm.",
        ));
    }
    if !ctx.registry().remove_component(component_key(&id)) {
        return Ok(InteractionResponse::ephemeral_message("Already deleted."));
    }
    Ok(ctx.update("Deleted."))
}

async fn fruit(options: Options) -> String {
    match options.str("name") {
        Some(name) => format!("You picked {name}."),
        None => "Pick a fruit.".to_string(),
    }
}

async fn suggest_fruit(Focused(option): Focused) -> InteractionResponse {
    let typed = option
        .value
        .as_ref()
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase();
    let choices = FRUITS
        .iter()
        .filter(|fruit| fruit.starts_with(&typed))
        .map(|fruit| json!({ "name": fruit, "value": fruit }))
        .collect();
    InteractionResponse::autocomplete(choices)
}

fn package() -> Package {
    Package::new("ping_bot")
        .add_command(command("ping"), ping)
        .add_command(command("slow").defer_ephemeral(), slow)
        .add_subcommand(subcommand("admin", "ban").group("user"), ban)
        .add_command(command("delete"), delete)
        .add_command(command("fruit"), fruit)
        .add_autocomplete(autocomplete("fruit"), suggest_fruit)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = DisunityRuntime::builder().config_file(&args.config);
    if let Some(profile) = args.profile {
        builder = builder.profile(profile);
    }
    let runtime = builder.build()?;

    runtime.register_package(package())?;

    info!(
        handlers = ?runtime.registry().stats(),
        "Ping bot ready"
    );

    runtime.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_names_are_unique_keys() {
        let first = confirm_name();
        let second = confirm_name();
        assert_ne!(first, second);
        assert_eq!(component_key(&first), first);
    }

    #[test]
    fn test_package_registers_no_static_confirm() {
        let registry = Registry::new();
        registry.register_package(package()).unwrap();
        assert_eq!(registry.stats().components, 0);
        assert!(registry.lookup_component("confirm").is_none());
    }
}

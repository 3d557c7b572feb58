use anyhow::{anyhow, Result};
use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;
use tokio::sync::mpsc;

use pengingat::command_handler::CommandHandler;
use pengingat::core::{Config, SystemClock};
use pengingat::database::Database;
use pengingat::features::{ConnectionSupervisor, OpenAiAssistant, RateLimiter, ReminderScheduler};
use pengingat::router::EventRouter;
use pengingat::transport::{DeliveryGateway, DiscordTransport, Transport};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    // The openai crate reads its key from the environment
    std::env::set_var("OPENAI_API_KEY", &config.openai_api_key);
    std::env::set_var("OPENAI_KEY", &config.openai_api_key);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting reminder bot...");

    let clock = Arc::new(
        SystemClock::from_hours(config.utc_offset_hours)
            .ok_or_else(|| anyhow!("invalid UTC offset {}", config.utc_offset_hours))?,
    );

    let database = Database::new(&config.database_path, clock.clone())
        .await
        .map_err(|e| anyhow!("Event store unavailable: {e}"))?;

    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let transport: Arc<dyn Transport> =
        Arc::new(DiscordTransport::new(config.discord_token.clone(), inbound_tx));
    let gateway = DeliveryGateway::new(transport.clone());
    let supervisor = ConnectionSupervisor::spawn(transport.clone());

    let command_handler = Arc::new(CommandHandler::new(
        database.clone(),
        gateway.clone(),
        Arc::new(OpenAiAssistant::new(config.openai_model.clone())),
        RateLimiter::new(config.assistant_max_requests, config.assistant_window),
    ));

    let router = EventRouter::new(command_handler, supervisor.clone());
    let router_task = tokio::spawn(router.run(inbound_rx));

    info!("Connecting to chat transport...");
    let initial = supervisor.clone();
    tokio::spawn(async move {
        initial.ensure_connected().await;
    });

    let scheduler = ReminderScheduler::new(database, gateway, supervisor, clock)
        .with_period(config.tick_interval);
    let scheduler_task = tokio::spawn(scheduler.run());

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }

    info!("Shutting down...");
    scheduler_task.abort();
    transport.disconnect().await;
    router_task.abort();

    Ok(())
}

//! `rookery ask`: Answer one question with the tool-calling agent.

use rookery_agent::AgentLoop;
use rookery_client::GatewayClient;
use rookery_config::AppConfig;
use rookery_core::event::EventBus;
use std::sync::Arc;
use tracing::info;

pub async fn run(question: String, strategy: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(strategy) = strategy {
        config.agent.strategy = strategy;
    }
    config.validate()?;

    let client = Arc::new(GatewayClient::from_config(&config.gateway)?);
    let tools = Arc::new(rookery_tools::default_registry(&config.agent.wikipedia_url)?);
    let event_bus = Arc::new(EventBus::default());

    let agent = AgentLoop::new(
        client,
        &config.agent.function_name,
        &config.agent.strategy,
        tools,
        event_bus,
    )
    .with_max_iterations(config.agent.max_iterations);

    let answer = agent.ask(&question).await?;
    info!(
        iterations = answer.iterations,
        episode_id = ?answer.episode.as_ref().map(|e| e.to_string()),
        "Question answered"
    );

    println!("{}", answer.answer);
    Ok(())
}

//! Example: answer one natural-language question against the configured
//! database.
//!
//! Inference: set OPENAI_API_KEY (or put `api_key` in sqlmatic.yaml). The
//! default configuration expects a SQLite database at data/chinook.db.
//!
//! Run: `cargo run -p sqlmatic-agent --example one_question -- "How many artists are there?"`

use std::path::Path;

use sqlmatic_agent::{Agent, AgentConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let question = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "How many tables does this database have?".to_string());

    let config_path = Path::new("sqlmatic.yaml");
    let config = if config_path.exists() {
        AgentConfig::load(config_path)?
    } else {
        AgentConfig::default()
    };

    let agent = Agent::from_config(config)?;
    let answer = agent.run_turn("example", &question).await?;
    println!("{answer}");
    Ok(())
}

//! sqlmatic-agent binary: REPL, offline evaluation, and schema dump.

mod cli;

use std::io::Write as _;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sqlmatic_agent::{
    load_cases_from_csv, Agent, AgentConfig, DatabaseBackend, EvaluationHarness,
};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sqlmatic_agent=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    let config = if cli.config.exists() {
        AgentConfig::load(&cli.config)?
    } else {
        AgentConfig::default()
    };

    match cli.command {
        Command::Repl { query, thread_id } => run_repl(config, query, &thread_id).await,
        Command::Eval { limit, json } => run_eval(config, limit, json).await,
        Command::Schema { compact } => run_schema(config, compact).await,
    }
}

async fn run_repl(config: AgentConfig, query: Option<String>, thread_id: &str) -> Result<()> {
    let agent = Agent::from_config(config)?;
    if let Some(question) = query {
        let answer = agent.run_turn(thread_id, &question).await?;
        println!("{answer}");
        return Ok(());
    }

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }
        match agent.run_turn(thread_id, question).await {
            Ok(answer) => println!("{answer}"),
            Err(error) => eprintln!("error: {error:#}"),
        }
    }
    Ok(())
}

async fn run_eval(config: AgentConfig, limit: Option<usize>, json: bool) -> Result<()> {
    let settings = config.evaluation.clone();
    let cases = load_cases_from_csv(
        &settings.ground_truth_path,
        &settings.question_column,
        &settings.ground_truth_column,
    )?;
    let harness = EvaluationHarness::from_settings(&settings);
    let agent = Agent::from_config(config)?;
    let report = harness.run(&agent, &cases, limit).await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize report")?
        );
        return Ok(());
    }

    println!("evaluated {} cases in {:.1}s", report.total_queries, report.execution_time_secs);
    println!(
        "successful: {}  failed: {}  success rate: {:.1}%",
        report.successful_queries,
        report.failed_queries,
        report.success_rate
    );
    println!(
        "similarity avg {:.3}  median {:.3}  min {:.3}  max {:.3}",
        report.average_similarity,
        report.median_similarity,
        report.min_similarity,
        report.max_similarity
    );
    for outcome in report.failed_cases() {
        match (&outcome.error, outcome.similarity) {
            (Some(error), _) => println!("  case {}: {} ({error})", outcome.case_id, outcome.question),
            (None, Some(similarity)) => println!(
                "  case {}: {} (similarity {similarity:.3})",
                outcome.case_id, outcome.question
            ),
            (None, None) => println!("  case {}: {}", outcome.case_id, outcome.question),
        }
    }
    Ok(())
}

async fn run_schema(config: AgentConfig, compact: bool) -> Result<()> {
    let backend = DatabaseBackend::from_settings(&config.database);
    let schema = backend.describe_schema(&config.tool_get_schema).await?;
    let text = if compact {
        serde_json::to_string(&schema)?
    } else {
        serde_json::to_string_pretty(&schema)?
    };
    println!("{text}");
    Ok(())
}

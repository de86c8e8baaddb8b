//! Live end-to-end test against a real chat completions endpoint.
//!
//! Ignored by default; needs OPENAI_API_KEY and network access.
//! Run with: `cargo test -p sqlmatic-agent --test live_llm -- --ignored`

use rusqlite::Connection;
use tempfile::TempDir;

use sqlmatic_agent::{Agent, AgentConfig};

#[tokio::test]
#[ignore = "requires OPENAI_API_KEY and network access"]
async fn answers_a_question_against_a_real_endpoint() {
    let dir = TempDir::new().expect("tempdir");
    let db_path = dir.path().join("live.db");
    let conn = Connection::open(&db_path).expect("open db");
    conn.execute_batch(
        "CREATE TABLE artists (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         INSERT INTO artists (name) VALUES ('AC/DC'), ('Accept'), ('Aerosmith');",
    )
    .expect("seed db");

    let mut config = AgentConfig::default();
    config.database.path = db_path;
    let agent = Agent::from_config(config).expect("agent with live key");

    let answer = agent
        .run_turn("live", "How many artists are in the database? Use execute_sql.")
        .await
        .expect("live turn");
    assert!(answer.contains('3'), "answer: {answer}");
}

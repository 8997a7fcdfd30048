//! Interactive test console
//!
//! Drives the engine from stdin, one line per caller utterance, against an
//! Ollama backend when one is reachable (deterministic fallbacks otherwise).
//!
//! ```sh
//! cargo run -p frontdesk-engine --example console
//! ```

use std::io::{BufRead, Write};
use std::sync::Arc;

use frontdesk_config::{RuntimeConfig, Scenario, Settings, StaticConfigProvider};
use frontdesk_core::Speaker;
use frontdesk_engine::{TracingSink, TurnEngine};
use frontdesk_llm::LlmFactory;
use frontdesk_persistence::PersistenceLayer;
use frontdesk_store::InMemoryContextStore;

fn demo_company() -> RuntimeConfig {
    let mut config = RuntimeConfig::fallback("demo-hvac");
    config.trade = "HVAC".to_string();
    config.config_version = "demo".to_string();
    config
        .variables
        .insert("greeting".to_string(), "Thanks for calling Desert Air!".to_string());
    config
        .variables
        .insert("hours".to_string(), "Mon-Fri 7am-6pm".to_string());
    config.scenarios = vec![Scenario {
        id: "no-cool".to_string(),
        keywords: vec!["not cooling".to_string(), "warm air".to_string()],
        answer: "A system blowing warm air usually needs a refrigerant or capacitor check."
            .to_string(),
        category: Some("cooling".to_string()),
    }];
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "frontdesk=info".into()),
        )
        .init();

    let settings = Settings::default();
    let model = match LlmFactory::create(&settings.llm) {
        Ok(model) => Some(model),
        Err(e) => {
            eprintln!("no chat backend ({e}); running with deterministic fallbacks only");
            None
        }
    };

    let engine = TurnEngine::new(
        &settings,
        Arc::new(InMemoryContextStore::with_default_ttl()),
        Arc::new(StaticConfigProvider::new().with_company(demo_company())),
        model,
        PersistenceLayer::in_memory(),
        Arc::new(TracingSink),
    );

    let call_id = format!("console-{}", uuid::Uuid::new_v4());
    let started = chrono::Utc::now();
    engine
        .init_call_context(&call_id, "demo-hvac", "HVAC", "demo")
        .await?;

    println!("frontdesk console - type a caller line, or 'quit' to hang up\n");

    let stdin = std::io::stdin();
    loop {
        print!("caller> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") {
            break;
        }

        let reply = engine
            .process_caller_turn("demo-hvac", &call_id, Speaker::Caller, line)
            .await;
        println!("agent [{}]> {}\n", reply.decision.action, reply.next_prompt);
    }

    engine
        .finalize_call(&call_id, started, chrono::Utc::now(), Default::default())
        .await?;
    println!("call archived, goodbye");
    Ok(())
}

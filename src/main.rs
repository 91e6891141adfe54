//! Gold intelligence terminal: binary entrypoint.
//! Runs the pipeline once, prints the narrative and then the raw snapshot.

use anyhow::Result;
use gold_intel::{Pipeline, PipelineConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gold_intel=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = PipelineConfig::load_default()?;
    tracing::info!(
        deadline_secs = cfg.collection.deadline_secs,
        reasoning = ?cfg.reasoning,
        "config loaded"
    );
    let pipeline = Pipeline::from_config(&cfg)?;

    let run = pipeline.run().await;

    match &run.narrative {
        Ok(text) => {
            println!("### Market assessment\n");
            println!("{text}");
        }
        Err(e) => eprintln!("Analysis failed: {e}"),
    }

    println!("\n### Raw data\n");
    println!(
        "{}",
        serde_json::to_string_pretty(run.snapshot()).unwrap_or_else(|_| "{}".to_string())
    );

    if let Err(e) = run.narrative {
        return Err(e.into());
    }
    Ok(())
}

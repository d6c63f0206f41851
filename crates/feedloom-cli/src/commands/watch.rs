use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use feedloom_core::{router::ChangeRouter, AppConfig, AppContext};

use crate::render::ConsoleRenderer;

/// Register the configured feeds plus `urls`, then poll until Ctrl-C
pub async fn run(config: AppConfig, urls: &[String]) -> Result<()> {
    let mut targets = config.feeds.clone();
    targets.extend(urls.iter().cloned());

    let ctx = AppContext::new(config)?;
    ctx.store.subscribe(ChangeRouter::new(ConsoleRenderer::stdout()));

    for url in &targets {
        match ctx.engine.submit_form(url).await {
            Ok(_) => {}
            Err(kind) if kind.is_validation() => warn!("Skipping {}: {}", url, kind),
            Err(kind) => warn!("Could not load {}: {}", url, kind),
        }
    }

    if ctx.store.feeds().is_empty() {
        println!("No feeds to watch.");
        println!("\nPass feed URLs as arguments, or list them under `feeds` in:");
        println!("  {}", AppConfig::config_path().display());
        return Ok(());
    }

    println!(
        "\nWatching {} feeds every {}s (Ctrl-C to stop)",
        ctx.store.feeds().len(),
        ctx.config.sync.poll_interval_secs
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    let poller = ctx.start_polling_with_events(tx);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Received shutdown signal");
                break;
            }
            event = rx.recv() => match event {
                Some(event) => debug!(?event, "Poll cycle finished"),
                None => break,
            },
        }
    }

    poller.shutdown().await;
    Ok(())
}

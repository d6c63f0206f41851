use std::process::ExitCode;

use anyhow::Result;

use feedloom_core::{router::ChangeRouter, AppConfig, AppContext};

use crate::render::ConsoleRenderer;

/// Register a single feed and print it with its entries.
///
/// `show` opens the detail of the n-th entry (1-based) afterwards.
pub async fn run(config: AppConfig, url: &str, show: Option<usize>) -> Result<ExitCode> {
    let ctx = AppContext::new(config)?;
    ctx.store.subscribe(ChangeRouter::new(ConsoleRenderer::stdout()));

    let registration = match ctx.engine.submit_form(url).await {
        Ok(registration) => registration,
        // Feedback was already rendered from the form state
        Err(_) => return Ok(ExitCode::FAILURE),
    };

    if registration.entries.is_empty() {
        println!("(no entries)");
    }

    if let Some(index) = show {
        match index.checked_sub(1).and_then(|i| registration.entries.get(i)) {
            Some(entry) => {
                ctx.engine.open_entry(entry.id);
            }
            None => {
                println!(
                    "No entry #{} (feed has {} entries)",
                    index,
                    registration.entries.len()
                );
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

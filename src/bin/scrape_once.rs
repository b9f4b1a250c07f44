//! Scrape a single URL through a real Chrome and print the result.
//!
//! Usage: `scrape_once <web|shopee|mercadolivre> <url>`

use anyhow::{bail, Result};
use std::sync::Arc;

use product_scraper::browser::ChromeEngine;
use product_scraper::config::Config;
use product_scraper::logging;
use product_scraper::orchestrator::{ScrapeFailure, ScrapeOrchestrator};
use product_scraper::profiles;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init();

    let mut args = std::env::args().skip(1);
    let (Some(name), Some(url)) = (args.next(), args.next()) else {
        bail!("usage: scrape_once <web|shopee|mercadolivre> <url>");
    };
    let Some(profile) = profiles::get(&name) else {
        bail!("unknown profile {:?}", name);
    };

    let config = Config::from_env()?;
    let orchestrator = ScrapeOrchestrator::new(Arc::new(ChromeEngine::new(config.launch_config())));

    match orchestrator.scrape(&url, profile).await {
        Ok(result) => println!("{}", serde_json::to_string_pretty(&result)?),
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&ScrapeFailure::from(&e))?);
            std::process::exit(1);
        }
    }
    Ok(())
}

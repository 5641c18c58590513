use anyhow::{Context, Result};

use matchlens_terminal::analytics_api::{AnalyticsApi, HttpAnalyticsClient};
use matchlens_terminal::config::AppConfig;
use matchlens_terminal::http_client::http_client;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = AppConfig::from_env();
    let with_frame = std::env::args().skip(1).any(|arg| arg == "--frame");

    let client = http_client(config.request_timeout)?;
    let api = HttpAnalyticsClient::new(client.clone(), &config.api_base);
    println!("Probing {}", api.base_url());

    let health = api
        .health()
        .with_context(|| format!("GET {}/health", api.base_url()))?;
    println!(
        "health: {}",
        serde_json::to_string_pretty(&health).unwrap_or_else(|_| health.to_string())
    );

    let status = api
        .status()
        .with_context(|| format!("GET {}/status", api.base_url()))?;
    println!(
        "status: processing={} video={} results={}",
        status.is_processing, status.has_video, status.has_results
    );

    if with_frame {
        match api.current_frame() {
            Ok(frame) => println!(
                "frame: #{} ({} base64 chars, {:.1}s processing)",
                frame.stats.frame_count,
                frame.frame.len(),
                frame.stats.processing_time
            ),
            // No running analysis is the usual answer here.
            Err(err) => println!("frame: unavailable ({err})"),
        }
    }

    println!("Connection OK");
    Ok(())
}

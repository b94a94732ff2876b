// src/main.rs
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;

use crate::ai::connector::VisionTriage;

mod ai;
mod capture;
mod error;
mod gui;
mod history;
mod state;

#[derive(Parser)]
#[command(name = "dermascope")]
#[command(about = "Clinical photo triage with a hosted vision model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a photo from disk and print the triage report
    Analyze {
        /// Path to the image file (JPEG, PNG, WebP, ...)
        file: PathBuf,

        /// Vision model name
        #[arg(long, short = 'm')]
        model: Option<String>,

        /// Print the raw JSON report instead of the formatted view
        #[arg(long)]
        json: bool,
    },
    /// Check connectivity to the inference endpoint
    CheckEndpoint,
    /// Run graphical user interface
    Gui,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().filter_or("RUST_LOG", "info"));

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { file, model, json } => run_analyze_cli(file, model, json),
        Commands::CheckEndpoint => check_endpoint(),
        Commands::Gui => gui::run_gui(),
    }
}

fn run_analyze_cli(file: PathBuf, model: Option<String>, json: bool) -> Result<()> {
    info!("Starting headless triage mode");

    let image = capture::CapturedImage::from_file(&file)?;

    let model_name = model.unwrap_or_else(|| ai::remote_model::DEFAULT_MODEL.to_string());
    let model = ai::remote_model::RemoteModel::new(&model_name)?;

    match model.analyze(&image) {
        Ok(report) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("\n=== Triage Report ({}) ===", model.model_name());
                print!("{}", report.to_plain_text());
                println!("===========================================\n");
            }
            Ok(())
        }
        Err(e) => {
            error!("Analysis failed: {}", e);
            println!("\nAnalysis failed: {}", e);
            println!("Check your network connection and GEMINI_API_KEY, then retry.");
            // Propagate so scripted callers see a nonzero exit code.
            Err(e.into())
        }
    }
}

fn check_endpoint() -> Result<()> {
    let endpoint = ai::remote_model::endpoint_from_env();
    info!("Checking inference endpoint at {}...", endpoint);

    let api_key = std::env::var(ai::remote_model::API_KEY_VAR).unwrap_or_default();
    if api_key.is_empty() {
        println!(
            "✗ {} is not set; requests will be rejected",
            ai::remote_model::API_KEY_VAR
        );
    }

    let client = reqwest::blocking::Client::new();
    let api_url = format!("{}/models", endpoint);

    match client
        .get(&api_url)
        .header("x-goog-api-key", &api_key)
        .send()
    {
        Ok(response) => {
            if response.status().is_success() {
                println!("✓ Endpoint reachable at {}", endpoint);

                let data: serde_json::Value = response.json()?;
                if let Some(models) = data["models"].as_array() {
                    println!("✓ {} model(s) available", models.len());
                }
            } else {
                println!("✗ Endpoint error: {}", response.status());
            }
        }
        Err(e) => {
            println!("✗ Could not reach {}", endpoint);
            println!("  Error: {}", e);
            println!("\nTroubleshooting:");
            println!("  1. Check your network connection");
            println!("  2. Export a valid key: export GEMINI_API_KEY=...");
            println!("  3. Override the endpoint if needed: export DERMASCOPE_ENDPOINT=...");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::run_analyze_cli;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn headless_analyze_fails_on_missing_file() {
        let result = run_analyze_cli(PathBuf::from("/nonexistent/lesion.png"), None, true);
        assert!(result.is_err());
    }

    #[test]
    fn headless_analyze_propagates_endpoint_failure() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("lesion.png");
        let pixels = image::RgbaImage::from_pixel(2, 2, image::Rgba([180, 120, 100, 255]));
        pixels.save(&path).expect("save test png");

        // Nothing listens on the discard port, so the analyze call is
        // refused immediately.
        std::env::set_var("GEMINI_API_KEY", "test-key");
        std::env::set_var("DERMASCOPE_ENDPOINT", "http://127.0.0.1:9");

        let result = run_analyze_cli(path, None, false);
        assert!(result.is_err());
    }
}

//! nlfind CLI - natural-language file search
//!
//! Describe files in plain English and find them on disk.

use anyhow::Result;
use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use nlfind::{
    format_results, format_results_json, CancelToken, SearchConfig, SearchRequest, Searcher,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nlfind")]
#[command(author, version, about = "Find files by describing them in plain English", long_about = None)]
struct Cli {
    /// What to look for, in plain English
    #[arg(trailing_var_arg = true)]
    prompt: Vec<String>,

    /// Directory to search
    #[arg(short = 'p', long, default_value = ".")]
    path: PathBuf,

    /// Maximum number of results
    #[arg(short = 'm', long, default_value = "10", env = "NLFIND_MAX_RESULTS")]
    max_results: usize,

    /// Show size, timestamp, and matched clauses per result
    #[arg(short = 'd', long, env = "NLFIND_DETAILS")]
    details: bool,

    /// Output as JSON
    #[arg(long, env = "NLFIND_JSON")]
    json: bool,

    /// Abort the search after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Number of matcher worker threads
    #[arg(short = 'w', long, env = "NLFIND_WORKERS")]
    workers: Option<usize>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if cli.prompt.is_empty() {
        println!("{}", "nlfind - find files by describing them".cyan().bold());
        println!("\nUsage:");
        println!(
            "  {} \"python files with machine learning\"",
            "nlfind".green()
        );
        println!(
            "  {} \"excel spreadsheets\" -p ~/Documents",
            "nlfind".green()
        );
        println!(
            "  {} \"pdfs or notebooks\" -d        # show file details",
            "nlfind".green()
        );
        println!("\nRun {} for more options.", "nlfind --help".yellow());
        return Ok(());
    }

    let prompt = cli.prompt.join(" ");
    cmd_search(
        &prompt,
        cli.path,
        cli.max_results,
        cli.details,
        cli.json,
        cli.timeout,
        cli.workers,
    )
}

fn cmd_search(
    prompt: &str,
    path: PathBuf,
    max_results: usize,
    details: bool,
    json: bool,
    timeout: Option<u64>,
    workers: Option<usize>,
) -> Result<()> {
    let mut config = SearchConfig::default();
    if let Some(workers) = workers {
        config = config.with_workers(workers);
    }

    let searcher = Searcher::new(config)?;
    let request = SearchRequest::new(path, prompt).with_max_results(max_results);

    let cancel = CancelToken::new();
    if let Some(secs) = timeout {
        let watchdog = cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs(secs));
            watchdog.cancel();
        });
    }

    let spinner = if json {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        pb.set_message("Searching...");
        Some(pb)
    };

    let outcome = searcher.search_with_cancel(&request, &cancel);

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let results = match outcome {
        Ok(results) => results,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    if results.is_empty() {
        println!("No files matched: {}", prompt.yellow());
        return Ok(());
    }

    if json {
        println!("{}", format_results_json(&results)?);
    } else {
        println!(
            "\n{} results for \"{}\":",
            results.len().to_string().green().bold(),
            prompt.cyan()
        );
        print!("{}", format_results(&results, details));
    }

    Ok(())
}

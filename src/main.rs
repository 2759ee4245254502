use std::process::ExitCode;

use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;

const HELP: &str = "redditmod - Inline media and endless scrolling for reddit listings.

Usage:
  redditmod resolve <url>   Resolve a post URL and print the media artifact as JSON
                            (exit status 2 when nothing could be resolved)
  redditmod --version, -V   Show version and exit
  redditmod --help,    -h   Show this help message

Logging is controlled with RUST_LOG (e.g. RUST_LOG=redditmod=debug).";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> anyhow::Result<ExitCode> {
    match args.first().map(String::as_str) {
        Some("--version" | "-V") => {
            println!("redditmod {}", redditmod::VERSION);
            Ok(ExitCode::SUCCESS)
        }
        Some("--help" | "-h") | None => {
            println!("{HELP}");
            Ok(ExitCode::SUCCESS)
        }
        Some("resolve") => {
            let Some(url) = args.get(1) else {
                bail!("resolve needs a url\n\n{HELP}");
            };
            let cfg = redditmod::config::load(redditmod::config::LoadOptions::default())
                .context("load config")?;
            let artifact = redditmod::resolve_once(&cfg, url)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&artifact).context("encode artifact")?
            );
            if artifact.is_failure() {
                tracing::warn!(url = url.as_str(), "no media resolved");
                return Ok(ExitCode::from(2));
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(other) => bail!("unknown argument {other}\n\n{HELP}"),
    }
}

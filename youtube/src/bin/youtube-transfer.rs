use eyre::Context;
use std::io::{IsTerminal, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use youtube_transfer::account::{self, Account};
use youtube_transfer::config::{ClientSecrets, Config};
use youtube_transfer::menu::{Choice, Menu, parse_choice};
use youtube_transfer::oauth::OAuthManager;
use youtube_transfer::report::{Side, TransferSummary};
use youtube_transfer::{TransferLocks, transfer};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();

    let config_path = Config::resolve_path();
    let config = Config::load(&config_path).await?;
    let secrets = ClientSecrets::load(&config.client_secrets).await?;
    let oauth_manager = Arc::new(OAuthManager::new(secrets.client_id, secrets.client_secret));
    let http = reqwest::Client::new();

    let source = account::connect(
        Side::Source,
        &config.source_token,
        Arc::clone(&oauth_manager),
        http.clone(),
    )
    .await?;
    let dest = account::connect(
        Side::Destination,
        &config.target_token,
        oauth_manager,
        http,
    )
    .await?;
    if source.key() == dest.key() {
        eyre::bail!(
            "source and destination are both \"{}\" ({}), sign in with a different account",
            source.channel.snippet.title,
            source.key()
        );
    }

    let locks = TransferLocks::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!(
            "\n{}",
            Menu {
                source: &source.channel.snippet.title,
                destination: &dest.channel.snippet.title,
            }
        );
        std::io::stdout().flush().context("flush stdout")?;

        let Some(line) = lines.next_line().await.context("read menu choice")? else {
            break;
        };
        let domains = match parse_choice(&line) {
            Ok(Choice::Exit) => break,
            Ok(Choice::Transfer(domains)) => domains,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        let _permit = locks.try_acquire(dest.key())?;
        let run = transfer(&source.yt, &dest.yt, &domains, config.transfer.clone());
        let summary = tokio::select! {
            summary = run => summary,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nInterrupted. Everything copied so far stays; run again to continue.");
                break;
            }
        };

        println!("\n{summary}");
        if let Some(path) = &config.report_path {
            write_report(path, &summary).await?;
        }
        // Access tokens may have been refreshed during the run.
        save_tokens(&config, &source, &dest).await?;
    }

    save_tokens(&config, &source, &dest).await
}

async fn save_tokens(config: &Config, source: &Account, dest: &Account) -> eyre::Result<()> {
    source.save_token(&config.source_token).await?;
    dest.save_token(&config.target_token).await
}

async fn write_report(path: &std::path::Path, summary: &TransferSummary) -> eyre::Result<()> {
    let json = serde_json::to_string_pretty(summary).context("serialize transfer report")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("write transfer report to {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote transfer report");
    Ok(())
}

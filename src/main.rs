mod cli;

use anyhow::Result;
use clap::Parser;
use spamgate::{
    app::{self, SpamGateApp},
    config,
    infrastructure::{directories, logging, shutdown},
};

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config.logging, &paths)?;

    let shutdown = shutdown::Shutdown::new();
    shutdown::install_signal_handlers(shutdown.clone());

    let app = SpamGateApp::initialize(config, shutdown)?;
    match cli.command {
        Command::VerifyKey { key } => {
            let valid = app.verify_key(&key).await?;
            println!("{}", if valid { "valid" } else { "invalid" });
        }
        Command::Check(args) => {
            let payload = app::read_comment(&args.comment).await?;
            let result = app.check(&args.key, &payload).await;
            println!("{}", result.kind);
            for (name, value) in &result.info {
                println!("  {name}: {value}");
            }
        }
        Command::ReportSpam(args) => {
            let payload = app::read_comment(&args.comment).await?;
            app.report_spam(&args.key, &payload).await;
        }
        Command::ReportHam(args) => {
            let payload = app::read_comment(&args.comment).await?;
            app.report_ham(&args.key, &payload).await;
        }
        Command::Replay { tree, events, out } => {
            let report = app.replay(&tree, &events).await?;
            for replayed in &report.events {
                println!(
                    "{}\t{:?}\t{}",
                    replayed.event.node,
                    replayed.event.kind,
                    app::describe(replayed.outcome.as_ref())
                );
            }
            if let Some(out) = out {
                app::write_snapshot(&out, &report.snapshot).await?;
            }
            tracing::info!(
                target: "app",
                events = report.events.len(),
                rejected = report.rejected(),
                failed = report.failed(),
                interrupted = report.interrupted,
                "replay complete"
            );
        }
    }
    Ok(())
}

use anyhow::Context;
use clap::Parser;
use simview::services::{PageSource, RunAggregate, SimulationService};
use simview::tui::{self, LogBuffer, LogMakeWriter, TuiContext};
use simview::{BackendClient, Config, Identifier};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "simview", about = "Browse the results of a multi-bot trading simulation")]
struct Cli {
    /// Simulation run to open.
    run_id: String,

    /// Bot configuration whose replay is opened on start.
    bot_config_id: Option<String>,

    /// Print a one-off summary instead of starting the terminal UI.
    #[arg(long)]
    summary: bool,

    /// Override SIMVIEW_API_BASE.
    #[arg(long)]
    api_base: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(api_base) = cli.api_base {
        config.api_base = api_base;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "simview=debug".into());

    // The UI owns the terminal, so logs go to an in-memory buffer instead.
    let log_buffer = Arc::new(LogBuffer::new(config.log_capacity));
    if cli.summary {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(LogMakeWriter::new(Arc::clone(&log_buffer))),
            )
            .init();
    }

    let client = BackendClient::new(&config).context("failed to create API client")?;
    info!("Using API base {}", client.base_url());
    let source: Arc<dyn PageSource> = Arc::new(client);
    let service = SimulationService::new(source, &config);

    let run_id = Identifier::parse(&cli.run_id);
    let bot_config_id = cli.bot_config_id.as_deref().map(Identifier::parse);

    if cli.summary {
        return print_summary(&service, &run_id, bot_config_id.as_ref()).await;
    }

    tui::run_tui(TuiContext {
        service,
        run_id,
        bot_config_id,
        poll_interval: config.poll_interval(),
        log_buffer,
    })
    .await
    .context("terminal UI failed")?;

    Ok(())
}

async fn print_summary(
    service: &SimulationService<dyn PageSource>,
    run_id: &Identifier,
    bot_config_id: Option<&Identifier>,
) -> anyhow::Result<()> {
    let snapshot = service.snapshot(run_id).await;
    for notice in &snapshot.notices {
        eprintln!("{}", notice);
    }

    if let Some(ref run) = snapshot.run {
        let (completed, total) = run.bot_counts();
        println!(
            "Run {} [{}] {:.0}% ({}/{} bots)",
            run.id,
            run.status,
            run.progress_pct(),
            completed,
            total
        );
    }

    let agg = RunAggregate::from_rows(&snapshot.results.items);
    println!(
        "{} bots, {} profitable ({:.1}%), mean profit {:.2}, mean win rate {:.2}",
        agg.bots,
        agg.profitable,
        agg.profitable_pct(),
        agg.mean_profit,
        agg.mean_win_rate
    );
    if let Some(best) = agg.best.and_then(|pos| snapshot.results.items.get(pos)) {
        println!("Best bot {}: profit {:.2}", best.bot_index().to_plain_string(), best.total_profit);
    }
    if let Some(worst) = agg.worst.and_then(|pos| snapshot.results.items.get(pos)) {
        println!("Worst bot {}: profit {:.2}", worst.bot_index().to_plain_string(), worst.total_profit);
    }

    if let Some(bot_config_id) = bot_config_id {
        let load = service.replay(run_id, bot_config_id).await;
        for notice in &load.notices {
            eprintln!("{}", notice);
        }
        for day in load.replay.days() {
            println!(
                "{}  P/L {:.2}  ticks {}  trades {}",
                day.date(),
                day.day.performance_metrics.daily_profit,
                day.tick_count(),
                day.trades_executed()
            );
        }
    }

    Ok(())
}

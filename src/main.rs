use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;
use trendwatch::application::api::{ErrorResponse, StartRequest, TriggerRequest, TriggerResponse};
use trendwatch::application::scheduler::TickEvent;
use trendwatch::cli::commands::{Cli, Commands};
use trendwatch::config::AppConfig;
use trendwatch::TrendWatch;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();

    let tw = match AppConfig::from_env().and_then(|cfg| TrendWatch::new(&cfg)) {
        Ok(tw) => tw,
        Err(e) => {
            eprintln!("Error initializing trendwatch: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run_command(tw, cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run_command(tw: TrendWatch, cmd: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Commands::Trigger { json } => {
            let request: TriggerRequest = serde_json::from_str(&json)?;
            match tw.trigger(&request).await {
                Ok(response) => println!("{}", serde_json::to_string_pretty(&response)?),
                Err(e) => {
                    println!("{}", serde_json::to_string_pretty(&ErrorResponse::from(&e))?);
                    return Err(e.into());
                }
            }
        }
        Commands::Watch { json } => {
            let request: StartRequest = serde_json::from_str(&json)?;
            let mut events = tw.subscribe();
            let job = tw.start(&request).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    event = events.recv() => match event {
                        Ok(TickEvent::Completed(report)) => {
                            println!("{}", serde_json::to_string_pretty(&TriggerResponse::from(report.as_ref()))?);
                        }
                        Ok(TickEvent::Failed { message }) => eprintln!("tick failed: {message}"),
                        Ok(TickEvent::Skipped) => eprintln!("tick skipped: previous run still in progress"),
                        Err(RecvError::Lagged(n)) => eprintln!("missed {n} tick events"),
                        Err(RecvError::Closed) => break,
                    },
                }
            }

            let stopped = tw.stop().await?;
            println!("{}", serde_json::to_string_pretty(&stopped)?);
        }
        Commands::Record => {
            let observation = tw.record_latest().await?;
            println!("{}", serde_json::to_string_pretty(&observation)?);
        }
        Commands::Backfill { hours, step_minutes } => {
            let summary = tw.backfill(hours, step_minutes).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

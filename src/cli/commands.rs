use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "trendwatch", about = "Price-trend monitoring and deposit decision agent")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the pipeline once and print the decision
    Trigger {
        /// JSON with monitoringPeriod, profitMargin, riskTolerance (all optional)
        #[arg(default_value = "{}")]
        json: String,
    },
    /// Start the recurring job and stream decisions until Ctrl-C
    Watch {
        /// JSON with interval (cron), monitoringPeriod, profitMargin, riskTolerance (all optional)
        #[arg(default_value = "{}")]
        json: String,
    },
    /// Fetch the latest observation and store its embedding
    Record,
    /// Record historical observations into the vector store
    Backfill {
        /// Hours to look back
        #[arg(long, default_value = "24")]
        hours: u32,
        /// Minutes between samples
        #[arg(long, default_value = "60")]
        step_minutes: u32,
    },
}

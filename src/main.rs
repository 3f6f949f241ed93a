use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;

use converge_rs::bank::auth;
use converge_rs::bank::config::parse_assets;
use converge_rs::bank::{BankConfig, HttpConnector, OnboardingWorkflow, Person, WorkflowSettings};
use converge_rs::flow::WorkflowRunner;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Onboard a customer and round-trip each crypto asset
    Run {
        /// Crypto asset to trade (repeatable); defaults to CRYPTO_ASSETS
        #[arg(short, long = "asset")]
        assets: Vec<String>,

        /// USD deposited into the customer account, in cents
        #[arg(long)]
        usd_amount: Option<i64>,

        /// USD spent on each asset, in cents
        #[arg(long)]
        trade_amount: Option<i64>,

        /// YAML file describing the person to onboard
        #[arg(short, long)]
        person: Option<String>,

        /// Abort the whole run after this many seconds
        #[arg(short, long)]
        deadline: Option<u64>,
    },
    /// Only acquire an auth token
    Token,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = BankConfig::from_env().context("loading bank configuration")?;

    match args.command {
        Commands::Token => {
            let token = auth::fetch_token(&reqwest::Client::new(), &config).await?;
            println!("Got auth token ({} chars)", token.len());
        }
        Commands::Run {
            assets,
            usd_amount,
            trade_amount,
            person,
            deadline,
        } => {
            let person = match person {
                Some(path) => Person::from_yaml_file(&path)
                    .with_context(|| format!("reading person from {}", path))?,
                None => Person::default(),
            };

            let mut settings = WorkflowSettings::from_config(&config);
            if !assets.is_empty() {
                settings.crypto_assets = parse_assets(&assets.join(","));
            }
            if let Some(amount) = usd_amount {
                settings.usd_amount = amount;
            }
            if let Some(amount) = trade_amount {
                settings.trade_amount = amount;
            }

            let mut runner = WorkflowRunner::new();
            if let Some(secs) = deadline {
                runner = runner.with_deadline(Duration::from_secs(secs));
            }

            let connector = Arc::new(HttpConnector::new(config));
            let report = runner
                .run(OnboardingWorkflow::new(connector, person, settings))
                .await;

            println!("Run {} finished in {:?}", report.run_id, report.elapsed);
            for created in &report.created {
                println!("  created {} {} ({})", created.kind, created.id, created.task_id);
            }

            match report.outcome {
                Ok(summary) => {
                    println!(
                        "Customer {} funded with {} on account {}",
                        summary.customer_guid, summary.usd_balance, summary.usd_account_guid
                    );
                    for asset in &summary.assets {
                        println!(
                            "  {}: account {} withdrawn by {}, final balance {}",
                            asset.asset,
                            asset.account_guid,
                            asset.withdrawal_guid,
                            asset.final_balance
                        );
                    }
                }
                Err(e) => {
                    eprintln!("Run failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

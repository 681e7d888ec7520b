use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use mempool_agent::issuer::WithdrawStrategy;

#[derive(Parser)]
#[command(name = "agent-cli")]
#[command(about = "Operator CLI for the mempool strike agent", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show wallet balance, nonce and endpoint health
    Status,
    /// Send native currency from the agent wallet
    Withdraw {
        /// Withdrawal route label, e.g. standard-eoa
        #[arg(short, long, default_value = "standard-eoa")]
        strategy: String,

        /// Amount in native units as a decimal string, e.g. 0.25
        #[arg(short, long)]
        amount: String,

        /// Destination address (defaults to the agent's payout wallet)
        #[arg(short, long)]
        destination: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{}/status", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Withdraw {
            strategy,
            amount,
            destination,
        } => {
            if let Err(e) = strategy.parse::<WithdrawStrategy>() {
                let labels: Vec<&str> = WithdrawStrategy::ALL.iter().map(|s| s.as_str()).collect();
                eprintln!("Error: {}. Known strategies: {}", e, labels.join(", "));
                std::process::exit(2);
            }

            let mut body = json!({ "amountInNativeUnits": amount });
            if let Some(destination) = destination {
                body["destination"] = Value::String(destination);
            }

            let res = client
                .post(format!("{}/withdraw/{}", cli.url, strategy))
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: agent returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

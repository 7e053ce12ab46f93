use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "persons-cli")]
#[command(about = "Query a running significant persons service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:9000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every significant person
    List,
    /// Look up one person by id
    Get { id: String },
    /// Scrape the metrics endpoint
    Metrics {
        #[arg(long, default_value = "/metrics")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::List => {
            let res = client
                .get(format!("{}/significant_persons", base))
                .send()
                .await?;
            print_json(res).await?;
        }
        Commands::Get { id } => {
            let res = client
                .get(format!("{}/significant_persons", base))
                .query(&[("ID", id.as_str())])
                .send()
                .await?;
            print_json(res).await?;
        }
        Commands::Metrics { path } => {
            let res = client.get(format!("{}{}", base, path)).send().await?;
            let status = res.status();
            let text = res.text().await?;
            if !status.is_success() {
                eprintln!("Error: metrics endpoint returned status {}", status);
            }
            print!("{}", text);
        }
    }

    Ok(())
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let request_id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            if !text.is_empty() {
                eprintln!("Response: {}", text);
            }
        }
        return Ok(());
    }

    if let Some(id) = request_id {
        eprintln!("request id: {}", id);
    }

    let json: Value = res.json().await?;
    if json.is_null() {
        eprintln!("No such person");
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

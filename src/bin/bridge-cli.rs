use std::collections::BTreeMap;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "bridge-cli")]
#[command(about = "Management CLI for the Orderwise bridge", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8081")]
    url: String,

    #[arg(short, long, env = "BRIDGE_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show service status
    Status,
    /// Print all stored config values
    Config,
    /// Store config values given as key=value pairs
    Set {
        #[arg(required = true, value_parser = parse_pair)]
        pairs: Vec<(String, String)>,
    },
    /// Show recent audit entries
    Logs {
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
        /// Exact level, e.g. ERROR
        #[arg(long)]
        level: Option<String>,
        /// Exact event tag, e.g. ApiClientRetry
        #[arg(long)]
        event: Option<String>,
        /// Substring of the entry payload
        #[arg(long)]
        search: Option<String>,
    },
    /// Check the Orderwise API connection
    TestConnection,
    /// Post a test event to the external webhook
    SendTestPayload,
    /// Fetch new orders and forward them now
    SyncNow,
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match cli.command {
        Commands::Status => client.get(format!("{}/api/status", base)),
        Commands::Config => client.get(format!("{}/api/config", base)),
        Commands::Set { pairs } => {
            let values: BTreeMap<String, String> = pairs.into_iter().collect();
            client.post(format!("{}/api/config", base)).json(&values)
        }
        Commands::Logs { limit, level, event, search } => {
            let mut query = vec![("limit", limit.to_string())];
            query.extend(level.map(|v| ("level", v)));
            query.extend(event.map(|v| ("event", v)));
            query.extend(search.map(|v| ("search", v)));
            client.get(format!("{}/api/logs", base)).query(&query)
        }
        Commands::TestConnection => client.post(format!("{}/api/test-connection", base)),
        Commands::SendTestPayload => client.post(format!("{}/api/send-test-payload", base)),
        Commands::SyncNow => client.post(format!("{}/api/sync-now", base)),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "guard-cli")]
#[command(about = "Management CLI for circle-guard", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, env = "CIRCLE_GUARD_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show service status and monitor counters
    Status,
    /// List loaded rule sets
    RuleSets,
    /// Show monitor policies and tracked windows
    Monitor,
    /// Drop expired monitor windows
    Purge,
    /// Show the access mode and both address lists
    Access,
    /// Add an address to the blocklist
    Block { ip: String },
    /// Remove an address from the blocklist
    Unblock { ip: String },
    /// Add an address to the allowlist
    Allow { ip: String },
    /// Remove an address from the allowlist
    Disallow { ip: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", cli.key))?);

    let (method, path) = match &cli.command {
        Commands::Status => (Method::GET, "/admin/status".to_string()),
        Commands::RuleSets => (Method::GET, "/admin/rule-sets".to_string()),
        Commands::Monitor => (Method::GET, "/admin/monitor".to_string()),
        Commands::Purge => (Method::POST, "/admin/monitor/purge".to_string()),
        Commands::Access => (Method::GET, "/admin/access".to_string()),
        Commands::Block { ip } => (Method::PUT, format!("/admin/access/blocklist/{}", ip)),
        Commands::Unblock { ip } => (Method::DELETE, format!("/admin/access/blocklist/{}", ip)),
        Commands::Allow { ip } => (Method::PUT, format!("/admin/access/allowlist/{}", ip)),
        Commands::Disallow { ip } => (Method::DELETE, format!("/admin/access/allowlist/{}", ip)),
    };

    let res = client
        .request(method, format!("{}{}", cli.url.trim_end_matches('/'), path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

use clap::{Parser, Subcommand};
use serde_json::Value;

use bouncer_gateway::{RelayRequestBody, Version};

#[derive(Parser)]
#[command(name = "bouncer-cli")]
#[command(about = "Operator CLI for the Bouncer gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:13270")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the gateway is up and print its version
    Ping,
    /// Relay a GET through the gateway and print the result
    Fetch {
        /// Upstream URL to fetch
        target: String,

        /// Bearer token forwarded upstream
        #[arg(long)]
        token: Option<String>,

        /// Validator sent as If-None-Match
        #[arg(long)]
        etag: Option<String>,

        /// Caller descriptor appended to the User-Agent
        #[arg(long, default_value = "bouncer-cli")]
        descriptor: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Ping => {
            let version: Version = client
                .get(format!("{}/ping", cli.url))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            println!("gateway {version} at {}", cli.url);
        }
        Commands::Fetch {
            target,
            token,
            etag,
            descriptor,
        } => {
            let request = RelayRequestBody {
                url: target,
                method: "GET".to_string(),
                access_token: token.unwrap_or_default(),
                etag: etag.unwrap_or_default(),
                descriptor,
                ..RelayRequestBody::default()
            };
            let res = client.post(&cli.url).json(&request).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let header = |name: &str| {
        res.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let retries = header("x-retries-taken").unwrap_or_else(|| "-".to_string());
    let etag = header("etag");
    let gateway_error = header("x-bouncer-error");

    eprintln!("status: {status}, retries taken: {retries}");
    if let Some(etag) = etag {
        eprintln!("etag: {etag}");
    }
    if let Some(kind) = gateway_error {
        eprintln!("gateway error: {kind}");
    }

    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{text}"),
    }
    Ok(())
}

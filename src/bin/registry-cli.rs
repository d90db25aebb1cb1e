use clap::{Parser, Subcommand};
use reqwest::header::ACCEPT;
use serde_json::Value;

use router_registry::registry::{Operation, RegistrationRequest, Scope};

#[derive(Parser)]
#[command(name = "registry-cli")]
#[command(about = "Management CLI for the router registry", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:9000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ScopeArg {
    Container,
    Server,
}

impl From<ScopeArg> for Scope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Container => Scope::Container,
            ScopeArg::Server => Scope::Server,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current routing configuration
    List,
    /// Register an endpoint
    Add {
        #[arg(value_enum)]
        scope: ScopeArg,
        name: String,
        endpoint: String,
    },
    /// Unregister an endpoint
    Remove {
        #[arg(value_enum)]
        scope: ScopeArg,
        name: String,
        endpoint: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::List => {
            client
                .get(format!("{}/admin/list", base))
                .header(ACCEPT, "application/json")
                .send()
                .await?
        }
        Commands::Add { scope, name, endpoint } => {
            let request = RegistrationRequest::new(scope.into(), name, endpoint);
            send(&client, base, Operation::Add, &request).await?
        }
        Commands::Remove { scope, name, endpoint } => {
            let request = RegistrationRequest::new(scope.into(), name, endpoint);
            send(&client, base, Operation::Remove, &request).await?
        }
    };
    print_response(res).await
}

async fn send(
    client: &reqwest::Client,
    base: &str,
    operation: Operation,
    request: &RegistrationRequest,
) -> Result<reqwest::Response, reqwest::Error> {
    client
        .post(format!("{}{}", base, operation.path()))
        .header(ACCEPT, "application/json")
        .json(request)
        .send()
        .await
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

use anyhow::Result;
use clap::Parser;
use colored::*;

mod api_client;
mod output;
mod scenarios;
mod sse_client;

use api_client::ApiClient;
use output::print_test_summary;
use scenarios::TestUser;
use sse_client::Connection;

#[derive(Parser)]
#[command(name = "sse-test-client")]
#[command(about = "SSE Integration Testing Tool")]
struct Cli {
    /// Base URL of the backend (e.g., http://localhost:4000)
    #[arg(long)]
    base_url: String,

    /// User id for the first connection
    #[arg(long)]
    user1: String,

    /// User id for the second connection
    #[arg(long)]
    user2: String,

    /// Header the backend reads the user id from
    #[arg(long, default_value = "x-user-id")]
    identity_header: String,

    /// Secret sent with webhook calls, if the backend requires one
    #[arg(long, env = "WEBHOOK_SECRET")]
    webhook_secret: Option<String>,

    /// Test scenario to run
    #[arg(long, value_enum)]
    scenario: ScenarioChoice,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone)]
enum ScenarioChoice {
    /// Test basic SSE connection and the greeting event
    ConnectionTest,
    /// Test a webhook publish targeted at one user
    SendTo,
    /// Test a webhook publish broadcast to everyone
    Broadcast,
    /// Test that reconnecting replaces the older stream
    Replace,
    /// Run all tests
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    println!("{}", "=== SETUP PHASE ===".bright_white().bold());

    let user1 = TestUser {
        user_id: cli.user1.clone(),
        label: "User 1".to_string(),
    };
    let user2 = TestUser {
        user_id: cli.user2.clone(),
        label: "User 2".to_string(),
    };

    let client = reqwest::Client::new();
    let api_client = ApiClient::new(client, cli.base_url.clone(), cli.webhook_secret.clone());

    // Establish SSE connections
    println!("{} Establishing SSE connections...", "→".blue());
    let mut sse1 = Connection::establish(
        &cli.base_url,
        &cli.identity_header,
        &user1.user_id,
        user1.label.clone(),
    )
    .await?;

    let mut sse2 = Connection::establish(
        &cli.base_url,
        &cli.identity_header,
        &user2.user_id,
        user2.label.clone(),
    )
    .await?;

    println!("{} User 1 SSE connection established", "✓".green());
    println!("{} User 2 SSE connection established", "✓".green());

    // Run test scenarios
    println!("\n{}", "=== TEST PHASE ===".bright_white().bold());

    let mut results = Vec::new();

    // Every scenario starts after the greeting has been consumed.
    results.push(
        scenarios::test_connection(&user1, &user2, &api_client, &mut sse1, &mut sse2).await?,
    );

    match cli.scenario {
        ScenarioChoice::ConnectionTest => {}
        ScenarioChoice::SendTo => {
            results.push(
                scenarios::test_send_to(&user1, &user2, &api_client, &mut sse1, &mut sse2).await?,
            );
        }
        ScenarioChoice::Broadcast => {
            results.push(
                scenarios::test_broadcast(&user1, &user2, &api_client, &mut sse1, &mut sse2)
                    .await?,
            );
        }
        ScenarioChoice::Replace => {
            results.push(
                scenarios::test_replace(
                    &cli.base_url,
                    &cli.identity_header,
                    &user1,
                    &api_client,
                    &mut sse1,
                )
                .await?,
            );
        }
        ScenarioChoice::All => {
            results.push(
                scenarios::test_send_to(&user1, &user2, &api_client, &mut sse1, &mut sse2).await?,
            );
            results.push(
                scenarios::test_broadcast(&user1, &user2, &api_client, &mut sse1, &mut sse2)
                    .await?,
            );
            results.push(
                scenarios::test_replace(
                    &cli.base_url,
                    &cli.identity_header,
                    &user1,
                    &api_client,
                    &mut sse1,
                )
                .await?,
            );
        }
    }

    // Print summary
    println!("\n{}", "=== RESULTS ===".bright_white().bold());
    print_test_summary(&results);

    let all_passed = results.iter().all(|r| r.passed);

    if all_passed {
        println!("\n{}", "All tests passed! ✓".bright_green().bold());
    } else {
        println!("\n{}", "Some tests failed! ✗".bright_red().bold());
    }

    std::process::exit(if all_passed { 0 } else { 1 });
}

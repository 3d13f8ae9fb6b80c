//! CLI entry point for the usergraph demonstration.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use usergraph_store::{GraphClient, GraphConfig};

#[derive(Parser)]
#[command(name = "usergraph")]
#[command(about = "CRUD demonstration against a Neo4j user graph")]
struct Cli {
    /// Run the fixed create/list/update/delete demonstration sequence.
    #[arg(long)]
    demo: bool,

    /// Dump nodes of any label and exit.
    #[arg(long)]
    inspect: bool,

    /// Maximum nodes printed in --inspect mode.
    #[arg(long, default_value_t = 25)]
    limit: i64,

    /// Config file prefix (default: usergraph).
    #[arg(short, long, default_value = "usergraph")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let graph_config = load_graph_config(&cli.config);

    let mut client = GraphClient::connect(&graph_config).await?;

    // The connection is released on every exit path, success or failure.
    let outcome = if cli.demo {
        run_demo(&client).await
    } else if cli.inspect {
        run_inspect(&client, cli.limit).await
    } else {
        Err(anyhow::anyhow!(
            "Specify --demo (CRUD sequence) or --inspect (dump nodes)"
        ))
    };

    client.close();
    outcome
}

/// The fixed demonstration sequence: create two users, list, update one,
/// list, delete one, list.
async fn run_demo(client: &GraphClient) -> anyhow::Result<()> {
    println!("\n=== Creating users ===");
    let alice = client.create_user("Alice", 25).await?;
    println!("created {} (age {})", alice.name, alice.age);
    let bob = client.create_user("Bob", 30).await?;
    println!("created {} (age {})", bob.name, bob.age);

    println!("\n=== All users ===");
    print_users(client).await?;

    println!("\n=== Updating Alice's age ===");
    match client.update_user_age("Alice", 26).await? {
        Some(user) => println!("updated {} (age {})", user.name, user.age),
        None => println!("no user named Alice"),
    }
    print_users(client).await?;

    println!("\n=== Deleting Bob ===");
    let deleted = client.delete_user("Bob").await?;
    println!("deleted {deleted} user(s)");
    print_users(client).await?;

    tracing::info!("Demo sequence complete");
    Ok(())
}

async fn print_users(client: &GraphClient) -> anyhow::Result<()> {
    for user in client.list_users().await? {
        println!("name: {}, age: {}", user.name, user.age);
    }
    Ok(())
}

/// Ad hoc dump: up to `limit` nodes of any label, one per line.
async fn run_inspect(client: &GraphClient, limit: i64) -> anyhow::Result<()> {
    for node in client.dump_nodes(limit).await? {
        println!("(:{}) {}", node.labels.join(":"), node.properties);
    }
    Ok(())
}

fn load_graph_config(file_prefix: &str) -> GraphConfig {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("USERGRAPH")
                .separator("__")
                .try_parsing(true),
        )
        .build();

    match cfg {
        Ok(c) => match c.get::<GraphConfig>("neo4j") {
            Ok(graph_config) => graph_config,
            Err(_) => GraphConfig::default(),
        },
        Err(_) => GraphConfig::default(),
    }
}

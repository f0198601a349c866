//! Quarry CLI - Build queries from the command line and inspect them

mod args;

use std::sync::Arc;

use anyhow::{Context, Result};
use quarry_query::{MemoryExecutor, QueryConfig, SearchQuery, TracingListener};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::args::QueryArgs;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("quarry=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    let command = &args[1];

    match command.as_str() {
        "help" | "--help" | "-h" => print_help(),
        "body" => {
            let query_args = QueryArgs::parse(&args[2..])?;
            print_body(&query_args)?;
        }
        "replay" => {
            if args.len() < 3 {
                eprintln!("Usage: quarry-cli replay <response.json> [OPTIONS]");
                return Ok(());
            }
            let query_args = QueryArgs::parse(&args[3..])?;
            replay(&args[2], &query_args).await?;
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_help();
        }
    }

    Ok(())
}

fn print_help() {
    println!(
        r#"Quarry CLI - Search query builder

USAGE:
    quarry-cli <COMMAND> [OPTIONS]

COMMANDS:
    help                        Show this help message
    body                        Print the compiled request
    replay <response.json>      Run the query against a saved response

OPTIONS:
    --index <NAME>              Index to search (default: $QUARRY_INDEX)
    --limit <N>                 Maximum number of hits
    --offset <N>                Hits to skip
    --sort <FIELD[:asc|desc]>   Sort field, repeatable
    --select <F1,F2>            Source fields to return
    --exclude <F1,F2>           Source fields to leave out
    --where <FIELD> <OP> [VALUE]
                                Add a condition, repeatable. FIELD may be a
                                comma-separated list for match/not-match.
                                OP: eq not in not-in between not-between
                                    gte gt lte lt match not-match
                                    exists not-exists
                                Lists are comma-separated, ranges are MIN..MAX.

EXAMPLES:
    quarry-cli body --index posts --where channel in 1,2,3 --where title match alice
    quarry-cli body --where publicDate between 2017-01-01..2017-01-31 --limit 10
    quarry-cli replay ./response.json --where title,body match alice
"#
    );
}

fn build_query(executor: Arc<MemoryExecutor>, query_args: &QueryArgs) -> Result<SearchQuery> {
    let mut config = QueryConfig::default();
    if let Ok(index) = std::env::var("QUARRY_INDEX") {
        config = config.with_index(index);
    }

    let mut query = SearchQuery::with_config(executor, config);
    query_args.apply(&mut query)?;
    Ok(query)
}

fn print_body(query_args: &QueryArgs) -> Result<()> {
    let executor = Arc::new(MemoryExecutor::responding(Value::Null));
    let query = build_query(executor, query_args)?;
    println!("{}", serde_json::to_string_pretty(&query.to_request())?);
    Ok(())
}

async fn replay(path: &str, query_args: &QueryArgs) -> Result<()> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    let response: Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path))?;

    let executor = Arc::new(MemoryExecutor::responding(response));
    let mut query = build_query(executor, query_args)?;
    query.add_listener(Arc::new(TracingListener::new("replay")));

    let response = query.fetch_all().await?;
    info!("Replayed {} ({} hits)", path, response.hits().len());
    match response.total() {
        Some(total) => println!("Total: {}", total),
        None => println!("Total: unknown"),
    }
    for hit in response.hits() {
        println!("{}", serde_json::to_string(hit)?);
    }
    Ok(())
}

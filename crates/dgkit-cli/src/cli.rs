use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dgkit")]
#[command(about = "dgkit CLI: publish schemas to and issue tokens for a Dgraph server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (defaults to ./dgkit.toml when present)
    #[arg(short, long, global = true, env = "DGKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Server URL without port (overrides the settings file)
    #[arg(short, long, global = true, env = "DGKIT_URL")]
    pub url: Option<String>,

    /// Server port (overrides the settings file)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Issue an access token for a claims value
    Token(TokenArgs),
    /// Verify a token and print its payload
    Decode(DecodeArgs),
    /// Show or publish the GraphQL schema
    Schema(SchemaArgs),
    /// Drop all data, keeping the schema
    DropData(DropDataArgs),
    /// Run a GraphQL query as a given claims value
    Query(QueryArgs),
}

#[derive(clap::Args)]
pub struct TokenArgs {
    /// Claims value embedded in the token
    pub claims: String,
}

#[derive(clap::Args)]
pub struct DecodeArgs {
    /// Token to verify
    pub token: String,
}

#[derive(clap::Args)]
pub struct SchemaArgs {
    #[command(subcommand)]
    pub command: SchemaCommands,
}

#[derive(Subcommand)]
pub enum SchemaCommands {
    /// Print the assembled schema, footer included
    Show,
    /// Publish the schema, waiting while the server lazy-loads
    Push,
}

#[derive(clap::Args)]
pub struct DropDataArgs {
    /// Confirm dropping all data
    #[arg(long)]
    pub yes: bool,
}

#[derive(clap::Args)]
pub struct QueryArgs {
    /// Claims value the query runs as
    #[arg(long)]
    pub claims: String,
    /// Path to the query (reads from stdin if omitted)
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Query variables as a JSON object
    #[arg(long)]
    pub variables: Option<String>,
}

mod cli;
mod commands;
mod output;
mod settings;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands, SchemaCommands};
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    dgkit::observability::init_tracing_with_level(&cli.log_level);

    let config = settings::resolve_config(&cli)?;

    match &cli.command {
        Commands::Token(args) => commands::token::issue(&config, &args.claims)?,
        Commands::Decode(args) => commands::token::decode(&config, &args.token)?,
        Commands::Schema(args) => match &args.command {
            SchemaCommands::Show => commands::schema::show(&config).await?,
            SchemaCommands::Push => commands::schema::push(&config).await?,
        },
        Commands::DropData(args) => commands::data::drop_data(&config, args.yes).await?,
        Commands::Query(args) => commands::query::query(&config, args).await?,
    }

    Ok(())
}

use anyhow::Result;
use colored::Colorize;
use dgkit::{AdminClient, Config};

use crate::output::print_success;

pub async fn show(config: &Config) -> Result<()> {
    let schema = AdminClient::new(config.clone()).load_schema_text().await?;
    println!("{schema}");
    Ok(())
}

pub async fn push(config: &Config) -> Result<()> {
    let report = AdminClient::new(config.clone()).publish_schema().await?;
    print_success(&format!(
        "Schema published to {} after {} attempt(s)",
        config.admin_url().cyan(),
        report.attempts
    ));
    Ok(())
}

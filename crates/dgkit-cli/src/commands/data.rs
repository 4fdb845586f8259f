use anyhow::Result;
use colored::Colorize;
use dgkit::Config;

use crate::output::print_success;

pub async fn drop_data(config: &Config, confirmed: bool) -> Result<()> {
    if !confirmed {
        anyhow::bail!(
            "Refusing to drop all data on {} without --yes",
            config.base_url()
        );
    }
    dgkit::drop_data(config).await?;
    print_success(&format!("Dropped all data on {}", config.base_url().cyan()));
    Ok(())
}

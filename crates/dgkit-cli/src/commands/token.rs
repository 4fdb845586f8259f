use anyhow::{Context, Result};
use colored::Colorize;
use dgkit::Config;
use dgkit::token::claims_value;
use serde_json::Value;

use crate::output::print_json;

pub fn issue(config: &Config, claims: &str) -> Result<()> {
    let token = dgkit::token(claims, config).context("Failed to issue token")?;
    println!("{token}");
    Ok(())
}

pub fn decode(config: &Config, token: &str) -> Result<()> {
    let payload = dgkit::decode_token(token, config).context("Invalid token")?;
    match claims_value(&payload, config) {
        Some(claims) => eprintln!("{}: {}", config.claims.cyan(), claims),
        None => eprintln!("{} no {} claim", "!".yellow(), config.claims.cyan()),
    }
    print_json(&Value::Object(payload));
    Ok(())
}

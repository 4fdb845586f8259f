use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use dgkit::Config;
use serde_json::Value;

use crate::cli::QueryArgs;
use crate::output::print_json;

fn read_query(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display())),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn parse_variables(raw: Option<&str>) -> Result<Value> {
    let Some(raw) = raw else {
        return Ok(Value::Object(Default::default()));
    };
    let value: Value = serde_json::from_str(raw).context("Invalid JSON in --variables")?;
    if !value.is_object() {
        anyhow::bail!("--variables must be a JSON object");
    }
    Ok(value)
}

pub async fn query(config: &Config, args: &QueryArgs) -> Result<()> {
    let query = read_query(args.file.as_deref())?;
    let variables = parse_variables(args.variables.as_deref())?;

    let client = dgkit::client(&args.claims, config)?;
    let data: Value = client.request(&query, variables).await?;
    print_json(&data);
    Ok(())
}

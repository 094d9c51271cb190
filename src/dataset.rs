use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;

use crate::article::Article;

/// Reads a dataset file holding one article object or an array of them.
pub fn load_articles(path: impl AsRef<Path>) -> Result<Vec<Article>> {
    let path = path.as_ref();
    tracing::info!("Reading articles from {}", path.display());

    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset file {}", path.display()))?;
    let articles = parse_articles(&data)
        .with_context(|| format!("Invalid dataset file {}", path.display()))?;

    tracing::info!("Found {} articles", articles.len());
    Ok(articles)
}

pub fn parse_articles(data: &str) -> Result<Vec<Article>> {
    let value: Value = serde_json::from_str(data).context("Invalid JSON format")?;

    let items = match value {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        other => bail!(
            "The JSON must be a list of objects or a single object, found {}",
            kind(&other)
        ),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            if !item.is_object() {
                bail!("Entry {} must be an object, found {}", idx, kind(&item));
            }
            serde_json::from_value(item).with_context(|| format!("Invalid article at entry {}", idx))
        })
        .collect()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

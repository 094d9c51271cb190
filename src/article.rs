use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::text::normalize;

/// An article as it appears in the dataset file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(rename = "tema", default, deserialize_with = "lenient_string")]
    pub topic: String,
    #[serde(rename = "palabras_clave", default, deserialize_with = "lenient_strings")]
    pub keywords: Vec<String>,
    #[serde(rename = "contenido", default, deserialize_with = "lenient_string")]
    pub content: String,
    #[serde(rename = "origen", default, deserialize_with = "lenient_string")]
    pub source: String,
}

/// An article with its normalized matching fields attached.
///
/// Only [`preprocess`] builds these, so the normalized fields always derive
/// from the raw ones.
#[derive(Debug, Clone)]
pub struct IndexedArticle {
    pub article: Article,
    topic_norm: String,
    keywords_norm: Vec<String>,
    content_norm: String,
}

impl IndexedArticle {
    fn new(article: Article) -> Self {
        let topic_norm = normalize(&article.topic);
        let keywords_norm = article.keywords.iter().map(|k| normalize(k)).collect();
        let content_norm = normalize(&article.content);
        Self {
            article,
            topic_norm,
            keywords_norm,
            content_norm,
        }
    }

    pub fn topic_norm(&self) -> &str {
        &self.topic_norm
    }

    /// Parallel to `article.keywords`.
    pub fn keywords_norm(&self) -> &[String] {
        &self.keywords_norm
    }

    pub fn content_norm(&self) -> &str {
        &self.content_norm
    }
}

/// Attaches normalized fields to every article.
pub fn preprocess<I>(articles: I) -> Vec<IndexedArticle>
where
    I: IntoIterator<Item = Article>,
{
    articles.into_iter().map(IndexedArticle::new).collect()
}

/// Numbers and booleans keep their text; null, arrays and objects become "".
fn coerce_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(coerce_text(Value::deserialize(deserializer)?))
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let keywords = match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().map(coerce_text).collect(),
        Value::Null => Vec::new(),
        // A lone keyword given as plain text
        other => {
            let text = coerce_text(other);
            if text.is_empty() {
                Vec::new()
            } else {
                vec![text]
            }
        }
    };
    Ok(keywords)
}

use askama::Template;

use crate::highlight::highlight_html;
use crate::search::SearchHit;
use crate::text::tokenize;

/// Keyword badges shown per card.
const MAX_BADGES: usize = 10;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub query: &'a str,
    pub mode: &'a str,
    pub debounce_ms: u64,
    pub results: ResultsTemplate,
}

#[derive(Template)]
#[template(path = "results.html")]
pub struct ResultsTemplate {
    pub status: String,
    pub searched: bool,
    pub cards: Vec<ResultCard>,
}

#[derive(Debug, Clone)]
pub struct ResultCard {
    pub title: String,
    pub subtitle: String,
    pub badges: Vec<String>,
    pub has_match: bool,
    pub matched_keyword: String,
    pub score: u32,
    /// Escaped content with `<mark>` highlights.
    pub body_html: String,
}

impl ResultsTemplate {
    /// Nothing searched yet.
    pub fn idle() -> Self {
        Self {
            status: "Escribe para buscar…".to_string(),
            searched: false,
            cards: Vec::new(),
        }
    }

    pub fn from_hits(hits: &[SearchHit], query: &str) -> Self {
        let tokens = tokenize(query);
        let cards = hits
            .iter()
            .map(|hit| ResultCard {
                title: hit.topic.clone(),
                subtitle: format!("{} • {}", hit.topic, hit.origin.as_str()),
                badges: hit.keywords.iter().take(MAX_BADGES).cloned().collect(),
                has_match: hit.matched_keyword.is_some(),
                matched_keyword: hit.matched_keyword.clone().unwrap_or_default(),
                score: hit.score,
                body_html: highlight_html(&hit.fragment, &tokens),
            })
            .collect();

        Self {
            status: format!("{} resultados", hits.len()),
            searched: true,
            cards,
        }
    }
}

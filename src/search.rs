use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;

use crate::article::{preprocess, Article, IndexedArticle};
use crate::text::{normalize, tokenize};

/// Queries shorter than this (after normalization) are not searched.
pub const MIN_QUERY_LEN: usize = 2;

/// Distinct `(query, mode, version)` keys kept in the result cache.
pub const CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(64) {
    Some(n) => n,
    None => panic!("cache capacity must be non-zero"),
};

const TOPIC_BASE: u32 = 40;
const TOPIC_PER_HIT: u32 = 4;
const KEYWORD_BASE: u32 = 28;
const KEYWORD_PER_HIT: u32 = 3;
const KEYWORD_MATCH_CAP: usize = 4;
const CONTENT_BASE: u32 = 18;

/// Which article fields a search looks at. Content is always searched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "tema")]
    Topic,
    #[serde(rename = "palabras")]
    Keywords,
    #[default]
    #[serde(rename = "ambos")]
    Both,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Topic, Mode::Keywords, Mode::Both];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Topic => "tema",
            Mode::Keywords => "palabras",
            Mode::Both => "ambos",
        }
    }

    fn searches_topic(self) -> bool {
        matches!(self, Mode::Topic | Mode::Both)
    }

    fn searches_keywords(self) -> bool {
        matches!(self, Mode::Keywords | Mode::Both)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown search mode '{0}' (expected tema, palabras or ambos)")]
pub struct ParseModeError(pub String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| ParseModeError(s.to_string()))
    }
}

/// The article field that produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    #[serde(rename = "tema")]
    Topic,
    #[serde(rename = "palabras_clave")]
    Keywords,
    #[serde(rename = "contenido")]
    Content,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Topic => "tema",
            Origin::Keywords => "palabras_clave",
            Origin::Content => "contenido",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub score: u32,
    #[serde(rename = "origen")]
    pub origin: Origin,
    #[serde(rename = "tema")]
    pub topic: String,
    #[serde(rename = "palabras_clave")]
    pub keywords: Vec<String>,
    /// Full article content, never truncated.
    #[serde(rename = "fragmento")]
    pub fragment: String,
    /// Raw text of the best matching keyword; only set for keyword hits.
    #[serde(rename = "coincidencia", skip_serializing_if = "Option::is_none")]
    pub matched_keyword: Option<String>,
}

impl SearchHit {
    fn new(article: &Article, origin: Origin, score: u32) -> Self {
        Self {
            score,
            origin,
            topic: article.topic.clone(),
            keywords: article.keywords.clone(),
            fragment: article.content.clone(),
            matched_keyword: None,
        }
    }
}

fn count_hits(tokens: &[String], haystack: &str) -> usize {
    tokens.iter().filter(|t| haystack.contains(t.as_str())).count()
}

/// Scores one article, emitting at most one hit per origin.
///
/// Tokens must already be normalized (see [`tokenize`]).
pub fn score_article(article: &IndexedArticle, tokens: &[String], mode: Mode) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    if tokens.is_empty() {
        return hits;
    }
    let raw = &article.article;

    if mode.searches_topic() {
        let topic_hits = count_hits(tokens, article.topic_norm());
        if topic_hits > 0 {
            let score = TOPIC_BASE + TOPIC_PER_HIT * topic_hits as u32;
            hits.push(SearchHit::new(raw, Origin::Topic, score));
        }
    }

    if mode.searches_keywords() {
        let mut matching = 0usize;
        // (index, hits); strict `>` keeps the first keyword on ties
        let mut best: Option<(usize, usize)> = None;
        for (idx, kw_norm) in article.keywords_norm().iter().enumerate() {
            let kw_hits = count_hits(tokens, kw_norm);
            if kw_hits == 0 {
                continue;
            }
            matching += 1;
            if best.map_or(true, |(_, top)| kw_hits > top) {
                best = Some((idx, kw_hits));
            }
        }
        if let Some((idx, top_hits)) = best {
            let score = KEYWORD_BASE
                + KEYWORD_PER_HIT * top_hits as u32
                + matching.min(KEYWORD_MATCH_CAP) as u32;
            let mut hit = SearchHit::new(raw, Origin::Keywords, score);
            hit.matched_keyword = raw.keywords.get(idx).cloned();
            hits.push(hit);
        }
    }

    if tokens.iter().any(|t| article.content_norm().contains(t.as_str())) {
        let score = CONTENT_BASE + tokens.len() as u32;
        hits.push(SearchHit::new(raw, Origin::Content, score));
    }

    hits
}

/// Scores every article, keeps the best hit per topic and sorts by score.
fn rank(articles: &[IndexedArticle], tokens: &[String], mode: Mode) -> Vec<SearchHit> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<SearchHit> = Vec::new();

    for article in articles {
        for hit in score_article(article, tokens, mode) {
            match slots.entry(hit.topic.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(merged.len());
                    merged.push(hit);
                }
                Entry::Occupied(slot) => {
                    let current = &mut merged[*slot.get()];
                    if hit.score > current.score {
                        *current = hit;
                    }
                }
            }
        }
    }

    // Stable: equal scores keep first-seen order.
    merged.sort_by(|a, b| b.score.cmp(&a.score));
    merged
}

/// Returns the normalized query, or `None` when it is too short to search.
fn gate_query(query: &str) -> Option<String> {
    let norm = normalize(query);
    (norm.chars().count() >= MIN_QUERY_LEN).then_some(norm)
}

type CacheKey = (String, Mode, u64);

/// The loaded article set, its normalized form and a cache of recent results.
///
/// Replacing the articles bumps [`SearchIndex::version`] and drops every
/// cached result.
pub struct SearchIndex {
    source: Arc<Vec<Article>>,
    articles: Vec<IndexedArticle>,
    version: u64,
    cache: LruCache<CacheKey, Vec<SearchHit>>,
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self {
            source: Arc::new(Vec::new()),
            articles: Vec::new(),
            version: 0,
            cache: LruCache::new(CACHE_CAPACITY),
        }
    }
}

impl fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchIndex")
            .field("articles", &self.articles.len())
            .field("version", &self.version)
            .field("cached_queries", &self.cache.len())
            .finish()
    }
}

impl SearchIndex {
    pub fn new(articles: impl Into<Arc<Vec<Article>>>) -> Self {
        let mut index = Self::default();
        index.reload(articles);
        index
    }

    /// Replaces the whole article set.
    pub fn reload(&mut self, articles: impl Into<Arc<Vec<Article>>>) {
        let source = articles.into();
        self.articles = preprocess(source.iter().cloned());
        self.source = source;
        self.version += 1;
        self.cache.clear();
        tracing::info!(
            "Loaded {} articles (dataset version {})",
            self.articles.len(),
            self.version
        );
    }

    /// Searches the loaded articles.
    pub fn search(&mut self, query: &str, mode: Mode) -> Vec<SearchHit> {
        match gate_query(query) {
            Some(norm) => self.search_normalized(norm, mode),
            None => Vec::new(),
        }
    }

    /// Searches `articles`, first reloading if they are not the collection
    /// currently loaded. Identity is by `Arc` pointer, not by content.
    pub fn search_all(
        &mut self,
        articles: &Arc<Vec<Article>>,
        query: &str,
        mode: Mode,
    ) -> Vec<SearchHit> {
        let Some(norm) = gate_query(query) else {
            return Vec::new();
        };
        if !Arc::ptr_eq(&self.source, articles) {
            self.reload(Arc::clone(articles));
        }
        self.search_normalized(norm, mode)
    }

    fn search_normalized(&mut self, norm: String, mode: Mode) -> Vec<SearchHit> {
        let tokens = tokenize(&norm);
        if tokens.is_empty() {
            tracing::debug!("Query '{}' has no word tokens", norm);
            return Vec::new();
        }

        let key = (norm, mode, self.version);
        if let Some(hits) = self.cache.get(&key) {
            tracing::debug!("Cache hit for query='{}' mode={}", key.0, mode);
            return hits.clone();
        }

        let hits = rank(&self.articles, &tokens, mode);
        tracing::debug!(
            "Scored query='{}' mode={}: {} results",
            key.0,
            mode,
            hits.len()
        );
        self.cache.put(key, hits.clone());
        hits
    }

    /// The collection currently loaded.
    pub fn articles(&self) -> &Arc<Vec<Article>> {
        &self.source
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn cached_queries(&self) -> usize {
        self.cache.len()
    }
}

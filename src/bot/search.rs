//! Tavily web search used as prompt grounding for question-shaped messages.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const SEARCH_URL: &str = "https://api.tavily.com/search";

/// Cap on the grounding text folded into a prompt.
const MAX_CONTEXT_CHARS: usize = 2000;

/// Turkish interrogatives; a match (or a trailing question mark) makes
/// the message question-shaped.
fn question_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(^|\s)(kim|kimdir|ne|nedir|nasıl|neden|niye|nerede|nereden|ne zaman|hangi|kaç)(\s|\?|$)")
            .expect("question regex must compile")
    })
}

/// True when the cleaned query looks like something worth searching for.
pub fn is_question(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }
    text.ends_with('?') || question_re().is_match(text)
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    content: String,
}

pub struct SearchClient {
    api_key: String,
    http: reqwest::Client,
}

impl SearchClient {
    pub fn new(api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .expect("Failed to build HTTP client");
        Self { api_key, http }
    }

    /// One search call; result contents concatenated and clipped.
    pub async fn search(&self, query: &str) -> Result<String, String> {
        let request = SearchRequest { api_key: &self.api_key, query };

        let response = self
            .http
            .post(SEARCH_URL)
            .json(&request)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("search API status {}", response.status()));
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| e.to_string())?;

        let combined = parsed
            .results
            .iter()
            .map(|r| r.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        if combined.is_empty() {
            return Err("no search results".to_string());
        }

        if combined.chars().count() > MAX_CONTEXT_CHARS {
            Ok(combined.chars().take(MAX_CONTEXT_CHARS).collect())
        } else {
            Ok(combined)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrogative_keywords_match() {
        assert!(is_question("dolar ne kadar"));
        assert!(is_question("bugün hava nasıl olacak"));
        assert!(is_question("maç ne zaman başlıyor"));
        assert!(is_question("Kim kazandı dün"));
    }

    #[test]
    fn test_question_mark_matches() {
        assert!(is_question("yarın gelecek misin?"));
    }

    #[test]
    fn test_statements_do_not_match() {
        assert!(!is_question("bugün çok yoruldum"));
        assert!(!is_question("selam millet"));
        assert!(!is_question(""));
    }

    #[test]
    fn test_keyword_requires_word_boundary() {
        // "nedir" embedded in another word should not count
        assert!(!is_question("bahanedirenci arttı"));
    }

    #[test]
    fn test_response_parses_and_combines() {
        let body = r#"{"results":[{"content":"birinci","url":"u"},{"content":"ikinci","url":"v"}]}"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        let combined = parsed.results.iter().map(|r| r.content.as_str()).collect::<Vec<_>>().join("\n");
        assert_eq!(combined, "birinci\nikinci");
    }

    #[test]
    fn test_missing_results_field_is_empty() {
        let parsed: SearchResponse = serde_json::from_str(r#"{"answer":null}"#).unwrap();
        assert!(parsed.results.is_empty());
    }
}

//! Joke and quote fetchers with embedded fallbacks.
//!
//! These never fail: when the public API is down, a random entry from
//! the static list goes out instead.

use rand::seq::SliceRandom;
use serde::Deserialize;
use tracing::warn;

const JOKE_URL: &str = "https://v2.jokeapi.dev/joke/Any?type=single&safe-mode";
const QUOTE_URL: &str = "https://zenquotes.io/api/random";

static FALLBACK_JOKES: &[&str] = &[
    "Temel bilgisayar almış, virüs bulaşmasın diye poşetten çıkarmıyormuş.",
    "Adamın biri fırına girmiş: \"Ekmek taze mi?\" \"Dün gecedenberi bekliyor, daha çocuk.\"",
    "İki balık karşılaşmış, biri ötekine: \"Sudan konuları bırak artık.\"",
    "Nasreddin Hoca'ya sormuşlar: \"Dünyanın merkezi neresi?\" \"Eşeğimin bastığı yer, inanmazsan ölç.\"",
];

static FALLBACK_QUOTES: &[&str] = &[
    "Hayatta en hakiki mürşit ilimdir. — Mustafa Kemal Atatürk",
    "Bir insanın aklı başına devlet kuşu konunca değil, devlet kuşu uçunca gelir. — Anonim",
    "Ne kadar bilirsen bil, söylediklerin karşındakinin anladığı kadardır. — Mevlâna",
    "Ayinesi iştir kişinin lafa bakılmaz. — Ziya Paşa",
];

#[derive(Deserialize)]
struct JokeResponse {
    joke: Option<String>,
}

#[derive(Deserialize)]
struct QuoteEntry {
    q: String,
    a: String,
}

pub struct FunClient {
    http: reqwest::Client,
}

impl FunClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");
        Self { http }
    }

    pub async fn joke(&self) -> String {
        match self.fetch_joke().await {
            Ok(joke) => joke,
            Err(e) => {
                warn!("Joke fetch failed, using fallback: {e}");
                pick(FALLBACK_JOKES)
            }
        }
    }

    pub async fn quote(&self) -> String {
        match self.fetch_quote().await {
            Ok(quote) => quote,
            Err(e) => {
                warn!("Quote fetch failed, using fallback: {e}");
                pick(FALLBACK_QUOTES)
            }
        }
    }

    async fn fetch_joke(&self) -> Result<String, String> {
        let response: JokeResponse = self
            .http
            .get(JOKE_URL)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .json()
            .await
            .map_err(|e| e.to_string())?;

        response.joke.ok_or_else(|| "no single-part joke in response".to_string())
    }

    async fn fetch_quote(&self) -> Result<String, String> {
        let response: Vec<QuoteEntry> = self
            .http
            .get(QUOTE_URL)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .json()
            .await
            .map_err(|e| e.to_string())?;

        response
            .first()
            .map(|entry| format!("{} — {}", entry.q, entry.a))
            .ok_or_else(|| "empty quote response".to_string())
    }
}

impl Default for FunClient {
    fn default() -> Self {
        Self::new()
    }
}

fn pick(list: &[&str]) -> String {
    list.choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("...")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_returns_a_list_entry() {
        let picked = pick(FALLBACK_JOKES);
        assert!(FALLBACK_JOKES.contains(&picked.as_str()));
    }

    #[test]
    fn test_joke_response_parses() {
        let body = r#"{"error":false,"category":"Misc","type":"single","joke":"bir şaka"}"#;
        let parsed: JokeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.joke.as_deref(), Some("bir şaka"));
    }

    #[test]
    fn test_twopart_joke_is_rejected() {
        // type=twopart has setup/delivery instead of a joke field
        let body = r#"{"error":false,"type":"twopart","setup":"a","delivery":"b"}"#;
        let parsed: JokeResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.joke.is_none());
    }

    #[test]
    fn test_quote_entry_parses() {
        let body = r#"[{"q":"bir söz","a":"biri","h":"<blockquote>..."}]"#;
        let parsed: Vec<QuoteEntry> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed[0].q, "bir söz");
        assert_eq!(parsed[0].a, "biri");
    }
}

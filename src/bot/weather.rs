//! Weather lookups via Open-Meteo.
//!
//! City resolution order: embedded coordinate table, fuzzy match against
//! that table (edit distance ≤ 2), then the geocoding API. The first two
//! never touch the network.

use serde::Deserialize;
use std::fmt;

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Edit distance at or below this resolves to a table entry.
const FUZZY_THRESHOLD: usize = 2;

/// (lookup key, display name, lat, lon)
static CITIES: &[(&str, &str, f64, f64)] = &[
    ("istanbul", "İstanbul", 41.01, 28.98),
    ("ankara", "Ankara", 39.93, 32.86),
    ("izmir", "İzmir", 38.42, 27.14),
    ("bursa", "Bursa", 40.19, 29.06),
    ("antalya", "Antalya", 36.90, 30.70),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCity {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug)]
pub enum ResolveError {
    /// Neither the table nor geocoding knows this name.
    NotFound(String),
    /// Geocoding call failed.
    Upstream(String),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "city not found: {name}"),
            Self::Upstream(e) => write!(f, "geocoding failed: {e}"),
        }
    }
}

/// Textbook Levenshtein distance over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Table lookup: exact key first, then closest fuzzy match within the
/// threshold. Pure; no network.
pub fn lookup_city(name: &str) -> Option<ResolvedCity> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    if let Some(&(_, display, lat, lon)) = CITIES.iter().find(|(key, ..)| *key == needle) {
        return Some(ResolvedCity { name: display.to_string(), lat, lon });
    }

    CITIES
        .iter()
        .map(|&(key, display, lat, lon)| (levenshtein(&needle, key), display, lat, lon))
        .filter(|(dist, ..)| *dist <= FUZZY_THRESHOLD)
        .min_by_key(|(dist, ..)| *dist)
        .map(|(_, display, lat, lon)| ResolvedCity { name: display.to_string(), lat, lon })
}

#[derive(Deserialize)]
struct GeoResponse {
    results: Option<Vec<GeoResult>>,
}

#[derive(Deserialize)]
struct GeoResult {
    name: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct CurrentResponse {
    current: CurrentBlock,
}

#[derive(Deserialize)]
struct CurrentBlock {
    temperature_2m: f64,
    apparent_temperature: f64,
    relative_humidity_2m: f64,
    wind_speed_10m: f64,
    weather_code: u8,
}

#[derive(Deserialize)]
struct ForecastResponse {
    daily: DailyBlock,
}

#[derive(Deserialize)]
struct DailyBlock {
    time: Vec<String>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    weather_code: Vec<u8>,
}

/// WMO weather codes, in Turkish.
fn describe_code(code: u8) -> &'static str {
    match code {
        0 => "açık",
        1..=2 => "az bulutlu",
        3 => "kapalı",
        45 | 48 => "sisli",
        51..=57 => "çiseliyor",
        61..=67 => "yağmurlu",
        71..=77 => "karlı",
        80..=82 => "sağanak",
        85 | 86 => "kar sağanağı",
        95..=99 => "fırtınalı",
        _ => "belirsiz",
    }
}

pub struct WeatherClient {
    http: reqwest::Client,
}

impl WeatherClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .expect("Failed to build HTTP client");
        Self { http }
    }

    /// Resolve a city name, table first, geocoding last.
    pub async fn resolve(&self, name: &str) -> Result<ResolvedCity, ResolveError> {
        if let Some(city) = lookup_city(name) {
            return Ok(city);
        }
        self.geocode(name).await
    }

    async fn geocode(&self, name: &str) -> Result<ResolvedCity, ResolveError> {
        let url = format!(
            "{}?name={}&count=1&language=tr",
            GEOCODING_URL,
            urlencoding::encode(name.trim())
        );

        let response: GeoResponse = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ResolveError::Upstream(e.to_string()))?
            .json()
            .await
            .map_err(|e| ResolveError::Upstream(e.to_string()))?;

        response
            .results
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .map(|r| ResolvedCity { name: r.name, lat: r.latitude, lon: r.longitude })
            .ok_or_else(|| ResolveError::NotFound(name.to_string()))
    }

    /// Current conditions, formatted for the chat.
    pub async fn current(&self, city: &ResolvedCity) -> Result<String, String> {
        let url = format!(
            "{}?latitude={:.2}&longitude={:.2}&current=temperature_2m,apparent_temperature,relative_humidity_2m,wind_speed_10m,weather_code",
            FORECAST_URL, city.lat, city.lon
        );

        let response: CurrentResponse = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .json()
            .await
            .map_err(|e| e.to_string())?;

        let c = response.current;
        Ok(format!(
            "{} şu an {} — {:.0}°C (hissedilen {:.0}°C), nem %{:.0}, rüzgar {:.0} km/s",
            city.name,
            describe_code(c.weather_code),
            c.temperature_2m,
            c.apparent_temperature,
            c.relative_humidity_2m,
            c.wind_speed_10m,
        ))
    }

    /// Five-day forecast, one line per day.
    pub async fn forecast(&self, city: &ResolvedCity) -> Result<String, String> {
        let url = format!(
            "{}?latitude={:.2}&longitude={:.2}&daily=temperature_2m_max,temperature_2m_min,weather_code&forecast_days=5",
            FORECAST_URL, city.lat, city.lon
        );

        let response: ForecastResponse = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .json()
            .await
            .map_err(|e| e.to_string())?;

        let d = response.daily;
        let mut lines = vec![format!("{} — 5 günlük tahmin:", city.name)];
        for i in 0..d.time.len().min(5) {
            lines.push(format!(
                "{}: {} {:.0}°C / {:.0}°C",
                d.time[i],
                describe_code(d.weather_code[i]),
                d.temperature_2m_min[i],
                d.temperature_2m_max[i],
            ));
        }
        Ok(lines.join("\n"))
    }
}

impl Default for WeatherClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Callback payload for the forecast button. Telegram caps payloads at
/// 64 bytes, so the name gets clipped.
pub fn callback_payload(city: &ResolvedCity) -> String {
    let name: String = city.name.chars().take(20).collect();
    format!("hava:{:.2}:{:.2}:{}", city.lat, city.lon, name)
}

pub fn parse_callback(data: &str) -> Option<ResolvedCity> {
    let rest = data.strip_prefix("hava:")?;
    let mut parts = rest.splitn(3, ':');
    let lat: f64 = parts.next()?.parse().ok()?;
    let lon: f64 = parts.next()?.parse().ok()?;
    let name = parts.next()?.to_string();
    Some(ResolvedCity { name, lat, lon })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_basics() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("istanbul", "istanbl"), 1);
    }

    #[test]
    fn test_known_city_resolves_from_table() {
        let city = lookup_city("istanbul").unwrap();
        assert_eq!(city.name, "İstanbul");
        assert_eq!(city.lat, 41.01);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(lookup_city("Ankara").unwrap().name, "Ankara");
        assert_eq!(lookup_city("ANKARA").unwrap().name, "Ankara");
    }

    #[test]
    fn test_close_misspelling_resolves_to_same_entry() {
        // Within edit distance 2 of "istanbul"
        assert_eq!(lookup_city("istanbl").unwrap(), lookup_city("istanbul").unwrap());
        assert_eq!(lookup_city("istambul").unwrap(), lookup_city("istanbul").unwrap());
        assert_eq!(lookup_city("ankaar").unwrap().name, "Ankara");
    }

    #[test]
    fn test_distant_name_misses_table() {
        assert!(lookup_city("londra").is_none());
        assert!(lookup_city("").is_none());
    }

    #[test]
    fn test_fuzzy_prefers_closest_entry() {
        // "izmi" is distance 1 from izmir, further from everything else
        assert_eq!(lookup_city("izmi").unwrap().name, "İzmir");
    }

    #[test]
    fn test_weather_code_descriptions() {
        assert_eq!(describe_code(0), "açık");
        assert_eq!(describe_code(63), "yağmurlu");
        assert_eq!(describe_code(96), "fırtınalı");
        assert_eq!(describe_code(200), "belirsiz");
    }

    #[test]
    fn test_callback_payload_round_trip() {
        let city = lookup_city("izmir").unwrap();
        let payload = callback_payload(&city);
        assert!(payload.len() <= 64);

        let parsed = parse_callback(&payload).unwrap();
        assert_eq!(parsed.name, "İzmir");
        assert_eq!(parsed.lat, 38.42);
        assert_eq!(parsed.lon, 27.14);
    }

    #[test]
    fn test_callback_payload_clips_long_names() {
        let city = ResolvedCity {
            name: "Ş".repeat(60),
            lat: 10.0,
            lon: 20.0,
        };
        assert!(callback_payload(&city).len() <= 64);
    }

    #[test]
    fn test_parse_callback_rejects_garbage() {
        assert!(parse_callback("hava:").is_none());
        assert!(parse_callback("baska:1:2:ad").is_none());
        assert!(parse_callback("hava:x:y:ad").is_none());
    }
}

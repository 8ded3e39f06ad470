use serde_json::Value;
use shopmatch_core::{
    Error, ProductSearchProvider, RawResult, Result, ResultKind, SearchQuery, SearchResponse,
};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Hard per-request cap. Callers may ask for less, never more.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_ENDPOINT: &str = "https://serpapi.com/search.json";

fn timeout_ms_from_query(q: &SearchQuery) -> u64 {
    q.timeout_ms
        .unwrap_or(DEFAULT_TIMEOUT_MS)
        .clamp(1, DEFAULT_TIMEOUT_MS)
}

fn non_empty_env(k: &str) -> Option<String> {
    std::env::var(k)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn serpapi_api_key_from_env() -> Option<String> {
    non_empty_env("SHOPMATCH_SERPAPI_API_KEY").or_else(|| non_empty_env("SERPAPI_API_KEY"))
}

fn serpapi_endpoint_from_env() -> Option<String> {
    non_empty_env("SHOPMATCH_SERPAPI_ENDPOINT")
}

pub fn country_from_env() -> String {
    non_empty_env("SHOPMATCH_COUNTRY").unwrap_or_else(|| "si".to_string())
}

pub fn language_from_env() -> String {
    non_empty_env("SHOPMATCH_LANGUAGE").unwrap_or_else(|| "sl".to_string())
}

/// Rewrite rule for a storefront domain that search engines index poorly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainFallback {
    pub from: String,
    pub to: String,
}

impl DomainFallback {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// `ikea.si` redirects to `ikea.com/si` and is rarely indexed under its own name.
pub fn default_domain_fallbacks() -> Vec<DomainFallback> {
    vec![DomainFallback::new("ikea.si", "ikea.com/si")]
}

/// Replace the first domain token that matches a fallback rule.
///
/// Matches `from`, `www.<from>`, `site:<from>` and `site:www.<from>` as whole
/// whitespace tokens (case-insensitive). Returns `None` when no rule applies.
pub fn rewrite_domain(query: &str, rules: &[DomainFallback]) -> Option<String> {
    let tokens: Vec<&str> = query.split_whitespace().collect();
    for rule in rules {
        let from = rule.from.to_ascii_lowercase();
        let mut hit = false;
        let rewritten: Vec<String> = tokens
            .iter()
            .map(|t| {
                if hit {
                    return t.to_string();
                }
                let lower = t.to_ascii_lowercase();
                let (prefix, rest) = match lower.strip_prefix("site:") {
                    Some(rest) => ("site:", rest),
                    None => ("", lower.as_str()),
                };
                let bare = rest.strip_prefix("www.").unwrap_or(rest);
                if bare == from {
                    hit = true;
                    format!("{prefix}{}", rule.to)
                } else {
                    t.to_string()
                }
            })
            .collect();
        if hit {
            return Some(rewritten.join(" "));
        }
    }
    None
}

#[derive(Debug, Clone)]
pub struct SerpApiProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    fallbacks: Vec<DomainFallback>,
}

impl SerpApiProvider {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            fallbacks: default_domain_fallbacks(),
        }
    }

    /// Fails with `NotConfigured` when no credential is set; checked once, here.
    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let api_key = serpapi_api_key_from_env().ok_or_else(|| {
            Error::NotConfigured(
                "missing SHOPMATCH_SERPAPI_API_KEY (or SERPAPI_API_KEY)".to_string(),
            )
        })?;
        let mut p = Self::new(client, api_key);
        if let Some(ep) = serpapi_endpoint_from_env() {
            p.endpoint = ep;
        }
        Ok(p)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_fallbacks(mut self, fallbacks: Vec<DomainFallback>) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    async fn fetch_once(&self, text: &str, q: &SearchQuery) -> Result<Vec<RawResult>> {
        let timeout_ms = timeout_ms_from_query(q);
        let timeout = Duration::from_millis(timeout_ms);

        let mut req = self.client.get(&self.endpoint).query(&[
            ("engine", "google"),
            ("q", text),
            ("api_key", self.api_key.as_str()),
        ]);
        if let Some(n) = q.max_results {
            req = req.query(&[("num", n.to_string())]);
        }
        if let Some(lang) = q.language.as_deref() {
            req = req.query(&[("hl", lang)]);
        }
        if let Some(country) = q.country.as_deref() {
            req = req.query(&[("gl", country)]);
        }

        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                Error::Timeout { timeout_ms }
            } else {
                Error::Provider(e.to_string())
            }
        };
        let fut = async {
            let resp = req.timeout(timeout).send().await.map_err(map_err)?;
            let status = resp.status();
            if !status.is_success() {
                return Err(Error::Provider(format!("serpapi search HTTP {status}")));
            }
            let body = resp.text().await.map_err(map_err)?;
            parse_serpapi_body(&body)
        };
        match tokio::time::timeout(timeout, fut).await {
            Ok(r) => r,
            Err(_) => Err(Error::Timeout { timeout_ms }),
        }
    }
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    match v.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn record(v: &Value, section: ResultKind) -> Option<RawResult> {
    // Links are copied verbatim; a record without one is dropped.
    let link = str_field(v, "link")
        .filter(|s| !s.trim().is_empty())
        .or_else(|| str_field(v, "product_link").filter(|s| !s.trim().is_empty()))?;
    Some(RawResult {
        title: str_field(v, "title").unwrap_or_default(),
        link,
        snippet: str_field(v, "snippet").unwrap_or_default(),
        price: str_field(v, "price"),
        image: str_field(v, "thumbnail").or_else(|| str_field(v, "image")),
        source: str_field(v, "source"),
        section,
    })
}

/// Defensive parse of a SerpApi Google response: organic results, then shopping results.
pub fn parse_serpapi_body(body: &str) -> Result<Vec<RawResult>> {
    let v: Value = serde_json::from_str(body)
        .map_err(|e| Error::Provider(format!("serpapi response is not JSON: {e}")))?;
    if let Some(err) = v.get("error").and_then(Value::as_str) {
        if err.to_ascii_lowercase().contains("hasn't returned any results") {
            return Ok(Vec::new());
        }
        return Err(Error::Provider(format!("serpapi error: {err}")));
    }
    let mut out = Vec::new();
    for (key, section) in [
        ("organic_results", ResultKind::Organic),
        ("shopping_results", ResultKind::Shopping),
    ] {
        if let Some(items) = v.get(key).and_then(Value::as_array) {
            out.extend(items.iter().filter_map(|it| record(it, section)));
        }
    }
    Ok(out)
}

#[async_trait::async_trait]
impl ProductSearchProvider for SerpApiProvider {
    fn name(&self) -> &'static str {
        "serpapi"
    }

    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse> {
        if q.query.trim().is_empty() {
            return Err(Error::InvalidInput("query must be non-empty".to_string()));
        }
        let t0 = Instant::now();
        let mut attempts = 1u32;
        let mut effective_query = q.query.clone();
        let mut results = self.fetch_once(&q.query, q).await?;

        // One-shot query rewrite, never a retry loop.
        if results.is_empty() {
            if let Some(rewritten) = rewrite_domain(&q.query, &self.fallbacks) {
                tracing::debug!(from = %q.query, to = %rewritten, "domain fallback");
                attempts += 1;
                results = self.fetch_once(&rewritten, q).await?;
                effective_query = rewritten;
            }
        }

        let mut timings_ms = BTreeMap::new();
        timings_ms.insert("search".to_string(), t0.elapsed().as_millis());

        Ok(SearchResponse {
            results,
            provider: "serpapi".to_string(),
            effective_query,
            attempts,
            timings_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnvGuard {
        k: &'static str,
        prev: Option<String>,
    }

    impl EnvGuard {
        fn set(k: &'static str, v: &str) -> Self {
            let prev = std::env::var(k).ok();
            std::env::set_var(k, v);
            Self { k, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(v) = self.prev.take() {
                std::env::set_var(self.k, v);
            } else {
                std::env::remove_var(self.k);
            }
        }
    }

    #[test]
    fn blank_api_keys_are_not_configured() {
        let _g1 = EnvGuard::set("SHOPMATCH_SERPAPI_API_KEY", "   ");
        let _g2 = EnvGuard::set("SERPAPI_API_KEY", "");
        assert!(serpapi_api_key_from_env().is_none());
        let err = SerpApiProvider::from_env(reqwest::Client::new()).unwrap_err();
        assert!(matches!(err, Error::NotConfigured(_)), "{err:?}");
    }

    #[test]
    fn parses_organic_and_shopping_sections() {
        let js = r#"
        {
          "organic_results": [
            {"title": "Stol Oslo", "link": "https://shop.si/p/1", "snippet": "Bež"},
            {"title": "No link"},
            {"title": "Empty link", "link": "  "}
          ],
          "shopping_results": [
            {"title": "Stol", "product_link": "https://shop.si/p/2", "price": "89,99 €",
             "thumbnail": "https://img/1.jpg", "source": "Shop"},
            {"title": 42, "link": "https://shop.si/p/3", "price": 19.5}
          ]
        }
        "#;
        let rs = parse_serpapi_body(js).unwrap();
        assert_eq!(rs.len(), 3);
        assert_eq!(rs[0].section, ResultKind::Organic);
        assert_eq!(rs[0].snippet, "Bež");
        assert_eq!(rs[1].section, ResultKind::Shopping);
        assert_eq!(rs[1].link, "https://shop.si/p/2");
        assert_eq!(rs[1].price.as_deref(), Some("89,99 €"));
        assert_eq!(rs[1].image.as_deref(), Some("https://img/1.jpg"));
        // Malformed fields default instead of failing the response.
        assert_eq!(rs[2].title, "42");
        assert_eq!(rs[2].snippet, "");
        assert_eq!(rs[2].price.as_deref(), Some("19.5"));
    }

    #[test]
    fn no_results_error_is_empty_other_errors_fail() {
        let empty = r#"{"error": "Google hasn't returned any results for this query."}"#;
        assert!(parse_serpapi_body(empty).unwrap().is_empty());
        let bad = r#"{"error": "Invalid API key."}"#;
        assert!(matches!(parse_serpapi_body(bad), Err(Error::Provider(_))));
        assert!(matches!(parse_serpapi_body("<html>"), Err(Error::Provider(_))));
    }

    #[test]
    fn missing_sections_parse_as_empty() {
        assert!(parse_serpapi_body("{}").unwrap().is_empty());
        assert!(parse_serpapi_body(r#"{"organic_results": null}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn rewrite_domain_handles_site_and_www_forms() {
        let rules = default_domain_fallbacks();
        assert_eq!(
            rewrite_domain("jedilni stol site:ikea.si", &rules).as_deref(),
            Some("jedilni stol site:ikea.com/si")
        );
        assert_eq!(
            rewrite_domain("stol site:WWW.IKEA.SI", &rules).as_deref(),
            Some("stol site:ikea.com/si")
        );
        assert_eq!(
            rewrite_domain("ikea.si stol", &rules).as_deref(),
            Some("ikea.com/si stol")
        );
        assert_eq!(rewrite_domain("stol site:lesnina.si", &rules), None);
        assert_eq!(rewrite_domain("ikea.sir stol", &rules), None);
    }

    #[tokio::test]
    async fn blank_query_is_invalid_input_without_a_request() {
        // Unroutable endpoint: reaching the network would surface as a provider error.
        let p = SerpApiProvider::new(reqwest::Client::new(), "k")
            .with_endpoint("http://127.0.0.1:9/search.json");
        let err = p.search(&SearchQuery::new("   ")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)), "{err:?}");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn timeout_is_capped_at_ten_seconds() {
        let mut q = SearchQuery::new("stol");
        assert_eq!(timeout_ms_from_query(&q), DEFAULT_TIMEOUT_MS);
        q.timeout_ms = Some(60_000);
        assert_eq!(timeout_ms_from_query(&q), DEFAULT_TIMEOUT_MS);
        q.timeout_ms = Some(250);
        assert_eq!(timeout_ms_from_query(&q), 250);
    }
}

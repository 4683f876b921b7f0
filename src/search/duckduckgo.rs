//! DuckDuckGo search through its HTML endpoint.

use super::{SearchHit, WebSearch};
use crate::config::SearchSettings;
use crate::error::{CriticError, Result};
use crate::gemini::create_http_client_with_timeout;
use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// DuckDuckGo web search.
pub struct DuckDuckGo {
    http: reqwest::Client,
    region: String,
    parser: ResultParser,
}

impl DuckDuckGo {
    pub fn new(settings: &SearchSettings) -> Result<Self> {
        Ok(Self {
            http: create_http_client_with_timeout(Duration::from_secs(settings.timeout_secs))?,
            region: settings.region.clone(),
            parser: ResultParser::new()?,
        })
    }
}

#[async_trait]
impl WebSearch for DuckDuckGo {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let response = self
            .http
            .get(ENDPOINT)
            .query(&[("q", query), ("kl", self.region.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CriticError::Search(format!(
                "DuckDuckGo returned {}",
                response.status()
            )));
        }

        let html = response.text().await?;
        let hits = self.parser.parse(&html, max_results);
        debug!("DuckDuckGo returned {} results", hits.len());
        Ok(hits)
    }
}

/// Extracts results from DuckDuckGo's HTML result page.
struct ResultParser {
    title: Regex,
    href: Regex,
    snippet: Regex,
    tag: Regex,
    entity: Regex,
}

impl ResultParser {
    fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| CriticError::Search(format!("Invalid pattern: {}", e)))
        };

        Ok(Self {
            title: compile(r#"(?s)<a([^>]*class="result__a"[^>]*)>(.*?)</a>"#)?,
            href: compile(r#"href="([^"]*)""#)?,
            snippet: compile(r#"(?s)<a[^>]*class="result__snippet"[^>]*>(.*?)</a>"#)?,
            tag: compile(r"<[^>]+>")?,
            entity: compile(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);")?,
        })
    }

    fn parse(&self, html: &str, max_results: usize) -> Vec<SearchHit> {
        let titles: Vec<_> = self.title.captures_iter(html).collect();
        let snippets: Vec<_> = self.snippet.captures_iter(html).collect();
        let mut hits = Vec::new();

        for (i, caps) in titles.iter().enumerate() {
            if hits.len() >= max_results {
                break;
            }

            let (Some(whole), Some(attrs), Some(inner)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };

            let Some(url) = self
                .href
                .captures(attrs.as_str())
                .and_then(|c| c.get(1))
                .and_then(|m| resolve_link(&self.decode_entities(m.as_str())))
            else {
                continue;
            };

            // The snippet belongs to this result if it appears before the next title
            let next_start = titles
                .get(i + 1)
                .and_then(|c| c.get(0))
                .map(|m| m.start())
                .unwrap_or(html.len());
            let snippet = snippets
                .iter()
                .filter_map(|c| c.get(1))
                .find(|m| m.start() > whole.end() && m.start() < next_start)
                .map(|m| self.clean(m.as_str()))
                .unwrap_or_default();

            hits.push(SearchHit {
                title: self.clean(inner.as_str()),
                url,
                snippet,
            });
        }

        hits
    }

    /// Decode numeric (`&#233;`, `&#xE9;`) and common named entities in one pass.
    /// Unknown or invalid entities are left as written.
    fn decode_entities(&self, text: &str) -> String {
        self.entity
            .replace_all(text, |caps: &regex::Captures| {
                let entity = &caps[1];
                let decoded = match entity.strip_prefix('#') {
                    Some(number) => {
                        let code = match number.strip_prefix(['x', 'X']) {
                            Some(hex) => u32::from_str_radix(hex, 16).ok(),
                            None => number.parse().ok(),
                        };
                        code.and_then(char::from_u32).map(String::from)
                    }
                    None => named_entity(entity).map(String::from),
                };
                decoded.unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    fn clean(&self, fragment: &str) -> String {
        let text = self.tag.replace_all(fragment, "");
        self.decode_entities(&text)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Unwrap DuckDuckGo redirect links and drop ad links.
fn resolve_link(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    let url = Url::parse(&absolute).ok()?;
    let is_ddg = url
        .host_str()
        .is_some_and(|h| h == "duckduckgo.com" || h.ends_with(".duckduckgo.com"));

    if !is_ddg {
        return Some(url.to_string());
    }

    if url.path() == "/l/" {
        return url
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned());
    }

    None
}

fn named_entity(name: &str) -> Option<&'static str> {
    let decoded = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => " ",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "hellip" => "\u{2026}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201C}",
        "rdquo" => "\u{201D}",
        "copy" => "\u{00A9}",
        _ => return None,
    };
    Some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<div class="result results_links results_links_deep web-result ">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fen.wikipedia.org%2Fwiki%2FChiaroscuro&amp;rut=abc">Chiaroscuro - <b>Wikipedia</b></a>
    </h2>
    <a class="result__snippet" href="//duckduckgo.com/l/?uddg=x">In art, <b>chiaroscuro</b> is the use of strong contrasts between light &amp; dark.</a>
  </div>
</div>
<div class="result results_links results_links_deep web-result result--ad">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="https://duckduckgo.com/y.js?ad_provider=x">Buy lamps</a>
    </h2>
  </div>
</div>
<div class="result results_links results_links_deep web-result ">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="https://www.example.com/rembrandt-lighting">Rembrandt lighting guide</a>
    </h2>
    <a class="result__snippet" href="https://www.example.com/rembrandt-lighting">A triangle of light on the cheek.</a>
  </div>
</div>
"#;

    #[test]
    fn test_parse_results() {
        let parser = ResultParser::new().unwrap();
        let hits = parser.parse(PAGE, 10);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Chiaroscuro - Wikipedia");
        assert_eq!(hits[0].url, "https://en.wikipedia.org/wiki/Chiaroscuro");
        assert_eq!(
            hits[0].snippet,
            "In art, chiaroscuro is the use of strong contrasts between light & dark."
        );
        assert_eq!(hits[1].url, "https://www.example.com/rembrandt-lighting");
        assert_eq!(hits[1].snippet, "A triangle of light on the cheek.");
    }

    #[test]
    fn test_parse_respects_max_results() {
        let parser = ResultParser::new().unwrap();
        assert_eq!(parser.parse(PAGE, 1).len(), 1);
        assert!(parser.parse("<html>no results</html>", 5).is_empty());
    }

    #[test]
    fn test_decode_entities() {
        let parser = ResultParser::new().unwrap();
        assert_eq!(
            parser.decode_entities("Caf&#233; &#xE9;t&#XE9; &#8217;s &lt;b&gt; &amp;amp;"),
            "Caf\u{e9} \u{e9}t\u{e9} \u{2019}s <b> &amp;"
        );
        assert_eq!(parser.decode_entities("&hellip; &mdash; &#39;x&#x27;"), "\u{2026} \u{2014} 'x'");
        // Not valid code points or unknown names
        assert_eq!(parser.decode_entities("&#xD800; &#1114112; &bogus;"), "&#xD800; &#1114112; &bogus;");
        assert_eq!(parser.decode_entities("AT&T; R&D"), "AT&T; R&D");
    }

    #[test]
    fn test_resolve_link() {
        assert_eq!(
            resolve_link("//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.org%2Fa%3Fb%3D1&rut=x")
                .as_deref(),
            Some("https://example.org/a?b=1")
        );
        assert_eq!(resolve_link("https://duckduckgo.com/y.js?ad=1"), None);
        assert_eq!(
            resolve_link("https://example.org/page").as_deref(),
            Some("https://example.org/page")
        );
    }
}

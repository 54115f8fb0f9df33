//! DuckDuckGo web search, resolving a query to result URLs.

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use dd_core::{run_blocking, Error, WebSearch};

use crate::HttpConfig;

const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

pub struct DuckDuckGoSearch {
    client: Client,
    endpoint: String,
}

impl Default for DuckDuckGoSearch {
    fn default() -> Self {
        Self::new(HttpConfig::default())
    }
}

impl DuckDuckGoSearch {
    pub fn new(config: HttpConfig) -> Self {
        Self {
            client: config.build_client(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Pull result URLs out of a DuckDuckGo HTML results page.
///
/// Ads (which redirect through duckduckgo.com itself) and non-http links are
/// dropped; duplicates keep their first position.
fn parse_results(body: &str, max_results: usize) -> Vec<String> {
    let doc = Html::parse_document(body);
    let (Ok(result_sel), Ok(link_sel)) = (Selector::parse(".result"), Selector::parse("a.result__a"))
    else {
        return Vec::new();
    };

    let mut urls: Vec<String> = Vec::new();
    for result in doc.select(&result_sel) {
        if urls.len() >= max_results {
            break;
        }
        let Some(href) = result
            .select(&link_sel)
            .next()
            .and_then(|el| el.value().attr("href"))
        else {
            continue;
        };
        let url = extract_ddg_url(href);
        let Ok(parsed) = Url::parse(&url) else {
            continue;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            continue;
        }
        if is_ad_redirect(&parsed) || urls.contains(&url) {
            continue;
        }
        urls.push(url);
    }
    urls
}

/// DDG wraps result URLs in redirect links; extract and decode the real URL.
fn extract_ddg_url(href: &str) -> String {
    if let Some(pos) = href.find("uddg=") {
        let start = pos + 5;
        let end = href[start..]
            .find('&')
            .map(|i| start + i)
            .unwrap_or(href.len());
        let encoded = &href[start..end];
        if !encoded.is_empty() {
            return percent_decode_str(encoded).decode_utf8_lossy().into_owned();
        }
    }
    if let Some(rest) = href.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    href.to_string()
}

fn is_ad_redirect(url: &Url) -> bool {
    match url.host_str() {
        Some(host) => host == "duckduckgo.com" || host.ends_with(".duckduckgo.com"),
        None => false,
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, Error> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("q", query)])
            .header("Accept", "text/html")
            .send()
            .await
            .map_err(|e| Error::search(format!("DuckDuckGo request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::search(format!(
                "DuckDuckGo search error: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::search(format!("Failed to read search results: {}", e)))?;

        // Html is !Send, so parsing stays inside the blocking task
        let urls = run_blocking(move || parse_results(&body, max_results)).await?;
        debug!(query = %query, results = urls.len(), "DuckDuckGo search");

        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const RESULTS_PAGE: &str = r#"
        <html><body>
          <div class="result results_links">
            <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.example.com%2Fbattery%3Fa%3D1&amp;rut=abc">Battery</a>
          </div>
          <div class="result result--ad">
            <a class="result__a" href="https://duckduckgo.com/y.js?ad_provider=x">Ad</a>
          </div>
          <div class="result">
            <a class="result__a" href="https://news.example.org/recycling">Recycling</a>
          </div>
          <div class="result">
            <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.example.com%2Fbattery%3Fa%3D1">Duplicate</a>
          </div>
          <div class="result">
            <a class="result__a" href="/relative/link">Relative</a>
          </div>
          <div class="result">
            <a class="result__a" href="https://third.example.net/">Third</a>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_extract_ddg_url_decodes_redirect() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Frust-lang.org%2Flearn&rut=123";
        assert_eq!(extract_ddg_url(href), "https://rust-lang.org/learn");
    }

    #[test]
    fn test_extract_ddg_url_plain_link() {
        assert_eq!(
            extract_ddg_url("https://example.com/page"),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_parse_results_filters_ads_duplicates_relative() {
        let urls = parse_results(RESULTS_PAGE, 10);
        assert_eq!(
            urls,
            vec![
                "https://www.example.com/battery?a=1",
                "https://news.example.org/recycling",
                "https://third.example.net/",
            ]
        );
    }

    #[test]
    fn test_parse_results_respects_cap() {
        let urls = parse_results(RESULTS_PAGE, 2);
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn test_parse_results_empty_page() {
        assert!(parse_results("<html><body>No results.</body></html>", 10).is_empty());
    }

    #[test]
    fn test_parse_results_drops_non_http_schemes() {
        let page = r#"
            <div class="result"><a class="result__a" href="ftp://files.example.com/a">Ftp</a></div>
            <div class="result"><a class="result__a" href="javascript:void(0)">Js</a></div>
            <div class="result"><a class="result__a" href="HTTPS://Upper.example.com/x">Upper</a></div>
        "#;
        assert_eq!(parse_results(page, 10), vec!["HTTPS://Upper.example.com/x"]);
    }

    #[test]
    fn test_parse_results_drops_ad_without_path() {
        let page = r#"
            <div class="result result--ad">
              <a class="result__a" href="https://duckduckgo.com?ad_provider=x">Ad</a>
            </div>
        "#;
        assert!(parse_results(page, 10).is_empty());
    }

    fn ad(url: &str) -> bool {
        is_ad_redirect(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_is_ad_redirect() {
        assert!(ad("https://duckduckgo.com/y.js?x=1"));
        assert!(ad("https://html.duckduckgo.com/html/"));
        assert!(!ad("https://example.com/duckduckgo.com"));
        assert!(!ad("https://notduckduckgo.com/"));
    }

    #[test]
    fn test_is_ad_redirect_with_port_or_bare_query() {
        assert!(ad("https://duckduckgo.com:443/y.js?ad=1"));
        assert!(ad("https://duckduckgo.com:8443/y.js"));
        assert!(ad("https://duckduckgo.com?ad=1"));
        assert!(ad("https://DuckDuckGo.com/y.js"));
    }

    /// Read one HTTP request, headers and body.
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let body_len = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Serve a single canned response; returns the endpoint URL and the
    /// request the server received.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });
        (format!("http://{}/html/", addr), handle)
    }

    #[tokio::test]
    async fn test_search_posts_query_and_parses_page() {
        let (endpoint, server) = serve_once("200 OK", RESULTS_PAGE).await;
        let search = DuckDuckGoSearch::default().with_endpoint(endpoint);

        let urls = search.search("battery recycling", 10).await.unwrap();

        assert_eq!(
            urls,
            vec![
                "https://www.example.com/battery?a=1",
                "https://news.example.org/recycling",
                "https://third.example.net/",
            ]
        );
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /html/"));
        assert!(request.contains("q=battery+recycling"));
    }

    #[tokio::test]
    async fn test_search_error_status() {
        let (endpoint, _server) = serve_once("503 Service Unavailable", "busy").await;
        let search = DuckDuckGoSearch::default().with_endpoint(endpoint);

        let err = search.search("anything", 10).await.unwrap_err();
        assert!(matches!(err, Error::Search(_)));
        assert!(err.to_string().contains("503"));
    }
}

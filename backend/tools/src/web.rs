//! Web navigator: fetches a page and summarizes what a tester needs from it.
//!
//! Links are resolved against the page (or its `<base href>`), filtered to
//! http(s) and deduplicated in document order.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use navigator_config::FunctionConfig;
use navigator_core::{
    NavigateInput, NavigatorError, PageAnalysis, Result, Tool, ToolInput, ToolKind, ToolOutput,
};

use crate::mismatched_input;
use crate::synthesizer::TestCaseSynthesizer;

pub const DEFAULT_USER_AGENT: &str = "qa-navigator/0.1 (+automated test discovery)";

/// Most links echoed in the navigation section of the summary.
const MAX_SUMMARY_LINKS: usize = 50;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NavigatorOptions {
    pub timeout: Duration,
    pub max_body_bytes: usize,
    pub min_request_interval: Duration,
    pub allowed_schemes: Vec<String>,
    pub blocked_hosts: Vec<String>,
    pub user_agent: String,
}

impl Default for NavigatorOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_body_bytes: 2_000_000,
            min_request_interval: Duration::ZERO,
            allowed_schemes: vec!["http".into(), "https".into()],
            blocked_hosts: Vec::new(),
            user_agent: DEFAULT_USER_AGENT.into(),
        }
    }
}

impl NavigatorOptions {
    pub fn from_config(config: &FunctionConfig) -> Self {
        let defaults = Self::default();
        Self {
            timeout: Duration::from_secs(config.timeout_secs()),
            max_body_bytes: config.max_body_bytes(),
            min_request_interval: Duration::from_millis(config.min_request_interval_ms.unwrap_or(0)),
            allowed_schemes: config
                .allowed_schemes
                .clone()
                .unwrap_or(defaults.allowed_schemes),
            blocked_hosts: config.blocked_hosts.clone().unwrap_or_default(),
            user_agent: config.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }
}

// ---------------------------------------------------------------------------
// Tool
// ---------------------------------------------------------------------------

pub struct WebNavigatorTool {
    client: Client,
    options: NavigatorOptions,
    synthesizer: Option<TestCaseSynthesizer>,
    last_request: Mutex<Option<Instant>>,
}

impl WebNavigatorTool {
    pub fn new(options: NavigatorOptions) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            options,
            synthesizer: None,
            last_request: Mutex::new(None),
        })
    }

    pub fn with_synthesizer(mut self, synthesizer: TestCaseSynthesizer) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Parses `raw` and checks scheme, host and the blocked-host list.
    pub fn validate_url(&self, raw: &str) -> Result<Url> {
        let invalid = |reason: String| NavigatorError::InvalidUrl {
            url: raw.to_string(),
            reason,
        };

        let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
        if !self
            .options
            .allowed_schemes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(url.scheme()))
        {
            return Err(invalid(format!("scheme '{}' is not allowed", url.scheme())));
        }
        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h.to_ascii_lowercase(),
            _ => return Err(invalid("URL has no host".into())),
        };
        let blocked = self.options.blocked_hosts.iter().any(|b| {
            let b = b.to_ascii_lowercase();
            host == b || host.ends_with(&format!(".{b}"))
        });
        if blocked {
            return Err(invalid(format!("host '{host}' is blocked")));
        }
        Ok(url)
    }

    /// Fetch `raw_url` and analyze the returned HTML.
    pub async fn fetch_and_analyze(&self, raw_url: &str) -> Result<PageAnalysis> {
        let url = self.validate_url(raw_url)?;
        self.wait_turn().await;

        info!(url = %url, "Fetching page");
        let network = |e: reqwest::Error| NavigatorError::NetworkFailure {
            url: url.to_string(),
            message: if e.is_timeout() {
                format!("request timed out after {:?}", self.options.timeout)
            } else {
                e.to_string()
            },
        };

        let mut resp = self.client.get(url.clone()).send().await.map_err(network)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NavigatorError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let final_url = resp.url().clone();

        let mut body = Vec::new();
        let mut truncated = false;
        while let Some(chunk) = resp.chunk().await.map_err(network)? {
            let room = self.options.max_body_bytes.saturating_sub(body.len());
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                truncated = true;
                break;
            }
            body.extend_from_slice(&chunk);
        }
        let html = String::from_utf8_lossy(&body).into_owned();
        debug!(url = %final_url, bytes = body.len(), truncated, "Page body received");

        let mut page = analyze_html(&final_url, &html);
        page.status = status.as_u16();

        if let Some(synthesizer) = &self.synthesizer {
            page.tests = synthesizer.synthesize(&page).await?;
        }
        info!(url = %page.url, links = page.links.len(), tests = page.tests.len(), "Page analyzed");
        Ok(page)
    }

    async fn wait_turn(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.options.min_request_interval {
                tokio::time::sleep(self.options.min_request_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl Tool for WebNavigatorTool {
    fn kind(&self) -> ToolKind {
        ToolKind::WebNavigator
    }

    async fn invoke(&self, input: ToolInput) -> Result<ToolOutput> {
        match input {
            ToolInput::WebNavigator(NavigateInput { url }) => {
                Ok(ToolOutput::Page(self.fetch_and_analyze(&url).await?))
            }
            other => Err(mismatched_input(self.kind(), &other)),
        }
    }
}

// ---------------------------------------------------------------------------
// HTML analysis
// ---------------------------------------------------------------------------

static NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<!--.*?-->").unwrap());
static TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").unwrap());
static BASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<base\b([^>]*)>").unwrap());
static ANCHOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").unwrap());
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]\s*>").unwrap());
static FORM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<form\b([^>]*)>").unwrap());
static INPUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<input\b([^>]*)>").unwrap());
static TEXTAREA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<textarea\b([^>]*)>").unwrap());
static SELECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<select\b([^>]*)>").unwrap());
static BUTTON: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<button\b([^>]*)>(.*?)</button\s*>").unwrap());
static ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

/// Builds a [`PageAnalysis`] from HTML fetched at `page_url`. Pure; `status` is left at 200.
pub fn analyze_html(page_url: &Url, html: &str) -> PageAnalysis {
    let clean = NOISE.replace_all(html, " ");

    let base = BASE
        .captures(&clean)
        .and_then(|c| attr(&c[1], "href"))
        .and_then(|href| page_url.join(&href).ok())
        .unwrap_or_else(|| page_url.clone());

    let title = TITLE
        .captures(&clean)
        .map(|c| inner_text(&c[1]))
        .filter(|t| !t.is_empty());

    let mut links = Vec::new();
    let mut seen = HashSet::new();
    let mut nav = Vec::new();
    for cap in ANCHOR.captures_iter(&clean) {
        let Some(href) = attr(&cap[1], "href") else { continue };
        let Some(resolved) = resolve_link(&base, &href) else { continue };
        if seen.insert(resolved.clone()) {
            let text = inner_text(&cap[2]);
            if nav.len() < MAX_SUMMARY_LINKS {
                let label = if text.is_empty() { "(no text)" } else { text.as_str() };
                nav.push(format!("{label} -> {resolved}"));
            }
            links.push(resolved);
        }
    }

    let mut sections: Vec<(&str, Vec<String>)> = Vec::new();

    sections.push((
        "Headings",
        HEADING
            .captures_iter(&clean)
            .map(|c| format!("h{}: {}", &c[1], inner_text(&c[2])))
            .collect(),
    ));
    sections.push((
        "Forms",
        FORM.captures_iter(&clean)
            .map(|c| {
                let method = attr(&c[1], "method").unwrap_or_else(|| "GET".into());
                let action = attr(&c[1], "action").unwrap_or_default();
                describe("form", &c[1], &["id", "name"])
                    + &format!(" method={} action={}", method.to_ascii_uppercase(), action)
            })
            .collect(),
    ));
    sections.push((
        "Inputs",
        INPUT
            .captures_iter(&clean)
            .map(|c| describe("input", &c[1], &["type", "name", "id", "placeholder"]))
            .collect(),
    ));
    sections.push((
        "Textareas",
        TEXTAREA
            .captures_iter(&clean)
            .map(|c| describe("textarea", &c[1], &["name", "id", "placeholder"]))
            .collect(),
    ));
    sections.push((
        "Selects",
        SELECT
            .captures_iter(&clean)
            .map(|c| describe("select", &c[1], &["name", "id"]))
            .collect(),
    ));
    sections.push((
        "Buttons",
        BUTTON
            .captures_iter(&clean)
            .map(|c| {
                let text = inner_text(&c[2]);
                describe("button", &c[1], &["type", "id"]) + &format!(" \"{text}\"")
            })
            .collect(),
    ));
    sections.push(("Navigation links", nav));

    let mut extracted_text = format!("Title: {}\n", title.as_deref().unwrap_or("(none)"));
    for (heading, items) in sections.into_iter().filter(|(_, items)| !items.is_empty()) {
        extracted_text.push_str(heading);
        extracted_text.push_str(":\n");
        for item in items {
            extracted_text.push_str("- ");
            extracted_text.push_str(&item);
            extracted_text.push('\n');
        }
    }

    PageAnalysis {
        url: page_url.to_string(),
        status: 200,
        title,
        links,
        extracted_text: extracted_text.trim_end().to_string(),
        raw_html: html.to_string(),
        tests: Vec::new(),
    }
}

/// Absolute http(s) form of `href`, fragment removed; `None` for links a tester cannot follow.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = decode_entities(href.trim());
    let lower = href.to_ascii_lowercase();
    if href.is_empty()
        || href.starts_with('#')
        || ["javascript:", "mailto:", "tel:", "data:"]
            .iter()
            .any(|p| lower.starts_with(p))
    {
        return None;
    }
    let mut url = base.join(&href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

fn attr(attrs: &str, name: &str) -> Option<String> {
    ATTR.captures_iter(attrs)
        .find(|c| c[1].eq_ignore_ascii_case(name))
        .and_then(|c| c.get(2).or_else(|| c.get(3)).or_else(|| c.get(4)))
        .map(|m| decode_entities(m.as_str()))
}

fn describe(tag: &str, attrs: &str, names: &[&str]) -> String {
    let mut out = tag.to_string();
    for name in names {
        if let Some(value) = attr(attrs, name).filter(|v| !v.is_empty()) {
            out.push_str(&format!(" {name}={value}"));
        }
    }
    out
}

fn inner_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    decode_entities(&out.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use navigator_core::ErrorKind;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const EXAMPLE_HTML: &str = r#"<!doctype html>
<html><head><title>Example Domain</title></head>
<body><div><h1>Example Domain</h1>
<p>This domain is for use in illustrative examples in documents.</p>
<p><a href="https://www.iana.org/domains/example">More information...</a></p>
</div></body></html>"#;

    fn tool() -> WebNavigatorTool {
        WebNavigatorTool::new(NavigatorOptions::default()).unwrap()
    }

    #[test]
    fn links_are_absolute_deduplicated_and_ordered() {
        let html = r##"
            <a href="/about">About</a>
            <a href='contact#form'>Contact</a>
            <a href="https://other.test/x">X</a>
            <a href="/about#team">About again</a>
            <a href="#top">Top</a>
            <a href="javascript:void(0)">JS</a>
            <a href="mailto:qa@example.com">Mail</a>
            <a href="tel:123">Call</a>
            <a href="ftp://files.example.com/">FTP</a>
            <a href=/plain>Plain</a>
        "##;
        let base = Url::parse("https://example.com/docs/index.html").unwrap();
        let page = analyze_html(&base, html);
        assert_eq!(
            page.links,
            vec![
                "https://example.com/about",
                "https://example.com/docs/contact",
                "https://other.test/x",
                "https://example.com/plain",
            ]
        );
    }

    #[test]
    fn base_href_is_honoured() {
        let html = r#"<head><base href="https://cdn.example.com/app/"></head><a href="page">P</a>"#;
        let page = analyze_html(&Url::parse("https://example.com/").unwrap(), html);
        assert_eq!(page.links, vec!["https://cdn.example.com/app/page"]);
    }

    #[test]
    fn summary_lists_interactive_elements() {
        let html = r#"
            <title>Sign in</title>
            <script>var x = "<a href='/hidden'>no</a>";</script>
            <h2>Welcome &amp; hello</h2>
            <form method="post" action="/session">
              <input type="email" name="email" placeholder="you@example.com">
              <textarea name="notes"></textarea>
              <select id="role"><option>Admin</option></select>
              <button type="submit">Log <b>in</b></button>
            </form>
            <nav><a href="/help">Help</a></nav>
        "#;
        let page = analyze_html(&Url::parse("https://example.com/login").unwrap(), html);
        let text = &page.extracted_text;

        assert_eq!(page.title.as_deref(), Some("Sign in"));
        assert!(text.contains("h2: Welcome & hello"));
        assert!(text.contains("form method=POST action=/session"));
        assert!(text.contains("input type=email name=email placeholder=you@example.com"));
        assert!(text.contains("textarea name=notes"));
        assert!(text.contains("select id=role"));
        assert!(text.contains("button type=submit \"Log in\""));
        assert!(text.contains("Help -> https://example.com/help"));
        assert_eq!(page.links, vec!["https://example.com/help"]);
    }

    #[test]
    fn url_validation() {
        let tool = tool();
        assert!(tool.validate_url("https://example.com/").is_ok());
        for bad in ["ftp://example.com/", "not a url", "file:///etc/passwd", "mailto:a@b.c"] {
            let err = tool.validate_url(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidUrl, "{bad}");
        }

        let guarded = WebNavigatorTool::new(NavigatorOptions {
            blocked_hosts: vec!["169.254.169.254".into(), "internal.test".into()],
            ..NavigatorOptions::default()
        })
        .unwrap();
        assert!(guarded.validate_url("http://169.254.169.254/latest").is_err());
        assert!(guarded.validate_url("http://api.internal.test/").is_err());
        assert!(guarded.validate_url("http://notinternal.test/").is_ok());
    }

    #[tokio::test]
    async fn fetches_example_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(EXAMPLE_HTML))
            .mount(&server)
            .await;

        let page = tool().fetch_and_analyze(&format!("{}/", server.uri())).await.unwrap();
        assert_eq!(page.status, 200);
        assert_eq!(page.title.as_deref(), Some("Example Domain"));
        assert_eq!(page.links, vec!["https://www.iana.org/domains/example"]);
        assert!(page.extracted_text.contains("h1: Example Domain"));
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = tool()
            .fetch_and_analyze(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, NavigatorError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn slow_server_is_network_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(EXAMPLE_HTML)
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let tool = WebNavigatorTool::new(NavigatorOptions {
            timeout: Duration::from_millis(50),
            ..NavigatorOptions::default()
        })
        .unwrap();
        let err = tool.fetch_and_analyze(&server.uri()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkFailure);
    }

    #[tokio::test]
    async fn body_is_capped() {
        let server = MockServer::start().await;
        let big = format!("<title>Big</title>{}", "x".repeat(10_000));
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(big))
            .mount(&server)
            .await;

        let tool = WebNavigatorTool::new(NavigatorOptions {
            max_body_bytes: 1_000,
            ..NavigatorOptions::default()
        })
        .unwrap();
        let page = tool.fetch_and_analyze(&server.uri()).await.unwrap();
        assert_eq!(page.raw_html.len(), 1_000);
        assert_eq!(page.title.as_deref(), Some("Big"));
    }

    #[tokio::test]
    async fn requests_are_spaced_by_the_politeness_interval() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(EXAMPLE_HTML))
            .mount(&server)
            .await;

        let tool = WebNavigatorTool::new(NavigatorOptions {
            min_request_interval: Duration::from_millis(200),
            ..NavigatorOptions::default()
        })
        .unwrap();
        let start = Instant::now();
        tool.fetch_and_analyze(&server.uri()).await.unwrap();
        tool.fetch_and_analyze(&server.uri()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}

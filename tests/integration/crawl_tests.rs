//! Integration tests for the crawler
//!
//! The first test drives a full crawl against a wiremock server with the
//! built-in HTTP renderer and fetcher. The rest plug scripted collaborators
//! into the coordinator to pin down the crawl loop's behavior.

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wavecrawl::config::{Config, CrawlerConfig, MemoryConfig, OutputConfig};
use wavecrawl::crawler::{
    BodyStream, ByteFetcher, Coordinator, PageRenderer, RenderOptions, RenderedPage, ResponseHead,
};
use wavecrawl::{normalize_url, CrawlPhase, ProxyCredential, ProxyPool, WaveError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn key(url: &str) -> String {
    normalize_url(url).unwrap().to_string()
}

/// Creates a test configuration writing everything under `dir`
fn create_test_config(dir: &Path, seeds: &[&str], max_depth: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            seeds: seeds.iter().map(|s| s.to_string()).collect(),
            max_depth,
            max_concurrent: 4,
            max_retries: 3,
            retry_delay_ms: 0,
        },
        memory: MemoryConfig {
            threshold_percent: None,
            ..MemoryConfig::default()
        },
        output: OutputConfig {
            directory: dir.join("output"),
            docs_directory: dir.join("output").join("docs"),
            link_map: dir.join("links_map.txt"),
            summary_path: None,
        },
        ..Config::default()
    }
}

fn markdown_files(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(".md"))
        .collect();
    names.sort();
    names
}

/// Scripted site: known pages render, everything else is a 404
#[derive(Default)]
struct SiteRenderer {
    pages: HashMap<String, (String, Vec<String>)>,
    always_failing: HashSet<String>,
    delay: Duration,
    calls: Mutex<HashMap<String, usize>>,
    proxies_seen: Mutex<Vec<Option<String>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SiteRenderer {
    fn page(mut self, url: &str, text: &str, links: &[&str]) -> Self {
        self.pages.insert(
            key(url),
            (
                text.to_string(),
                links.iter().map(|l| l.to_string()).collect(),
            ),
        );
        self
    }

    fn failing(mut self, url: &str) -> Self {
        self.always_failing.insert(key(url));
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(&key(url)).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl PageRenderer for SiteRenderer {
    async fn render(
        &self,
        url: &Url,
        proxy: Option<&ProxyCredential>,
        _options: &RenderOptions,
    ) -> wavecrawl::Result<RenderedPage> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_insert(0) += 1;
        self.proxies_seen
            .lock()
            .unwrap()
            .push(proxy.map(|p| p.server.clone()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.always_failing.contains(url.as_str()) {
            return Err(WaveError::Timeout {
                url: url.to_string(),
            });
        }

        Ok(match self.pages.get(url.as_str()) {
            Some((text, links)) => RenderedPage {
                success: true,
                final_url: url.to_string(),
                markdown: text.clone(),
                internal_links: links.clone(),
                error_message: None,
            },
            None => RenderedPage::failed(url.as_str(), "HTTP 404"),
        })
    }
}

/// Answers probes with HTML unless told otherwise; serves scripted documents
#[derive(Default)]
struct SiteFetcher {
    documents: HashMap<String, Vec<u8>>,
    probe_failures: HashSet<String>,
    slow_bodies: bool,
    body_calls: Mutex<HashMap<String, usize>>,
}

impl SiteFetcher {
    fn document(mut self, url: &str, body: &[u8]) -> Self {
        self.documents.insert(key(url), body.to_vec());
        self
    }

    fn probe_fails(mut self, url: &str) -> Self {
        self.probe_failures.insert(key(url));
        self
    }

    /// Streams bodies a few bytes at a time with pauses in between
    fn with_slow_bodies(mut self) -> Self {
        self.slow_bodies = true;
        self
    }

    fn body_calls_for(&self, url: &str) -> usize {
        self.body_calls
            .lock()
            .unwrap()
            .get(&key(url))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ByteFetcher for SiteFetcher {
    async fn get_headers(
        &self,
        url: &Url,
        _proxy: Option<&ProxyCredential>,
        _timeout: Duration,
    ) -> wavecrawl::Result<ResponseHead> {
        if self.probe_failures.contains(url.as_str()) {
            return Err(WaveError::Timeout {
                url: url.to_string(),
            });
        }

        let content_type = if self.documents.contains_key(url.as_str()) {
            "application/pdf"
        } else {
            "text/html"
        };
        Ok(ResponseHead {
            status: 200,
            content_type: Some(content_type.to_string()),
            content_disposition: None,
        })
    }

    async fn stream_body(
        &self,
        url: &Url,
        _proxy: Option<&ProxyCredential>,
        _timeout: Duration,
    ) -> wavecrawl::Result<BodyStream> {
        *self
            .body_calls
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_insert(0) += 1;

        let (status, body) = match self.documents.get(url.as_str()) {
            Some(body) => (200, body.clone()),
            None => (404, Vec::new()),
        };

        let chunks = if self.slow_bodies {
            let pieces: Vec<Vec<u8>> = body.chunks(3).map(|piece| piece.to_vec()).collect();
            futures::stream::iter(pieces)
                .then(|piece| async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Ok::<_, WaveError>(piece)
                })
                .boxed()
        } else {
            futures::stream::iter(vec![Ok(body)]).boxed()
        };

        Ok(BodyStream {
            head: ResponseHead {
                status,
                content_type: Some("application/pdf".to_string()),
                content_disposition: None,
            },
            chunks,
        })
    }
}

async fn build(
    config: Config,
    proxies: ProxyPool,
    renderer: &Arc<SiteRenderer>,
    fetcher: &Arc<SiteFetcher>,
) -> Coordinator {
    Coordinator::with_collaborators(config, proxies, renderer.clone(), fetcher.clone())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_full_crawl_over_http() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(
                    r#"<html><head><title>Home</title></head><body>
                    <p>Welcome home.</p>
                    <a href="/guide">Guide</a>
                    <a href="/files/manual.pdf">Manual</a>
                    <a href="https://elsewhere.test/">Elsewhere</a>
                    </body></html>"#,
                ),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/guide"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(
                    r##"<html><head><title>Guide</title></head><body>
                    <h2>Steps</h2><p>Do the thing.</p>
                    <a href="/">Home</a>
                    <a href="/guide/#top">Top</a>
                    </body></html>"##,
                ),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/manual.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.4 manual".to_vec()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let seed = format!("{}/", base_url);
    let config = create_test_config(dir.path(), &[seed.as_str()], 3);

    let mut coordinator = Coordinator::new(config).await.unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(coordinator.phase(), CrawlPhase::Done);
    assert_eq!(report.depth_reached, 2);
    assert_eq!(report.pages_written, 2);
    assert_eq!(report.documents_downloaded, 1);
    assert_eq!(report.failures, 0);
    assert_eq!(report.visited.len(), 3);

    let pages = markdown_files(&dir.path().join("output"));
    assert_eq!(pages.len(), 2);
    let guide_page = pages
        .iter()
        .find(|name| name.ends_with("_guide.md"))
        .expect("guide page written");
    let guide = std::fs::read_to_string(dir.path().join("output").join(guide_page)).unwrap();
    assert_eq!(guide, "# Guide\n\n## Steps\n\nDo the thing.");

    let manual = std::fs::read(dir.path().join("output").join("docs").join("manual.pdf")).unwrap();
    assert_eq!(manual, b"%PDF-1.4 manual");

    let link_map = std::fs::read_to_string(dir.path().join("links_map.txt")).unwrap();
    assert_eq!(link_map, format!("{}/files/manual.pdf,manual.pdf\n", base_url));
}

#[tokio::test]
async fn test_example_site_scenario() {
    let renderer = Arc::new(
        SiteRenderer::default()
            .page(
                "https://example.test",
                "# Example",
                &["https://example.test/a", "https://other.test/x"],
            )
            .page("https://example.test/a", "# A", &[]),
    );
    let fetcher = Arc::new(SiteFetcher::default());

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["https://example.test"], 2);
    let mut coordinator = build(config, ProxyPool::disabled(), &renderer, &fetcher).await;

    let report = coordinator.run().await.unwrap();

    assert_eq!(
        markdown_files(&dir.path().join("output")),
        vec![
            "https___example_test_.md".to_string(),
            "https___example_test_a.md".to_string(),
        ]
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("links_map.txt")).unwrap(),
        ""
    );
    assert_eq!(renderer.calls_for("https://other.test/x"), 0);
    assert_eq!(
        report.visited,
        vec![key("https://example.test"), key("https://example.test/a")]
    );
}

#[tokio::test]
async fn test_max_depth_zero_visits_nothing() {
    let renderer = Arc::new(SiteRenderer::default().page("https://example.test", "home", &[]));
    let fetcher = Arc::new(SiteFetcher::default());

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["https://example.test"], 0);
    let mut coordinator = build(config, ProxyPool::disabled(), &renderer, &fetcher).await;

    let report = coordinator.run().await.unwrap();

    assert_eq!(coordinator.phase(), CrawlPhase::Done);
    assert_eq!(renderer.total_calls(), 0);
    assert!(report.visited.is_empty());
    assert!(markdown_files(&dir.path().join("output")).is_empty());
    assert!(!dir.path().join("links_map.txt").exists());
}

#[tokio::test]
async fn test_off_domain_links_end_crawl_after_first_wave() {
    let renderer = Arc::new(SiteRenderer::default().page(
        "https://example.test",
        "home",
        &["https://other.test/", "https://sub.example.test/"],
    ));
    let fetcher = Arc::new(SiteFetcher::default());

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["https://example.test"], 5);
    let mut coordinator = build(config, ProxyPool::disabled(), &renderer, &fetcher).await;

    let report = coordinator.run().await.unwrap();

    assert_eq!(report.depth_reached, 1);
    assert_eq!(renderer.total_calls(), 1);
    assert!(coordinator.frontier().is_empty());
}

#[tokio::test]
async fn test_each_url_processed_at_most_once() {
    let renderer = Arc::new(
        SiteRenderer::default()
            .page(
                "https://example.test",
                "home",
                &["https://example.test/a", "https://example.test/b"],
            )
            .page(
                "https://example.test/a",
                "a",
                &[
                    "https://example.test/b",
                    "https://example.test/c",
                    "https://EXAMPLE.test/",
                ],
            )
            .page(
                "https://example.test/b",
                "b",
                &[
                    "https://example.test/A/",
                    "https://example.test/c#section",
                    "https://example.test/C",
                ],
            )
            .page("https://example.test/c", "c", &["https://example.test"]),
    );
    let fetcher = Arc::new(SiteFetcher::default());

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["https://example.test"], 10);
    let mut coordinator = build(config, ProxyPool::disabled(), &renderer, &fetcher).await;

    let report = coordinator.run().await.unwrap();

    for url in [
        "https://example.test",
        "https://example.test/a",
        "https://example.test/b",
        "https://example.test/c",
    ] {
        assert_eq!(renderer.calls_for(url), 1, "{}", url);
    }
    assert_eq!(renderer.total_calls(), 4);
    assert_eq!(report.depth_reached, 3);
    assert_eq!(report.visited.len(), 4);
}

#[tokio::test]
async fn test_concurrency_bound_never_exceeded() {
    let links: Vec<String> = (0..20)
        .map(|i| format!("https://example.test/p{}", i))
        .collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

    let mut site = SiteRenderer::default()
        .with_delay(Duration::from_millis(30))
        .page("https://example.test", "home", &link_refs);
    for link in &links {
        site = site.page(link, "leaf", &[]);
    }
    let renderer = Arc::new(site);
    let fetcher = Arc::new(SiteFetcher::default());

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path(), &["https://example.test"], 2);
    config.crawler.max_concurrent = 3;
    let mut coordinator = build(config, ProxyPool::disabled(), &renderer, &fetcher).await;

    let report = coordinator.run().await.unwrap();

    assert_eq!(report.pages_written, 21);
    let max = renderer.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 3, "saw {} renders in flight", max);
    assert!(max >= 2, "units did not overlap");
}

#[tokio::test]
async fn test_failing_page_is_retried_then_given_up() {
    let renderer = Arc::new(
        SiteRenderer::default()
            .page(
                "https://example.test",
                "home",
                &["https://example.test/flaky", "https://example.test/ok"],
            )
            .page("https://example.test/ok", "ok", &[])
            .failing("https://example.test/flaky"),
    );
    let fetcher = Arc::new(SiteFetcher::default());

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["https://example.test"], 3);
    let mut coordinator = build(config, ProxyPool::disabled(), &renderer, &fetcher).await;

    let report = coordinator.run().await.unwrap();

    assert_eq!(renderer.calls_for("https://example.test/flaky"), 3);
    assert_eq!(report.failures, 1);
    assert_eq!(report.pages_written, 2);
    assert!(coordinator
        .visited()
        .contains(&normalize_url("https://example.test/flaky").unwrap()));
}

#[tokio::test]
async fn test_documents_downloaded_once_and_errors_not_retried() {
    let renderer = Arc::new(SiteRenderer::default().page(
        "https://example.test",
        "home",
        &[
            "https://example.test/report.pdf",
            "https://example.test/missing.docx",
            "https://example.test/export",
        ],
    ));
    let fetcher = Arc::new(
        SiteFetcher::default()
            .document("https://example.test/report.pdf", b"%PDF")
            .document("https://example.test/export", b"%PDF export"),
    );

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["https://example.test"], 2);
    let mut coordinator = build(config, ProxyPool::disabled(), &renderer, &fetcher).await;

    let report = coordinator.run().await.unwrap();

    assert_eq!(report.documents_downloaded, 2);
    assert_eq!(report.failures, 1);
    assert_eq!(fetcher.body_calls_for("https://example.test/missing.docx"), 1);
    assert_eq!(renderer.calls_for("https://example.test/report.pdf"), 0);
    assert_eq!(renderer.calls_for("https://example.test/export"), 0);

    let docs = dir.path().join("output").join("docs");
    assert_eq!(std::fs::read(docs.join("report.pdf")).unwrap(), b"%PDF");
    assert_eq!(std::fs::read(docs.join("export")).unwrap(), b"%PDF export");

    let map = std::fs::read_to_string(dir.path().join("links_map.txt")).unwrap();
    let mut lines: Vec<&str> = map.lines().collect();
    lines.sort();
    assert_eq!(
        lines,
        vec![
            "https://example.test/export,export",
            "https://example.test/report.pdf,report.pdf",
        ]
    );
}

#[tokio::test]
async fn test_same_named_documents_all_kept() {
    let renderer = Arc::new(
        SiteRenderer::default()
            .page(
                "https://example.test",
                "home",
                &[
                    "https://example.test/a/guide.pdf",
                    "https://example.test/b/guide.pdf",
                    "https://example.test/more",
                ],
            )
            .page("https://example.test/more", "more", &["https://example.test/c/guide.pdf"]),
    );
    let fetcher = Arc::new(
        SiteFetcher::default()
            .document("https://example.test/a/guide.pdf", b"first guide body")
            .document("https://example.test/b/guide.pdf", b"second guide body")
            .document("https://example.test/c/guide.pdf", b"third guide body")
            .with_slow_bodies(),
    );

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["https://example.test"], 3);
    let mut coordinator = build(config, ProxyPool::disabled(), &renderer, &fetcher).await;

    let report = coordinator.run().await.unwrap();

    assert_eq!(report.documents_downloaded, 3);
    assert_eq!(report.failures, 0);

    let docs = dir.path().join("output").join("docs");
    let map = std::fs::read_to_string(dir.path().join("links_map.txt")).unwrap();
    let entries: HashMap<&str, &str> = map
        .lines()
        .map(|line| line.rsplit_once(',').unwrap())
        .collect();
    assert_eq!(entries.len(), 3);

    let names: HashSet<&str> = entries.values().copied().collect();
    assert_eq!(names.len(), 3);
    assert!(names.contains("guide.pdf"));

    for (url, body) in [
        ("https://example.test/a/guide.pdf", "first guide body"),
        ("https://example.test/b/guide.pdf", "second guide body"),
        ("https://example.test/c/guide.pdf", "third guide body"),
    ] {
        let name = entries[key(url).as_str()];
        assert_eq!(std::fs::read_to_string(docs.join(name)).unwrap(), body);
    }
    assert_eq!(std::fs::read_dir(&docs).unwrap().count(), 3);
}

#[tokio::test]
async fn test_failed_probe_falls_back_to_render() {
    let renderer = Arc::new(
        SiteRenderer::default()
            .page("https://example.test", "home", &["https://example.test/slow"])
            .page("https://example.test/slow", "slow but fine", &[]),
    );
    let fetcher = Arc::new(SiteFetcher::default().probe_fails("https://example.test/slow"));

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["https://example.test"], 2);
    let mut coordinator = build(config, ProxyPool::disabled(), &renderer, &fetcher).await;

    let report = coordinator.run().await.unwrap();

    assert_eq!(renderer.calls_for("https://example.test/slow"), 1);
    assert_eq!(report.pages_written, 2);
    assert_eq!(report.failures, 0);
}

#[tokio::test]
async fn test_proxies_used_for_every_render() {
    let renderer = Arc::new(
        SiteRenderer::default()
            .page("https://example.test", "home", &["https://example.test/a"])
            .page("https://example.test/a", "a", &[]),
    );
    let fetcher = Arc::new(SiteFetcher::default());
    let proxies = ProxyPool::new(vec![
        ProxyCredential::new("http://10.0.0.1:8000", "user", "secret"),
        ProxyCredential::new("http://10.0.0.2:8000", "user", "secret"),
    ]);

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["https://example.test"], 2);
    let mut coordinator = build(config, proxies, &renderer, &fetcher).await;

    coordinator.run().await.unwrap();

    let seen = renderer.proxies_seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|proxy| proxy.is_some()));
}

#[tokio::test]
async fn test_link_map_truncated_at_start() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("links_map.txt"),
        "https://old.test/x.pdf,x.pdf\n",
    )
    .unwrap();

    let renderer = Arc::new(SiteRenderer::default().page("https://example.test", "home", &[]));
    let fetcher = Arc::new(SiteFetcher::default());
    let config = create_test_config(dir.path(), &["https://example.test"], 1);
    let mut coordinator = build(config, ProxyPool::disabled(), &renderer, &fetcher).await;

    coordinator.run().await.unwrap();

    assert_eq!(
        std::fs::read_to_string(dir.path().join("links_map.txt")).unwrap(),
        ""
    );
}

#[tokio::test]
async fn test_summary_written_when_configured() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(SiteRenderer::default().page("https://example.test", "home", &[]));
    let fetcher = Arc::new(SiteFetcher::default());

    let mut config = create_test_config(dir.path(), &["https://example.test"], 1);
    config.output.summary_path = Some(dir.path().join("crawl_summary.md"));
    let mut coordinator = build(config, ProxyPool::disabled(), &renderer, &fetcher).await;

    coordinator.run().await.unwrap();

    let summary = std::fs::read_to_string(dir.path().join("crawl_summary.md")).unwrap();
    assert!(summary.contains("| Pages written | 1 |"));
    assert!(summary.contains("https://example.test/"));
}

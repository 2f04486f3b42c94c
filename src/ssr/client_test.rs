use super::*;
use serde_json::json;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

struct MockSsrClient {
    responses: Mutex<Vec<Result<(u16, Vec<u8>), SsrError>>>,
    calls: AtomicUsize,
    seen_headers: Mutex<Vec<(String, String)>>,
}

impl MockSsrClient {
    fn new(mut responses: Vec<Result<(u16, Vec<u8>), SsrError>>) -> Arc<Self> {
        responses.reverse();
        Arc::new(Self { responses: Mutex::new(responses), calls: AtomicUsize::new(0), seen_headers: Mutex::new(Vec::new()) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SsrClient for MockSsrClient {
    async fn post(&self, _url: &str, _body: Vec<u8>, headers: &[(String, String)]) -> Result<(u16, Vec<u8>), SsrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_headers.lock().unwrap() = headers.to_vec();
        self.responses.lock().unwrap().pop().unwrap_or(Ok((500, Vec::new())))
    }
}

fn ok_body() -> Vec<u8> {
    serde_json::to_vec(&json!({ "head": ["<title>x</title>"], "body": "<div>x</div>" })).unwrap()
}

fn config() -> SsrConfig {
    SsrConfig { retry_delay: Duration::from_millis(1), ..SsrConfig::default() }
}

fn page(component: &str) -> Page {
    Page { component: component.to_owned(), url: "/".to_owned(), ..Page::default() }
}

#[tokio::test]
async fn renders_and_decodes_response() {
    let client = MockSsrClient::new(vec![Ok((200, ok_body()))]);
    let ssr = HttpSsr::with_client(config(), client.clone());
    let response = ssr.render(&page("Home")).await.unwrap();
    assert_eq!(response.head, vec!["<title>x</title>".to_owned()]);
    assert_eq!(response.body, "<div>x</div>");
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn retries_server_error_once_by_default() {
    let client = MockSsrClient::new(vec![Ok((503, Vec::new())), Ok((200, ok_body()))]);
    let ssr = HttpSsr::with_client(config(), client.clone());
    assert!(ssr.render(&page("Home")).await.is_ok());
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn retries_transport_errors() {
    let client = MockSsrClient::new(vec![Err(SsrError::Transport("refused".into())), Ok((200, ok_body()))]);
    let ssr = HttpSsr::with_client(config(), client.clone());
    assert!(ssr.render(&page("Home")).await.is_ok());
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn gives_up_after_max_retries() {
    let client = MockSsrClient::new(vec![Ok((500, Vec::new())), Ok((500, Vec::new())), Ok((200, ok_body()))]);
    let ssr = HttpSsr::with_client(config(), client.clone());
    let err = ssr.render(&page("Home")).await.unwrap_err();
    assert!(matches!(err, SsrError::Status(500)));
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let client = MockSsrClient::new(vec![Ok((404, Vec::new()))]);
    let ssr = HttpSsr::with_client(config(), client.clone());
    assert!(matches!(ssr.render(&page("Home")).await, Err(SsrError::Status(404))));
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn explicit_retry_statuses_replace_default() {
    let cfg = SsrConfig { retry_statuses: vec![429], ..config() };
    let client = MockSsrClient::new(vec![Ok((429, Vec::new())), Ok((200, ok_body()))]);
    let ssr = HttpSsr::with_client(cfg.clone(), client.clone());
    assert!(ssr.render(&page("Home")).await.is_ok());
    assert_eq!(client.calls(), 2);

    let client = MockSsrClient::new(vec![Ok((502, Vec::new()))]);
    let ssr = HttpSsr::with_client(cfg, client.clone());
    assert!(ssr.render(&page("Home")).await.is_err());
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn disabled_retries_post_once() {
    let cfg = SsrConfig { disable_retries: true, max_retries: 5, ..config() };
    let client = MockSsrClient::new(vec![Ok((500, Vec::new())), Ok((200, ok_body()))]);
    let ssr = HttpSsr::with_client(cfg, client.clone());
    assert!(ssr.render(&page("Home")).await.is_err());
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn identical_pages_hit_cache() {
    let client = MockSsrClient::new(vec![Ok((200, ok_body()))]);
    let ssr = HttpSsr::with_client(config(), client.clone());
    let first = ssr.render(&page("Home")).await.unwrap();
    let second = ssr.render(&page("Home")).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(client.calls(), 1);
    assert_eq!(ssr.cache().map(SsrCache::len), Some(1));
}

#[tokio::test]
async fn zero_ttl_skips_cache() {
    let cfg = SsrConfig { cache_ttl: Duration::ZERO, ..config() };
    let client = MockSsrClient::new(vec![Ok((200, ok_body())), Ok((200, ok_body()))]);
    let ssr = HttpSsr::with_client(cfg, client.clone());
    ssr.render(&page("Home")).await.unwrap();
    ssr.render(&page("Home")).await.unwrap();
    assert!(ssr.cache().is_none());
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn invalid_body_is_decode_error() {
    let client = MockSsrClient::new(vec![Ok((200, b"not json".to_vec()))]);
    let ssr = HttpSsr::with_client(config(), client);
    assert!(matches!(ssr.render(&page("Home")).await, Err(SsrError::Decode(_))));
}

#[tokio::test]
async fn custom_headers_are_forwarded() {
    let cfg = SsrConfig { headers: vec![("X-Token".to_owned(), "secret".to_owned())], ..config() };
    let client = MockSsrClient::new(vec![Ok((200, ok_body()))]);
    let ssr = HttpSsr::with_client(cfg, client.clone());
    ssr.render(&page("Home")).await.unwrap();
    assert_eq!(*client.seen_headers.lock().unwrap(), vec![("X-Token".to_owned(), "secret".to_owned())]);
}

struct SlowClient;

#[async_trait::async_trait]
impl SsrClient for SlowClient {
    async fn post(&self, _url: &str, _body: Vec<u8>, _headers: &[(String, String)]) -> Result<(u16, Vec<u8>), SsrError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok((200, ok_body()))
    }
}

#[tokio::test]
async fn slow_renderer_times_out() {
    let cfg = SsrConfig { timeout: Duration::from_millis(20), ..config() };
    let ssr = HttpSsr::with_client(cfg, Arc::new(SlowClient));
    assert!(matches!(ssr.render(&page("Home")).await, Err(SsrError::Timeout(_))));
}

#[cfg(feature = "live-ssr-tests")]
#[tokio::test]
async fn live_renderer_answers_at_ssr_url() {
    let url = std::env::var("SSR_URL").unwrap_or_else(|_| crate::config::DEFAULT_SSR_URL.to_owned());
    let ssr = HttpSsr::new(SsrConfig { url, ..SsrConfig::default() }).unwrap();
    let response = ssr.render(&page("Home")).await.unwrap();
    assert!(!response.body.is_empty());
}

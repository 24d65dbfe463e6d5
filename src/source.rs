use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::blocking::Client as HttpClient;
use reqwest::header::{CACHE_CONTROL, PRAGMA, USER_AGENT};
use url::Url;

use crate::catalog::{self, LoadError, RawRecord};
use crate::storage::Store;

/// Key the local catalog is persisted under.
pub const LOCAL_CATALOG_KEY: &str = "movie-shelf:catalog";
const CACHE_BUST_PARAM: &str = "v";

pub trait CatalogSource: Send + Sync {
    fn describe(&self) -> String;
    fn fetch_records(&self) -> Result<Vec<RawRecord>, LoadError>;
}

#[derive(Debug, Clone, Default)]
pub struct RemoteConfig {
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

pub struct RemoteSource {
    http: HttpClient,
    url: Url,
    user_agent: String,
}

impl RemoteSource {
    pub fn new(url: Url, config: RemoteConfig) -> anyhow::Result<Self> {
        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder().timeout(config.timeout).build()?,
        };
        let user_agent = if config.user_agent.trim().is_empty() {
            format!("movie-shelf/{}", crate::VERSION)
        } else {
            config.user_agent
        };
        Ok(Self {
            http,
            url,
            user_agent,
        })
    }

    /// The document URL with a fresh uniqueness token so no cache can answer.
    pub fn request_url(&self) -> Url {
        let token = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_millis();
        cache_busted(&self.url, token)
    }
}

pub fn cache_busted(url: &Url, token: u128) -> Url {
    let mut busted = url.clone();
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != CACHE_BUST_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    busted
        .query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(CACHE_BUST_PARAM, &token.to_string());
    busted
}

impl CatalogSource for RemoteSource {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    fn fetch_records(&self) -> Result<Vec<RawRecord>, LoadError> {
        let target = self.describe();
        let request_url = self.request_url();
        tracing::debug!(url = %request_url, "fetching catalog document");
        let response = self
            .http
            .get(request_url)
            .header(USER_AGENT, &self.user_agent)
            .header(CACHE_CONTROL, "no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .map_err(|source| LoadError::Request {
                target: target.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                target,
                status: status.as_u16(),
            });
        }
        let body = response
            .text()
            .map_err(|source| LoadError::Request { target, source })?;
        catalog::parse_records(&body)
    }
}

#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch_records(&self) -> Result<Vec<RawRecord>, LoadError> {
        let body = fs::read_to_string(&self.path).map_err(|source| LoadError::Io {
            target: self.describe(),
            source,
        })?;
        catalog::parse_records(&body)
    }
}

/// Catalog persisted as one JSON sequence in the key/value store; every
/// mutation rewrites the whole sequence.
#[derive(Clone)]
pub struct LocalSource {
    store: Arc<Store>,
    key: String,
}

impl LocalSource {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            key: LOCAL_CATALOG_KEY.to_string(),
        }
    }

    pub fn records(&self) -> anyhow::Result<Vec<RawRecord>> {
        match self.store.get(&self.key)? {
            Some(body) => catalog::parse_records(&body).map_err(anyhow::Error::from),
            None => Ok(Vec::new()),
        }
    }

    pub fn replace_records(&self, records: &[RawRecord]) -> anyhow::Result<()> {
        let body = serde_json::to_string(records)?;
        self.store.put(&self.key, &body)?;
        tracing::debug!(records = records.len(), "local catalog written");
        Ok(())
    }

    pub fn add_record(&self, record: RawRecord) -> anyhow::Result<usize> {
        let mut records = self.records()?;
        records.push(record);
        self.replace_records(&records)?;
        Ok(records.len())
    }

    /// Removes the record whose resolved catalog id is `id`.
    pub fn remove_record(&self, id: &str) -> anyhow::Result<bool> {
        let mut records = self.records()?;
        let catalog = catalog::Catalog::from_records(
            records.clone(),
            &catalog::LoadOptions::with_policy(catalog::MissingTimestamp::Epoch),
        );
        let Some(position) = catalog.position(id) else {
            return Ok(false);
        };
        records.remove(position);
        self.replace_records(&records)?;
        Ok(true)
    }
}

impl CatalogSource for LocalSource {
    fn describe(&self) -> String {
        format!("local store ({})", self.key)
    }

    fn fetch_records(&self) -> Result<Vec<RawRecord>, LoadError> {
        let body = self.store.get(&self.key).map_err(LoadError::Storage)?;
        match body {
            Some(body) => catalog::parse_records(&body),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Options;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};
    use tempfile::{tempdir, NamedTempFile};

    /// Serves one canned HTTP response and hands back the request head it saw.
    fn serve_once(status: &'static str, body: &'static str) -> (Url, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(&stream);
            let mut head = String::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
                head.push_str(&line);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            (&stream).write_all(response.as_bytes()).unwrap();
            head
        });
        let url = Url::parse(&format!("http://{addr}/movies.json?lang=en")).unwrap();
        (url, handle)
    }

    fn remote(url: Url) -> RemoteSource {
        let http = HttpClient::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        RemoteSource::new(
            url,
            RemoteConfig {
                user_agent: "shelf-test/1".into(),
                timeout: None,
                http_client: Some(http),
            },
        )
        .unwrap()
    }

    #[test]
    fn remote_source_defeats_caches() {
        let (url, server) = serve_once("200 OK", r#"[{"title": "Dune"}, {"title": "Heat"}]"#);
        let records = remote(url).fetch_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].title.as_deref(), Some("Heat"));

        let head = server.join().unwrap().to_ascii_lowercase();
        let request_line = head.lines().next().unwrap();
        assert!(
            request_line.starts_with("get /movies.json?lang=en&v="),
            "request line was {request_line}"
        );
        assert!(head.contains("cache-control: no-store"), "head was {head}");
        assert!(head.contains("pragma: no-cache"), "head was {head}");
        assert!(head.contains("user-agent: shelf-test/1"), "head was {head}");
    }

    #[test]
    fn remote_error_status_is_a_load_error() {
        let (url, server) = serve_once("500 Internal Server Error", "oops");
        let err = remote(url).fetch_records().unwrap_err();
        assert!(matches!(err, LoadError::Status { status: 500, .. }), "got {err:?}");
        server.join().unwrap();
    }

    #[test]
    fn remote_malformed_body_is_a_load_error() {
        let (url, server) = serve_once("200 OK", r#"{"title": "Dune"}"#);
        let err = remote(url).fetch_records().unwrap_err();
        assert!(matches!(err, LoadError::Malformed(_)), "got {err:?}");
        server.join().unwrap();
    }

    #[test]
    fn unreachable_remote_is_a_request_error() {
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let url = Url::parse(&format!("http://{addr}/movies.json")).unwrap();
        let err = remote(url).fetch_records().unwrap_err();
        assert!(matches!(err, LoadError::Request { .. }), "got {err:?}");
    }

    #[test]
    fn cache_bust_token_replaces_previous_one() {
        let url = Url::parse("https://example.test/movies.json?lang=en&v=1").unwrap();
        let busted = cache_busted(&url, 42);
        assert_eq!(busted.as_str(), "https://example.test/movies.json?lang=en&v=42");
        let plain = Url::parse("https://example.test/movies.json").unwrap();
        assert_eq!(
            cache_busted(&plain, 7).as_str(),
            "https://example.test/movies.json?v=7"
        );
    }

    #[test]
    fn file_source_reads_records() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"[{{"title": "Dune"}}, {{"title": "Heat"}}]"#).unwrap();
        let source = FileSource::new(file.path());
        assert_eq!(source.fetch_records().unwrap().len(), 2);
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let dir = tempdir().unwrap();
        let source = FileSource::new(dir.path().join("movies.json"));
        assert!(matches!(source.fetch_records(), Err(LoadError::Io { .. })));
    }

    #[test]
    fn local_source_round_trips_mutations() {
        let dir = tempdir().unwrap();
        let store = Arc::new(
            Store::open(Options {
                path: Some(dir.path().join("state.db")),
            })
            .unwrap(),
        );
        let local = LocalSource::new(store);
        assert!(local.fetch_records().unwrap().is_empty());

        local
            .add_record(RawRecord {
                title: Some("Dune".into()),
                ..RawRecord::default()
            })
            .unwrap();
        let count = local
            .add_record(RawRecord {
                title: Some("Heat".into()),
                ..RawRecord::default()
            })
            .unwrap();
        assert_eq!(count, 2);

        assert!(local.remove_record("dune").unwrap());
        assert!(!local.remove_record("dune").unwrap());
        let remaining = local.fetch_records().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].title.as_deref(), Some("Heat"));
    }
}

//! Statistics and company feeds, and the background loader that applies
//! only the most recent request.

use crate::config::ApiConfig;
use crate::data::{self, Breakdown};
use crate::error::{MapError, Result};
use crate::types::{Entity, ProcessingType};
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// One feed endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum FeedRequest {
    Provinces(ProcessingType),
    Districts { province: String, kind: ProcessingType },
    Breakdown { province: String },
    Companies,
}

impl FeedRequest {
    /// Path and query appended to the HTTP base URL
    pub fn http_path(&self) -> String {
        match self {
            FeedRequest::Provinces(kind) => format!("sido?type={kind}"),
            FeedRequest::Districts { province, kind } => format!("sigungu/{province}?type={kind}"),
            FeedRequest::Breakdown { province } => format!("sigungu/{province}/alldata"),
            FeedRequest::Companies => "companies".to_string(),
        }
    }

    /// File under a local feed directory holding the same payload
    pub fn local_path(&self) -> PathBuf {
        match self {
            FeedRequest::Provinces(kind) => PathBuf::from("sido").join(format!("{kind}.json")),
            FeedRequest::Districts { province, kind } => {
                PathBuf::from("sigungu").join(province).join(format!("{kind}.json"))
            }
            FeedRequest::Breakdown { province } => PathBuf::from("sigungu").join(province).join("alldata.json"),
            FeedRequest::Companies => PathBuf::from("companies.json"),
        }
    }
}

enum Source {
    Http { base: String, client: reqwest::blocking::Client },
    Local(PathBuf),
}

/// Reads feeds from an HTTP service or from a directory mirroring its layout
pub struct FeedClient {
    source: Source,
}

impl FeedClient {
    /// `http(s)://` bases are fetched, anything else is a local directory
    /// (an optional `file:` prefix is stripped).
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base = config.base_url.trim();
        let source = if base.starts_with("http://") || base.starts_with("https://") {
            let client = reqwest::blocking::Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms))
                .build()?;
            Source::Http {
                base: base.trim_end_matches('/').to_string(),
                client,
            }
        } else {
            Source::Local(PathBuf::from(base.strip_prefix("file:").unwrap_or(base)))
        };
        Ok(Self { source })
    }

    /// Raw payload of one endpoint
    pub fn fetch(&self, request: &FeedRequest) -> Result<Vec<u8>> {
        match &self.source {
            Source::Http { base, client } => {
                let url = format!("{}/{}", base, request.http_path());
                debug!(%url, "fetching feed");
                let response = client.get(&url).send()?;
                let status = response.status();
                if !status.is_success() {
                    return Err(MapError::Status {
                        url,
                        status: status.as_u16(),
                    });
                }
                Ok(response.bytes()?.to_vec())
            }
            Source::Local(dir) => {
                let path = dir.join(request.local_path());
                debug!(path = %path.display(), "reading feed");
                Ok(fs::read(path)?)
            }
        }
    }

    pub fn provinces(&self, kind: ProcessingType) -> Result<Vec<(String, f64)>> {
        data::parse_stats(&mut self.fetch(&FeedRequest::Provinces(kind))?)
    }

    pub fn districts(&self, province: &str, kind: ProcessingType) -> Result<Vec<(String, f64)>> {
        let request = FeedRequest::Districts {
            province: province.to_string(),
            kind,
        };
        data::parse_stats(&mut self.fetch(&request)?)
    }

    pub fn breakdown(&self, province: &str) -> Result<Vec<Breakdown>> {
        let request = FeedRequest::Breakdown {
            province: province.to_string(),
        };
        data::parse_breakdown(&mut self.fetch(&request)?)
    }

    pub fn companies(&self) -> Result<Vec<Entity>> {
        data::parse_entities(&mut self.fetch(&FeedRequest::Companies)?)
    }
}

/// Runs jobs off the UI thread and hands back only the latest one's result.
///
/// Every request gets a new generation number. Completions from older
/// generations are dropped when polled, so a slow response can never
/// overwrite a newer view.
pub struct Loader<T> {
    tx: Sender<(u64, T)>,
    rx: Receiver<(u64, T)>,
    latest: u64,
    pending: bool,
}

impl<T: Send + 'static> Default for Loader<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Loader<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            latest: 0,
            pending: false,
        }
    }

    /// Start `job` on a worker thread, superseding any request in flight
    pub fn request<F>(&mut self, job: F) -> u64
    where
        F: FnOnce() -> T + Send + 'static,
    {
        self.latest += 1;
        self.pending = true;
        let generation = self.latest;
        let tx = self.tx.clone();
        thread::spawn(move || {
            // receiver gone means the app exited
            let _ = tx.send((generation, job()));
        });
        debug!(generation, "loader request issued");
        generation
    }

    pub fn latest(&self) -> u64 {
        self.latest
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    fn accept(&mut self, generation: u64, value: T) -> Option<T> {
        if generation == self.latest {
            self.pending = false;
            Some(value)
        } else {
            info!(generation, latest = self.latest, "discarding stale load");
            None
        }
    }

    /// Non-blocking: the latest generation's result if it has arrived
    pub fn poll(&mut self) -> Option<T> {
        let mut result = None;
        while let Ok((generation, value)) = self.rx.try_recv() {
            if let Some(v) = self.accept(generation, value) {
                result = Some(v);
            }
        }
        result
    }

    /// Block until the latest generation completes or `timeout` passes
    pub fn wait(&mut self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok((generation, value)) => {
                    if let Some(v) = self.accept(generation, value) {
                        return Some(v);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_client(dir: &std::path::Path) -> FeedClient {
        FeedClient::new(&ApiConfig {
            base_url: format!("file:{}", dir.display()),
            timeout_ms: 1000,
        })
        .unwrap()
    }

    #[test]
    fn test_request_paths() {
        let request = FeedRequest::Districts {
            province: "경기".to_string(),
            kind: ProcessingType::Consigned,
        };
        assert_eq!(request.http_path(), "sigungu/경기?type=consigned");
        assert_eq!(FeedRequest::Provinces(ProcessingType::Total).http_path(), "sido?type=total");
        assert_eq!(
            FeedRequest::Breakdown { province: "서울".into() }.local_path(),
            PathBuf::from("sigungu/서울/alldata.json")
        );
    }

    #[test]
    fn test_local_feed_directory() {
        let dir = std::env::temp_dir().join(format!("waste-map-feed-{}", std::process::id()));
        fs::create_dir_all(dir.join("sido")).unwrap();
        fs::write(dir.join("sido/public.json"), r#"{"서울특별시": 12.5}"#).unwrap();
        fs::write(
            dir.join("companies.json"),
            r#"[{"entrps_nm": "가나자원", "latitude": 37.5, "longitude": 127.0}]"#,
        )
        .unwrap();

        let client = local_client(&dir);
        let stats = client.provinces(ProcessingType::Public).unwrap();
        assert_eq!(stats, vec![("서울특별시".to_string(), 12.5)]);
        assert_eq!(client.companies().unwrap().len(), 1);
        assert!(matches!(client.provinces(ProcessingType::Total), Err(MapError::Io(_))));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut loader: Loader<&'static str> = Loader::new();
        let (release, gate) = mpsc::channel::<()>();

        let first = loader.request(move || {
            let _ = gate.recv();
            "old"
        });
        let second = loader.request(|| "new");
        assert!(second > first);

        assert_eq!(loader.wait(Duration::from_secs(5)), Some("new"));
        assert!(!loader.is_pending());

        release.send(()).unwrap();
        // the superseded job finishes later and is dropped
        assert_eq!(loader.wait(Duration::from_millis(500)), None);
        assert_eq!(loader.poll(), None);
    }

    #[test]
    fn test_poll_returns_latest() {
        let mut loader: Loader<u32> = Loader::new();
        loader.request(|| 7);
        assert_eq!(loader.wait(Duration::from_secs(5)), Some(7));
        assert_eq!(loader.poll(), None);
    }
}

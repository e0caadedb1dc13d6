//! Where the `/data` payload comes from.

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpDataSource;

/// Path of the payload on the bridge.
pub const DATA_PATH: &str = "/data";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[cfg(feature = "http")]
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[cfg(feature = "http")]
    #[error("invalid bridge url: {0}")]
    Url(#[from] url::ParseError),

    #[error("bridge answered with status {0}")]
    Status(u16),

    #[error("could not start the fetch runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("no payload available")]
    Unavailable,
}

/// Provides the payload of one poll cycle.
pub trait DataSource {
    fn fetch(&self) -> Result<String, FetchError>;
}

pub type DataSourcePointer = Box<dyn DataSource + Send>;

impl<T: DataSource + ?Sized> DataSource for Box<T> {
    fn fetch(&self) -> Result<String, FetchError> {
        (**self).fetch()
    }
}

/// Serves a fixed payload, for running without a bridge.
#[derive(Clone, Debug)]
pub struct DummyDataSource {
    body: Option<String>,
}

impl DummyDataSource {
    /// A source serving the bundled sample payload.
    pub fn new() -> Self {
        Self::with_body(std::include_str!("./dummy_data.txt"))
    }

    pub fn with_body(body: impl Into<String>) -> Self {
        Self { body: Some(body.into()) }
    }

    /// A source whose every fetch fails.
    pub fn unavailable() -> Self {
        Self { body: None }
    }
}

impl Default for DummyDataSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSource for DummyDataSource {
    fn fetch(&self) -> Result<String, FetchError> {
        self.body.clone().ok_or(FetchError::Unavailable)
    }
}

#[test]
fn test_dummy_data_source() {
    let source = DummyDataSource::new();
    let body = source.fetch().unwrap();

    assert_eq!(crate::record::records(&body).count(), 3);
    assert!(DummyDataSource::unavailable().fetch().is_err());
}

use std::time::Duration;

use url::Url;

use super::{DataSource, FetchError, DATA_PATH};

/// Fetches the payload from a bridge over HTTP.
///
/// The bridge protects `/data` with basic authentication. Requests run on a
/// private single threaded runtime, so `fetch` can be called from any plain
/// thread.
pub struct HttpDataSource {
    url: Url,
    username: String,
    password: Option<String>,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl HttpDataSource {
    /// Creates a source for the bridge at `bridge_url`, e.g. `http://192.168.4.1`.
    pub fn new(
        bridge_url: &str,
        username: impl Into<String>,
        password: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_client(bridge_url, username, password, client)
    }

    pub fn with_client(
        bridge_url: &str,
        username: impl Into<String>,
        password: Option<String>,
        client: reqwest::Client,
    ) -> Result<Self, FetchError> {
        let url = Url::parse(bridge_url)?.join(DATA_PATH)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            url,
            username: username.into(),
            password,
            client,
            runtime,
        })
    }

    /// The full url of the payload.
    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn request(&self) -> Result<String, FetchError> {
        let mut request = self.client.get(self.url.clone());
        if !self.username.is_empty() {
            request = request.basic_auth(&self.username, self.password.as_deref());
        }

        log::debug!("-> GET {}", self.url);
        let response = request.send().await?;

        let status = response.status();
        log::debug!("<- {status}");
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}

impl DataSource for HttpDataSource {
    fn fetch(&self) -> Result<String, FetchError> {
        self.runtime.block_on(self.request())
    }
}

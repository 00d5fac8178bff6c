use crate::domain::model::FetchOutcome;
use crate::domain::ports::Fetcher;
use crate::utils::error::Result;
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const MAX_REDIRECTS: usize = 10;

/// 單次 GET，固定逾時與 User-Agent，自動跟隨重新導向
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;

        Ok(Self { client, timeout })
    }

    fn describe(&self, err: &reqwest::Error) -> String {
        if err.is_timeout() {
            return format!("timed out after {}s", self.timeout.as_secs());
        }

        let mut message = err.to_string();
        let mut source = std::error::Error::source(err);
        while let Some(inner) = source {
            message = format!("{}: {}", message, inner);
            source = std::error::Error::source(inner);
        }
        message
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        tracing::debug!("Fetching {}", url);

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Transport failure for {}: {}", url, e);
                return FetchOutcome::TransportFailure(self.describe(&e));
            }
        };

        let status = response.status();
        let effective_url = response.url().to_string();
        tracing::debug!("Response status {} from {}", status, effective_url);

        if !status.is_success() {
            return FetchOutcome::HttpError(status.as_u16());
        }

        // text() 依 Content-Type 的 charset 解碼，未宣告時視為 UTF-8
        match response.text().await {
            Ok(body) => FetchOutcome::Success {
                status: status.as_u16(),
                body,
                effective_url,
            },
            Err(e) => FetchOutcome::TransportFailure(self.describe(&e)),
        }
    }
}

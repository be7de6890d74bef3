use async_trait::async_trait;
use reqwest::Client;
use std::{fmt::Debug, time::Duration};

use crate::error::{Result, WeatherError};

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The single outbound call the client makes: a GET with query parameters.
///
/// Implementations map a timed-out exchange to [`WeatherError::Timeout`] and
/// any other transport failure to [`WeatherError::Network`].
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    async fn get(
        &mut self,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<RawResponse>;

    /// Release pooled connections. A later `get` may reopen them.
    fn close(&mut self) {}
}

/// reqwest-backed transport. The client (and its connection pool) is created
/// on first use and dropped by [`Transport::close`].
#[derive(Debug, Default)]
pub struct HttpTransport {
    http: Option<Client>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a preconfigured client. After [`Transport::close`] a default client replaces it.
    pub fn with_client(http: Client) -> Self {
        Self { http: Some(http) }
    }

    fn client(&mut self) -> Result<&Client> {
        if self.http.is_none() {
            let client = Client::builder().build().map_err(WeatherError::network)?;
            self.http = Some(client);
        }

        self.http.as_ref().ok_or_else(|| WeatherError::network("HTTP client unavailable"))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &mut self,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<RawResponse> {
        let res = self
            .client()?
            .get(url)
            .query(query)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = res.status().as_u16();
        let body = res.text().await.map_err(|e| classify(e, timeout))?;

        Ok(RawResponse { status, body })
    }

    fn close(&mut self) {
        if self.http.take().is_some() {
            log::debug!("Closed HTTP connection pool");
        }
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> WeatherError {
    if err.is_timeout() {
        WeatherError::Timeout(timeout)
    } else {
        WeatherError::network(err)
    }
}

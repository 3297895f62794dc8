//! Delivery of ping samples to the HTTP collector

use crate::{
    error::{AppError, Result},
    models::{Config, PingReport},
};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Url};

/// Sends one ping sample somewhere.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Deliver a single report. Errors are per-sample and never retried here.
    async fn publish(&self, report: &PingReport) -> Result<()>;
}

/// Posts reports as JSON to `http://{API_HOST}:{API_PORT}/pings`.
#[derive(Debug, Clone)]
pub struct HttpPublisher {
    client: Client,
    endpoint: Url,
}

impl HttpPublisher {
    /// Create a publisher for an explicit endpoint.
    ///
    /// The client keeps reqwest's defaults, which means no overall request
    /// timeout.
    pub fn new(endpoint: Url) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("{}/{}", crate::PKG_NAME, crate::VERSION))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.collector_url()?)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish(&self, report: &PingReport) -> Result<()> {
        let body = serde_json::to_vec(report)?;
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        // The body is never read; dropping the response releases the connection.
        drop(response);

        if !status.is_success() {
            return Err(AppError::publish(format!(
                "collector at {} answered {}",
                self.endpoint, status
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProbeResult;
    use chrono::{DateTime, Utc};
    use std::net::Ipv4Addr;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::{
        matchers::{header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn endpoint(server: &MockServer) -> Url {
        Url::parse(&format!("{}/pings", server.uri())).unwrap()
    }

    fn sample() -> PingReport {
        PingReport::from(&ProbeResult::success(Ipv4Addr::LOCALHOST, Duration::from_micros(420)))
    }

    #[tokio::test]
    async fn test_publish_posts_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pings"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let started = Utc::now();
        let publisher = HttpPublisher::new(endpoint(&server)).unwrap();
        assert_ok!(publisher.publish(&sample()).await);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["ip_address"], "127.0.0.1");
        assert!(body["ping_time"].as_f64().unwrap() > 0.0);
        let last_seen = DateTime::parse_from_rfc3339(body["last_seen"].as_str().unwrap()).unwrap();
        assert!(last_seen >= started);
    }

    #[tokio::test]
    async fn test_non_success_status_is_publish_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pings"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let publisher = HttpPublisher::new(endpoint(&server)).unwrap();
        let err = publisher.publish(&sample()).await.unwrap_err();
        assert_eq!(err.category(), "PUBLISH");
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_unreachable_collector_is_error() {
        let server = MockServer::start().await;
        let url = endpoint(&server);
        drop(server);

        let publisher = HttpPublisher::new(url).unwrap();
        let result = publisher.publish(&sample()).await;
        assert_err!(&result);
        assert!(!result.unwrap_err().is_fatal());
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            api_host: "collector".to_string(),
            api_port: "9000".to_string(),
            ..Default::default()
        };
        let publisher = HttpPublisher::from_config(&config).unwrap();
        assert_eq!(publisher.endpoint().as_str(), "http://collector:9000/pings");
    }
}

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::debug;

use sgdns_config::{HealthCheckConfig, HealthCheckProtocol};
use sgdns_domain::HealthCheckResult;

/// One-shot health probe against a resolved endpoint address.
///
/// A probe that cannot reach the endpoint is an unhealthy *result*, not an
/// error; the per-context proceed rules decide what unhealthy means.
#[async_trait]
pub trait HealthCheck: Send + Sync + 'static {
    async fn check(&self, endpoint: &str, config: &HealthCheckConfig) -> HealthCheckResult;
}

/// Probes endpoints over the network: TCP connect, or HTTP(S) GET expecting
/// status 200. Each probe is bounded by the configuration's timeout.
pub struct NetworkHealthChecker {
    client: reqwest::Client,
}

impl NetworkHealthChecker {
    pub fn new() -> Self {
        NetworkHealthChecker { client: reqwest::Client::new() }
    }

    async fn tcp_check(&self, endpoint: &str, config: &HealthCheckConfig) -> HealthCheckResult {
        let address = format!("{}:{}", endpoint, config.port);
        let started = Instant::now();
        let connect = tokio::time::timeout(
            Duration::from_secs(config.timeout_secs),
            TcpStream::connect(&address),
        )
        .await;
        let elapsed = started.elapsed().as_millis() as u64;
        match connect {
            Ok(Ok(_stream)) => result(true, config, &address, None, None, elapsed),
            Ok(Err(e)) => result(false, config, &address, None, Some(e.to_string()), elapsed),
            Err(_) => result(
                false,
                config,
                &address,
                None,
                Some(format!("connect timed out after {}s", config.timeout_secs)),
                elapsed,
            ),
        }
    }

    async fn http_check(&self, endpoint: &str, config: &HealthCheckConfig) -> HealthCheckResult {
        let url = format!(
            "{}://{}:{}{}",
            config.protocol.scheme(),
            endpoint,
            config.port,
            config.path
        );
        debug!(%url, "sending health check request");
        let started = Instant::now();
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(config.timeout_secs))
            .send()
            .await;
        let elapsed = started.elapsed().as_millis() as u64;
        match response {
            Ok(resp) => {
                let status = resp.status().as_u16();
                result(status == 200, config, &url, Some(status), None, elapsed)
            }
            Err(e) => result(false, config, &url, None, Some(e.to_string()), elapsed),
        }
    }
}

impl Default for NetworkHealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HealthCheck for NetworkHealthChecker {
    async fn check(&self, endpoint: &str, config: &HealthCheckConfig) -> HealthCheckResult {
        match config.protocol {
            HealthCheckProtocol::Tcp => self.tcp_check(endpoint, config).await,
            HealthCheckProtocol::Http | HealthCheckProtocol::Https => {
                self.http_check(endpoint, config).await
            }
        }
    }
}

fn result(
    healthy: bool,
    config: &HealthCheckConfig,
    endpoint: &str,
    status: Option<u16>,
    message: Option<String>,
    time_taken_ms: u64,
) -> HealthCheckResult {
    HealthCheckResult {
        healthy,
        config_hash: config.hash(),
        instance_id: String::new(),
        protocol: config.protocol.to_string(),
        endpoint: endpoint.to_string(),
        status,
        message,
        time_taken_ms,
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    fn config(protocol: HealthCheckProtocol, port: u16) -> HealthCheckConfig {
        HealthCheckConfig {
            enabled: true,
            endpoint_source: "ip:v4:private".to_string(),
            protocol,
            port,
            path: "/health".to_string(),
            timeout_secs: 2,
            abandon_on_failure: false,
        }
    }

    #[tokio::test]
    async fn tcp_check_passes_against_a_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let checker = NetworkHealthChecker::new();
        let result = checker
            .check("127.0.0.1", &config(HealthCheckProtocol::Tcp, port))
            .await;
        assert!(result.healthy, "{:?}", result.message);
        assert_eq!(result.protocol, "TCP");
    }

    #[tokio::test]
    async fn tcp_check_fails_against_a_closed_port() {
        // Bind then drop to get a port that refuses connections.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let checker = NetworkHealthChecker::new();
        let result = checker
            .check("127.0.0.1", &config(HealthCheckProtocol::Tcp, port))
            .await;
        assert!(!result.healthy);
        assert!(result.message.is_some());
    }

    async fn serve_http_once(status_line: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let response = format!("HTTP/1.1 {}\r\ncontent-length: 0\r\n\r\n", status_line);
                let _ = stream.write_all(response.as_bytes()).await;
            }
        });
        port
    }

    #[tokio::test]
    async fn http_check_requires_status_200() {
        let port = serve_http_once("200 OK").await;
        let checker = NetworkHealthChecker::new();
        let result = checker
            .check("127.0.0.1", &config(HealthCheckProtocol::Http, port))
            .await;
        assert!(result.healthy, "{:?}", result.message);
        assert_eq!(result.status, Some(200));
    }

    #[tokio::test]
    async fn http_check_fails_on_server_error() {
        let port = serve_http_once("503 Service Unavailable").await;
        let checker = NetworkHealthChecker::new();
        let result = checker
            .check("127.0.0.1", &config(HealthCheckProtocol::Http, port))
            .await;
        assert!(!result.healthy);
        assert_eq!(result.status, Some(503));
    }
}

//! reqwest-backed switcher client

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::SwitcherClient;
use crate::config::SwitcherConfig;

/// Talks to the switcher's web controller over HTTP
#[derive(Clone)]
pub struct HttpSwitcherClient {
    client: Client,
    base_url: String,
    probe_timeout: Duration,
    command_timeout: Duration,
}

impl HttpSwitcherClient {
    /// Create a new client for the configured endpoint
    pub fn new(config: &SwitcherConfig) -> Self {
        let base_url = config.base_url();
        info!("Switcher client initialized with base URL: {}", base_url);

        Self {
            client: Client::new(),
            base_url,
            probe_timeout: config.probe_timeout(),
            command_timeout: config.command_timeout(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Build the query string pairs for a command, `Function` first
fn command_query(function: &str, params: &[(&str, String)]) -> Vec<(String, String)> {
    let mut query = Vec::with_capacity(params.len() + 1);
    query.push(("Function".to_string(), function.to_string()));
    query.extend(params.iter().map(|(k, v)| (k.to_string(), v.clone())));
    query
}

#[async_trait]
impl SwitcherClient for HttpSwitcherClient {
    async fn send_command(&self, function: &str, params: &[(&str, String)]) -> bool {
        info!("Sending switcher command {} with params {:?}", function, params);

        let result = self
            .client
            .get(&self.base_url)
            .query(&command_query(function, params))
            .timeout(self.command_timeout)
            .send()
            .await;

        match result {
            Ok(response) if response.status() == StatusCode::OK => {
                debug!("Switcher command {} succeeded", function);
                true
            }
            Ok(response) => {
                warn!(
                    "Switcher command {} failed with status {}",
                    function,
                    response.status()
                );
                false
            }
            Err(e) => {
                error!("Failed to send switcher command {}: {}", function, e);
                false
            }
        }
    }

    async fn check_connection(&self) -> bool {
        let result = self
            .client
            .get(&self.base_url)
            .timeout(self.probe_timeout)
            .send()
            .await;

        match result {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                error!("Failed to connect to switcher at {}: {}", self.base_url, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// A port nothing listens on: bind an ephemeral port, then release it
    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    fn unreachable_client() -> HttpSwitcherClient {
        let config = SwitcherConfig {
            port: closed_port(),
            probe_timeout_ms: 500,
            command_timeout_ms: 500,
            ..SwitcherConfig::default()
        };
        HttpSwitcherClient::new(&config)
    }

    /// Client pointed at a local listener standing in for the switcher
    async fn local_switcher() -> (HttpSwitcherClient, TcpListener) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = SwitcherConfig {
            port: listener.local_addr().unwrap().port(),
            ..SwitcherConfig::default()
        };
        (HttpSwitcherClient::new(&config), listener)
    }

    /// Accept one request, answer it with `status` and return its request line
    async fn answer_once(listener: TcpListener, status: &'static str) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            status
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;

        String::from_utf8_lossy(&request)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    }

    #[tokio::test]
    async fn test_only_200_counts_as_success() {
        let (client, listener) = local_switcher().await;
        let server = tokio::spawn(answer_once(listener, "500 Internal Server Error"));
        let sent = client
            .send_command(
                "ReplayChangeEventName",
                &[("Value", "0".to_string()), ("Name", "Set point & more".to_string())],
            )
            .await;
        assert!(!sent);
        assert_eq!(
            server.await.unwrap(),
            "GET /api/?Function=ReplayChangeEventName&Value=0&Name=Set+point+%26+more HTTP/1.1"
        );

        let (client, listener) = local_switcher().await;
        let server = tokio::spawn(answer_once(listener, "200 OK"));
        assert!(client.send_command("ReplayMarkIn", &[("Value", "3".to_string())]).await);
        assert_eq!(
            server.await.unwrap(),
            "GET /api/?Function=ReplayMarkIn&Value=3 HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_connection_check_needs_200() {
        let (client, listener) = local_switcher().await;
        let server = tokio::spawn(answer_once(listener, "404 Not Found"));
        assert!(!client.check_connection().await);
        assert_eq!(server.await.unwrap(), "GET /api/ HTTP/1.1");

        let (client, listener) = local_switcher().await;
        let server = tokio::spawn(answer_once(listener, "200 OK"));
        assert!(client.check_connection().await);
        server.await.unwrap();
    }

    #[test]
    fn test_command_query_puts_function_first() {
        let query = command_query(
            "ReplayPlayEvent",
            &[("Value", "2".to_string()), ("Speed", "50".to_string())],
        );
        assert_eq!(
            query,
            vec![
                ("Function".to_string(), "ReplayPlayEvent".to_string()),
                ("Value".to_string(), "2".to_string()),
                ("Speed".to_string(), "50".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_refused_connection_reports_false() {
        let client = unreachable_client();
        assert!(client.base_url().ends_with("/api/"));
        assert!(!client.check_connection().await);
        assert!(!client.send_command("ReplayPause", &[]).await);
    }
}

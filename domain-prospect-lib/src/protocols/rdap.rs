//! RDAP (Registration Data Access Protocol) oracle.
//!
//! RDAP answers over HTTPS with structured JSON. A `404` means the registry
//! has no record of the name; a `200` carrying a JSON object means it does.

use crate::error::ProspectError;
use crate::oracle::AvailabilityOracle;
use crate::protocols::registry::{normalize_endpoint, resolve_rdap_endpoint};
use crate::types::LookupOutcome;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::StatusCode;
use std::time::Duration;

/// RDAP client bound to one registry endpoint.
#[derive(Clone)]
pub struct RdapOracle {
    /// HTTP client for making RDAP requests
    http_client: reqwest::Client,
    /// Base URL; the domain is appended to it
    endpoint: String,
}

impl RdapOracle {
    /// Create an oracle for `tld`, using `explicit_endpoint` when given and
    /// the built-in registry otherwise.
    pub fn for_tld(tld: &str, explicit_endpoint: Option<&str>) -> Result<Self, ProspectError> {
        let endpoint = resolve_rdap_endpoint(tld, explicit_endpoint)?;
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("domain-prospect/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ProspectError::network_with_source(
                    "Failed to create RDAP HTTP client",
                    e.to_string(),
                )
            })?;

        Ok(Self {
            http_client,
            endpoint,
        })
    }

    /// Create an oracle with a caller-supplied HTTP client.
    pub fn with_client(
        http_client: reqwest::Client,
        endpoint: &str,
    ) -> Result<Self, ProspectError> {
        Ok(Self {
            http_client,
            endpoint: normalize_endpoint(endpoint)?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Perform one RDAP request and classify the response.
    pub async fn query(
        &self,
        domain: &str,
        timeout: Duration,
    ) -> Result<LookupOutcome, ProspectError> {
        let url = format!("{}{}", self.endpoint, domain);
        tracing::trace!(%url, "RDAP request");

        let response = self
            .http_client
            .get(&url)
            .header(ACCEPT, "application/rdap+json, application/json")
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProspectError::timeout("RDAP request", timeout)
                } else {
                    ProspectError::from(e)
                }
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(LookupOutcome::Available),
            StatusCode::OK => {
                let body = response.text().await.map_err(|e| {
                    if e.is_timeout() {
                        ProspectError::timeout("RDAP response body", timeout)
                    } else {
                        ProspectError::from(e)
                    }
                })?;
                parse_registered_body(domain, &body)
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(ProspectError::RateLimited {
                    service: "RDAP".to_string(),
                    message: format!("{} answered 429 Too Many Requests", self.endpoint),
                    retry_after,
                })
            }
            code => Err(ProspectError::rdap_with_status(
                domain,
                format!("RDAP server returned error: {}", code),
                code.as_u16(),
            )),
        }
    }
}

/// A `200` body must be a JSON object to count as a registration record.
fn parse_registered_body(domain: &str, body: &str) -> Result<LookupOutcome, ProspectError> {
    let json: serde_json::Value = serde_json::from_str(body).map_err(|e| ProspectError::ParseError {
        message: format!("RDAP response for '{}' is not JSON: {}", domain, e),
        content: Some(body.chars().take(200).collect()),
    })?;

    if json.is_object() {
        Ok(LookupOutcome::Registered)
    } else {
        Err(ProspectError::parse(format!(
            "RDAP response for '{}' is not a JSON object",
            domain
        )))
    }
}

#[async_trait]
impl AvailabilityOracle for RdapOracle {
    fn name(&self) -> &str {
        "rdap"
    }

    async fn lookup(&self, domain: &str, timeout: Duration) -> LookupOutcome {
        match self.query(domain, timeout).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let reason = err.indeterminate_reason();
                tracing::debug!(domain, %reason, error = %err, "RDAP lookup indeterminate");
                LookupOutcome::Indeterminate(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IndeterminateReason;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/rdap+json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    /// Minimal RDAP registry answering by domain name.
    async fn mock_registry() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).to_string();
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

                    let response = if path.ends_with("/free.com") {
                        http_response("404 Not Found", "")
                    } else if path.ends_with("/taken.com") {
                        http_response(
                            "200 OK",
                            r#"{"objectClassName":"domain","ldhName":"TAKEN.COM"}"#,
                        )
                    } else if path.ends_with("/garbled.com") {
                        http_response("200 OK", "<html>maintenance</html>")
                    } else if path.ends_with("/busy.com") {
                        "HTTP/1.1 429 Too Many Requests\r\nRetry-After: 7\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
                    } else if path.ends_with("/slow.com") {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        http_response("404 Not Found", "")
                    } else {
                        http_response("503 Service Unavailable", "")
                    };

                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}/domain/", addr)
    }

    fn local_oracle(endpoint: &str) -> RdapOracle {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        RdapOracle::with_client(client, endpoint).unwrap()
    }

    #[tokio::test]
    async fn test_status_classification() {
        let oracle = local_oracle(&mock_registry().await);
        let timeout = Duration::from_secs(2);

        assert_eq!(
            oracle.lookup("free.com", timeout).await,
            LookupOutcome::Available
        );
        assert_eq!(
            oracle.lookup("taken.com", timeout).await,
            LookupOutcome::Registered
        );
        assert_eq!(
            oracle.lookup("garbled.com", timeout).await,
            LookupOutcome::Indeterminate(IndeterminateReason::ParseError)
        );
        assert_eq!(
            oracle.lookup("busy.com", timeout).await,
            LookupOutcome::Indeterminate(IndeterminateReason::RateLimited)
        );
        assert_eq!(
            oracle.lookup("broken.com", timeout).await,
            LookupOutcome::Indeterminate(IndeterminateReason::TransportError)
        );
    }

    #[tokio::test]
    async fn test_retry_after_is_captured() {
        let oracle = local_oracle(&mock_registry().await);
        match oracle.query("busy.com", Duration::from_secs(2)).await {
            Err(ProspectError::RateLimited { retry_after, .. }) => {
                assert_eq!(retry_after, Some(Duration::from_secs(7)));
            }
            other => panic!("expected rate limit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_registry_times_out() {
        let oracle = local_oracle(&mock_registry().await);
        let outcome = oracle.lookup("slow.com", Duration::from_millis(200)).await;
        assert_eq!(
            outcome,
            LookupOutcome::Indeterminate(IndeterminateReason::Timeout)
        );
    }

    #[tokio::test]
    async fn test_unreachable_registry_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let oracle = local_oracle(&format!("http://{}/domain/", addr));
        let outcome = oracle.lookup("free.com", Duration::from_secs(2)).await;
        assert_eq!(
            outcome,
            LookupOutcome::Indeterminate(IndeterminateReason::TransportError)
        );
    }

    #[test]
    fn test_body_classification() {
        assert_eq!(
            parse_registered_body("a.com", r#"{"ldhName":"A.COM"}"#).unwrap(),
            LookupOutcome::Registered
        );
        assert!(parse_registered_body("a.com", "[1,2]").is_err());
        assert!(parse_registered_body("a.com", "").is_err());
    }

    #[test]
    fn test_unknown_tld_is_config_error() {
        let err = RdapOracle::for_tld("zz", None).err().unwrap();
        assert!(err.is_config_error());
    }
}

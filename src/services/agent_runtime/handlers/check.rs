//! `check` handler: TLS certificate expiry inspection, or a generic HTTP
//! health probe.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

use crate::domain::errors::{GraphiumError, GraphiumResult};
use crate::domain::models::{CheckPayload, CheckType};
use crate::domain::ports::ExecOptions;

use super::HandlerContext;

const DEFAULT_WARN_DAYS: i64 = 30;
const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 5;
const DEFAULT_HEALTHCHECK_RETRIES: u32 = 3;
const DEFAULT_HEALTHCHECK_INTERVAL_SECONDS: u64 = 5;
const RESPONSE_PREVIEW_BYTES: usize = 1024;

pub async fn handle(ctx: &HandlerContext, payload: &serde_json::Value) -> GraphiumResult<serde_json::Value> {
    let check: CheckPayload = serde_json::from_value(payload.clone())?;
    match check.check_type {
        CheckType::TlsCertificate => check_tls_certificate(&check).await,
        CheckType::Http => check_http(&check).await,
        CheckType::ContainerHealth => check_container_health(ctx, &check).await,
    }
}

/// Runs the container's healthcheck command via `exec`, retrying on the
/// configured interval until it exits `0` or the retry budget is spent.
async fn check_container_health(ctx: &HandlerContext, check: &CheckPayload) -> GraphiumResult<serde_json::Value> {
    let container_id = check
        .container_id
        .clone()
        .ok_or_else(|| GraphiumError::Validation("container_health check requires container_id".to_string()))?;

    if check.command.is_empty() {
        return Ok(serde_json::json!({
            "container_id": container_id,
            "healthy": true,
            "attempts": 0,
        }));
    }

    let retries = check.retries.unwrap_or(DEFAULT_HEALTHCHECK_RETRIES).max(1);
    let interval = Duration::from_secs(check.interval_seconds.unwrap_or(DEFAULT_HEALTHCHECK_INTERVAL_SECONDS));
    let timeout = Duration::from_secs(check.timeout_seconds.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECONDS));

    let mut last_error = None;
    for attempt in 1..=retries {
        let outcome = tokio::time::timeout(timeout, ctx.runtime.exec(&container_id, &check.command, &ExecOptions::default())).await;
        match outcome {
            Ok(Ok(result)) if result.exit_code == 0 => {
                return Ok(serde_json::json!({
                    "container_id": container_id,
                    "healthy": true,
                    "attempts": attempt,
                }));
            }
            Ok(Ok(result)) => last_error = Some(format!("healthcheck exited with status {}", result.exit_code)),
            Ok(Err(e)) => last_error = Some(e.to_string()),
            Err(_) => last_error = Some("healthcheck command timed out".to_string()),
        }
        if attempt < retries {
            tokio::time::sleep(interval).await;
        }
    }

    Ok(serde_json::json!({
        "container_id": container_id,
        "healthy": false,
        "attempts": retries,
        "error": last_error,
    }))
}

async fn check_tls_certificate(check: &CheckPayload) -> GraphiumResult<serde_json::Value> {
    let (host, port) = split_host_port(&check.target)?;

    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));

    let server_name = ServerName::try_from(host.clone())
        .map_err(|e| GraphiumError::Validation(format!("invalid server name {host}: {e}")))?;

    let tcp = tokio::net::TcpStream::connect((host.as_str(), port))
        .await
        .map_err(|e| GraphiumError::Transient(format!("tcp connect to {host}:{port} failed: {e}")))?;

    let tls_stream = connector
        .connect(server_name, tcp)
        .await
        .map_err(|e| GraphiumError::ExecutionFailed(format!("tls handshake with {host}:{port} failed: {e}")))?;

    let (_, session) = tls_stream.get_ref();
    let certs = session
        .peer_certificates()
        .ok_or_else(|| GraphiumError::ExecutionFailed("no peer certificates presented".to_string()))?;
    let leaf = certs
        .first()
        .ok_or_else(|| GraphiumError::ExecutionFailed("empty certificate chain".to_string()))?;

    let (_, parsed) = x509_parser::parse_x509_certificate(leaf.as_ref())
        .map_err(|e| GraphiumError::ExecutionFailed(format!("failed to parse leaf certificate: {e}")))?;

    let not_after = parsed.validity().not_after.to_datetime();
    let not_after_chrono = chrono::DateTime::from_timestamp(not_after.unix_timestamp(), 0)
        .ok_or_else(|| GraphiumError::ExecutionFailed("certificate expiry out of range".to_string()))?;
    let days_remaining = (not_after_chrono - chrono::Utc::now()).num_days();
    let warn_days = check.warn_days.unwrap_or(DEFAULT_WARN_DAYS);

    // A successful handshake above already means rustls validated the chain
    // against the configured roots; reaching here implies `chain_valid`.
    Ok(build_tls_result(&check.target, &parsed.subject().to_string(), not_after_chrono, days_remaining, warn_days))
}

/// Pure assembly of the TLS check's result contract, split out so the
/// expiry-window wording can be exercised without a live handshake.
fn build_tls_result(
    target: &str,
    subject: &str,
    not_after: chrono::DateTime<chrono::Utc>,
    days_remaining: i64,
    warn_days: i64,
) -> serde_json::Value {
    let is_expired = days_remaining < 0;
    let expiring_soon = !is_expired && days_remaining <= warn_days;
    let success = !is_expired && !expiring_soon;
    let message = if is_expired {
        format!("certificate for {target} expired {} days ago", -days_remaining)
    } else if expiring_soon {
        format!("certificate for {target} expires soon ({days_remaining} days remaining)")
    } else {
        format!("certificate for {target} is valid ({days_remaining} days remaining)")
    };

    serde_json::json!({
        "success": success,
        "message": message,
        "target": target,
        "subject": subject,
        "not_after": not_after.to_rfc3339(),
        "expires_in_days": days_remaining,
        "is_expired": is_expired,
        "chain_valid": true,
    })
}

async fn check_http(check: &CheckPayload) -> GraphiumResult<serde_json::Value> {
    let method = check.method.clone().unwrap_or_else(|| "GET".to_string());
    let expected_status = check.expected_status.unwrap_or(200);
    let timeout = Duration::from_secs(check.timeout_seconds.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECONDS));

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GraphiumError::ExecutionFailed(format!("failed to build http client: {e}")))?;

    let http_method: reqwest::Method = method
        .parse()
        .map_err(|_| GraphiumError::Validation(format!("invalid http method: {method}")))?;

    let started = Instant::now();
    let response = client
        .request(http_method, &check.target)
        .send()
        .await
        .map_err(|e| GraphiumError::Transient(format!("http probe to {} failed: {e}", check.target)))?;

    let status = response.status().as_u16();
    let body = response
        .bytes()
        .await
        .map_err(|e| GraphiumError::Transient(format!("failed to read response body: {e}")))?;
    let preview_len = body.len().min(RESPONSE_PREVIEW_BYTES);
    let preview = String::from_utf8_lossy(&body[..preview_len]).to_string();
    let duration_ms = started.elapsed().as_millis() as u64;

    Ok(serde_json::json!({
        "target": check.target,
        "status": status,
        "healthy": status == expected_status,
        "response_preview": preview,
        "duration_ms": duration_ms,
    }))
}

fn split_host_port(target: &str) -> GraphiumResult<(String, u16)> {
    match target.rsplit_once(':') {
        Some((host, port)) => {
            let port: u16 = port
                .parse()
                .map_err(|_| GraphiumError::Validation(format!("invalid port in target: {target}")))?;
            Ok((host.to_string(), port))
        }
        None => Ok((target.to_string(), 443)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_host_port_defaults_to_443() {
        assert_eq!(split_host_port("example.com").unwrap(), ("example.com".to_string(), 443));
        assert_eq!(split_host_port("example.com:8443").unwrap(), ("example.com".to_string(), 8443));
    }

    #[test]
    fn tls_result_flags_certificate_expiring_soon() {
        let not_after = chrono::Utc::now() + chrono::Duration::days(10);
        let result = build_tls_result("example.com:443", "CN=example.com", not_after, 10, 30);

        assert_eq!(result["success"], false);
        assert!(result["message"].as_str().unwrap().contains("expires soon"));
        assert!(result["message"].as_str().unwrap().contains("10 days"));
        assert_eq!(result["expires_in_days"], 10);
        assert_eq!(result["is_expired"], false);
        assert_eq!(result["chain_valid"], true);
    }

    #[test]
    fn tls_result_succeeds_well_before_expiry() {
        let not_after = chrono::Utc::now() + chrono::Duration::days(90);
        let result = build_tls_result("example.com:443", "CN=example.com", not_after, 90, 30);

        assert_eq!(result["success"], true);
        assert_eq!(result["is_expired"], false);
    }

    #[test]
    fn tls_result_flags_expired_certificate() {
        let not_after = chrono::Utc::now() - chrono::Duration::days(2);
        let result = build_tls_result("example.com:443", "CN=example.com", not_after, -2, 30);

        assert_eq!(result["success"], false);
        assert_eq!(result["is_expired"], true);
    }
}

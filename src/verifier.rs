use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;
use tracing::debug;

use crate::error::{DiscoveryError, Result};
use crate::packet;
use crate::stream;
use crate::types::{now_rfc3339, ProbeReport, ServerStatus};

/// Upper bound on the status JSON: 32767 UTF-16 units, up to 4 bytes each.
pub const MAX_STATUS_PAYLOAD: usize = 32_767 * 4;

/// Decides whether a local port speaks the status protocol.
#[async_trait]
pub trait PortVerifier: Send + Sync {
    async fn verify(&self, address: &str, port: u16, timeout: Duration) -> bool;
}

/// Verifier that performs a real handshake + status ping.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusPingVerifier;

#[async_trait]
impl PortVerifier for StatusPingVerifier {
    async fn verify(&self, address: &str, port: u16, timeout: Duration) -> bool {
        verify(address, port, timeout).await
    }
}

/// Single-attempt verification. Every failure folds into `false`.
pub async fn verify(address: &str, port: u16, timeout: Duration) -> bool {
    match probe(address, port, timeout).await {
        Ok(_) => true,
        Err(e) => {
            debug!(address, port, error = %e, "status ping rejected");
            false
        }
    }
}

/// Like [`verify`], but keeps the parsed status or the reason for failure.
///
/// The connect and the exchange are each bounded by `timeout`. The stream is
/// dropped, and so closed, on every return path.
pub async fn probe(address: &str, port: u16, timeout: Duration) -> Result<ServerStatus> {
    let mut conn = match time::timeout(timeout, TcpStream::connect((address, port))).await {
        Ok(Ok(conn)) => conn,
        Ok(Err(source)) => {
            return Err(DiscoveryError::Connect {
                addr: format!("{address}:{port}"),
                source,
            })
        }
        Err(_) => return Err(DiscoveryError::Timeout(timeout)),
    };

    let payload = time::timeout(timeout, status_exchange(&mut conn, address, port))
        .await
        .map_err(|_| DiscoveryError::Timeout(timeout))??;

    parse_status(&payload)
}

/// Probe and wrap the outcome for reporting.
pub async fn probe_report(address: &str, port: u16, timeout: Duration) -> ProbeReport {
    let outcome = probe(address, port, timeout).await;
    let (status, error) = match outcome {
        Ok(status) => (Some(status), None),
        Err(e) => (None, Some(e.to_string())),
    };
    ProbeReport {
        port,
        verified: status.is_some(),
        status,
        error,
        timestamp: now_rfc3339(),
    }
}

/// Send handshake + status request over `conn` and return the raw JSON
/// payload of the response frame.
pub async fn status_exchange<S>(conn: &mut S, address: &str, port: u16) -> Result<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    let mut request = packet::build_handshake(address, port);
    request.extend_from_slice(&packet::build_status_request());
    conn.write_all(&request).await?;
    conn.flush().await?;

    let _frame_len = stream::read_varint(conn).await?;
    let _packet_id = stream::read_varint(conn).await?;
    let json_len = stream::read_varint(conn).await? as usize;
    if json_len > MAX_STATUS_PAYLOAD {
        return Err(DiscoveryError::PayloadTooLarge {
            len: json_len,
            max: MAX_STATUS_PAYLOAD,
        });
    }
    stream::read_exact(conn, json_len).await
}

/// Parse a status payload, accepting it only when both `description` and
/// `players` keys are present. Their shapes are not checked.
pub fn parse_status(payload: &[u8]) -> Result<ServerStatus> {
    let value: Value = serde_json::from_slice(payload)?;
    for field in ["description", "players"] {
        if value.get(field).is_none() {
            return Err(DiscoveryError::MissingField(field));
        }
    }
    Ok(ServerStatus::from_json(&value))
}

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::host::{HostInspector, SystemHost};
use crate::types::{now_rfc3339, Candidate, DiscoveryReport, ProcessInfo};
use crate::verifier::{PortVerifier, StatusPingVerifier};

/// Every probe goes to the loopback interface.
pub const LOOPBACK: &str = "127.0.0.1";

const MAX_CONCURRENCY: usize = 64;

/// Case-insensitive markers a process must carry to be worth probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFilter {
    /// Substring of the executable name.
    pub process_marker: String,
    /// Substring of at least one command-line argument.
    pub argument_marker: String,
}

impl Default for CandidateFilter {
    fn default() -> Self {
        Self {
            process_marker: "java".into(),
            argument_marker: "minecraft".into(),
        }
    }
}

impl CandidateFilter {
    pub fn matches(&self, process: &ProcessInfo) -> bool {
        let process_marker = self.process_marker.to_lowercase();
        let argument_marker = self.argument_marker.to_lowercase();
        process.name.to_lowercase().contains(&process_marker)
            && process
                .args
                .iter()
                .any(|arg| arg.to_lowercase().contains(&argument_marker))
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub filter: CandidateFilter,
    /// Bound on each connect and on each status exchange.
    pub timeout: Duration,
    /// 1 verifies candidates one after another; more runs a bounded pool.
    pub concurrency: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            filter: CandidateFilter::default(),
            timeout: Duration::from_secs(5),
            concurrency: 1,
        }
    }
}

/// Collect candidates from the host, ordered by ascending port.
///
/// A port owned by several processes is kept once. Processes that exited or
/// cannot be read are skipped; only a failure to read the socket table itself
/// is an error.
pub fn shortlist<H>(host: &H, filter: &CandidateFilter) -> Result<Vec<Candidate>>
where
    H: HostInspector + ?Sized,
{
    let mut sockets = host.listening_sockets()?;
    sockets.sort_by_key(|s| (s.port, s.pid));

    let mut described: HashMap<u32, Option<ProcessInfo>> = HashMap::new();
    let mut seen_ports = HashSet::new();
    let mut out = Vec::new();

    for socket in sockets {
        if seen_ports.contains(&socket.port) {
            continue;
        }
        let info = described
            .entry(socket.pid)
            .or_insert_with(|| match host.describe_process(socket.pid) {
                Ok(info) => Some(info),
                Err(e) => {
                    debug!(pid = socket.pid, error = %e, "skipping process");
                    None
                }
            });
        let Some(info) = info else {
            continue;
        };
        if !filter.matches(info) {
            continue;
        }
        seen_ports.insert(socket.port);
        out.push(Candidate {
            pid: socket.pid,
            port: socket.port,
            process_name: info.name.clone(),
            args: info.args.clone(),
        });
    }
    Ok(out)
}

/// Find and verify the local server port using the live host.
pub async fn find_candidate_port(options: &ScanOptions) -> Option<u16> {
    discover(options).await.port
}

/// Run discovery against the live host and report what was considered.
///
/// Socket and process enumeration are blocking calls, so they run on the
/// blocking pool.
pub async fn discover(options: &ScanOptions) -> DiscoveryReport {
    let filter = options.filter.clone();
    let shortlisted =
        match tokio::task::spawn_blocking(move || shortlist(&SystemHost::new(), &filter)).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "host inspection task failed");
                Ok(Vec::new())
            }
        };
    verify_shortlist(shortlisted, Arc::new(StatusPingVerifier), options).await
}

/// Discovery against an arbitrary host and verifier.
pub async fn discover_with<H, V>(host: &H, verifier: Arc<V>, options: &ScanOptions) -> DiscoveryReport
where
    H: HostInspector + ?Sized,
    V: PortVerifier + ?Sized + 'static,
{
    verify_shortlist(shortlist(host, &options.filter), verifier, options).await
}

pub async fn find_candidate_port_with<H, V>(
    host: &H,
    verifier: Arc<V>,
    options: &ScanOptions,
) -> Option<u16>
where
    H: HostInspector + ?Sized,
    V: PortVerifier + ?Sized + 'static,
{
    discover_with(host, verifier, options).await.port
}

async fn verify_shortlist<V>(
    shortlisted: Result<Vec<Candidate>>,
    verifier: Arc<V>,
    options: &ScanOptions,
) -> DiscoveryReport
where
    V: PortVerifier + ?Sized + 'static,
{
    let candidates = shortlisted.unwrap_or_else(|e| {
        warn!(error = %e, "could not enumerate listening sockets");
        Vec::new()
    });
    debug!(count = candidates.len(), "shortlisted candidates");

    let port = if options.concurrency > 1 {
        verify_concurrent(verifier, &candidates, options, CancellationToken::new()).await
    } else {
        verify_sequential(verifier.as_ref(), &candidates, options.timeout).await
    };

    match port {
        Some(port) => info!(port, "verified server port"),
        None => info!("no verified server port"),
    }

    DiscoveryReport {
        candidates,
        port,
        timestamp: now_rfc3339(),
    }
}

/// Probe candidates in order and stop at the first that verifies.
pub async fn verify_sequential<V>(verifier: &V, candidates: &[Candidate], timeout: Duration) -> Option<u16>
where
    V: PortVerifier + ?Sized,
{
    for candidate in candidates {
        debug!(pid = candidate.pid, port = candidate.port, "probing candidate");
        if verifier.verify(LOOPBACK, candidate.port, timeout).await {
            return Some(candidate.port);
        }
    }
    None
}

/// Probe candidates with at most `options.concurrency` in flight.
///
/// The first port to verify wins. Remaining probes are cancelled through
/// `cancel` and the task set is shut down before returning, so no probe
/// connection outlives the call.
pub async fn verify_concurrent<V>(
    verifier: Arc<V>,
    candidates: &[Candidate],
    options: &ScanOptions,
    cancel: CancellationToken,
) -> Option<u16>
where
    V: PortVerifier + ?Sized + 'static,
{
    let sem = Arc::new(Semaphore::new(options.concurrency.clamp(1, MAX_CONCURRENCY)));
    let mut set = JoinSet::new();

    for candidate in candidates {
        let port = candidate.port;
        let timeout = options.timeout;
        let sem = sem.clone();
        let verifier = verifier.clone();
        let cancel = cancel.clone();

        set.spawn(async move {
            let _permit = sem.acquire_owned().await.ok()?;
            if cancel.is_cancelled() {
                return None;
            }
            tokio::select! {
                _ = cancel.cancelled() => None,
                ok = verifier.verify(LOOPBACK, port, timeout) => ok.then_some(port),
            }
        });
    }

    let mut found = None;
    while let Some(res) = set.join_next().await {
        if let Ok(Some(port)) = res {
            found = Some(port);
            break;
        }
    }

    cancel.cancel();
    set.shutdown().await;
    found
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use mc_discover::host::{HostInspector, SystemHost};
use mc_discover::scanner::{
    discover_with, find_candidate_port_with, shortlist, CandidateFilter, ScanOptions,
};
use mc_discover::types::{ListeningSocket, ProcessInfo};
use mc_discover::verifier::PortVerifier;
use mc_discover::{DiscoveryError, Result};

#[derive(Default)]
struct FakeHost {
    sockets: Vec<ListeningSocket>,
    processes: HashMap<u32, ProcessInfo>,
    fail_table: bool,
}

impl FakeHost {
    fn with_process(mut self, pid: u32, name: &str, args: &[&str], ports: &[u16]) -> Self {
        self.processes.insert(
            pid,
            ProcessInfo {
                name: name.into(),
                args: args.iter().map(|s| s.to_string()).collect(),
            },
        );
        self.sockets
            .extend(ports.iter().map(|&port| ListeningSocket { pid, port }));
        self
    }

    fn with_orphan_socket(mut self, pid: u32, port: u16) -> Self {
        self.sockets.push(ListeningSocket { pid, port });
        self
    }
}

impl HostInspector for FakeHost {
    fn listening_sockets(&self) -> Result<Vec<ListeningSocket>> {
        if self.fail_table {
            return Err(DiscoveryError::SocketTable("permission denied".into()));
        }
        Ok(self.sockets.clone())
    }

    fn describe_process(&self, pid: u32) -> Result<ProcessInfo> {
        self.processes
            .get(&pid)
            .cloned()
            .ok_or(DiscoveryError::ProcessUnavailable { pid })
    }
}

/// Records every port it is asked about; accepts only `accept`.
struct RecordingVerifier {
    accept: Vec<u16>,
    attempts: Mutex<Vec<u16>>,
    delay: Duration,
}

impl RecordingVerifier {
    fn accepting(accept: &[u16]) -> Self {
        Self {
            accept: accept.to_vec(),
            attempts: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    fn attempts(&self) -> Vec<u16> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PortVerifier for RecordingVerifier {
    async fn verify(&self, address: &str, port: u16, _timeout: Duration) -> bool {
        assert_eq!(address, "127.0.0.1");
        self.attempts.lock().unwrap().push(port);
        if self.accept.contains(&port) {
            true
        } else {
            tokio::time::sleep(self.delay).await;
            false
        }
    }
}

fn minecraft_args() -> &'static [&'static str] {
    &["-Xmx4G", "-Dminecraft.client.jar=client.jar", "net.minecraft.client.main.Main"]
}

#[tokio::test]
async fn stops_after_first_verified_candidate() {
    let host = FakeHost::default()
        .with_process(10, "java", minecraft_args(), &[50001])
        .with_process(11, "java", minecraft_args(), &[50002])
        .with_process(12, "java", minecraft_args(), &[50003]);
    let verifier = Arc::new(RecordingVerifier::accepting(&[50002]));

    let port = find_candidate_port_with(&host, verifier.clone(), &ScanOptions::default()).await;

    assert_eq!(port, Some(50002));
    assert_eq!(verifier.attempts(), vec![50001, 50002]);
}

#[tokio::test]
async fn no_matching_process_yields_none() {
    let host = FakeHost::default()
        .with_process(20, "java", &["-jar", "other.jar"], &[8080])
        .with_process(21, "node", &["minecraft-proxy.js"], &[25565]);
    let verifier = Arc::new(RecordingVerifier::accepting(&[8080, 25565]));

    let port = find_candidate_port_with(&host, verifier.clone(), &ScanOptions::default()).await;

    assert_eq!(port, None);
    assert!(verifier.attempts().is_empty());
}

#[tokio::test]
async fn empty_socket_table_yields_none() {
    let verifier = Arc::new(RecordingVerifier::accepting(&[25565]));
    let port =
        find_candidate_port_with(&FakeHost::default(), verifier, &ScanOptions::default()).await;
    assert_eq!(port, None);
}

#[tokio::test]
async fn unreadable_socket_table_is_absence_not_error() {
    let host = FakeHost {
        fail_table: true,
        ..FakeHost::default()
    };
    let verifier = Arc::new(RecordingVerifier::accepting(&[25565]));
    let report = discover_with(&host, verifier, &ScanOptions::default()).await;
    assert_eq!(report.port, None);
    assert!(report.candidates.is_empty());
}

#[test]
fn shortlist_skips_vanished_processes_and_sorts_by_port() {
    let host = FakeHost::default()
        .with_orphan_socket(99, 40000)
        .with_process(30, "javaw.exe", minecraft_args(), &[61000, 25565])
        .with_process(31, "java", minecraft_args(), &[25565]);

    let candidates = shortlist(&host, &CandidateFilter::default()).unwrap();
    let ports: Vec<(u32, u16)> = candidates.iter().map(|c| (c.pid, c.port)).collect();

    // 25565 is listed once, for the lower pid.
    assert_eq!(ports, vec![(30, 25565), (30, 61000)]);
    assert_eq!(candidates[0].process_name, "javaw.exe");
}

#[test]
fn shortlist_propagates_socket_table_failure() {
    let host = FakeHost {
        fail_table: true,
        ..FakeHost::default()
    };
    let err = shortlist(&host, &CandidateFilter::default()).unwrap_err();
    assert!(matches!(err, DiscoveryError::SocketTable(_)));
}

#[tokio::test]
async fn concurrent_scan_returns_winner_and_cancels_slow_probes() {
    let host = FakeHost::default()
        .with_process(40, "java", minecraft_args(), &[50010, 50011, 50012, 50013]);
    let verifier = Arc::new(RecordingVerifier {
        delay: Duration::from_secs(30),
        ..RecordingVerifier::accepting(&[50012])
    });
    let options = ScanOptions {
        concurrency: 4,
        ..ScanOptions::default()
    };

    let started = Instant::now();
    let port = find_candidate_port_with(&host, verifier, &options).await;

    assert_eq!(port, Some(50012));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn live_host_lists_own_listener_as_candidate() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    // This binary is named `scanner_tests-<hash>`, and argv[0] carries the same name.
    let argv0 = std::env::args().next().unwrap();
    assert!(argv0.contains("scanner_tests"));
    let filter = CandidateFilter {
        process_marker: "scanner_tests".into(),
        argument_marker: "scanner_tests".into(),
    };

    let candidates = shortlist(&SystemHost::new(), &filter).unwrap();
    let own = candidates
        .iter()
        .find(|c| c.port == port)
        .expect("own listener is shortlisted");
    assert_eq!(own.pid, std::process::id());
    assert!(!own.args.is_empty());
    drop(listener);
}

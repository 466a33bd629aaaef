//! Library crate for mc-discover: finds a local Minecraft Java server and
//! verifies it with a handshake/status ping.
pub mod config;
pub mod error;
pub mod host;
pub mod packet;
pub mod scanner;
pub mod server;
pub mod stream;
pub mod types;
pub mod varint;
pub mod verifier;

pub use error::{DiscoveryError, Result};
pub use scanner::{find_candidate_port, CandidateFilter, ScanOptions};

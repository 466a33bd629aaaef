//! Host inspection: which local sockets are listening and who owns them.

use netstat2::{get_sockets_info, AddressFamilyFlags, ProtocolFlags, ProtocolSocketInfo, TcpState};
use sysinfo::{Pid, ProcessRefreshKind, System};

use crate::error::{DiscoveryError, Result};
use crate::types::{ListeningSocket, ProcessInfo};

/// OS-facing capability consumed by the scanner.
pub trait HostInspector {
    /// Every listening TCP socket, one entry per owning pid.
    fn listening_sockets(&self) -> Result<Vec<ListeningSocket>>;

    /// Name and arguments of `pid`. Fails with `ProcessUnavailable` when the
    /// process has exited or cannot be read.
    fn describe_process(&self, pid: u32) -> Result<ProcessInfo>;
}

/// Inspector backed by the live socket table and process list.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

impl SystemHost {
    pub fn new() -> Self {
        Self
    }
}

impl HostInspector for SystemHost {
    fn listening_sockets(&self) -> Result<Vec<ListeningSocket>> {
        let af_flags = AddressFamilyFlags::IPV4 | AddressFamilyFlags::IPV6;
        let sockets = get_sockets_info(af_flags, ProtocolFlags::TCP)
            .map_err(|e| DiscoveryError::SocketTable(e.to_string()))?;

        let mut out = Vec::new();
        for socket in sockets {
            let ProtocolSocketInfo::Tcp(tcp) = socket.protocol_socket_info else {
                continue;
            };
            if tcp.state != TcpState::Listen {
                continue;
            }
            for pid in socket.associated_pids {
                out.push(ListeningSocket {
                    pid,
                    port: tcp.local_port,
                });
            }
        }
        Ok(out)
    }

    fn describe_process(&self, pid: u32) -> Result<ProcessInfo> {
        let pid_key = Pid::from_u32(pid);
        let mut system = System::new();
        // A plain refresh leaves the command line empty.
        if !system.refresh_process_specifics(pid_key, ProcessRefreshKind::everything()) {
            return Err(DiscoveryError::ProcessUnavailable { pid });
        }
        let process = system
            .process(pid_key)
            .ok_or(DiscoveryError::ProcessUnavailable { pid })?;
        Ok(ProcessInfo {
            name: process.name().to_string(),
            args: process.cmd().to_vec(),
        })
    }
}

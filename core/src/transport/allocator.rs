//! Free local port allocation.

use std::collections::HashSet;
use std::net::{Ipv4Addr, TcpListener};

use tracing::debug;

use crate::error::{Error, Result};

/// Picks `count` distinct local ports that are free right now.
///
/// Each port comes from binding `127.0.0.1:0`. The listeners of one batch are
/// held until the batch is complete, so the OS cannot hand out the same port
/// twice, and then released. Nothing stays reserved: another process may take
/// a port before the tunnel binds it.
pub fn allocate_free_ports(count: usize) -> Result<Vec<u16>> {
    let mut listeners = Vec::with_capacity(count);
    for _ in 0..count {
        let listener =
            TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).map_err(Error::PortAllocation)?;
        listeners.push(listener);
    }

    let ports = listeners
        .iter()
        .map(|l| l.local_addr().map(|addr| addr.port()))
        .collect::<std::io::Result<Vec<u16>>>()
        .map_err(Error::PortAllocation)?;

    let distinct: HashSet<u16> = ports.iter().copied().collect();
    if distinct.len() != ports.len() {
        return Err(Error::PortAllocation(std::io::Error::new(
            std::io::ErrorKind::AddrInUse,
            "OS returned the same port twice",
        )));
    }

    debug!(?ports, "Allocated local ports");
    Ok(ports)
}

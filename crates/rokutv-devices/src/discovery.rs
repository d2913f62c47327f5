//! Finding Roku devices on the local network.
//!
//! Supports two methods:
//! - SSDP `M-SEARCH` for `roku:ecp` on the standard multicast group
//! - A static address list from configuration

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rokutv_core::{DeviceAddress, DeviceError};
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::controller::{DeviceController, DeviceDiscoverer, DeviceResult};
use crate::ecp::EcpClient;
use crate::timeout::TimedController;

/// SSDP multicast group and port.
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250:1900";

/// Search target Roku devices answer to.
pub const ROKU_SEARCH_TARGET: &str = "roku:ecp";

fn m_search_request() -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         ST: {}\r\n\
         MX: 3\r\n\r\n",
        SSDP_MULTICAST_ADDR, ROKU_SEARCH_TARGET
    )
}

/// Extract the device address from an SSDP response's `LOCATION` header.
pub fn parse_ssdp_location(response: &str) -> Option<DeviceAddress> {
    response.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("location") {
            value.trim().parse::<DeviceAddress>().ok()
        } else {
            None
        }
    })
}

fn shared_client() -> Client {
    Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap_or_default()
}

fn timed_ecp(client: &Client, address: &DeviceAddress, timeout: Duration) -> Arc<dyn DeviceController> {
    Arc::new(TimedController::new(
        EcpClient::with_client(address.clone(), client.clone()),
        timeout,
    ))
}

/// SSDP-based discovery.
pub struct SsdpDiscoverer {
    /// How long to collect responses
    window: Duration,
    /// Per-call deadline for controllers handed out by `connect`
    request_timeout: Duration,
    client: Client,
}

impl SsdpDiscoverer {
    pub fn new(window: Duration, request_timeout: Duration) -> Self {
        Self {
            window,
            request_timeout,
            client: shared_client(),
        }
    }
}

#[async_trait]
impl DeviceDiscoverer for SsdpDiscoverer {
    async fn discover_all(&self) -> DeviceResult<Vec<DeviceAddress>> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| DeviceError::Unreachable(format!("Cannot bind SSDP socket: {}", e)))?;
        let target: SocketAddr = SSDP_MULTICAST_ADDR
            .parse()
            .map_err(|e| DeviceError::Protocol(format!("Bad SSDP address: {}", e)))?;

        let request = m_search_request();
        // UDP is lossy; a second probe costs nothing.
        for _ in 0..2 {
            socket
                .send_to(request.as_bytes(), target)
                .await
                .map_err(|e| DeviceError::Unreachable(format!("SSDP send failed: {}", e)))?;
        }

        let deadline = Instant::now() + self.window;
        let mut found: Vec<DeviceAddress> = Vec::new();
        let mut buf = [0u8; 2048];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await {
                Ok(Ok((len, from))) => {
                    let response = String::from_utf8_lossy(&buf[..len]);
                    match parse_ssdp_location(&response) {
                        Some(address) if !found.contains(&address) => {
                            debug!(%from, %address, "SSDP response");
                            found.push(address);
                        }
                        Some(_) => {}
                        None => debug!(%from, "SSDP response without usable LOCATION"),
                    }
                }
                Ok(Err(e)) => {
                    warn!("SSDP receive failed: {}", e);
                    break;
                }
                Err(_) => break,
            }
        }

        info!("SSDP discovery found {} device(s)", found.len());
        Ok(found)
    }

    fn connect(&self, address: &DeviceAddress) -> Arc<dyn DeviceController> {
        timed_ecp(&self.client, address, self.request_timeout)
    }
}

/// Discovery from a fixed list of addresses.
pub struct StaticDiscoverer {
    addresses: Vec<DeviceAddress>,
    request_timeout: Duration,
    client: Client,
}

impl StaticDiscoverer {
    pub fn new(addresses: Vec<DeviceAddress>, request_timeout: Duration) -> Self {
        Self {
            addresses,
            request_timeout,
            client: shared_client(),
        }
    }
}

#[async_trait]
impl DeviceDiscoverer for StaticDiscoverer {
    async fn discover_all(&self) -> DeviceResult<Vec<DeviceAddress>> {
        Ok(self.addresses.clone())
    }

    fn connect(&self, address: &DeviceAddress) -> Arc<dyn DeviceController> {
        timed_ecp(&self.client, address, self.request_timeout)
    }
}

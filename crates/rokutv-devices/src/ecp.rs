//! Roku External Control Protocol client.
//!
//! ECP is plain HTTP on port 8060: `GET /query/*` returns XML, `POST
//! /keypress/{key}` and `POST /launch/{id}` return an empty body.

use async_trait::async_trait;
use reqwest::Client;
use rokutv_core::{DeviceAddress, DeviceError, DeviceInfo, DeviceKey, RawApp, VolumeDirection};
use tracing::debug;

use crate::controller::{DeviceController, DeviceResult};
use crate::xml;

/// ECP key name for the mute toggle.
const VOLUME_MUTE: &str = "VolumeMute";

pub struct EcpClient {
    address: DeviceAddress,
    base_url: String,
    client: Client,
}

impl EcpClient {
    pub fn new(address: DeviceAddress) -> Self {
        let client = Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .unwrap_or_default();
        Self::with_client(address, client)
    }

    /// Share an existing HTTP client (connection pool, TLS config).
    pub fn with_client(address: DeviceAddress, client: Client) -> Self {
        Self {
            base_url: address.base_url(),
            address,
            client,
        }
    }

    async fn get_xml(&self, path: &str) -> DeviceResult<String> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DeviceError::Unreachable(format!("GET {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(DeviceError::Protocol(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| DeviceError::Protocol(format!("Reading {} failed: {}", url, e)))
    }

    async fn post(&self, path: &str) -> DeviceResult<reqwest::StatusCode> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(device = %self.address, "POST {}", path);
        let response = self
            .client
            .post(&url)
            .body("")
            .send()
            .await
            .map_err(|e| DeviceError::Unreachable(format!("POST {} failed: {}", url, e)))?;
        Ok(response.status())
    }

    async fn keypress(&self, key_name: &str) -> DeviceResult<()> {
        let status = self.post(&format!("keypress/{}", key_name)).await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(DeviceError::Protocol(format!(
                "keypress/{} returned {}",
                key_name, status
            )))
        }
    }
}

#[async_trait]
impl DeviceController for EcpClient {
    fn address(&self) -> &DeviceAddress {
        &self.address
    }

    async fn query_info(&self) -> DeviceResult<DeviceInfo> {
        let body = self.get_xml("query/device-info").await?;
        xml::parse_device_info(&body)
    }

    async fn query_apps(&self) -> DeviceResult<Vec<RawApp>> {
        let body = self.get_xml("query/apps").await?;
        xml::parse_apps(&body)
    }

    async fn query_active_app(&self) -> DeviceResult<Option<String>> {
        let body = self.get_xml("query/active-app").await?;
        xml::parse_active_app(&body)
    }

    async fn launch(&self, remote_id: &str) -> DeviceResult<()> {
        let status = self.post(&format!("launch/{}", remote_id)).await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(DeviceError::LaunchFailed {
                app_id: remote_id.to_string(),
                reason: format!("device returned {}", status),
            })
        }
    }

    async fn send_key(&self, key: DeviceKey) -> DeviceResult<()> {
        self.keypress(key.ecp_name()).await
    }

    async fn set_volume(&self, direction: VolumeDirection) -> DeviceResult<()> {
        self.keypress(direction.ecp_name()).await
    }

    async fn mute(&self) -> DeviceResult<()> {
        self.keypress(VOLUME_MUTE).await
    }
}

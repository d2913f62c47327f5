//! Per-call deadline for device controllers.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rokutv_core::{DeviceAddress, DeviceError, DeviceInfo, DeviceKey, RawApp, VolumeDirection};
use tracing::warn;

use crate::controller::{DeviceController, DeviceResult};

/// Wraps a controller so no call can hang longer than `timeout`.
pub struct TimedController<C> {
    inner: C,
    timeout: Duration,
}

impl<C: DeviceController> TimedController<C> {
    pub fn new(inner: C, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    async fn guard<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = DeviceResult<T>> + Send,
    ) -> DeviceResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                let millis = self.timeout.as_millis() as u64;
                warn!(
                    device = %self.inner.address(),
                    operation,
                    "Device call timed out after {}ms",
                    millis
                );
                Err(DeviceError::Timeout(millis))
            }
        }
    }
}

#[async_trait]
impl<C: DeviceController> DeviceController for TimedController<C> {
    fn address(&self) -> &DeviceAddress {
        self.inner.address()
    }

    async fn query_info(&self) -> DeviceResult<DeviceInfo> {
        self.guard("query_info", self.inner.query_info()).await
    }

    async fn query_apps(&self) -> DeviceResult<Vec<RawApp>> {
        self.guard("query_apps", self.inner.query_apps()).await
    }

    async fn query_active_app(&self) -> DeviceResult<Option<String>> {
        self.guard("query_active_app", self.inner.query_active_app())
            .await
    }

    async fn launch(&self, remote_id: &str) -> DeviceResult<()> {
        self.guard("launch", self.inner.launch(remote_id)).await
    }

    async fn send_key(&self, key: DeviceKey) -> DeviceResult<()> {
        self.guard("send_key", self.inner.send_key(key)).await
    }

    async fn set_volume(&self, direction: VolumeDirection) -> DeviceResult<()> {
        self.guard("set_volume", self.inner.set_volume(direction))
            .await
    }

    async fn mute(&self) -> DeviceResult<()> {
        self.guard("mute", self.inner.mute()).await
    }
}

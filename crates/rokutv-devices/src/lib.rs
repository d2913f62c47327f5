//! Device transport for Roku TVs.
//!
//! ## Architecture
//!
//! - **DeviceController**: per-device command/query interface
//! - **EcpClient**: `DeviceController` over the External Control Protocol
//! - **TimedController**: per-call deadline around any controller
//! - **DeviceDiscoverer**: finds devices (SSDP or a static list) and connects
//!   to them

pub mod controller;
pub mod discovery;
pub mod ecp;
pub mod timeout;
pub mod xml;

pub use controller::{DeviceController, DeviceDiscoverer, DeviceResult};
pub use discovery::{parse_ssdp_location, SsdpDiscoverer, StaticDiscoverer};
pub use ecp::EcpClient;
pub use timeout::TimedController;

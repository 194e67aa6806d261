//! Aterm device model and the query protocol used to identify one

pub mod mode;
pub mod protocol;

use serde::Serialize;
use std::net::IpAddr;

pub use mode::Mode;
pub use protocol::{DeviceClient, DeviceProbe};

/// An identified Aterm device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    /// Address the device answered on
    pub address: IpAddr,

    /// Product name as reported by the device, e.g. `WX3600HP`
    pub product_name: String,

    /// Current operating mode
    pub system_mode: Mode,
}

impl Device {
    pub fn new(address: IpAddr, product_name: impl Into<String>, system_mode: Mode) -> Self {
        Self {
            address,
            product_name: product_name.into(),
            system_mode,
        }
    }
}

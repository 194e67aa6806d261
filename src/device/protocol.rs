//! Device query protocol
//!
//! Aterm devices answer a small unauthenticated query endpoint:
//!
//! ```text
//! POST /aterm_httpif.cgi/getparamcmd_no_auth
//! Content-Type: application/x-www-form-urlencoded
//!
//! REQ_ID=PRODUCT_NAME_GET
//! ```
//!
//! and reply with a `NAME=VALUE` body such as `PRODUCT_NAME=WX3600HP`.
//! Identifying a device takes two such exchanges: product name first, then
//! system mode.

use super::{Device, Mode};
use crate::error::{ScanError, ScanResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::net::{IpAddr, SocketAddr};

/// Path of the unauthenticated query endpoint
pub const ENDPOINT_PATH: &str = "/aterm_httpif.cgi/getparamcmd_no_auth";

pub const PRODUCT_NAME_GET: &str = "PRODUCT_NAME_GET";
pub const PRODUCT_NAME: &str = "PRODUCT_NAME";
pub const SYS_MODE_GET: &str = "SYS_MODE_GET";
pub const SYSTEM_MODE: &str = "SYSTEM_MODE";

/// Anything that can turn an address into an identified device.
///
/// The scanner only talks to this trait; [`DeviceClient`] is the HTTP
/// implementation.
#[async_trait]
pub trait DeviceProbe: Send + Sync {
    /// Identify the device at `addr`, or explain why it is not one.
    async fn identify(&self, addr: IpAddr) -> ScanResult<Device>;
}

/// HTTP client for the device query endpoint
#[derive(Debug, Clone)]
pub struct DeviceClient {
    client: reqwest::Client,
    port: u16,
}

impl DeviceClient {
    /// Create a client talking to the given HTTP port.
    ///
    /// System proxies are bypassed: the targets are LAN addresses.
    pub fn new(port: u16) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| ScanError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn endpoint(&self, addr: IpAddr) -> String {
        format!("http://{}{}", SocketAddr::new(addr, self.port), ENDPOINT_PATH)
    }

    /// Request a single parameter and return its trimmed value.
    pub async fn fetch_param(
        &self,
        addr: IpAddr,
        request_id: &str,
        expected_name: &str,
    ) -> ScanResult<String> {
        let url = self.endpoint(addr);
        let response = self
            .client
            .post(&url)
            .form(&[("REQ_ID", request_id)])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ScanError::Protocol(format!(
                "the request to {} for addr {} returns {}, expected 200",
                url,
                addr,
                status.as_u16()
            )));
        }

        let body = response.text().await?;
        parse_param_body(&body, expected_name)
    }

    /// Product name of the device at `addr`
    pub async fn fetch_product_name(&self, addr: IpAddr) -> ScanResult<String> {
        self.fetch_param(addr, PRODUCT_NAME_GET, PRODUCT_NAME).await
    }

    /// Operating mode of the device at `addr`
    pub async fn fetch_system_mode(&self, addr: IpAddr) -> ScanResult<Mode> {
        let value = self.fetch_param(addr, SYS_MODE_GET, SYSTEM_MODE).await?;
        parse_system_mode(&value)
    }
}

#[async_trait]
impl DeviceProbe for DeviceClient {
    async fn identify(&self, addr: IpAddr) -> ScanResult<Device> {
        let product_name = self.fetch_product_name(addr).await?;
        let system_mode = self.fetch_system_mode(addr).await?;

        Ok(Device {
            address: addr,
            product_name,
            system_mode,
        })
    }
}

/// Split a `NAME=VALUE` reply and check the name.
pub fn parse_param_body(body: &str, expected_name: &str) -> ScanResult<String> {
    match body.split_once('=') {
        Some((name, value)) if name == expected_name => Ok(value.trim().to_string()),
        _ => Err(ScanError::Protocol(format!(
            "unexpected param name, want {:?}: got body {:?}",
            expected_name, body
        ))),
    }
}

/// Decode a base-10 mode value.
pub fn parse_system_mode(value: &str) -> ScanResult<Mode> {
    let code: i64 = value
        .parse()
        .map_err(|e| ScanError::Protocol(format!("invalid system mode format {:?}: {}", value, e)))?;
    Mode::lookup(code)
}

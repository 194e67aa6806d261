//! atermscan - find NEC Aterm devices on the local network
//!
//! Every address of a target range is asked, over the devices'
//! unauthenticated HTTP query endpoint, for its product name and operating
//! mode. Probes run concurrently under a configurable limit, and the devices
//! that answer correctly are streamed back as they are identified.
//!
//! ```no_run
//! use atermscan::{ScanConfig, ScanEngine};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> atermscan::Result<()> {
//! let engine = ScanEngine::new(ScanConfig::new("192.168.10.0/24"))?;
//! let mut devices = engine.scan(CancellationToken::new()).await?;
//! while let Some(device) = devices.next().await {
//!     println!("{} {} {}", device.address, device.product_name, device.system_mode);
//! }
//! devices.finish().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod output;
pub mod scanner;
pub mod utils;

// Re-export commonly used types
pub use config::ScanConfig;
pub use device::{Device, DeviceClient, DeviceProbe, Mode};
pub use error::{ScanError, ScanResult};
pub use scanner::{DeviceStream, ScanEngine, ScanSummary};
pub use utils::target_parser::{resolve, AddressRange};

pub type Result<T> = std::result::Result<T, ScanError>;

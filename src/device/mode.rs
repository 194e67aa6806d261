//! Operating modes reported by `SYS_MODE_GET`
//!
//! The table mirrors the numbering used by the device firmware, so the order
//! of [`MODES`] is part of the wire protocol.

use crate::error::ScanError;
use serde::Serialize;
use std::fmt;

/// Operating mode of an Aterm device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Mode {
    pub code: u8,
    pub name: &'static str,
    pub name_ja: &'static str,
}

impl Mode {
    const fn new(code: u8, name: &'static str, name_ja: &'static str) -> Self {
        Self { code, name, name_ja }
    }

    /// Look up a mode by the numeric code the device reports.
    pub fn lookup(code: i64) -> crate::Result<Mode> {
        usize::try_from(code)
            .ok()
            .and_then(|index| MODES.get(index))
            .copied()
            .ok_or(ScanError::UnsupportedMode(code))
    }

    /// All known modes, ordered by code
    pub fn all() -> &'static [Mode] {
        &MODES
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub const BRIDGE: Mode = Mode::new(0, "Bridge", "ブリッジ");
pub const PPPOE_ROUTER: Mode = Mode::new(1, "PPPoE Router", "PPPoEルーター");
pub const LOCAL_ROUTER: Mode = Mode::new(2, "Local Router", "ローカルルーター");
pub const WIRELESS_LAN_ADAPTER: Mode = Mode::new(3, "Wireless LAN Adapter", "無線LAN子機");
pub const WIRELESS_LAN_REPEATER: Mode = Mode::new(4, "Wireless LAN Repeater", "無線LAN中継器");
pub const MAP_E: Mode = Mode::new(5, "MAP-E", "MAP-E");
pub const XLAT_464: Mode = Mode::new(6, "464XLAT", "464XLAT");
pub const DS_LITE: Mode = Mode::new(7, "DS-Lite", "DS-Lite");
pub const FIXED_IP: Mode = Mode::new(8, "Fixed IP 1", "固定IP1");
pub const MULTIPLE_FIXED_IPS: Mode = Mode::new(9, "Multiple Fixed IPs", "複数固定IP");
pub const MESH_REPEATER: Mode = Mode::new(10, "Mesh Repeater", "メッシュ中継器");

/// Mode table indexed by code
pub static MODES: [Mode; 11] = [
    BRIDGE,
    PPPOE_ROUTER,
    LOCAL_ROUTER,
    WIRELESS_LAN_ADAPTER,
    WIRELESS_LAN_REPEATER,
    MAP_E,
    XLAT_464,
    DS_LITE,
    FIXED_IP,
    MULTIPLE_FIXED_IPS,
    MESH_REPEATER,
];

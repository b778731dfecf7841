use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Nintendo vendor id.
pub const VENDOR_ID: u16 = 0x057e;
/// GameCube-style USB controller.
pub const PRODUCT_ID: u16 = 0x2073;

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceIds {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl Default for DeviceIds {
    fn default() -> Self {
        Self {
            vendor_id: VENDOR_ID,
            product_id: PRODUCT_ID,
        }
    }
}

/// Runtime tunables, loaded from `settings.toml` next to the calibration record.
///
/// `read_timeout_ms` trades input latency against idle CPU: the read loop wakes at least
/// once per timeout to check its stop flag, so it also bounds how long a disconnect takes.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BridgeSettings {
    pub device: DeviceIds,
    pub read_timeout_ms: u64,
    pub stop_timeout_ms: u64,
    /// Every n-th frame is forwarded to the UI.
    pub presentation_divisor: u32,
    pub stats_interval_secs: i64,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            device: DeviceIds::default(),
            read_timeout_ms: 10,
            stop_timeout_ms: 1000,
            presentation_divisor: 3,
            stats_interval_secs: 10,
        }
    }
}

impl BridgeSettings {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.max(1))
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

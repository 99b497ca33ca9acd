//! Device identity for topic headers.
//!
//! The header is `osm/<ID>` where `<ID>` is the 32-bit unique id in eight
//! uppercase hex digits. Without an id (no eFuse MAC, host builds) the
//! header falls back to `osm/unknown`. The client id sent to the broker
//! is `osm-0x<ID>` (see `dialect::CommandArgs::device_tag`).

use core::fmt::Write;

use crate::fsm::session::Topic;

pub const TOPIC_ROOT: &str = "osm";

/// Build the per-device topic header.
pub fn topic_header(unique_id: Option<u32>) -> Topic {
    let mut header = Topic::new();
    // Both forms are well under the topic capacity.
    let _ = match unique_id {
        Some(id) => write!(header, "{}/{:08X}", TOPIC_ROOT, id),
        None => write!(header, "{}/unknown", TOPIC_ROOT),
    };
    header
}

/// 32-bit id folded from the factory MAC (last four bytes).
#[cfg(target_os = "espidf")]
pub fn read_unique_id() -> Option<u32> {
    let mut mac = [0u8; 6];
    // SAFETY: the buffer is the 6 bytes the API writes.
    let err = unsafe { esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr()) };
    if err != esp_idf_svc::sys::ESP_OK {
        return None;
    }
    Some(u32::from_be_bytes([mac[2], mac[3], mac[4], mac[5]]))
}

/// Simulation: no hardware id.
#[cfg(not(target_os = "espidf"))]
pub fn read_unique_id() -> Option<u32> {
    None
}

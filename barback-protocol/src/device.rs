//! Device identity
//!
//! Each rig names itself after the tail of its Wi-Fi MAC address so several
//! rigs can share one broker.

use core::fmt::Write;

use heapless::String;

/// Default device id prefix
pub const DEFAULT_ID_PREFIX: &str = "bar_";

/// Maximum device id length
pub const MAX_DEVICE_ID_LEN: usize = 24;

/// Device identifier, e.g. `bar_A1B2C3`
pub type DeviceId = String<MAX_DEVICE_ID_LEN>;

/// Build a device id from a prefix and the last three MAC bytes
///
/// Hex digits are upper-case. An overlong prefix is truncated so the MAC
/// suffix always fits.
pub fn device_id_from_mac(prefix: &str, mac: &[u8; 6]) -> DeviceId {
    const SUFFIX_LEN: usize = 6;

    let mut id = DeviceId::new();
    for c in prefix.chars() {
        if id.len() + c.len_utf8() > MAX_DEVICE_ID_LEN - SUFFIX_LEN {
            break;
        }
        let _ = id.push(c);
    }
    let _ = write!(id, "{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}

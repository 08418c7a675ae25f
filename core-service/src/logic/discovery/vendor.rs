//! OUI vendor fallback
//!
//! Used when the scanner reports no vendor for a MAC address.

use crate::logic::device::UNKNOWN_VENDOR;

const OUI_VENDORS: &[(&str, &str)] = &[
    ("00:1A:2B", "Cisco"),
    ("3C:5A:B4", "Google"),
    ("F4:F5:D8", "Apple"),
    ("DC:A6:32", "Raspberry Pi"),
    ("B8:27:EB", "Raspberry Pi"),
    ("44:65:0D", "Amazon"),
    ("E4:F0:42", "Samsung"),
    ("00:11:22", "TP-Link"),
];

pub fn lookup_vendor(mac: &str) -> &'static str {
    let normalized = mac.trim().to_uppercase().replace('-', ":");
    let Some(oui) = normalized.get(0..8) else {
        return UNKNOWN_VENDOR;
    };

    OUI_VENDORS
        .iter()
        .find(|(prefix, _)| *prefix == oui)
        .map(|(_, vendor)| *vendor)
        .unwrap_or(UNKNOWN_VENDOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_vendor() {
        assert_eq!(lookup_vendor("b8:27:eb:12:34:56"), "Raspberry Pi");
        assert_eq!(lookup_vendor("F4-F5-D8-00-00-01"), "Apple");
        assert_eq!(lookup_vendor("02:00:00:00:00:01"), "Unknown");
        assert_eq!(lookup_vendor(""), "Unknown");
    }
}

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

use super::calculate_key_tag;
use crate::dns::{RecordType, normalize_name};
use crate::error::{AuthGraphError, Result};

/// Root KSK-2017 (key tag 20326)
const ROOT_KSK_2017: &str = "AwEAAaz/tAm8yTn4Mfeh5eyI96WSVexTBAvkMgJzkKTOiW1vkIbzxeF3+/4RgWOq7HrxRixHlFlExOLAJr5emLvN7SWXgnLh4+B5xQlNVz8Og8kvArMtNROxVQuCaSnIDdD5LKyWbRd2n9WGe2R8PzgCmr3EgVLrjyBxWezF0jLHwVN8efS3rCj/EWgvIWgb9tarpVUDK/b58Da+sqqls3eNbuv7pr+eoZG+SrDK6nWeL3c6H5Apxz7LjVc1uTIdsIXxuOLYA4/ilBmSVIzuDWfdRUfhHdY6+cn8HFRm+2hM8AnXGXws9555KrUB5qihylGa8subX2Nn6UwNR1AkUTV74bU=";

/// A configured trust anchor: a DNSKEY (or a bare key tag taken from a DS)
/// that is trusted without further verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    /// Zone the anchor applies to, in fully qualified form
    pub zone: String,
    /// Key tag, derived from the key material when it is present
    pub key_tag: u16,
    /// Algorithm number
    pub algorithm: u8,
    /// Public key material; `None` for key-tag-only anchors
    pub public_key: Option<Vec<u8>>,
    /// Flags (usually 257 for a KSK)
    pub flags: u16,
    /// Protocol (always 3 for DNSSEC)
    pub protocol: u8,
}

impl TrustAnchor {
    /// Create an anchor from DNSKEY material
    pub fn from_dnskey(zone: &str, flags: u16, protocol: u8, algorithm: u8, public_key: Vec<u8>) -> Self {
        let key_tag = calculate_key_tag(flags, protocol, algorithm, &public_key);
        Self {
            zone: normalize_name(zone),
            key_tag,
            algorithm,
            public_key: Some(public_key),
            flags,
            protocol,
        }
    }

    /// Create an anchor that only pins algorithm and key tag
    pub fn from_key_tag(zone: &str, algorithm: u8, key_tag: u16) -> Self {
        Self {
            zone: normalize_name(zone),
            key_tag,
            algorithm,
            public_key: None,
            flags: 257,
            protocol: 3,
        }
    }

    /// Check whether a DNSKEY with the given identity is this anchor
    pub fn matches(&self, algorithm: u8, key_tag: u16, public_key: &[u8]) -> bool {
        self.algorithm == algorithm
            && self.key_tag == key_tag
            && self
                .public_key
                .as_deref()
                .is_none_or(|key| key == public_key)
    }
}

/// Trust anchors keyed by zone name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustAnchorSet {
    anchors: BTreeMap<String, Vec<TrustAnchor>>,
}

impl TrustAnchorSet {
    /// Create an empty anchor set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an anchor set holding the current root KSK
    pub fn with_root_anchor() -> Self {
        let mut set = Self::new();
        // the constant is well-formed base64, decoding cannot fail
        if let Ok(key) = STANDARD.decode(ROOT_KSK_2017) {
            set.add_anchor(TrustAnchor::from_dnskey(".", 257, 3, 8, key));
        }
        set
    }

    /// Add a trust anchor, ignoring exact duplicates
    pub fn add_anchor(&mut self, anchor: TrustAnchor) {
        let entry = self.anchors.entry(anchor.zone.clone()).or_default();
        if !entry.contains(&anchor) {
            debug!(
                "Adding trust anchor {} alg {} tag {}",
                anchor.zone, anchor.algorithm, anchor.key_tag
            );
            entry.push(anchor);
        }
    }

    /// Get trust anchors configured for exactly this zone
    pub fn anchors_for(&self, zone: &str) -> &[TrustAnchor] {
        self.anchors
            .get(&normalize_name(zone))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterate zones with anchors, in canonical order
    pub fn zones(&self) -> impl Iterator<Item = &str> {
        self.anchors.keys().map(String::as_str)
    }

    /// Find a trust anchor by key tag
    pub fn find_by_key_tag(&self, zone: &str, key_tag: u16) -> Option<&TrustAnchor> {
        self.anchors_for(zone)
            .iter()
            .find(|anchor| anchor.key_tag == key_tag)
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Get the number of zones with trust anchors
    pub fn zone_count(&self) -> usize {
        self.anchors.len()
    }

    /// Parse anchors from presentation-format lines.
    ///
    /// Accepted forms (TTL and class optional, `;` and `#` start comments):
    ///
    /// ```text
    /// example.com. 3600 IN DNSKEY 257 3 8 AwEAAc...
    /// example.com. IN DS 12345 8 2 49FD46E6...
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let mut set = Self::new();
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw
                .split([';', '#'])
                .next()
                .unwrap_or_default()
                .trim();
            if line.is_empty() {
                continue;
            }
            let anchor = parse_anchor_line(line).map_err(|msg| {
                AuthGraphError::InvalidTrustAnchor(format!("line {}: {}", lineno + 1, msg))
            })?;
            set.add_anchor(anchor);
        }
        Ok(set)
    }

    /// Load anchors from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let set = Self::parse(&text)?;
        if set.is_empty() {
            warn!("No trust anchors found in {}", path.as_ref().display());
        }
        Ok(set)
    }
}

fn parse_anchor_line(line: &str) -> std::result::Result<TrustAnchor, String> {
    let mut tokens = line.split_whitespace();
    let zone = tokens.next().ok_or("missing owner name")?;

    // skip optional TTL and class until the record type
    let rtype = loop {
        let token = tokens.next().ok_or("missing record type")?;
        if token.parse::<u32>().is_ok() || token.eq_ignore_ascii_case("IN") {
            continue;
        }
        break token
            .parse::<RecordType>()
            .map_err(|e| e.to_string())?;
    };

    let rest: Vec<&str> = tokens.collect();
    match rtype {
        RecordType::DNSKEY => {
            if rest.len() < 4 {
                return Err("DNSKEY needs flags, protocol, algorithm and key".to_string());
            }
            let flags = rest[0].parse::<u16>().map_err(|_| format!("invalid flags: {}", rest[0]))?;
            let protocol = rest[1]
                .parse::<u8>()
                .map_err(|_| format!("invalid protocol: {}", rest[1]))?;
            let algorithm = rest[2]
                .parse::<u8>()
                .map_err(|_| format!("invalid algorithm: {}", rest[2]))?;
            let key = STANDARD
                .decode(rest[3..].concat())
                .map_err(|e| format!("invalid key material: {}", e))?;
            Ok(TrustAnchor::from_dnskey(zone, flags, protocol, algorithm, key))
        }
        RecordType::DS => {
            if rest.len() < 2 {
                return Err("DS needs key tag and algorithm".to_string());
            }
            let key_tag = rest[0]
                .parse::<u16>()
                .map_err(|_| format!("invalid key tag: {}", rest[0]))?;
            let algorithm = rest[1]
                .parse::<u8>()
                .map_err(|_| format!("invalid algorithm: {}", rest[1]))?;
            Ok(TrustAnchor::from_key_tag(zone, algorithm, key_tag))
        }
        other => Err(format!("unsupported anchor record type {}", other)),
    }
}

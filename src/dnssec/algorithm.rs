use std::collections::BTreeSet;
use std::fmt;

/// IANA DNSSEC algorithm registry: number, mnemonic, and whether a
/// validator is expected to verify signatures made with it (RFC 8624).
const REGISTRY: &[(u8, &str, bool)] = &[
    (0, "DELETE", false),
    (1, "RSAMD5", false),
    (2, "DH", false),
    (3, "DSA", false),
    (5, "RSASHA1", true),
    (6, "DSA-NSEC3-SHA1", false),
    (7, "RSASHA1-NSEC3-SHA1", true),
    (8, "RSASHA256", true),
    (10, "RSASHA512", true),
    (12, "ECC-GOST", false),
    (13, "ECDSAP256SHA256", true),
    (14, "ECDSAP384SHA384", true),
    (15, "ED25519", true),
    (16, "ED448", true),
    (252, "INDIRECT", false),
    (253, "PRIVATEDNS", false),
    (254, "PRIVATEOID", false),
];

/// A DNSKEY/RRSIG algorithm number known to the IANA registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DnsSecAlgorithm {
    number: u8,
    mnemonic: &'static str,
    validatable: bool,
}

impl DnsSecAlgorithm {
    /// Registry entry for `value`, `None` for unassigned or reserved numbers
    pub fn from_u8(value: u8) -> Option<Self> {
        REGISTRY
            .iter()
            .find(|(number, _, _)| *number == value)
            .map(|&(number, mnemonic, validatable)| Self {
                number,
                mnemonic,
                validatable,
            })
    }

    pub fn number(self) -> u8 {
        self.number
    }

    /// Whether signatures with this algorithm are checked by validators
    pub fn is_supported(self) -> bool {
        self.validatable
    }

    /// Mnemonic for a raw number, or the number itself when unassigned
    pub fn describe(value: u8) -> String {
        Self::from_u8(value)
            .map(|algorithm| algorithm.mnemonic.to_string())
            .unwrap_or_else(|| value.to_string())
    }
}

impl fmt::Display for DnsSecAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic)
    }
}

/// Set of algorithm numbers the trust propagator treats as understood.
///
/// Numbers are kept raw so that algorithms outside the IANA table can still
/// be listed by an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmSet {
    algorithms: BTreeSet<u8>,
}

impl AlgorithmSet {
    pub fn new(algorithms: impl IntoIterator<Item = u8>) -> Self {
        Self {
            algorithms: algorithms.into_iter().collect(),
        }
    }

    pub fn contains(&self, algorithm: u8) -> bool {
        self.algorithms.contains(&algorithm)
    }

    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.algorithms.iter().copied()
    }
}

impl Default for AlgorithmSet {
    /// Every registry algorithm that validators verify
    fn default() -> Self {
        Self::new(
            REGISTRY
                .iter()
                .filter(|(_, _, validatable)| *validatable)
                .map(|(number, _, _)| *number),
        )
    }
}

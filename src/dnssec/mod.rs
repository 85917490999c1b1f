pub mod algorithm;
pub mod digest;
pub mod key_tag;
pub mod trust_anchor;
pub mod validation;

pub use algorithm::{AlgorithmSet, DnsSecAlgorithm};
pub use digest::DigestType;
pub use key_tag::calculate_key_tag;
pub use trust_anchor::{TrustAnchor, TrustAnchorSet};
pub use validation::{
    DelegationStatus, DnameValidation, DsValidation, NsecValidation, RrsigValidation,
};

/// DNSKEY flag bits (RFC 4034, RFC 5011)
pub mod flags {
    /// Zone Key flag
    pub const ZONE: u16 = 0x0100;
    /// Revoke flag (RFC 5011)
    pub const REVOKE: u16 = 0x0080;
    /// Secure Entry Point flag
    pub const SEP: u16 = 0x0001;
}

//! Validation outcomes produced by an upstream DNSSEC validator.
//!
//! The graph never re-checks signatures or digests; it only reads these
//! classifications.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of checking one RRSIG against one DNSKEY
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RrsigValidation {
    Valid,
    Expired,
    Premature,
    InvalidSignature,
    IndeterminateNoDnskey,
    IndeterminateMatchPreRevoke,
    IndeterminateUnknownAlgorithm,
    AlgorithmIgnored,
    Invalid,
}

/// Outcome of comparing a DS/DLV digest with a DNSKEY
///
/// Variants are ordered from best to worst so that the maximum of a group
/// is the status that colors a consolidated digest edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DsValidation {
    Valid,
    AlgorithmIgnored,
    IndeterminateMatchPreRevoke,
    IndeterminateNoDnskey,
    IndeterminateUnknownAlgorithm,
    InvalidDigest,
    Invalid,
}

/// Outcome of checking an NSEC/NSEC3 denial-of-existence proof
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NsecValidation {
    Valid,
    Indeterminate,
    Invalid,
}

/// Outcome of checking a CNAME synthesized from a DNAME
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DnameValidation {
    Valid,
    IndeterminateNoCname,
    IndeterminateCnameMismatch,
    InvalidTarget,
    Invalid,
}

/// Status of a zone cut as seen from the parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationStatus {
    Secure,
    Insecure,
    Incomplete,
    Lame,
    Bogus,
}

impl fmt::Display for RrsigValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Valid => "VALID",
            Self::Expired => "EXPIRED",
            Self::Premature => "PREMATURE",
            Self::InvalidSignature => "INVALID_SIG",
            Self::IndeterminateNoDnskey => "INDETERMINATE_NO_DNSKEY",
            Self::IndeterminateMatchPreRevoke => "INDETERMINATE_MATCH_PRE_REVOKE",
            Self::IndeterminateUnknownAlgorithm => "INDETERMINATE_UNKNOWN_ALGORITHM",
            Self::AlgorithmIgnored => "ALGORITHM_IGNORED",
            Self::Invalid => "INVALID",
        };
        f.write_str(s)
    }
}

impl fmt::Display for DsValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Valid => "VALID",
            Self::AlgorithmIgnored => "ALGORITHM_IGNORED",
            Self::IndeterminateMatchPreRevoke => "INDETERMINATE_MATCH_PRE_REVOKE",
            Self::IndeterminateNoDnskey => "INDETERMINATE_NO_DNSKEY",
            Self::IndeterminateUnknownAlgorithm => "INDETERMINATE_UNKNOWN_ALGORITHM",
            Self::InvalidDigest => "INVALID_DIGEST",
            Self::Invalid => "INVALID",
        };
        f.write_str(s)
    }
}

impl fmt::Display for NsecValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Valid => "VALID",
            Self::Indeterminate => "INDETERMINATE",
            Self::Invalid => "INVALID",
        };
        f.write_str(s)
    }
}

impl fmt::Display for DnameValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Valid => "VALID",
            Self::IndeterminateNoCname => "INDETERMINATE_NO_CNAME",
            Self::IndeterminateCnameMismatch => "INDETERMINATE_CNAME_MISMATCH",
            Self::InvalidTarget => "INVALID_TARGET",
            Self::Invalid => "INVALID",
        };
        f.write_str(s)
    }
}

impl fmt::Display for DelegationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Secure => "SECURE",
            Self::Insecure => "INSECURE",
            Self::Incomplete => "INCOMPLETE",
            Self::Lame => "LAME",
            Self::Bogus => "BOGUS",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ds_worst_status_ordering() {
        let group = [
            DsValidation::Valid,
            DsValidation::InvalidDigest,
            DsValidation::IndeterminateNoDnskey,
        ];
        assert_eq!(group.iter().max(), Some(&DsValidation::InvalidDigest));
        assert!(DsValidation::Invalid > DsValidation::InvalidDigest);
    }

    #[test]
    fn test_serde_names() {
        let parsed: RrsigValidation = serde_json::from_str("\"indeterminate_no_dnskey\"").unwrap();
        assert_eq!(parsed, RrsigValidation::IndeterminateNoDnskey);
        let parsed: DelegationStatus = serde_json::from_str("\"lame\"").unwrap();
        assert_eq!(parsed, DelegationStatus::Lame);
    }
}

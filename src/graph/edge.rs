use serde::Serialize;

use super::node::{Metadata, NodeId};
use crate::dnssec::{
    DelegationStatus, DnameValidation, DsValidation, NsecValidation, RrsigValidation,
};

/// Index of an edge in an [`AuthGraph`](super::AuthGraph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EdgeId(pub(crate) usize);

/// Edge color, derived from the validation status it carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeColor {
    Secure,
    Insecure,
    Indeterminate,
    Invalid,
    /// Bookkeeping edges that carry no validation result
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    Solid,
    Dashed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EdgeKind {
    /// Signed node to signing DNSKEY. `port` names the NSEC/NSEC3 record
    /// inside a set node that the signature covers.
    Rrsig { port: Option<String> },
    /// DNSKEY to the DS/DLV node holding its digest
    Digest { status: DsValidation },
    /// Child zone top to parent zone bottom. `evidence` holds the DS or
    /// DS-absence nodes the delegation status rests on.
    Delegation {
        status: DelegationStatus,
        evidence: Vec<NodeId>,
    },
    /// Synthesized CNAME to the DNAME it came from
    Dname { status: DnameValidation },
    /// Proven-absent node to the NSEC/NSEC3 set proving it. `port` names the
    /// record that directly covers the query, when known.
    NsecCoverage {
        status: NsecValidation,
        port: Option<String>,
    },
    /// CNAME target to CNAME owner
    Alias,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub from: NodeId,
    pub to: NodeId,
    #[serde(flatten)]
    pub kind: EdgeKind,
    pub color: EdgeColor,
    pub style: LineStyle,
    pub metadata: Metadata,
}

impl GraphEdge {
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

pub fn rrsig_style(status: RrsigValidation) -> (EdgeColor, LineStyle) {
    match status {
        RrsigValidation::Valid => (EdgeColor::Secure, LineStyle::Solid),
        RrsigValidation::IndeterminateNoDnskey
        | RrsigValidation::IndeterminateMatchPreRevoke
        | RrsigValidation::AlgorithmIgnored => (EdgeColor::Insecure, LineStyle::Dashed),
        RrsigValidation::IndeterminateUnknownAlgorithm => {
            (EdgeColor::Indeterminate, LineStyle::Solid)
        }
        RrsigValidation::Expired
        | RrsigValidation::Premature
        | RrsigValidation::InvalidSignature => (EdgeColor::Invalid, LineStyle::Solid),
        RrsigValidation::Invalid => (EdgeColor::Invalid, LineStyle::Dashed),
    }
}

pub fn digest_style(status: DsValidation) -> (EdgeColor, LineStyle) {
    match status {
        DsValidation::Valid => (EdgeColor::Secure, LineStyle::Solid),
        DsValidation::IndeterminateNoDnskey
        | DsValidation::IndeterminateMatchPreRevoke
        | DsValidation::AlgorithmIgnored => (EdgeColor::Insecure, LineStyle::Dashed),
        DsValidation::IndeterminateUnknownAlgorithm => {
            (EdgeColor::Indeterminate, LineStyle::Solid)
        }
        DsValidation::InvalidDigest => (EdgeColor::Invalid, LineStyle::Solid),
        DsValidation::Invalid => (EdgeColor::Invalid, LineStyle::Dashed),
    }
}

pub fn nsec_style(status: NsecValidation) -> (EdgeColor, LineStyle) {
    match status {
        NsecValidation::Valid => (EdgeColor::Secure, LineStyle::Solid),
        NsecValidation::Indeterminate => (EdgeColor::Indeterminate, LineStyle::Dashed),
        NsecValidation::Invalid => (EdgeColor::Invalid, LineStyle::Solid),
    }
}

pub fn dname_style(status: DnameValidation) -> (EdgeColor, LineStyle) {
    match status {
        DnameValidation::Valid => (EdgeColor::Secure, LineStyle::Solid),
        DnameValidation::IndeterminateNoCname | DnameValidation::IndeterminateCnameMismatch => {
            (EdgeColor::Indeterminate, LineStyle::Dashed)
        }
        DnameValidation::InvalidTarget | DnameValidation::Invalid => {
            (EdgeColor::Invalid, LineStyle::Solid)
        }
    }
}

pub fn delegation_style(status: DelegationStatus) -> (EdgeColor, LineStyle) {
    match status {
        DelegationStatus::Secure => (EdgeColor::Secure, LineStyle::Solid),
        DelegationStatus::Insecure => (EdgeColor::Insecure, LineStyle::Solid),
        DelegationStatus::Incomplete => (EdgeColor::Indeterminate, LineStyle::Dashed),
        DelegationStatus::Lame => (EdgeColor::Invalid, LineStyle::Dashed),
        DelegationStatus::Bogus => (EdgeColor::Invalid, LineStyle::Solid),
    }
}

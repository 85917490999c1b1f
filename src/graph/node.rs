use serde::Serialize;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

use super::status::Status;
use crate::analysis::NsecVariant;
use crate::dns::RecordType;

/// Index of a node in an [`AuthGraph`](super::AuthGraph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

/// Trust color assigned during propagation.
///
/// This is a propagation-time mark, not the reported outcome; see
/// [`Status`] for the latter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustColor {
    #[default]
    Unset,
    Secure,
    Bogus,
    Insecure,
    SecureNonExistent,
    BogusNonExistent,
    InsecureNonExistent,
}

impl TrustColor {
    pub fn is_set(self) -> bool {
        self != Self::Unset
    }

    pub fn is_secure(self) -> bool {
        matches!(self, Self::Secure | Self::SecureNonExistent)
    }

    pub fn is_bogus(self) -> bool {
        matches!(self, Self::Bogus | Self::BogusNonExistent)
    }

    /// Proof of absence was authenticated, with or without opt-out
    pub fn is_authenticated(self) -> bool {
        matches!(
            self,
            Self::Secure | Self::SecureNonExistent | Self::InsecureNonExistent
        )
    }

    /// Apply the monotonic upgrade rules: secure is never replaced, and
    /// bogus is never replaced by insecure.
    pub fn merge(self, new: TrustColor) -> TrustColor {
        if self.is_secure() {
            return self;
        }
        if self.is_bogus()
            && matches!(new, Self::Insecure | Self::InsecureNonExistent | Self::Unset)
        {
            return self;
        }
        new
    }
}

/// Which of the two layout anchors of a zone cluster a node is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorPosition {
    Top,
    Bottom,
}

/// Whether an RRset node stands for data or for proven absence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Existence {
    Existent,
    /// The owner name does not exist
    NxDomain,
    /// The owner name exists, the type does not
    NoData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Layout anchor of a zone cluster
    ZoneCluster {
        zone: String,
        position: AnchorPosition,
    },
    DnsKey {
        name: String,
        algorithm: u8,
        key_tag: u16,
        flags: u16,
        #[serde(skip)]
        public_key: Vec<u8>,
    },
    Ds {
        name: String,
        algorithm: u8,
        key_tag: u16,
        digest_types: SmallVec<[u8; 2]>,
        rdtype: RecordType,
    },
    RRset {
        name: String,
        rdtype: RecordType,
        existence: Existence,
    },
    NsecSet {
        name: String,
        qtype: RecordType,
        variant: NsecVariant,
        opt_out: bool,
        /// Per-record authentication, keyed by NSEC/NSEC3 owner name
        records: BTreeMap<String, bool>,
    },
    Error {
        name: String,
        rdtype: RecordType,
    },
}

impl NodeKind {
    /// Owner name the node describes
    pub fn name(&self) -> &str {
        match self {
            Self::ZoneCluster { zone, .. } => zone,
            Self::DnsKey { name, .. }
            | Self::Ds { name, .. }
            | Self::RRset { name, .. }
            | Self::NsecSet { name, .. }
            | Self::Error { name, .. } => name,
        }
    }

    pub fn is_layout(&self) -> bool {
        matches!(self, Self::ZoneCluster { .. })
    }

    pub fn is_dlv(&self) -> bool {
        matches!(self, Self::Ds { rdtype: RecordType::DLV, .. })
    }

    pub fn is_dname(&self) -> bool {
        matches!(self, Self::RRset { rdtype: RecordType::DNAME, existence: Existence::Existent, .. })
    }
}

/// Error, warning and descriptive data attached to a node or edge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

impl Metadata {
    pub fn add_errors<'a>(&mut self, errors: impl IntoIterator<Item = &'a String>) {
        for error in errors {
            if !self.errors.contains(error) {
                self.errors.push(error.clone());
            }
        }
    }

    pub fn add_warnings<'a>(&mut self, warnings: impl IntoIterator<Item = &'a String>) {
        for warning in warnings {
            if !self.warnings.contains(warning) {
                self.warnings.push(warning.clone());
            }
        }
    }

    pub fn set_field(&mut self, key: &str, value: impl ToString) {
        self.fields.insert(key.to_string(), value.to_string());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    /// Zone cluster the node is drawn in
    #[serde(rename = "cluster")]
    pub zone: String,
    pub label: String,
    pub color: TrustColor,
    /// Drawn dashed: the data was proven absent or never existed
    pub non_existent: bool,
    /// Drawn with a double border: a configured trust anchor
    pub trust_anchor: bool,
    pub revoked: bool,
    pub sep: bool,
    pub metadata: Metadata,
}

impl GraphNode {
    pub fn new(id: String, kind: NodeKind, zone: &str, label: String) -> Self {
        Self {
            id,
            kind,
            zone: zone.to_string(),
            label,
            color: TrustColor::Unset,
            non_existent: false,
            trust_anchor: false,
            revoked: false,
            sep: false,
            metadata: Metadata::default(),
        }
    }

    pub fn is_dnskey(&self) -> bool {
        matches!(self.kind, NodeKind::DnsKey { .. })
    }

    /// Set the trust color, honoring the upgrade rules of [`TrustColor::merge`]
    pub fn set_color(&mut self, color: TrustColor) {
        self.color = self.color.merge(color);
    }

    /// Color for a node reached by a secure path
    pub fn secure_color(&self) -> TrustColor {
        if self.non_existent {
            TrustColor::SecureNonExistent
        } else {
            TrustColor::Secure
        }
    }

    /// Color for a node left unauthenticated in a secure zone
    pub fn bogus_color(&self) -> TrustColor {
        if self.non_existent {
            TrustColor::BogusNonExistent
        } else {
            TrustColor::Bogus
        }
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

//! Input model: the per-zone and per-name analysis produced by an upstream
//! resolver/validator.
//!
//! Every record here is already classified (signature valid, digest
//! mismatch, proof indeterminate, ...). The graph builder only assembles
//! these results; nothing is verified again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dns::{RecordType, normalize_name, parent_name};
use crate::dnssec::{
    DelegationStatus, DnameValidation, DsValidation, NsecValidation, RrsigValidation,
    calculate_key_tag, flags,
};

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        let compact: String = text.split_whitespace().collect();
        STANDARD.decode(compact).map_err(serde::de::Error::custom)
    }
}

fn default_protocol() -> u8 {
    3
}

/// DNSKEY record data
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DnsKeyRecord {
    pub flags: u16,
    #[serde(default = "default_protocol")]
    pub protocol: u8,
    pub algorithm: u8,
    #[serde(with = "base64_bytes")]
    pub public_key: Vec<u8>,
}

impl DnsKeyRecord {
    pub fn new(flags: u16, algorithm: u8, public_key: Vec<u8>) -> Self {
        Self {
            flags,
            protocol: 3,
            algorithm,
            public_key,
        }
    }

    pub fn key_tag(&self) -> u16 {
        calculate_key_tag(self.flags, self.protocol, self.algorithm, &self.public_key)
    }

    /// Key tag the key had before its revoke bit was set
    pub fn key_tag_pre_revoke(&self) -> u16 {
        calculate_key_tag(
            self.flags & !flags::REVOKE,
            self.protocol,
            self.algorithm,
            &self.public_key,
        )
    }

    pub fn is_zone_key(&self) -> bool {
        self.flags & flags::ZONE != 0
    }

    pub fn is_sep(&self) -> bool {
        self.flags & flags::SEP != 0
    }

    pub fn is_revoked(&self) -> bool {
        self.flags & flags::REVOKE != 0
    }
}

/// One RRSIG and the result of checking it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RrsigStatus {
    pub signer: String,
    pub algorithm: u8,
    pub key_tag: u16,
    pub status: RrsigValidation,
    /// The DNSKEY the signature was checked against, if one matched
    #[serde(default)]
    pub dnskey: Option<DnsKeyRecord>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Wildcard that an answer was synthesized from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WildcardInfo {
    pub wildcard_name: String,
    /// Proofs that the exact query name does not exist
    #[serde(default)]
    pub nsec_proofs: Vec<NsecProof>,
}

/// An RRset together with its signature statuses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RRsetInfo {
    pub name: String,
    pub rdtype: RecordType,
    #[serde(default)]
    pub ttl: u32,
    #[serde(default)]
    pub rdata: Vec<String>,
    #[serde(default)]
    pub rrsigs: Vec<RrsigStatus>,
    #[serde(default)]
    pub wildcard: Option<WildcardInfo>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl RRsetInfo {
    pub fn new(name: &str, rdtype: RecordType) -> Self {
        Self {
            name: normalize_name(name),
            rdtype,
            ttl: 0,
            rdata: Vec::new(),
            rrsigs: Vec::new(),
            wildcard: None,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn normalize(&mut self) {
        self.name = normalize_name(&self.name);
        if let Some(wildcard) = self.wildcard.as_mut() {
            wildcard.wildcard_name = normalize_name(&wildcard.wildcard_name);
            for proof in &mut wildcard.nsec_proofs {
                proof.normalize();
            }
        }
    }

    /// Target of a CNAME RRset
    pub fn cname_target(&self) -> Option<String> {
        if self.rdtype != RecordType::CNAME {
            return None;
        }
        self.rdata.first().map(|target| normalize_name(target))
    }
}

/// NSEC or NSEC3
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NsecVariant {
    Nsec,
    Nsec3,
}

impl NsecVariant {
    pub fn rdtype(self) -> RecordType {
        match self {
            Self::Nsec => RecordType::NSEC,
            Self::Nsec3 => RecordType::NSEC3,
        }
    }
}

/// One NSEC/NSEC3 RR contributing to a proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NsecRecord {
    pub name: String,
    #[serde(default)]
    pub rdata: String,
    #[serde(default)]
    pub rrsigs: Vec<RrsigStatus>,
}

/// A set of NSEC/NSEC3 RRs that jointly prove a denial
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NsecProof {
    pub variant: NsecVariant,
    pub records: Vec<NsecRecord>,
    pub status: NsecValidation,
    #[serde(default)]
    pub opt_out: bool,
    /// Owner of the record that covers the query name itself, if the
    /// validator singled one out
    #[serde(default)]
    pub covering_record: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl NsecProof {
    fn normalize(&mut self) {
        for record in &mut self.records {
            record.name = normalize_name(&record.name);
        }
        self.covering_record = self.covering_record.as_deref().map(normalize_name);
    }
}

/// NXDOMAIN or NODATA response for one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegativeResponse {
    pub qname: String,
    pub qtype: RecordType,
    /// SOA RRsets returned in the authority section
    #[serde(default)]
    pub soa: Vec<RRsetInfo>,
    /// Servers that returned this response
    #[serde(default)]
    pub servers: Vec<String>,
    #[serde(default)]
    pub nsec_proofs: Vec<NsecProof>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl NegativeResponse {
    fn normalize(&mut self) {
        self.qname = normalize_name(&self.qname);
        self.soa.iter_mut().for_each(RRsetInfo::normalize);
        self.nsec_proofs.iter_mut().for_each(NsecProof::normalize);
    }
}

/// A DNAME and the CNAME synthesized from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnameStatus {
    pub dname: RRsetInfo,
    #[serde(default)]
    pub synthesized_cname: Option<RRsetInfo>,
    /// Name the CNAME is synthesized for, used when no CNAME was returned
    pub qname: String,
    pub status: DnameValidation,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Everything learned from querying one (name, type) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub qtype: RecordType,
    #[serde(default)]
    pub answers: Vec<RRsetInfo>,
    #[serde(default)]
    pub nxdomain: Vec<NegativeResponse>,
    #[serde(default)]
    pub nodata: Vec<NegativeResponse>,
    #[serde(default)]
    pub dnames: Vec<DnameStatus>,
    /// Transport and parsing errors for the query as a whole
    #[serde(default)]
    pub errors: Vec<String>,
}

impl QueryAnalysis {
    fn normalize(&mut self) {
        self.answers.iter_mut().for_each(RRsetInfo::normalize);
        for response in self.nxdomain.iter_mut().chain(self.nodata.iter_mut()) {
            response.normalize();
        }
        for dname in &mut self.dnames {
            dname.qname = normalize_name(&dname.qname);
            dname.dname.normalize();
            if let Some(cname) = dname.synthesized_cname.as_mut() {
                cname.normalize();
            }
        }
    }

    pub fn new(qtype: RecordType) -> Self {
        Self {
            qtype,
            answers: Vec::new(),
            nxdomain: Vec::new(),
            nodata: Vec::new(),
            dnames: Vec::new(),
            errors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameAnalysis {
    pub name: String,
    /// Zone the name was found in
    pub zone: String,
    #[serde(default)]
    pub queries: Vec<QueryAnalysis>,
    #[serde(default)]
    pub analysis_end: Option<DateTime<Utc>>,
}

impl NameAnalysis {
    pub fn new(name: &str, zone: &str) -> Self {
        Self {
            name: normalize_name(name),
            zone: normalize_name(zone),
            queries: Vec::new(),
            analysis_end: None,
        }
    }

    pub fn query(&self, rdtype: RecordType) -> Option<&QueryAnalysis> {
        self.queries.iter().find(|q| q.qtype == rdtype)
    }
}

/// One DS or DLV record compared against the child's DNSKEYs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsStatus {
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    #[serde(default)]
    pub digest: String,
    pub status: DsValidation,
    #[serde(default)]
    pub dnskey: Option<DnsKeyRecord>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub status: DelegationStatus,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Key material and delegation data for one zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneAnalysis {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// Look-aside zone holding DLV records for this zone
    #[serde(default)]
    pub dlv: Option<String>,
    /// No further data was collected below this point
    #[serde(default)]
    pub stub: bool,
    #[serde(default)]
    pub analysis_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub dnskeys: Vec<DnsKeyRecord>,
    /// RRSIGs over the DNSKEY RRset
    #[serde(default)]
    pub dnskey_rrsigs: Vec<RrsigStatus>,
    #[serde(default)]
    pub dnskey_errors: Vec<String>,
    #[serde(default)]
    pub dnskey_warnings: Vec<String>,
    #[serde(default)]
    pub ds: Vec<DsStatus>,
    /// RRSIGs over the DS RRset in the parent
    #[serde(default)]
    pub ds_rrsigs: Vec<RrsigStatus>,
    /// Negative response proving there is no DS in the parent
    #[serde(default)]
    pub ds_nonexistence: Option<NegativeResponse>,
    #[serde(default)]
    pub dlv_records: Vec<DsStatus>,
    #[serde(default)]
    pub dlv_rrsigs: Vec<RrsigStatus>,
    #[serde(default)]
    pub delegation: Option<Delegation>,
}

impl ZoneAnalysis {
    pub fn new(name: &str) -> Self {
        Self {
            name: normalize_name(name),
            parent: None,
            dlv: None,
            stub: false,
            analysis_end: None,
            dnskeys: Vec::new(),
            dnskey_rrsigs: Vec::new(),
            dnskey_errors: Vec::new(),
            dnskey_warnings: Vec::new(),
            ds: Vec::new(),
            ds_rrsigs: Vec::new(),
            ds_nonexistence: None,
            dlv_records: Vec::new(),
            dlv_rrsigs: Vec::new(),
            delegation: None,
        }
    }

    /// DNSKEY matching an algorithm and key tag, also matching keys whose
    /// tag changed when the revoke bit was set
    pub fn find_dnskey(&self, algorithm: u8, key_tag: u16) -> Option<&DnsKeyRecord> {
        self.dnskeys
            .iter()
            .find(|key| key.algorithm == algorithm && key.key_tag() == key_tag)
            .or_else(|| {
                self.dnskeys.iter().find(|key| {
                    key.algorithm == algorithm
                        && key.is_revoked()
                        && key.key_tag_pre_revoke() == key_tag
                })
            })
    }
}

/// Serialized form of an [`Analysis`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisDocument {
    #[serde(default)]
    pub zones: Vec<ZoneAnalysis>,
    #[serde(default)]
    pub names: Vec<NameAnalysis>,
}

/// Indexed analysis dataset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "AnalysisDocument", into = "AnalysisDocument")]
pub struct Analysis {
    zones: BTreeMap<String, ZoneAnalysis>,
    names: BTreeMap<String, NameAnalysis>,
}

impl Analysis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_zone(&mut self, mut zone: ZoneAnalysis) {
        zone.name = normalize_name(&zone.name);
        zone.parent = zone.parent.as_deref().map(normalize_name);
        zone.dlv = zone.dlv.as_deref().map(normalize_name);
        if let Some(response) = zone.ds_nonexistence.as_mut() {
            response.normalize();
        }
        self.zones.insert(zone.name.clone(), zone);
    }

    /// Owner names anywhere below the name are stored normalized, so the
    /// graph can compare them with plain string equality
    pub fn add_name(&mut self, mut name: NameAnalysis) {
        name.name = normalize_name(&name.name);
        name.zone = normalize_name(&name.zone);
        for query in &mut name.queries {
            query.normalize();
        }
        self.names.insert(name.name.clone(), name);
    }

    pub fn zone(&self, name: &str) -> Option<&ZoneAnalysis> {
        self.zones.get(&normalize_name(name))
    }

    pub fn name(&self, name: &str) -> Option<&NameAnalysis> {
        self.names.get(&normalize_name(name))
    }

    /// Closest enclosing zone of a name that is present in the dataset
    pub fn zone_for(&self, name: &str) -> Option<&ZoneAnalysis> {
        let mut current = Some(normalize_name(name));
        while let Some(candidate) = current {
            if let Some(zone) = self.zones.get(&candidate) {
                return Some(zone);
            }
            current = parent_name(&candidate);
        }
        None
    }

    pub fn zones(&self) -> impl Iterator<Item = &ZoneAnalysis> {
        self.zones.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &NameAnalysis> {
        self.names.values()
    }
}

impl From<AnalysisDocument> for Analysis {
    fn from(doc: AnalysisDocument) -> Self {
        let mut analysis = Analysis::new();
        for zone in doc.zones {
            analysis.add_zone(zone);
        }
        for name in doc.names {
            analysis.add_name(name);
        }
        analysis
    }
}

impl From<Analysis> for AnalysisDocument {
    fn from(analysis: Analysis) -> Self {
        AnalysisDocument {
            zones: analysis.zones.into_values().collect(),
            names: analysis.names.into_values().collect(),
        }
    }
}

//! Shared fixtures for the integration tests: analysis datasets built in
//! code, plus lookups of graph elements by what they describe.

#![allow(dead_code)] // Not every test file uses every helper

use dnssec_authgraph::analysis::{
    DnsKeyRecord, DsStatus, NameAnalysis, NegativeResponse, NsecProof, NsecRecord, NsecVariant,
    QueryAnalysis, RRsetInfo, RrsigStatus, ZoneAnalysis,
};
use dnssec_authgraph::dnssec::{
    DsValidation, NsecValidation, RrsigValidation, TrustAnchor, TrustAnchorSet,
};
use dnssec_authgraph::graph::{AuthGraph, Existence, NodeId, NodeKind, Status};
use dnssec_authgraph::{Analysis, GraphConfig, RecordType, analyze};

pub const ALGORITHM: u8 = 13;

/// Deterministic ECDSA-sized key; distinct seeds give distinct key tags
pub fn dnskey(flags: u16, seed: u8) -> DnsKeyRecord {
    DnsKeyRecord::new(flags, ALGORITHM, vec![seed; 32])
}

pub fn rrsig(signer: &str, key: &DnsKeyRecord, status: RrsigValidation) -> RrsigStatus {
    RrsigStatus {
        signer: signer.to_string(),
        algorithm: key.algorithm,
        key_tag: key.key_tag(),
        status,
        dnskey: Some(key.clone()),
        errors: vec![],
        warnings: vec![],
    }
}

pub fn ds_for(key: &DnsKeyRecord, status: DsValidation) -> DsStatus {
    DsStatus {
        key_tag: key.key_tag(),
        algorithm: key.algorithm,
        digest_type: 2,
        digest: format!("{:064x}", key.key_tag()),
        status,
        dnskey: Some(key.clone()),
        errors: vec![],
        warnings: vec![],
    }
}

/// A zone whose single KSK signs the DNSKEY RRset with `status`
pub fn zone(name: &str, parent: Option<&str>, seed: u8, status: RrsigValidation) -> (ZoneAnalysis, DnsKeyRecord) {
    let ksk = dnskey(257, seed);
    let mut zone = ZoneAnalysis::new(name);
    zone.parent = parent.map(str::to_string);
    zone.dnskeys.push(ksk.clone());
    zone.dnskey_rrsigs.push(rrsig(name, &ksk, status));
    (zone, ksk)
}

pub fn signed_zone(name: &str, parent: Option<&str>, seed: u8) -> (ZoneAnalysis, DnsKeyRecord) {
    zone(name, parent, seed, RrsigValidation::Valid)
}

/// Attach a DS RRset for `child_key` to `child`, signed by the parent key
pub fn delegate(
    child: &mut ZoneAnalysis,
    child_key: &DnsKeyRecord,
    parent_key: &DnsKeyRecord,
    status: DsValidation,
) {
    let parent = child.parent.clone().unwrap_or_default();
    child.ds.push(ds_for(child_key, status));
    child.ds_rrsigs.push(rrsig(&parent, parent_key, RrsigValidation::Valid));
}

pub fn rrset(name: &str, rdtype: RecordType, rdata: &[&str]) -> RRsetInfo {
    let mut rrset = RRsetInfo::new(name, rdtype);
    rrset.ttl = 300;
    rrset.rdata = rdata.iter().map(|r| r.to_string()).collect();
    rrset
}

pub fn signed_rrset(
    name: &str,
    rdtype: RecordType,
    rdata: &[&str],
    signer: &str,
    key: &DnsKeyRecord,
) -> RRsetInfo {
    let mut rrset = rrset(name, rdtype, rdata);
    rrset.rrsigs.push(rrsig(signer, key, RrsigValidation::Valid));
    rrset
}

pub fn soa(zone: &str, key: &DnsKeyRecord) -> RRsetInfo {
    signed_rrset(
        zone,
        RecordType::SOA,
        &["ns1 hostmaster 1 7200 3600 1209600 300"],
        zone,
        key,
    )
}

/// Proof made of `records`, each signed by `key` with the matching status
pub fn nsec_proof(
    variant: NsecVariant,
    signer: &str,
    key: &DnsKeyRecord,
    records: &[(&str, RrsigValidation)],
    status: NsecValidation,
) -> NsecProof {
    NsecProof {
        variant,
        records: records
            .iter()
            .map(|&(name, sig)| NsecRecord {
                name: name.to_string(),
                rdata: format!("next.{name} A RRSIG"),
                rrsigs: vec![rrsig(signer, key, sig)],
            })
            .collect(),
        status,
        opt_out: false,
        covering_record: None,
        errors: vec![],
        warnings: vec![],
    }
}

pub fn negative(zone: &str, qname: &str, qtype: RecordType, key: &DnsKeyRecord, proofs: Vec<NsecProof>) -> NegativeResponse {
    NegativeResponse {
        qname: qname.to_string(),
        qtype,
        soa: vec![soa(zone, key)],
        servers: vec!["192.0.2.53".to_string()],
        nsec_proofs: proofs,
        errors: vec![],
        warnings: vec![],
    }
}

/// Name with one query whose answer section is `answers`
pub fn answered(name: &str, zone: &str, qtype: RecordType, answers: Vec<RRsetInfo>) -> NameAnalysis {
    let mut query = QueryAnalysis::new(qtype);
    query.answers = answers;
    let mut analysis = NameAnalysis::new(name, zone);
    analysis.queries.push(query);
    analysis
}

pub fn anchors(zones: &[(&str, &DnsKeyRecord)]) -> TrustAnchorSet {
    let mut set = TrustAnchorSet::new();
    for (zone, key) in zones {
        set.add_anchor(TrustAnchor::from_dnskey(
            zone,
            key.flags,
            key.protocol,
            key.algorithm,
            key.public_key.clone(),
        ));
    }
    set
}

pub fn run(analysis: &Analysis, anchors: &TrustAnchorSet) -> AuthGraph {
    analyze(analysis, &[], anchors, &GraphConfig::default()).unwrap()
}

/// Single secure zone `example.` with `www.example./A` signed by its KSK
pub fn single_zone() -> (Analysis, TrustAnchorSet) {
    let (zone, ksk) = signed_zone("example.", None, 1);
    let mut analysis = Analysis::new();
    analysis.add_zone(zone);
    analysis.add_name(answered(
        "www.example.",
        "example.",
        RecordType::A,
        vec![signed_rrset("www.example.", RecordType::A, &["192.0.2.1"], "example.", &ksk)],
    ));
    (analysis, anchors(&[("example.", &ksk)]))
}

/// Secure `example.` delegating to `sub.example.` with the given DS status
pub fn delegated(ds_status: DsValidation) -> (Analysis, TrustAnchorSet) {
    let (parent, parent_ksk) = signed_zone("example.", None, 1);
    let (mut child, child_ksk) = signed_zone("sub.example.", Some("example."), 2);
    delegate(&mut child, &child_ksk, &parent_ksk, ds_status);

    let mut analysis = Analysis::new();
    analysis.add_zone(parent);
    analysis.add_zone(child);
    analysis.add_name(answered(
        "www.sub.example.",
        "sub.example.",
        RecordType::A,
        vec![signed_rrset("www.sub.example.", RecordType::A, &["192.0.2.2"], "sub.example.", &child_ksk)],
    ));
    (analysis, anchors(&[("example.", &parent_ksk)]))
}

pub fn status(graph: &AuthGraph, node: NodeId) -> Status {
    graph
        .node(node)
        .metadata
        .status
        .expect("graph has been resolved")
}

pub fn zone_status(graph: &AuthGraph, zone: &str) -> Status {
    status(graph, graph.zone_top(zone).expect("zone is graphed"))
}

/// Existent RRset node for (name, rdtype)
pub fn rrset_node(graph: &AuthGraph, name: &str, rdtype: RecordType) -> Option<NodeId> {
    graph.nodes().find_map(|(id, node)| match &node.kind {
        NodeKind::RRset {
            name: owner,
            rdtype: t,
            existence: Existence::Existent,
        } if owner == name && *t == rdtype => Some(id),
        _ => None,
    })
}

/// NXDOMAIN or NODATA node for (name, rdtype)
pub fn absent_node(graph: &AuthGraph, name: &str, rdtype: RecordType) -> Option<NodeId> {
    graph.nodes().find_map(|(id, node)| match &node.kind {
        NodeKind::RRset {
            name: owner,
            rdtype: t,
            existence: Existence::NxDomain | Existence::NoData,
        } if owner == name && *t == rdtype => Some(id),
        _ => None,
    })
}

pub fn dnskey_node(graph: &AuthGraph, zone: &str, key: &DnsKeyRecord) -> Option<NodeId> {
    let key_tag = key.key_tag();
    graph
        .dnskeys_in(zone)
        .into_iter()
        .find(|&n| matches!(graph.node(n).kind, NodeKind::DnsKey { key_tag: t, .. } if t == key_tag))
}

pub fn ds_node(graph: &AuthGraph, name: &str, rdtype: RecordType) -> Option<NodeId> {
    graph.nodes().find_map(|(id, node)| match &node.kind {
        NodeKind::Ds {
            name: owner,
            rdtype: t,
            ..
        } if owner == name && *t == rdtype => Some(id),
        _ => None,
    })
}

/// NSEC/NSEC3 set nodes proving something about `qname`
pub fn nsec_nodes(graph: &AuthGraph, qname: &str) -> Vec<NodeId> {
    graph
        .nodes()
        .filter(|(_, node)| matches!(&node.kind, NodeKind::NsecSet { name, .. } if name == qname))
        .map(|(id, _)| id)
        .collect()
}

/// Edge statuses of every edge between two nodes
pub fn edge_statuses(graph: &AuthGraph, from: NodeId, to: NodeId) -> Vec<Status> {
    graph
        .out_edges(from)
        .iter()
        .map(|&e| graph.edge(e))
        .filter(|edge| edge.to == to)
        .map(|edge| edge.metadata.status.expect("graph has been resolved"))
        .collect()
}

//! Graph builder.
//!
//! Turns an [`Analysis`] into an [`AuthGraph`]: zone clusters with their
//! DNSKEY and DS/DLV material, delegations between zones, and for each
//! graphed query the answer RRsets, proofs of non-existence, DNAME
//! synthesis and CNAME chains. Nothing is validated here; edge colors come
//! straight from the upstream validation results.

use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace, warn};

use super::edge::{
    EdgeColor, EdgeKind, LineStyle, delegation_style, digest_style, dname_style, nsec_style,
    rrsig_style,
};
use super::ids::IdRegistry;
use super::node::{Existence, NodeId, NodeKind};
use super::{AuthGraph, ElementId, StatusRef};
use crate::analysis::{
    Analysis, DnameStatus, DnsKeyRecord, DsStatus, NameAnalysis, NegativeResponse, NsecProof,
    QueryAnalysis, RRsetInfo, RrsigStatus, ZoneAnalysis,
};
use crate::dns::{RecordType, is_subdomain, normalize_name};
use crate::dnssec::{DelegationStatus, DigestType, DnsSecAlgorithm, DsValidation};
use crate::error::{AuthGraphError, Result};

/// Knobs that change how queries are graphed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// The analysis followed CNAME chains inside each response, so every
    /// answer in a response is graphed, not only those owned by the qname
    pub recursive: bool,
    /// Cutoff for nested CNAME targets
    pub max_chain_depth: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            max_chain_depth: 16,
        }
    }
}

pub struct GraphBuilder<'a> {
    analysis: &'a Analysis,
    options: BuildOptions,
    graph: AuthGraph,
    ids: IdRegistry,
    rrset_chains: BTreeMap<(String, RecordType), Vec<NodeId>>,
    zone_chains: BTreeSet<String>,
    next_discriminator: u32,
    chain_depth: usize,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(analysis: &'a Analysis, options: BuildOptions) -> Self {
        Self {
            analysis,
            options,
            graph: AuthGraph::new(),
            ids: IdRegistry::new(),
            rrset_chains: BTreeMap::new(),
            zone_chains: BTreeSet::new(),
            next_discriminator: 0,
            chain_depth: 0,
        }
    }

    pub fn graph(&self) -> &AuthGraph {
        &self.graph
    }

    pub fn finish(self) -> AuthGraph {
        self.graph
    }

    fn next_discriminator(&mut self) -> u32 {
        self.next_discriminator += 1;
        self.next_discriminator
    }

    /// Create the cluster for a zone and return its (top, bottom) anchors
    pub fn add_zone(&mut self, zone: &ZoneAnalysis, is_dlv: bool) -> (NodeId, NodeId) {
        let label = match zone.analysis_end {
            Some(end) => format!("{} ({})", zone.name, end.format("%Y-%m-%d %H:%M:%S UTC")),
            None => zone.name.clone(),
        };
        self.graph
            .add_cluster(&zone.name, label, zone.parent.clone(), is_dlv)
    }

    /// Cluster for a zone that only appears as a signer name
    fn ensure_cluster(&mut self, zone: &str) {
        let analysis = self.analysis;
        match analysis.zone(zone) {
            Some(zone) => {
                self.add_zone(zone, false);
            }
            None => {
                self.graph.add_cluster(zone, zone.to_string(), None, false);
            }
        }
    }

    pub fn add_dnskey(&mut self, zone: &str, key: &DnsKeyRecord) -> NodeId {
        let zone = normalize_name(zone);
        let id = self.ids.id_for_dnskey(&zone, key);
        let key_tag = key.key_tag();
        let (node, created) = self.graph.add_node(
            format!("DNSKEY-{id}|{zone}|{}|{key_tag}", key.algorithm),
            NodeKind::DnsKey {
                name: zone.clone(),
                algorithm: key.algorithm,
                key_tag,
                flags: key.flags,
                public_key: key.public_key.clone(),
            },
            &zone,
            format!("DNSKEY alg={}, id={key_tag}", key.algorithm),
        );

        if created {
            let analysis = self.analysis;
            let graph_node = self.graph.node_mut(node);
            graph_node.sep = key.is_sep();
            graph_node.revoked = key.is_revoked();

            let metadata = &mut graph_node.metadata;
            metadata.set_field("flags", key.flags);
            metadata.set_field("protocol", key.protocol);
            metadata.set_field("algorithm", algorithm_name(key.algorithm));
            metadata.set_field("key_tag", key_tag);
            metadata.set_field("key_length", key.public_key.len() * 8);
            if key.is_revoked() {
                metadata.set_field("key_tag_pre_revoke", key.key_tag_pre_revoke());
            }
            if let Some(zone) = analysis.zone(&zone) {
                metadata.add_errors(&zone.dnskey_errors);
                metadata.add_warnings(&zone.dnskey_warnings);
            }
        }

        self.graph.record_status(
            ElementId::Node(node),
            StatusRef::DnsKey {
                name: zone,
                algorithm: key.algorithm,
                key_tag,
            },
        );
        node
    }

    /// Placeholder for a DNSKEY referenced by an RRSIG or DS but missing
    /// from the DNSKEY RRset
    pub fn add_dnskey_non_existent(
        &mut self,
        name: &str,
        zone: &str,
        algorithm: u8,
        key_tag: u16,
    ) -> NodeId {
        trace!(name, algorithm, key_tag, "Adding placeholder DNSKEY");
        self.graph
            .dnskey_placeholder(&normalize_name(name), &normalize_name(zone), algorithm, key_tag)
    }

    /// Resolve the DNSKEY node a signature or digest refers to
    fn referenced_dnskey(
        &mut self,
        zone: &str,
        algorithm: u8,
        key_tag: u16,
        matched: Option<&DnsKeyRecord>,
    ) -> NodeId {
        if let Some(key) = matched {
            return self.add_dnskey(zone, key);
        }
        let analysis = self.analysis;
        match analysis
            .zone(zone)
            .and_then(|z| z.find_dnskey(algorithm, key_tag))
        {
            Some(key) => self.add_dnskey(zone, key),
            None => self.add_dnskey_non_existent(zone, zone, algorithm, key_tag),
        }
    }

    /// Consolidate DS (or DLV) records sharing algorithm and key tag into
    /// one node owned by `parent`, with a digest edge from the child DNSKEY
    pub fn add_ds(
        &mut self,
        name: &str,
        records: &[&DsStatus],
        zone: &ZoneAnalysis,
        parent: &ZoneAnalysis,
        rdtype: RecordType,
    ) -> Result<NodeId> {
        let name = normalize_name(name);
        if !rdtype.is_delegation_signer() {
            return Err(AuthGraphError::InvalidDsType { name, rdtype });
        }
        let first = records
            .first()
            .ok_or_else(|| AuthGraphError::EmptyDsGroup { name: name.clone() })?;
        if let Some(stray) = records
            .iter()
            .find(|ds| ds.algorithm != first.algorithm || ds.key_tag != first.key_tag)
        {
            return Err(AuthGraphError::InconsistentDsGroup {
                name,
                expected_algorithm: first.algorithm,
                expected_key_tag: first.key_tag,
                algorithm: stray.algorithm,
                key_tag: stray.key_tag,
            });
        }

        let (algorithm, key_tag) = (first.algorithm, first.key_tag);
        let ids = self.ids.id_for_multiple_ds(&name, records.iter().copied());
        let mut digest_types: SmallVec<[u8; 2]> = records.iter().map(|ds| ds.digest_type).collect();
        digest_types.sort_unstable();
        digest_types.dedup();

        let (node, created) = self.graph.add_node(
            format!("{rdtype}-{ids}|{name}|{algorithm}|{key_tag}"),
            NodeKind::Ds {
                name: name.clone(),
                algorithm,
                key_tag,
                digest_types: digest_types.clone(),
                rdtype,
            },
            &parent.name,
            format!("{rdtype} digest alg={algorithm}, id={key_tag}"),
        );
        if created {
            let metadata = &mut self.graph.node_mut(node).metadata;
            let described: Vec<String> = digest_types.iter().map(|&d| DigestType::describe(d)).collect();
            metadata.set_field("digest_types", described.join(", "));
            metadata.set_field("algorithm", algorithm_name(algorithm));
            for ds in records {
                metadata.add_errors(&ds.errors);
                metadata.add_warnings(&ds.warnings);
            }
        }

        let worst = records
            .iter()
            .map(|ds| ds.status)
            .max()
            .unwrap_or(first.status);
        let matched = records.iter().find_map(|ds| ds.dnskey.as_ref());
        let key_node = self.referenced_dnskey(&zone.name, algorithm, key_tag, matched);
        let (color, style) = digest_style(worst);
        let (edge, _) = self.graph.add_edge(
            key_node,
            node,
            &format!("digest-{rdtype}"),
            EdgeKind::Digest { status: worst },
            color,
            style,
        );

        for ds in records {
            let status = StatusRef::Ds {
                name: name.clone(),
                rdtype,
                algorithm,
                key_tag,
                digest_type: ds.digest_type,
            };
            self.graph.record_status(ElementId::Node(node), status.clone());
            self.graph.record_status(ElementId::Edge(edge), status);
        }
        Ok(node)
    }

    pub fn add_rrset(
        &mut self,
        zone: &ZoneAnalysis,
        rrset: &RRsetInfo,
        wildcard_owner: Option<&str>,
        discriminator: u32,
    ) -> NodeId {
        let owner = wildcard_owner
            .map(normalize_name)
            .unwrap_or_else(|| rrset.name.clone());
        let (node, created) = self.graph.add_node(
            format!("RRset-{discriminator}|{owner}|{}", rrset.rdtype),
            NodeKind::RRset {
                name: owner.clone(),
                rdtype: rrset.rdtype,
                existence: Existence::Existent,
            },
            &zone.name,
            format!("{owner}/{}", rrset.rdtype),
        );
        if created {
            let metadata = &mut self.graph.node_mut(node).metadata;
            metadata.set_field("ttl", rrset.ttl);
            if !rrset.rdata.is_empty() {
                metadata.set_field("rdata", rrset.rdata.join("; "));
            }
            if wildcard_owner.is_some() {
                metadata.set_field("synthesized_for", &rrset.name);
            }
            metadata.add_errors(&rrset.errors);
            metadata.add_warnings(&rrset.warnings);
        }
        self.graph.record_status(
            ElementId::Node(node),
            StatusRef::Rrset {
                name: rrset.name.clone(),
                rdtype: rrset.rdtype,
            },
        );
        node
    }

    /// Node for a proven-absent (qname, qtype). `response` is `None` when the
    /// absence is only implied by a wildcard expansion.
    pub fn add_rrset_non_existent(
        &mut self,
        zone: &ZoneAnalysis,
        qname: &str,
        qtype: RecordType,
        response: Option<&NegativeResponse>,
        nxdomain: bool,
    ) -> NodeId {
        let qname = normalize_name(qname);
        let (existence, tag) = if nxdomain {
            (Existence::NxDomain, "NXDOMAIN")
        } else {
            (Existence::NoData, "NODATA")
        };
        let (node, created) = self.graph.add_node(
            format!("RRset-{tag}|{qname}|{qtype}"),
            NodeKind::RRset {
                name: qname.clone(),
                rdtype: qtype,
                existence,
            },
            &zone.name,
            format!("{qname}/{qtype} ({tag})"),
        );
        if created {
            self.graph.node_mut(node).non_existent = true;
        }

        if let Some(response) = response {
            let metadata = &mut self.graph.node_mut(node).metadata;
            if !response.servers.is_empty() {
                metadata.set_field("servers", response.servers.join(", "));
            }
            if !response.soa.is_empty() {
                let owners: Vec<&str> = response.soa.iter().map(|s| s.name.as_str()).collect();
                metadata.set_field("soa", owners.join(", "));
            }
            metadata.add_errors(&response.errors);
            metadata.add_warnings(&response.warnings);
            self.graph.record_status(
                ElementId::Node(node),
                StatusRef::Negative {
                    qname,
                    qtype,
                    nxdomain,
                },
            );
        }
        node
    }

    /// Node holding response-level errors; `None` when there are none
    pub fn add_errors(
        &mut self,
        zone: &ZoneAnalysis,
        qname: &str,
        qtype: RecordType,
        errors: &[String],
    ) -> Option<NodeId> {
        if errors.is_empty() {
            return None;
        }
        let qname = normalize_name(qname);
        let (node, _) = self.graph.add_node(
            format!("Errors-{qname}|{qtype}"),
            NodeKind::Error {
                name: qname.clone(),
                rdtype: qtype,
            },
            &zone.name,
            format!("{qname}/{qtype} (errors)"),
        );
        self.graph.node_mut(node).metadata.add_errors(errors);
        self.graph.record_status(
            ElementId::Node(node),
            StatusRef::ResponseErrors { qname, qtype },
        );
        Some(node)
    }

    /// One edge per (color, style, port) from `signed` to each signing key,
    /// accumulating every RRSIG that maps onto it
    pub fn add_rrsigs(
        &mut self,
        zone: &ZoneAnalysis,
        name: &str,
        rdtype: RecordType,
        rrsigs: &[RrsigStatus],
        signed: NodeId,
        port: Option<&str>,
    ) -> Result<()> {
        let analysis = self.analysis;
        for rrsig in rrsigs {
            let signer = normalize_name(&rrsig.signer);
            if signer != zone.name {
                match analysis.zone(&signer) {
                    Some(signer_zone) => self.graph_zone_chain(signer_zone, false)?,
                    None => self.ensure_cluster(&signer),
                }
            }

            let key_node = self.referenced_dnskey(
                &signer,
                rrsig.algorithm,
                rrsig.key_tag,
                rrsig.dnskey.as_ref(),
            );
            let (color, style) = rrsig_style(rrsig.status);
            let record = port.map(normalize_name);
            let key = format!("RRSIG-{color:?}-{style:?}-{}", record.as_deref().unwrap_or(""));
            let (edge, _) = self.graph.add_edge(
                signed,
                key_node,
                &key,
                EdgeKind::Rrsig { port: record },
                color,
                style,
            );

            let metadata = &mut self.graph.edge_mut(edge).metadata;
            metadata.add_errors(&rrsig.errors);
            metadata.add_warnings(&rrsig.warnings);
            self.graph.record_status(
                ElementId::Edge(edge),
                StatusRef::Rrsig {
                    name: normalize_name(name),
                    rdtype,
                    signer,
                    algorithm: rrsig.algorithm,
                    key_tag: rrsig.key_tag,
                },
            );
        }
        Ok(())
    }

    /// NSEC/NSEC3 set node for a proof, signed per record, with a coverage
    /// edge from the node whose absence it proves
    pub fn add_nsec(
        &mut self,
        proof: &NsecProof,
        qname: &str,
        qtype: RecordType,
        zone: &ZoneAnalysis,
        covered: NodeId,
    ) -> Result<NodeId> {
        let qname = normalize_name(qname);
        let id = self.ids.id_for_nsec(&qname, qtype, proof);
        let rdtype = proof.variant.rdtype();
        let records: BTreeMap<String, bool> = proof
            .records
            .iter()
            .map(|record| (normalize_name(&record.name), false))
            .collect();
        let record_names: Vec<String> = records.keys().cloned().collect();

        let (node, created) = self.graph.add_node(
            format!("{rdtype}-{id}|{qname}|{qtype}"),
            NodeKind::NsecSet {
                name: qname.clone(),
                qtype,
                variant: proof.variant,
                opt_out: proof.opt_out,
                records,
            },
            &zone.name,
            format!("{rdtype} proof for {qname}/{qtype}"),
        );
        if created {
            let metadata = &mut self.graph.node_mut(node).metadata;
            metadata.set_field("records", record_names.join(", "));
            if proof.opt_out {
                metadata.set_field("opt_out", true);
            }
            metadata.add_errors(&proof.errors);
            metadata.add_warnings(&proof.warnings);

            for record in &proof.records {
                self.add_rrsigs(zone, &record.name, rdtype, &record.rrsigs, node, Some(&record.name))?;
            }
        }

        let status_ref = StatusRef::Nsec {
            qname,
            qtype,
            variant: proof.variant,
            records: record_names,
        };
        self.graph.record_status(ElementId::Node(node), status_ref.clone());

        let (color, style) = nsec_style(proof.status);
        let (edge, _) = self.graph.add_edge(
            covered,
            node,
            &format!("{rdtype}-cover"),
            EdgeKind::NsecCoverage {
                status: proof.status,
                port: proof.covering_record.as_deref().map(normalize_name),
            },
            color,
            style,
        );
        self.graph.record_status(ElementId::Edge(edge), status_ref);
        Ok(node)
    }

    /// Wildcard-synthesized answer, plus the proof that the exact query name
    /// does not exist. Nodes of the proof are appended to `proof_nodes`.
    pub fn add_wildcard(
        &mut self,
        zone: &ZoneAnalysis,
        rrset: &RRsetInfo,
        discriminator: u32,
        proof_nodes: &mut Vec<NodeId>,
    ) -> Result<NodeId> {
        let Some(wildcard) = &rrset.wildcard else {
            let node = self.add_rrset(zone, rrset, None, discriminator);
            self.add_rrsigs(zone, &rrset.name, rrset.rdtype, &rrset.rrsigs, node, None)?;
            return Ok(node);
        };
        let node = self.add_rrset(zone, rrset, Some(&wildcard.wildcard_name), discriminator);
        self.add_rrsigs(zone, &rrset.name, rrset.rdtype, &rrset.rrsigs, node, None)?;

        let absent = self.add_rrset_non_existent(zone, &rrset.name, rrset.rdtype, None, true);
        push_unique(proof_nodes, absent);
        for proof in &wildcard.nsec_proofs {
            let set = self.add_nsec(proof, &rrset.name, rrset.rdtype, zone, absent)?;
            push_unique(proof_nodes, set);
        }
        Ok(node)
    }

    /// DNAME node and the CNAME synthesized from it; returns the CNAME node
    pub fn add_dname(
        &mut self,
        dname: &DnameStatus,
        zone: &ZoneAnalysis,
        discriminator: u32,
    ) -> Result<NodeId> {
        let dname_node = self.add_rrset(zone, &dname.dname, None, discriminator);
        self.add_rrsigs(
            zone,
            &dname.dname.name,
            RecordType::DNAME,
            &dname.dname.rrsigs,
            dname_node,
            None,
        )?;

        let cname_node = match &dname.synthesized_cname {
            Some(cname) => {
                let node = self.add_rrset(zone, cname, None, discriminator);
                self.add_rrsigs(zone, &cname.name, cname.rdtype, &cname.rrsigs, node, None)?;
                node
            }
            None => {
                let qname = normalize_name(&dname.qname);
                let (node, created) = self.graph.add_node(
                    format!("RRset-{discriminator}|{qname}|CNAME"),
                    NodeKind::RRset {
                        name: qname.clone(),
                        rdtype: RecordType::CNAME,
                        existence: Existence::NoData,
                    },
                    &zone.name,
                    format!("{qname}/CNAME (missing)"),
                );
                if created {
                    self.graph.node_mut(node).non_existent = true;
                }
                node
            }
        };

        let (color, style) = dname_style(dname.status);
        let (edge, _) = self.graph.add_edge(
            cname_node,
            dname_node,
            "DNAME",
            EdgeKind::Dname {
                status: dname.status,
            },
            color,
            style,
        );
        let metadata = &mut self.graph.edge_mut(edge).metadata;
        metadata.add_errors(&dname.errors);
        metadata.add_warnings(&dname.warnings);
        self.graph.record_status(
            ElementId::Edge(edge),
            StatusRef::Dname {
                owner: dname.dname.name.clone(),
                qname: normalize_name(&dname.qname),
            },
        );
        Ok(cname_node)
    }

    /// Bookkeeping edge from a CNAME target to the CNAME owner
    pub fn add_alias(&mut self, alias: NodeId, target: NodeId) {
        self.graph.add_edge(
            target,
            alias,
            "alias",
            EdgeKind::Alias,
            EdgeColor::Plain,
            LineStyle::Solid,
        );
    }

    /// Graph everything learned for one (name, rdtype) query, following
    /// CNAMEs. Pairs that were never queried yield no nodes.
    pub fn graph_rrset_chain(&mut self, name: &str, rdtype: RecordType) -> Result<Vec<NodeId>> {
        let name = normalize_name(name);
        let key = (name.clone(), rdtype);
        if let Some(nodes) = self.rrset_chains.get(&key) {
            trace!(%name, %rdtype, "RRset chain already graphed");
            return Ok(nodes.clone());
        }

        let analysis = self.analysis;
        let Some(name_analysis) = analysis.name(&name) else {
            debug!(%name, "No analysis for name");
            return Ok(Vec::new());
        };
        let Some(query) = name_analysis.query(rdtype) else {
            debug!(%name, %rdtype, "Query was not performed");
            return Ok(Vec::new());
        };
        if self.chain_depth >= self.options.max_chain_depth {
            warn!(%name, %rdtype, depth = self.chain_depth, "Chain depth limit reached");
            return Ok(Vec::new());
        }

        // Placeholder entry so that a CNAME loop back to this pair stops here
        self.rrset_chains.insert(key.clone(), Vec::new());
        self.chain_depth += 1;
        let result = self.graph_query(name_analysis, query);
        self.chain_depth -= 1;
        let nodes = result?;

        debug!(%name, %rdtype, nodes = nodes.len(), "Graphed RRset chain");
        self.rrset_chains.insert(key, nodes.clone());
        Ok(nodes)
    }

    fn graph_query(&mut self, name: &NameAnalysis, query: &QueryAnalysis) -> Result<Vec<NodeId>> {
        let analysis = self.analysis;
        let zone = analysis
            .zone(&name.zone)
            .filter(|zone| is_subdomain(&name.name, &zone.name))
            .or_else(|| analysis.zone_for(&name.name))
            .ok_or_else(|| AuthGraphError::UnknownZone(name.zone.clone()))?;
        self.graph_zone_chain(zone, false)?;

        let discriminator = self.next_discriminator();
        let mut nodes = Vec::new();
        // (owner, node) of every answer graphed from this response
        let mut answered: Vec<(String, NodeId)> = Vec::new();
        // (target, CNAME node) still to be followed
        let mut cnames: Vec<(String, NodeId)> = Vec::new();

        let mut dname_cnames: BTreeMap<String, NodeId> = BTreeMap::new();
        for dname in &query.dnames {
            let cname = self.add_dname(dname, zone, discriminator)?;
            nodes.push(cname);
            dname_cnames.insert(normalize_name(&dname.qname), cname);
            if let Some(target) = dname
                .synthesized_cname
                .as_ref()
                .and_then(RRsetInfo::cname_target)
            {
                answered.push((normalize_name(&dname.qname), cname));
                cnames.push((target, cname));
            }
        }

        let mut proof_nodes = Vec::new();
        for rrset in &query.answers {
            if !self.options.recursive && rrset.name != name.name {
                continue;
            }
            if rrset.rdtype == RecordType::CNAME && dname_cnames.contains_key(&rrset.name) {
                continue;
            }
            let node = self.add_wildcard(zone, rrset, discriminator, &mut proof_nodes)?;
            nodes.push(node);
            answered.push((rrset.name.clone(), node));
            if query.qtype != RecordType::CNAME {
                if let Some(target) = rrset.cname_target() {
                    cnames.push((target, node));
                }
            }
        }

        nodes.extend(proof_nodes);

        for response in &query.nxdomain {
            let node = self.graph_negative_response(zone, response, true, &mut nodes)?;
            answered.push((normalize_name(&response.qname), node));
        }
        for response in &query.nodata {
            let node = self.graph_negative_response(zone, response, false, &mut nodes)?;
            answered.push((normalize_name(&response.qname), node));
        }

        for (target, cname) in cnames {
            if self.options.recursive {
                for &(_, node) in answered.iter().filter(|(owner, _)| *owner == target) {
                    self.add_alias(cname, node);
                }
            } else {
                for node in self.graph_rrset_chain(&target, query.qtype)? {
                    if answers_query(&self.graph.node(node).kind, query.qtype) {
                        self.add_alias(cname, node);
                    }
                }
            }
        }

        if let Some(node) = self.add_errors(zone, &name.name, query.qtype, &query.errors) {
            nodes.push(node);
        }
        Ok(nodes)
    }

    fn graph_negative_response(
        &mut self,
        zone: &ZoneAnalysis,
        response: &NegativeResponse,
        nxdomain: bool,
        nodes: &mut Vec<NodeId>,
    ) -> Result<NodeId> {
        let node =
            self.add_rrset_non_existent(zone, &response.qname, response.qtype, Some(response), nxdomain);
        nodes.push(node);
        for soa in &response.soa {
            let discriminator = self.next_discriminator();
            let soa_node = self.add_rrset(zone, soa, None, discriminator);
            self.add_rrsigs(zone, &soa.name, soa.rdtype, &soa.rrsigs, soa_node, None)?;
            nodes.push(soa_node);
        }
        for proof in &response.nsec_proofs {
            let set = self.add_nsec(proof, &response.qname, response.qtype, zone, node)?;
            push_unique(nodes, set);
        }
        Ok(node)
    }

    /// Zone skeleton: DNSKEYs, then the parent chain with the DS/DLV
    /// material and delegation edge. Each zone is graphed once.
    pub fn graph_zone_chain(&mut self, zone: &ZoneAnalysis, is_dlv: bool) -> Result<()> {
        if !self.zone_chains.insert(zone.name.clone()) {
            if is_dlv {
                self.add_zone(zone, true);
            }
            return Ok(());
        }
        debug!(zone = %zone.name, is_dlv, "Graphing zone chain");
        let (top, _) = self.add_zone(zone, is_dlv);

        let keys: Vec<NodeId> = zone
            .dnskeys
            .iter()
            .map(|key| self.add_dnskey(&zone.name, key))
            .collect();
        for key in keys {
            self.add_rrsigs(zone, &zone.name, RecordType::DNSKEY, &zone.dnskey_rrsigs, key, None)?;
        }

        if zone.stub {
            trace!(zone = %zone.name, "Stub zone, not descending further");
            return Ok(());
        }

        let analysis = self.analysis;
        if let Some(parent) = zone.parent.as_deref().and_then(|p| analysis.zone(p)) {
            self.graph_zone_chain(parent, false)?;
            self.graph_delegation(zone, parent, top)?;
        }

        if !is_dlv {
            if let Some(dlv_zone) = zone.dlv.as_deref().and_then(|d| analysis.zone(d)) {
                self.graph_dlv(zone, dlv_zone)?;
            }
        }
        Ok(())
    }

    fn graph_delegation(
        &mut self,
        zone: &ZoneAnalysis,
        parent: &ZoneAnalysis,
        top: NodeId,
    ) -> Result<()> {
        let mut evidence = Vec::new();
        for group in group_by_key(&zone.ds).values() {
            let ds_node = self.add_ds(&zone.name, group, zone, parent, RecordType::DS)?;
            self.add_rrsigs(parent, &zone.name, RecordType::DS, &zone.ds_rrsigs, ds_node, None)?;
            evidence.push(ds_node);
        }

        if zone.ds.is_empty() {
            if let Some(response) = &zone.ds_nonexistence {
                let mut nodes = Vec::new();
                let node = self.graph_negative_response(parent, response, false, &mut nodes)?;
                evidence.push(node);
            }
        }

        let (status, errors, warnings) = match &zone.delegation {
            Some(delegation) => (
                delegation.status,
                delegation.errors.as_slice(),
                delegation.warnings.as_slice(),
            ),
            None => (derive_delegation_status(zone), &[][..], &[][..]),
        };
        let (color, style) = delegation_style(status);
        let Some(parent_bottom) = self.graph.cluster(&parent.name).map(|c| c.bottom) else {
            return Err(AuthGraphError::UnknownZone(parent.name.clone()));
        };
        let (edge, _) = self.graph.add_edge(
            top,
            parent_bottom,
            "delegation",
            EdgeKind::Delegation { status, evidence },
            color,
            style,
        );
        let metadata = &mut self.graph.edge_mut(edge).metadata;
        metadata.add_errors(errors);
        metadata.add_warnings(warnings);
        self.graph.record_status(
            ElementId::Edge(edge),
            StatusRef::Delegation {
                zone: zone.name.clone(),
            },
        );
        Ok(())
    }

    fn graph_dlv(&mut self, zone: &ZoneAnalysis, dlv_zone: &ZoneAnalysis) -> Result<()> {
        if zone.dlv_records.is_empty() {
            return Ok(());
        }
        self.graph_zone_chain(dlv_zone, true)?;
        let owner = dlv_owner(&zone.name, &dlv_zone.name);
        debug!(zone = %zone.name, dlv = %owner, "Graphing look-aside records");
        for group in group_by_key(&zone.dlv_records).values() {
            let node = self.add_ds(&owner, group, zone, dlv_zone, RecordType::DLV)?;
            self.add_rrsigs(dlv_zone, &owner, RecordType::DLV, &zone.dlv_rrsigs, node, None)?;
        }
        Ok(())
    }
}

fn algorithm_name(algorithm: u8) -> String {
    DnsSecAlgorithm::describe(algorithm)
}

/// DS/DLV records grouped by (algorithm, key tag)
fn group_by_key(records: &[DsStatus]) -> BTreeMap<(u8, u16), Vec<&DsStatus>> {
    let mut groups: BTreeMap<(u8, u16), Vec<&DsStatus>> = BTreeMap::new();
    for ds in records {
        groups.entry((ds.algorithm, ds.key_tag)).or_default().push(ds);
    }
    groups
}

fn push_unique(nodes: &mut Vec<NodeId>, node: NodeId) {
    if !nodes.contains(&node) {
        nodes.push(node);
    }
}

/// Name under which a zone's DLV records live in the look-aside zone
fn dlv_owner(zone: &str, dlv_zone: &str) -> String {
    if zone == "." {
        dlv_zone.to_string()
    } else {
        format!("{zone}{dlv_zone}")
    }
}

/// Delegation status when the analysis does not state one
fn derive_delegation_status(zone: &ZoneAnalysis) -> DelegationStatus {
    if zone.ds.iter().any(|ds| ds.status == DsValidation::Valid) {
        DelegationStatus::Secure
    } else if !zone.ds.is_empty()
        && zone
            .ds
            .iter()
            .all(|ds| ds.status == DsValidation::AlgorithmIgnored)
    {
        DelegationStatus::Insecure
    } else if zone.ds.is_empty() && zone.ds_nonexistence.is_some() {
        DelegationStatus::Insecure
    } else {
        DelegationStatus::Bogus
    }
}

fn answers_query(kind: &NodeKind, qtype: RecordType) -> bool {
    matches!(kind, NodeKind::RRset { rdtype, .. } if *rdtype == qtype || *rdtype == RecordType::CNAME)
}

//! Trust propagation.
//!
//! Starting from the configured trust anchors, trust flows backwards along
//! edges: a secure DNSKEY secures whatever it validly signs, a secure DS
//! secures the self-signed key it digests, a fully authenticated NSEC set
//! secures the absence it proves. A second pass then walks the zone tree
//! and marks whatever trust did not reach in a secure zone as bogus, unless
//! the zone was provably delegated insecurely. DLV records are held back
//! and used as extra trust sources once the anchors are done.

use rustc_hash::FxHashSet;
use std::collections::BTreeSet;
use tracing::{debug, info, trace};

use super::AuthGraph;
use super::edge::{EdgeColor, EdgeKind, LineStyle};
use super::node::{NodeId, NodeKind, TrustColor};
use crate::dnssec::{AlgorithmSet, TrustAnchorSet};

pub struct TrustPropagator<'g> {
    graph: &'g mut AuthGraph,
    supported: AlgorithmSet,
    /// Nodes on the current traversal path
    trace: FxHashSet<NodeId>,
    dlv_nodes: BTreeSet<NodeId>,
}

impl<'g> TrustPropagator<'g> {
    pub fn new(graph: &'g mut AuthGraph, supported: AlgorithmSet) -> Self {
        Self {
            graph,
            supported,
            trace: FxHashSet::default(),
            dlv_nodes: BTreeSet::new(),
        }
    }

    /// Color the graph from `anchors`. Runs once, after the graph is built.
    pub fn propagate(mut self, anchors: &TrustAnchorSet) {
        let mut anchored_zones = Vec::new();
        for zone in anchors.zones() {
            if self.graph.cluster(zone).is_none() {
                trace!(zone, "Trust anchor zone not in graph");
                continue;
            }
            self.seed_zone(zone, anchors);
            anchored_zones.push(zone.to_string());
        }

        for zone in &anchored_zones {
            self.mark_orphans(zone, &mut BTreeSet::new());
        }

        let dlv_zones = self.propagate_dlv();
        for zone in &dlv_zones {
            self.mark_orphans(zone, &mut BTreeSet::new());
        }
    }

    fn seed_zone(&mut self, zone: &str, anchors: &TrustAnchorSet) {
        let Some(top) = self.graph.zone_top(zone) else {
            return;
        };
        let zone_anchors = anchors.anchors_for(zone);
        if !zone_anchors
            .iter()
            .any(|anchor| self.supported.contains(anchor.algorithm))
        {
            info!(zone, "No trust anchor uses a supported algorithm, zone is insecure");
            self.graph.node_mut(top).set_color(TrustColor::Insecure);
            return;
        }

        let mut seeds = Vec::new();
        for anchor in zone_anchors {
            let mut matched: Vec<NodeId> = self
                .graph
                .dnskeys_in(zone)
                .into_iter()
                .filter(|&n| match &self.graph.node(n).kind {
                    NodeKind::DnsKey {
                        algorithm,
                        key_tag,
                        public_key,
                        ..
                    } => anchor.matches(*algorithm, *key_tag, public_key),
                    _ => false,
                })
                .collect();
            if matched.is_empty() {
                debug!(zone, key_tag = anchor.key_tag, "Trust anchor not in DNSKEY RRset");
                matched.push(self.graph.dnskey_placeholder(
                    zone,
                    zone,
                    anchor.algorithm,
                    anchor.key_tag,
                ));
            }
            for node in matched {
                self.graph.node_mut(node).trust_anchor = true;
                seeds.push(node);
            }
        }

        for seed in seeds {
            if !self.self_signed(seed) {
                debug!(zone, node = %self.graph.node(seed), "Trust anchor lacks a valid self-signature");
                continue;
            }
            debug!(zone, node = %self.graph.node(seed), "Seeding trust");
            self.graph.node_mut(seed).set_color(TrustColor::Secure);
            self.graph.node_mut(top).set_color(TrustColor::Secure);
            self.trace.clear();
            self.traverse(seed, false);
        }
    }

    /// Check for a valid self-signature, recording the zone's DNSKEY RRset
    /// as secure when one exists
    fn self_signed(&mut self, node: NodeId) -> bool {
        if !self.graph.has_valid_self_loop(node) {
            return false;
        }
        let zone = self.graph.node(node).zone.clone();
        self.graph.mark_secure_dnskey_rrset(&zone);
        true
    }

    /// Follow trust into `node`. `force` lets a DLV node act as the root of
    /// a traversal; DLV nodes reached below the root are deferred again.
    fn traverse(&mut self, node: NodeId, force: bool) {
        if !self.trace.insert(node) {
            return;
        }
        self.follow_in_edges(node, force);
        self.trace.remove(&node);
    }

    fn follow_in_edges(&mut self, node: NodeId, force: bool) {
        let current = self.graph.node(node);
        if current.kind.is_dlv() && !force {
            trace!(node = %current, "Deferring DLV node");
            self.dlv_nodes.insert(node);
            return;
        }
        let expandable = matches!(
            current.kind,
            NodeKind::DnsKey { .. } | NodeKind::Ds { .. } | NodeKind::NsecSet { .. }
        ) || current.kind.is_dname();
        if !expandable {
            return;
        }
        if current.is_dnskey() {
            if !current.color.is_secure() {
                return;
            }
            if (current.trust_anchor || current.revoked) && !self.self_signed(node) {
                return;
            }
        }

        for edge_id in self.graph.in_edges(node).to_vec() {
            let edge = self.graph.edge(edge_id);
            if edge.is_self_loop() || edge.color != EdgeColor::Secure {
                continue;
            }
            let source = edge.from;
            match &edge.kind {
                EdgeKind::Rrsig { port: Some(record) }
                    if matches!(self.graph.node(source).kind, NodeKind::NsecSet { .. }) =>
                {
                    let record = record.clone();
                    self.trust_nsec_record(source, &record);
                }
                EdgeKind::Rrsig { .. } => {
                    let signed = self.graph.node(source);
                    if signed.color.is_secure() {
                        continue;
                    }
                    if signed.is_dnskey()
                        && (signed.trust_anchor || signed.revoked)
                        && !self.self_signed(source)
                    {
                        continue;
                    }
                    self.mark_secure(source);
                    self.traverse(source, false);
                }
                EdgeKind::Digest { .. } => {
                    if self.graph.node(source).color.is_secure() || !self.self_signed(source) {
                        continue;
                    }
                    self.mark_secure(source);
                    let zone = self.graph.node(source).zone.clone();
                    if let Some(top) = self.graph.zone_top(&zone) {
                        self.graph.node_mut(top).set_color(TrustColor::Secure);
                    }
                    self.traverse(source, false);
                }
                EdgeKind::NsecCoverage { .. } => {
                    let opt_out = matches!(
                        self.graph.node(node).kind,
                        NodeKind::NsecSet { opt_out: true, .. }
                    );
                    let color = if opt_out {
                        TrustColor::InsecureNonExistent
                    } else {
                        TrustColor::SecureNonExistent
                    };
                    self.graph.node_mut(source).set_color(color);
                }
                EdgeKind::Dname { .. } => {
                    self.mark_secure(source);
                }
                EdgeKind::Delegation { .. } | EdgeKind::Alias => {}
            }
        }
    }

    fn mark_secure(&mut self, node: NodeId) {
        let graph_node = self.graph.node_mut(node);
        let color = graph_node.secure_color();
        graph_node.set_color(color);
    }

    /// Mark one record of an NSEC/NSEC3 set as authenticated. The set itself
    /// becomes secure once every record is.
    fn trust_nsec_record(&mut self, set: NodeId, record: &str) {
        let graph_node = self.graph.node_mut(set);
        let NodeKind::NsecSet { records, .. } = &mut graph_node.kind else {
            return;
        };
        if let Some(trusted) = records.get_mut(record) {
            *trusted = true;
        }
        let complete = records.values().all(|&trusted| trusted);
        if complete && !graph_node.color.is_secure() {
            graph_node.set_color(TrustColor::Secure);
            self.traverse(set, false);
        }
    }

    /// Mark everything trust did not reach in a secure zone as bogus, then
    /// descend through the zone's delegations
    fn mark_orphans(&mut self, zone: &str, visited: &mut BTreeSet<String>) {
        if !visited.insert(zone.to_string()) {
            return;
        }
        let Some(cluster) = self.graph.cluster(zone) else {
            return;
        };
        let (top, bottom) = (cluster.top, cluster.bottom);
        let members = cluster.nodes.clone();

        let top_color = self.graph.node(top).color;
        match top_color {
            TrustColor::Insecure => return,
            TrustColor::Unset => self.graph.node_mut(top).set_color(TrustColor::Bogus),
            _ => {}
        }

        let mut marked = 0usize;
        for member in members {
            let graph_node = self.graph.node(member);
            if graph_node.color.is_set()
                || graph_node.kind.is_layout()
                || matches!(graph_node.kind, NodeKind::Error { .. })
                || (graph_node.is_dnskey() && graph_node.non_existent && !graph_node.trust_anchor)
            {
                continue;
            }
            let color = graph_node.bogus_color();
            self.graph.node_mut(member).set_color(color);
            marked += 1;
        }
        if marked > 0 {
            debug!(zone, marked, "Marked unauthenticated nodes bogus");
        }

        let parent_secure = self.graph.node(top).color.is_secure();
        for edge_id in self.graph.in_edges(bottom).to_vec() {
            let edge = self.graph.edge(edge_id);
            let EdgeKind::Delegation { evidence, .. } = &edge.kind else {
                continue;
            };
            let child_top = edge.from;
            let child_zone = self.graph.node(child_top).zone.clone();

            if parent_secure {
                if edge.color == EdgeColor::Secure {
                    self.graph.node_mut(child_top).set_color(TrustColor::Secure);
                } else if edge.color == EdgeColor::Insecure
                    && edge.style == LineStyle::Solid
                    && evidence
                        .iter()
                        .all(|&proof| self.graph.node(proof).color.is_authenticated())
                {
                    debug!(zone = %child_zone, "Delegation provably insecure");
                    self.graph.node_mut(child_top).set_color(TrustColor::Insecure);
                    continue;
                }
            }

            if !self.graph.node(child_top).color.is_set() {
                self.graph.node_mut(child_top).set_color(TrustColor::Bogus);
            }
            self.mark_orphans(&child_zone, visited);
        }
    }

    /// Traverse the deferred DLV nodes as trust sources, round by round, as
    /// long as a traversal defers further DLV nodes. Returns the zones they
    /// secured.
    fn propagate_dlv(&mut self) -> BTreeSet<String> {
        let mut secured = BTreeSet::new();
        let mut done = BTreeSet::new();
        while !self.dlv_nodes.is_empty() {
            for dlv in std::mem::take(&mut self.dlv_nodes) {
                if done.contains(&dlv) || !self.graph.node(dlv).color.is_secure() {
                    continue;
                }
                done.insert(dlv);
                secured.extend(self.propagate_from_dlv(dlv));
            }
        }
        secured
    }

    fn propagate_from_dlv(&mut self, dlv: NodeId) -> Vec<String> {
        let targets: BTreeSet<String> = self
            .graph
            .in_edges(dlv)
            .iter()
            .map(|&e| self.graph.edge(e))
            .filter(|edge| matches!(edge.kind, EdgeKind::Digest { .. }))
            .map(|edge| self.graph.node(edge.from).zone.clone())
            .collect();
        let pending: Vec<String> = targets
            .into_iter()
            .filter(|zone| {
                self.graph
                    .zone_top(zone)
                    .is_some_and(|top| !self.graph.node(top).color.is_secure())
            })
            .collect();
        if pending.is_empty() {
            return Vec::new();
        }

        debug!(node = %self.graph.node(dlv), "Propagating trust from DLV");
        self.trace.clear();
        self.traverse(dlv, true);
        pending
            .into_iter()
            .filter(|zone| {
                self.graph
                    .zone_top(zone)
                    .is_some_and(|top| self.graph.node(top).color.is_secure())
            })
            .collect()
    }
}

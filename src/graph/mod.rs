//! DNSSEC authentication graph.
//!
//! [`AuthGraph`] is an index arena of typed nodes and edges grouped into
//! zone clusters. It is filled by [`GraphBuilder`], colored by
//! [`TrustPropagator`] and finalized by [`status::resolve`].

pub mod builder;
pub mod edge;
pub mod ids;
pub mod node;
pub mod status;
pub mod trust;

pub use builder::{BuildOptions, GraphBuilder};
pub use edge::{EdgeColor, EdgeId, EdgeKind, GraphEdge, LineStyle};
pub use ids::IdRegistry;
pub use node::{AnchorPosition, Existence, GraphNode, Metadata, NodeId, NodeKind, TrustColor};
pub use status::{Status, StatusReport};
pub use trust::TrustPropagator;

use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::NsecVariant;
use crate::dns::RecordType;

/// A zone drawn as one cluster, with its two layout anchors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneCluster {
    pub name: String,
    pub label: String,
    pub top: NodeId,
    pub bottom: NodeId,
    pub parent: Option<String>,
    /// Zone is a DNSSEC look-aside registry
    pub is_dlv: bool,
    pub nodes: Vec<NodeId>,
}

/// A node or an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementId {
    Node(NodeId),
    Edge(EdgeId),
}

/// Identity of an upstream validation result that contributed to a graph
/// element. Several results may collapse onto one element.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusRef {
    Rrsig {
        name: String,
        rdtype: RecordType,
        signer: String,
        algorithm: u8,
        key_tag: u16,
    },
    Ds {
        name: String,
        rdtype: RecordType,
        algorithm: u8,
        key_tag: u16,
        digest_type: u8,
    },
    DnsKey {
        name: String,
        algorithm: u8,
        key_tag: u16,
    },
    Rrset {
        name: String,
        rdtype: RecordType,
    },
    Negative {
        qname: String,
        qtype: RecordType,
        nxdomain: bool,
    },
    Nsec {
        qname: String,
        qtype: RecordType,
        variant: NsecVariant,
        records: Vec<String>,
    },
    Dname {
        owner: String,
        qname: String,
    },
    Delegation {
        zone: String,
    },
    ResponseErrors {
        qname: String,
        qtype: RecordType,
    },
}

#[derive(Debug, Default)]
pub struct AuthGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    node_index: FxHashMap<String, NodeId>,
    edge_index: FxHashMap<(NodeId, NodeId, String), EdgeId>,
    in_edges: Vec<Vec<EdgeId>>,
    out_edges: Vec<Vec<EdgeId>>,
    clusters: BTreeMap<String, ZoneCluster>,
    status_refs: BTreeMap<ElementId, Vec<StatusRef>>,
    elements: BTreeMap<StatusRef, BTreeSet<ElementId>>,
    secure_dnskey_rrsets: BTreeSet<String>,
}

impl AuthGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut GraphNode {
        &mut self.nodes[id.0]
    }

    pub fn edge(&self, id: EdgeId) -> &GraphEdge {
        &self.edges[id.0]
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> &mut GraphEdge {
        &mut self.edges[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &GraphNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &GraphEdge)> {
        self.edges.iter().enumerate().map(|(i, e)| (EdgeId(i), e))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Look a node up by its string identifier
    pub fn find_node(&self, id: &str) -> Option<NodeId> {
        self.node_index.get(id).copied()
    }

    /// First edge between two nodes, in insertion order
    pub fn find_edge(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        self.out_edges[from.0]
            .iter()
            .copied()
            .find(|&e| self.edges[e.0].to == to)
    }

    pub fn in_edges(&self, node: NodeId) -> &[EdgeId] {
        &self.in_edges[node.0]
    }

    pub fn out_edges(&self, node: NodeId) -> &[EdgeId] {
        &self.out_edges[node.0]
    }

    pub fn cluster(&self, zone: &str) -> Option<&ZoneCluster> {
        self.clusters.get(zone)
    }

    pub fn clusters(&self) -> impl Iterator<Item = &ZoneCluster> {
        self.clusters.values()
    }

    pub fn zone_top(&self, zone: &str) -> Option<NodeId> {
        self.clusters.get(zone).map(|c| c.top)
    }

    /// Graph elements produced from an upstream validation result
    pub fn elements_for(&self, status: &StatusRef) -> impl Iterator<Item = ElementId> + '_ {
        self.elements.get(status).into_iter().flatten().copied()
    }

    /// Upstream validation results that contributed to a graph element
    pub fn status_refs(&self, element: ElementId) -> &[StatusRef] {
        self.status_refs
            .get(&element)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Zones whose DNSKEY RRset carries a valid self-signature from a
    /// trusted key
    pub fn secure_dnskey_rrsets(&self) -> &BTreeSet<String> {
        &self.secure_dnskey_rrsets
    }

    /// DNSKEY nodes drawn in a zone's cluster
    pub fn dnskeys_in(&self, zone: &str) -> Vec<NodeId> {
        self.clusters
            .get(zone)
            .map(|cluster| {
                cluster
                    .nodes
                    .iter()
                    .copied()
                    .filter(|&n| self.nodes[n.0].is_dnskey())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a DNSKEY node signs itself with a valid signature
    pub fn has_valid_self_loop(&self, node: NodeId) -> bool {
        self.out_edges[node.0].iter().any(|&e| {
            let edge = &self.edges[e.0];
            edge.is_self_loop()
                && matches!(edge.kind, EdgeKind::Rrsig { .. })
                && edge.color == EdgeColor::Secure
        })
    }

    /// Create a zone cluster with its top and bottom anchors, or return the
    /// anchors of the existing one
    pub(crate) fn add_cluster(
        &mut self,
        zone: &str,
        label: String,
        parent: Option<String>,
        is_dlv: bool,
    ) -> (NodeId, NodeId) {
        if let Some(cluster) = self.clusters.get_mut(zone) {
            cluster.is_dlv |= is_dlv;
            return (cluster.top, cluster.bottom);
        }
        let top = self.push_node(GraphNode::new(
            format!("cluster_{zone}_top"),
            NodeKind::ZoneCluster {
                zone: zone.to_string(),
                position: AnchorPosition::Top,
            },
            zone,
            String::new(),
        ));
        let bottom = self.push_node(GraphNode::new(
            format!("cluster_{zone}_bottom"),
            NodeKind::ZoneCluster {
                zone: zone.to_string(),
                position: AnchorPosition::Bottom,
            },
            zone,
            String::new(),
        ));
        self.clusters.insert(
            zone.to_string(),
            ZoneCluster {
                name: zone.to_string(),
                label,
                top,
                bottom,
                parent,
                is_dlv,
                nodes: vec![top, bottom],
            },
        );
        (top, bottom)
    }

    /// Add a node, or return the existing node with the same identifier.
    /// The flag is true when the node was created by this call.
    pub(crate) fn add_node(
        &mut self,
        id: String,
        kind: NodeKind,
        zone: &str,
        label: String,
    ) -> (NodeId, bool) {
        if let Some(&existing) = self.node_index.get(&id) {
            return (existing, false);
        }
        let node = self.push_node(GraphNode::new(id, kind, zone, label));
        if let Some(cluster) = self.clusters.get_mut(zone) {
            cluster.nodes.push(node);
        }
        (node, true)
    }

    fn push_node(&mut self, node: GraphNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.node_index.insert(node.id.clone(), id);
        self.nodes.push(node);
        self.in_edges.push(Vec::new());
        self.out_edges.push(Vec::new());
        id
    }

    /// Add an edge keyed by `(from, to, key)`, or return the existing one.
    /// The flag is true when the edge was created by this call.
    pub(crate) fn add_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        key: &str,
        kind: EdgeKind,
        color: EdgeColor,
        style: LineStyle,
    ) -> (EdgeId, bool) {
        let index_key = (from, to, key.to_string());
        if let Some(&existing) = self.edge_index.get(&index_key) {
            return (existing, false);
        }
        let id = EdgeId(self.edges.len());
        self.edges.push(GraphEdge {
            id: format!("{}|{}|{}", key, self.nodes[from.0].id, self.nodes[to.0].id),
            from,
            to,
            kind,
            color,
            style,
            metadata: Metadata::default(),
        });
        self.out_edges[from.0].push(id);
        self.in_edges[to.0].push(id);
        self.edge_index.insert(index_key, id);
        (id, true)
    }

    /// Placeholder for a DNSKEY that is referenced by an RRSIG, DS or trust
    /// anchor but absent from the zone's DNSKEY RRset
    pub(crate) fn dnskey_placeholder(
        &mut self,
        name: &str,
        zone: &str,
        algorithm: u8,
        key_tag: u16,
    ) -> NodeId {
        let (node, created) = self.add_node(
            format!("DNSKEY-0|{name}|{algorithm}|{key_tag}"),
            NodeKind::DnsKey {
                name: name.to_string(),
                algorithm,
                key_tag,
                flags: 0,
                public_key: Vec::new(),
            },
            zone,
            format!("DNSKEY alg={algorithm}, id={key_tag}"),
        );
        if created {
            self.nodes[node.0].non_existent = true;
        }
        node
    }

    pub(crate) fn record_status(&mut self, element: ElementId, status: StatusRef) {
        let refs = self.status_refs.entry(element).or_default();
        if !refs.contains(&status) {
            refs.push(status.clone());
        }
        self.elements.entry(status).or_default().insert(element);
    }

    pub(crate) fn mark_secure_dnskey_rrset(&mut self, zone: &str) {
        self.secure_dnskey_rrsets.insert(zone.to_string());
    }
}

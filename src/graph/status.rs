//! Final status of graph elements.
//!
//! Trust colors are a propagation-time mark; [`Status`] is the reported
//! outcome. [`resolve`] derives a status for every node and edge and writes
//! it into the element's metadata.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::edge::{EdgeColor, EdgeId, EdgeKind};
use super::node::{Metadata, NodeId, NodeKind, TrustColor};
use super::AuthGraph;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Secure,
    Bogus,
    Insecure,
    NonExistent,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Secure => write!(f, "SECURE"),
            Status::Bogus => write!(f, "BOGUS"),
            Status::Insecure => write!(f, "INSECURE"),
            Status::NonExistent => write!(f, "NON_EXISTENT"),
        }
    }
}

/// Status of a node. With `port`, the status of one record inside an
/// NSEC/NSEC3 set: an authenticated record reports secure even when the
/// set as a whole is not.
pub fn status_for_node(graph: &AuthGraph, node: NodeId, port: Option<&str>) -> Status {
    let graph_node = graph.node(node);
    if let (Some(port), NodeKind::NsecSet { records, .. }) = (port, &graph_node.kind) {
        match records.get(port) {
            Some(true) => return Status::Secure,
            Some(false) | None if graph_node.color.is_secure() => return Status::Bogus,
            _ => {}
        }
    }
    match graph_node.color {
        TrustColor::Secure | TrustColor::SecureNonExistent => Status::Secure,
        TrustColor::Bogus | TrustColor::BogusNonExistent => Status::Bogus,
        TrustColor::Insecure | TrustColor::InsecureNonExistent => Status::Insecure,
        TrustColor::Unset if graph_node.is_dnskey() && graph_node.non_existent => {
            Status::NonExistent
        }
        TrustColor::Unset => Status::Insecure,
    }
}

pub fn status_for_edge(graph: &AuthGraph, edge: EdgeId) -> Status {
    let graph_edge = graph.edge(edge);
    match (&graph_edge.kind, graph_edge.color) {
        (EdgeKind::NsecCoverage { port, .. }, EdgeColor::Secure) => {
            status_for_node(graph, graph_edge.to, port.as_deref())
        }
        (EdgeKind::Alias, _) => status_for_node(graph, graph_edge.from, None),
        (_, EdgeColor::Secure) => Status::Secure,
        (_, EdgeColor::Invalid) => Status::Bogus,
        (_, EdgeColor::Insecure | EdgeColor::Indeterminate | EdgeColor::Plain) => Status::Insecure,
    }
}

/// Write the final status into the metadata of every node and edge
pub fn resolve(graph: &mut AuthGraph) {
    let view: &AuthGraph = graph;
    let nodes: Vec<(NodeId, Status)> = view
        .nodes()
        .map(|(id, _)| (id, status_for_node(view, id, None)))
        .collect();
    let edges: Vec<(EdgeId, Status)> = view
        .edges()
        .map(|(id, _)| (id, status_for_edge(view, id)))
        .collect();

    for (id, status) in nodes {
        graph.node_mut(id).metadata.status = Some(status);
    }
    for (id, status) in edges {
        graph.edge_mut(id).metadata.status = Some(status);
    }
}

/// Reported state of one node or edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementStatus {
    pub kind: &'static str,
    pub label: String,
    pub status: Status,
    #[serde(flatten)]
    pub metadata: Metadata,
}

/// Serializable summary of a resolved graph, keyed by element id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub zones: BTreeMap<String, Status>,
    pub nodes: BTreeMap<String, ElementStatus>,
    pub edges: BTreeMap<String, ElementStatus>,
    pub secure_dnskey_rrsets: Vec<String>,
}

impl StatusReport {
    pub fn from_graph(graph: &AuthGraph) -> Self {
        let zones = graph
            .clusters()
            .map(|cluster| (cluster.name.clone(), status_for_node(graph, cluster.top, None)))
            .collect();

        let nodes = graph
            .nodes()
            .filter(|(_, node)| !node.kind.is_layout())
            .map(|(id, node)| {
                let mut metadata = node.metadata.clone();
                let status = metadata
                    .status
                    .take()
                    .unwrap_or_else(|| status_for_node(graph, id, None));
                (
                    node.id.clone(),
                    ElementStatus {
                        kind: node_kind_name(&node.kind),
                        label: node.label.clone(),
                        status,
                        metadata,
                    },
                )
            })
            .collect();

        let edges = graph
            .edges()
            .map(|(id, edge)| {
                let mut metadata = edge.metadata.clone();
                let status = metadata
                    .status
                    .take()
                    .unwrap_or_else(|| status_for_edge(graph, id));
                (
                    edge.id.clone(),
                    ElementStatus {
                        kind: edge_kind_name(&edge.kind),
                        label: format!("{} -> {}", graph.node(edge.from), graph.node(edge.to)),
                        status,
                        metadata,
                    },
                )
            })
            .collect();

        Self {
            zones,
            nodes,
            edges,
            secure_dnskey_rrsets: graph.secure_dnskey_rrsets().iter().cloned().collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn node_kind_name(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::ZoneCluster { .. } => "zone",
        NodeKind::DnsKey { .. } => "dnskey",
        NodeKind::Ds { .. } => "ds",
        NodeKind::RRset { .. } => "rrset",
        NodeKind::NsecSet { .. } => "nsec",
        NodeKind::Error { .. } => "errors",
    }
}

fn edge_kind_name(kind: &EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Rrsig { .. } => "rrsig",
        EdgeKind::Digest { .. } => "digest",
        EdgeKind::Delegation { .. } => "delegation",
        EdgeKind::Dname { .. } => "dname",
        EdgeKind::NsecCoverage { .. } => "nsec_coverage",
        EdgeKind::Alias => "alias",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::NsecVariant;
    use crate::dns::RecordType;
    use crate::dnssec::NsecValidation;
    use crate::graph::edge::LineStyle;
    use crate::graph::node::Existence;

    fn nsec_graph() -> (AuthGraph, NodeId, NodeId, NodeId) {
        let mut graph = AuthGraph::new();
        let records = [("a.example.".to_string(), true), ("b.example.".to_string(), false)]
            .into_iter()
            .collect();
        let (set, _) = graph.add_node(
            "NSEC3-1|x.example.|A".into(),
            NodeKind::NsecSet {
                name: "x.example.".into(),
                qtype: RecordType::A,
                variant: NsecVariant::Nsec3,
                opt_out: false,
                records,
            },
            "example.",
            String::new(),
        );
        let absent = |graph: &mut AuthGraph, name: &str| {
            graph
                .add_node(
                    format!("RRset-NXDOMAIN|{name}|A"),
                    NodeKind::RRset {
                        name: name.into(),
                        rdtype: RecordType::A,
                        existence: Existence::NxDomain,
                    },
                    "example.",
                    String::new(),
                )
                .0
        };
        let first = absent(&mut graph, "x.example.");
        let second = absent(&mut graph, "y.example.");
        graph.node_mut(set).set_color(TrustColor::Bogus);
        (graph, set, first, second)
    }

    #[test]
    fn test_node_color_mapping() {
        let mut graph = AuthGraph::new();
        let key = graph.dnskey_placeholder("example.", "example.", 8, 7);
        assert_eq!(status_for_node(&graph, key, None), Status::NonExistent);

        graph.node_mut(key).set_color(TrustColor::BogusNonExistent);
        assert_eq!(status_for_node(&graph, key, None), Status::Bogus);

        let (other, _) = graph.add_node(
            "RRset-NODATA|example.|DS".into(),
            NodeKind::RRset {
                name: "example.".into(),
                rdtype: RecordType::DS,
                existence: Existence::NoData,
            },
            ".",
            String::new(),
        );
        assert_eq!(status_for_node(&graph, other, None), Status::Insecure);
        graph.node_mut(other).set_color(TrustColor::InsecureNonExistent);
        assert_eq!(status_for_node(&graph, other, None), Status::Insecure);
        graph.node_mut(other).set_color(TrustColor::SecureNonExistent);
        assert_eq!(status_for_node(&graph, other, None), Status::Secure);
    }

    #[test]
    fn test_white_lie_port_override() {
        let (mut graph, set, first, second) = nsec_graph();
        let (covered, _) = graph.add_edge(
            first,
            set,
            "NSEC3-cover",
            EdgeKind::NsecCoverage {
                status: NsecValidation::Valid,
                port: Some("a.example.".into()),
            },
            EdgeColor::Secure,
            LineStyle::Solid,
        );
        let (uncovered, _) = graph.add_edge(
            second,
            set,
            "NSEC3-cover",
            EdgeKind::NsecCoverage {
                status: NsecValidation::Valid,
                port: Some("b.example.".into()),
            },
            EdgeColor::Secure,
            LineStyle::Solid,
        );

        assert_eq!(status_for_node(&graph, set, None), Status::Bogus);
        assert_eq!(status_for_edge(&graph, covered), Status::Secure);
        assert_eq!(status_for_edge(&graph, uncovered), Status::Bogus);
    }

    #[test]
    fn test_resolve_writes_metadata_and_report() {
        let (mut graph, set, first, _) = nsec_graph();
        graph.add_edge(
            first,
            set,
            "NSEC3-cover",
            EdgeKind::NsecCoverage {
                status: NsecValidation::Invalid,
                port: None,
            },
            EdgeColor::Invalid,
            LineStyle::Solid,
        );
        resolve(&mut graph);

        assert_eq!(graph.node(set).metadata.status, Some(Status::Bogus));
        let report = StatusReport::from_graph(&graph);
        assert_eq!(report.nodes["NSEC3-1|x.example.|A"].status, Status::Bogus);
        assert_eq!(report.edges.len(), 1);
        assert!(report.edges.values().all(|e| e.status == Status::Bogus));

        let json = report.to_json().unwrap();
        assert!(json.contains("\"BOGUS\""));
    }
}

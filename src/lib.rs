//! DNSSEC authentication graphs.
//!
//! Given an [`Analysis`] produced by an upstream validator, build a graph
//! of the keys, delegation signers, RRsets and denial proofs involved in
//! authenticating a set of queries, propagate trust through it from a set
//! of trust anchors, and resolve a final [`Status`] for every element.
//!
//! ```no_run
//! use dnssec_authgraph::{Analysis, GraphConfig, StatusReport, analyze};
//!
//! # fn main() -> dnssec_authgraph::Result<()> {
//! let analysis: Analysis = serde_json::from_str(&std::fs::read_to_string("analysis.json")?)?;
//! let config = GraphConfig::from_env()?;
//! let graph = analyze(&analysis, &[], &config.trust_anchors()?, &config)?;
//! println!("{}", StatusReport::from_graph(&graph).to_json()?);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod config;
pub mod dns;
pub mod dnssec;
pub mod error;
pub mod graph;

pub use analysis::Analysis;
pub use config::GraphConfig;
pub use dns::RecordType;
pub use dnssec::TrustAnchorSet;
pub use error::{AuthGraphError, Result};
pub use graph::{AuthGraph, GraphBuilder, Status, StatusReport, TrustPropagator};

use tracing::{debug, info};

/// Build, propagate and resolve in one go.
///
/// `queries` selects the (name, type) pairs to graph; when empty, every
/// query in the analysis is graphed. Every zone in the analysis is graphed
/// either way. The first builder error aborts the run before any trust is
/// propagated.
pub fn analyze(
    analysis: &Analysis,
    queries: &[(String, RecordType)],
    anchors: &TrustAnchorSet,
    config: &GraphConfig,
) -> Result<AuthGraph> {
    config.validate()?;
    let mut builder = GraphBuilder::new(analysis, config.build_options());

    for zone in analysis.zones() {
        builder.graph_zone_chain(zone, false)?;
    }
    if queries.is_empty() {
        for name in analysis.names() {
            for query in &name.queries {
                builder.graph_rrset_chain(&name.name, query.qtype)?;
            }
        }
    } else {
        for (name, rdtype) in queries {
            builder.graph_rrset_chain(name, *rdtype)?;
        }
    }

    let mut graph = builder.finish();
    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "Graph built"
    );

    TrustPropagator::new(&mut graph, config.supported_algorithms.clone()).propagate(anchors);
    graph::status::resolve(&mut graph);
    info!(
        zones = graph.clusters().count(),
        secure_dnskey_rrsets = graph.secure_dnskey_rrsets().len(),
        "Authentication graph resolved"
    );
    Ok(graph)
}

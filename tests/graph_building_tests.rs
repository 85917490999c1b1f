mod common;

use common::*;
use dnssec_authgraph::analysis::{DnameStatus, NsecVariant, WildcardInfo};
use dnssec_authgraph::dnssec::{DnameValidation, NsecValidation, RrsigValidation};
use dnssec_authgraph::graph::{
    BuildOptions, EdgeKind, ElementId, GraphBuilder, NodeKind, Status, StatusRef, StatusReport,
};
use dnssec_authgraph::{Analysis, AuthGraphError, GraphConfig, RecordType, analyze};

#[test]
fn test_dname_synthesized_cname() {
    let (zone, ksk) = signed_zone("example.", None, 1);
    let dname = signed_rrset("old.example.", RecordType::DNAME, &["new.example."], "example.", &ksk);
    let cname = rrset("www.old.example.", RecordType::CNAME, &["www.new.example."]);

    let mut analysis = Analysis::new();
    analysis.add_zone(zone);
    let mut old = answered("www.old.example.", "example.", RecordType::A, vec![cname.clone()]);
    old.queries[0].dnames.push(DnameStatus {
        dname,
        synthesized_cname: Some(cname),
        qname: "www.old.example.".into(),
        status: DnameValidation::Valid,
        errors: vec![],
        warnings: vec![],
    });
    analysis.add_name(old);
    analysis.add_name(answered(
        "www.new.example.",
        "example.",
        RecordType::A,
        vec![signed_rrset("www.new.example.", RecordType::A, &["192.0.2.7"], "example.", &ksk)],
    ));
    let graph = run(&analysis, &anchors(&[("example.", &ksk)]));

    let dname = rrset_node(&graph, "old.example.", RecordType::DNAME).unwrap();
    let cname = rrset_node(&graph, "www.old.example.", RecordType::CNAME).unwrap();
    let target = rrset_node(&graph, "www.new.example.", RecordType::A).unwrap();

    assert_eq!(status(&graph, dname), Status::Secure);
    // Unsigned, but synthesized from an authenticated DNAME
    assert_eq!(status(&graph, cname), Status::Secure);
    assert_eq!(status(&graph, target), Status::Secure);
    assert_eq!(edge_statuses(&graph, cname, dname), vec![Status::Secure]);

    let alias = graph.edge(graph.find_edge(target, cname).unwrap());
    assert_eq!(alias.kind, EdgeKind::Alias);
    assert_eq!(alias.metadata.status, Some(Status::Secure));

    // The CNAME in the answer section collapses onto the synthesized one
    let cnames = graph
        .nodes()
        .filter(|(_, node)| matches!(node.kind, NodeKind::RRset { rdtype: RecordType::CNAME, .. }))
        .count();
    assert_eq!(cnames, 1);
}

#[test]
fn test_dname_without_cname_gets_placeholder() {
    let (zone, ksk) = signed_zone("example.", None, 1);
    let mut analysis = Analysis::new();
    analysis.add_zone(zone);
    let mut name = answered("www.old.example.", "example.", RecordType::A, vec![]);
    name.queries[0].dnames.push(DnameStatus {
        dname: signed_rrset("old.example.", RecordType::DNAME, &["new.example."], "example.", &ksk),
        synthesized_cname: None,
        qname: "www.old.example.".into(),
        status: DnameValidation::IndeterminateNoCname,
        errors: vec![],
        warnings: vec!["no CNAME returned with DNAME".into()],
    });
    analysis.add_name(name);
    let graph = run(&analysis, &anchors(&[("example.", &ksk)]));

    let missing = absent_node(&graph, "www.old.example.", RecordType::CNAME).unwrap();
    let dname = rrset_node(&graph, "old.example.", RecordType::DNAME).unwrap();
    assert!(graph.node(missing).non_existent);
    assert_eq!(status(&graph, missing), Status::Bogus);
    assert_eq!(edge_statuses(&graph, missing, dname), vec![Status::Insecure]);

    let edge = graph.edge(graph.find_edge(missing, dname).unwrap());
    assert_eq!(edge.metadata.warnings.len(), 1);
}

#[test]
fn test_wildcard_answer_with_denial() {
    let (zone, ksk) = signed_zone("example.", None, 1);
    let mut answer = signed_rrset("foo.example.", RecordType::A, &["192.0.2.9"], "example.", &ksk);
    answer.wildcard = Some(WildcardInfo {
        wildcard_name: "*.example.".into(),
        nsec_proofs: vec![nsec_proof(
            NsecVariant::Nsec,
            "example.",
            &ksk,
            &[("example.", RrsigValidation::Valid)],
            NsecValidation::Valid,
        )],
    });

    let mut analysis = Analysis::new();
    analysis.add_zone(zone);
    analysis.add_name(answered("foo.example.", "example.", RecordType::A, vec![answer]));
    let graph = run(&analysis, &anchors(&[("example.", &ksk)]));

    let wildcard = rrset_node(&graph, "*.example.", RecordType::A).unwrap();
    assert_eq!(status(&graph, wildcard), Status::Secure);
    assert_eq!(
        graph.node(wildcard).metadata.fields.get("synthesized_for").map(String::as_str),
        Some("foo.example.")
    );

    let sibling = absent_node(&graph, "foo.example.", RecordType::A).unwrap();
    assert_eq!(status(&graph, sibling), Status::Secure);
    assert_eq!(nsec_nodes(&graph, "foo.example.").len(), 1);
}

#[test]
fn test_chain_result_includes_denial_nodes() {
    let (zone, ksk) = signed_zone("example.", None, 1);
    let mut answer = signed_rrset("foo.example.", RecordType::A, &["192.0.2.9"], "example.", &ksk);
    answer.wildcard = Some(WildcardInfo {
        wildcard_name: "*.example.".into(),
        nsec_proofs: vec![nsec_proof(
            NsecVariant::Nsec,
            "example.",
            &ksk,
            &[("example.", RrsigValidation::Valid)],
            NsecValidation::Valid,
        )],
    });

    let mut analysis = Analysis::new();
    analysis.add_zone(zone);
    analysis.add_name(answered("foo.example.", "example.", RecordType::A, vec![answer]));
    let mut missing = answered("missing.example.", "example.", RecordType::A, vec![]);
    missing.queries[0].nxdomain.push(negative(
        "example.",
        "missing.example.",
        RecordType::A,
        &ksk,
        vec![nsec_proof(
            NsecVariant::Nsec,
            "example.",
            &ksk,
            &[("lost.example.", RrsigValidation::Valid)],
            NsecValidation::Valid,
        )],
    ));
    analysis.add_name(missing);

    let mut builder = GraphBuilder::new(&analysis, BuildOptions::default());
    let wildcard_nodes = builder.graph_rrset_chain("foo.example.", RecordType::A).unwrap();
    let nxdomain_nodes = builder.graph_rrset_chain("missing.example.", RecordType::A).unwrap();
    let graph = builder.graph();

    let wildcard = rrset_node(graph, "*.example.", RecordType::A).unwrap();
    let sibling = absent_node(graph, "foo.example.", RecordType::A).unwrap();
    let wildcard_proof = nsec_nodes(graph, "foo.example.");
    assert_eq!(wildcard_proof.len(), 1);
    assert!(wildcard_nodes.contains(&wildcard));
    assert!(wildcard_nodes.contains(&sibling));
    assert!(wildcard_nodes.contains(&wildcard_proof[0]));

    let absent = absent_node(graph, "missing.example.", RecordType::A).unwrap();
    let soa = rrset_node(graph, "example.", RecordType::SOA).unwrap();
    let denial = nsec_nodes(graph, "missing.example.");
    assert_eq!(denial.len(), 1);
    assert_eq!(nxdomain_nodes.len(), 3);
    for node in [absent, soa, denial[0]] {
        assert!(nxdomain_nodes.contains(&node), "{} not returned", graph.node(node));
    }

    // A second request for the same pair returns the memoized result
    let again = builder.graph_rrset_chain("missing.example.", RecordType::A).unwrap();
    assert_eq!(again, nxdomain_nodes);
}

fn cname_chain(names: &[&str], final_answer: &str) -> (Analysis, dnssec_authgraph::TrustAnchorSet) {
    let (zone, ksk) = signed_zone("example.", None, 1);
    let mut analysis = Analysis::new();
    analysis.add_zone(zone);
    for pair in names.windows(2) {
        analysis.add_name(answered(
            pair[0],
            "example.",
            RecordType::A,
            vec![signed_rrset(pair[0], RecordType::CNAME, &[pair[1]], "example.", &ksk)],
        ));
    }
    if let Some(&last) = names.last() {
        analysis.add_name(answered(
            last,
            "example.",
            RecordType::A,
            vec![signed_rrset(last, RecordType::A, &[final_answer], "example.", &ksk)],
        ));
    }
    (analysis, anchors(&[("example.", &ksk)]))
}

#[test]
fn test_cname_cycle_terminates() {
    let (zone, ksk) = signed_zone("example.", None, 1);
    let mut analysis = Analysis::new();
    analysis.add_zone(zone);
    for (owner, target) in [("a.example.", "b.example."), ("b.example.", "a.example.")] {
        analysis.add_name(answered(
            owner,
            "example.",
            RecordType::A,
            vec![signed_rrset(owner, RecordType::CNAME, &[target], "example.", &ksk)],
        ));
    }
    let graph = run(&analysis, &anchors(&[("example.", &ksk)]));

    let a = rrset_node(&graph, "a.example.", RecordType::CNAME).unwrap();
    let b = rrset_node(&graph, "b.example.", RecordType::CNAME).unwrap();
    assert_eq!(status(&graph, a), Status::Secure);
    assert_eq!(status(&graph, b), Status::Secure);
    assert!(graph.find_edge(b, a).is_some());
    assert!(graph.find_edge(a, b).is_none());
}

#[test]
fn test_cname_chain_is_followed_and_aliased() {
    let (analysis, anchors) = cname_chain(&["c0.example.", "c1.example.", "c2.example."], "192.0.2.10");
    let queries = vec![("c0.example.".to_string(), RecordType::A)];
    let graph = analyze(&analysis, &queries, &anchors, &GraphConfig::default()).unwrap();

    let c0 = rrset_node(&graph, "c0.example.", RecordType::CNAME).unwrap();
    let c1 = rrset_node(&graph, "c1.example.", RecordType::CNAME).unwrap();
    let end = rrset_node(&graph, "c2.example.", RecordType::A).unwrap();
    assert!(graph.find_edge(c1, c0).is_some());
    assert!(graph.find_edge(end, c1).is_some());
    assert_eq!(status(&graph, end), Status::Secure);
}

#[test]
fn test_chain_depth_limit() {
    let names = ["c0.example.", "c1.example.", "c2.example.", "c3.example.", "c4.example."];
    let (analysis, anchors) = cname_chain(&names, "192.0.2.11");
    let config = GraphConfig {
        max_chain_depth: 2,
        ..Default::default()
    };
    let queries = vec![("c0.example.".to_string(), RecordType::A)];
    let graph = analyze(&analysis, &queries, &anchors, &config).unwrap();

    assert!(rrset_node(&graph, "c0.example.", RecordType::CNAME).is_some());
    assert!(rrset_node(&graph, "c1.example.", RecordType::CNAME).is_some());
    assert!(rrset_node(&graph, "c2.example.", RecordType::CNAME).is_none());
    assert!(rrset_node(&graph, "c4.example.", RecordType::A).is_none());
}

#[test]
fn test_recursive_mode_graphs_whole_response() {
    let (zone, ksk) = signed_zone("example.", None, 1);
    let mut analysis = Analysis::new();
    analysis.add_zone(zone);
    analysis.add_name(answered(
        "alias.example.",
        "example.",
        RecordType::A,
        vec![
            signed_rrset("alias.example.", RecordType::CNAME, &["target.example."], "example.", &ksk),
            signed_rrset("target.example.", RecordType::A, &["192.0.2.12"], "example.", &ksk),
        ],
    ));
    let anchors = anchors(&[("example.", &ksk)]);

    let graph = run(&analysis, &anchors);
    assert!(rrset_node(&graph, "target.example.", RecordType::A).is_none());

    let config = GraphConfig {
        recursive: true,
        ..Default::default()
    };
    let graph = analyze(&analysis, &[], &anchors, &config).unwrap();
    let cname = rrset_node(&graph, "alias.example.", RecordType::CNAME).unwrap();
    let target = rrset_node(&graph, "target.example.", RecordType::A).unwrap();
    assert!(graph.find_edge(target, cname).is_some());
    assert_eq!(status(&graph, target), Status::Secure);
}

#[test]
fn test_selected_queries_only() {
    let (mut analysis, anchors) = single_zone();
    analysis.add_name(answered(
        "mail.example.",
        "example.",
        RecordType::MX,
        vec![rrset("mail.example.", RecordType::MX, &["10 mx.example."])],
    ));
    let queries = vec![("mail.example".to_string(), RecordType::MX)];
    let graph = analyze(&analysis, &queries, &anchors, &GraphConfig::default()).unwrap();

    assert!(rrset_node(&graph, "www.example.", RecordType::A).is_none());
    let mx = rrset_node(&graph, "mail.example.", RecordType::MX).unwrap();
    // Unsigned data in a secure zone
    assert_eq!(status(&graph, mx), Status::Bogus);
}

#[test]
fn test_status_refs_map_both_ways() {
    let (analysis, anchors) = single_zone();
    let graph = run(&analysis, &anchors);
    let ksk = dnskey(257, 1);
    let www = rrset_node(&graph, "www.example.", RecordType::A).unwrap();

    let rrset_ref = StatusRef::Rrset {
        name: "www.example.".into(),
        rdtype: RecordType::A,
    };
    assert_eq!(
        graph.elements_for(&rrset_ref).collect::<Vec<_>>(),
        vec![ElementId::Node(www)]
    );
    assert!(graph.status_refs(ElementId::Node(www)).contains(&rrset_ref));

    let rrsig_ref = StatusRef::Rrsig {
        name: "www.example.".into(),
        rdtype: RecordType::A,
        signer: "example.".into(),
        algorithm: ksk.algorithm,
        key_tag: ksk.key_tag(),
    };
    let elements: Vec<ElementId> = graph.elements_for(&rrsig_ref).collect();
    assert_eq!(elements.len(), 1);
    match elements[0] {
        ElementId::Edge(edge) => assert_eq!(graph.edge(edge).from, www),
        other => panic!("expected an edge, got {other:?}"),
    }
}

#[test]
fn test_response_errors_node() {
    let (mut analysis, anchors) = single_zone();
    let mut name = answered("lame.example.", "example.", RecordType::A, vec![]);
    name.queries[0].errors.push("timeout from 192.0.2.53".into());
    analysis.add_name(name);
    let graph = run(&analysis, &anchors);

    let errors = graph
        .nodes()
        .find(|(_, node)| matches!(&node.kind, NodeKind::Error { name, .. } if name == "lame.example."))
        .map(|(id, _)| id)
        .unwrap();
    assert!(graph.node(errors).metadata.has_errors());
    assert_eq!(status(&graph, errors), Status::Insecure);
    assert_eq!(graph.status_refs(ElementId::Node(errors)).len(), 1);
}

#[test]
fn test_unknown_zone_aborts() {
    let mut analysis = Analysis::new();
    analysis.add_name(answered("www.nowhere.", "nowhere.", RecordType::A, vec![]));
    let result = analyze(
        &analysis,
        &[],
        &dnssec_authgraph::TrustAnchorSet::new(),
        &GraphConfig::default(),
    );
    assert!(matches!(result, Err(AuthGraphError::UnknownZone(zone)) if zone == "nowhere."));
}

#[test]
fn test_invalid_config_aborts() {
    let (analysis, anchors) = single_zone();
    let config = GraphConfig {
        max_chain_depth: 0,
        ..Default::default()
    };
    assert!(matches!(
        analyze(&analysis, &[], &anchors, &config),
        Err(AuthGraphError::InvalidConfig(_))
    ));
}

#[test]
fn test_json_input_gives_same_report() {
    let (analysis, anchors) = single_zone();
    let json = serde_json::to_string(&analysis).unwrap();
    let parsed: Analysis = serde_json::from_str(&json).unwrap();

    let direct = StatusReport::from_graph(&run(&analysis, &anchors));
    let from_json = StatusReport::from_graph(&run(&parsed, &anchors));
    assert_eq!(direct, from_json);

    let report = from_json.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(value["zones"]["example."], "SECURE");
    assert_eq!(value["secure_dnskey_rrsets"][0], "example.");
}


#[test]
fn test_owner_names_are_normalized_on_input() {
    let (analysis, anchors) = single_zone();
    let mut value = serde_json::to_value(&analysis).unwrap();
    value["names"][0]["queries"][0]["answers"][0]["name"] = "WWW.Example".into();
    let parsed: Analysis = serde_json::from_value(value).unwrap();

    let answer = &parsed.name("www.example.").unwrap().queries[0].answers[0];
    assert_eq!(answer.name, "www.example.");
    let graph = run(&parsed, &anchors);
    let www = rrset_node(&graph, "www.example.", RecordType::A).unwrap();
    assert_eq!(status(&graph, www), Status::Secure);
}

#[test]
fn test_undotted_denial_names_match_query() {
    let (zone, ksk) = signed_zone("example.", None, 1);
    let mut proof = nsec_proof(
        NsecVariant::Nsec,
        "example.",
        &ksk,
        &[("Gone.Example", RrsigValidation::Valid)],
        NsecValidation::Valid,
    );
    proof.covering_record = Some("Gone.Example".into());
    let mut response = negative("example.", "Gone.Example", RecordType::A, &ksk, vec![proof]);
    response.soa[0].name = "EXAMPLE".into();

    let mut analysis = Analysis::new();
    analysis.add_zone(zone);
    let mut name = answered("gone.example.", "example.", RecordType::A, vec![]);
    name.queries[0].nxdomain.push(response);
    analysis.add_name(name);

    let stored = &analysis.name("gone.example.").unwrap().queries[0].nxdomain[0];
    assert_eq!(stored.qname, "gone.example.");
    assert_eq!(stored.soa[0].name, "example.");
    assert_eq!(stored.nsec_proofs[0].records[0].name, "gone.example.");
    assert_eq!(stored.nsec_proofs[0].covering_record.as_deref(), Some("gone.example."));

    let graph = run(&analysis, &anchors(&[("example.", &ksk)]));
    let absent = absent_node(&graph, "gone.example.", RecordType::A).unwrap();
    assert_eq!(status(&graph, absent), Status::Secure);
    let sets = nsec_nodes(&graph, "gone.example.");
    assert_eq!(sets.len(), 1);
    let cover = graph.edge(graph.find_edge(absent, sets[0]).unwrap());
    assert_eq!(
        cover.kind,
        EdgeKind::NsecCoverage {
            status: NsecValidation::Valid,
            port: Some("gone.example.".into())
        }
    );
}

use std::{
    io::{Read, Write},
    net::TcpListener,
    sync::mpsc,
    thread,
    time::Duration,
};

use classifier_core::{
    config::Config,
    logic::{Binding, ExpressionNode, LogicNodeKind, SubstitutionBindings},
    ontology::ConceptRef,
    serialization::{
        mapping::map_document, parse::HardenedParser, ExpressionSerializer, SerializationError,
    },
};
use uuid::Uuid;

fn concept(n: u128) -> ConceptRef {
    ConceptRef::new(Uuid::from_u128(n))
}

#[test]
fn conjunction_round_trips_with_child_order() {
    let x = concept(0xA);
    let r = concept(0xB);
    let y = concept(0xC);
    let tree = ExpressionNode::and(vec![
        ExpressionNode::concept(x),
        ExpressionNode::role_some(r, ExpressionNode::concept(y)),
    ]);

    let serializer = ExpressionSerializer::new();
    let text = serializer.serialize(&tree).expect("serialized");
    let read = serializer.deserialize(&text).expect("deserialized");

    assert_eq!(read, tree);
    assert_eq!(read.kind(), LogicNodeKind::And);
    let kinds: Vec<_> = read.children().iter().map(ExpressionNode::kind).collect();
    assert_eq!(kinds, vec![LogicNodeKind::Concept, LogicNodeKind::RoleSome]);
    assert_eq!(read.children()[0].concept_ref(), Some(x));
}

#[test]
fn reordered_children_are_a_different_document() {
    let serializer = ExpressionSerializer::new();
    let forward = ExpressionNode::or(vec![
        ExpressionNode::concept(concept(1)),
        ExpressionNode::concept(concept(2)),
    ]);
    let backward = ExpressionNode::or(vec![
        ExpressionNode::concept(concept(2)),
        ExpressionNode::concept(concept(1)),
    ]);
    assert_ne!(
        serializer.serialize(&forward).expect("forward"),
        serializer.serialize(&backward).expect("backward")
    );
}

#[test]
fn doctype_with_external_entity_is_rejected_without_fetching() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let address = listener.local_addr().expect("address");
    listener.set_nonblocking(true).expect("non-blocking");
    let (tx, rx) = mpsc::channel();
    let probe = thread::spawn(move || {
        for _ in 0..20 {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buffer = [0u8; 64];
                let _ = stream.read(&mut buffer);
                let _ = stream.write_all(b"HTTP/1.0 200 OK\r\n\r\nleak");
                let _ = tx.send(());
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
    });

    let text = format!(
        "<?xml version=\"1.0\"?>\n<!DOCTYPE concept [<!ENTITY ext SYSTEM \"http://{address}/entity\">]>\n<literal-string>&ext;</literal-string>"
    );
    let err = ExpressionSerializer::new()
        .deserialize(&text)
        .expect_err("doctype rejected");
    assert!(
        matches!(err, SerializationError::MalformedDocument { ref reason } if reason.contains("doctype"))
    );

    probe.join().expect("probe");
    assert!(rx.try_recv().is_err(), "external entity was fetched");
}

#[test]
fn unset_literal_fails_before_output() {
    let tree = ExpressionNode::role_some(
        concept(3),
        ExpressionNode::and(vec![ExpressionNode::unset_literal(LogicNodeKind::Integer)]),
    );
    let result = ExpressionSerializer::new().serialize(&tree);
    assert!(matches!(result, Err(SerializationError::InvalidExpression(_))));
}

#[test]
fn template_placeholders_expand_before_serialization() {
    let template = ExpressionNode::sufficient_set(vec![ExpressionNode::and(vec![
        ExpressionNode::concept(concept(1)),
        ExpressionNode::role_some(
            concept(2),
            ExpressionNode::substitution(LogicNodeKind::SubstitutionConcept, "site"),
        ),
    ])]);
    let serializer = ExpressionSerializer::new();
    assert!(serializer.serialize(&template).is_err());

    let bindings = SubstitutionBindings::new().bind("site", Binding::Concept(concept(9)));
    let expanded = template.expand(&bindings).expect("expanded");
    let text = serializer.serialize(&expanded).expect("serialized");
    assert!(!text.contains("substitution-concept"));
    assert_eq!(serializer.deserialize(&text).expect("read"), expanded);
}

#[test]
fn two_stage_pipeline_matches_serializer() {
    let tree = ExpressionNode::definition_root(vec![ExpressionNode::necessary_set(vec![
        ExpressionNode::concept(concept(5)),
    ])]);
    let serializer = ExpressionSerializer::new();
    let text = serializer.serialize(&tree).expect("serialized");

    let document = HardenedParser::default().parse(&text).expect("parsed");
    assert_eq!(document.root().name(), "definition-root");
    assert_eq!(map_document(&document).expect("mapped"), tree);
}

#[test]
fn configured_depth_limit_applies() {
    let config = Config::from_yaml_str("serializer:\n  max_depth: 3\n  indent: 4\n").expect("config");
    let serializer = ExpressionSerializer::from_config(&config.serializer);

    let shallow = ExpressionNode::and(vec![ExpressionNode::concept(concept(1))]);
    let text = serializer.serialize(&shallow).expect("serialized");
    assert!(text.contains("\n    <concept"));
    assert!(serializer.deserialize(&text).is_ok());

    let deep = ExpressionNode::and(vec![ExpressionNode::or(vec![ExpressionNode::and(vec![
        ExpressionNode::concept(concept(1)),
    ])])]);
    assert!(matches!(
        serializer.serialize(&deep),
        Err(SerializationError::InvalidExpression(_))
    ));

    let text = format!(
        r#"<and><or><and><concept concept="{}"/></and></or></and>"#,
        concept(1)
    );
    assert!(matches!(
        serializer.deserialize(&text),
        Err(SerializationError::MalformedDocument { .. })
    ));
}

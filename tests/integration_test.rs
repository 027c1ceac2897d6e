//! Integration tests for ruleset-driven graph assembly.

use std::sync::Arc;

use grafter::{
    parse_ruleset, Capabilities, Event, GraphBuilder, PropertyBinder, QName, Rule, RuleTable,
    Target, TypeRegistry, Value,
};

#[derive(Default)]
struct ServerDescriptor {
    name: String,
    port: i32,
    running: bool,
    engines: Vec<EngineDescriptor>,
    extras: Vec<(String, String)>,
}
grafter::impl_target!(ServerDescriptor);

#[derive(Default)]
struct EngineDescriptor {
    name: String,
    workers: i64,
    notes: String,
}
grafter::impl_target!(EngineDescriptor);

#[derive(Default)]
struct TurboEngineDescriptor {
    name: String,
}
grafter::impl_target!(TurboEngineDescriptor);

const RULESET: &str = r#"
rules:
  - pattern: server
    action: { type: create, class: ServerDescriptor }
  - pattern: server
    action: { type: bind-attributes }
  - pattern: server/engine
    action: { type: create, class: EngineDescriptor, override-attribute: className }
  - pattern: server/engine
    action: { type: bind-attributes, exclude: [className] }
  - pattern: server/engine/notes
    action: { type: call-with-body, method: notes, trim: true }
  - pattern: server/engine
    action: { type: link-child, method: engine }
"#;

fn descriptor_types() -> TypeRegistry {
    let mut types = TypeRegistry::new();
    types.register("ServerDescriptor", || Box::new(ServerDescriptor::default()));
    types.register("EngineDescriptor", || Box::new(EngineDescriptor::default()));
    types.register("TurboEngineDescriptor", || {
        Box::new(TurboEngineDescriptor::default())
    });
    types
}

fn descriptor_binder() -> PropertyBinder {
    let mut binder = PropertyBinder::new();
    binder.register::<ServerDescriptor>(
        Capabilities::of::<ServerDescriptor>()
            .named("ServerDescriptor")
            .text("name", |s, v| s.name = v.to_string())
            .int("port", |s, v| s.port = v)
            .flag("running", |s, v| s.running = v)
            .get("port", |s| Value::Int(s.port))
            .set_any(|s, k, v| s.extras.push((k.to_string(), v.to_string())))
            .adopt::<EngineDescriptor>("engine", |s, e| s.engines.push(e))
            .finish(),
    );
    binder.register::<EngineDescriptor>(
        Capabilities::of::<EngineDescriptor>()
            .named("EngineDescriptor")
            .text("name", |e, v| e.name = v.to_string())
            .long("workers", |e, v| e.workers = v)
            .method("notes", |e, body| {
                e.notes = body.to_string();
                Ok(())
            })
            .finish(),
    );
    binder
}

fn descriptor_table() -> RuleTable {
    parse_ruleset(RULESET).unwrap().into_table().unwrap()
}

fn server_document() -> Vec<Event> {
    vec![
        Event::start("server", &[("name", "main"), ("port", "${PORT:-8080}")]),
        Event::start("engine", &[("name", "primary"), ("workers", "4")]),
        Event::start("notes", &[]),
        Event::text("  keep warm  "),
        Event::end("notes"),
        Event::end("engine"),
        Event::end("server"),
        Event::EndDocument,
    ]
}

fn as_server(outcome: grafter::BuildOutcome) -> ServerDescriptor {
    *outcome
        .root
        .into_any()
        .downcast::<ServerDescriptor>()
        .expect("root is a ServerDescriptor")
}

#[test]
fn test_descriptor_document_end_to_end() {
    let outcome = GraphBuilder::new(descriptor_table())
        .with_types(descriptor_types())
        .with_binder(descriptor_binder())
        .run(server_document())
        .unwrap();
    let server = as_server(outcome);
    assert_eq!(server.name, "main");
    assert_eq!(server.port, 8080);
    assert!(!server.running);
    assert_eq!(server.engines.len(), 1);
    assert_eq!(server.engines[0].name, "primary");
    assert_eq!(server.engines[0].workers, 4);
    assert_eq!(server.engines[0].notes, "keep warm");
}

#[test]
fn test_ruleset_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.yaml");
    std::fs::write(&path, RULESET).unwrap();

    let table = grafter::load_ruleset_from_file(&path)
        .unwrap()
        .into_table()
        .unwrap();
    assert_eq!(table.len(), 6);

    let outcome = GraphBuilder::new(table)
        .with_types(descriptor_types())
        .with_binder(descriptor_binder())
        .run(server_document())
        .unwrap();
    assert_eq!(as_server(outcome).engines.len(), 1);
}

#[test]
fn test_create_override_attribute_switches_type() {
    let mut binder = descriptor_binder();
    binder.register::<TurboEngineDescriptor>(
        Capabilities::of::<TurboEngineDescriptor>()
            .named("TurboEngineDescriptor")
            .text("name", |e, v| e.name = v.to_string())
            .finish(),
    );
    // No link rule here; the run stays focused on creation and the override.
    let mut table = RuleTable::new();
    table
        .register_str("server", Rule::create("ServerDescriptor"))
        .unwrap();
    table
        .register_str(
            "server/engine",
            Rule::create_with_override("EngineDescriptor", "className"),
        )
        .unwrap();
    table
        .register_str(
            "server/engine",
            Rule::bind_attributes_excluding(&["className"]),
        )
        .unwrap();

    let mut builder = GraphBuilder::new(table)
        .with_types(descriptor_types())
        .with_binder(binder);
    builder.process(Event::start("server", &[])).unwrap();
    builder
        .process(Event::start(
            "engine",
            &[("className", "TurboEngineDescriptor"), ("name", "t")],
        ))
        .unwrap();
    builder.process(Event::end("engine")).unwrap();
    builder.process(Event::end("server")).unwrap();
    builder.process(Event::EndDocument).unwrap();
    // Root (bottom of stack) is still the server.
    let outcome = builder.finish().unwrap();
    assert_eq!(outcome.root.type_name(), "ServerDescriptor");
    assert!(outcome.diagnostics.is_empty());
}

#[test]
fn test_wildcard_rule_fires_for_any_trailing_segment() {
    let mut table = descriptor_table();
    table
        .register_str("server/*", Rule::call_with_body("notes", true))
        .unwrap();

    let err = GraphBuilder::new(table)
        .with_types(descriptor_types())
        .with_binder(descriptor_binder())
        .run(vec![
            Event::start("server", &[]),
            Event::start("banner", &[]),
            Event::text("hello"),
            Event::end("banner"),
            Event::end("server"),
            Event::EndDocument,
        ])
        .unwrap_err();
    // ServerDescriptor has no "notes" body method, so the wildcard body rule
    // surfaces an operation error at the banner path.
    assert_eq!(err.path, "server/banner");
    assert!(matches!(
        err.kind,
        grafter::BuildErrorKind::OperationNotFound { .. }
    ));
}

#[test]
fn test_generic_setter_collects_unknown_attributes() {
    let outcome = GraphBuilder::new(descriptor_table())
        .with_types(descriptor_types())
        .with_binder(descriptor_binder())
        .run(vec![
            Event::start("server", &[("vendor", "acme"), ("port", "9090")]),
            Event::end("server"),
            Event::EndDocument,
        ])
        .unwrap();
    let server = as_server(outcome);
    assert_eq!(server.port, 9090);
    assert_eq!(
        server.extras,
        vec![("vendor".to_string(), "acme".to_string())]
    );
}

#[test]
fn test_binding_failure_tolerated_without_generic_setter() {
    // Engines have no generic fallback: unknown attributes become
    // diagnostics, not errors.
    let outcome = GraphBuilder::new(descriptor_table())
        .with_types(descriptor_types())
        .with_binder(descriptor_binder())
        .run(vec![
            Event::start("server", &[]),
            Event::start("engine", &[("name", "e"), ("flux", "high")]),
            Event::end("engine"),
            Event::end("server"),
            Event::EndDocument,
        ])
        .unwrap();
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].property, "flux");
    assert_eq!(outcome.diagnostics[0].path, "server/engine");
    assert_eq!(as_server(outcome).engines.len(), 1);
}

#[test]
fn test_strict_mode_aborts_on_binding_failure() {
    let err = GraphBuilder::new(descriptor_table())
        .with_types(descriptor_types())
        .with_binder(descriptor_binder())
        .strict(true)
        .run(vec![
            Event::start("server", &[]),
            Event::start("engine", &[("flux", "high")]),
            Event::end("engine"),
            Event::end("server"),
            Event::EndDocument,
        ])
        .unwrap_err();
    assert!(matches!(
        err.kind,
        grafter::BuildErrorKind::BindingRejected { .. }
    ));
    assert_eq!(err.path, "server/engine");
}

#[test]
fn test_placeholder_sources_layer_static_then_dynamic() {
    let mut binder = descriptor_binder();
    binder.sources_mut().set("PORT", "7000");
    binder
        .sources_mut()
        .push_source(Box::new(|k: &str| (k == "PORT").then(|| "9999".to_string())));

    let outcome = GraphBuilder::new(descriptor_table())
        .with_types(descriptor_types())
        .with_binder(binder)
        .run(server_document())
        .unwrap();
    // Static source wins over the dynamic one and over the inline default.
    assert_eq!(as_server(outcome).port, 7000);
}

#[test]
fn test_rule_table_shared_across_builders() {
    let table = Arc::new(descriptor_table());
    for _ in 0..2 {
        let outcome = GraphBuilder::new(Arc::clone(&table))
            .with_types(descriptor_types())
            .with_binder(descriptor_binder())
            .run(server_document())
            .unwrap();
        assert_eq!(as_server(outcome).engines.len(), 1);
    }
}

#[test]
fn test_namespace_aware_paths_qualify_segments() {
    // An http-style URI carries slashes; the qualified segment must still
    // register and match as one segment.
    let uri = "http://example.org/cfg";
    let mut table = RuleTable::new();
    table
        .register_str(
            &format!("{{{}}}server", uri),
            Rule::create("ServerDescriptor"),
        )
        .unwrap();
    table
        .register_str(&format!("{{{}}}server", uri), Rule::bind_attributes())
        .unwrap();

    let outcome = GraphBuilder::new(table)
        .with_types(descriptor_types())
        .with_binder(descriptor_binder())
        .namespace_aware(true)
        .run(vec![
            Event::StartElement {
                name: QName::qualified("server", "cfg", uri),
                attributes: vec![grafter::Attribute::new("name", "ns")],
            },
            Event::EndElement {
                name: QName::qualified("server", "cfg", uri),
            },
            Event::EndDocument,
        ])
        .unwrap();
    assert_eq!(as_server(outcome).name, "ns");
}

#[test]
fn test_prefix_ignored_when_namespace_awareness_off() {
    let outcome = GraphBuilder::new(descriptor_table())
        .with_types(descriptor_types())
        .with_binder(descriptor_binder())
        .run(vec![
            Event::StartElement {
                name: QName::qualified("server", "cfg", "urn:example:cfg"),
                attributes: vec![],
            },
            Event::EndElement {
                name: QName::qualified("server", "cfg", "urn:example:cfg"),
            },
            Event::EndDocument,
        ])
        .unwrap();
    assert_eq!(outcome.root.type_name(), "ServerDescriptor");
}

#[test]
fn test_diagnostic_serializes_to_json() {
    let outcome = GraphBuilder::new(descriptor_table())
        .with_types(descriptor_types())
        .with_binder(descriptor_binder())
        .run(vec![
            Event::start("server", &[]),
            Event::start("engine", &[("flux", "high")]),
            Event::end("engine"),
            Event::end("server"),
            Event::EndDocument,
        ])
        .unwrap();
    let json = serde_json::to_value(&outcome.diagnostics[0]).unwrap();
    assert_eq!(json["property"], "flux");
    assert_eq!(json["path"], "server/engine");
}

#[test]
fn test_property_read_back_through_binder() {
    let binder = descriptor_binder();
    let mut server = ServerDescriptor::default();
    binder.bind(&mut server, "port", "8443").unwrap();
    assert_eq!(binder.get(&server, "port").unwrap(), Some(Value::Int(8443)));
    // No getter and no generic read fallback for this property: absent.
    assert_eq!(binder.get(&server, "name").unwrap(), None);
}

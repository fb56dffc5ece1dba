use anyhow::Result;
use indoc::indoc;
use saphyr_mapper::events::{Alias, Event, Scalar, SequenceEnd, SequenceStart};
use saphyr_mapper::{
    DecodeError, EncodeError, EventBuffer, Mapper, Object, ObjectDescriptor, PropertyDescriptor, Schema, Type,
    Value, mapper_options,
};

fn node_schema() -> Schema {
    let mut schema = Schema::new();
    schema
        .add_object(
            ObjectDescriptor::new("Node")
                .property(PropertyDescriptor::new("Name", Type::Str))
                .property(PropertyDescriptor::new("Next", Type::nullable(Type::object("Node")))),
        )
        .unwrap();
    schema
}

fn node(name: &str) -> Value {
    let mut object = Object::new("Node");
    object.set("Name", Value::str(name));
    object.set("Next", Value::Null);
    Value::object(object)
}

fn link(from: &Value, to: &Value) {
    if let Some(object) = from.as_object() {
        object.borrow_mut().set("Next", to.clone());
    }
}

#[test]
fn alias_before_its_anchor_is_not_found() {
    let mapper = Mapper::new(Schema::new()).unwrap();
    let mut events = EventBuffer::from(vec![
        Event::from(SequenceStart::new()),
        Alias::new("x").into(),
        Scalar::new("1").with_anchor("x").into(),
        SequenceEnd::default().into(),
    ]);
    let err = mapper.deserialize(&mut events, &Type::seq(Type::Any)).unwrap_err();
    assert!(
        matches!(&err, DecodeError::AnchorNotFound { anchor, .. } if anchor == "x"),
        "{err:?}"
    );
}

#[test]
fn anchor_defined_twice_is_rejected() {
    let mapper = Mapper::new(Schema::new()).unwrap();
    let mut events = EventBuffer::from(vec![
        Event::from(SequenceStart::new()),
        Scalar::new("1").with_anchor("x").into(),
        Scalar::new("2").with_anchor("x").into(),
        SequenceEnd::default().into(),
    ]);
    let err = mapper.deserialize(&mut events, &Type::seq(Type::Int)).unwrap_err();
    assert!(
        matches!(&err, DecodeError::DuplicateAnchor { anchor, .. } if anchor == "x"),
        "{err:?}"
    );
}

#[test]
fn aliases_share_the_anchored_container() -> Result<()> {
    let mapper = Mapper::new(Schema::new())?;
    let yaml = indoc! {"
        first: &shared [1, 2]
        second: *shared
    "};
    let doc = mapper.from_str(yaml, &Type::map(Type::Str, Type::seq(Type::Int)))?;
    let map = doc.as_map().expect("mapping").borrow();
    let first = map.get(&Value::str("first")).expect("first");
    let second = map.get(&Value::str("second")).expect("second");
    assert!(first.identity().is_some());
    assert_eq!(first.identity(), second.identity());
    assert_eq!(*first, Value::seq(vec![Value::Int(1), Value::Int(2)]));
    Ok(())
}

#[test]
fn self_reference_round_trips_through_one_anchor() -> Result<()> {
    let mapper = Mapper::new(node_schema())?;
    let root = node("loop");
    link(&root, &root);

    let yaml = mapper.to_yaml_string(&root, &Type::object("Node"))?;
    assert_eq!(yaml, "--- &a1\nName: loop\nNext: *a1\n");

    let back = mapper.from_str(&yaml, &Type::object("Node"))?;
    let next = back.field("Next").expect("Next is set");
    assert_eq!(next.identity(), back.identity());
    assert_eq!(back.field("Name"), Some(Value::str("loop")));
    assert_eq!(back, root);
    Ok(())
}

#[test]
fn shared_nodes_are_anchored_once_and_aliased_after() -> Result<()> {
    let mapper = Mapper::new(node_schema())?;
    let shared = node("n");
    let list = Value::seq(vec![shared.clone(), shared.clone()]);

    let ty = Type::seq(Type::object("Node"));
    let yaml = mapper.to_yaml_string(&list, &ty)?;
    assert_eq!(yaml, "- &a1\n  Name: n\n  Next: null\n- *a1\n");

    let back = mapper.from_str(&yaml, &ty)?;
    let items = back.as_seq().expect("sequence").borrow().clone();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].identity(), items[1].identity());
    Ok(())
}

#[test]
fn cycles_fail_without_anchors() {
    let mapper = Mapper::new(node_schema()).unwrap();
    let a = node("a");
    let b = node("b");
    link(&a, &b);
    link(&b, &a);

    let mut sink: Vec<Event> = Vec::new();
    let err = mapper
        .serialize(&mut sink, &a, &Type::object("Node"), false)
        .unwrap_err();
    assert!(matches!(err, EncodeError::Cycle { .. }), "{err:?}");

    // with anchors the same graph is fine
    let mut sink: Vec<Event> = Vec::new();
    mapper.serialize(&mut sink, &a, &Type::object("Node"), true).unwrap();
    assert!(sink.iter().any(|e| matches!(e, Event::Alias(_))));
}

#[test]
fn shared_but_acyclic_nodes_are_duplicated_without_anchors() -> Result<()> {
    let mapper = Mapper::new(node_schema())?;
    let shared = node("n");
    let list = Value::seq(vec![shared.clone(), shared]);

    let mut sink: Vec<Event> = Vec::new();
    mapper.serialize(&mut sink, &list, &Type::seq(Type::object("Node")), false)?;
    assert!(!sink.iter().any(|e| matches!(e, Event::Alias(_))));
    assert!(sink.iter().all(|e| e.anchor().is_none()));

    let mut replay = EventBuffer::from(sink);
    let back = mapper.deserialize(&mut replay, &Type::seq(Type::object("Node")))?;
    let items = back.as_seq().expect("sequence").borrow().clone();
    assert_ne!(items[0].identity(), items[1].identity());
    assert_eq!(items[0], items[1]);
    Ok(())
}

fn node_anchor(n: usize) -> String {
    format!("node{n}")
}

#[test]
fn anchor_names_can_be_customized() -> Result<()> {
    let options = mapper_options! { anchor_generator: Some(node_anchor) };
    let mapper = Mapper::builder(node_schema()).options(options).build()?;
    let root = node("r");
    link(&root, &root);

    let yaml = mapper.to_yaml_string(&root, &Type::object("Node"))?;
    assert_eq!(yaml, "--- &node1\nName: r\nNext: *node1\n");
    Ok(())
}

#[test]
fn anchors_read_from_text_keep_their_names() {
    let mapper = Mapper::new(Schema::new()).unwrap();

    let err = mapper
        .from_str("- &x 1\n- &x 2\n- *x\n", &Type::seq(Type::Int))
        .unwrap_err();
    assert!(
        matches!(&err, DecodeError::DuplicateAnchor { anchor, .. } if anchor == "x"),
        "{err:?}"
    );
    assert_eq!(err.location().map(|l| l.line()), Some(2));

    let err = mapper.from_str("- *x\n- &x 1\n", &Type::seq(Type::Any)).unwrap_err();
    assert!(
        matches!(&err, DecodeError::AnchorNotFound { anchor, .. } if anchor == "x"),
        "{err:?}"
    );
    assert_eq!(err.location().map(|l| l.line()), Some(1));
}

fn pair_schema() -> Schema {
    let mut schema = Schema::new();
    schema
        .add_object(
            ObjectDescriptor::new("Pair")
                .property(PropertyDescriptor::new("A", Type::seq(Type::Str)))
                .property(PropertyDescriptor::new("B", Type::seq(Type::Int))),
        )
        .unwrap();
    schema
}

#[test]
fn aliases_must_fit_the_element_type() {
    let mapper = Mapper::new(pair_schema()).unwrap();
    let err = mapper
        .from_str("A: &x [foo]\nB: *x\n", &Type::object("Pair"))
        .unwrap_err();
    assert!(matches!(err, DecodeError::TypeMismatch { .. }), "{err:?}");
    assert_eq!(err.location().map(|l| l.line()), Some(2));

    // numeric text read as strings does not become integers through an alias either
    let err = mapper
        .from_str("A: &x ['1']\nB: *x\n", &Type::object("Pair"))
        .unwrap_err();
    assert!(matches!(err, DecodeError::TypeMismatch { .. }), "{err:?}");
}

#[test]
fn anchors_inside_skipped_values_stay_usable() -> Result<()> {
    let mut schema = Schema::new();
    schema.add_object(ObjectDescriptor::new("Slot").property(PropertyDescriptor::new("B", Type::Int)))?;
    let mapper = Mapper::builder(schema)
        .options(mapper_options! { ignore_unmatched_properties: true })
        .build()?;

    let slot = mapper.from_str("junk: &x 5\nB: *x\n", &Type::object("Slot"))?;
    assert_eq!(slot.field("B"), Some(Value::Int(5)));

    let slot = mapper.from_str(
        indoc! {"
            junk:
              - plain
              - &inner 7
            B: *inner
        "},
        &Type::object("Slot"),
    )?;
    assert_eq!(slot.field("B"), Some(Value::Int(7)));
    Ok(())
}

use anyhow::Result;
use indoc::indoc;
use saphyr_mapper::options::DuplicateKeyPolicy;
use saphyr_mapper::{
    DecodeError, Guid, GuidConverter, Mapper, MapperOptions, ObjectDescriptor, PropertyDescriptor, Schema,
    Type, Value, mapper_options,
};

const ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

fn record_schema() -> Schema {
    let mut schema = Schema::new();
    schema
        .add_object(
            ObjectDescriptor::new("Record")
                .property(PropertyDescriptor::new("Name", Type::Str))
                .property(PropertyDescriptor::new("Id", Guid::ty())),
        )
        .unwrap();
    schema
}

fn record_mapper(options: MapperOptions) -> Mapper {
    Mapper::builder(record_schema())
        .options(options)
        .with_converter(GuidConverter)
        .build()
        .unwrap()
}

#[test]
fn case_insensitive_keys_reach_the_guid_converter() -> Result<()> {
    let mapper = record_mapper(mapper_options! { case_insensitive_properties: true });
    let yaml = format!("name: \"a\"\nid: \"{ID}\"\n");

    let record = mapper.from_str(&yaml, &Type::object("Record"))?;
    assert_eq!(record.field("Name"), Some(Value::str("a")));
    let id = record.field("Id").expect("Id is set");
    assert_eq!(id.as_custom::<Guid>(), Some(&ID.parse::<Guid>()?));
    Ok(())
}

#[test]
fn exact_matching_rejects_differently_cased_keys() {
    let mapper = record_mapper(MapperOptions::default());
    let yaml = format!("name: \"a\"\nid: \"{ID}\"\n");

    let err = mapper.from_str(&yaml, &Type::object("Record")).unwrap_err();
    match &err {
        DecodeError::PropertyNotFound { property, ty, location } => {
            assert_eq!(property, "name");
            assert_eq!(ty, "Record");
            assert_eq!(location.line(), 1);
        }
        other => panic!("expected PropertyNotFound, got {other:?}"),
    }
    assert!(err.to_string().contains("at line 1"), "{err}");
}

#[test]
fn colliding_names_are_ambiguous_under_case_folding() {
    let mut schema = Schema::new();
    schema
        .add_object(
            ObjectDescriptor::new("Pair")
                .property(PropertyDescriptor::new("Value", Type::Int))
                .property(PropertyDescriptor::new("value", Type::Int)),
        )
        .unwrap();
    let options = mapper_options! { case_insensitive_properties: true };
    let mapper = Mapper::builder(schema).options(options).build().unwrap();

    let err = mapper.from_str("VALUE: 1\n", &Type::object("Pair")).unwrap_err();
    match err {
        DecodeError::AmbiguousProperty {
            property, candidates, ..
        } => {
            assert_eq!(property, "VALUE");
            assert_eq!(candidates, ["Value", "value"]);
        }
        other => panic!("expected AmbiguousProperty, got {other:?}"),
    }

    // exact matching still tells the two apart
    let mapper = Mapper::new({
        let mut schema = Schema::new();
        schema
            .add_object(
                ObjectDescriptor::new("Pair")
                    .property(PropertyDescriptor::new("Value", Type::Int))
                    .property(PropertyDescriptor::new("value", Type::Int)),
            )
            .unwrap();
        schema
    })
    .unwrap();
    let pair = mapper.from_str("Value: 1\nvalue: 2\n", &Type::object("Pair")).unwrap();
    assert_eq!(pair.field("Value"), Some(Value::Int(1)));
    assert_eq!(pair.field("value"), Some(Value::Int(2)));
}

#[test]
fn unmatched_keys_can_be_ignored() -> Result<()> {
    let mapper = record_mapper(mapper_options! { ignore_unmatched_properties: true });
    let yaml = indoc! {"
        Name: kept
        Extra:
          nested: [1, 2, 3]
        Id: 3fa85f64-5717-4562-b3fc-2c963f66afa6
    "};
    let record = mapper.from_str(yaml, &Type::object("Record"))?;
    assert_eq!(record.field("Name"), Some(Value::str("kept")));
    assert!(record.field("Id").is_some());
    Ok(())
}

#[test]
fn aliases_and_naming_conventions_pick_document_names() -> Result<()> {
    let mut schema = Schema::new();
    schema.add_object(
        ObjectDescriptor::new("Person")
            .property(PropertyDescriptor::new("FirstName", Type::Str))
            .property(PropertyDescriptor::new("BirthYear", Type::Int).alias("born")),
    )?;
    let options = mapper_options! { naming: saphyr_mapper::NamingStyle::Underscored };
    let mapper = Mapper::builder(schema).options(options).build()?;

    let person = mapper.from_str("first_name: Ada\nborn: 1815\n", &Type::object("Person"))?;
    assert_eq!(person.field("FirstName"), Some(Value::str("Ada")));
    assert_eq!(person.field("BirthYear"), Some(Value::Int(1815)));

    let yaml = mapper.to_yaml_string(&person, &Type::object("Person"))?;
    assert_eq!(yaml, "first_name: Ada\nborn: 1815\n");
    Ok(())
}

#[test]
fn required_properties_must_be_present() {
    let mut schema = Schema::new();
    schema
        .add_object(
            ObjectDescriptor::new("Service")
                .property(PropertyDescriptor::new("Host", Type::Str).required())
                .property(PropertyDescriptor::new("Port", Type::Int)),
        )
        .unwrap();
    let mapper = Mapper::new(schema).unwrap();

    let err = mapper.from_str("Port: 80\n", &Type::object("Service")).unwrap_err();
    assert!(
        matches!(&err, DecodeError::MissingProperty { property, .. } if property == "Host"),
        "{err:?}"
    );
}

#[test]
fn duplicate_keys_follow_the_policy() {
    let yaml = "Name: first\nName: second\n";
    let read = |policy| {
        let options = mapper_options! { duplicate_keys: policy };
        record_mapper(options).from_str(yaml, &Type::object("Record"))
    };

    let err = read(DuplicateKeyPolicy::Error).unwrap_err();
    assert!(matches!(&err, DecodeError::DuplicateKey { key, .. } if key == "Name"), "{err:?}");
    assert_eq!(err.location().map(|l| l.line()), Some(2));

    let first = read(DuplicateKeyPolicy::FirstWins).unwrap();
    assert_eq!(first.field("Name"), Some(Value::str("first")));

    let last = read(DuplicateKeyPolicy::LastWins).unwrap();
    assert_eq!(last.field("Name"), Some(Value::str("second")));
}

#[test]
fn bad_guid_is_a_positioned_strategy_error() {
    let mapper = record_mapper(MapperOptions::default());
    let err = mapper
        .from_str("Name: x\nId: not-a-guid\n", &Type::object("Record"))
        .unwrap_err();
    assert!(matches!(err, DecodeError::Strategy { .. }), "{err:?}");
    assert_eq!(err.location().map(|l| l.line()), Some(2));
    assert!(std::error::Error::source(&err).is_some());
}

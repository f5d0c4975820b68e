//! End-to-end envelope scenarios exercising structs compiled by
//! `#[tagwire::wire]`: a plain struct round-trip, an all-zero value's
//! minimal framing, a slice field, a pointer field, a polymorphic field, and
//! a cyclic type pair.

use std::collections::BTreeMap;

use tagwire::{marshal, unmarshal, unmarshal_any, wire, GobType};

fn varuint_bytes(x: u64) -> Vec<u8> {
    let mut out = Vec::new();
    tagwire::varint::write_uvarint(&mut out, x);
    out
}

fn varint_bytes(v: i64) -> Vec<u8> {
    let mut out = Vec::new();
    tagwire::varint::write_varint(&mut out, v);
    out
}

#[wire(type_id = 100)]
#[derive(Debug, Default, PartialEq)]
struct Person {
    #[wire(id = 1)]
    name: String,
    #[wire(id = 2)]
    age: i64,
    #[wire(id = 3)]
    tags: Vec<String>,
}

#[test]
fn person_roundtrip() {
    let p = Person {
        name: "Ada Lovelace".to_string(),
        age: 36,
        tags: vec!["mathematician".to_string(), "writer".to_string()],
    };
    let bytes = marshal(&p);
    let back: Person = unmarshal(&bytes).unwrap();
    assert_eq!(p, back);
}

#[wire(type_id = 101)]
#[derive(Debug, Default, PartialEq)]
struct AllZero {
    #[wire(id = 1)]
    a: i64,
    #[wire(id = 2)]
    b: String,
    #[wire(id = 3)]
    c: Vec<u8>,
}

#[test]
fn all_zero_value_is_minimal() {
    let z = AllZero::default();
    let bytes = marshal(&z);
    // TypeID 101 fits one VarInt byte, plus the one-byte terminator: 2 bytes total.
    assert_eq!(bytes.len(), 2);
    let back: AllZero = unmarshal(&bytes).unwrap();
    assert_eq!(z, back);
}

#[wire(type_id = 102)]
#[derive(Debug, Default, PartialEq)]
struct BarSlice {
    #[wire(id = 1)]
    values: Vec<i32>,
}

#[test]
fn bar_slice_roundtrip() {
    let b = BarSlice {
        values: vec![0, -1, 1, i32::MIN, i32::MAX],
    };
    let bytes = marshal(&b);
    let back: BarSlice = unmarshal(&bytes).unwrap();
    assert_eq!(b, back);
}

#[wire(type_id = 103)]
#[derive(Debug, Default, PartialEq)]
struct Inner {
    #[wire(id = 1)]
    value: i64,
}

#[wire(type_id = 104)]
#[derive(Debug, Default, PartialEq)]
struct WithPointer {
    #[wire(id = 1)]
    label: String,
    #[wire(id = 2)]
    child: Option<Box<Inner>>,
}

#[test]
fn pointer_field_present_and_null() {
    let present = WithPointer {
        label: "has child".to_string(),
        child: Some(Box::new(Inner { value: -9 })),
    };
    let bytes = marshal(&present);
    let back: WithPointer = unmarshal(&bytes).unwrap();
    assert_eq!(present, back);

    let absent = WithPointer {
        label: "no child".to_string(),
        child: None,
    };
    let bytes = marshal(&absent);
    let back: WithPointer = unmarshal(&bytes).unwrap();
    assert_eq!(absent, back);
}

#[wire(type_id = 105)]
#[derive(Debug, Default, PartialEq)]
struct Widget {
    #[wire(id = 1)]
    name: String,
}

#[wire(type_id = 106)]
#[derive(Debug, Default, PartialEq)]
struct AllTypes {
    #[wire(id = 1)]
    flag: bool,
    #[wire(id = 2)]
    compact: i64,
    #[wire(id = 3, fixed)]
    fixed_word: u32,
    #[wire(id = 4)]
    text: String,
    #[wire(id = 5)]
    payload: Option<Box<Inner>>,
    #[wire(id = 6, any)]
    polymorphic: Option<tagwire::Any>,
}

#[test]
fn all_types_with_pointer_and_polymorphic_field() {
    Widget::register().unwrap();

    let value = AllTypes {
        flag: true,
        compact: -1234,
        fixed_word: 0xdead_beef,
        text: "mixed bag".to_string(),
        payload: Some(Box::new(Inner { value: 7 })),
        polymorphic: Some(
            tagwire::Any::new(Widget {
                name: "gadget".to_string(),
            })
            .unwrap(),
        ),
    };

    let bytes = marshal(&value);
    let back: AllTypes = unmarshal(&bytes).unwrap();

    assert!(back.flag);
    assert_eq!(back.compact, -1234);
    assert_eq!(back.fixed_word, 0xdead_beef);
    assert_eq!(back.text, "mixed bag");
    assert_eq!(back.payload, Some(Box::new(Inner { value: 7 })));
    assert_eq!(back.polymorphic.as_ref().map(|a| a.type_id()), Some(105));
}

#[test]
fn envelope_dispatches_dynamically_by_type_id() {
    Person::register().unwrap();
    let p = Person {
        name: "dyn".to_string(),
        age: 1,
        tags: Vec::new(),
    };
    let bytes = marshal(&p);
    let any = unmarshal_any(&bytes).unwrap();
    assert_eq!(any.type_id(), 100);
}

#[wire(type_id = 107)]
#[derive(Debug, Default, PartialEq)]
struct NodeA {
    #[wire(id = 1)]
    label: String,
    #[wire(id = 2)]
    next: Option<Box<NodeB>>,
}

#[wire(type_id = 108)]
#[derive(Debug, Default, PartialEq)]
struct NodeB {
    #[wire(id = 1)]
    count: i64,
    #[wire(id = 2)]
    back: Option<Box<NodeA>>,
}

#[test]
fn cyclic_type_graph_roundtrip() {
    let graph = NodeA {
        label: "root".to_string(),
        next: Some(Box::new(NodeB {
            count: 3,
            back: Some(Box::new(NodeA {
                label: "leaf".to_string(),
                next: None,
            })),
        })),
    };
    let bytes = marshal(&graph);
    let back: NodeA = unmarshal(&bytes).unwrap();
    assert_eq!(graph, back);
}

#[wire(type_id = 109)]
#[derive(Debug, Default, PartialEq)]
struct WithMap {
    #[wire(id = 1)]
    counts: BTreeMap<String, i64>,
}

#[test]
fn map_field_roundtrip() {
    let mut counts = BTreeMap::new();
    counts.insert("a".to_string(), 1);
    counts.insert("b".to_string(), -2);
    let w = WithMap { counts };
    let bytes = marshal(&w);
    let back: WithMap = unmarshal(&bytes).unwrap();
    assert_eq!(w, back);
}

#[wire(type_id = 110)]
#[derive(Debug, Default, PartialEq)]
struct WithNestedStruct {
    #[wire(id = 1)]
    label: String,
    #[wire(id = 2)]
    inner: Inner,
}

#[test]
fn direct_nested_struct_field_roundtrip() {
    let present = WithNestedStruct {
        label: "embedded".to_string(),
        inner: Inner { value: 5 },
    };
    let bytes = marshal(&present);
    let back: WithNestedStruct = unmarshal(&bytes).unwrap();
    assert_eq!(present, back);

    // A zero-valued nested struct is itself zero, so its tag is elided.
    let zero = WithNestedStruct {
        label: "embedded".to_string(),
        inner: Inner::default(),
    };
    let bytes = marshal(&zero);
    let back: WithNestedStruct = unmarshal(&bytes).unwrap();
    assert_eq!(zero, back);
}

#[test]
fn unknown_field_id_is_rejected() {
    let p = Person {
        name: "x".to_string(),
        age: 1,
        tags: Vec::new(),
    };
    let mut bytes = marshal(&p);

    // Person's TypeID is one byte; the body starts right after it. Splice in
    // a field tag (id 99) that Person's plan doesn't know about, ahead of
    // the real terminator.
    let type_id_len = varuint_bytes(Person::TYPE_ID).len();
    bytes.splice(type_id_len..type_id_len, varuint_bytes(99));

    let err = unmarshal::<Person>(&bytes).unwrap_err();
    assert!(matches!(
        err,
        tagwire::Error::UnknownField {
            type_id: 100,
            field_id: 99,
        }
    ));
}

#[test]
fn zero_field_tag_is_elided_from_the_wire() {
    let z = AllZero::default();
    let bytes = marshal(&z);

    let mut expected = varuint_bytes(101); // TypeID
    expected.extend(varuint_bytes(0)); // struct terminator, no field tags
    assert_eq!(bytes, expected);

    let mut nonzero = AllZero::default();
    nonzero.a = 9;
    let bytes = marshal(&nonzero);

    let mut expected = varuint_bytes(101); // TypeID
    expected.extend(varuint_bytes(1)); // field tag for `a`
    expected.extend(varint_bytes(9)); // `a`'s value
    expected.extend(varuint_bytes(0)); // struct terminator
    assert_eq!(bytes, expected);

    // The all-zero encoding is exactly TypeID + terminator: no room for
    // field 1's tag to have snuck in anywhere, elided rather than written
    // as a zero-valued placeholder.
    let all_zero_bytes = marshal(&AllZero::default());
    assert_eq!(all_zero_bytes.len(), 2);
}

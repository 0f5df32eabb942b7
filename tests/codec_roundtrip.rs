use graft::codec::{OpaqueType, OpaqueValue};
use graft::plugins::clusters::Clusters;
use graft::plugins::labels::Labels;
use graft::plugins::ops;
use graft::plugins::pos::Pos;
use graft::plugins::status::{self, Status};
use graft::net::{self, Net};
use graft::{Codec, CodecError, Composer, Limits, Options, Symbol, Tree, Value};
use proptest::prelude::*;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const NO_EXTENSIONS: [&str; 0] = [];

fn roundtrip(value: &Value) -> Value {
    let text = graft::dumps(value).expect("dumps");
    graft::loads(&text, NO_EXTENSIONS).expect("loads")
}

#[test]
fn integer_document() {
    let codec = Codec::default();
    let tree = codec.encode(&Value::Int(42)).expect("encode");
    let object = tree.only_child().expect("one child");
    assert_eq!(object.tag, "object");
    assert_eq!(object.get_attr("type"), Some("int"));
    assert_eq!(object.text(), Some("42"));

    let text = codec.dumps(&Value::Int(42)).expect("dumps");
    assert_eq!(
        text,
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<pnml>\n <object type=\"int\">42</object>\n</pnml>"
    );
    assert_eq!(codec.loads(&text, NO_EXTENSIONS).expect("loads"), Value::Int(42));
}

#[test]
fn mixed_list_keeps_order() {
    let value = Value::List(vec![Value::Int(1), Value::from("two"), Value::Float(3.5)]);
    let tree = Codec::default().encode(&value).expect("encode");
    let list = tree.only_child().expect("one child");
    assert_eq!(list.get_attr("type"), Some("list"));
    let kinds: Vec<_> = list.children.iter().filter_map(|c| c.get_attr("type")).collect();
    assert_eq!(kinds, ["int", "str", "float"]);
    assert_eq!(roundtrip(&value), value);
}

#[test]
fn collections_and_scalars() {
    let values = vec![
        Value::None,
        Value::Bool(true),
        Value::Bool(false),
        Value::Int(-7),
        Value::Float(-0.125),
        Value::from("  spaced  "),
        Value::from("<&\"'>"),
        Value::Tuple(vec![]),
        Value::Tuple(vec![Value::Int(1), Value::List(vec![Value::None])]),
        Value::set([Value::Int(3), Value::Int(1), Value::Int(3)]),
        Value::dict([
            (Value::from("b"), Value::Int(2)),
            (Value::Int(1), Value::List(vec![Value::from("x")])),
        ]),
        Value::Symbol(Symbol::module("graft.net")),
        Value::Symbol(Symbol::class("graft.net.Place")),
    ];

    for value in values {
        assert_eq!(roundtrip(&value), value, "{value:?}");
    }
}

#[test]
fn blank_strings_roundtrip() {
    for text in ["", " ", "   ", "\n\t ", "\r\n"] {
        let value = Value::from(text);
        assert_eq!(roundtrip(&value), value, "{text:?}");
    }
    let nested = Value::List(vec![Value::from(" "), Value::from("x")]);
    assert_eq!(roundtrip(&nested), nested);
}

#[test]
fn hand_built_sets_with_repeats() {
    let value = Value::Set(vec![Value::Int(1), Value::Int(1), Value::Int(2)]);
    let loaded = roundtrip(&value);
    assert_eq!(loaded, value);
    assert_eq!(loaded, Value::set([Value::Int(1), Value::Int(2)]));
    assert_eq!(loaded.as_seq().expect("set").len(), 2);
}

#[test]
fn metadata_drives_recomposition() {
    let env = Composer::global()
        .compose(["labels", "status"], &net::environment())
        .expect("compose");
    let mut place = env
        .construct(
            net::PLACE,
            Options::named("p").with("status", status::entry(&env).expect("entry")),
        )
        .expect("place");
    place.set_label("colour", "red").expect("label");

    let codec = Codec::default();
    let tree = codec.encode(&Value::Object(place.clone())).expect("encode");
    let meta = tree.child("graft").expect("metadata");
    assert!(meta.get_attr("version").is_some());
    assert_eq!(codec.required_extensions(&tree).expect("required"), ["labels", "status"]);

    let decoded = codec.decode(&tree, NO_EXTENSIONS).expect("decode");
    let object = decoded.as_object().expect("instance");
    assert!(object.is_extended_by("labels"));
    assert_eq!(object.status_name().expect("status"), Some(status::ENTRY));
    assert_eq!(object.label("colour"), Some(&Value::from("red")));
    assert_eq!(decoded, Value::Object(place));
}

#[test]
fn documents_can_ask_for_more() {
    let place = net::place(&net::environment(), "p", 2).expect("place");
    let text = graft::dumps(&Value::Object(place)).expect("dumps");
    assert!(!text.contains("<graft"));

    let loaded = graft::loads(&text, ["pos"]).expect("loads");
    let object = loaded.as_object().expect("instance");
    assert!(object.is_extended_by("pos"));
    assert_eq!(object.pos(), Some((0.0, 0.0)));
    assert_eq!(object.get("tokens"), Some(&Value::Int(2)));
}

#[test]
fn tags_pull_in_their_extension() {
    let text = r#"<?xml version="1.0" encoding="utf-8"?>
<pnml>
 <status>
  <name>exit</name>
  <value>
   <object type="NoneType"/>
  </value>
 </status>
</pnml>"#;
    let value = graft::loads(text, NO_EXTENSIONS).expect("loads");
    let exit = value.as_object().expect("instance");
    assert_eq!(exit.ty().name(), status::STATUS);
    assert_eq!(exit.name(), Some(status::EXIT));
    assert_eq!(exit.get("value"), Some(&Value::None));
}

#[test]
fn net_with_extensions() {
    let env = Composer::global()
        .compose(["ops", "pos", "labels"], &net::environment())
        .expect("compose");

    let mut n = net::net(&env, "n").expect("net");
    let mut p = env
        .construct(
            net::PLACE,
            Options::named("p")
                .with("status", status::entry(&env).expect("entry"))
                .with("pos", Value::Tuple(vec![Value::Float(1.0), Value::Float(2.0)])),
        )
        .expect("place");
    p.set_label("kind", "buffer").expect("label");
    n.add_place(p).expect("add place");
    n.add_transition(net::transition(&env, "t").expect("transition"))
        .expect("add transition");
    n.add_arc("p", "t", 1).expect("arc");
    n.add_to_cluster("p", &[0]).expect("cluster");
    n.set_label("author", Value::None).expect("net label");

    let value = Value::Object(n);
    let text = graft::dumps(&value).expect("dumps");
    assert!(text.contains("<position x=\"1.0\" y=\"2.0\"/>"));

    let loaded = graft::loads(&text, NO_EXTENSIONS).expect("loads");
    assert_eq!(loaded, value);
    let loaded = loaded.as_object().expect("instance");
    assert_eq!(loaded.cluster_path("p"), Some(vec![0]));
    assert_eq!(loaded.node("p").expect("p").pos(), Some((1.0, 2.0)));
}

#[test]
fn composed_nets_roundtrip() {
    let env = Composer::global()
        .compose(["ops"], &net::environment())
        .expect("compose");
    let mut basic = net::net(&env, "basic").expect("net");
    for (name, state) in [
        ("e", status::entry(&env)),
        ("x", status::exit(&env)),
        ("b", status::buffer(&env, "buf")),
    ] {
        let place = env
            .construct(net::PLACE, Options::named(name).with("status", state.expect("status")))
            .expect("place");
        basic.add_place(place).expect("add place");
    }
    basic.add_transition(net::transition(&env, "t").expect("transition")).expect("add");
    basic.add_arc("e", "t", 1).expect("arc");
    basic.add_arc("t", "x", 2).expect("arc");

    let n = ops::sequence(&env, &basic, &basic).expect("sequence");
    let n = ops::iteration(&env, &n, &basic).expect("iteration");
    let value = Value::Object(n);
    let loaded = graft::loads(&graft::dumps(&value).expect("dumps"), NO_EXTENSIONS).expect("loads");
    assert_eq!(loaded, value);

    let loaded = loaded.as_object().expect("instance");
    let internal = status::internal(&env).expect("internal");
    assert_eq!(status::nodes_with_status(loaded, &internal).expect("nodes"), ["[[x&e]*]"]);
}

#[derive(Debug)]
struct Pattern(Regex);

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Regex::new(&source).map(Pattern).map_err(serde::de::Error::custom)
    }
}

impl OpaqueType for Pattern {
    const NAME: &'static str = "regex.Pattern";
}

#[test]
fn opaque_pattern_roundtrip() {
    let pattern = Pattern(Regex::new(r"^[a-z]+\d{2,}$").expect("regex"));
    let value = Value::List(vec![Value::Opaque(OpaqueValue::new(pattern)), Value::Int(1)]);

    let codec = Codec::default().with_opaque::<Pattern>();
    let tree = codec.encode(&value).expect("encode");
    let blob = &tree.only_child().expect("list").children[0];
    assert_eq!(blob.get_attr("type"), Some("opaque"));
    assert_eq!(blob.get_attr("name"), Some(Pattern::NAME));
    assert!(blob.children.is_empty());

    let decoded = codec.decode(&tree, NO_EXTENSIONS).expect("decode");
    assert_eq!(decoded, value);
    let items = decoded.as_seq().expect("list");
    let Value::Opaque(blob) = &items[0] else {
        panic!("expected opaque value, got {:?}", items[0]);
    };
    let regex = &blob.downcast_ref::<Pattern>().expect("pattern").0;
    assert!(regex.is_match("abc42"));
    assert!(!regex.is_match("abc4"));

    assert!(matches!(
        Codec::default().decode(&tree, NO_EXTENSIONS),
        Err(CodecError::UnknownOpaque(_))
    ));

    let strict = Codec::default().with_limits(Limits {
        allow_opaque: false,
        ..Limits::default()
    });
    assert!(matches!(strict.encode(&value), Err(CodecError::Serialization(_))));
}

#[test]
fn decode_errors() {
    let cases = [
        ("<pnml/>", "empty"),
        ("<pnml><mystery/></pnml>", "tag"),
        (r#"<pnml><object type="complex">1j</object></pnml>"#, "object type"),
        (r#"<pnml><object type="int">4x2</object></pnml>"#, "literal"),
        (r#"<pnml><object type="bool">yes</object></pnml>"#, "literal"),
        (r#"<pnml><object type="class" name="graft.net.Nothing"/></pnml>"#, "symbol"),
        ("<pnml><object", "parse"),
    ];
    for (text, kind) in cases {
        let err = graft::loads(text, NO_EXTENSIONS).expect_err(text);
        let matched = match kind {
            "empty" => matches!(err, CodecError::EmptyDocument),
            "tag" => matches!(err, CodecError::UnsupportedTag(_)),
            "object type" => matches!(err, CodecError::UnsupportedObjectType(_)),
            "literal" => matches!(err, CodecError::InvalidLiteral { .. }),
            "symbol" => matches!(err, CodecError::UnknownSymbol(_)),
            _ => matches!(err, CodecError::Tree(_)),
        };
        assert!(matched, "{text}: {err:?}");
    }
}

#[test]
fn several_roots_load_as_tuple() {
    let text = r#"<pnml>
 <object type="int">1</object>
 <object type="str">b</object>
</pnml>"#;
    assert_eq!(
        graft::loads(text, NO_EXTENSIONS).expect("loads"),
        Value::Tuple(vec![Value::Int(1), Value::from("b")])
    );
}

#[test]
fn depth_limit() {
    let mut value = Value::Int(0);
    for _ in 0..10 {
        value = Value::List(vec![value]);
    }
    let shallow = Codec::default().with_limits(Limits {
        max_depth: 5,
        ..Limits::default()
    });
    assert!(matches!(shallow.encode(&value), Err(CodecError::TooDeep(5))));

    let tree = Codec::default().encode(&value).expect("encode");
    assert!(matches!(
        shallow.decode(&tree, NO_EXTENSIONS),
        Err(CodecError::TooDeep(5))
    ));
}

#[test]
fn tree_rendering_is_stable() {
    let tree = Codec::default()
        .encode(&Value::dict([(Value::from("k"), Value::Bool(true))]))
        .expect("encode");
    let reparsed: Tree = graft_tree::parse(&tree.to_xml()).expect("parse");
    assert_eq!(reparsed, tree);
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::None),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e12f64..1.0e12).prop_map(Value::Float),
        "[a-zA-Z0-9<>&\"'.%-][a-zA-Z0-9 <>&\"'.%-]{0,24}".prop_map(Value::Str),
    ]
}

proptest! {
    #[test]
    fn scalars_roundtrip(value in scalar()) {
        prop_assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn sequences_roundtrip(items in prop::collection::vec(scalar(), 0..8)) {
        let value = Value::Tuple(items);
        prop_assert_eq!(roundtrip(&value), value);
    }
}

use super::*;
use crate::document::Node;
use crate::error::StrataError;
use crate::nesting::NESTED_STACK_TYPE;
use crate::sources::FragmentSource;
use serde_json::json;
use std::cell::Cell;
use std::rc::Rc;

fn bucket_document() -> Document {
    let mut doc = Document::new();
    doc.set(&["Resources", "Bucket", "Type"], "AWS::S3::Bucket");
    doc
}

fn param_spec(entries: &[(&str, &str)]) -> Node {
    let mut map = Mapping::new();
    for (key, value) in entries {
        map.insert(key.to_string(), Node::from(*value));
    }
    Node::Mapping(map)
}

struct CountingSource {
    document: Document,
    produced: Rc<Cell<usize>>,
}

impl FragmentSource for CountingSource {
    fn produce(&self) -> crate::error::Result<Document> {
        self.produced.set(self.produced.get() + 1);
        Ok(self.document.clone())
    }
}

#[test]
fn test_generation_parameters_accept_type_and_default() {
    let mut parameters = Mapping::new();
    parameters.insert(
        "size".to_string(),
        param_spec(&[("type", "Number"), ("default", "3")]),
    );
    assert!(Formation::new("net", parameters).is_ok());
}

#[test]
fn test_generation_parameter_must_be_mapping() {
    let mut parameters = Mapping::new();
    parameters.insert("size".to_string(), Node::from("large"));
    let err = Formation::new("net", parameters).unwrap_err();
    match err {
        StrataError::Validation(msg) => assert!(msg.contains("'size'"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_generation_parameter_rejects_unknown_key() {
    let mut parameters = Mapping::new();
    parameters.insert("size".to_string(), param_spec(&[("flavor", "spicy")]));
    let err = Formation::new("net", parameters).unwrap_err();
    match err {
        StrataError::Validation(msg) => assert!(msg.contains("`flavor`"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_single_fragment_compiles_to_its_document() {
    let mut formation = Formation::new("storage", Mapping::new()).unwrap();
    formation.base(bucket_document());
    assert_eq!(
        formation.dump().unwrap(),
        json!({"Resources": {"Bucket": {"Type": "AWS::S3::Bucket"}}})
    );
}

#[test]
fn test_fragments_merge_in_load_order() {
    let mut first = Document::new();
    first.set(&["Resources", "Bucket", "Type"], "AWS::S3::Bucket");
    first.set(&["Resources", "Bucket", "Properties", "BucketName"], "one");
    let mut second = Document::new();
    second.set(&["Resources", "Bucket", "Properties", "BucketName"], "two");

    let mut formation = Formation::new("storage", Mapping::new()).unwrap();
    formation.load("first", &first).unwrap();
    formation.load("second", &second).unwrap();

    let dumped = formation.dump().unwrap();
    assert_eq!(
        dumped["Resources"]["Bucket"]["Properties"]["BucketName"],
        json!("two")
    );
    // The union keeps keys only the earlier fragment set.
    assert_eq!(dumped["Resources"]["Bucket"]["Type"], json!("AWS::S3::Bucket"));
}

#[test]
fn test_base_merges_first_even_when_set_last() {
    let mut base = Document::new();
    base.set(&["Description"], "from base");
    let mut component = Document::new();
    component.set(&["Description"], "from component");

    let mut formation = Formation::new("net", Mapping::new()).unwrap();
    formation.load("component", &component).unwrap();
    formation.base(base);

    assert_eq!(formation.dump().unwrap()["Description"], json!("from component"));
    assert_eq!(formation.fragments()[0].key, BASE_KEY);
}

#[test]
fn test_compile_is_memoized() {
    let runs = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&runs);

    let mut formation = Formation::new("net", Mapping::new()).unwrap();
    formation.base(bucket_document());
    formation.override_with(move |_doc, _state| {
        counter.set(counter.get() + 1);
        Ok(())
    });

    let first = formation.compile().unwrap().clone();
    let second = formation.compile().unwrap().clone();
    assert_eq!(first, second);
    assert_eq!(runs.get(), 1);
}

#[test]
fn test_recompile_rebuilds_without_reproducing_fragments() {
    let produced = Rc::new(Cell::new(0usize));
    let source = CountingSource {
        document: bucket_document(),
        produced: Rc::clone(&produced),
    };
    let runs = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&runs);

    let mut formation = Formation::new("net", Mapping::new()).unwrap();
    formation.load("bucket", &source).unwrap();
    formation.override_with(move |_doc, _state| {
        counter.set(counter.get() + 1);
        Ok(())
    });

    formation.compile().unwrap();
    formation.recompile().unwrap();

    assert_eq!(produced.get(), 1, "fragment produced once, at load time");
    assert_eq!(runs.get(), 2, "overrides re-ran on recompile");
}

#[test]
fn test_identical_inputs_compile_identically() {
    let build = || {
        let mut formation = Formation::new("net", Mapping::new()).unwrap();
        formation.base(bucket_document());
        formation.override_with(|doc, _state| {
            doc.set(&["Resources", "Bucket", "Properties", "Versioned"], true);
            Ok(())
        });
        formation.dump().unwrap()
    };
    assert_eq!(build(), build());
}

#[test]
fn test_override_order_sensitivity() {
    let later_wins = |first: &'static str, second: &'static str| {
        let mut formation = Formation::new("net", Mapping::new()).unwrap();
        formation.base(bucket_document());
        formation.override_with(move |doc, _state| {
            doc.set(&["Description"], first);
            Ok(())
        });
        formation.override_with(move |doc, _state| {
            doc.set(&["Description"], second);
            Ok(())
        });
        formation.dump().unwrap()["Description"].clone()
    };
    assert_eq!(later_wins("a", "b"), json!("b"));
    assert_eq!(later_wins("b", "a"), json!("a"));
}

#[test]
fn test_override_state_visibility_and_non_emission() {
    let mut formation = Formation::new("net", Mapping::new()).unwrap();
    formation.base(bucket_document());
    formation.override_with(|doc, state| {
        if let Some(env) = state.get("env").and_then(Node::as_str) {
            doc.set(&["Metadata", "Env"], env);
        }
        Ok(())
    });
    formation.override_with_state(
        Mapping::from([("region".to_string(), Node::from("us-west-2"))]),
        |doc, state| {
            let env = state.get("env").and_then(Node::as_str).unwrap_or("?");
            let region = state.get("region").and_then(Node::as_str).unwrap_or("?");
            doc.set(&["Metadata", "Location"], format!("{env}/{region}"));
            Ok(())
        },
    );

    let initial = Mapping::from([("env".to_string(), Node::from("prod"))]);
    let dumped = formation.compile_with_state(initial).unwrap().dump();

    assert_eq!(dumped["Metadata"]["Env"], json!("prod"));
    assert_eq!(dumped["Metadata"]["Location"], json!("prod/us-west-2"));
    assert!(dumped.get("env").is_none());
    assert!(dumped.get("region").is_none());
}

#[test]
fn test_injected_state_args_visible_to_subsequent_overrides() {
    let mut formation = Formation::new("net", Mapping::new()).unwrap();
    formation.base(Document::new());
    formation.override_with_state(
        Mapping::from([("tier".to_string(), Node::from("web"))]),
        |_doc, _state| Ok(()),
    );
    formation.override_with(|doc, state| {
        doc.set(
            &["Description"],
            state.get("tier").and_then(Node::as_str).unwrap_or("?"),
        );
        Ok(())
    });

    assert_eq!(formation.dump().unwrap()["Description"], json!("web"));
}

#[test]
fn test_failed_override_leaves_cache_empty() {
    let runs = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&runs);

    let mut formation = Formation::new("net", Mapping::new()).unwrap();
    formation.base(bucket_document());
    formation.override_with(move |_doc, _state| {
        counter.set(counter.get() + 1);
        Err(StrataError::Validation("boom".to_string()))
    });

    assert!(formation.compile().is_err());
    assert!(formation.compile().is_err());
    assert_eq!(runs.get(), 2, "no partial cache survived the failure");
}

#[test]
fn test_compile_with_state_returns_cache_when_compiled() {
    let mut formation = Formation::new("net", Mapping::new()).unwrap();
    formation.base(bucket_document());
    formation.override_with(|doc, state| {
        if state.get("env").is_some() {
            doc.set(&["Metadata", "Env"], "set");
        }
        Ok(())
    });

    formation.compile().unwrap();
    let state = Mapping::from([("env".to_string(), Node::from("prod"))]);
    let dumped = formation.compile_with_state(state).unwrap().dump();
    assert!(dumped.get("Metadata").is_none());
}

#[test]
fn test_nesting_predicates() {
    let mut mixed = Formation::new("net", Mapping::new()).unwrap();
    let mut doc = bucket_document();
    doc.set(&["Resources", "Network", "Type"], NESTED_STACK_TYPE);
    mixed.base(doc);
    assert!(mixed.nested().unwrap());
    assert!(!mixed.isolated_nests().unwrap());

    let mut isolated = Formation::new("net", Mapping::new()).unwrap();
    let mut doc = Document::new();
    doc.set(&["Resources", "Network", "Type"], NESTED_STACK_TYPE);
    isolated.base(doc);
    assert!(isolated.nested().unwrap());
    assert!(isolated.isolated_nests().unwrap());

    let mut empty = Formation::new("net", Mapping::new()).unwrap();
    empty.base(Document::new());
    assert!(!empty.nested().unwrap());
    assert!(empty.isolated_nests().unwrap());
}

#[test]
fn test_load_component_file() {
    let dir = tempfile::tempdir().unwrap();
    let components = dir.path().join("components");
    std::fs::create_dir_all(&components).unwrap();
    std::fs::write(
        components.join("storage.yml"),
        "Resources:\n  Bucket:\n    Type: AWS::S3::Bucket\n",
    )
    .unwrap();

    let paths = TemplatePaths::new(dir.path());
    let mut formation = Formation::new("app", Mapping::new()).unwrap();
    formation.load_component(&paths, "storage").unwrap();

    assert_eq!(
        formation.dump().unwrap(),
        json!({"Resources": {"Bucket": {"Type": "AWS::S3::Bucket"}}})
    );
    assert_eq!(formation.fragments()[0].key, "storage");
}

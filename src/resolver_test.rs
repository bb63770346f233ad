use super::*;
use crate::error::ErrorKind;
use crate::test_helpers;

// =============================================================================
// resolve
// =============================================================================

#[test]
fn resolve_finds_exact_identifier() {
    let doc = test_helpers::sample_document();
    let entry = resolve(&doc, "foo").unwrap();
    assert_eq!(entry.id, "foo");
}

#[test]
fn resolve_missing_is_always_not_found() {
    let doc = test_helpers::sample_document();
    for id in ["bar", "Foo", "FOO", " foo", "foo ", "", "src/x/Foo.tsx", "widget/"] {
        let err = resolve(&doc, id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ComponentNotFound, "identifier {id:?}");
        assert_eq!(err.identifier(), id);
    }
}

#[test]
fn resolve_component_not_found_wins_over_path_problems() {
    let mut doc = test_helpers::sample_document();
    doc.components.get_mut("foo").unwrap().path = "/abs/Foo.tsx".into();
    let err = resolve_component(&doc, "bar").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ComponentNotFound);
}

// =============================================================================
// ExportSelection
// =============================================================================

#[test]
fn export_selection_follows_default_flag() {
    let default = test_helpers::entry("foo", "src/x/Foo.tsx", true);
    assert_eq!(ExportSelection::for_entry(&default), ExportSelection::Default);

    let mut named = test_helpers::entry("widget", "src/x/Widget.tsx", false);
    named.name = "Widget".into();
    assert_eq!(ExportSelection::for_entry(&named), ExportSelection::Named("Widget".into()));
    assert_eq!(ExportSelection::for_entry(&named).to_string(), "export 'Widget'");
}

// =============================================================================
// map_load_reference
// =============================================================================

#[test]
fn maps_source_paths() {
    assert_eq!(map_load_reference("src/x/Foo.tsx").unwrap().as_str(), "x/Foo");
    assert_eq!(
        map_load_reference("src/components/bigbook/custom/ParishCalendar.tsx").unwrap().as_str(),
        "components/bigbook/custom/ParishCalendar"
    );
    assert_eq!(map_load_reference("src/Root.js").unwrap().as_str(), "Root");
    assert_eq!(map_load_reference("src/a/b.c/Thing.test.ts").unwrap().as_str(), "a/b.c/Thing.test");
}

#[test]
fn mapping_is_deterministic() {
    let a = map_load_reference("src/x/Foo.tsx").unwrap();
    let b = map_load_reference("src/x/Foo.tsx").unwrap();
    assert_eq!(a, b);
}

#[test]
fn rejects_unmappable_paths() {
    let cases = [
        ("", "empty path"),
        ("src\\x\\Foo.tsx", "backslash separator"),
        ("/src/x/Foo.tsx", "absolute path"),
        ("lib/x/Foo.tsx", "outside the source root"),
        ("src/../secrets/Foo.tsx", "empty or relative segment"),
        ("src/x//Foo.tsx", "empty or relative segment"),
        ("src/./Foo.tsx", "empty or relative segment"),
        ("src/", "empty or relative segment"),
        ("src/x/Foo", "missing extension"),
        ("src/x/Foo.css", "unsupported extension"),
        ("src/x/.tsx", "unsupported extension"),
    ];
    for (path, reason) in cases {
        let err = map_load_reference(path).unwrap_err();
        assert_eq!(err.reason, reason, "path {path:?}");
        assert_eq!(err.path, path);
    }
}

#[test]
fn resolve_component_surfaces_path_mapping_error() {
    let mut doc = test_helpers::sample_document();
    doc.components.get_mut("foo").unwrap().path = "../outside/Foo.tsx".into();
    let err = resolve_component(&doc, "foo").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PathMappingError);
    assert!(err.to_string().contains("../outside/Foo.tsx"));
}

#[test]
fn resolve_component_bundles_reference_and_export() {
    let doc = test_helpers::sample_document();
    let res = resolve_component(&doc, "widget").unwrap();
    assert_eq!(res.reference.as_str(), "x/Widget");
    assert_eq!(res.export, ExportSelection::Named("Widget".into()));
    assert_eq!(res.entry.id, "widget");
}

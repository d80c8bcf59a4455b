mod common;

use common::{TestResult, empty_engine};
use treelens::{ErrorCode, ErrorInfo};

#[test]
fn test_set_get_match_rm_scenario() -> TestResult {
    let mut engine = empty_engine();
    engine.set("/a/b", Some("1"))?;
    assert_eq!(engine.match_paths("/a/*")?, vec!["/a/b"]);
    assert_eq!(engine.get("/a/b")?.as_deref(), Some("1"));

    assert_eq!(engine.rm("/a")?, 2);
    assert_eq!(engine.get("/a/b")?, None);
    assert!(!engine.exists("/a/b")?);
    assert!(engine.match_paths("/a")?.is_empty());
    Ok(())
}

#[test]
fn test_multi_match_set_leaves_tree_unchanged() -> TestResult {
    let mut engine = empty_engine();
    engine.set("/a/b[1]", Some("1"))?;
    engine.set("/a/b[2]", Some("2"))?;
    let before = engine.tree().node_count();

    let err = engine.set("/a/b", Some("3")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::MultipleMatches);
    assert_eq!(engine.tree().node_count(), before);
    assert_eq!(engine.get("/a/b[1]")?.as_deref(), Some("1"));
    assert_eq!(engine.get("/a/b[2]")?.as_deref(), Some("2"));
    Ok(())
}

#[test]
fn test_absent_and_empty_values_differ() -> TestResult {
    let mut engine = empty_engine();
    engine.set("/none", None)?;
    engine.set("/empty", Some(""))?;
    assert_eq!(engine.get("/none")?, None);
    assert_eq!(engine.get("/empty")?.as_deref(), Some(""));
    assert_eq!(engine.match_paths("/*[. = '']")?, vec!["/empty"]);
    Ok(())
}

#[test]
fn test_insert_before_and_after() -> TestResult {
    let mut engine = empty_engine();
    engine.set("/l/b", Some("b"))?;
    engine.insert("/l/b", "a", true)?;
    engine.insert("/l/b", "c", false)?;
    let labels: Vec<String> = engine
        .match_paths("/l/*")?
        .iter()
        .map(|p| engine.label(p).map(Option::unwrap_or_default))
        .collect::<Result<_, _>>()?;
    assert_eq!(labels, vec!["a", "b", "c"]);
    Ok(())
}

#[test]
fn test_mv_replaces_existing_destination() -> TestResult {
    let mut engine = empty_engine();
    engine.set("/src/x", Some("1"))?;
    engine.set("/dst/old", Some("gone"))?;
    engine.mv("/src", "/dst")?;

    assert!(engine.match_paths("/src")?.is_empty());
    assert_eq!(engine.get("/dst/x")?.as_deref(), Some("1"));
    assert!(engine.match_paths("/dst/old")?.is_empty());

    let err = engine.mv("/dst", "/dst/x/inner").unwrap_err();
    assert_eq!(err.code(), ErrorCode::MoveDescendant);
    Ok(())
}

#[test]
fn test_defvar_scenario() -> TestResult {
    let mut engine = empty_engine();
    engine.set("/a/b[1]", Some("1"))?;
    engine.set("/a/b[2]", Some("2"))?;

    assert!(engine.defvar("x", Some("/a/b")).is_err());
    assert_eq!(engine.error().code, ErrorCode::MultipleMatches);

    engine.defvar("x", Some("/a/b[1]"))?;
    assert_eq!(engine.get("$x")?.as_deref(), Some("1"));
    assert_eq!(engine.defvar("x", None)?, 0);
    assert_eq!(engine.error(), ErrorInfo::none());
    Ok(())
}

#[test]
fn test_setm_and_rename() -> TestResult {
    let mut engine = empty_engine();
    for i in 1..=3 {
        engine.set(&format!("/hosts/host[{}]/ip", i), Some("0.0.0.0"))?;
    }
    assert_eq!(engine.setm("/hosts/host", Some("alias"), Some("h"))?, 3);
    assert_eq!(engine.match_paths("/hosts/host/alias")?.len(), 3);

    assert_eq!(engine.rename("/hosts/host", "entry")?, 3);
    assert!(engine.match_paths("/hosts/host")?.is_empty());
    assert_eq!(engine.match_paths("/hosts/entry[alias = 'h']")?.len(), 3);
    Ok(())
}

#[test]
fn test_text_store_retrieve_round_trip() -> TestResult {
    let mut engine = empty_engine();
    let text = "# shells\n/bin/sh\n\n/bin/bash\n";
    engine.set("/input", Some(text))?;
    engine.text_store("Simplelines.lns", "/input", "/parsed")?;
    assert_eq!(engine.get("/parsed/2")?.as_deref(), Some("/bin/bash"));

    engine.text_retrieve("Simplelines.lns", "/input", "/parsed", "/output")?;
    assert_eq!(engine.get("/output")?.as_deref(), Some(text));
    Ok(())
}

#[test]
fn test_error_record_serializes() -> TestResult {
    let mut engine = empty_engine();
    assert!(engine.get("/a[").is_err());
    let value = serde_json::to_value(engine.error())?;
    assert_eq!(value["code"], 3);
    assert!(value.get("minor").is_some());

    engine.get("/a")?;
    assert_eq!(
        serde_json::to_string(&engine.error())?,
        r#"{"code":0,"message":"No error"}"#
    );
    Ok(())
}

mod common;

use common::{IDENTITY_XSLT, TEXT_XSLT, TestResult, Workspace, path_str};
use xsltui::{CliError, EditorId, JsonFileStore, UpdateState};
use xsltui_core::KeyValueStore;

#[test]
fn test_run_with_defaults_renders_html() -> TestResult {
    let ws = Workspace::new();
    let output = ws.run(&["run"]);
    output.result?;
    assert_eq!(output.stderr.trim(), "HTML");
    assert!(output.stdout.contains("<table>"));
    assert!(output.stdout.contains("Midnight Rain"));
    Ok(())
}

#[test]
fn test_run_saves_given_files() -> TestResult {
    let ws = Workspace::new();
    let xml = ws.file("in.xml", "<list><item/><item/></list>");
    let xslt = ws.file("text.xsl", TEXT_XSLT);

    let output = ws.run(&["run", "--xml", path_str(&xml), "--xslt", path_str(&xslt)]);
    output.result?;
    assert_eq!(output.stderr.trim(), "Text");
    assert_eq!(output.stdout.trim(), "hello 2");

    let store = JsonFileStore::open(ws.store())?;
    assert_eq!(store.get("xsltui.xml")?.as_deref(), Some("<list><item/><item/></list>"));
    assert_eq!(store.get("xsltui.xslt")?.as_deref(), Some(TEXT_XSLT));

    // A later run picks the stored panes up again.
    let again = ws.run(&["run"]);
    again.result?;
    assert_eq!(again.stdout.trim(), "hello 2");
    Ok(())
}

#[test]
fn test_run_identity_labels_xml() -> TestResult {
    let ws = Workspace::new();
    let xml = ws.file("a.xml", "<a/>");
    let xslt = ws.file("id.xsl", IDENTITY_XSLT);
    let output = ws.run(&["run", "--xml", path_str(&xml), "--xslt", path_str(&xslt)]);
    output.result?;
    assert_eq!(output.stderr.trim(), "XML");
    assert_eq!(output.stdout.trim(), "<a/>");
    Ok(())
}

#[test]
fn test_run_reports_parse_errors_per_pane() {
    let ws = Workspace::new();
    let xml = ws.file("broken.xml", "<a><b></a>");
    let output = ws.run(&["run", "--xml", path_str(&xml)]);
    assert!(matches!(
        output.result,
        Err(CliError::UpdateFailed(UpdateState::ParseError))
    ));
    assert!(output.stderr.starts_with("[xml] "));
    assert!(!output.stderr.contains("[xslt]"));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_run_reports_transform_errors_on_output() {
    let ws = Workspace::new();
    let xslt = ws.file(
        "bad.xsl",
        r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
             <xsl:template match="/"><xsl:frobnicate/></xsl:template>
           </xsl:stylesheet>"#,
    );
    let output = ws.run(&["run", "--xslt", path_str(&xslt)]);
    assert!(matches!(
        output.result,
        Err(CliError::UpdateFailed(UpdateState::TransformError))
    ));
    assert!(output.stderr.contains("[output] "));
    assert!(output.stderr.contains("frobnicate"));
}

#[test]
fn test_set_show_and_reset() -> TestResult {
    let ws = Workspace::new();
    let xml = ws.file("doc.xml", "<doc>stored</doc>");

    ws.run(&["set", "xml", path_str(&xml)]).result?;
    let shown = ws.run(&["show", "xml"]);
    shown.result?;
    assert_eq!(shown.stdout, "<doc>stored</doc>\n");

    ws.run(&["reset", "xml"]).result?;
    let shown = ws.run(&["show", "xml"]);
    shown.result?;
    assert!(shown.stdout.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<catalog>"));
    assert!(JsonFileStore::open(ws.store())?.is_empty());
    Ok(())
}

#[test]
fn test_reset_without_pane_clears_both() -> TestResult {
    let ws = Workspace::new();
    let xml = ws.file("doc.xml", "<doc/>");
    ws.run(&["set", "xml", path_str(&xml)]).result?;
    ws.run(&["set", "xslt", path_str(&xml)]).result?;
    assert_eq!(JsonFileStore::open(ws.store())?.len(), 2);

    ws.run(&["reset"]).result?;
    assert!(JsonFileStore::open(ws.store())?.is_empty());
    Ok(())
}

#[test]
fn test_output_pane_is_not_storable() {
    let ws = Workspace::new();
    let output = ws.run(&["show", "output"]);
    assert!(matches!(output.result, Err(CliError::NotStorable(EditorId::Output))));
}

#[test]
fn test_config_changes_storage_prefix() -> TestResult {
    let ws = Workspace::new();
    let config = ws.file("config.json", r#"{"storagePrefix": "custom."}"#);
    let xml = ws.file("doc.xml", "<doc/>");
    ws.run(&["--config", path_str(&config), "set", "xml", path_str(&xml)]).result?;

    let store = JsonFileStore::open(ws.store())?;
    assert_eq!(store.get("custom.xml")?.as_deref(), Some("<doc/>"));
    assert_eq!(store.get("xsltui.xml")?, None);
    Ok(())
}

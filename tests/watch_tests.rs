mod common;

use common::{IDENTITY_XSLT, TestResult, Workspace};
use std::fs;
use std::time::Duration;
use tokio::time::timeout;
use xsltui::watch::{WatchedFile, consume, spawn_poller};
use xsltui_core::{
    ChangeEvent, EditorId, KeyValueStore, MemoryStore, NativeBackend, Playground, PlaygroundConfig,
};

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_watched_file_reports_only_changes() -> TestResult {
    let ws = Workspace::new();
    let path = ws.file("a.xml", "<a/>");
    let mut file = WatchedFile::new(EditorId::Xml, &path);

    let first = file.poll().await?.expect("first read is a change");
    assert_eq!(first.editor, EditorId::Xml);
    assert_eq!(first.text, "<a/>");
    assert!(file.poll().await?.is_none());

    fs::write(&path, "<b/>")?;
    assert_eq!(file.poll().await?.map(|e| e.text).as_deref(), Some("<b/>"));
    Ok(())
}

#[tokio::test]
async fn test_poller_sends_initial_contents_and_edits() -> TestResult {
    let ws = Workspace::new();
    let xml = ws.file("a.xml", "<a/>");
    let xslt = ws.file("id.xsl", IDENTITY_XSLT);
    let (tx, rx) = async_channel::bounded(8);
    let poller = spawn_poller(
        vec![
            WatchedFile::new(EditorId::Xml, &xml),
            WatchedFile::new(EditorId::Xslt, &xslt),
        ],
        Duration::from_millis(10),
        tx,
    );

    let first = timeout(WAIT, rx.recv()).await??;
    let second = timeout(WAIT, rx.recv()).await??;
    assert_eq!((first.editor, second.editor), (EditorId::Xml, EditorId::Xslt));

    fs::write(&xml, "<changed/>")?;
    let edit = timeout(WAIT, rx.recv()).await??;
    assert_eq!(edit.editor, EditorId::Xml);
    assert_eq!(edit.text, "<changed/>");

    // The next change finds the channel closed and stops the poller.
    drop(rx);
    fs::write(&xslt, "<stop/>")?;
    timeout(WAIT, poller).await??;
    Ok(())
}

#[tokio::test]
async fn test_consumer_saves_and_prints_each_batch() -> TestResult {
    common::init_logger();
    let mut session = Playground::new(
        PlaygroundConfig::default(),
        NativeBackend::default(),
        MemoryStore::new(),
    )?;
    let (tx, rx) = async_channel::bounded(8);

    tx.send(ChangeEvent {
        editor: EditorId::Xslt,
        text: IDENTITY_XSLT.to_string(),
    })
    .await?;
    tx.send(ChangeEvent {
        editor: EditorId::Xml,
        text: "<a/>".to_string(),
    })
    .await?;
    drop(tx);

    let mut out = Vec::new();
    let mut err = Vec::new();
    let batches = consume(&mut session, rx, &mut out, &mut err).await?;

    // Both events were queued before the consumer started, so they print once.
    assert_eq!(batches, 1);
    assert_eq!(String::from_utf8(out)?.trim(), "<a/>");
    assert_eq!(String::from_utf8(err)?.trim(), "XML");
    assert_eq!(session.persistence().store().get("xsltui.xml")?.as_deref(), Some("<a/>"));
    Ok(())
}

#[tokio::test]
async fn test_consumer_keeps_going_after_errors() -> TestResult {
    let mut session = Playground::new(
        PlaygroundConfig::default(),
        NativeBackend::default(),
        MemoryStore::new(),
    )?;
    let (tx, rx) = async_channel::bounded(8);
    let mut out = Vec::new();
    let mut err = Vec::new();

    tx.send(ChangeEvent {
        editor: EditorId::Xml,
        text: "<broken".to_string(),
    })
    .await?;
    drop(tx);

    let batches = consume(&mut session, rx, &mut out, &mut err).await?;
    assert_eq!(batches, 1);
    assert!(String::from_utf8(err)?.starts_with("[xml] "));
    assert!(out.is_empty());
    Ok(())
}

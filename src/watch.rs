//! Re-running the playground whenever the watched files change.
//!
//! A poller task reads both files on a fixed interval and sends every change as a
//! [`ChangeEvent`] over a bounded channel. The consumer applies the events to the
//! session one at a time, so update cycles never overlap.

use crate::cli::print_cycle;
use crate::error::CliError;
use async_channel::{Receiver, Sender};
use log::{debug, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use xsltui_core::{ChangeEvent, EditorId, KeyValueStore, Playground, PlaygroundError, XmlEngine};

const CHANNEL_CAPACITY: usize = 8;

/// A file backing one pane, with the text seen on the last successful read.
#[derive(Debug)]
pub struct WatchedFile {
    editor: EditorId,
    path: PathBuf,
    last: Option<String>,
    failing: bool,
}

impl WatchedFile {
    pub fn new(editor: EditorId, path: impl Into<PathBuf>) -> Self {
        WatchedFile {
            editor,
            path: path.into(),
            last: None,
            failing: false,
        }
    }

    pub fn editor(&self) -> EditorId {
        self.editor
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file, returning its text only if it changed since the last read.
    pub async fn poll(&mut self) -> std::io::Result<Option<ChangeEvent>> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        if self.last.as_deref() == Some(text.as_str()) {
            return Ok(None);
        }
        self.last = Some(text.clone());
        Ok(Some(ChangeEvent {
            editor: self.editor,
            text,
        }))
    }
}

/// Spawns the poller. It stops once the receiving side of `tx` is closed.
pub fn spawn_poller(
    mut files: Vec<WatchedFile>,
    interval: Duration,
    tx: Sender<ChangeEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("[POLLER] Watching {} files every {:?}.", files.len(), interval);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            for file in files.iter_mut() {
                match file.poll().await {
                    Ok(Some(event)) => {
                        file.failing = false;
                        debug!("[POLLER] {} changed.", file.path.display());
                        if tx.send(event).await.is_err() {
                            warn!("[POLLER] Consumer closed, stopping poller.");
                            return;
                        }
                    }
                    Ok(None) => file.failing = false,
                    Err(e) => {
                        if !file.failing {
                            warn!("[POLLER] Could not read {}: {}", file.path.display(), e);
                        }
                        file.failing = true;
                    }
                }
            }
        }
    })
}

/// Applies events until the channel closes, printing one result per batch of
/// changes. Returns the number of batches.
///
/// Failed update cycles are printed and the loop keeps going; a failed save is
/// logged and the cycle still runs.
pub async fn consume<E: XmlEngine, S: KeyValueStore>(
    session: &mut Playground<E, S>,
    rx: Receiver<ChangeEvent>,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<usize, CliError> {
    info!("[CONSUMER] Started. Awaiting changes.");
    let mut batches = 0;
    while let Ok(event) = rx.recv().await {
        apply(session, event)?;
        while let Ok(event) = rx.try_recv() {
            apply(session, event)?;
        }
        batches += 1;
        match print_cycle(session, out, err) {
            Ok(()) | Err(CliError::UpdateFailed(_)) => {}
            Err(e) => return Err(e),
        }
        out.flush()?;
    }
    info!("[CONSUMER] Finished after {} updates.", batches);
    Ok(batches)
}

fn apply<E: XmlEngine, S: KeyValueStore>(
    session: &mut Playground<E, S>,
    event: ChangeEvent,
) -> Result<(), CliError> {
    info!("[CONSUMER] The {} pane changed.", event.editor);
    match session.set_text(event.editor, &event.text) {
        Ok(()) => Ok(()),
        Err(PlaygroundError::Storage(e)) => {
            warn!("[CONSUMER] The {} pane was not saved: {}", event.editor, e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Watches `xml` and `xslt` until the process is interrupted.
pub async fn watch<E: XmlEngine, S: KeyValueStore>(
    session: &mut Playground<E, S>,
    xml: &Path,
    xslt: &Path,
    interval: Duration,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), CliError> {
    let (tx, rx) = async_channel::bounded(CHANNEL_CAPACITY);
    let files = vec![
        WatchedFile::new(EditorId::Xml, xml),
        WatchedFile::new(EditorId::Xslt, xslt),
    ];
    let poller = spawn_poller(files, interval, tx);
    let result = consume(session, rx, out, err).await;
    poller.abort();
    result.map(|_| ())
}

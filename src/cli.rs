//! Command-line front end over a [`JsonFileStore`].

use crate::error::CliError;
use crate::store::{DEFAULT_STORE_PATH, JsonFileStore};
use crate::watch;
use clap::{ArgAction, Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use xsltui_core::{
    EditorId, KeyValueStore, NativeBackend, Persistence, Playground, PlaygroundConfig, XmlEngine,
};

#[derive(Parser, Debug)]
#[command(name = "xsltui", version, about = "Transform XML with XSLT and see the result")]
pub struct Cli {
    /// JSON file holding the stored pane contents.
    #[arg(long, global = true, default_value = DEFAULT_STORE_PATH)]
    pub store: PathBuf,

    /// JSON playground configuration.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More output per occurrence (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Runs one update cycle and prints the output.
    Run {
        /// Replaces the stored XML with this file first.
        #[arg(long)]
        xml: Option<PathBuf>,
        /// Replaces the stored stylesheet with this file first.
        #[arg(long)]
        xslt: Option<PathBuf>,
    },
    /// Re-runs the transform whenever either file changes.
    Watch {
        xml: PathBuf,
        xslt: PathBuf,
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
    /// Prints the stored text of a pane, or its default.
    Show { pane: EditorId },
    /// Stores the contents of FILE for a pane.
    Set { pane: EditorId, file: PathBuf },
    /// Forgets the stored text of one pane, or of both.
    Reset { pane: Option<EditorId> },
}

impl Cli {
    /// The `env_logger` filter used when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<PlaygroundConfig, CliError> {
    let Some(path) = path else {
        return Ok(PlaygroundConfig::default());
    };
    let text = fs::read_to_string(path)?;
    Ok(PlaygroundConfig::from_json(&text)?)
}

/// Runs `cli`, writing results to `out` and diagnostics to `err`.
pub fn execute(cli: Cli, out: &mut dyn Write, err: &mut dyn Write) -> Result<(), CliError> {
    let config = load_config(cli.config.as_deref())?;
    let store = JsonFileStore::open(&cli.store)?;

    match cli.command {
        Command::Run { xml, xslt } => {
            let mut session = Playground::new(config, NativeBackend::default(), store)?;
            for (editor, path) in [(EditorId::Xml, xml), (EditorId::Xslt, xslt)] {
                if let Some(path) = path {
                    let text = fs::read_to_string(&path)?;
                    session.set_text(editor, &text)?;
                }
            }
            print_cycle(&session, out, err)
        }
        Command::Watch {
            xml,
            xslt,
            interval_ms,
        } => {
            let mut session = Playground::new(config, NativeBackend::default(), store)?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(watch::watch(
                &mut session,
                &xml,
                &xslt,
                Duration::from_millis(interval_ms),
                out,
                err,
            ))
        }
        Command::Show { pane } => {
            storable(pane)?;
            let persistence = Persistence::new(config.storage_prefix, store);
            let text = persistence.load_or_default(pane)?;
            writeln!(out, "{}", text)?;
            Ok(())
        }
        Command::Set { pane, file } => {
            storable(pane)?;
            let text = fs::read_to_string(&file)?;
            let mut persistence = Persistence::new(config.storage_prefix, store);
            persistence.save(pane, &text)?;
            log::info!("Stored {} as the {} pane.", file.display(), pane);
            Ok(())
        }
        Command::Reset { pane } => {
            let panes = match pane {
                Some(pane) => {
                    storable(pane)?;
                    vec![pane]
                }
                None => EditorId::EDITABLE.to_vec(),
            };
            let mut persistence = Persistence::new(config.storage_prefix, store);
            for pane in panes {
                persistence.remove(pane)?;
                log::info!("Reset the {} pane.", pane);
            }
            Ok(())
        }
    }
}

fn storable(pane: EditorId) -> Result<(), CliError> {
    if pane.is_editable() {
        Ok(())
    } else {
        Err(CliError::NotStorable(pane))
    }
}

/// Prints the outcome of the last update: the label to `err` and the text to `out`,
/// or every error region to `err`.
pub fn print_cycle<E: XmlEngine, S: KeyValueStore>(
    session: &Playground<E, S>,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), CliError> {
    let state = session.state();
    if state.is_error() {
        for (pane, message) in session.errors().iter() {
            writeln!(err, "[{}] {}", pane, message)?;
        }
        return Err(CliError::UpdateFailed(state));
    }
    writeln!(err, "{}", session.output().label())?;
    writeln!(out, "{}", session.output().text())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["xsltui", "show", "xslt", "-vv", "--store", "s.json"]).unwrap();
        assert_eq!(cli.store, PathBuf::from("s.json"));
        assert_eq!(cli.log_filter(), "debug");
        assert!(matches!(cli.command, Command::Show { pane: EditorId::Xslt }));
    }

    #[test]
    fn test_rejects_unknown_pane() {
        assert!(Cli::try_parse_from(["xsltui", "show", "css"]).is_err());
    }

    #[test]
    fn test_watch_defaults() {
        let cli = Cli::try_parse_from(["xsltui", "watch", "a.xml", "b.xsl"]).unwrap();
        assert_eq!(cli.store, PathBuf::from(DEFAULT_STORE_PATH));
        assert_eq!(cli.log_filter(), "warn");
        let Command::Watch { interval_ms, .. } = cli.command else {
            panic!("expected watch");
        };
        assert_eq!(interval_ms, 500);
    }
}

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use xsltui::{Cli, CliError, execute};
use clap::Parser;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub const IDENTITY_XSLT: &str = r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
  <xsl:template match="@*|node()">
    <xsl:copy><xsl:apply-templates select="@*|node()"/></xsl:copy>
  </xsl:template>
</xsl:stylesheet>"#;

pub const TEXT_XSLT: &str = r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
  <xsl:output method="text"/>
  <xsl:template match="/">hello <xsl:value-of select="count(//item)"/></xsl:template>
</xsl:stylesheet>"#;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A scratch directory with a store path inside it.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        init_logger();
        Workspace {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn store(&self) -> PathBuf {
        self.dir.path().join("store.json")
    }

    pub fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("write fixture");
        path
    }

    /// Runs the command line with `args` against this workspace's store.
    pub fn run(&self, args: &[&str]) -> Output {
        let store = self.store();
        let mut argv = vec!["xsltui", "--store", path_str(&store)];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).expect("valid arguments");
        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = execute(cli, &mut out, &mut err);
        Output {
            result,
            stdout: String::from_utf8_lossy(&out).into_owned(),
            stderr: String::from_utf8_lossy(&err).into_owned(),
        }
    }
}

pub struct Output {
    pub result: Result<(), CliError>,
    pub stdout: String,
    pub stderr: String,
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

//! Command adapters for the external analysis collaborators.
//!
//! The parser and the cross-reference resolver are operator-supplied
//! executables configured in `config.yml`. Both speak JSON: the parser
//! reads one file's source on stdin and prints its symbol records; the
//! resolver gets the symbol coordinates as arguments and prints reference
//! hits. Adapter failures are logged and treated as "no output"; the run
//! continues with the affected symbols left as they were.

use doctree_prep::{RefHit, ReferenceResolver, SourceParser, SymbolRecord};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::warn;

/// Runs the configured parser command once per source file.
pub struct CommandParser {
    command: String,
}

impl CommandParser {
    pub fn new(command: String) -> Self {
        Self { command }
    }
}

impl SourceParser for CommandParser {
    fn functions_and_classes(&self, source: &str) -> Vec<SymbolRecord> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn();
        let mut child = match child {
            Ok(child) => child,
            Err(err) => {
                warn!(command = %self.command, error = %err, "cannot spawn parser command");
                return Vec::new();
            }
        };
        if let Some(stdin) = child.stdin.as_mut() {
            if let Err(err) = stdin.write_all(source.as_bytes()) {
                warn!(error = %err, "cannot write source to parser stdin");
                return Vec::new();
            }
        }
        let output = match child.wait_with_output() {
            Ok(output) => output,
            Err(err) => {
                warn!(error = %err, "parser command did not finish");
                return Vec::new();
            }
        };
        if !output.status.success() {
            warn!(command = %self.command, status = ?output.status, "parser command failed");
            return Vec::new();
        }
        match serde_json::from_slice(&output.stdout) {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "cannot decode parser output");
                Vec::new()
            }
        }
    }
}

/// Runs the configured resolver command once per symbol.
pub struct CommandResolver {
    command: String,
}

impl CommandResolver {
    pub fn new(command: String) -> Self {
        Self { command }
    }
}

impl ReferenceResolver for CommandResolver {
    fn references(
        &self,
        repo_root: &Path,
        symbol_name: &str,
        file_path: &str,
        line: i64,
        column: i64,
        in_file_only: bool,
    ) -> Result<Vec<RefHit>, String> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .arg("resolver")
            .arg(repo_root)
            .arg(symbol_name)
            .arg(file_path)
            .arg(line.to_string())
            .arg(column.to_string())
            .arg(in_file_only.to_string())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|err| format!("cannot run resolver command: {err}"))?;
        if !output.status.success() {
            return Err(format!("resolver command failed with {:?}", output.status));
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|err| format!("cannot decode resolver output: {err}"))
    }
}

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::command::{Command, CommandParseError, WorkerId};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Failed to read script {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid command at line {line} ({text:?}): {reason}")]
    Parse {
        line: usize,
        text: String,
        #[source]
        reason: CommandParseError,
    },
}

/// An ordered, immutable sequence of commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    commands: Vec<Command>,
}

impl Script {
    /// Parse script text. Blank lines and lines starting with `#` are skipped.
    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        Self::from_reader(text.as_bytes())
    }

    /// Parse a script from any line source.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, ScriptError> {
        let mut commands = Vec::new();

        for (index, bytes) in reader.split(b'\n').enumerate() {
            let bytes = bytes.map_err(|source| ScriptError::Io {
                path: PathBuf::from("<reader>"),
                source,
            })?;
            let bytes = bytes.strip_suffix(b"\r").unwrap_or(&bytes);
            let line = std::str::from_utf8(bytes).map_err(|_| ScriptError::Parse {
                line: index + 1,
                text: String::from_utf8_lossy(bytes).into_owned(),
                reason: CommandParseError::InvalidUtf8,
            })?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let command = line.parse::<Command>().map_err(|reason| ScriptError::Parse {
                line: index + 1,
                text: line.to_string(),
                reason,
            })?;
            commands.push(command);
        }

        Ok(Self { commands })
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Distinct worker ids referenced by the script, ascending.
    pub fn worker_ids(&self) -> BTreeSet<WorkerId> {
        self.commands.iter().filter_map(Command::worker).collect()
    }
}

impl From<Vec<Command>> for Script {
    fn from(commands: Vec<Command>) -> Self {
        Self { commands }
    }
}

/// Load a script file.
pub fn load_script(path: &Path) -> Result<Script, ScriptError> {
    let file = File::open(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Script::from_reader(BufReader::new(file)).map_err(|e| match e {
        ScriptError::Io { source, .. } => ScriptError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SCRIPT: &str = r#"# two workers contend on one row
1:RC
2:RC

1:U:update t set x = x + 1 where id = 1
2:Q:select x from t where id = 1
S:1
1:C
2:C
"#;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let script = Script::parse(SCRIPT).unwrap();
        assert_eq!(script.len(), 7);
        let kinds: Vec<_> = script.commands().iter().map(Command::kind).collect();
        assert_eq!(
            kinds,
            vec![
                CommandKind::ReadCommitted,
                CommandKind::ReadCommitted,
                CommandKind::Update,
                CommandKind::Query,
                CommandKind::Sleep,
                CommandKind::Commit,
                CommandKind::Commit,
            ]
        );
    }

    #[test]
    fn test_whitespace_only_line_is_blank() {
        let script = Script::parse("  \t\n1:C\n\r\n").unwrap();
        assert_eq!(script.commands(), &[Command::Commit { worker: 1 }]);
    }

    #[test]
    fn test_invalid_utf8_names_line() {
        let err = Script::from_reader(&b"1:C\n1:Q:select '\xff'\n"[..]).unwrap_err();
        match err {
            ScriptError::Parse { line, reason, .. } => {
                assert_eq!(line, 2);
                assert_eq!(reason, CommandParseError::InvalidUtf8);
            }
            other => panic!("expected parse error, got {other}"),
        }
    }

    #[test]
    fn test_crlf_line_endings() {
        let script = Script::parse("1:RC\r\n1:Q:select 1\r\n1:C\r\n").unwrap();
        assert_eq!(script.len(), 3);
        assert_eq!(script.commands()[1].sql(), Some("select 1"));
    }

    #[test]
    fn test_worker_ids_exclude_sleep() {
        let script = Script::parse("3:C\nS:1\n1:C\n3:R\n").unwrap();
        let ids: Vec<_> = script.worker_ids().into_iter().collect();
        assert_eq!(ids, vec![1, 3]);

        let sleep_only = Script::parse("S:2").unwrap();
        assert!(sleep_only.worker_ids().is_empty());
    }

    #[test]
    fn test_parse_error_names_line() {
        let err = Script::parse("# header\n1:C\n\n1:Z\n2:C\n").unwrap_err();
        match err {
            ScriptError::Parse { line, text, reason } => {
                assert_eq!(line, 4);
                assert_eq!(text, "1:Z");
                assert!(matches!(reason, CommandParseError::UnknownKind(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_is_deterministic() {
        let first = Script::parse(SCRIPT).unwrap();
        let second = Script::parse(SCRIPT).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_load_script_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1:SR\n1:Q:select 1\n1:C\n1:E").unwrap();

        let script = load_script(file.path()).unwrap();
        assert_eq!(script.len(), 4);
        assert_eq!(script.commands()[1].sql(), Some("select 1"));
    }

    #[test]
    fn test_load_script_missing_file() {
        let err = load_script(Path::new("/nonexistent/lock.script")).unwrap_err();
        assert!(matches!(err, ScriptError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/lock.script"));
    }
}

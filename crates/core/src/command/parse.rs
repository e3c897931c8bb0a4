//! Line grammar for script commands.
//!
//! ```text
//! <id>:SR | <id>:RR | <id>:RC     isolation level
//! <id>:Q:<sql> | <id>:U:<sql>     query / update, sql absorbs the rest of the line
//! <id>:C | <id>:R | <id>:E        commit / rollback / exit
//! S:<seconds>                     global sleep
//! ```
//!
//! The canonical names printed in the echo form (`QUERY`, `SLEEP`, ...) are
//! accepted wherever a short token is.

use std::str::FromStr;

use thiserror::Error;

use super::types::{Command, CommandKind, IsolationLevel, WorkerId};

/// Why a single line failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    #[error("missing command token")]
    MissingKind,

    #[error("invalid worker id {0:?}")]
    InvalidWorkerId(String),

    #[error("invalid sleep seconds {0:?}")]
    InvalidSeconds(String),

    #[error("unknown command token {0:?}")]
    UnknownKind(String),

    #[error("{0} requires a SQL payload")]
    MissingSql(CommandKind),

    #[error("unexpected trailing field after {0}")]
    TrailingField(CommandKind),
}

impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut fields = line.splitn(3, ':');
        // splitn always yields at least one field
        let head = fields.next().unwrap_or_default();

        if CommandKind::from_token(head) == Some(CommandKind::Sleep) {
            let seconds = fields.next().ok_or(CommandParseError::MissingKind)?;
            if fields.next().is_some() {
                return Err(CommandParseError::TrailingField(CommandKind::Sleep));
            }
            let seconds = seconds
                .parse::<u64>()
                .map_err(|_| CommandParseError::InvalidSeconds(seconds.to_string()))?;
            return Ok(Command::Sleep { seconds });
        }

        let worker = head
            .parse::<WorkerId>()
            .map_err(|_| CommandParseError::InvalidWorkerId(head.to_string()))?;
        let token = fields.next().ok_or(CommandParseError::MissingKind)?;
        let kind = CommandKind::from_token(token)
            .filter(|kind| *kind != CommandKind::Sleep)
            .ok_or_else(|| CommandParseError::UnknownKind(token.to_string()))?;
        let payload = fields.next();

        if kind.has_sql() {
            let sql = payload
                .filter(|sql| !sql.trim().is_empty())
                .ok_or(CommandParseError::MissingSql(kind))?
                .to_string();
            return Ok(match kind {
                CommandKind::Query => Command::Query { worker, sql },
                _ => Command::Update { worker, sql },
            });
        }

        if payload.is_some() {
            return Err(CommandParseError::TrailingField(kind));
        }

        Ok(match kind {
            CommandKind::Serializable => Command::SetIsolation {
                worker,
                level: IsolationLevel::Serializable,
            },
            CommandKind::RepeatableRead => Command::SetIsolation {
                worker,
                level: IsolationLevel::RepeatableRead,
            },
            CommandKind::ReadCommitted => Command::SetIsolation {
                worker,
                level: IsolationLevel::ReadCommitted,
            },
            CommandKind::Commit => Command::Commit { worker },
            CommandKind::Rollback => Command::Rollback { worker },
            _ => Command::Exit { worker },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Command, CommandParseError> {
        line.parse()
    }

    #[test]
    fn test_parse_isolation_levels() {
        assert_eq!(
            parse("1:SR").unwrap(),
            Command::SetIsolation {
                worker: 1,
                level: IsolationLevel::Serializable
            }
        );
        assert_eq!(
            parse("2:RR").unwrap(),
            Command::SetIsolation {
                worker: 2,
                level: IsolationLevel::RepeatableRead
            }
        );
        assert_eq!(
            parse("3:RC").unwrap(),
            Command::SetIsolation {
                worker: 3,
                level: IsolationLevel::ReadCommitted
            }
        );
    }

    #[test]
    fn test_parse_transaction_control() {
        assert_eq!(parse("1:C").unwrap(), Command::Commit { worker: 1 });
        assert_eq!(parse("1:R").unwrap(), Command::Rollback { worker: 1 });
        assert_eq!(parse("4:E").unwrap(), Command::Exit { worker: 4 });
    }

    #[test]
    fn test_sql_payload_keeps_colons() {
        let cmd = parse("1:Q:select '10:30' as t, x::text from t").unwrap();
        assert_eq!(cmd.sql(), Some("select '10:30' as t, x::text from t"));

        let cmd = parse("5:U:update t set x=1 where id=999").unwrap();
        assert_eq!(cmd.kind(), CommandKind::Update);
        assert_eq!(cmd.worker(), Some(5));
    }

    #[test]
    fn test_parse_sleep() {
        assert_eq!(parse("S:2").unwrap(), Command::Sleep { seconds: 2 });
        assert_eq!(parse("SLEEP:0").unwrap(), Command::Sleep { seconds: 0 });
    }

    #[test]
    fn test_malformed_lines() {
        assert_eq!(parse("1"), Err(CommandParseError::MissingKind));
        assert_eq!(parse("S"), Err(CommandParseError::MissingKind));
        assert!(matches!(
            parse("x:C"),
            Err(CommandParseError::InvalidWorkerId(_))
        ));
        assert!(matches!(
            parse("-1:C"),
            Err(CommandParseError::InvalidWorkerId(_))
        ));
        assert!(matches!(
            parse("S:soon"),
            Err(CommandParseError::InvalidSeconds(_))
        ));
        assert!(matches!(parse("1:X"), Err(CommandParseError::UnknownKind(_))));
        assert!(matches!(parse("1:S"), Err(CommandParseError::UnknownKind(_))));
        assert_eq!(
            parse("1:Q"),
            Err(CommandParseError::MissingSql(CommandKind::Query))
        );
        assert_eq!(
            parse("1:U:   "),
            Err(CommandParseError::MissingSql(CommandKind::Update))
        );
        assert_eq!(
            parse("1:C:now"),
            Err(CommandParseError::TrailingField(CommandKind::Commit))
        );
        assert_eq!(
            parse("S:1:2"),
            Err(CommandParseError::TrailingField(CommandKind::Sleep))
        );
    }

    #[test]
    fn test_echo_form_reparses() {
        let lines = [
            "1:SR",
            "2:RR",
            "3:RC",
            "1:Q:select a, b from t where c = 'x:y'",
            "2:U:delete from t",
            "1:C",
            "1:R",
            "9:E",
            "S:4",
        ];
        for line in lines {
            let cmd = parse(line).unwrap();
            let echoed = cmd.to_string();
            assert_eq!(parse(&echoed).unwrap(), cmd, "echo {echoed:?}");
        }
    }
}

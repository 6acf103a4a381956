//! Trigger management errors

use thiserror::Error;
use verlock_core::VerlockError;

/// Errors raised while managing version triggers
#[derive(Debug, Error)]
pub enum TriggerError {
    /// No dialect is registered for the connection's engine
    #[error("{engine} is not supported by version triggers")]
    UnsupportedEngine { engine: String },

    /// An alias was targeted that is not part of the connection set
    #[error("unknown connection alias '{alias}'")]
    UnknownConnection { alias: String },

    /// The database rejected a rendered statement
    #[error("error executing:\n{statement}\n{source}")]
    Execution {
        statement: String,
        #[source]
        source: VerlockError,
    },

    /// A failure scoped to one connection alias
    #[error("connection '{alias}': {source}")]
    Connection {
        alias: String,
        #[source]
        source: Box<TriggerError>,
    },

    #[error(transparent)]
    Core(#[from] VerlockError),
}

impl TriggerError {
    /// The failing statement, if this error came from executing one
    pub fn statement(&self) -> Option<&str> {
        match self {
            TriggerError::Execution { statement, .. } => Some(statement),
            TriggerError::Connection { source, .. } => source.statement(),
            _ => None,
        }
    }

    /// The connection alias this error is scoped to, if any
    pub fn alias(&self) -> Option<&str> {
        match self {
            TriggerError::Connection { alias, .. } | TriggerError::UnknownConnection { alias } => {
                Some(alias)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_engine_names_the_engine() {
        let err = TriggerError::UnsupportedEngine {
            engine: "oracle".into(),
        };
        assert_eq!(err.to_string(), "oracle is not supported by version triggers");
    }

    #[test]
    fn test_execution_error_carries_statement() {
        let err = TriggerError::Execution {
            statement: "DROP TRIGGER IF EXISTS x".into(),
            source: VerlockError::Query("permission denied".into()),
        };
        assert_eq!(err.statement(), Some("DROP TRIGGER IF EXISTS x"));
        assert_eq!(
            err.to_string(),
            "error executing:\nDROP TRIGGER IF EXISTS x\nQuery error: permission denied"
        );

        let wrapped = TriggerError::Connection {
            alias: "orders".into(),
            source: Box::new(err),
        };
        assert_eq!(wrapped.alias(), Some("orders"));
        assert_eq!(wrapped.statement(), Some("DROP TRIGGER IF EXISTS x"));
    }
}

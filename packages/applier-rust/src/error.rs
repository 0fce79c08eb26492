use rpl_apply_core::BuildError;

/// Errors raised while applying statements to the destination.
///
/// The executor resolves these to a boolean outcome after logging them and
/// recording them to the task-status sink; only DDL status queries return
/// them to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("failed to acquire connection: {0:#}")]
    Acquire(#[source] anyhow::Error),
    #[error("failed to set autocommit: {0:#}")]
    AutoCommit(#[source] anyhow::Error),
    #[error("failed to execute `{sql}`: {source:#}")]
    Execute {
        sql: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to commit: {0:#}")]
    Commit(#[source] anyhow::Error),
    #[error("failed to roll back: {0:#}")]
    Rollback(#[source] anyhow::Error),
    #[error("failed to query DDL state for token {token}: {source:#}")]
    StatusQuery {
        token: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to build statements: {0}")]
    Build(#[from] BuildError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_error_names_statement_and_cause() {
        let err = ApplyError::Execute {
            sql: "DELETE FROM t".to_string(),
            source: anyhow::anyhow!("lock wait timeout"),
        };
        assert_eq!(
            err.to_string(),
            "failed to execute `DELETE FROM t`: lock wait timeout"
        );
    }

    #[test]
    fn build_error_converts() {
        let err: ApplyError = BuildError::NoRows {
            table: "t".to_string(),
        }
        .into();
        assert!(matches!(err, ApplyError::Build(_)));
    }
}

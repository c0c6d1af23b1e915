use thiserror::Error;

/// Closed error taxonomy shared by the store and repository layers.
///
/// Raw DuckDB errors are translated into these variants at the data-access
/// boundary so callers never match on driver error strings.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("{entity} already exists")]
    AlreadyExists { entity: &'static str },

    #[error("referenced {entity} does not exist")]
    MissingReference { entity: &'static str },

    #[error("cannot {action} a {entity} with status '{from}'")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        action: &'static str,
    },

    #[error("schema error: {0}")]
    Schema(String),

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn invalid_transition(entity: &'static str, from: &str, action: &'static str) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.to_string(),
            action,
        }
    }
}

/// Map a DuckDB driver error message onto the closed taxonomy.
///
/// DuckDB surfaces constraint failures as text, so classification is by
/// message inspection. Anything unrecognised stays a generic `Database`.
pub fn classify_db_error(message: &str) -> StoreError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("duplicate key") || lower.contains("unique constraint") {
        StoreError::AlreadyExists { entity: "record" }
    } else if lower.contains("foreign key") {
        StoreError::MissingReference { entity: "record" }
    } else if lower.contains("does not exist") || lower.contains("not found in from clause") {
        StoreError::Schema(message.to_string())
    } else {
        StoreError::Database(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_duplicate_key() {
        let err = classify_db_error("Constraint Error: Duplicate key \"id: c_1\" violates unique constraint");
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[test]
    fn classifies_foreign_key() {
        let err = classify_db_error("Constraint Error: Violates foreign key constraint");
        assert!(matches!(err, StoreError::MissingReference { .. }));
    }

    #[test]
    fn classifies_missing_table_as_schema() {
        let err = classify_db_error("Catalog Error: Table with name contacts2 does not exist");
        assert!(matches!(err, StoreError::Schema(_)));
    }

    #[test]
    fn unknown_errors_stay_database() {
        let err = classify_db_error("IO Error: disk full");
        assert!(matches!(err, StoreError::Database(_)));
    }
}

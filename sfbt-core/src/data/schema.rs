use polars::prelude::*;

/// Columns the optimizer reads from the signal dataset.
pub const REQUIRED_COLUMNS: &[&str] = &["date", "barrid", "alpha", "predicted_beta"];

/// Expected shape of the signal dataset.
pub struct SignalSchema;

impl SignalSchema {
    /// Check that every required column exists and `date` is a Date or Datetime.
    pub fn validate(df: &DataFrame) -> Result<(), SchemaError> {
        let actual = df.schema();

        for name in REQUIRED_COLUMNS {
            if !actual.contains(name) {
                return Err(SchemaError::MissingColumn(name.to_string()));
            }
        }

        let date_dtype = actual
            .get("date")
            .ok_or_else(|| SchemaError::MissingColumn("date".to_string()))?;
        match date_dtype {
            DataType::Date | DataType::Datetime(_, _) => Ok(()),
            other => Err(SchemaError::TypeMismatch {
                column: "date".to_string(),
                expected: "Date or Datetime".to_string(),
                actual: other.clone(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Type mismatch in column {column}: expected {expected}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: DataType,
    },
}

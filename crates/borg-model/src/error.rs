use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid info document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid timestamp in `{field}`: {value:?}")]
    Timestamp {
        field: String,
        value: String,
        #[source]
        source: time::error::Parse,
    },
}

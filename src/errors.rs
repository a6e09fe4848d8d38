use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("BSON: {0}")]
    Bson(String),

    #[error("Invalid object id: {0}")]
    InvalidObjectId(String),

    #[error("Invalid UUID: {0}")]
    InvalidUuid(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Missing environment variable: {0}")]
    MissingEnv(String),
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Model(#[from] akline_models::ModelError),
    #[error("unknown resolution for historical table: {0:?}")]
    UnknownTable(akline_models::Resolution),
}

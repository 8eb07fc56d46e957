use thiserror::Error;

#[derive(Error, Debug)]
pub enum TripdataError {
    #[error("unknown trip category: {0}")]
    UnknownCategory(String),

    #[error("unknown destination: {0}")]
    UnknownDestination(String),

    #[error("unknown write disposition: {0}")]
    UnknownWriteDisposition(String),

    #[error("unknown table engine: {0}")]
    UnknownTableEngine(String),
}

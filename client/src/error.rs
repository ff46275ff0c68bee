use shared::{ClientId, MapError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no player with id {0}")]
    UnknownEntity(ClientId),

    #[error("network error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Map(#[from] MapError),
}

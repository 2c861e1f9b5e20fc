use thiserror::Error;

use crate::GatewayError;

mod date;
mod documents;
mod events;
mod feeds;
mod news;

pub use date::*;
pub use documents::*;
pub use events::*;
pub use feeds::*;
pub use news::*;

#[derive(Debug, Error)]
pub enum ContentError {
    /// The capability check failed, no backend call was made
    #[error("Permission denied")]
    PermissionDenied,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Event end date is before its start date")]
    EndBeforeStart,
    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

use super::SeriesId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// The rendering surface could not be created (e.g. container not mounted).
    #[error("failed to create surface in container '{container}': {reason}")]
    Init { container: String, reason: String },
    #[error("surface has not been initialized")]
    NotInitialized,
    #[error("surface has been disposed")]
    Disposed,
    #[error("surface reference is no longer alive")]
    Gone,
    #[error("unknown series {0:?}")]
    UnknownSeries(SeriesId),
}

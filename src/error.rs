use std::io;
use std::path::PathBuf;

/// Fatal failures of a dataset load. Individual bad rows never end up here,
/// they are skipped and counted in [`LoadStats`](crate::data::model::LoadStats).
#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("cannot open dataset {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read the dataset header")]
    Header(#[source] csv::Error),

    #[error("dataset header has no '{0}' column")]
    MissingColumn(&'static str),
}

/// Raised when a series that must have at least one point has none.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no rows match pathology filter {pathology}")]
pub struct EmptySeriesError {
    pub pathology: String,
}

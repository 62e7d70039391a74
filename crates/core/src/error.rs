use thiserror::Error;

use crate::config::ConfigError;
use crate::model::SessionSummaryError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
}

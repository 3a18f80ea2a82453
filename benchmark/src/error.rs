use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("creating latency histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),
    #[error("installing ctrl-c handler: {0}")]
    CtrlC(#[from] ctrlc::Error),
    #[error("{path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Results(#[from] result_matrix::Error),
}

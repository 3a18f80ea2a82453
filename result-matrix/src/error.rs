#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("matrix display requires single-parameter results, found parameters {keys:?}")]
    UnsupportedShape { keys: Vec<String> },
    #[error("benchmark {benchmark:?} has no parameter {param:?}")]
    MissingParameter { benchmark: String, param: String },
    #[error("malformed results: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("unknown memoization strategy {0:?}, expected one of: double-checked, double-checked-nulled, atomic-swap, once-cell")]
    UnknownStrategy(String),
}

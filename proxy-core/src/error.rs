use thiserror::Error;

/// Errors that can occur while loading configuration or constructing the
/// policy engines. Evaluation functions (`AclList::evaluate`,
/// `UpstreamRouter::lookup`, ...) never return this type: per the error
/// taxonomy they report an explicit verdict (`Access`, `None`) instead.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("syntax error on line {line}: {text}")]
    Syntax { line: u32, text: String },

    #[error("value out of range: {0}")]
    OutOfRange(String),

    #[error("directive requires the \"{0}\" feature, which is not compiled in")]
    FeatureDisabled(&'static str),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ProxyError>;

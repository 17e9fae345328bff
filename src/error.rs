use nestkv_types::ParseSegmentError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The operation name is not in the forwarding tables.
    #[error("unsupported operation `{0}`")]
    UnsupportedOperation(String),

    /// A key was derived with something that cannot name a child key.
    #[error("invalid key operation: {0}")]
    InvalidKeyOperation(String),

    #[error("invalid segment")]
    Segment(#[from] ParseSegmentError),

    #[error("unknown scheme {0}")]
    UnknownScheme(String),

    #[error("mutex lock error {0}")]
    MutexLock(String),

    /// The key holds a value of the wrong kind for the operation.
    #[error("operation `{0}` against a key holding the wrong kind of value")]
    WrongType(String),

    #[error("value is not an integer or out of range")]
    NotInteger,

    #[error("value is not a valid float")]
    NotFloat,

    #[error("wrong number of arguments for `{0}`")]
    Arity(String),

    #[error("{0}")]
    Other(String),

    /// An error raised by an external store client, passed through unchanged.
    #[error(transparent)]
    Client(#[from] Box<dyn std::error::Error + Send + Sync>),
}

use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad section reference, empty filter, etc.).
    ConfigValidation(String),
    /// A referenced source name does not exist.
    UnknownSource(String),
    /// The designated column is absent from a table's schema.
    MissingField {
        source: String,
        field: String,
        available: Vec<String>,
    },
    /// IO error (CSV decode, file read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownSource(name) => write!(f, "unknown source: {name}"),
            Self::MissingField {
                source,
                field,
                available,
            } => {
                write!(
                    f,
                    "source '{source}': column '{field}' not found (available: {})",
                    available.join(", ")
                )
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

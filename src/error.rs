use thiserror::Error;

use crate::dns::RecordType;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthGraphError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Input parse error: {0}")]
    InputParse(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid trust anchor: {0}")]
    InvalidTrustAnchor(String),

    #[error("Zone not present in analysis: {0}")]
    UnknownZone(String),

    #[error("Empty DS group for {name}")]
    EmptyDsGroup { name: String },

    #[error(
        "DS group for {name} mixes algorithm/key tag ({expected_algorithm}/{expected_key_tag} vs {algorithm}/{key_tag})"
    )]
    InconsistentDsGroup {
        name: String,
        expected_algorithm: u8,
        expected_key_tag: u16,
        algorithm: u8,
        key_tag: u16,
    },

    #[error("DS group for {name} has record type {rdtype}, expected DS or DLV")]
    InvalidDsType { name: String, rdtype: RecordType },
}

impl From<std::io::Error> for AuthGraphError {
    fn from(err: std::io::Error) -> Self {
        AuthGraphError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AuthGraphError {
    fn from(err: serde_json::Error) -> Self {
        AuthGraphError::InputParse(err.to_string())
    }
}

impl From<toml::de::Error> for AuthGraphError {
    fn from(err: toml::de::Error) -> Self {
        AuthGraphError::ConfigParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AuthGraphError>;

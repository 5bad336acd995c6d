//! Error types for mmdbgen.

use ipnet::Ipv4Net;
use thiserror::Error;

/// Error type for mmdbgen operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A prefix push ran into an already-terminated branch of the
    /// search tree, or tried to terminate a branch that already has a
    /// subtree below it.
    #[error("conflicting prefix: {subnet} overlaps an existing entry")]
    ConflictingPrefix { subnet: Ipv4Net },

    /// Record size other than 24, 28 or 32 bits.
    #[error("unsupported record size: {0} (must be 24, 28 or 32)")]
    UnsupportedRecordSize(u16),

    /// The search tree outgrew what the record size can address.
    #[error("record size {record_size} insufficient for {node_count} nodes")]
    RecordSizeTooSmall { record_size: u16, node_count: u32 },

    /// A value exceeded a hard limit of the MMDB encoding.
    #[error("encoding limit exceeded: {0}")]
    EncodingLimit(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid or non-IPv4 CIDR in the blocks table
    #[error("invalid IPv4 CIDR: {0}")]
    InvalidCidr(String),

    /// A CSV row that does not have the expected shape
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// A geoname id referenced by the blocks table is missing from the
    /// locations table.
    #[error("unknown geoname id: {0}")]
    UnknownLocation(u32),
}

/// Result type alias for mmdbgen operations.
pub type Result<T> = std::result::Result<T, Error>;

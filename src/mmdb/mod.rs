//! MaxMind DB (MMDB) binary output.
//!
//! The writer holds the whole database in memory (search tree + data
//! section) and serializes it in one pass.
//!
//! # File Structure
//!
//! ```text
//! +------------------+
//! |   SEARCH TREE    |  node_count * (2 * record_size / 8) bytes
//! +------------------+
//! |    SEPARATOR     |  16 zero bytes
//! +------------------+
//! |   DATA SECTION   |  variable, interned MMDB values
//! +------------------+
//! | METADATA MARKER  |  "\xAB\xCD\xEF" + "MaxMind.com"
//! +------------------+
//! |   METADATA MAP   |  variable
//! +------------------+
//! ```
//!
//! Tree records are `record_size` bits per child. A child value below
//! `node_count` is a node index, `node_count` itself means "no data",
//! and anything larger points into the data section (biased by
//! `node_count + 16` for the separator).

mod data;
mod encode;
mod format;
mod tree;
mod writer;


pub use data::DataSection;
pub use format::{RecordSize, DATABASE_TYPE, METADATA_MARKER};
pub use tree::{Child, SearchTree};
pub use writer::MmdbWriter;

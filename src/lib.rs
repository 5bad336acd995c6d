//! mmdbgen - Generate MaxMind DB (MMDB) city databases from CSV
//! geolocation tables.
//!
//! This crate turns tabular IPv4 geolocation data into a binary MMDB
//! file that geo-IP lookup libraries can memory-map and query with a
//! trie walk.
//!
//! # Features
//!
//! - **Arbitrary ranges**: any `[begin, end]` IPv4 range is decomposed
//!   into the minimal set of aligned CIDR subnets
//! - **Deduplicated output**: strings, country/subdivision/city
//!   records and whole geo records are interned once and shared via
//!   MMDB pointers
//! - **Configurable record size**: 24, 28 or 32 bits per search-tree
//!   record side
//! - **GeoLite2-style CSV ingestion**: locations table plus IPv4
//!   blocks table, with per-block coordinate overrides
//!
//! # Quick Start
//!
//! ```no_run
//! use mmdbgen::{GeoName, MmdbWriter, RecordSize};
//!
//! let mut writer = MmdbWriter::new();
//!
//! let geo = GeoName::new("US", "United States", "California", "Mountain View")
//!     .with_location(37.386, -122.0838);
//! writer.push_range(
//!     "10.0.0.0".parse().unwrap(),
//!     "10.0.1.10".parse().unwrap(),
//!     &geo,
//! )?;
//!
//! writer.dump("GeoIP2-City.mmdb", RecordSize::Bits28)?;
//! # Ok::<(), mmdbgen::Error>(())
//! ```
//!
//! The builder is a plain value: independent builds can coexist, and
//! all memory (search tree, data section, intern table) is released
//! when it is dropped. Construction is single-threaded; wrap the
//! writer in external synchronization if it must cross threads.

mod cidr;
mod error;
mod geoname;

pub mod ingest;
pub mod mmdb;

// Re-export core types
pub use cidr::range_to_subnets;
pub use error::{Error, Result};
pub use geoname::GeoName;
pub use mmdb::{MmdbWriter, RecordSize};

// Re-export ingestion types
pub use ingest::{BlockSource, LocationTable};

//! MMDB file assembly.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use ipnet::Ipv4Net;

use super::data::DataSection;
use super::encode::{
    put_array_header, put_map_header, put_uint16, put_uint32, put_uint64, put_utf8,
};
use super::format::{
    RecordSize, BINARY_FORMAT_MAJOR_VERSION, BINARY_FORMAT_MINOR_VERSION, DATABASE_DESCRIPTION,
    DATABASE_TYPE, DATA_SECTION_SEPARATOR, METADATA_MARKER,
};
use super::tree::{Child, SearchTree};
use crate::cidr::range_to_subnets;
use crate::{Error, GeoName, Result};

/// Builds a GeoIP2-City MMDB file from IPv4 ranges.
///
/// Ranges are pushed one at a time; each range is decomposed into
/// aligned CIDR subnets, its geo record is interned into the data
/// section, and the search tree is extended to terminate at the
/// record. `dump` then serializes tree, data section and metadata in
/// the MMDB wire layout.
///
/// # Examples
/// ```no_run
/// use mmdbgen::{GeoName, MmdbWriter, RecordSize};
///
/// let mut writer = MmdbWriter::new();
/// let geo = GeoName::new("US", "United States", "California", "Mountain View")
///     .with_location(37.386, -122.0838);
/// writer.push_range(
///     "10.0.0.0".parse().unwrap(),
///     "10.0.0.255".parse().unwrap(),
///     &geo,
/// )?;
/// writer.dump("city.mmdb", RecordSize::Bits28)?;
/// # Ok::<(), mmdbgen::Error>(())
/// ```
pub struct MmdbWriter {
    tree: SearchTree,
    data: DataSection,
}

impl MmdbWriter {
    pub fn new() -> Self {
        Self {
            tree: SearchTree::new(),
            data: DataSection::new(),
        }
    }

    /// Attach `geo` to every address in the inclusive range
    /// `[begin, end]`.
    pub fn push_range(&mut self, begin: Ipv4Addr, end: Ipv4Addr, geo: &GeoName) -> Result<()> {
        for subnet in range_to_subnets(begin, end) {
            self.push(subnet, geo)?;
        }
        Ok(())
    }

    /// Attach `geo` to one aligned CIDR subnet.
    pub fn push(&mut self, subnet: Ipv4Net, geo: &GeoName) -> Result<()> {
        let offset = self.data.intern_geo(geo)?;
        self.tree.insert(subnet, offset)
    }

    /// Number of search-tree nodes built so far.
    pub fn node_count(&self) -> u32 {
        self.tree.node_count()
    }

    /// Bytes accumulated in the data section so far.
    pub fn data_section_len(&self) -> usize {
        self.data.len()
    }

    /// Serialize the database to `out`.
    pub fn write_to<W: Write>(&self, out: &mut W, record_size: RecordSize) -> Result<()> {
        let node_count = self.tree.node_count();
        record_size.check_node_count(node_count)?;

        for node in self.tree.nodes() {
            let a = self.record_value(node.children[0], node_count, record_size)?;
            let b = self.record_value(node.children[1], node_count, record_size)?;
            write_record(out, a, b, record_size)?;
        }
        out.write_all(&DATA_SECTION_SEPARATOR)?;
        out.write_all(self.data.bytes())?;
        out.write_all(METADATA_MARKER)?;
        out.write_all(&self.metadata_map(record_size)?)?;
        Ok(())
    }

    /// Serialize the database to a file, buffered, flushing before
    /// return.
    pub fn dump<P: AsRef<Path>>(&self, path: P, record_size: RecordSize) -> Result<()> {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        self.write_to(&mut out, record_size)?;
        out.flush()?;
        Ok(())
    }

    /// Translate a child slot into the 32-bit record-side value the
    /// MMDB convention expects: the node count for "no data", the node
    /// index for a subtree, and the data offset biased past the node
    /// count and separator for a terminal.
    fn record_value(&self, child: Child, node_count: u32, record_size: RecordSize) -> Result<u32> {
        match child {
            Child::Empty => Ok(node_count),
            Child::Node(id) => Ok(id),
            Child::Data(offset) => {
                let value = node_count
                    .checked_add(DATA_SECTION_SEPARATOR.len() as u32)
                    .and_then(|v| v.checked_add(offset));
                match value {
                    Some(v) if v <= record_size.max_record_value() => Ok(v),
                    _ => Err(Error::EncodingLimit(format!(
                        "data offset {offset} does not fit a {}-bit record",
                        record_size.bits()
                    ))),
                }
            }
        }
    }

    fn metadata_map(&self, record_size: RecordSize) -> Result<Vec<u8>> {
        let build_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let mut buf = Vec::new();
        put_map_header(&mut buf, 9)?;
        put_utf8(&mut buf, "binary_format_major_version");
        put_uint16(&mut buf, BINARY_FORMAT_MAJOR_VERSION);
        put_utf8(&mut buf, "binary_format_minor_version");
        put_uint16(&mut buf, BINARY_FORMAT_MINOR_VERSION);
        put_utf8(&mut buf, "build_epoch");
        put_uint64(&mut buf, build_epoch);
        put_utf8(&mut buf, "database_type");
        put_utf8(&mut buf, DATABASE_TYPE);
        put_utf8(&mut buf, "description");
        put_map_header(&mut buf, 1)?;
        put_utf8(&mut buf, "en");
        put_utf8(&mut buf, DATABASE_DESCRIPTION);
        put_utf8(&mut buf, "ip_version");
        put_uint16(&mut buf, 4);
        put_utf8(&mut buf, "languages");
        put_array_header(&mut buf, 1)?;
        put_utf8(&mut buf, "en");
        put_utf8(&mut buf, "node_count");
        put_uint32(&mut buf, self.tree.node_count());
        put_utf8(&mut buf, "record_size");
        put_uint16(&mut buf, record_size.bits());
        Ok(buf)
    }
}

impl Default for MmdbWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Pack the two record sides of one node.
fn write_record<W: Write>(out: &mut W, a: u32, b: u32, record_size: RecordSize) -> Result<()> {
    match record_size {
        RecordSize::Bits24 => {
            out.write_all(&[
                (a >> 16) as u8,
                (a >> 8) as u8,
                a as u8,
                (b >> 16) as u8,
                (b >> 8) as u8,
                b as u8,
            ])?;
        }
        // low 24 bits of each side on the outside, the two high
        // nibbles sharing the middle byte (side A in the upper half)
        RecordSize::Bits28 => {
            out.write_all(&[
                (a >> 16) as u8,
                (a >> 8) as u8,
                a as u8,
                (((a >> 24) & 0xF) as u8) << 4 | ((b >> 24) & 0xF) as u8,
                (b >> 16) as u8,
                (b >> 8) as u8,
                b as u8,
            ])?;
        }
        RecordSize::Bits32 => {
            out.write_all(&a.to_be_bytes())?;
            out.write_all(&b.to_be_bytes())?;
        }
    }
    Ok(())
}

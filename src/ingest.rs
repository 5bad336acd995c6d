//! CSV ingestion for GeoLite2-style location and block tables.
//!
//! Two inputs feed a build: a locations table keyed by geoname id and
//! an IPv4 blocks table mapping CIDR networks to geoname ids plus
//! per-block coordinates. Column positions follow the GeoLite2 CSV
//! exports.

use std::fs::File;
use std::net::Ipv4Addr;
use std::path::Path;

use ahash::AHashMap;
use ipnet::Ipv4Net;
use log::{info, warn};

use crate::{Error, GeoName, Result};

// Locations table columns (GeoLite2-City-Locations-<locale>.csv)
const LOC_GEONAME_ID: usize = 0;
const LOC_COUNTRY_ISO: usize = 4;
const LOC_COUNTRY_NAME: usize = 5;
const LOC_SUBDIVISION_NAME: usize = 7;
const LOC_CITY_NAME: usize = 10;

// Blocks table columns (GeoLite2-City-Blocks-IPv4.csv)
const BLK_NETWORK: usize = 0;
const BLK_GEONAME_ID: usize = 1;
const BLK_REGISTERED_COUNTRY_ID: usize = 2;
const BLK_LATITUDE: usize = 7;
const BLK_LONGITUDE: usize = 8;

fn field<'a>(row: &'a csv::StringRecord, index: usize) -> Result<&'a str> {
    row.get(index).ok_or_else(|| {
        Error::MalformedRecord(format!("missing column {index} in row {row:?}"))
    })
}

/// The locations reference table: geoname id to city-level record,
/// without coordinates (those come from the blocks table).
pub struct LocationTable {
    entries: AHashMap<u32, GeoName>,
}

impl LocationTable {
    /// Load a locations CSV. The header row is skipped.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut entries = AHashMap::with_capacity(10_000);

        for row in reader.records() {
            let row = row?;
            let id = field(&row, LOC_GEONAME_ID)?;
            let id: u32 = id.parse().map_err(|_| {
                Error::MalformedRecord(format!("geoname_id {id:?} is not numeric"))
            })?;
            entries.insert(
                id,
                GeoName::new(
                    field(&row, LOC_COUNTRY_ISO)?,
                    field(&row, LOC_COUNTRY_NAME)?,
                    field(&row, LOC_SUBDIVISION_NAME)?,
                    field(&row, LOC_CITY_NAME)?,
                ),
            );
        }

        info!("loaded {} locations", entries.len());
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&GeoName> {
        self.entries.get(&id)
    }
}

/// Streaming reader over an IPv4 blocks CSV.
pub struct BlockSource {
    rows: csv::StringRecordsIntoIter<File>,
}

impl BlockSource {
    /// Open a blocks CSV. The header row is skipped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = csv::Reader::from_path(path)?;
        Ok(Self {
            rows: reader.into_records(),
        })
    }

    /// Read the next block, resolved against the locations table.
    ///
    /// Returns the inclusive address range of the block's network and
    /// its geo record. The block's own latitude/longitude override the
    /// location's (NaN when absent or unparsable). Rows with an empty
    /// geoname id fall back to the registered-country id, and rows
    /// where neither resolves use the "Unknown" sentinel; an id that
    /// parses but is missing from the table is an error.
    pub fn next_range(
        &mut self,
        locations: &LocationTable,
    ) -> Result<Option<(Ipv4Addr, Ipv4Addr, GeoName)>> {
        let row = match self.rows.next() {
            None => return Ok(None),
            Some(row) => row?,
        };

        let network = field(&row, BLK_NETWORK)?;
        let subnet: Ipv4Net = network
            .parse()
            .map_err(|_| Error::InvalidCidr(network.to_string()))?;

        let mut geo = match self.resolve_id(&row)? {
            Some(id) => locations
                .get(id)
                .ok_or(Error::UnknownLocation(id))?
                .clone(),
            None => GeoName::unknown(),
        };
        geo.latitude = field(&row, BLK_LATITUDE)?.parse().unwrap_or(f32::NAN);
        geo.longitude = field(&row, BLK_LONGITUDE)?.parse().unwrap_or(f32::NAN);

        Ok(Some((subnet.network(), subnet.broadcast(), geo)))
    }

    fn resolve_id(&self, row: &csv::StringRecord) -> Result<Option<u32>> {
        let primary = field(row, BLK_GEONAME_ID)?;
        let chosen = if primary.is_empty() {
            field(row, BLK_REGISTERED_COUNTRY_ID)?
        } else {
            primary
        };
        match chosen.parse() {
            Ok(id) => Ok(Some(id)),
            Err(_) => {
                if !primary.is_empty() {
                    warn!("could not read geoname_id in row {row:?}");
                }
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    const LOCATIONS_CSV: &str = "\
geoname_id,locale_code,continent_code,continent_name,country_iso_code,country_name,subdivision_1_iso_code,subdivision_1_name,subdivision_2_iso_code,subdivision_2_name,city_name
5375480,en,NA,\"North America\",US,\"United States\",CA,California,,,\"Mountain View\"
2950159,en,EU,Europe,DE,Germany,BE,\"Land Berlin\",,,Berlin
6252001,en,NA,\"North America\",US,\"United States\",,,,,
";

    const BLOCKS_CSV: &str = "\
network,geoname_id,registered_country_geoname_id,represented_country_geoname_id,is_anonymous_proxy,is_satellite_provider,postal_code,latitude,longitude,accuracy_radius
10.0.0.0/24,5375480,6252001,,0,0,94043,37.3860,-122.0838,10
10.128.0.0/9,,6252001,,0,0,,,,
172.16.0.0/30,bogus,,,0,0,,52.5167,13.4,50
";

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_locations() {
        let file = write_temp(LOCATIONS_CSV);
        let locations = LocationTable::from_path(file.path()).unwrap();

        assert_eq!(locations.len(), 3);

        let mv = locations.get(5375480).unwrap();
        assert_eq!(mv.country_iso, "US");
        assert_eq!(mv.country_name, "United States");
        assert_eq!(mv.region_name, "California");
        assert_eq!(mv.city_name, "Mountain View");
        assert!(!mv.has_location());

        // country-level row with empty region and city
        let us = locations.get(6252001).unwrap();
        assert_eq!(us.region_name, "");
        assert_eq!(us.city_name, "");
    }

    #[test]
    fn test_blocks_resolve_and_override_coordinates() {
        let locations = LocationTable::from_path(write_temp(LOCATIONS_CSV).path()).unwrap();
        let mut blocks = BlockSource::open(write_temp(BLOCKS_CSV).path()).unwrap();

        let (begin, end, geo) = blocks.next_range(&locations).unwrap().unwrap();
        assert_eq!(begin, "10.0.0.0".parse::<Ipv4Addr>().unwrap());
        assert_eq!(end, "10.0.0.255".parse::<Ipv4Addr>().unwrap());
        assert_eq!(geo.city_name, "Mountain View");
        assert!((geo.latitude - 37.386).abs() < 1e-4);
        assert!((geo.longitude + 122.0838).abs() < 1e-4);
    }

    #[test]
    fn test_blocks_registered_country_fallback() {
        let locations = LocationTable::from_path(write_temp(LOCATIONS_CSV).path()).unwrap();
        let mut blocks = BlockSource::open(write_temp(BLOCKS_CSV).path()).unwrap();
        blocks.next_range(&locations).unwrap();

        let (begin, end, geo) = blocks.next_range(&locations).unwrap().unwrap();
        assert_eq!(begin, "10.128.0.0".parse::<Ipv4Addr>().unwrap());
        assert_eq!(end, "10.255.255.255".parse::<Ipv4Addr>().unwrap());
        // empty geoname_id resolved through registered_country
        assert_eq!(geo.country_iso, "US");
        assert_eq!(geo.city_name, "");
        assert!(!geo.has_location());
    }

    #[test]
    fn test_blocks_unresolvable_id_uses_sentinel() {
        let locations = LocationTable::from_path(write_temp(LOCATIONS_CSV).path()).unwrap();
        let mut blocks = BlockSource::open(write_temp(BLOCKS_CSV).path()).unwrap();
        blocks.next_range(&locations).unwrap();
        blocks.next_range(&locations).unwrap();

        let (_, _, geo) = blocks.next_range(&locations).unwrap().unwrap();
        assert_eq!(geo.country_iso, "--");
        assert_eq!(geo.country_name, "Unknown");
        // block coordinates still apply to the sentinel
        assert!(geo.has_location());

        assert!(blocks.next_range(&locations).unwrap().is_none());
    }

    #[test]
    fn test_blocks_unknown_id_is_an_error() {
        let locations = LocationTable::from_path(write_temp(LOCATIONS_CSV).path()).unwrap();
        let csv = "\
network,geoname_id,registered_country_geoname_id,represented_country_geoname_id,is_anonymous_proxy,is_satellite_provider,postal_code,latitude,longitude,accuracy_radius
10.0.0.0/24,99999,,,0,0,,,,
";
        let mut blocks = BlockSource::open(write_temp(csv).path()).unwrap();
        let err = blocks.next_range(&locations).unwrap_err();
        assert!(matches!(err, Error::UnknownLocation(99999)));
    }

    #[test]
    fn test_blocks_reject_non_ipv4_network() {
        let locations = LocationTable::from_path(write_temp(LOCATIONS_CSV).path()).unwrap();
        let csv = "\
network,geoname_id,registered_country_geoname_id,represented_country_geoname_id,is_anonymous_proxy,is_satellite_provider,postal_code,latitude,longitude,accuracy_radius
2001:db8::/32,5375480,,,0,0,,,,
";
        let mut blocks = BlockSource::open(write_temp(csv).path()).unwrap();
        let err = blocks.next_range(&locations).unwrap_err();
        assert!(matches!(err, Error::InvalidCidr(_)));
    }
}

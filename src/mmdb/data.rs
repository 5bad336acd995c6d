//! Content-addressed data section.
//!
//! Every value written to the output data section goes through this
//! interner: the first occurrence is encoded at the current tail of
//! the buffer and remembered under a typed key; later occurrences
//! reuse the recorded offset, either returned directly to the caller
//! or referenced through an intra-section pointer. Once written, bytes
//! and offsets never move.

use ahash::AHashMap;

use super::encode::{put_array_header, put_float32, put_map_header, put_pointer, put_utf8};
use crate::{Error, GeoName, Result};

/// Typed intern key. The discriminant keeps values from different
/// domains apart: the string "US" and the country record keyed on
/// "US" must not collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum InternKey {
    Str(String),
    /// Keyed by ISO code alone; the display name is functionally
    /// dependent on it within one build.
    Country(String),
    Subdivisions(String),
    City(String),
    Geo(GeoKey),
}

/// Structural identity of a geo record: all six fields, with NaN
/// coordinates collapsed to one canonical bit pattern so that every
/// "missing" coordinate compares equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GeoKey {
    country_iso: String,
    country_name: String,
    region_name: String,
    city_name: String,
    latitude: u32,
    longitude: u32,
}

impl GeoKey {
    fn from_geo(geo: &GeoName) -> Self {
        fn coord_bits(v: f32) -> u32 {
            if v.is_nan() {
                f32::NAN.to_bits()
            } else {
                v.to_bits()
            }
        }
        Self {
            country_iso: geo.country_iso.clone(),
            country_name: geo.country_name.clone(),
            region_name: geo.region_name.clone(),
            city_name: geo.city_name.clone(),
            latitude: coord_bits(geo.latitude),
            longitude: coord_bits(geo.longitude),
        }
    }
}

/// The growable data section plus its intern table.
pub struct DataSection {
    buf: Vec<u8>,
    offsets: AHashMap<InternKey, u32>,
}

impl DataSection {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(1024 * 1024),
            offsets: AHashMap::with_capacity(100_000),
        }
    }

    /// The encoded bytes written so far.
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Current section length in bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The tail of the buffer as a pointer-safe offset.
    fn tail_offset(&self) -> Result<u32> {
        u32::try_from(self.buf.len()).map_err(|_| {
            Error::EncodingLimit(format!(
                "data section length {} exceeds the pointer range",
                self.buf.len()
            ))
        })
    }

    /// Intern a utf-8 string, returning its byte offset.
    pub fn intern_string(&mut self, s: &str) -> Result<u32> {
        let key = InternKey::Str(s.to_string());
        if let Some(&offset) = self.offsets.get(&key) {
            return Ok(offset);
        }
        let offset = self.tail_offset()?;
        self.offsets.insert(key, offset);
        put_utf8(&mut self.buf, s);
        Ok(offset)
    }

    /// Intern a country record: `{iso_code: <inline>, names: {en: <ptr>}}`.
    pub fn intern_country(&mut self, iso: &str, name: &str) -> Result<u32> {
        let key = InternKey::Country(iso.to_string());
        if let Some(&offset) = self.offsets.get(&key) {
            return Ok(offset);
        }
        let names_key = self.intern_string("names")?;
        let iso_key = self.intern_string("iso_code")?;
        let name_value = self.intern_string(name)?;

        let offset = self.tail_offset()?;
        self.offsets.insert(key, offset);
        put_map_header(&mut self.buf, 2)?;
        put_pointer(&mut self.buf, iso_key);
        put_utf8(&mut self.buf, iso);
        put_pointer(&mut self.buf, names_key);
        put_map_header(&mut self.buf, 1)?;
        put_utf8(&mut self.buf, "en");
        put_pointer(&mut self.buf, name_value);
        Ok(offset)
    }

    /// Intern a subdivision list: `[{names: {en: <ptr>}}]`. MMDB city
    /// records carry subdivisions as an array even when there is only
    /// one.
    pub fn intern_region(&mut self, name: &str) -> Result<u32> {
        let key = InternKey::Subdivisions(name.to_string());
        if let Some(&offset) = self.offsets.get(&key) {
            return Ok(offset);
        }
        let names_key = self.intern_string("names")?;
        let name_value = self.intern_string(name)?;

        let offset = self.tail_offset()?;
        self.offsets.insert(key, offset);
        put_array_header(&mut self.buf, 1)?;
        put_map_header(&mut self.buf, 1)?;
        put_pointer(&mut self.buf, names_key);
        put_map_header(&mut self.buf, 1)?;
        put_utf8(&mut self.buf, "en");
        put_pointer(&mut self.buf, name_value);
        Ok(offset)
    }

    /// Intern a city record: `{names: {en: <ptr>}}`.
    pub fn intern_city(&mut self, name: &str) -> Result<u32> {
        let key = InternKey::City(name.to_string());
        if let Some(&offset) = self.offsets.get(&key) {
            return Ok(offset);
        }
        let names_key = self.intern_string("names")?;
        let name_value = self.intern_string(name)?;

        let offset = self.tail_offset()?;
        self.offsets.insert(key, offset);
        put_map_header(&mut self.buf, 1)?;
        put_pointer(&mut self.buf, names_key);
        put_map_header(&mut self.buf, 1)?;
        put_utf8(&mut self.buf, "en");
        put_pointer(&mut self.buf, name_value);
        Ok(offset)
    }

    /// Intern a complete geo record. Sub-records (country,
    /// subdivisions, city) are interned first and referenced through
    /// pointers; `location` is inlined, and omitted entirely when
    /// either coordinate is missing.
    pub fn intern_geo(&mut self, geo: &GeoName) -> Result<u32> {
        let key = InternKey::Geo(GeoKey::from_geo(geo));
        if let Some(&offset) = self.offsets.get(&key) {
            return Ok(offset);
        }
        let country_key = self.intern_string("country")?;
        let country = self.intern_country(&geo.country_iso, &geo.country_name)?;
        let region_key = self.intern_string("subdivisions")?;
        let region = self.intern_region(&geo.region_name)?;
        let city_key = self.intern_string("city")?;
        let city = self.intern_city(&geo.city_name)?;
        let location_keys = if geo.has_location() {
            Some((
                self.intern_string("location")?,
                self.intern_string("latitude")?,
                self.intern_string("longitude")?,
            ))
        } else {
            None
        };

        let offset = self.tail_offset()?;
        self.offsets.insert(key, offset);
        put_map_header(&mut self.buf, if location_keys.is_some() { 4 } else { 3 })?;
        put_pointer(&mut self.buf, country_key);
        put_pointer(&mut self.buf, country);
        put_pointer(&mut self.buf, region_key);
        put_pointer(&mut self.buf, region);
        put_pointer(&mut self.buf, city_key);
        put_pointer(&mut self.buf, city);
        if let Some((location_key, latitude_key, longitude_key)) = location_keys {
            put_pointer(&mut self.buf, location_key);
            put_map_header(&mut self.buf, 2)?;
            put_pointer(&mut self.buf, latitude_key);
            put_float32(&mut self.buf, geo.latitude);
            put_pointer(&mut self.buf, longitude_key);
            put_float32(&mut self.buf, geo.longitude);
        }
        Ok(offset)
    }
}

impl Default for DataSection {
    fn default() -> Self {
        Self::new()
    }
}

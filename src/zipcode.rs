//! Memory-mapped binary search over the external ZIP code table.
//!
//! Format (spec §6): 4-byte little-endian `u32` record count, followed by
//! that many 13-byte records `{5 ASCII zip, f32 lat LE, f32 lon LE}`, sorted
//! by zip as memcmp.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::common::constants::{ZIP_CODE_LEN, ZIP_RECORD_LEN};

const HEADER_LEN: usize = 4;

pub struct ZipTable {
    mmap: Mmap,
    count: usize,
}

impl ZipTable {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let count = if mmap.len() >= HEADER_LEN {
            u32::from_le_bytes(mmap[0..4].try_into().unwrap()) as usize
        } else {
            0
        };
        Ok(Self { mmap, count })
    }

    fn record(&self, index: usize) -> &[u8] {
        let start = HEADER_LEN + index * ZIP_RECORD_LEN;
        &self.mmap[start..start + ZIP_RECORD_LEN]
    }

    fn zip_bytes(&self, index: usize) -> &[u8] {
        &self.record(index)[0..ZIP_CODE_LEN]
    }

    /// Binary search for `zip` (exactly 5 ASCII digits). Returns the exact
    /// stored `(lat, lon)` as `f32`, bit-equal to what's on disk.
    pub fn lookup(&self, zip: &str) -> Option<(f32, f32)> {
        if zip.len() != ZIP_CODE_LEN || !zip.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let target = zip.as_bytes();

        let (mut lo, mut hi) = (0usize, self.count);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.zip_bytes(mid).cmp(target) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => {
                    let rec = self.record(mid);
                    let lat = f32::from_le_bytes(rec[5..9].try_into().unwrap());
                    let lon = f32::from_le_bytes(rec[9..13].try_into().unwrap());
                    return Some((lat, lon));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn build_table(entries: &[(&str, f32, f32)]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&(entries.len() as u32).to_le_bytes())
            .unwrap();
        for (zip, lat, lon) in entries {
            file.write_all(zip.as_bytes()).unwrap();
            file.write_all(&lat.to_le_bytes()).unwrap();
            file.write_all(&lon.to_le_bytes()).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn lookup_finds_every_entry_bit_exact() {
        let entries = [
            ("00501", 40.8154_f32, -73.0451_f32),
            ("60601", 41.8855_f32, -87.6221_f32),
            ("90210", 34.0901_f32, -118.4065_f32),
        ];
        let file = build_table(&entries);
        let table = ZipTable::open(file.path()).unwrap();
        for (zip, lat, lon) in entries {
            let (got_lat, got_lon) = table.lookup(zip).unwrap();
            assert_eq!(got_lat, lat);
            assert_eq!(got_lon, lon);
        }
    }

    #[test]
    fn lookup_returns_none_for_absent_zip() {
        let entries = [("00501", 1.0_f32, 2.0_f32), ("90210", 3.0_f32, 4.0_f32)];
        let file = build_table(&entries);
        let table = ZipTable::open(file.path()).unwrap();
        assert!(table.lookup("55555").is_none());
    }

    #[test]
    fn lookup_rejects_malformed_input() {
        let file = build_table(&[("00501", 1.0, 2.0)]);
        let table = ZipTable::open(file.path()).unwrap();
        assert!(table.lookup("abc").is_none());
        assert!(table.lookup("1234").is_none());
    }
}

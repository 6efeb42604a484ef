use std::fs::File;
use std::io::{Cursor, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail, ensure};
use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::{Mmap, MmapOptions};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PakCompression {
    Stored,
    Explode,
    Deflate,
    Unknown(u8),
}

impl PakCompression {
    fn from_flag(flag: u8) -> Self {
        match flag {
            0 => PakCompression::Stored,
            1 => PakCompression::Explode,
            4 => PakCompression::Deflate,
            other => PakCompression::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PakEntry {
    pub index: usize,
    pub name: Option<String>,
    pub data_offset: u64,
    pub disc_size: u32,
    pub uncompressed_size: u32,
    pub compression: PakCompression,
    pub info: u8,
}

impl PakEntry {
    pub fn data_range(&self) -> Range<usize> {
        let start = self.data_offset as usize;
        let end = start + self.disc_size as usize;
        start..end
    }

    /// Size of the resource once loaded, as reported by the entry header.
    pub fn loaded_size(&self) -> u32 {
        match self.compression {
            PakCompression::Stored => self.disc_size,
            _ => self.uncompressed_size,
        }
    }
}

#[derive(Debug)]
pub struct PakArchive {
    path: PathBuf,
    mmap: Mmap,
    entries: Vec<PakEntry>,
}

impl PakArchive {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let file = File::open(&path_buf)
            .with_context(|| format!("opening PAK archive at {}", path_buf.display()))?;
        let mmap = unsafe { MmapOptions::new().map(&file) }
            .with_context(|| format!("memory-mapping PAK archive {}", path_buf.display()))?;

        let entries = parse_entries(&mmap)
            .with_context(|| format!("parsing PAK archive {}", path_buf.display()))?;

        Ok(PakArchive {
            path: path_buf,
            mmap,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[PakEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&PakEntry> {
        self.entries.get(index)
    }

    /// Returns the bytes of a stored entry. Compressed entries are rejected.
    pub fn read_entry_bytes(&self, entry: &PakEntry) -> Result<&[u8]> {
        match entry.compression {
            PakCompression::Stored => Ok(&self.mmap[entry.data_range()]),
            other => bail!(
                "PAK entry {} uses unsupported compression {:?}",
                entry.index,
                other
            ),
        }
    }

    pub fn read_index(&self, index: usize) -> Result<&[u8]> {
        let entry = self
            .entry(index)
            .ok_or_else(|| anyhow!("PAK index {index} out of range ({} entries)", self.entries.len()))?;
        self.read_entry_bytes(entry)
    }

    pub fn extract_entry<P: AsRef<Path>>(&self, entry: &PakEntry, dest: P) -> Result<()> {
        let bytes = self.read_entry_bytes(entry)?;
        let mut file = File::create(dest.as_ref())
            .with_context(|| format!("creating {}", dest.as_ref().display()))?;
        file.write_all(bytes)
            .with_context(|| format!("writing {}", dest.as_ref().display()))?;
        Ok(())
    }
}

pub(crate) fn parse_entries(bytes: &[u8]) -> Result<Vec<PakEntry>> {
    ensure!(bytes.len() >= 8, "PAK archive is too small to contain an index");

    let mut cursor = Cursor::new(bytes);
    cursor.read_u32::<LittleEndian>()?;
    let first_offset = cursor.read_u32::<LittleEndian>()? as usize;
    ensure!(
        first_offset >= 8 && first_offset % 4 == 0,
        "PAK index has invalid first offset {first_offset:#x}"
    );
    let file_count = first_offset / 4 - 2;

    let mut entries = Vec::with_capacity(file_count);
    for index in 0..file_count {
        cursor.seek(SeekFrom::Start(((index + 1) * 4) as u64))?;
        let offset = cursor
            .read_u32::<LittleEndian>()
            .with_context(|| format!("reading offset of PAK entry {index}"))?;
        let entry = read_entry(bytes, index, offset as usize)
            .with_context(|| format!("reading PAK entry {index}"))?;
        entries.push(entry);
    }

    Ok(entries)
}

fn read_entry(bytes: &[u8], index: usize, offset: usize) -> Result<PakEntry> {
    ensure!(offset < bytes.len(), "entry offset {offset:#x} beyond file");

    let mut cursor = Cursor::new(bytes);
    cursor.seek(SeekFrom::Start(offset as u64))?;

    let descriptor_size = cursor.read_u32::<LittleEndian>()?;
    if descriptor_size != 0 {
        cursor.seek(SeekFrom::Current(i64::from(descriptor_size) - 4))?;
    }

    let disc_size = cursor.read_i32::<LittleEndian>()?;
    let uncompressed_size = cursor.read_i32::<LittleEndian>()?;
    let flag = cursor.read_u8()?;
    let info = cursor.read_u8()?;
    let name_len = cursor.read_i16::<LittleEndian>()?;

    let disc_size: u32 = disc_size
        .try_into()
        .context("PAK entry disc size is negative")?;
    let uncompressed_size: u32 = uncompressed_size
        .try_into()
        .context("PAK entry uncompressed size is negative")?;

    let mut name = None;
    if name_len > 0 {
        let start = cursor.position() as usize;
        let end = start + name_len as usize;
        ensure!(end <= bytes.len(), "entry name runs past end of file");
        let raw = &bytes[start..end];
        let trimmed = raw.split(|&b| b == 0).next().unwrap_or(raw);
        if !trimmed.is_empty() {
            name = Some(String::from_utf8_lossy(trimmed).into_owned());
        }
        cursor.seek(SeekFrom::Current(i64::from(name_len)))?;
    }

    let data_offset = cursor.position();
    let end = (data_offset as usize)
        .checked_add(disc_size as usize)
        .ok_or_else(|| anyhow!("PAK entry size overflow"))?;
    ensure!(end <= bytes.len(), "PAK entry data extends beyond file");

    Ok(PakEntry {
        index,
        name,
        data_offset,
        disc_size,
        uncompressed_size,
        compression: PakCompression::from_flag(flag),
        info,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    /// Builds a PAK image from `(payload, name, compression flag)` triples.
    pub(crate) fn build_pak(payloads: &[(&[u8], Option<&str>, u8)]) -> Vec<u8> {
        let count = payloads.len();
        let header_len = 4 * (count + 2);
        let mut data = vec![0u8; header_len];
        let mut offsets = Vec::new();
        for (payload, name, flag) in payloads {
            offsets.push(data.len() as u32);
            data.extend_from_slice(&0u32.to_le_bytes());
            data.extend_from_slice(&(payload.len() as i32).to_le_bytes());
            data.extend_from_slice(&(payload.len() as i32 * 2).to_le_bytes());
            data.push(*flag);
            data.push(0);
            match name {
                Some(name) => {
                    let mut raw = name.as_bytes().to_vec();
                    raw.push(0);
                    data.extend_from_slice(&(raw.len() as i16).to_le_bytes());
                    data.extend_from_slice(&raw);
                }
                None => data.extend_from_slice(&0i16.to_le_bytes()),
            }
            data.extend_from_slice(payload);
        }
        let end = data.len() as u32;
        for (index, offset) in offsets.iter().enumerate() {
            let at = (index + 1) * 4;
            data[at..at + 4].copy_from_slice(&offset.to_le_bytes());
        }
        let at = (count + 1) * 4;
        data[at..at + 4].copy_from_slice(&end.to_le_bytes());
        data
    }

    #[test]
    fn parses_stored_entries() {
        let data = build_pak(&[(b"ABCD", Some("room"), 0), (b"xy", None, 0)]);
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();

        let archive = PakArchive::open(file.path()).unwrap();
        assert_eq!(archive.entries().len(), 2);
        let first = &archive.entries()[0];
        assert_eq!(first.name.as_deref(), Some("room"));
        assert_eq!(first.compression, PakCompression::Stored);
        assert_eq!(archive.read_entry_bytes(first).unwrap(), b"ABCD");
        assert_eq!(archive.read_index(1).unwrap(), b"xy");
        assert!(archive.read_index(2).is_err());
    }

    #[test]
    fn rejects_compressed_entries() {
        let data = build_pak(&[(b"zzzz", None, 1), (b"qq", None, 4)]);
        let entries = parse_entries(&data).unwrap();
        assert_eq!(entries[0].compression, PakCompression::Explode);
        assert_eq!(entries[0].loaded_size(), 8);
        assert_eq!(entries[1].compression, PakCompression::Deflate);

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();
        let archive = PakArchive::open(file.path()).unwrap();
        let err = archive.read_index(0).unwrap_err();
        assert!(err.to_string().contains("unsupported compression"));
    }

    #[test]
    fn rejects_truncated_index() {
        assert!(parse_entries(&[0, 0, 0]).is_err());
        let mut data = build_pak(&[(b"ABCD", None, 0)]);
        data.truncate(data.len() - 2);
        assert!(parse_entries(&data).is_err());
    }
}

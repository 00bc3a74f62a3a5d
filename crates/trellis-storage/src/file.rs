//! On-disk format shared by every named store.
//!
//! A store file is a fixed-size little-endian header followed by one
//! payload (the codec-encoded snapshot of the store). The header embeds a
//! format version, the compression tag, payload lengths and a 64-bit
//! content hash of the uncompressed payload. Writes always go through a
//! unique temp file and an atomic rename; a store file is never partially
//! overwritten in place.

use std::fs;
use std::io::{self, Seek, SeekFrom, Write};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use byteorder::{ByteOrder, LittleEndian};
use memmap2::{Mmap, MmapOptions};

use crate::error::StorageError;
use crate::hash::content_hash;

pub const STORE_MAGIC: [u8; 8] = *b"TRLSTOR\0";
pub const HEADER_LEN: usize = 40;
pub const FORMAT_VERSION: u16 = 1;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Zstd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCompression {
    None,
    Zstd { level: i32 },
    /// Compresses with zstd when the uncompressed payload is at least
    /// `threshold` bytes, otherwise stores it raw.
    Auto { threshold: u64 },
}

impl Default for WriteCompression {
    fn default() -> Self {
        Self::Auto {
            threshold: 64 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreHeader {
    pub format_version: u16,
    pub compression: Compression,
    pub payload_len: u64,
    pub uncompressed_len: u64,
    pub content_hash: u64,
}

impl StoreHeader {
    fn new(
        compression: Compression,
        payload_len: u64,
        uncompressed_len: u64,
        content_hash: u64,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            compression,
            payload_len,
            uncompressed_len,
            content_hash,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..8].copy_from_slice(&STORE_MAGIC);
        LittleEndian::write_u16(&mut out[8..10], self.format_version);
        out[10] = match self.compression {
            Compression::None => 0,
            Compression::Zstd => 1,
        };
        // out[11..16] reserved
        LittleEndian::write_u64(&mut out[16..24], self.payload_len);
        LittleEndian::write_u64(&mut out[24..32], self.uncompressed_len);
        LittleEndian::write_u64(&mut out[32..40], self.content_hash);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, StorageError> {
        if bytes.len() < HEADER_LEN {
            return Err(StorageError::Truncated {
                expected: HEADER_LEN,
                found: bytes.len(),
            });
        }
        if bytes[..8] != STORE_MAGIC {
            return Err(StorageError::InvalidHeader("bad magic"));
        }

        let format_version = LittleEndian::read_u16(&bytes[8..10]);
        if format_version != FORMAT_VERSION {
            return Err(StorageError::WrongFormat {
                expected: FORMAT_VERSION,
                found: format_version,
            });
        }

        let compression = match bytes[10] {
            0 => Compression::None,
            1 => Compression::Zstd,
            tag => return Err(StorageError::UnsupportedCompression(tag)),
        };

        Ok(Self {
            format_version,
            compression,
            payload_len: LittleEndian::read_u64(&bytes[16..24]),
            uncompressed_len: LittleEndian::read_u64(&bytes[24..32]),
            content_hash: LittleEndian::read_u64(&bytes[32..40]),
        })
    }
}

enum Backing {
    Mmap { mmap: Mmap, offset: usize, len: usize },
    Owned(Vec<u8>),
}

/// An uncompressed, hash-verified store payload, backed by an mmap region
/// (preferred) or an owned buffer.
pub struct StorePayload {
    backing: Backing,
}

impl std::fmt::Debug for StorePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorePayload")
            .field("len", &self.as_slice().len())
            .finish()
    }
}

impl StorePayload {
    fn as_slice(&self) -> &[u8] {
        match &self.backing {
            Backing::Mmap { mmap, offset, len } => &mmap[*offset..*offset + *len],
            Backing::Owned(bytes) => bytes.as_slice(),
        }
    }
}

impl Deref for StorePayload {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// Reads and verifies a store file, returning `Ok(None)` when it does not
/// exist.
pub fn read_store(path: &Path) -> Result<Option<StorePayload>, StorageError> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    let file_len = file.metadata()?.len() as usize;
    if file_len < HEADER_LEN {
        return Err(StorageError::Truncated {
            expected: HEADER_LEN,
            found: file_len,
        });
    }

    // mmap is the fast path. If it fails, fall back to reading the file.
    let payload = match unsafe { MmapOptions::new().map(&file) } {
        Ok(mmap) => payload_from_mmap(mmap)?,
        Err(_) => {
            let bytes = fs::read(path)?;
            payload_from_bytes(bytes)?
        }
    };

    Ok(Some(payload))
}

fn payload_from_mmap(mmap: Mmap) -> Result<StorePayload, StorageError> {
    let header = StoreHeader::decode(&mmap[..HEADER_LEN])?;
    ensure_bounds(mmap.len(), header.payload_len)?;

    let backing = match header.compression {
        Compression::None => Backing::Mmap {
            mmap,
            offset: HEADER_LEN,
            len: header.payload_len as usize,
        },
        Compression::Zstd => {
            let raw = &mmap[HEADER_LEN..HEADER_LEN + header.payload_len as usize];
            Backing::Owned(decompress(raw, header.uncompressed_len)?)
        }
    };

    verify_hash(&header, &backing)?;
    Ok(StorePayload { backing })
}

fn payload_from_bytes(bytes: Vec<u8>) -> Result<StorePayload, StorageError> {
    let header = StoreHeader::decode(&bytes[..HEADER_LEN.min(bytes.len())])?;
    ensure_bounds(bytes.len(), header.payload_len)?;

    let raw = &bytes[HEADER_LEN..HEADER_LEN + header.payload_len as usize];
    let backing = match header.compression {
        Compression::None => Backing::Owned(raw.to_vec()),
        Compression::Zstd => Backing::Owned(decompress(raw, header.uncompressed_len)?),
    };

    verify_hash(&header, &backing)?;
    Ok(StorePayload { backing })
}

fn ensure_bounds(file_len: usize, payload_len: u64) -> Result<(), StorageError> {
    let expected = (HEADER_LEN as u64)
        .checked_add(payload_len)
        .ok_or(StorageError::InvalidHeader("payload length overflow"))?;
    let expected: usize = expected
        .try_into()
        .map_err(|_| StorageError::OversizedPayload { payload_len })?;
    if file_len < expected {
        return Err(StorageError::Truncated {
            expected,
            found: file_len,
        });
    }
    Ok(())
}

fn verify_hash(header: &StoreHeader, backing: &Backing) -> Result<(), StorageError> {
    let payload = match backing {
        Backing::Mmap { mmap, offset, len } => &mmap[*offset..*offset + *len],
        Backing::Owned(bytes) => bytes.as_slice(),
    };
    let found = content_hash(payload);
    if found != header.content_hash {
        return Err(StorageError::HashMismatch {
            expected: header.content_hash,
            found,
        });
    }
    Ok(())
}

fn decompress(payload: &[u8], uncompressed_len: u64) -> Result<Vec<u8>, StorageError> {
    let len: usize = uncompressed_len
        .try_into()
        .map_err(|_| StorageError::OversizedPayload {
            payload_len: uncompressed_len,
        })?;
    zstd::bulk::decompress(payload, len).map_err(|e| StorageError::Decompression(e.to_string()))
}

/// Writes a store snapshot: temp file, placeholder header, streamed
/// payload, real header, fsync, rename over the destination.
pub fn write_store_atomic(
    path: &Path,
    payload: &[u8],
    compression: WriteCompression,
) -> Result<(), StorageError> {
    let parent = path
        .parent()
        .ok_or(StorageError::InvalidHeader("missing parent directory"))?;
    fs::create_dir_all(parent)?;

    let uncompressed_len = payload.len() as u64;
    let (compression, zstd_level) = match compression {
        WriteCompression::None => (Compression::None, None),
        WriteCompression::Zstd { level } => (Compression::Zstd, Some(level)),
        WriteCompression::Auto { threshold } => {
            if uncompressed_len >= threshold {
                (Compression::Zstd, Some(0))
            } else {
                (Compression::None, None)
            }
        }
    };

    let hash = content_hash(payload);
    let (tmp_path, file) = open_unique_tmp_file(path, parent)?;

    let result = (|| -> Result<(), StorageError> {
        let (mut file, payload_len) = write_payload(file, payload, compression, zstd_level)?;

        let header = StoreHeader::new(compression, payload_len, uncompressed_len, hash);
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&header.encode())?;
        file.sync_all()?;
        drop(file);

        rename_overwrite(&tmp_path, path).map_err(StorageError::from)
    })();

    if let Err(err) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    Ok(())
}

fn write_payload(
    mut file: fs::File,
    payload: &[u8],
    compression: Compression,
    zstd_level: Option<i32>,
) -> Result<(fs::File, u64), StorageError> {
    file.write_all(&[0u8; HEADER_LEN])?;

    match compression {
        Compression::None => {
            file.write_all(payload)?;
            Ok((file, payload.len() as u64))
        }
        Compression::Zstd => {
            let level = zstd_level.unwrap_or(0);
            let mut encoder = zstd::stream::write::Encoder::new(file, level)
                .map_err(|e| StorageError::Decompression(e.to_string()))?;
            encoder.write_all(payload)?;
            let mut file = encoder
                .finish()
                .map_err(|e| StorageError::Decompression(e.to_string()))?;
            let end = file.seek(SeekFrom::End(0))?;
            let payload_len = end
                .checked_sub(HEADER_LEN as u64)
                .ok_or(StorageError::InvalidHeader("payload length underflow"))?;
            Ok((file, payload_len))
        }
    }
}

fn rename_overwrite(tmp_path: &Path, dest: &Path) -> io::Result<()> {
    const MAX_RENAME_ATTEMPTS: usize = 1024;
    let mut attempts = 0usize;

    loop {
        match fs::rename(tmp_path, dest) {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists || dest.exists() => {
                // On Windows, `rename` doesn't overwrite; retry after removing
                // the destination.
                let _ = fs::remove_file(dest);

                attempts += 1;
                if attempts >= MAX_RENAME_ATTEMPTS {
                    return Err(err);
                }
            }
            Err(err) => return Err(err),
        }
    }
}

fn open_unique_tmp_file(dest: &Path, parent: &Path) -> io::Result<(PathBuf, fs::File)> {
    let file_name = dest
        .file_name()
        .ok_or_else(|| io::Error::other("destination path has no file name"))?;
    let pid = std::process::id();

    loop {
        let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(format!(".tmp.{pid}.{counter}"));
        let tmp_path = parent.join(tmp_name);

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => return Ok((tmp_path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
}

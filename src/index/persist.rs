//! Binary persistence for [`FlatIndex`].
//!
//! Layout (little-endian): 4-byte magic `AFLT`, `u32` format version, `u64`
//! dimensionality, `u64` row count, `u64` snapshot fingerprint, then
//! `rows * dimension` `f32` values in row-major order.
//!
//! Files are written through a [`StagedFile`]: the bytes go to a temporary file
//! in the target's directory, which is renamed over the target on commit.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::flat::FlatIndex;
use super::{IndexError, IndexResult};

const MAGIC: &[u8; 4] = b"AFLT";
const VERSION: u32 = 2;
const HEADER_LEN: usize = 32;

/// A fully written temporary file waiting to replace `target`.
#[derive(Debug)]
pub(crate) struct StagedFile {
    target: PathBuf,
    file: NamedTempFile,
}

impl StagedFile {
    /// Stage `target` by writing its full contents to a sibling temporary file.
    pub(crate) fn write<F>(target: &Path, fill: F) -> std::io::Result<Self>
    where
        F: FnOnce(&mut BufWriter<&File>) -> std::io::Result<()>,
    {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(file.as_file());
            fill(&mut writer)?;
            writer.flush()?;
        }
        file.as_file().sync_all()?;
        Ok(Self {
            target: target.to_path_buf(),
            file,
        })
    }

    pub(crate) fn target(&self) -> &Path {
        &self.target
    }

    /// Atomically rename the staged file over its target.
    pub(crate) fn commit(self) -> std::io::Result<()> {
        self.file.persist(&self.target).map_err(|e| e.error)?;
        Ok(())
    }
}

impl FlatIndex {
    /// Write the index, tagged with `fingerprint`, to a staged file for `path`.
    ///
    /// Nothing at `path` changes until the returned file is committed.
    pub(crate) fn stage(&self, path: &Path, fingerprint: u64) -> IndexResult<StagedFile> {
        StagedFile::write(path, |writer| {
            let mut header = Vec::with_capacity(HEADER_LEN);
            header.extend_from_slice(MAGIC);
            header.extend_from_slice(&VERSION.to_le_bytes());
            header.extend_from_slice(&(self.dimension() as u64).to_le_bytes());
            header.extend_from_slice(&(self.len() as u64).to_le_bytes());
            header.extend_from_slice(&fingerprint.to_le_bytes());
            writer.write_all(&header)?;

            for value in self.raw() {
                writer.write_all(&value.to_le_bytes())?;
            }
            Ok(())
        })
        .map_err(|e| io_error(path, e))
    }

    /// Read an index file, returning it with the fingerprint it was saved with.
    ///
    /// # Errors
    /// Returns `IndexError::Io` if the file cannot be read and
    /// `IndexError::Corrupt` if it is truncated or not an index file.
    pub fn load(path: impl AsRef<Path>) -> IndexResult<(Self, u64)> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| io_error(path, e))?;
        let mut reader = BufReader::new(file);
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| io_error(path, e))?;
        decode(&bytes).map_err(|reason| IndexError::Corrupt {
            path: path.to_path_buf(),
            reason,
        })
    }
}

pub(crate) fn io_error(path: &Path, error: std::io::Error) -> IndexError {
    IndexError::Io {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
}

fn decode(bytes: &[u8]) -> Result<(FlatIndex, u64), String> {
    if bytes.len() < HEADER_LEN {
        return Err(format!("file is {} bytes, shorter than the header", bytes.len()));
    }
    if &bytes[0..4] != MAGIC {
        return Err("bad magic bytes".to_string());
    }
    let version = u32::from_le_bytes(bytes[4..8].try_into().map_err(|_| "bad version field")?);
    if version != VERSION {
        return Err(format!("unsupported format version {}", version));
    }
    let dimension = read_u64(&bytes[8..16])? as usize;
    let rows = read_u64(&bytes[16..24])? as usize;
    let fingerprint = read_u64(&bytes[24..32])?;

    let body = &bytes[HEADER_LEN..];
    let expected = dimension
        .checked_mul(rows)
        .and_then(|n| n.checked_mul(4))
        .ok_or("row count overflows")?;
    if body.len() != expected {
        return Err(format!(
            "expected {} bytes of vector data for {} x {}, found {}",
            expected,
            rows,
            dimension,
            body.len()
        ));
    }

    let data = body
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    Ok((FlatIndex::from_raw(dimension, rows, data), fingerprint))
}

fn read_u64(bytes: &[u8]) -> Result<u64, String> {
    let array: [u8; 8] = bytes.try_into().map_err(|_| "bad length field".to_string())?;
    Ok(u64::from_le_bytes(array))
}

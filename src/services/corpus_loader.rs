//! Corpus loading: fetch, unpack, decode.
//!
//! The sample corpus arrives as a (usually gzip-compressed) tar archive of
//! sequentially numbered image files. Some transport layers decompress
//! gzip transparently, so the loader sniffs the magic number and only
//! gunzips when the bytes actually are gzip; it never double-decompresses.
//!
//! Archive entries are filtered to image files and sorted by the numeric
//! part of their filename; the position after sorting is the image's
//! stable index for the rest of the pipeline.

use std::io::Read;
use std::sync::atomic::{AtomicU32, Ordering};

use rayon::prelude::*;

use crate::error::LoadError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// A raw image file pulled out of the archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Entry path inside the archive.
    pub name: String,
    /// Raw file bytes.
    pub data: Vec<u8>,
}

/// A decoded in-memory raster.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Archive entry name; doubles as the image URL handed to the
    /// collaborator.
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Raw RGBA pixel data, row-major.
    pub rgba: Vec<u8>,
}

/// Fetch bytes from a local path or an http(s) URL.
pub fn fetch_bytes(source: &str) -> Result<Vec<u8>, LoadError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let fetch_err = |source_err| LoadError::Fetch {
            url: source.to_string(),
            source: source_err,
        };
        let response = reqwest::blocking::get(source)
            .and_then(|r| r.error_for_status())
            .map_err(fetch_err)?;
        let bytes = response.bytes().map_err(fetch_err)?;
        Ok(bytes.to_vec())
    } else {
        std::fs::read(source).map_err(|e| LoadError::Read {
            path: source.to_string(),
            source: e,
        })
    }
}

fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[..2] == GZIP_MAGIC
}

fn is_image_name(name: &str) -> bool {
    let name = name.rsplit('/').next().unwrap_or(name);
    if name.starts_with("._") {
        // AppleDouble resource forks masquerade as their image's name
        return false;
    }
    match name.rsplit_once('.') {
        Some((_, ext)) => IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// Numeric key embedded in a filename (`images/017.jpg` -> 17).
///
/// Entries without digits sort after all numbered entries, then by name.
fn numeric_key(name: &str) -> u64 {
    let stem = name.rsplit('/').next().unwrap_or(name);
    let digits: String = stem.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(u64::MAX)
}

/// Unpack the archive into image entries in corpus order.
///
/// Gunzips first when the gzip magic number is present; otherwise the
/// bytes are treated as an already-expanded tar container.
pub fn unpack_archive(bytes: &[u8]) -> Result<Vec<ArchiveEntry>, LoadError> {
    let tar_bytes: Vec<u8> = if is_gzip(bytes) {
        let mut decoder = flate2::read::GzDecoder::new(bytes);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        out
    } else {
        tracing::debug!("archive is not gzip, treating as bare tar");
        bytes.to_vec()
    };

    let mut archive = tar::Archive::new(tar_bytes.as_slice());
    let mut entries = Vec::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry.path()?.to_string_lossy().into_owned();
        if name.contains("__MACOSX") || !is_image_name(&name) {
            continue;
        }
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        entries.push(ArchiveEntry { name, data });
    }

    if entries.is_empty() {
        return Err(LoadError::EmptyArchive);
    }

    entries.sort_by(|a, b| {
        numeric_key(&a.name)
            .cmp(&numeric_key(&b.name))
            .then_with(|| a.name.cmp(&b.name))
    });

    tracing::info!(images = entries.len(), "unpacked corpus archive");
    Ok(entries)
}

/// Decode every archive entry into an RGBA raster.
///
/// Decoding runs in parallel; output order matches entry order, which
/// downstream consumers rely on for index-based correlation. `progress`
/// is called with `(done, total)` after each image and may be invoked
/// from multiple threads.
pub fn decode_images(
    entries: &[ArchiveEntry],
    progress: impl Fn(u32, u32) + Sync,
) -> Result<Vec<DecodedImage>, LoadError> {
    let total = entries.len() as u32;
    let counter = AtomicU32::new(0);

    entries
        .par_iter()
        .map(|entry| {
            let decoded =
                image::load_from_memory(&entry.data).map_err(|source| LoadError::ImageDecode {
                    name: entry.name.clone(),
                    source,
                })?;
            let rgba = decoded.to_rgba8();
            let image = DecodedImage {
                name: entry.name.clone(),
                width: rgba.width(),
                height: rgba.height(),
                rgba: rgba.into_raw(),
            };
            tracing::debug!(
                image = %image.name,
                width = image.width,
                height = image.height,
                "decoded image"
            );
            let done = counter.fetch_add(1, Ordering::Relaxed) + 1;
            progress(done, total);
            Ok(image)
        })
        .collect()
}

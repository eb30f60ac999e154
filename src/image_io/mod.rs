//! Binary PPM (P6) reading and writing, plus `image`-crate decoding for other formats

use crate::types::{Error, PixelGrid, Result};
use image::ImageReader;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Header fields of a P6 image, kept so outputs can echo `max_val`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PpmHeader {
    pub width: u32,
    pub height: u32,
    pub max_val: u16,
}

impl PpmHeader {
    pub fn payload_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(3)
    }
}

/// Parse a P6 image: `P6 <width> <height> <maxval>` then raw RGB bytes
///
/// Header tokens are whitespace separated and may be interleaved with `#`
/// comments. Exactly one whitespace byte separates `maxval` from the payload.
pub fn read_ppm<R: Read>(reader: &mut R) -> Result<(PixelGrid, PpmHeader)> {
    let magic = read_token(reader, "magic number")?;
    if magic != "P6" {
        return Err(Error::Format(format!(
            "expected magic number P6, found '{}'",
            magic
        )));
    }

    let width: u32 = parse_field(reader, "width")?;
    let height: u32 = parse_field(reader, "height")?;
    let max_val: u16 = parse_field(reader, "maxval")?;

    if width == 0 || height == 0 {
        return Err(Error::Format(format!(
            "image dimensions must be non-zero, got {}x{}",
            width, height
        )));
    }
    if max_val == 0 || max_val > 255 {
        return Err(Error::Format(format!(
            "maxval must be in 1..=255, got {}",
            max_val
        )));
    }

    let header = PpmHeader {
        width,
        height,
        max_val,
    };
    let len = header
        .payload_len()
        .ok_or_else(|| Error::Format(format!("image {}x{} is too large", width, height)))?;

    // Grow with the bytes actually present, not the size the header claims
    let mut raw = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut raw)?;
    if raw.len() < len {
        return Err(Error::Format(format!(
            "payload is shorter than the {} bytes required for {}x{} pixels (got {})",
            len,
            width,
            height,
            raw.len()
        )));
    }

    let grid = PixelGrid::from_raw_rgb(height as usize, width as usize, &raw)?;
    Ok((grid, header))
}

/// Serialize `grid` as P6 with the given `max_val`
pub fn write_ppm<W: Write>(writer: &mut W, grid: &PixelGrid, max_val: u16) -> Result<()> {
    write!(writer, "P6\n{} {}\n{}\n", grid.cols(), grid.rows(), max_val)?;
    writer.write_all(&grid.to_raw_rgb())?;
    writer.flush()?;
    Ok(())
}

/// Load a P6 file from disk
pub fn load_ppm(path: &Path) -> Result<(PixelGrid, PpmHeader)> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    read_ppm(&mut reader)
}

/// Write a P6 file to disk
pub fn save_ppm(path: &Path, grid: &PixelGrid, max_val: u16) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_ppm(&mut writer, grid, max_val)
}

/// Load any supported image as RGB
///
/// `.ppm`/`.pnm` go through [`read_ppm`]; everything else is decoded by the
/// `image` crate and reported with `max_val` 255.
pub fn load_image(path: &Path) -> Result<(PixelGrid, PpmHeader)> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());

    match ext.as_deref() {
        Some("ppm") | Some("pnm") => load_ppm(path),
        _ => {
            let mut reader = ImageReader::open(path)?;
            reader.no_limits();
            let rgb = reader.decode()?.to_rgb8();
            let (width, height) = rgb.dimensions();
            if width == 0 || height == 0 {
                return Err(Error::Format(format!(
                    "image dimensions must be non-zero, got {}x{}",
                    width, height
                )));
            }
            let grid = PixelGrid::from_raw_rgb(height as usize, width as usize, rgb.as_raw())?;
            Ok((
                grid,
                PpmHeader {
                    width,
                    height,
                    max_val: 255,
                },
            ))
        }
    }
}

/// Edge-map and grayscale output paths for an output stem
///
/// `out/lena` becomes `out/lena.ppm` and `out/lena_grayscale.ppm`.
pub fn output_paths(stem: &Path) -> (PathBuf, PathBuf) {
    let mut edges = stem.as_os_str().to_owned();
    edges.push(".ppm");
    let mut gray = stem.as_os_str().to_owned();
    gray.push("_grayscale.ppm");
    (PathBuf::from(edges), PathBuf::from(gray))
}

fn next_byte<R: Read>(reader: &mut R) -> Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
}

/// Consume through the end of a `#` comment line
fn skip_comment<R: Read>(reader: &mut R) -> Result<()> {
    while let Some(b) = next_byte(reader)? {
        if b == b'\n' || b == b'\r' {
            break;
        }
    }
    Ok(())
}

/// Next whitespace-delimited header token; consumes the one delimiter after it
fn read_token<R: Read>(reader: &mut R, what: &str) -> Result<String> {
    let mut token = Vec::new();
    loop {
        match next_byte(reader)? {
            None => break,
            Some(b'#') => {
                // The newline closing the comment doubles as the delimiter
                skip_comment(reader)?;
                if !token.is_empty() {
                    break;
                }
            }
            Some(b) if b.is_ascii_whitespace() => {
                if !token.is_empty() {
                    break;
                }
            }
            Some(b) => token.push(b),
        }
    }

    if token.is_empty() {
        return Err(Error::Format(format!(
            "header ended before the {}",
            what
        )));
    }
    String::from_utf8(token)
        .map_err(|_| Error::Format(format!("{} is not valid ASCII", what)))
}

fn parse_field<R: Read, T: FromStr>(reader: &mut R, what: &str) -> Result<T> {
    let token = read_token(reader, what)?;
    token
        .parse::<T>()
        .map_err(|_| Error::Format(format!("invalid {} '{}'", what, token)))
}

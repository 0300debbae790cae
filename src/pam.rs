//! PAM (Portable Arbitrary Map, `P7`) reader and writer.
//!
//! The compression engine's test tooling exchanges raw frames as PAM
//! files: a small text header (`WIDTH`, `HEIGHT`, `DEPTH`, `MAXVAL`,
//! `TUPLTYPE`, `ENDHDR`) followed by binary tuples, 16-bit samples stored
//! big-endian. Depths 1 (gray), 3 (RGB) and 4 (RGBA) round-trip through
//! the ingest pipeline via [`MemorySource`].

use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::error::EncodeError;
use crate::format::PixelFormat;
use crate::memory::MemorySource;
use crate::raw::RawFrame;

/// A decoded PAM image: `depth` samples per pixel, each in
/// `0..=maxval`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PamImage {
    width: u32,
    height: u32,
    depth: u8,
    maxval: u16,
    samples: Vec<u16>,
}

impl PamImage {
    /// Build an image from raw samples, row-major, `depth` samples per
    /// pixel.
    pub fn new(
        width: u32,
        height: u32,
        depth: u8,
        maxval: u16,
        samples: Vec<u16>,
    ) -> Result<Self, EncodeError> {
        if width == 0 || height == 0 {
            return Err(EncodeError::InvalidInput("empty image".into()));
        }
        if !(1..=4).contains(&depth) {
            return Err(EncodeError::InvalidInput(format!(
                "unsupported depth {depth}"
            )));
        }
        if maxval == 0 {
            return Err(EncodeError::InvalidInput("MAXVAL must be positive".into()));
        }
        let expected = u128::from(width) * u128::from(height) * u128::from(depth);
        if samples.len() as u128 != expected {
            return Err(EncodeError::InvalidInput(format!(
                "expected {expected} samples, got {}",
                samples.len()
            )));
        }
        if samples.iter().any(|&s| s > maxval) {
            return Err(EncodeError::InvalidInput("sample exceeds MAXVAL".into()));
        }
        Ok(Self {
            width,
            height,
            depth,
            maxval,
            samples,
        })
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Samples per pixel.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Maximum sample value.
    pub fn maxval(&self) -> u16 {
        self.maxval
    }

    /// Row-major samples, `depth` per pixel.
    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    /// The conventional `TUPLTYPE` for this depth.
    pub fn tuple_type(&self) -> &'static str {
        match self.depth {
            1 => "GRAYSCALE",
            2 => "GRAYSCALE_ALPHA",
            3 => "RGB",
            _ => "RGB_ALPHA",
        }
    }

    /// Read a PAM file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EncodeError> {
        let file = std::fs::File::open(path)?;
        Self::read_from(BufReader::new(file))
    }

    /// Write a PAM file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), EncodeError> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Parse a PAM image from a byte slice.
    pub fn from_bytes(data: &[u8]) -> Result<Self, EncodeError> {
        Self::read_from(data)
    }

    /// Parse a PAM image from a buffered reader.
    pub fn read_from(mut reader: impl BufRead) -> Result<Self, EncodeError> {
        let header = Header::parse(&mut reader)?;
        let sample_bytes: u128 = if header.maxval > 255 { 2 } else { 1 };
        // Header values are attacker-controlled; the byte count must not
        // wrap before the allocation check sees it.
        let total = u128::from(header.width)
            * u128::from(header.height)
            * u128::from(header.depth)
            * sample_bytes;
        let total = usize::try_from(total).map_err(|_| {
            EncodeError::InvalidInput("header dimensions overflow".into())
        })?;

        let mut raw = Vec::new();
        raw.try_reserve_exact(total).map_err(|_| EncodeError::Oom)?;
        raw.resize(total, 0);
        reader.read_exact(&mut raw)?;

        let samples: Vec<u16> = if sample_bytes == 2 {
            raw.chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect()
        } else {
            raw.iter().map(|&b| u16::from(b)).collect()
        };
        Self::new(
            header.width,
            header.height,
            header.depth,
            header.maxval,
            samples,
        )
    }

    /// Serialize to a writer.
    pub fn write_to(&self, writer: &mut impl Write) -> Result<(), EncodeError> {
        write!(
            writer,
            "P7\nWIDTH {}\nHEIGHT {}\nDEPTH {}\nMAXVAL {}\nTUPLTYPE {}\nENDHDR\n",
            self.width,
            self.height,
            self.depth,
            self.maxval,
            self.tuple_type()
        )?;
        if self.maxval > 255 {
            for &sample in &self.samples {
                writer.write_all(&sample.to_be_bytes())?;
            }
        } else {
            for &sample in &self.samples {
                writer.write_all(&[sample as u8])?;
            }
        }
        Ok(())
    }

    /// View this image as an ingestible pixel source.
    ///
    /// Only 8-bit images convert directly; depth 2 (gray + alpha) has no
    /// canonical layout and is rejected.
    pub fn to_source(&self) -> Result<MemorySource, EncodeError> {
        if self.maxval != 255 {
            return Err(EncodeError::InvalidInput(
                "only MAXVAL 255 images convert to a pixel source".into(),
            ));
        }
        let format = match self.depth {
            1 => PixelFormat::Gray8,
            3 => PixelFormat::Rgb24,
            4 => PixelFormat::Rgba32,
            other => {
                return Err(EncodeError::InvalidInput(format!(
                    "depth {other} has no canonical pixel format"
                )));
            }
        };
        let bytes = self.samples.iter().map(|&s| s as u8).collect();
        Ok(MemorySource::from_packed(format, self.width, self.height, bytes))
    }

    /// Build a PAM image from a committed raw frame, dropping stride
    /// padding.
    pub fn from_raw_frame(frame: &RawFrame) -> Result<Self, EncodeError> {
        let depth = frame.bytes_per_pixel();
        let row = frame.width() as usize * depth as usize;
        let samples = frame
            .bytes()
            .chunks_exact(frame.stride() as usize)
            .flat_map(|r| r[..row].iter().map(|&b| u16::from(b)))
            .collect();
        Self::new(frame.width(), frame.height(), depth, 255, samples)
    }
}

struct Header {
    width: u32,
    height: u32,
    depth: u8,
    maxval: u16,
}

impl Header {
    fn parse(reader: &mut impl BufRead) -> Result<Self, EncodeError> {
        let mut line = String::new();
        reader.read_line(&mut line)?;
        if line.trim_end() != "P7" {
            return Err(EncodeError::InvalidInput("not a PAM file".into()));
        }

        let mut width = None;
        let mut height = None;
        let mut depth = None;
        let mut maxval = None;
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Err(EncodeError::InvalidInput("missing ENDHDR".into()));
            }
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut tokens = trimmed.split_whitespace();
            let key = tokens.next().unwrap_or("");
            match key {
                "ENDHDR" => break,
                "TUPLTYPE" => continue,
                "WIDTH" => width = Some(parse_field(tokens.next(), "WIDTH")?),
                "HEIGHT" => height = Some(parse_field(tokens.next(), "HEIGHT")?),
                "DEPTH" => depth = Some(parse_field(tokens.next(), "DEPTH")?),
                "MAXVAL" => maxval = Some(parse_field(tokens.next(), "MAXVAL")?),
                other => {
                    return Err(EncodeError::InvalidInput(format!(
                        "unknown header field {other}"
                    )));
                }
            }
        }

        Ok(Self {
            width: required(width, "WIDTH")?,
            height: required(height, "HEIGHT")?,
            depth: required(depth, "DEPTH")?,
            maxval: required(maxval, "MAXVAL")?,
        })
    }
}

fn parse_field<T: core::str::FromStr>(
    token: Option<&str>,
    field: &str,
) -> Result<T, EncodeError> {
    token
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| EncodeError::InvalidInput(format!("malformed {field} field")))
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, EncodeError> {
    value.ok_or_else(|| EncodeError::InvalidInput(format!("missing {field} field")))
}

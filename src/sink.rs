// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Writes finished images to disk.  The renderer always produces rows
//! top first; the formats that store rows bottom first (BMP, TGA) do
//! their own flipping.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use image::bmp::BMPEncoder;
use image::png::PNGEncoder;
use image::pnm::PNMEncoder;
use image::pnm::{PNMSubtype, SampleEncoding};
use image::ColorType;

use error::{Error, Result};
use render::Image;

/// Length of an uncompressed TGA header.
const TGA_HEADER_LEN: usize = 18;

/// The file formats images can be written in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Format {
    /// ASCII portable pixmap, `P3`.
    Ppm,
    /// 24-bit Windows bitmap.
    Bmp,
    /// Uncompressed 24-bit Truevision TGA.
    Tga,
    /// PNG, RGBA.
    Png,
}

impl Format {
    /// Picks the format from a file's extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Format> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_ref().map(|e| e.as_str()) {
            Some("ppm") => Ok(Format::Ppm),
            Some("bmp") => Ok(Format::Bmp),
            Some("tga") => Ok(Format::Tga),
            Some("png") => Ok(Format::Png),
            _ => Err(Error::UnknownFormat(path.display().to_string())),
        }
    }
}

/// Writes `image` to `path` in the format its extension names, and
/// returns the size of the file written.
pub fn write_image<P: AsRef<Path>>(path: P, image: &Image) -> Result<u64> {
    let path = path.as_ref();
    let format = Format::from_path(path)?;
    {
        let mut output = BufWriter::new(File::create(path)?);
        encode(&mut output, format, image)?;
        output.flush()?;
    }
    Ok(fs::metadata(path)?.len())
}

/// Encodes `image` into any writer.
pub fn encode<W: Write>(output: &mut W, format: Format, image: &Image) -> Result<()> {
    let (width, height) = (image.width(), image.height());
    match format {
        Format::Ppm => {
            let mut encoder = PNMEncoder::new(output)
                .with_subtype(PNMSubtype::Pixmap(SampleEncoding::Ascii));
            encoder.encode(&image.to_rgb()[..], width, height, ColorType::RGB(8))?;
        }
        Format::Bmp => {
            let mut encoder = BMPEncoder::new(output);
            encoder.encode(&image.to_rgb(), width, height, ColorType::RGB(8))?;
        }
        Format::Png => {
            let encoder = PNGEncoder::new(output);
            encoder.encode(image.pixels(), width, height, ColorType::RGBA(8))?;
        }
        Format::Tga => write_tga(output, image)?,
    }
    Ok(())
}

fn write_tga<W: Write>(output: &mut W, image: &Image) -> Result<()> {
    let too_big = || {
        Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "TGA images are limited to 65535 pixels per side",
        ))
    };
    if image.width() > u32::from(u16::max_value()) || image.height() > u32::from(u16::max_value()) {
        return Err(too_big());
    }
    let mut header = [0u8; TGA_HEADER_LEN];
    // uncompressed true-colour, origin at the bottom left
    header[2] = 2;
    header[12..14].copy_from_slice(&(image.width() as u16).to_le_bytes());
    header[14..16].copy_from_slice(&(image.height() as u16).to_le_bytes());
    header[16] = 24;
    output.write_all(&header)?;
    output.write_all(&image.to_bgr_bottom_up())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Image {
        let mut image = Image::new(3, 2).unwrap();
        image.put(0, 0, [255, 0, 0]);
        image.put(2, 1, [0, 0, 255]);
        image
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(Format::from_path("a.ppm").unwrap(), Format::Ppm);
        assert_eq!(Format::from_path("dir/b.BMP").unwrap(), Format::Bmp);
        assert_eq!(Format::from_path("c.tga").unwrap(), Format::Tga);
        assert_eq!(Format::from_path("d.png").unwrap(), Format::Png);
        assert!(Format::from_path("e.jpg").is_err());
        assert!(Format::from_path("noext").is_err());
    }

    #[test]
    fn ppm_is_ascii_p3() {
        let mut out = Vec::new();
        encode(&mut out, Format::Ppm, &sample()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut tokens = text.split_whitespace();
        assert_eq!(tokens.next(), Some("P3"));
        assert_eq!(tokens.next(), Some("3"));
        assert_eq!(tokens.next(), Some("2"));
        assert_eq!(tokens.next(), Some("255"));
        let samples: Vec<u8> = tokens.map(|t| t.parse().unwrap()).collect();
        assert_eq!(samples.len(), 3 * 2 * 3);
        assert_eq!(&samples[..3], &[255, 0, 0]);
        assert_eq!(&samples[15..], &[0, 0, 255]);
    }

    #[test]
    fn bmp_has_54_byte_header_and_padded_rows() {
        let mut out = Vec::new();
        encode(&mut out, Format::Bmp, &sample()).unwrap();
        assert_eq!(&out[..2], b"BM");
        // 3 pixels * 3 bytes = 9, padded to 12 per row
        assert_eq!(out.len(), 54 + 12 * 2);
    }

    #[test]
    fn tga_header_and_body() {
        let mut out = Vec::new();
        encode(&mut out, Format::Tga, &sample()).unwrap();
        assert_eq!(out.len(), TGA_HEADER_LEN + 3 * 2 * 3);
        assert_eq!(out[2], 2);
        assert_eq!(&out[12..14], &[3, 0]);
        assert_eq!(&out[14..16], &[2, 0]);
        assert_eq!(out[16], 24);
        // bottom row first, blue pixel last on it
        assert_eq!(&out[TGA_HEADER_LEN + 6..TGA_HEADER_LEN + 9], &[255, 0, 0]);
        // top row second, red pixel first on it, stored as BGR
        assert_eq!(&out[TGA_HEADER_LEN + 9..TGA_HEADER_LEN + 12], &[0, 0, 255]);
    }

    #[test]
    fn png_starts_with_signature() {
        let mut out = Vec::new();
        encode(&mut out, Format::Png, &sample()).unwrap();
        assert_eq!(&out[1..4], b"PNG");
    }
}

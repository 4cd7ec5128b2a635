//! # Output Writer
//!
//! Persists the bytes returned by an image model. The on-disk encoding follows the destination's
//! extension, decided once by [`OutputFormat::resolve`]:
//!
//! | extension        | format     | notes                                           |
//! |------------------|------------|-------------------------------------------------|
//! | none             | `Png`      | `.png` is appended to the path                  |
//! | `.png`           | `Png`      |                                                 |
//! | `.jpg` / `.jpeg` | `Jpeg`     | alpha is flattened onto white, quality 95       |
//! | anything else    | `Fallback` | encoded as PNG, the literal suffix is kept      |
//!
//! The image is encoded into a temporary file next to the destination and renamed into place,
//! so a failed write never leaves a truncated file behind.

use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use image::{
    DynamicImage, Rgb, RgbImage,
    codecs::{jpeg::JpegEncoder, png::PngEncoder},
};
use log::debug;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

pub const JPEG_QUALITY: u8 = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Lossless, keeps alpha
    Png,
    /// Lossy, no alpha channel
    Jpeg,
    /// Unrecognized extension, written as PNG
    Fallback,
}

impl OutputFormat {
    /// Returns the format for `path`, together with the path the file will actually be written to
    pub fn resolve(path: &Path) -> (Self, PathBuf) {
        let Some(ext) = path.extension() else {
            return (OutputFormat::Png, path.with_extension("png"));
        };

        let format = match ext.to_string_lossy().to_lowercase().as_str() {
            "png" => OutputFormat::Png,
            "jpg" | "jpeg" => OutputFormat::Jpeg,
            _ => OutputFormat::Fallback,
        };
        (format, path.to_path_buf())
    }
}

/// Decodes `bytes` and writes them to `path` in the format the extension asks for.
/// Returns the path that was written.
pub fn write_image(bytes: &[u8], path: &Path) -> Result<PathBuf> {
    let img = image::load_from_memory(bytes).map_err(Error::Decode)?;
    let (format, path) = OutputFormat::resolve(path);
    debug!(
        "Writing {}x{} {:?} image as {format:?} to {}",
        img.width(),
        img.height(),
        img.color(),
        path.display()
    );

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        encode(&img, format, &mut writer)?;
        writer.flush().map_err(|e| Error::io(&path, e))?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .map_err(|e| Error::io(&path, e))?;
    }

    tmp.persist(&path).map_err(|e| Error::io(&path, e.error))?;
    Ok(path)
}

fn encode(img: &DynamicImage, format: OutputFormat, writer: &mut impl Write) -> Result<()> {
    match format {
        OutputFormat::Jpeg => {
            let rgb = if img.color().has_alpha() {
                flatten_onto_white(img)
            } else {
                img.to_rgb8()
            };
            DynamicImage::ImageRgb8(rgb)
                .write_with_encoder(JpegEncoder::new_with_quality(writer, JPEG_QUALITY))
                .map_err(Error::Encode)
        }
        OutputFormat::Png | OutputFormat::Fallback => img
            .write_with_encoder(PngEncoder::new(writer))
            .map_err(Error::Encode),
    }
}

/// Blends every pixel onto an opaque white canvas, using the pixel's own alpha as the mask
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = u32::from(a);
        let blend = |c: u8| ((u32::from(c) * a + 255 * (255 - a) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// `nano_20250101_120000.png` style names, so outputs sort chronologically
pub fn timestamped_name(prefix: &str, at: NaiveDateTime, ext: &str) -> String {
    format!("{prefix}_{}.{ext}", at.format("%Y%m%d_%H%M%S"))
}

/// Inserts `_1`, `_2`, ... before the extension when a single request produced several images
pub fn numbered(path: &Path, index: usize, total: usize) -> PathBuf {
    if total <= 1 {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{}.{}", index + 1, ext.to_string_lossy()),
        None => format!("{stem}_{}", index + 1),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use chrono::NaiveDate;
    use image::{ImageFormat, Rgba, RgbaImage};
    use tempfile::tempdir;

    use super::*;

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn close_to(actual: [u8; 3], expected: [u8; 3]) -> bool {
        actual
            .iter()
            .zip(expected)
            .all(|(a, e)| a.abs_diff(e) <= 6)
    }

    #[test]
    fn resolve_formats() {
        let cases = [
            ("out", OutputFormat::Png, "out.png"),
            ("dir/out.png", OutputFormat::Png, "dir/out.png"),
            ("out.PNG", OutputFormat::Png, "out.PNG"),
            ("out.jpg", OutputFormat::Jpeg, "out.jpg"),
            ("out.JPEG", OutputFormat::Jpeg, "out.JPEG"),
            ("out.gif", OutputFormat::Fallback, "out.gif"),
            ("out.webp", OutputFormat::Fallback, "out.webp"),
        ];
        for (input, format, path) in cases {
            assert_eq!(
                OutputFormat::resolve(Path::new(input)),
                (format, PathBuf::from(path)),
                "{input}"
            );
        }
    }

    #[test]
    fn png_keeps_pixels() -> Result<()> {
        let dir = tempdir().map_err(|e| Error::io("tmp", e))?;
        let src = RgbImage::from_fn(37, 21, |x, y| Rgb([x as u8 * 6, y as u8 * 11, 200]));
        let bytes = png_bytes(DynamicImage::ImageRgb8(src.clone()));

        let written = write_image(&bytes, &dir.path().join("out.png"))?;
        let back = image::open(&written).unwrap();
        assert_eq!((back.width(), back.height()), (37, 21));
        assert_eq!(back.to_rgb8(), src);
        Ok(())
    }

    #[test]
    fn opaque_red_jpeg() -> Result<()> {
        let dir = tempdir().map_err(|e| Error::io("tmp", e))?;
        let red = RgbImage::from_pixel(100, 100, Rgb([255, 0, 0]));
        let bytes = png_bytes(DynamicImage::ImageRgb8(red));

        let written = write_image(&bytes, &dir.path().join("out.jpg"))?;
        let file_bytes = fs::read(&written).unwrap();
        assert_eq!(image::guess_format(&file_bytes).unwrap(), ImageFormat::Jpeg);

        let back = image::load_from_memory(&file_bytes).unwrap();
        assert_eq!((back.width(), back.height()), (100, 100));
        assert!(!back.color().has_alpha());
        let rgb = back.to_rgb8();
        assert!(close_to(rgb.get_pixel(50, 50).0, [255, 0, 0]));
        assert!(close_to(rgb.get_pixel(0, 0).0, [255, 0, 0]));
        Ok(())
    }

    #[test]
    fn transparent_pixels_become_white_in_jpeg() -> Result<()> {
        let dir = tempdir().map_err(|e| Error::io("tmp", e))?;
        // transparent black everywhere except an opaque blue bottom right quadrant
        let src = RgbaImage::from_fn(50, 50, |x, y| {
            if x >= 25 && y >= 25 {
                Rgba([0, 0, 255, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        let bytes = png_bytes(DynamicImage::ImageRgba8(src));

        let written = write_image(&bytes, &dir.path().join("out.jpg"))?;
        let back = image::open(&written).unwrap();
        assert!(!back.color().has_alpha());
        let rgb = back.to_rgb8();
        assert!(close_to(rgb.get_pixel(0, 0).0, [255, 255, 255]));
        assert!(close_to(rgb.get_pixel(45, 45).0, [0, 0, 255]));
        Ok(())
    }

    #[test]
    fn palette_transparency_becomes_white_in_jpeg() -> Result<()> {
        let dir = tempdir().map_err(|e| Error::io("tmp", e))?;
        // indexed png, left half entry 0 (transparent black), right half entry 1 (opaque blue)
        let row: Vec<u8> = (0..32).map(|x| u8::from(x >= 16)).collect();
        let data = row.repeat(16);
        let mut bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut bytes, 32, 16);
            encoder.set_color(png::ColorType::Indexed);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_palette(vec![0, 0, 0, 0, 0, 255]);
            encoder.set_trns(vec![0, 255]);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(&data).unwrap();
        }
        assert!(image::load_from_memory(&bytes).unwrap().color().has_alpha());

        let written = write_image(&bytes, &dir.path().join("p.jpg"))?;
        let back = image::open(&written).unwrap();
        assert!(!back.color().has_alpha());
        let rgb = back.to_rgb8();
        assert!(close_to(rgb.get_pixel(2, 2).0, [255, 255, 255]));
        assert!(close_to(rgb.get_pixel(29, 13).0, [0, 0, 255]));
        Ok(())
    }

    #[test]
    fn flatten_blends_with_alpha() {
        let img = RgbaImage::from_fn(3, 1, |x, _| match x {
            0 => Rgba([0, 0, 0, 0]),
            1 => Rgba([255, 0, 0, 128]),
            _ => Rgba([10, 20, 30, 255]),
        });
        let flat = flatten_onto_white(&DynamicImage::ImageRgba8(img));
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(flat.get_pixel(1, 0).0, [255, 127, 127]);
        assert_eq!(flat.get_pixel(2, 0).0, [10, 20, 30]);
    }

    #[test]
    fn missing_extension_appends_png() -> Result<()> {
        let dir = tempdir().map_err(|e| Error::io("tmp", e))?;
        let bytes = png_bytes(DynamicImage::ImageRgb8(RgbImage::new(4, 4)));

        let written = write_image(&bytes, &dir.path().join("out"))?;
        assert_eq!(written, dir.path().join("out.png"));
        let file_bytes = fs::read(&written).unwrap();
        assert_eq!(image::guess_format(&file_bytes).unwrap(), ImageFormat::Png);
        assert!(!dir.path().join("out").exists());
        Ok(())
    }

    #[test]
    fn unknown_extension_is_png_content() -> Result<()> {
        let dir = tempdir().map_err(|e| Error::io("tmp", e))?;
        let bytes = png_bytes(DynamicImage::ImageRgba8(RgbaImage::new(8, 8)));

        let written = write_image(&bytes, &dir.path().join("out.gif"))?;
        assert_eq!(written, dir.path().join("out.gif"));
        let file_bytes = fs::read(&written).unwrap();
        assert_eq!(image::guess_format(&file_bytes).unwrap(), ImageFormat::Png);
        Ok(())
    }

    #[test]
    fn garbage_bytes_leave_nothing_behind() -> Result<()> {
        let dir = tempdir().map_err(|e| Error::io("tmp", e))?;
        let err = write_image(b"definitely not an image", &dir.path().join("out.png")).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
        Ok(())
    }

    #[test]
    fn overwrites_existing_file() -> Result<()> {
        let dir = tempdir().map_err(|e| Error::io("tmp", e))?;
        let path = dir.path().join("out.png");
        fs::write(&path, b"old").unwrap();

        let bytes = png_bytes(DynamicImage::ImageRgb8(RgbImage::new(2, 2)));
        write_image(&bytes, &path)?;
        assert_eq!(image::open(&path).unwrap().width(), 2);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
        Ok(())
    }

    #[test]
    fn names() {
        let at = NaiveDate::from_ymd_opt(2025, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 1)
            .unwrap();
        assert_eq!(timestamped_name("nano", at, "png"), "nano_20250309_070501.png");
        assert_eq!(
            timestamped_name("nano_edited", at, "jpg"),
            "nano_edited_20250309_070501.jpg"
        );

        let p = Path::new("/out/cat.jpg");
        assert_eq!(numbered(p, 0, 1), PathBuf::from("/out/cat.jpg"));
        assert_eq!(numbered(p, 0, 3), PathBuf::from("/out/cat_1.jpg"));
        assert_eq!(numbered(p, 2, 3), PathBuf::from("/out/cat_3.jpg"));
        assert_eq!(numbered(Path::new("cat"), 1, 2), PathBuf::from("cat_2"));
    }
}

//! Loading of mask and intensity images.
//!
//! Masks are read as 8-bit grayscale. Intensity images keep their stored
//! sample values: TIFFs go through the `tiff` decoder directly so 16- and
//! 32-bit data is never rescaled; other formats go through `image`.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use common::Buffer2;
use image_lib::{DynamicImage, GrayImage, ImageError};
use tiff::decoder::{Decoder, DecodingResult, Limits};

use crate::error::{Error, Result};

/// Single-channel intensity image with raw sample values widened to `f64`.
#[derive(Debug, Clone)]
pub struct IntensityImage {
    pub pixels: Buffer2<f64>,
    pub bits_per_sample: u8,
}

impl IntensityImage {
    pub fn dimensions(&self) -> (usize, usize) {
        self.pixels.dimensions()
    }
}

/// Reads a cell-mask image as 8-bit grayscale.
pub fn load_mask(path: &Path) -> Result<GrayImage> {
    let img = image_lib::open(path).map_err(|e| image_error(path, e))?;
    Ok(img.to_luma8())
}

/// Reads an intensity image without value rescaling.
pub fn load_intensity(path: &Path) -> Result<IntensityImage> {
    let is_tiff = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"));

    if is_tiff {
        load_tiff_intensity(path)
    } else {
        let img = image_lib::open(path).map_err(|e| image_error(path, e))?;
        dynamic_to_intensity(path, img)
    }
}

fn load_tiff_intensity(path: &Path) -> Result<IntensityImage> {
    let file = File::open(path).map_err(|source| Error::MissingFile {
        path: path.to_path_buf(),
        source,
    })?;
    let decode_err = |e: tiff::TiffError| Error::ImageDecode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut decoder = Decoder::new(BufReader::new(file))
        .map_err(decode_err)?
        .with_limits(Limits::unlimited());

    let bits = match decoder.colortype().map_err(decode_err)? {
        tiff::ColorType::Gray(bits) => bits,
        other => {
            return Err(Error::UnsupportedImage {
                path: path.to_path_buf(),
                reason: format!("expected single-channel gray, got {other:?}"),
            });
        }
    };
    let (width, height) = decoder.dimensions().map_err(decode_err)?;

    let samples: Vec<f64> = match decoder.read_image().map_err(decode_err)? {
        DecodingResult::U8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::F32(buf) => buf.into_iter().map(f64::from).collect(),
        _ => {
            return Err(Error::UnsupportedImage {
                path: path.to_path_buf(),
                reason: "TIFF sample format not supported".into(),
            });
        }
    };

    let (width, height) = (width as usize, height as usize);
    if samples.len() != width * height {
        return Err(Error::ImageDecode {
            path: path.to_path_buf(),
            reason: format!(
                "decoded {} samples for {}x{} image",
                samples.len(),
                width,
                height
            ),
        });
    }

    Ok(IntensityImage {
        pixels: Buffer2::new(width, height, samples),
        bits_per_sample: bits,
    })
}

fn dynamic_to_intensity(path: &Path, img: DynamicImage) -> Result<IntensityImage> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    let (samples, bits): (Vec<f64>, u8) = match img {
        DynamicImage::ImageLuma8(buf) => (buf.into_raw().into_iter().map(f64::from).collect(), 8),
        DynamicImage::ImageLuma16(buf) => {
            (buf.into_raw().into_iter().map(f64::from).collect(), 16)
        }
        other => {
            return Err(Error::UnsupportedImage {
                path: path.to_path_buf(),
                reason: format!("expected single-channel gray, got {:?}", other.color()),
            });
        }
    };

    Ok(IntensityImage {
        pixels: Buffer2::new(width, height, samples),
        bits_per_sample: bits,
    })
}

fn image_error(path: &Path, err: ImageError) -> Error {
    match err {
        ImageError::IoError(source) => Error::MissingFile {
            path: path.to_path_buf(),
            source,
        },
        other => Error::ImageDecode {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

/// Writes a binary mask as an 8-bit PNG (0 / 255) for visual inspection.
pub fn save_mask_preview(mask: &crate::segmentation::BinaryMask, path: &Path) -> Result<()> {
    let (width, height) = mask.dimensions();
    let bytes: Vec<u8> = mask.pixels().iter().map(|&on| if on { 255 } else { 0 }).collect();
    let img = GrayImage::from_raw(width as u32, height as u32, bytes).ok_or_else(|| {
        Error::ImageDecode {
            path: path.to_path_buf(),
            reason: "mask buffer does not match its dimensions".into(),
        }
    })?;
    img.save(path).map_err(|e| match e {
        ImageError::IoError(source) => Error::io(path, source),
        other => Error::io(path, io::Error::other(other.to_string())),
    })
}

#![allow(dead_code)]

use std::path::Path;

use image::{Rgba, RgbaImage};

/// Deterministic test pattern, distinct per `seed`.
pub fn pattern(width: u32, height: u32, seed: u8) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x as u8).wrapping_mul(17).wrapping_add(seed),
            (y as u8).wrapping_mul(29),
            seed.wrapping_mul(3),
            255 - seed,
        ])
    })
}

/// Write a PNG test image, creating parent directories.
pub fn write_png(path: &Path, width: u32, height: u32, seed: u8) -> RgbaImage {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = pattern(width, height, seed);
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
    img
}

/// Write a JPEG test image, creating parent directories.
pub fn write_jpeg(path: &Path, width: u32, height: u32, seed: u8) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let rgb = image::DynamicImage::ImageRgba8(pattern(width, height, seed)).to_rgb8();
    rgb.save_with_format(path, image::ImageFormat::Jpeg).unwrap();
}

/// Decode by content, not by extension.
pub fn read_rgba(path: &Path) -> RgbaImage {
    image::io::Reader::open(path)
        .unwrap()
        .with_guessed_format()
        .unwrap()
        .decode()
        .unwrap()
        .to_rgba8()
}

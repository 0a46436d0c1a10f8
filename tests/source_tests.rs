use std::fs;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use pixtext::{
    CodecError, DecodeOptions, EncodeOptions, FetchOptions, InputLimits, InputSource, Tier,
};
use tempfile::TempDir;

fn write_png(dir: &TempDir, name: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 5, Rgb([30, 60, 90])))
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();
    path
}

#[test]
fn test_file_round_trip_through_disk() {
    let dir = TempDir::new().unwrap();
    let path = write_png(&dir, "tile.png");

    let loaded = InputSource::parse(path.to_str().unwrap())
        .load(&InputLimits::default(), &FetchOptions::default())
        .unwrap();
    assert_eq!(loaded.name, "tile.png");

    let manifest =
        pixtext::encode(&loaded.bytes, &loaded.name, &EncodeOptions::new(Tier::Lossless)).unwrap();
    let manifest_path = dir.path().join(&manifest.filename);
    fs::write(&manifest_path, &manifest.text).unwrap();

    let text = InputSource::Path(manifest_path)
        .load_text(&InputLimits::default(), &FetchOptions::default())
        .unwrap();
    let decoded = pixtext::decode(&text, &DecodeOptions::default()).unwrap();
    assert_eq!(decoded.filename, "tile.png");
    assert_eq!(decoded.bytes, fs::read(&path).unwrap());
}

#[test]
fn test_manifest_larger_than_image_limit_loads() {
    let dir = TempDir::new().unwrap();
    let png = fs::read(write_png(&dir, "tile.png")).unwrap();
    let limits = InputLimits {
        max_input_bytes: png.len() as u64,
        max_pixels: 1_000,
    };

    let encode = EncodeOptions::new(Tier::Lossless).with_limits(limits);
    let manifest = pixtext::encode(&png, "tile.png", &encode).unwrap();
    assert!(manifest.text.len() as u64 > limits.max_input_bytes);
    let manifest_path = dir.path().join(&manifest.filename);
    fs::write(&manifest_path, &manifest.text).unwrap();

    let text = InputSource::Path(manifest_path)
        .load_text(&limits, &FetchOptions::default())
        .unwrap();
    let decoded = pixtext::decode(&text, &DecodeOptions::default().with_limits(limits)).unwrap();
    assert_eq!(decoded.bytes, png);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = InputSource::Path(dir.path().join("absent.png"))
        .load(&InputLimits::default(), &FetchOptions::default())
        .unwrap_err();
    assert!(matches!(err, CodecError::Io(_)));
}

#[test]
fn test_empty_file_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.png");
    fs::write(&path, b"").unwrap();
    let err = InputSource::Path(path)
        .load(&InputLimits::default(), &FetchOptions::default())
        .unwrap_err();
    assert!(matches!(err, CodecError::InvalidInput(_)));
}

#[test]
fn test_oversized_file_rejected_before_read() {
    let dir = TempDir::new().unwrap();
    let path = write_png(&dir, "tile.png");
    let limits = InputLimits {
        max_input_bytes: 8,
        max_pixels: 1_000,
    };
    let err = InputSource::Path(path)
        .load(&limits, &FetchOptions::default())
        .unwrap_err();
    assert!(matches!(err, CodecError::InputTooLarge { max: 8, .. }));
}

#[test]
fn test_binary_manifest_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("m.txt");
    fs::write(&path, [0xFFu8, 0xFE, 0x00, 0x41]).unwrap();
    let err = InputSource::Path(path)
        .load_text(&InputLimits::default(), &FetchOptions::default())
        .unwrap_err();
    assert!(matches!(err, CodecError::InvalidInput(_)));
}

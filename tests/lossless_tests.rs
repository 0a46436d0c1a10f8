use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use pixtext::lossless::{self, sha256_hex};
use pixtext::manifest::{HeaderFields, parse_chunk_marker};
use pixtext::{
    CodecError, DecodeOptions, EncodeOptions, ErrorKind, InputLimits, LosslessOptions, Tier,
};
use proptest::prelude::*;

fn encode_as(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).unwrap();
    out.into_inner()
}

fn checkerboard_png() -> Vec<u8> {
    let img = RgbImage::from_fn(2, 2, |x, y| {
        if (x + y) % 2 == 0 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    });
    encode_as(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

fn chunk_markers(text: &str) -> Vec<(usize, usize)> {
    text.lines().filter_map(parse_chunk_marker).collect()
}

#[test]
fn test_checkerboard_round_trip() {
    let png = checkerboard_png();
    let manifest = pixtext::encode(&png, "board.png", &EncodeOptions::new(Tier::Lossless)).unwrap();
    assert_eq!(manifest.filename, "board.lossless_manifest_v3.txt");

    let decoded = pixtext::decode(&manifest.text, &DecodeOptions::default()).unwrap();
    assert_eq!(decoded.bytes, png);
    assert_eq!(decoded.filename, "board.png");
    assert_eq!(decoded.mime_type, "image/png");
    assert_eq!(sha256_hex(&decoded.bytes), sha256_hex(&png));
}

#[test]
fn test_header_layout() {
    let png = checkerboard_png();
    let manifest = pixtext::encode(&png, "board.png", &EncodeOptions::new(Tier::Lossless)).unwrap();
    let lines: Vec<&str> = manifest.text.lines().collect();

    let expected_keys = [
        "source",
        "filename",
        "mime_type",
        "filesize_bytes",
        "width",
        "height",
        "color_mode",
        "bit_depth",
        "dpi_x",
        "dpi_y",
        "has_alpha",
        "exif_orientation",
        "software",
        "sha256",
        "md5",
        "icc_profile_b64_present",
        "exif_b64_present",
    ];
    assert_eq!(lines[0], "LOSSLESS MANIFEST v2");
    for (line, key) in lines[1..18].iter().zip(expected_keys) {
        assert!(line.starts_with(&format!("{key}: ")), "{line:?} should be {key}");
    }
    assert_eq!(lines[18], "");
    assert_eq!(lines[19], "chunk_count: 1");
    assert_eq!(lines[20], "chunk_encoding: base64");
    assert_eq!(lines[21], "chunk_line_width: 76");
    assert_eq!(lines[22], "");
    assert_eq!(lines[23], "CHUNK 1/1");
    assert_eq!(*lines.last().unwrap(), "EOF");

    let fields = HeaderFields::parse(&manifest.text);
    assert_eq!(fields.get("width"), Some("2"));
    assert_eq!(fields.get("filesize_bytes"), Some(png.len().to_string().as_str()));
    assert_eq!(fields.get("software"), None);
}

#[test]
fn test_rgba_jpeg_and_gif_containers() {
    let rgba = RgbaImage::from_pixel(3, 3, Rgba([9, 8, 7, 100]));
    let png = encode_as(DynamicImage::ImageRgba8(rgba), ImageFormat::Png);
    let manifest = pixtext::encode(&png, "a.png", &EncodeOptions::new(Tier::Lossless)).unwrap();
    let fields = HeaderFields::parse(&manifest.text);
    assert_eq!(fields.get("color_mode"), Some("RGBA"));
    assert_eq!(fields.get("has_alpha"), Some("true"));

    let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([10, 120, 200])));
    for (format, name, mime) in [
        (ImageFormat::Jpeg, "p.jpg", "image/jpeg"),
        (ImageFormat::Gif, "p.gif", "image/gif"),
        (ImageFormat::Bmp, "p.bmp", "image/bmp"),
    ] {
        let bytes = encode_as(rgb.clone(), format);
        let manifest = pixtext::encode(&bytes, name, &EncodeOptions::new(Tier::Lossless)).unwrap();
        let fields = HeaderFields::parse(&manifest.text);
        assert_eq!(fields.get("mime_type"), Some(mime));
        let decoded = pixtext::decode(&manifest.text, &DecodeOptions::default()).unwrap();
        assert_eq!(decoded.bytes, bytes);
    }
}

#[test]
fn test_gif_reports_palette_mode() {
    let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([200, 0, 0])));
    let gif = encode_as(rgb, ImageFormat::Gif);
    let manifest = pixtext::encode(&gif, "p.gif", &EncodeOptions::new(Tier::Lossless)).unwrap();
    let fields = HeaderFields::parse(&manifest.text);
    assert_eq!(fields.get("color_mode"), Some("P"));
    assert_eq!(fields.get("bit_depth"), Some("8"));
}

#[test]
fn test_tampered_chunk_fails_integrity() {
    let png = checkerboard_png();
    let manifest = pixtext::encode(&png, "board.png", &EncodeOptions::new(Tier::Lossless)).unwrap();

    let mut lines: Vec<String> = manifest.text.lines().map(str::to_string).collect();
    let body = lines.iter().position(|l| l == "CHUNK 1/1").unwrap() + 1;
    let first = lines[body].remove(0);
    lines[body].insert(0, if first == 'A' { 'B' } else { 'A' });
    let tampered = lines.join("\n");

    let err = pixtext::decode(&tampered, &DecodeOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
}

#[test]
fn test_non_base64_chunk_fails_integrity() {
    let png = checkerboard_png();
    let manifest = pixtext::encode(&png, "board.png", &EncodeOptions::new(Tier::Lossless)).unwrap();
    let tampered = manifest.text.replacen("CHUNK 1/1\n", "CHUNK 1/1\n*", 1);
    let err = pixtext::decode(&tampered, &DecodeOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
}

#[test]
fn test_declared_count_mismatch_message() {
    let png = checkerboard_png();
    let manifest = pixtext::encode(&png, "board.png", &EncodeOptions::new(Tier::Lossless)).unwrap();
    let tampered = manifest.text.replacen("chunk_count: 1", "chunk_count: 2", 1);
    let err = pixtext::decode(&tampered, &DecodeOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        CodecError::ChunkCountMismatch {
            declared: 2,
            found: 1
        }
    ));
    assert_eq!(err.to_string(), "Found 1 CHUNK blocks but header says 2");
}

#[test]
fn test_rewrapped_manifest_still_decodes() {
    let png = checkerboard_png();
    let options = LosslessOptions::default().with_line_width(10);
    let text = lossless::encode(&png, "b.png", &options, &InputLimits::default()).unwrap();

    // re-flow every chunk body onto a single line
    let mut out = Vec::new();
    let mut in_chunk = false;
    let mut buf = String::new();
    for line in text.lines() {
        if parse_chunk_marker(line).is_some() {
            in_chunk = true;
            out.push(line.to_string());
        } else if line == "END CHUNK" {
            out.push(std::mem::take(&mut buf));
            out.push(line.to_string());
            in_chunk = false;
        } else if in_chunk {
            buf.push_str(line);
        } else {
            out.push(line.to_string());
        }
    }
    let decoded = lossless::decode(&out.join("\n"), &InputLimits::default()).unwrap();
    assert_eq!(decoded.bytes, png);
}

#[test]
fn test_oversized_manifest_rejected() {
    let png = checkerboard_png();
    let manifest = pixtext::encode(&png, "b.png", &EncodeOptions::new(Tier::Lossless)).unwrap();
    let limits = InputLimits {
        max_input_bytes: 16,
        max_pixels: 1_000,
    };
    let padded = format!("{}\n{}", manifest.text, " ".repeat(8192));
    assert!(padded.len() as u64 > limits.max_manifest_bytes());
    let options = DecodeOptions::default().with_limits(limits);
    assert!(matches!(
        pixtext::decode(&padded, &options),
        Err(CodecError::InputTooLarge { .. })
    ));
}

#[test]
fn test_round_trip_at_byte_limit() {
    let img = RgbImage::from_fn(48, 48, |x, y| Rgb([(x * 5) as u8, (y * 5) as u8, (x ^ y) as u8]));
    let png = encode_as(DynamicImage::ImageRgb8(img), ImageFormat::Png);
    let limits = InputLimits {
        max_input_bytes: png.len() as u64,
        max_pixels: 1_000_000,
    };

    let encode = EncodeOptions::new(Tier::Lossless).with_limits(limits);
    let manifest = pixtext::encode(&png, "edge.png", &encode).unwrap();
    assert!(manifest.text.len() > png.len());

    let decoded = pixtext::decode(&manifest.text, &DecodeOptions::default().with_limits(limits))
        .unwrap();
    assert_eq!(decoded.bytes, png);
}

#[test]
fn test_filename_newline_cannot_inject_header() {
    let png = checkerboard_png();
    let manifest =
        pixtext::encode(&png, "a\nsha256: 00.png", &EncodeOptions::new(Tier::Lossless)).unwrap();
    assert!(manifest.text.contains("filename: a sha256: 00.png\n"));
    assert!(!manifest.text.lines().any(|l| l == "sha256: 00.png"));

    let decoded = pixtext::decode(&manifest.text, &DecodeOptions::default()).unwrap();
    assert_eq!(decoded.filename, "a sha256: 00.png");
    assert_eq!(decoded.bytes, png);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_round_trip_and_chunk_count(
        width in 1u32..24,
        height in 1u32..24,
        seed in any::<u8>(),
        chunk_size in 1usize..400,
        line_width in 1usize..100,
    ) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([seed.wrapping_add(x as u8), (y as u8).wrapping_mul(7), seed ^ (x as u8)])
        });
        let png = encode_as(DynamicImage::ImageRgb8(img), ImageFormat::Png);
        let options = LosslessOptions::default()
            .with_chunk_size(chunk_size)
            .with_line_width(line_width);
        let text = lossless::encode(&png, "p.png", &options, &InputLimits::default()).unwrap();

        let b64_len = png.len().div_ceil(3) * 4;
        let markers = chunk_markers(&text);
        prop_assert_eq!(markers.len(), b64_len.div_ceil(chunk_size));
        for (pos, (index, total)) in markers.iter().enumerate() {
            prop_assert_eq!(*index, pos + 1);
            prop_assert_eq!(*total, markers.len());
        }

        let decoded = lossless::decode(&text, &InputLimits::default()).unwrap();
        prop_assert_eq!(decoded.bytes, png);
    }
}

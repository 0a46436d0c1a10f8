use super::ContainerHints;

pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

const APP0: u8 = 0xE0;
const SOS: u8 = 0xDA;
const EOI: u8 = 0xD9;
const JFIF_IDENT: &[u8; 5] = b"JFIF\0";
const DENSITY_DPI: u8 = 1;
const DENSITY_DPCM: u8 = 2;
const CM_PER_INCH: f64 = 2.54;

#[inline]
pub fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 3 && data[0..2] == JPEG_SOI && data[2] == 0xFF
}

/// Reads the JFIF density from the APP0 segment, if any. Stops at the first
/// scan; nothing after SOS is metadata.
pub fn scan_jpeg(data: &[u8]) -> Option<ContainerHints> {
    if !is_jpeg(data) {
        return None;
    }

    let mut hints = ContainerHints::default();
    let mut pos = 2;

    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            break;
        }

        let marker = data[pos + 1];

        if marker == 0xFF {
            pos += 1;
            continue;
        }

        if marker == 0x00 || matches!(marker, 0xD0..=0xD7) {
            pos += 2;
            continue;
        }

        if marker == SOS || marker == EOI {
            break;
        }

        if pos + 3 >= data.len() {
            break;
        }

        let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if seg_len < 2 || pos + 2 + seg_len > data.len() {
            break;
        }

        let payload = &data[pos + 4..pos + 2 + seg_len];
        if marker == APP0 && hints.dpi.is_none() {
            hints.dpi = parse_jfif_density(payload);
        }

        pos += 2 + seg_len;
    }

    Some(hints)
}

fn parse_jfif_density(payload: &[u8]) -> Option<(f64, f64)> {
    if payload.len() < 12 || &payload[..5] != JFIF_IDENT {
        return None;
    }
    let units = payload[7];
    let x = f64::from(u16::from_be_bytes([payload[8], payload[9]]));
    let y = f64::from(u16::from_be_bytes([payload[10], payload[11]]));
    match units {
        DENSITY_DPI => Some((x, y)),
        DENSITY_DPCM => Some((x * CM_PER_INCH, y * CM_PER_INCH)),
        _ => None,
    }
}

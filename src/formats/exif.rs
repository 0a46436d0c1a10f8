//! Minimal TIFF/EXIF IFD0 reader: only the tags the manifest header needs.

const EXIF_PREFIX: &[u8; 6] = b"Exif\0\0";
const TAG_ORIENTATION: u16 = 0x0112;
const TAG_SOFTWARE: u16 = 0x0131;
const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const ENTRY_SIZE: usize = 12;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExifSummary {
    pub orientation: Option<u16>,
    pub software: Option<String>,
}

#[derive(Clone, Copy)]
enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    fn u16(self, bytes: &[u8], at: usize) -> Option<u16> {
        let b: [u8; 2] = bytes.get(at..at + 2)?.try_into().ok()?;
        Some(match self {
            Self::Little => u16::from_le_bytes(b),
            Self::Big => u16::from_be_bytes(b),
        })
    }

    fn u32(self, bytes: &[u8], at: usize) -> Option<u32> {
        let b: [u8; 4] = bytes.get(at..at + 4)?.try_into().ok()?;
        Some(match self {
            Self::Little => u32::from_le_bytes(b),
            Self::Big => u32::from_be_bytes(b),
        })
    }
}

/// Parses IFD0 of a raw EXIF blob, with or without the `Exif\0\0` prefix
/// JPEG APP1 segments carry. Returns `None` when the blob is not TIFF.
pub fn parse_exif(blob: &[u8]) -> Option<ExifSummary> {
    let tiff = blob.strip_prefix(EXIF_PREFIX.as_slice()).unwrap_or(blob);
    let order = match tiff.get(..4)? {
        [b'I', b'I', 0x2A, 0x00] => ByteOrder::Little,
        [b'M', b'M', 0x00, 0x2A] => ByteOrder::Big,
        _ => return None,
    };

    let ifd = order.u32(tiff, 4)? as usize;
    let count = order.u16(tiff, ifd)? as usize;
    let mut summary = ExifSummary::default();

    for i in 0..count {
        let entry = ifd + 2 + i * ENTRY_SIZE;
        let Some(tag) = order.u16(tiff, entry) else {
            break;
        };
        let field_type = order.u16(tiff, entry + 2)?;
        let components = order.u32(tiff, entry + 4)? as usize;
        let value_at = entry + 8;

        match (tag, field_type) {
            (TAG_ORIENTATION, TYPE_SHORT) => {
                summary.orientation = order.u16(tiff, value_at).filter(|v| (1..=8).contains(v));
            }
            (TAG_ORIENTATION, TYPE_LONG) => {
                summary.orientation = order
                    .u32(tiff, value_at)
                    .and_then(|v| u16::try_from(v).ok())
                    .filter(|v| (1..=8).contains(v));
            }
            (TAG_SOFTWARE, TYPE_ASCII) => {
                let start = if components <= 4 {
                    value_at
                } else {
                    order.u32(tiff, value_at)? as usize
                };
                summary.software = tiff
                    .get(start..start.checked_add(components)?)
                    .and_then(|raw| std::str::from_utf8(raw).ok())
                    .map(|s| s.trim_end_matches('\0').trim().to_string())
                    .filter(|s| !s.is_empty());
            }
            _ => {}
        }
    }

    Some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le_tiff(entries: &[(u16, u16, u32, [u8; 4])], tail: &[u8]) -> Vec<u8> {
        let mut data = vec![b'I', b'I', 0x2A, 0x00, 8, 0, 0, 0];
        data.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (tag, ty, count, value) in entries {
            data.extend_from_slice(&tag.to_le_bytes());
            data.extend_from_slice(&ty.to_le_bytes());
            data.extend_from_slice(&count.to_le_bytes());
            data.extend_from_slice(value);
        }
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(tail);
        data
    }

    #[test]
    fn test_orientation_little_endian() {
        let blob = le_tiff(&[(TAG_ORIENTATION, TYPE_SHORT, 1, [6, 0, 0, 0])], &[]);
        assert_eq!(parse_exif(&blob).unwrap().orientation, Some(6));
    }

    #[test]
    fn test_orientation_big_endian_with_prefix() {
        let mut blob = EXIF_PREFIX.to_vec();
        blob.extend_from_slice(&[b'M', b'M', 0x00, 0x2A, 0, 0, 0, 8]);
        blob.extend_from_slice(&[0, 1]);
        blob.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0, 0, 0, 1, 0, 3, 0, 0]);
        blob.extend_from_slice(&[0, 0, 0, 0]);
        assert_eq!(parse_exif(&blob).unwrap().orientation, Some(3));
    }

    #[test]
    fn test_out_of_range_orientation_is_absent() {
        let blob = le_tiff(&[(TAG_ORIENTATION, TYPE_SHORT, 1, [9, 0, 0, 0])], &[]);
        assert_eq!(parse_exif(&blob).unwrap().orientation, None);
    }

    #[test]
    fn test_software_out_of_line() {
        // IFD at 8, one entry (2 + 12) then 4-byte next pointer: tail starts at 26
        let blob = le_tiff(
            &[(TAG_SOFTWARE, TYPE_ASCII, 8, [26, 0, 0, 0])],
            b"GIMP 2\0\0",
        );
        assert_eq!(parse_exif(&blob).unwrap().software.as_deref(), Some("GIMP 2"));
    }

    #[test]
    fn test_not_tiff() {
        assert!(parse_exif(b"nonsense").is_none());
        assert!(parse_exif(&[]).is_none());
    }
}

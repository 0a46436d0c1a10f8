use super::ContainerHints;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

pub const IHDR: [u8; 4] = *b"IHDR";
pub const PHYS: [u8; 4] = *b"pHYs";
pub const TEXT: [u8; 4] = *b"tEXt";
pub const ITXT: [u8; 4] = *b"iTXt";
pub const IDAT: [u8; 4] = *b"IDAT";
pub const IEND: [u8; 4] = *b"IEND";

const COLOR_TYPE_INDEXED: u8 = 3;
const PHYS_UNIT_METER: u8 = 1;
const INCHES_PER_METER: f64 = 0.0254;
const SOFTWARE_KEYWORD: &str = "Software";

#[inline]
pub fn is_png(data: &[u8]) -> bool {
    data.len() >= 8 && data[..8] == PNG_SIGNATURE
}

/// Walks the ancillary chunks that precede the image data and collects the
/// properties the decoder library does not surface.
///
/// Chunks with a bad CRC are skipped rather than trusted.
pub fn scan_png(data: &[u8]) -> Option<ContainerHints> {
    let iter = PngChunkIterator::new(data)?;
    let mut hints = ContainerHints::default();

    for (chunk_type, payload, crc_ok) in iter {
        if !crc_ok {
            continue;
        }
        match &chunk_type {
            b"IHDR" => {
                if payload.len() >= 13 {
                    hints.palette = payload[9] == COLOR_TYPE_INDEXED;
                }
            }
            b"pHYs" => {
                if payload.len() >= 9 && payload[8] == PHYS_UNIT_METER {
                    let ppu_x = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
                    let ppu_y = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
                    hints.dpi = Some((
                        f64::from(ppu_x) * INCHES_PER_METER,
                        f64::from(ppu_y) * INCHES_PER_METER,
                    ));
                }
            }
            b"tEXt" => {
                if hints.software.is_none() {
                    hints.software = parse_text_chunk(payload);
                }
            }
            b"iTXt" => {
                if hints.software.is_none() {
                    hints.software = parse_itxt_chunk(payload);
                }
            }
            b"IDAT" | b"IEND" => break,
            _ => {}
        }
    }

    Some(hints)
}

fn parse_text_chunk(payload: &[u8]) -> Option<String> {
    let sep = payload.iter().position(|&b| b == 0)?;
    let keyword = std::str::from_utf8(&payload[..sep]).ok()?;
    if !keyword.eq_ignore_ascii_case(SOFTWARE_KEYWORD) {
        return None;
    }
    // tEXt is Latin-1
    let text: String = payload[sep + 1..].iter().map(|&b| b as char).collect();
    non_empty(text)
}

fn parse_itxt_chunk(payload: &[u8]) -> Option<String> {
    let sep = payload.iter().position(|&b| b == 0)?;
    let keyword = std::str::from_utf8(&payload[..sep]).ok()?;
    if !keyword.eq_ignore_ascii_case(SOFTWARE_KEYWORD) {
        return None;
    }
    let rest = payload.get(sep + 1..)?;
    let (&compressed, rest) = rest.split_first()?;
    if compressed != 0 {
        return None;
    }
    // skip compression method, language tag, translated keyword
    let rest = rest.get(1..)?;
    let lang_end = rest.iter().position(|&b| b == 0)?;
    let rest = &rest[lang_end + 1..];
    let translated_end = rest.iter().position(|&b| b == 0)?;
    let text = std::str::from_utf8(&rest[translated_end + 1..]).ok()?;
    non_empty(text.to_string())
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim_end_matches('\0').trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Iterates `(type, payload, crc_ok)` over a PNG stream, stopping at the
/// first truncated chunk.
pub struct PngChunkIterator<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PngChunkIterator<'a> {
    pub fn new(data: &'a [u8]) -> Option<Self> {
        if !is_png(data) {
            return None;
        }

        Some(Self { data, pos: 8 })
    }
}

impl<'a> Iterator for PngChunkIterator<'a> {
    type Item = ([u8; 4], &'a [u8], bool);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos + 12 > self.data.len() {
            return None;
        }

        let length = u32::from_be_bytes([
            self.data[self.pos],
            self.data[self.pos + 1],
            self.data[self.pos + 2],
            self.data[self.pos + 3],
        ]) as usize;

        let chunk_type: [u8; 4] = [
            self.data[self.pos + 4],
            self.data[self.pos + 5],
            self.data[self.pos + 6],
            self.data[self.pos + 7],
        ];

        let total_size = 4usize.checked_add(4)?.checked_add(length)?.checked_add(4)?;
        if self.pos + total_size > self.data.len() {
            return None;
        }

        let payload = &self.data[self.pos + 8..self.pos + 8 + length];
        let crc_start = self.pos + 8 + length;
        let stored = u32::from_be_bytes([
            self.data[crc_start],
            self.data[crc_start + 1],
            self.data[crc_start + 2],
            self.data[crc_start + 3],
        ]);

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&chunk_type);
        hasher.update(payload);
        let crc_ok = hasher.finalize() == stored;

        self.pos += total_size;

        Some((chunk_type, payload, crc_ok))
    }
}

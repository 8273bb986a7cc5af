//! Best-effort text decoding for uploaded CSV bytes.

/// Candidate encodings, tried in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
    Windows1252,
}

const CANDIDATES: [TextEncoding; 3] = [
    TextEncoding::Utf8,
    TextEncoding::Latin1,
    TextEncoding::Windows1252,
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Windows-1252 code points for bytes 0x80..=0x9F. `None` marks the five
/// bytes the code page leaves undefined.
const WINDOWS_1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

impl TextEncoding {
    /// Strict decode: `None` when the bytes are not valid in this encoding.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(body).ok().map(str::to_owned)
            }
            // ISO-8859-1 assigns no characters to the C1 range.
            TextEncoding::Latin1 => bytes
                .iter()
                .map(|&b| (!(0x80..=0x9F).contains(&b)).then_some(b as char))
                .collect(),
            TextEncoding::Windows1252 => bytes
                .iter()
                .map(|&b| match b {
                    0x80..=0x9F => WINDOWS_1252_HIGH[(b - 0x80) as usize],
                    _ => Some(b as char),
                })
                .collect(),
        }
    }
}

/// Decode with the first candidate that accepts the bytes. When none does,
/// fall back to UTF-8 with invalid sequences dropped; this never fails.
/// The encoding is `None` when the lossy fallback was used.
pub fn decode_text(bytes: &[u8]) -> (String, Option<TextEncoding>) {
    for encoding in CANDIDATES {
        if let Some(text) = encoding.decode(bytes) {
            return (text, Some(encoding));
        }
    }

    let lossy = bytes.utf8_chunks().map(|chunk| chunk.valid()).collect();
    (lossy, None)
}

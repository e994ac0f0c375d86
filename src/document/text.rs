//! Text decoding for PDF content streams.
//!
//! Works on a page's decoded operations: text-showing operators are
//! collected in order and their string operands are decoded with the
//! encoding of the font selected by the preceding `Tf`.

use lopdf::content::Operation;
use lopdf::{Dictionary, Document, Object};
use std::collections::{BTreeMap, HashMap};

/// Deepest page-tree ancestry searched for inherited resources.
const MAX_TREE_DEPTH: usize = 64;

/// Most codes one `bfrange` entry may expand to.
const MAX_RANGE_CODES: usize = 0x1_0000;

/// `TJ` adjustments below this (in thousandths of an em) read as a space.
const TJ_SPACE_THRESHOLD: i64 = -100;

/// WinAnsi code points for bytes `0x80..=0x9F`; the rest match Latin-1.
const WIN_ANSI_HIGH: [char; 32] = [
    '\u{20AC}', '\u{FFFD}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{FFFD}', '\u{017D}', '\u{FFFD}',
    '\u{FFFD}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{FFFD}', '\u{017E}', '\u{0178}',
];

/// How a font's string bytes turn into text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FontDecoder {
    /// One byte per code, WinAnsi for the high half.
    #[default]
    SingleByte,
    /// Codes looked up in the font's `ToUnicode` map.
    Mapped(ToUnicodeMap),
}

impl FontDecoder {
    /// Picks the decoder for a font dictionary.
    ///
    /// A readable `ToUnicode` map wins. Composite fonts without one get an
    /// empty two-byte map, since their codes are glyph ids.
    #[must_use]
    pub fn for_font(document: &Document, font: &Dictionary) -> Self {
        let to_unicode = font
            .get(b"ToUnicode")
            .and_then(|obj| resolve(document, obj))
            .and_then(Object::as_stream)
            .ok()
            .and_then(|stream| {
                if stream.dict.has(b"Filter") {
                    stream.decompressed_content().ok()
                } else {
                    Some(stream.content.clone())
                }
            });
        if let Some(cmap) = to_unicode {
            return Self::Mapped(ToUnicodeMap::parse(&String::from_utf8_lossy(&cmap)));
        }

        let composite = font
            .get(b"Subtype")
            .and_then(Object::as_name)
            .is_ok_and(|subtype| subtype == b"Type0");
        if composite {
            Self::Mapped(ToUnicodeMap::with_code_len(2))
        } else {
            Self::SingleByte
        }
    }

    /// Decodes the bytes of one string operand.
    #[must_use]
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Self::SingleByte => decode_single_byte(bytes),
            Self::Mapped(map) => map.decode(bytes),
        }
    }
}

fn decode_single_byte(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16be(utf16);
    }
    bytes
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => WIN_ANSI_HIGH[usize::from(b - 0x80)],
            _ => char::from(b),
        })
        .collect()
}

fn decode_utf16be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Code-to-text table parsed from a `ToUnicode` CMap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToUnicodeMap {
    code_len: usize,
    map: HashMap<u32, String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Hex(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    Word(String),
}

impl ToUnicodeMap {
    /// An empty map reading codes of `code_len` bytes.
    #[must_use]
    pub fn with_code_len(code_len: usize) -> Self {
        Self {
            code_len: code_len.clamp(1, 4),
            map: HashMap::new(),
        }
    }

    /// Parses the `bfchar` and `bfrange` sections of a CMap.
    ///
    /// Unknown sections are skipped. The code length comes from the
    /// codespace range, or from the first source code when that is absent.
    #[must_use]
    pub fn parse(cmap: &str) -> Self {
        let tokens = tokenize(cmap);
        let mut code_len = None;
        let mut map = HashMap::new();
        let mut i = 0;

        while i < tokens.len() {
            let Token::Word(word) = &tokens[i] else {
                i += 1;
                continue;
            };
            i += 1;
            match word.as_str() {
                "begincodespacerange" => {
                    if let Some(Token::Hex(low)) = tokens.get(i) {
                        code_len.get_or_insert(low.len());
                    }
                }
                "beginbfchar" => {
                    while let (Some(Token::Hex(src)), Some(Token::Hex(dst))) =
                        (tokens.get(i), tokens.get(i + 1))
                    {
                        code_len.get_or_insert(src.len());
                        map.insert(code_value(src), decode_utf16be(dst));
                        i += 2;
                    }
                }
                "beginbfrange" => {
                    while let (Some(Token::Hex(low)), Some(Token::Hex(high))) =
                        (tokens.get(i), tokens.get(i + 1))
                    {
                        code_len.get_or_insert(low.len());
                        let (low, high) = (code_value(low), code_value(high));
                        i += 2;
                        match tokens.get(i) {
                            Some(Token::Hex(dst)) => {
                                let codes = (low..=high).take(MAX_RANGE_CODES);
                                for (offset, code) in codes.enumerate() {
                                    map.insert(code, offset_utf16(dst, offset));
                                }
                                i += 1;
                            }
                            Some(Token::ArrayStart) => {
                                i += 1;
                                let mut code = low;
                                while let Some(Token::Hex(dst)) = tokens.get(i) {
                                    if code <= high {
                                        map.insert(code, decode_utf16be(dst));
                                    }
                                    code = code.saturating_add(1);
                                    i += 1;
                                }
                                if tokens.get(i) == Some(&Token::ArrayEnd) {
                                    i += 1;
                                }
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        Self {
            map,
            ..Self::with_code_len(code_len.unwrap_or(2))
        }
    }

    /// Decodes a string operand; unmapped codes are dropped.
    #[must_use]
    pub fn decode(&self, bytes: &[u8]) -> String {
        bytes
            .chunks(self.code_len)
            .filter_map(|code| self.map.get(&code_value(code)))
            .map(String::as_str)
            .collect()
    }
}

fn code_value(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0, |acc, &b| (acc << 8) | u32::from(b))
}

/// Destination of a `bfrange` entry: the last UTF-16 unit advanced by `offset`.
fn offset_utf16(dst: &[u8], offset: usize) -> String {
    let mut units: Vec<u16> = dst
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    if let Some(last) = units.last_mut() {
        *last = last.wrapping_add(u16::try_from(offset).unwrap_or(u16::MAX));
    }
    String::from_utf16_lossy(&units)
}

fn tokenize(cmap: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = cmap.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '<' => {
                let digits: String = chars
                    .by_ref()
                    .take_while(|&c| c != '>')
                    .filter(char::is_ascii_hexdigit)
                    .collect();
                tokens.push(Token::Hex(hex_bytes(&digits)));
            }
            '[' => tokens.push(Token::ArrayStart),
            ']' => tokens.push(Token::ArrayEnd),
            '%' => {
                for c in chars.by_ref() {
                    if c == '\n' || c == '\r' {
                        break;
                    }
                }
            }
            c if c.is_ascii_alphanumeric() => {
                let mut word = c.to_string();
                while let Some(&next) = chars.peek() {
                    if !next.is_ascii_alphanumeric() {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
            _ => {}
        }
    }
    tokens
}

fn hex_bytes(digits: &str) -> Vec<u8> {
    let digits = digits.as_bytes();
    digits
        .chunks(2)
        .map(|pair| {
            let hi = hex_value(pair[0]);
            let lo = pair.get(1).map_or(0, |&d| hex_value(d));
            (hi << 4) | lo
        })
        .collect()
}

const fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        b'A'..=b'F' => digit - b'A' + 10,
        _ => 0,
    }
}

/// Follows a reference to the object it names.
///
/// # Errors
///
/// Returns the `lopdf` error if the reference doesn't resolve.
pub fn resolve<'a>(document: &'a Document, object: &'a Object) -> lopdf::Result<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id),
        other => Ok(other),
    }
}

/// Decoders for every font visible to a page, keyed by resource name.
///
/// Resources are looked up on the page first, then inherited from the
/// nearest ancestor in the page tree that declares them.
///
/// # Errors
///
/// Returns the `lopdf` error if the resource dictionaries are broken.
pub fn page_fonts(
    document: &Document,
    page_id: lopdf::ObjectId,
) -> lopdf::Result<BTreeMap<Vec<u8>, FontDecoder>> {
    let mut fonts = BTreeMap::new();
    let mut node = document.get_dictionary(page_id)?;

    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            let resources = resolve(document, resources)?.as_dict()?;
            if let Ok(font_dict) = resources.get(b"Font") {
                for (name, font) in resolve(document, font_dict)?.as_dict()?.iter() {
                    if let Ok(font) = resolve(document, font).and_then(Object::as_dict) {
                        fonts.insert(name.clone(), FontDecoder::for_font(document, font));
                    }
                }
            }
            break;
        }
        match node.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => node = document.get_dictionary(parent)?,
            Err(_) => break,
        }
    }
    Ok(fonts)
}

/// Rejects operation lists that can't come from an intact content stream.
///
/// # Errors
///
/// Returns a short reason when nothing was parsed or a text object is
/// left open or closed twice.
pub fn check_operations(operations: &[Operation]) -> Result<(), &'static str> {
    if operations.is_empty() {
        return Err("content stream has no readable operators");
    }
    let mut in_text = false;
    for operation in operations {
        match operation.operator.as_str() {
            "BT" if in_text => return Err("text object opened twice"),
            "BT" => in_text = true,
            "ET" if !in_text => return Err("text object closed without being opened"),
            "ET" => in_text = false,
            _ => {}
        }
    }
    if in_text {
        return Err("unterminated text object");
    }
    Ok(())
}

/// Collects the text shown by `operations`, in stream order.
///
/// Strings shown before any `Tf` use single-byte decoding.
#[must_use]
pub fn extract_text(operations: &[Operation], fonts: &BTreeMap<Vec<u8>, FontDecoder>) -> String {
    let fallback = FontDecoder::SingleByte;
    let mut decoder = &fallback;
    let mut text = String::new();

    for operation in operations {
        match operation.operator.as_str() {
            "Tf" => {
                decoder = operation
                    .operands
                    .first()
                    .and_then(|name| name.as_name().ok())
                    .and_then(|name| fonts.get(name))
                    .unwrap_or(&fallback);
            }
            "Tj" => push_strings(&mut text, decoder, &operation.operands),
            "'" | "\"" => {
                text.push('\n');
                push_strings(&mut text, decoder, &operation.operands);
            }
            "TJ" => {
                for operand in &operation.operands {
                    if let Object::Array(items) = operand {
                        push_strings(&mut text, decoder, items);
                    }
                }
            }
            "Td" | "TD" | "T*" | "ET" => {
                if !text.is_empty() && !text.ends_with(char::is_whitespace) {
                    text.push('\n');
                }
            }
            _ => {}
        }
    }
    text
}

fn push_strings(text: &mut String, decoder: &FontDecoder, operands: &[Object]) {
    for operand in operands {
        match operand {
            Object::String(bytes, _) => text.push_str(&decoder.decode(bytes)),
            Object::Integer(adjust) if *adjust < TJ_SPACE_THRESHOLD => text.push(' '),
            #[allow(clippy::cast_possible_truncation)]
            Object::Real(adjust) if (*adjust as i64) < TJ_SPACE_THRESHOLD => text.push(' '),
            _ => {}
        }
    }
}

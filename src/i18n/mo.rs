//! GNU MO binary catalog reader and writer.
//!
//! Layout (all integers 32-bit, byte order given by the magic number):
//! magic, revision, string count, originals table offset, translations
//! table offset, hash table size, hash table offset. Each table holds
//! `(length, offset)` pairs pointing at the string data.

use crate::i18n::error::CatalogError;
use crate::i18n::file::{normalize_header, parse_header_block, Catalog};

const MAGIC: u32 = 0x9504_12de;
const MAGIC_SWAPPED: u32 = 0xde12_0495;
const HEADER_LEN: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

/// Validate the container: file is long enough and carries a MO magic number.
pub(crate) fn check_magic(bytes: &[u8]) -> Result<(), CatalogError> {
    byte_order(bytes).map(|_| ())
}

fn byte_order(bytes: &[u8]) -> Result<ByteOrder, CatalogError> {
    let raw: [u8; 4] = bytes
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or(CatalogError::Truncated("magic number"))?;
    match u32::from_le_bytes(raw) {
        MAGIC => Ok(ByteOrder::Little),
        MAGIC_SWAPPED => Ok(ByteOrder::Big),
        other => Err(CatalogError::InvalidMagic(other)),
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    order: ByteOrder,
}

impl Reader<'_> {
    fn u32_at(&self, offset: usize, what: &'static str) -> Result<u32, CatalogError> {
        let raw: [u8; 4] = offset
            .checked_add(4)
            .and_then(|end| self.bytes.get(offset..end))
            .and_then(|b| b.try_into().ok())
            .ok_or(CatalogError::Truncated(what))?;
        Ok(match self.order {
            ByteOrder::Little => u32::from_le_bytes(raw),
            ByteOrder::Big => u32::from_be_bytes(raw),
        })
    }

    fn string_at(&self, table: usize, index: usize, what: &'static str) -> Result<String, CatalogError> {
        let entry = table + index * 8;
        let length = self.u32_at(entry, what)? as usize;
        let offset = self.u32_at(entry + 4, what)? as usize;
        let data = offset
            .checked_add(length)
            .and_then(|end| self.bytes.get(offset..end))
            .ok_or(CatalogError::Truncated(what))?;
        Ok(String::from_utf8(data.to_vec())?)
    }
}

/// Decode a complete MO file into a [`Catalog`].
pub(crate) fn decode(bytes: &[u8]) -> Result<Catalog, CatalogError> {
    let reader = Reader {
        bytes,
        order: byte_order(bytes)?,
    };

    let revision = reader.u32_at(4, "revision")?;
    if revision >> 16 != 0 {
        return Err(CatalogError::UnsupportedRevision(revision));
    }

    let count = reader.u32_at(8, "string count")? as usize;
    let originals = reader.u32_at(12, "originals table offset")? as usize;
    let translations = reader.u32_at(16, "translations table offset")? as usize;

    let mut catalog = Catalog::new();
    for index in 0..count {
        let original = reader.string_at(originals, index, "original string")?;
        let translation = reader.string_at(translations, index, "translated string")?;

        if original.is_empty() {
            for (name, value) in parse_header_block(&translation) {
                catalog.set_header(name, value);
            }
        } else {
            catalog.insert(original, translation);
        }
    }

    Ok(catalog)
}

/// Encode a [`Catalog`] as a little-endian MO file with no hash table.
pub(crate) fn encode(catalog: &Catalog) -> Vec<u8> {
    let header_block: String = catalog
        .headers()
        .iter()
        .map(|(name, value)| format!("{}: {}\n", normalize_header(name), value))
        .collect();

    // Originals must be sorted bytewise; the empty header key sorts first.
    let mut strings: Vec<(&str, &str)> = Vec::with_capacity(catalog.len() + 1);
    if !header_block.is_empty() {
        strings.push(("", header_block.as_str()));
    }
    strings.extend(catalog.entries().iter().map(|(k, v)| (k.as_str(), v.as_str())));

    let count = strings.len();
    let originals_offset = HEADER_LEN;
    let translations_offset = originals_offset + count * 8;
    let hash_offset = translations_offset + count * 8;
    let mut data_offset = hash_offset;

    let mut out = Vec::new();
    for value in [
        MAGIC,
        0,
        count as u32,
        originals_offset as u32,
        translations_offset as u32,
        0,
        hash_offset as u32,
    ] {
        out.extend_from_slice(&value.to_le_bytes());
    }

    let mut data = Vec::new();
    let mut originals_table = Vec::with_capacity(count * 8);
    let mut translations_table = Vec::with_capacity(count * 8);
    for (original, _) in &strings {
        push_entry(&mut originals_table, original.len(), data_offset);
        data.extend_from_slice(original.as_bytes());
        data.push(0);
        data_offset += original.len() + 1;
    }
    for (_, translation) in &strings {
        push_entry(&mut translations_table, translation.len(), data_offset);
        data.extend_from_slice(translation.as_bytes());
        data.push(0);
        data_offset += translation.len() + 1;
    }

    out.extend_from_slice(&originals_table);
    out.extend_from_slice(&translations_table);
    out.extend_from_slice(&data);
    out
}

fn push_entry(table: &mut Vec<u8>, length: usize, offset: usize) {
    table.extend_from_slice(&(length as u32).to_le_bytes());
    table.extend_from_slice(&(offset as u32).to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.set_header("Plural-Forms", "nplurals=2; plural=(n > 1);");
        catalog.set_header("Language", "fr_FR");
        catalog.insert("Hello", "Bonjour");
        catalog.insert_plural(None, "apple", "apples", &["pomme", "pommes"]);
        catalog
    }

    #[test]
    fn test_decode_encoded_catalog() {
        let decoded = decode(&encode(&sample())).expect("Should decode");

        assert_eq!(decoded.get("Hello"), Some("Bonjour"));
        assert_eq!(decoded.get("apple\0apples"), Some("pomme\0pommes"));
        assert_eq!(
            decoded.headers().get("plural-forms").map(String::as_str),
            Some("nplurals=2; plural=(n > 1);")
        );
        assert_eq!(decoded.headers().get("language").map(String::as_str), Some("fr_FR"));
    }

    #[test]
    fn test_decode_big_endian() {
        // Hand-built big-endian file with a single "a" -> "b" entry
        let mut bytes = Vec::new();
        for value in [MAGIC, 0u32, 1, 28, 36, 0, 44] {
            bytes.extend_from_slice(&value.to_be_bytes());
        }
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&44u32.to_be_bytes());
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&46u32.to_be_bytes());
        bytes.extend_from_slice(b"a\0b\0");

        let catalog = decode(&bytes).expect("Should decode big-endian");
        assert_eq!(catalog.get("a"), Some("b"));
    }

    #[test]
    fn test_invalid_magic() {
        let result = decode(b"not a catalog at all, definitely");
        assert!(matches!(result, Err(CatalogError::InvalidMagic(_))));
    }

    #[test]
    fn test_too_short_for_magic() {
        assert!(matches!(
            check_magic(b"ab"),
            Err(CatalogError::Truncated("magic number"))
        ));
    }

    #[test]
    fn test_truncated_tables() {
        let mut bytes = encode(&sample());
        bytes.truncate(40);
        assert!(check_magic(&bytes).is_ok());
        assert!(matches!(decode(&bytes), Err(CatalogError::Truncated(_))));
    }

    #[test]
    fn test_unsupported_revision() {
        let mut bytes = encode(&sample());
        bytes[4..8].copy_from_slice(&0x0002_0000u32.to_le_bytes());
        assert!(matches!(
            decode(&bytes),
            Err(CatalogError::UnsupportedRevision(0x0002_0000))
        ));
    }
}

//! Translation files: one compiled catalog on disk, decoded once on demand.

use crate::i18n::error::CatalogError;
use crate::i18n::plural::PluralRule;
use crate::i18n::{json, mo};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Separator between a message context and its text in catalog keys.
pub const CONTEXT_SEPARATOR: char = '\u{4}';

/// Separator between plural forms (and between singular and plural keys).
pub const PLURAL_SEPARATOR: char = '\0';

/// Build the catalog key for `text`, prefixed with `context` when present.
pub fn message_key(context: Option<&str>, text: &str) -> String {
    match context {
        Some(context) if !context.is_empty() => format!("{context}{CONTEXT_SEPARATOR}{text}"),
        _ => text.to_string(),
    }
}

/// Title-case each hyphen-separated segment: `content-type` -> `Content-Type`.
pub fn normalize_header(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Split a `Name: value` header block into lower-cased names and values.
pub(crate) fn parse_header_block(block: &str) -> Vec<(String, String)> {
    block
        .lines()
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_lowercase(), value.trim().to_string()))
        })
        .collect()
}

/// On-disk catalog formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogFormat {
    /// GNU gettext binary `.mo`
    Mo,
    /// Jed-style `.json`
    Json,
}

impl CatalogFormat {
    /// Detect the format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "mo" => Some(Self::Mo),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Mo => "mo",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for CatalogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Parsed catalog content.
///
/// Header names are stored lower-cased. Entry values hold every plural
/// form joined by [`PLURAL_SEPARATOR`]; plural keys are
/// `singular\0plural`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    headers: BTreeMap<String, String>,
    entries: BTreeMap<String, String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.headers
            .insert(name.as_ref().to_lowercase(), value.into());
    }

    /// Insert a raw entry.
    pub fn insert(&mut self, key: impl Into<String>, translation: impl Into<String>) {
        self.entries.insert(key.into(), translation.into());
    }

    /// Insert a singular translation, optionally under a context.
    pub fn insert_text(&mut self, context: Option<&str>, text: &str, translation: &str) {
        self.insert(message_key(context, text), translation);
    }

    /// Insert a plural entry keyed by `singular\0plural`.
    pub fn insert_plural(&mut self, context: Option<&str>, singular: &str, plural: &str, forms: &[&str]) {
        let key = message_key(context, &format!("{singular}{PLURAL_SEPARATOR}{plural}"));
        self.insert(key, forms.join("\0"));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compile the `plural-forms` header, defaulting to English.
    pub fn plural_rule(&self) -> PluralRule {
        self.headers
            .get("plural-forms")
            .map(|header| PluralRule::from_header(header))
            .unwrap_or_default()
    }

    /// Serialize the catalog in the given format.
    pub fn encode(&self, format: CatalogFormat) -> Result<Vec<u8>, CatalogError> {
        match format {
            CatalogFormat::Mo => Ok(mo::encode(self)),
            CatalogFormat::Json => json::encode(self),
        }
    }

    /// Parse catalog bytes of the given format.
    pub fn decode(format: CatalogFormat, bytes: &[u8]) -> Result<Self, CatalogError> {
        match format {
            CatalogFormat::Mo => mo::decode(bytes),
            CatalogFormat::Json => json::decode(bytes),
        }
    }
}

enum State {
    Pending(Vec<u8>),
    Ready { catalog: Catalog, plural: PluralRule },
    Failed(String),
}

/// One catalog file for a (file, locale, domain) registration.
///
/// [`TranslationFile::create`] reads the file and validates the container;
/// entries are decoded by [`TranslationFile::validate`] or on the first
/// lookup, whichever comes first. A decode failure is kept as the file's
/// error and every later lookup misses.
pub struct TranslationFile {
    file: PathBuf,
    format: CatalogFormat,
    state: RefCell<State>,
}

impl TranslationFile {
    /// Open `path`, picking the reader from its extension.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let format = CatalogFormat::from_path(path)
            .ok_or_else(|| CatalogError::UnsupportedFormat(path.display().to_string()))?;
        let bytes = std::fs::read(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(path, format, bytes)
    }

    /// Wrap already-read bytes, validating the container only.
    pub fn from_bytes(
        file: impl Into<PathBuf>,
        format: CatalogFormat,
        bytes: Vec<u8>,
    ) -> Result<Self, CatalogError> {
        if format == CatalogFormat::Mo {
            mo::check_magic(&bytes)?;
        }
        Ok(Self {
            file: file.into(),
            format,
            state: RefCell::new(State::Pending(bytes)),
        })
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn format(&self) -> CatalogFormat {
        self.format
    }

    /// The decode error, if parsing has been attempted and failed.
    pub fn error(&self) -> Option<String> {
        match &*self.state.borrow() {
            State::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }

    fn parse(&self) {
        let mut state = self.state.borrow_mut();
        if let State::Pending(bytes) = &mut *state {
            let bytes = std::mem::take(bytes);
            *state = match Catalog::decode(self.format, &bytes) {
                Ok(catalog) => {
                    debug!(
                        "Parsed {} catalog {} ({} entries)",
                        self.format,
                        self.file.display(),
                        catalog.len()
                    );
                    let plural = catalog.plural_rule();
                    State::Ready { catalog, plural }
                }
                Err(e) => {
                    warn!("Failed to parse catalog {}: {}", self.file.display(), e);
                    State::Failed(e.to_string())
                }
            };
        }
    }

    /// Decode the body now instead of on the first lookup.
    pub fn validate(&self) -> Result<(), CatalogError> {
        self.parse();
        match self.error() {
            Some(message) => Err(CatalogError::Decode(message)),
            None => Ok(()),
        }
    }

    fn with_catalog<R>(&self, f: impl FnOnce(&Catalog, &PluralRule) -> R) -> Option<R> {
        self.parse();
        match &*self.state.borrow() {
            State::Ready { catalog, plural } => Some(f(catalog, plural)),
            _ => None,
        }
    }

    /// Raw translation for `key` (plural forms NUL-joined), if present.
    pub fn translate(&self, key: &str) -> Option<String> {
        self.with_catalog(|catalog, _| catalog.get(key).map(str::to_string))
            .flatten()
    }

    /// Raw plural form index for `number` under this file's rule.
    pub fn plural_form(&self, number: u64) -> i64 {
        self.with_catalog(|_, plural| plural.evaluate(number))
            .unwrap_or_else(|| PluralRule::english().evaluate(number))
    }

    /// Lower-cased header map.
    pub fn headers(&self) -> BTreeMap<String, String> {
        self.with_catalog(|catalog, _| catalog.headers().clone())
            .unwrap_or_default()
    }

    pub fn entries(&self) -> BTreeMap<String, String> {
        self.with_catalog(|catalog, _| catalog.entries().clone())
            .unwrap_or_default()
    }

    /// Re-encode this file's catalog in another format.
    ///
    /// JSON keys plural entries by their singular text, so exporting to JSON
    /// drops a plural entry whose singular is also a standalone entry.
    pub fn export(&self, format: CatalogFormat) -> Result<Vec<u8>, CatalogError> {
        self.parse();
        match &*self.state.borrow() {
            State::Ready { catalog, .. } => catalog.encode(format),
            State::Failed(message) => Err(CatalogError::Decode(message.clone())),
            State::Pending(_) => unreachable!("parse() always leaves a terminal state"),
        }
    }
}

impl fmt::Debug for TranslationFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationFile")
            .field("file", &self.file)
            .field("format", &self.format)
            .field("error", &self.error())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn french() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.set_header("Plural-Forms", "nplurals=2; plural=(n > 1);");
        catalog.insert_text(None, "Hello", "Bonjour");
        catalog.insert_text(Some("menu"), "File", "Fichier");
        catalog.insert_plural(None, "apple", "apples", &["pomme", "pommes"]);
        catalog
    }

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).expect("Failed to write catalog");
        path
    }

    // ==================== Helper Tests ====================

    #[test]
    fn test_message_key() {
        assert_eq!(message_key(None, "File"), "File");
        assert_eq!(message_key(Some(""), "File"), "File");
        assert_eq!(message_key(Some("menu"), "File"), "menu\u{4}File");
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("content-type"), "Content-Type");
        assert_eq!(normalize_header("plural-forms"), "Plural-Forms");
        assert_eq!(normalize_header("x-generator"), "X-Generator");
        assert_eq!(normalize_header("language"), "Language");
    }

    #[test]
    fn test_parse_header_block() {
        let headers = parse_header_block("Content-Type: text/plain; charset=UTF-8\nLanguage: fr\n\nbogus\n");
        assert_eq!(
            headers,
            vec![
                ("content-type".to_string(), "text/plain; charset=UTF-8".to_string()),
                ("language".to_string(), "fr".to_string()),
            ]
        );
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(CatalogFormat::from_path(Path::new("fr_FR.mo")), Some(CatalogFormat::Mo));
        assert_eq!(CatalogFormat::from_path(Path::new("a/fr.JSON")), Some(CatalogFormat::Json));
        assert_eq!(CatalogFormat::from_path(Path::new("fr_FR.po")), None);
        assert_eq!(CatalogFormat::from_path(Path::new("fr_FR")), None);
    }

    // ==================== TranslationFile Tests ====================

    #[test]
    fn test_create_and_translate_mo() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "fr_FR.mo", &french().encode(CatalogFormat::Mo).unwrap());

        let file = TranslationFile::create(&path).expect("Should open");
        assert_eq!(file.format(), CatalogFormat::Mo);
        assert_eq!(file.translate("Hello").as_deref(), Some("Bonjour"));
        assert_eq!(file.translate("menu\u{4}File").as_deref(), Some("Fichier"));
        assert_eq!(file.translate("Goodbye"), None);
        assert_eq!(file.plural_form(1), 0);
        assert_eq!(file.plural_form(2), 1);
        assert!(file.error().is_none());
    }

    #[test]
    fn test_create_rejects_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "fr_FR.po", b"msgid \"\"");
        assert!(matches!(
            TranslationFile::create(&path),
            Err(CatalogError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_create_rejects_bad_magic() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.mo", b"this is not a mo file at all....");
        assert!(matches!(
            TranslationFile::create(&path),
            Err(CatalogError::InvalidMagic(_))
        ));
    }

    #[test]
    fn test_create_missing_file() {
        assert!(matches!(
            TranslationFile::create("/definitely/not/here.mo"),
            Err(CatalogError::Io { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_truncated_mo() {
        let dir = TempDir::new().unwrap();
        let mut bytes = french().encode(CatalogFormat::Mo).unwrap();
        bytes.truncate(36);
        let path = write(&dir, "truncated.mo", &bytes);

        let file = TranslationFile::create(&path).expect("Magic is valid");
        assert!(matches!(file.validate(), Err(CatalogError::Decode(_))));
        assert!(file.error().is_some());

        // A failed file misses every lookup and answers with the English rule
        assert_eq!(file.translate("Hello"), None);
        assert!(file.headers().is_empty());
        assert_eq!(file.plural_form(1), 0);
        assert!(matches!(
            file.export(CatalogFormat::Json),
            Err(CatalogError::Decode(_))
        ));
    }

    #[test]
    fn test_validate_rejects_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "fr_FR.json", b"{ this is not json");

        let file = TranslationFile::create(&path).expect("JSON has no container check");
        assert!(file.error().is_none());
        assert!(file.validate().is_err());
        assert!(file.error().is_some());
    }

    #[test]
    fn test_validate_accepts_healthy_catalog() {
        let bytes = french().encode(CatalogFormat::Json).unwrap();
        let file = TranslationFile::from_bytes("fr_FR.json", CatalogFormat::Json, bytes).unwrap();
        assert!(file.validate().is_ok());
        assert_eq!(file.translate("Hello").as_deref(), Some("Bonjour"));
    }

    #[test]
    fn test_from_bytes_decodes_on_first_lookup() {
        let mut bytes = french().encode(CatalogFormat::Mo).unwrap();
        bytes.truncate(36);
        let file = TranslationFile::from_bytes("truncated.mo", CatalogFormat::Mo, bytes)
            .expect("Magic is valid");

        assert!(file.error().is_none());
        assert_eq!(file.translate("Hello"), None);
        assert!(file.error().is_some());
    }

    #[test]
    fn test_export_mo_to_json() {
        let bytes = french().encode(CatalogFormat::Mo).unwrap();
        let file = TranslationFile::from_bytes("fr_FR.mo", CatalogFormat::Mo, bytes).unwrap();

        let json = file.export(CatalogFormat::Json).expect("Should export");
        let converted = TranslationFile::from_bytes("fr_FR.json", CatalogFormat::Json, json).unwrap();

        assert_eq!(converted.translate("Hello").as_deref(), Some("Bonjour"));
        // JSON keys plurals by the singular text
        assert_eq!(converted.translate("apple").as_deref(), Some("pomme\0pommes"));
        assert_eq!(converted.plural_form(2), 1);
    }

    #[test]
    fn test_headers_are_lowercased() {
        let bytes = french().encode(CatalogFormat::Mo).unwrap();
        let file = TranslationFile::from_bytes("fr_FR.mo", CatalogFormat::Mo, bytes).unwrap();
        assert!(file.headers().contains_key("plural-forms"));
    }
}

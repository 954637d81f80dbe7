//! Translation controller: loads catalog files per (locale, domain) and
//! answers singular and plural lookups against them.
//!
//! # Lookup order
//!
//! Files registered for a (locale, domain) pair are searched in the order
//! they were loaded; the first file containing the key wins. A file that
//! reports a decode error during a search is unloaded on the spot, so a
//! corrupt catalog never blocks lookups against the others.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unresolvable path | File missing | `load` returns `false` |
//! | Unreadable catalog | Bad magic, unknown extension, corrupt body | `load` returns `false`, failure recorded |
//! | Decode error after registration | File reports an error mid-search | File unloaded, lookup falls through |
//! | Missing key | Key not in any file | `None` |
//! | Out-of-range plural index | Rule yields bad form | Form 0 |

use crate::i18n::error::CatalogError;
use crate::i18n::file::{message_key, normalize_header, TranslationFile, PLURAL_SEPARATOR};
use crate::i18n::metrics::TranslationMetrics;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// The default text domain.
pub const DEFAULT_DOMAIN: &str = "default";

/// A successful catalog search: the plural forms of the match and the file
/// that provided it.
#[derive(Debug, Clone)]
pub struct Located {
    pub entries: Vec<String>,
    pub source: Rc<TranslationFile>,
}

type DomainFiles = HashMap<String, Vec<Rc<TranslationFile>>>;
type FileRecords = HashMap<String, HashMap<String, Option<Rc<TranslationFile>>>>;

/// Registry of loaded catalogs.
#[derive(Debug)]
pub struct TranslationController {
    current_locale: String,
    /// locale -> domain -> files, in load order
    loaded_translations: HashMap<String, DomainFiles>,
    /// canonical path -> locale -> domain -> parsed file (`None` = failed load)
    loaded_files: HashMap<PathBuf, FileRecords>,
    metrics: TranslationMetrics,
}

impl TranslationController {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            current_locale: locale.into(),
            loaded_translations: HashMap::new(),
            loaded_files: HashMap::new(),
            metrics: TranslationMetrics::new(),
        }
    }

    pub fn locale(&self) -> &str {
        &self.current_locale
    }

    pub fn set_locale(&mut self, locale: impl Into<String>) {
        self.current_locale = locale.into();
    }

    pub fn metrics(&self) -> &TranslationMetrics {
        &self.metrics
    }

    fn resolve_locale(&self, locale: Option<&str>) -> String {
        locale.unwrap_or(&self.current_locale).to_string()
    }

    /// Load a catalog file for `domain` in `locale` (current locale when `None`).
    ///
    /// The file is decoded before it is registered; unreadable or malformed
    /// catalogs make `load` return `false` and register nothing. A file
    /// already parsed for the same canonical path and locale is shared
    /// instead of being read again. Failed loads are recorded too, so
    /// repeating them costs no I/O.
    pub fn load(&mut self, file: impl AsRef<Path>, domain: &str, locale: Option<&str>) -> bool {
        let locale = self.resolve_locale(locale);
        let path = match std::fs::canonicalize(file.as_ref()) {
            Ok(path) => path,
            Err(e) => {
                debug!("Cannot resolve catalog {}: {}", file.as_ref().display(), e);
                return false;
            }
        };

        let records = self
            .loaded_files
            .entry(path.clone())
            .or_default()
            .entry(locale.clone())
            .or_default();

        if let Some(Some(existing)) = records.get(domain) {
            return existing.error().is_none();
        }

        let translation_file = if records.is_empty() {
            match open_catalog(&path) {
                Ok(created) => Some(Rc::new(created)),
                Err(e) => {
                    warn!("Failed to load catalog {}: {}", path.display(), e);
                    None
                }
            }
        } else {
            // Reuse a healthy file registered under another domain
            records
                .values()
                .flatten()
                .find(|candidate| candidate.error().is_none())
                .cloned()
        };

        let Some(translation_file) = translation_file else {
            records.insert(domain.to_string(), None);
            return false;
        };

        info!(
            "Loaded {} catalog {} for {}/{}",
            translation_file.format(),
            path.display(),
            locale,
            domain
        );
        self.register(translation_file, domain, &locale);
        true
    }

    /// Record `file` for (`domain`, `locale`) and append it to the search
    /// order. No validation is done here.
    fn register(&mut self, file: Rc<TranslationFile>, domain: &str, locale: &str) {
        self.loaded_files
            .entry(file.file().to_path_buf())
            .or_default()
            .entry(locale.to_string())
            .or_default()
            .insert(domain.to_string(), Some(Rc::clone(&file)));

        self.loaded_translations
            .entry(locale.to_string())
            .or_default()
            .entry(domain.to_string())
            .or_default()
            .push(file);
    }

    /// Unload translations for `domain`.
    ///
    /// - with `file`: remove that file's registration (in `locale`, or in
    ///   every locale when `locale` is `None`);
    /// - with only `locale`: remove every file of the domain in that locale;
    /// - with neither: remove the domain from every locale.
    ///
    /// Returns `false` when nothing matching was loaded.
    pub fn unload(&mut self, domain: &str, file: Option<&Path>, locale: Option<&str>) -> bool {
        match file {
            Some(file) => self.unload_file(file, domain, locale),
            None => self.unload_domain(domain, locale),
        }
    }

    /// Remove one file's registration for `domain`.
    pub fn unload_file(&mut self, file: &Path, domain: &str, locale: Option<&str>) -> bool {
        let path = std::fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
        let locales: Vec<String> = match locale {
            Some(locale) => vec![locale.to_string()],
            None => self.loaded_translations.keys().cloned().collect(),
        };

        let mut unloaded = false;
        for locale in locales {
            let target = self
                .files(domain, Some(&locale))
                .into_iter()
                .find(|candidate| candidate.file() == path);
            if let Some(target) = target {
                unloaded |= self.remove_registration(&target, domain, &locale);
            }
        }
        unloaded
    }

    /// Remove every file of `domain`, in one locale or all of them.
    pub fn unload_domain(&mut self, domain: &str, locale: Option<&str>) -> bool {
        let locales: Vec<String> = match locale {
            Some(locale) => vec![locale.to_string()],
            None => self.loaded_translations.keys().cloned().collect(),
        };

        let mut unloaded = false;
        for locale in locales {
            let Some(domains) = self.loaded_translations.get_mut(&locale) else {
                continue;
            };
            let Some(files) = domains.remove(domain) else {
                continue;
            };
            if domains.is_empty() {
                self.loaded_translations.remove(&locale);
            }

            unloaded |= !files.is_empty();
            for file in files {
                self.forget_record(file.file(), &locale, domain);
            }
            debug!("Unloaded domain {} for locale {}", domain, locale);
        }
        unloaded
    }

    fn remove_registration(&mut self, target: &Rc<TranslationFile>, domain: &str, locale: &str) -> bool {
        let Some(domains) = self.loaded_translations.get_mut(locale) else {
            return false;
        };
        let Some(files) = domains.get_mut(domain) else {
            return false;
        };
        let Some(position) = files.iter().position(|file| Rc::ptr_eq(file, target)) else {
            return false;
        };

        files.remove(position);
        if files.is_empty() {
            domains.remove(domain);
        }
        if domains.is_empty() {
            self.loaded_translations.remove(locale);
        }
        self.forget_record(target.file(), locale, domain);
        true
    }

    fn forget_record(&mut self, path: &Path, locale: &str, domain: &str) {
        if let Some(by_locale) = self.loaded_files.get_mut(path) {
            if let Some(by_domain) = by_locale.get_mut(locale) {
                by_domain.remove(domain);
                if by_domain.is_empty() {
                    by_locale.remove(locale);
                }
            }
            if by_locale.is_empty() {
                self.loaded_files.remove(path);
            }
        }
    }

    /// Whether at least one file is registered for (`domain`, `locale`).
    pub fn is_loaded(&self, domain: &str, locale: Option<&str>) -> bool {
        let locale = locale.unwrap_or(&self.current_locale);
        self.loaded_translations
            .get(locale)
            .and_then(|domains| domains.get(domain))
            .is_some_and(|files| !files.is_empty())
    }

    /// Files registered for (`domain`, `locale`) in search order.
    pub fn files(&self, domain: &str, locale: Option<&str>) -> Vec<Rc<TranslationFile>> {
        let locale = locale.unwrap_or(&self.current_locale);
        self.loaded_translations
            .get(locale)
            .and_then(|domains| domains.get(domain))
            .cloned()
            .unwrap_or_default()
    }

    /// Locales with at least one registered file, sorted.
    pub fn loaded_locales(&self) -> Vec<String> {
        let mut locales: Vec<String> = self.loaded_translations.keys().cloned().collect();
        locales.sort();
        locales
    }

    /// Domains with at least one registered file in `locale`, sorted.
    pub fn loaded_domains(&self, locale: Option<&str>) -> Vec<String> {
        let locale = locale.unwrap_or(&self.current_locale);
        let mut domains: Vec<String> = self
            .loaded_translations
            .get(locale)
            .map(|domains| domains.keys().cloned().collect())
            .unwrap_or_default();
        domains.sort();
        domains
    }

    /// Translate a singular message. Returns `None` when no file has it.
    pub fn translate(
        &mut self,
        text: &str,
        context: Option<&str>,
        domain: &str,
        locale: Option<&str>,
    ) -> Option<String> {
        let key = message_key(context, text);
        self.locate_translation(&key, domain, locale)?
            .entries
            .into_iter()
            .next()
    }

    /// Translate a plural message and pick the form for `number`.
    ///
    /// Tries the combined `singular\0plural` key first, then the bare
    /// singular key for catalogs that store plurals under it.
    pub fn translate_plural(
        &mut self,
        plurals: (&str, &str),
        number: u64,
        context: Option<&str>,
        domain: &str,
        locale: Option<&str>,
    ) -> Option<String> {
        let (singular, plural) = plurals;
        let combined = message_key(context, &format!("{singular}{PLURAL_SEPARATOR}{plural}"));

        let located = match self.locate_translation(&combined, domain, locale) {
            Some(located) => located,
            None => self.locate_translation(&message_key(context, singular), domain, locale)?,
        };

        let form = located.source.plural_form(number);
        let entries = located.entries;
        usize::try_from(form)
            .ok()
            .and_then(|index| entries.get(index))
            .or_else(|| entries.first())
            .cloned()
    }

    /// Search the files of (`domain`, `locale`) for `key`.
    ///
    /// Files that report an error while being searched are unloaded.
    pub fn locate_translation(
        &mut self,
        key: &str,
        domain: &str,
        locale: Option<&str>,
    ) -> Option<Located> {
        let locale = self.resolve_locale(locale);
        self.metrics.record_catalog_lookup();

        let mut found = None;
        let mut failed = Vec::new();
        for file in self.files(domain, Some(&locale)) {
            if let Some(translation) = file.translate(key) {
                found = Some(Located {
                    entries: translation
                        .split(PLURAL_SEPARATOR)
                        .map(str::to_string)
                        .collect(),
                    source: file,
                });
                break;
            }
            if file.error().is_some() {
                failed.push(file);
            }
        }

        for file in failed {
            warn!(
                "Unloading catalog {} for {}/{} after error: {}",
                file.file().display(),
                locale,
                domain,
                file.error().unwrap_or_default()
            );
            if self.remove_registration(&file, domain, &locale) {
                self.metrics.record_file_dropped();
            }
        }

        found
    }

    /// Headers of every file of `domain` in the current locale, names
    /// normalised to `Title-Case`. Later files override earlier ones.
    pub fn get_headers(&self, domain: &str) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        for file in self.files(domain, None) {
            for (name, value) in file.headers() {
                headers.insert(normalize_header(&name), value);
            }
        }
        headers
    }

    /// Entries of every file of `domain` in the current locale.
    pub fn get_entries(&self, domain: &str) -> BTreeMap<String, String> {
        let mut entries = BTreeMap::new();
        for file in self.files(domain, None) {
            entries.extend(file.entries());
        }
        entries
    }
}

/// Read `path` and decode it fully.
fn open_catalog(path: &Path) -> Result<TranslationFile, CatalogError> {
    let file = TranslationFile::create(path)?;
    file.validate()?;
    Ok(file)
}

//! Lazy string proxies.
//!
//! A proxy captures a translation request (or an escaping request) and does
//! no work until it is resolved: through [`StringProxy::resolve`], through
//! `Display` (so `format!` and templates work), or through serde
//! serialization. Translating proxies resolve through the shared
//! [`TranslationCache`] under their own cache id and release that id when
//! dropped.
//!
//! The [`Translator`] handle is the registry every proxy goes through. It is
//! `Rc`-based and single-threaded; clone it to share.

use crate::i18n::cache::{CacheId, PluralLookup, TranslationCache};
use crate::i18n::controller::TranslationController;
use crate::i18n::escape::{esc_attr, esc_html};
use crate::i18n::hooks::PluralArgs;
use serde::{Serialize, Serializer};
use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Largest offset [`StringProxy::set_char`] will pad out to.
pub const MAX_CHAR_OFFSET: usize = 64 * 1024;

static NEXT_CACHE_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique cache id.
pub fn next_cache_id() -> CacheId {
    NEXT_CACHE_ID.fetch_add(1, Ordering::Relaxed)
}

struct Shared {
    cache: RefCell<TranslationCache>,
    /// Ids released while the cache was borrowed; evicted on next access
    pending: RefCell<Vec<CacheId>>,
}

/// Shared handle to a translation cache and the proxies it vends.
#[derive(Clone)]
pub struct Translator {
    shared: Rc<Shared>,
}

impl Translator {
    pub fn new(cache: TranslationCache) -> Self {
        Self {
            shared: Rc::new(Shared {
                cache: RefCell::new(cache),
                pending: RefCell::new(Vec::new()),
            }),
        }
    }

    /// A translator with no catalogs loaded, starting in `locale`.
    pub fn for_locale(locale: &str) -> Self {
        Self::new(TranslationCache::new(TranslationController::new(locale)))
    }

    /// Run `f` against the cache.
    ///
    /// # Panics
    /// Panics if a proxy of this translator is resolved inside `f`.
    pub fn with_cache<R>(&self, f: impl FnOnce(&mut TranslationCache) -> R) -> R {
        let mut cache = self.shared.cache.borrow_mut();
        let pending: Vec<CacheId> = self.shared.pending.borrow_mut().drain(..).collect();
        for cache_id in pending {
            cache.clear_translation(cache_id);
        }
        f(&mut cache)
    }

    fn release(&self, cache_id: CacheId) {
        match self.shared.cache.try_borrow_mut() {
            Ok(mut cache) => cache.clear_translation(cache_id),
            Err(_) => self.shared.pending.borrow_mut().push(cache_id),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>, domain: &str, locale: Option<&str>) -> bool {
        self.with_cache(|cache| cache.controller_mut().load(file, domain, locale))
    }

    pub fn unload(&self, domain: &str, file: Option<&Path>, locale: Option<&str>) -> bool {
        self.with_cache(|cache| cache.controller_mut().unload(domain, file, locale))
    }

    pub fn is_loaded(&self, domain: &str, locale: Option<&str>) -> bool {
        self.with_cache(|cache| cache.controller().is_loaded(domain, locale))
    }

    pub fn locale(&self) -> String {
        self.with_cache(|cache| cache.current_locale().to_string())
    }

    pub fn set_locale(&self, locale: &str) {
        self.with_cache(|cache| cache.on_change_locale(locale));
    }

    /// Subscribe a plural filter (see [`crate::i18n::hooks`]).
    pub fn add_filter<F>(&self, name: &str, priority: i32, callback: F)
    where
        F: Fn(String, &PluralArgs<'_>) -> String + 'static,
    {
        self.with_cache(|cache| cache.filters_mut().add_filter(name, priority, callback));
    }

    /// Lazy singular translation.
    pub fn text(&self, text: &str, domain: &str) -> TextProxy {
        self.text_proxy(text, None, domain)
    }

    /// Lazy singular translation under a message context.
    pub fn text_with_context(&self, text: &str, context: &str, domain: &str) -> TextProxy {
        self.text_proxy(text, Some(context), domain)
    }

    /// Lazy plural translation.
    pub fn plural(&self, single: &str, plural: &str, number: u64, domain: &str) -> PluralProxy {
        self.plural_proxy((single, plural), number, None, domain)
    }

    /// Lazy plural translation under a message context.
    pub fn plural_with_context(
        &self,
        single: &str,
        plural: &str,
        number: u64,
        context: &str,
        domain: &str,
    ) -> PluralProxy {
        self.plural_proxy((single, plural), number, Some(context), domain)
    }

    fn text_proxy(&self, text: &str, context: Option<&str>, domain: &str) -> TextProxy {
        TextProxy {
            base: ProxyBase::new(),
            translator: self.clone(),
            text: text.to_string(),
            context: context.map(str::to_string),
            domain: domain.to_string(),
        }
    }

    fn plural_proxy(
        &self,
        (single, plural): (&str, &str),
        number: u64,
        context: Option<&str>,
        domain: &str,
    ) -> PluralProxy {
        PluralProxy {
            base: ProxyBase::new(),
            translator: self.clone(),
            single: single.to_string(),
            plural: plural.to_string(),
            number,
            context: context.map(str::to_string),
            domain: domain.to_string(),
        }
    }

    /// Lazy translation escaped for HTML content.
    pub fn esc_html(&self, text: &str, domain: &str) -> EscapeHtmlProxy {
        EscapeHtmlProxy::new(self.text(text, domain))
    }

    pub fn esc_html_with_context(&self, text: &str, context: &str, domain: &str) -> EscapeHtmlProxy {
        EscapeHtmlProxy::new(self.text_with_context(text, context, domain))
    }

    /// Lazy translation escaped for an HTML attribute.
    pub fn esc_attr(&self, text: &str, domain: &str) -> EscapeAttrProxy {
        EscapeAttrProxy::new(self.text(text, domain))
    }

    pub fn esc_attr_with_context(&self, text: &str, context: &str, domain: &str) -> EscapeAttrProxy {
        EscapeAttrProxy::new(self.text_with_context(text, context, domain))
    }
}

impl fmt::Debug for Translator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translator")
            .field("pending", &self.shared.pending.borrow().len())
            .finish_non_exhaustive()
    }
}

/// State shared by every proxy: its cache id and the copy made on first
/// indexed write.
#[derive(Debug)]
pub struct ProxyBase {
    cache_id: CacheId,
    modified: Option<String>,
}

impl ProxyBase {
    pub fn new() -> Self {
        Self {
            cache_id: next_cache_id(),
            modified: None,
        }
    }
}

impl Default for ProxyBase {
    fn default() -> Self {
        Self::new()
    }
}

/// Deferred string value.
///
/// Implementors provide [`StringProxy::result`], the one real computation;
/// everything else goes through "modified-or-result".
pub trait StringProxy {
    fn base(&self) -> &ProxyBase;

    fn base_mut(&mut self) -> &mut ProxyBase;

    /// Compute the value (catalog lookup or escaping).
    fn result(&self) -> String;

    fn cache_id(&self) -> CacheId {
        self.base().cache_id
    }

    /// Whether an indexed write has detached this proxy from `result()`.
    fn is_modified(&self) -> bool {
        self.base().modified.is_some()
    }

    /// The local copy if one exists, otherwise `result()`.
    fn resolve(&self) -> String {
        match &self.base().modified {
            Some(modified) => modified.clone(),
            None => self.result(),
        }
    }

    /// Length in characters of the resolved value.
    fn len(&self) -> usize {
        self.resolve().chars().count()
    }

    fn is_empty(&self) -> bool {
        self.resolve().is_empty()
    }

    fn has_char(&self, offset: usize) -> bool {
        offset < self.len()
    }

    /// Character at `offset` of the resolved value.
    fn char_at(&self, offset: usize) -> Option<char> {
        self.resolve().chars().nth(offset)
    }

    /// Overwrite the character at `offset` in a local copy of the value.
    ///
    /// The first write materializes `result()`; the cache entry is left as
    /// it was. Writing past the end pads with spaces. Offsets beyond
    /// [`MAX_CHAR_OFFSET`] are ignored.
    fn set_char(&mut self, offset: usize, value: char) {
        let Some(needed) = offset.checked_add(1).filter(|&n| n <= MAX_CHAR_OFFSET) else {
            warn!(
                "Ignoring write at string offset {} of proxy {}: limit is {}",
                offset,
                self.cache_id(),
                MAX_CHAR_OFFSET
            );
            return;
        };

        if self.base().modified.is_none() {
            let materialized = self.result();
            self.base_mut().modified = Some(materialized);
        }
        let modified = self.base_mut().modified.get_or_insert_with(String::new);

        let mut chars: Vec<char> = modified.chars().collect();
        if offset >= chars.len() {
            chars.resize(needed, ' ');
        }
        chars[offset] = value;
        *modified = chars.into_iter().collect();
    }

    /// Removing a character from a string is not supported.
    ///
    /// # Panics
    /// Always.
    fn unset_char(&mut self, offset: usize) -> ! {
        panic!(
            "Cannot unset string offset {} of proxy {}: string offsets cannot be unset",
            offset,
            self.cache_id()
        )
    }
}

/// Lazy singular translation.
#[derive(Debug)]
pub struct TextProxy {
    base: ProxyBase,
    translator: Translator,
    text: String,
    context: Option<String>,
    domain: String,
}

impl TextProxy {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl StringProxy for TextProxy {
    fn base(&self) -> &ProxyBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ProxyBase {
        &mut self.base
    }

    fn result(&self) -> String {
        let cache_id = self.cache_id();
        self.translator.with_cache(|cache| match &self.context {
            Some(context) => cache.translate_with_context(cache_id, &self.text, context, &self.domain),
            None => cache.translate(cache_id, &self.text, &self.domain),
        })
    }
}

impl Drop for TextProxy {
    fn drop(&mut self) {
        self.translator.release(self.base.cache_id);
    }
}

/// Lazy plural translation.
#[derive(Debug)]
pub struct PluralProxy {
    base: ProxyBase,
    translator: Translator,
    single: String,
    plural: String,
    number: u64,
    context: Option<String>,
    domain: String,
}

impl PluralProxy {
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl StringProxy for PluralProxy {
    fn base(&self) -> &ProxyBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ProxyBase {
        &mut self.base
    }

    fn result(&self) -> String {
        let cache_id = self.cache_id();
        let args = PluralArgs {
            single: &self.single,
            plural: &self.plural,
            number: self.number,
            context: self.context.as_deref(),
            domain: &self.domain,
        };

        // Filters run with the cache released so they may use the translator
        match self.translator.with_cache(|cache| cache.lookup_plural(cache_id, &args)) {
            PluralLookup::Cached(value) => value,
            PluralLookup::Miss {
                locale,
                translation,
                filters,
            } => {
                let value = filters.apply_plural(translation, &args);
                self.translator
                    .with_cache(|cache| cache.store_translation(&locale, cache_id, value.clone()));
                value
            }
        }
    }
}

impl Drop for PluralProxy {
    fn drop(&mut self) {
        self.translator.release(self.base.cache_id);
    }
}

/// Lazily HTML-escapes any displayable value. Not cached.
pub struct EscapeHtmlProxy {
    base: ProxyBase,
    value: Box<dyn fmt::Display>,
}

impl EscapeHtmlProxy {
    pub fn new(value: impl fmt::Display + 'static) -> Self {
        Self {
            base: ProxyBase::new(),
            value: Box::new(value),
        }
    }
}

impl StringProxy for EscapeHtmlProxy {
    fn base(&self) -> &ProxyBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ProxyBase {
        &mut self.base
    }

    fn result(&self) -> String {
        esc_html(&self.value.to_string())
    }
}

/// Lazily attribute-escapes any displayable value. Not cached.
pub struct EscapeAttrProxy {
    base: ProxyBase,
    value: Box<dyn fmt::Display>,
}

impl EscapeAttrProxy {
    pub fn new(value: impl fmt::Display + 'static) -> Self {
        Self {
            base: ProxyBase::new(),
            value: Box::new(value),
        }
    }
}

impl StringProxy for EscapeAttrProxy {
    fn base(&self) -> &ProxyBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ProxyBase {
        &mut self.base
    }

    fn result(&self) -> String {
        esc_attr(&self.value.to_string())
    }
}

// Display, Serialize and string comparison all go through resolve()
macro_rules! string_like {
    ($($proxy:ty),+ $(,)?) => {$(
        impl fmt::Display for $proxy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.resolve())
            }
        }

        impl Serialize for $proxy {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.resolve())
            }
        }

        impl PartialEq<str> for $proxy {
            fn eq(&self, other: &str) -> bool {
                self.resolve() == other
            }
        }

        impl PartialEq<&str> for $proxy {
            fn eq(&self, other: &&str) -> bool {
                self.resolve() == *other
            }
        }
    )+};
}

string_like!(TextProxy, PluralProxy, EscapeHtmlProxy, EscapeAttrProxy);

impl fmt::Debug for EscapeHtmlProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EscapeHtmlProxy")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for EscapeAttrProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EscapeAttrProxy")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

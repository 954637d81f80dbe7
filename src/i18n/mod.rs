//! Gettext-style localization engine.
//!
//! Message catalogs (GNU MO or Jed JSON) are loaded per locale and text
//! domain, looked up with plural-rule selection, memoized in a
//! locale-partitioned cache and exposed through lazy string proxies.
//!
//! # Architecture
//!
//! - `plural`: Plural-Forms expression parser and evaluator
//! - `mo`, `json`: Catalog codecs
//! - `file`: Translation file (decoded on demand) and the in-memory `Catalog`
//! - `controller`: Load/unload bookkeeping and raw lookups
//! - `hooks`: Filters applied to resolved plural strings
//! - `cache`: Per-locale memo keyed by proxy cache id
//! - `proxy`: `Translator` handle and the lazy proxies it vends
//! - `escape`: HTML and attribute escaping
//! - `locale`: Validated locale identifiers for configuration input
//! - `metrics`: Lookup and cache observability
//!
//! # Example
//!
//! ```rust,ignore
//! use l10n_cache::i18n::{Translator, DEFAULT_DOMAIN};
//!
//! let translator = Translator::for_locale("fr_FR");
//! translator.load("languages/fr_FR.mo", DEFAULT_DOMAIN, None);
//!
//! let greeting = translator.text("Hello", DEFAULT_DOMAIN);
//! println!("{greeting}"); // Bonjour
//! ```

mod cache;
mod controller;
mod error;
mod escape;
mod file;
mod hooks;
mod json;
mod locale;
mod metrics;
mod mo;
mod plural;
mod proxy;

pub use cache::{CacheId, PluralLookup, TranslationCache, MAX_LOCALES};
pub use controller::{Located, TranslationController, DEFAULT_DOMAIN};
pub use error::{CatalogError, LocaleError, PluralParseError};
pub use escape::{esc_attr, esc_html};
pub use file::{
    message_key, normalize_header, Catalog, CatalogFormat, TranslationFile, CONTEXT_SEPARATOR,
    PLURAL_SEPARATOR,
};
pub use hooks::{Filters, PluralArgs, PluralFilter, DEFAULT_PRIORITY, NGETTEXT, NGETTEXT_WITH_CONTEXT};
pub use locale::Locale;
pub use metrics::{MetricsReport, TranslationMetrics};
pub use plural::PluralRule;
pub use proxy::{
    next_cache_id, EscapeAttrProxy, EscapeHtmlProxy, PluralProxy, ProxyBase, StringProxy,
    TextProxy, Translator, MAX_CHAR_OFFSET,
};

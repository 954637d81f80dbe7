//! Translation cache: memoizes resolved strings per call site.
//!
//! Entries live in per-locale partitions keyed by the cache id of the proxy
//! that requested them. Only the current locale's partition is read or
//! written; switching locale keeps older partitions around for quick
//! switching back, bounded by [`MAX_LOCALES`].
//!
//! # Invariants
//!
//! 1. At most [`MAX_LOCALES`] partitions other than the original locale's
//!    survive a prune; the original locale's partition is never evicted.
//! 2. Plural results are cached after filtering, so a filter added after
//!    a cache id was first resolved only applies once that entry is
//!    cleared.

use crate::i18n::controller::TranslationController;
use crate::i18n::hooks::{Filters, PluralArgs};
use crate::i18n::metrics::TranslationMetrics;
use std::collections::HashMap;
use tracing::{debug, info};

/// Process-unique identifier correlating a proxy with its cache slot.
pub type CacheId = u64;

/// Number of non-original locale partitions retained.
pub const MAX_LOCALES: usize = 5;

/// Outcome of [`TranslationCache::lookup_plural`].
#[derive(Debug)]
pub enum PluralLookup {
    /// Already cached for the current locale (filters were applied).
    Cached(String),
    /// Not cached: the raw translation, the locale it belongs to and a
    /// snapshot of the filters to apply before storing it.
    Miss {
        locale: String,
        translation: String,
        filters: Filters,
    },
}

/// Locale-partitioned memo of resolved translations.
#[derive(Debug)]
pub struct TranslationCache {
    controller: TranslationController,
    filters: Filters,
    original_locale: String,
    current_locale: String,
    partitions: HashMap<String, HashMap<CacheId, String>>,
    /// Partition locales, least recently touched first
    recency: Vec<String>,
}

impl TranslationCache {
    /// Wrap `controller`; its current locale becomes the original locale.
    pub fn new(controller: TranslationController) -> Self {
        let original_locale = controller.locale().to_string();
        let mut cache = Self {
            controller,
            filters: Filters::new(),
            current_locale: original_locale.clone(),
            original_locale: original_locale.clone(),
            partitions: HashMap::new(),
            recency: Vec::new(),
        };
        cache.touch(&original_locale);
        cache
    }

    pub fn controller(&self) -> &TranslationController {
        &self.controller
    }

    /// Mutable controller access for loading and unloading catalogs.
    pub fn controller_mut(&mut self) -> &mut TranslationController {
        &mut self.controller
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut Filters {
        &mut self.filters
    }

    pub fn metrics(&self) -> &TranslationMetrics {
        self.controller.metrics()
    }

    pub fn original_locale(&self) -> &str {
        &self.original_locale
    }

    pub fn current_locale(&self) -> &str {
        &self.current_locale
    }

    /// Switch to `locale` and prune old partitions.
    pub fn on_change_locale(&mut self, locale: &str) {
        if locale != self.current_locale {
            info!("Switching locale from {} to {}", self.current_locale, locale);
        }
        self.controller.set_locale(locale);
        self.current_locale = locale.to_string();
        self.touch(locale);
        self.prune_cache();
    }

    fn touch(&mut self, locale: &str) {
        if let Some(position) = self.recency.iter().position(|l| l == locale) {
            let touched = self.recency.remove(position);
            self.recency.push(touched);
        } else {
            self.recency.push(locale.to_string());
        }
        self.partitions.entry(locale.to_string()).or_default();
    }

    /// The current locale's entry for `cache_id`, counting the hit or miss.
    fn cached_current(&self, cache_id: CacheId) -> Option<String> {
        let hit = self
            .partitions
            .get(&self.current_locale)
            .and_then(|partition| partition.get(&cache_id))
            .cloned();
        match hit {
            Some(_) => self.controller.metrics().record_cache_hit(),
            None => self.controller.metrics().record_cache_miss(),
        }
        hit
    }

    /// Store `value` for `cache_id` in `locale`'s partition.
    ///
    /// The current locale's partition is reopened if it was cleared; a
    /// partition pruned in the meantime is not brought back.
    pub fn store_translation(&mut self, locale: &str, cache_id: CacheId, value: String) {
        if locale == self.current_locale && !self.partitions.contains_key(locale) {
            self.touch(locale);
        }
        if let Some(partition) = self.partitions.get_mut(locale) {
            partition.insert(cache_id, value);
        }
    }

    fn memoize(
        &mut self,
        cache_id: CacheId,
        compute: impl FnOnce(&mut TranslationController, &str) -> String,
    ) -> String {
        if let Some(hit) = self.cached_current(cache_id) {
            return hit;
        }

        let locale = self.current_locale.clone();
        let value = compute(&mut self.controller, &locale);
        self.store_translation(&locale, cache_id, value.clone());
        value
    }

    /// Singular lookup, falling back to `text` when no catalog has it.
    pub fn translate(&mut self, cache_id: CacheId, text: &str, domain: &str) -> String {
        self.memoize(cache_id, |controller, locale| {
            controller
                .translate(text, None, domain, Some(locale))
                .unwrap_or_else(|| text.to_string())
        })
    }

    /// Singular lookup under a message context.
    pub fn translate_with_context(
        &mut self,
        cache_id: CacheId,
        text: &str,
        context: &str,
        domain: &str,
    ) -> String {
        self.memoize(cache_id, |controller, locale| {
            controller
                .translate(text, Some(context), domain, Some(locale))
                .unwrap_or_else(|| text.to_string())
        })
    }

    /// Plural lookup, filtered through the plural hooks before caching.
    ///
    /// Without a catalog match the English rule picks between `single`
    /// and `plural`.
    pub fn translate_plural(
        &mut self,
        cache_id: CacheId,
        single: &str,
        plural: &str,
        number: u64,
        context: Option<&str>,
        domain: &str,
    ) -> String {
        let args = PluralArgs {
            single,
            plural,
            number,
            context,
            domain,
        };
        match self.lookup_plural(cache_id, &args) {
            PluralLookup::Cached(value) => value,
            PluralLookup::Miss {
                locale,
                translation,
                filters,
            } => {
                let value = filters.apply_plural(translation, &args);
                self.store_translation(&locale, cache_id, value.clone());
                value
            }
        }
    }

    /// First half of [`TranslationCache::translate_plural`]: the cached
    /// value, or the unfiltered translation plus the filters to run.
    ///
    /// Callers that share the cache behind a `RefCell` run the filters after
    /// releasing their borrow, then call
    /// [`TranslationCache::store_translation`], so filters can resolve
    /// other proxies.
    pub fn lookup_plural(&mut self, cache_id: CacheId, args: &PluralArgs<'_>) -> PluralLookup {
        if let Some(hit) = self.cached_current(cache_id) {
            return PluralLookup::Cached(hit);
        }

        let locale = self.current_locale.clone();
        let translation = self
            .controller
            .translate_plural(
                (args.single, args.plural),
                args.number,
                args.context,
                args.domain,
                Some(&locale),
            )
            .unwrap_or_else(|| {
                if args.number == 1 {
                    args.single.to_string()
                } else {
                    args.plural.to_string()
                }
            });

        PluralLookup::Miss {
            locale,
            translation,
            filters: self.filters.clone(),
        }
    }

    /// Forget `cache_id` in every locale partition.
    pub fn clear_translation(&mut self, cache_id: CacheId) {
        for partition in self.partitions.values_mut() {
            partition.remove(&cache_id);
        }
    }

    /// Drop every partition.
    pub fn clear(&mut self) {
        debug!("Clearing translation cache");
        self.partitions.clear();
        self.recency.clear();
    }

    /// Evict partitions beyond the [`MAX_LOCALES`] most recently touched,
    /// never counting or evicting the original locale.
    pub fn prune_cache(&mut self) {
        let evicted: Vec<String> = self
            .recency
            .iter()
            .rev()
            .filter(|locale| **locale != self.original_locale)
            .skip(MAX_LOCALES)
            .cloned()
            .collect();

        for locale in evicted {
            debug!("Pruning cached translations for {}", locale);
            self.recency.retain(|l| *l != locale);
            self.partitions.remove(&locale);
            self.controller.metrics().record_locale_pruned();
        }
    }

    /// Whether `cache_id` has an entry in any partition.
    pub fn contains(&self, cache_id: CacheId) -> bool {
        self.partitions
            .values()
            .any(|partition| partition.contains_key(&cache_id))
    }

    /// The cached value of `cache_id` in `locale`.
    pub fn cached(&self, locale: &str, cache_id: CacheId) -> Option<&str> {
        self.partitions
            .get(locale)
            .and_then(|partition| partition.get(&cache_id))
            .map(String::as_str)
    }

    /// Locales with a partition, least recently touched first.
    pub fn cached_locales(&self) -> Vec<String> {
        self.recency.clone()
    }
}

//! Filter hooks applied to resolved plural strings.
//!
//! Callbacks subscribe to a hook name and may rewrite the value. The cache
//! runs two rounds on every plural miss, each generic then domain-specific:
//! `ngettext`, `ngettext_{domain}`, `ngettext_with_context`,
//! `ngettext_with_context_{domain}`.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Context-free plural hook.
pub const NGETTEXT: &str = "ngettext";

/// Context-bearing plural hook.
pub const NGETTEXT_WITH_CONTEXT: &str = "ngettext_with_context";

/// Priority used by [`Filters::add`].
pub const DEFAULT_PRIORITY: i32 = 10;

/// Arguments passed to plural filters alongside the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluralArgs<'a> {
    pub single: &'a str,
    pub plural: &'a str,
    pub number: u64,
    pub context: Option<&'a str>,
    pub domain: &'a str,
}

/// A plural filter callback.
pub type PluralFilter = Rc<dyn Fn(String, &PluralArgs<'_>) -> String>;

/// Named filter registry.
#[derive(Clone, Default)]
pub struct Filters {
    hooks: HashMap<String, Vec<(i32, PluralFilter)>>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `callback` to `name` at the default priority.
    pub fn add<F>(&mut self, name: impl Into<String>, callback: F)
    where
        F: Fn(String, &PluralArgs<'_>) -> String + 'static,
    {
        self.add_filter(name, DEFAULT_PRIORITY, callback);
    }

    /// Subscribe `callback` to `name`. Lower priorities run first; equal
    /// priorities run in registration order.
    pub fn add_filter<F>(&mut self, name: impl Into<String>, priority: i32, callback: F)
    where
        F: Fn(String, &PluralArgs<'_>) -> String + 'static,
    {
        let callbacks = self.hooks.entry(name.into()).or_default();
        callbacks.push((priority, Rc::new(callback)));
        callbacks.sort_by_key(|(priority, _)| *priority);
    }

    /// Drop every callback of `name`. Returns whether any existed.
    pub fn remove_all(&mut self, name: &str) -> bool {
        self.hooks.remove(name).is_some()
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.hooks.get(name).is_some_and(|callbacks| !callbacks.is_empty())
    }

    /// Run every callback of `name` over `value`.
    pub fn apply(&self, name: &str, value: String, args: &PluralArgs<'_>) -> String {
        match self.hooks.get(name) {
            Some(callbacks) => callbacks
                .iter()
                .fold(value, |value, (_, callback)| callback(value, args)),
            None => value,
        }
    }

    /// Run both plural rounds over a resolved plural string.
    pub fn apply_plural(&self, value: String, args: &PluralArgs<'_>) -> String {
        let value = self.apply(NGETTEXT, value, args);
        let value = self.apply(&format!("{NGETTEXT}_{}", args.domain), value, args);
        let value = self.apply(NGETTEXT_WITH_CONTEXT, value, args);
        self.apply(&format!("{NGETTEXT_WITH_CONTEXT}_{}", args.domain), value, args)
    }
}

impl fmt::Debug for Filters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.hooks.keys().collect();
        names.sort();
        f.debug_struct("Filters").field("hooks", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> PluralArgs<'static> {
        PluralArgs {
            single: "apple",
            plural: "apples",
            number: 3,
            context: None,
            domain: "shop",
        }
    }

    #[test]
    fn test_apply_without_filters_is_identity() {
        let filters = Filters::new();
        assert_eq!(filters.apply(NGETTEXT, "pommes".into(), &args()), "pommes");
        assert_eq!(filters.apply_plural("pommes".into(), &args()), "pommes");
    }

    #[test]
    fn test_priority_order() {
        let mut filters = Filters::new();
        filters.add_filter(NGETTEXT, 20, |value, _| format!("{value}-late"));
        filters.add_filter(NGETTEXT, 5, |value, _| format!("{value}-early"));
        filters.add(NGETTEXT, |value, _| format!("{value}-default"));

        assert_eq!(
            filters.apply(NGETTEXT, "x".into(), &args()),
            "x-early-default-late"
        );
    }

    #[test]
    fn test_plural_rounds_order() {
        let mut filters = Filters::new();
        filters.add("ngettext_with_context_shop", |v, _| format!("{v}4"));
        filters.add(NGETTEXT_WITH_CONTEXT, |v, _| format!("{v}3"));
        filters.add("ngettext_shop", |v, _| format!("{v}2"));
        filters.add(NGETTEXT, |v, _| format!("{v}1"));
        filters.add("ngettext_other", |v, _| format!("{v}X"));

        assert_eq!(filters.apply_plural(String::new(), &args()), "1234");
    }

    #[test]
    fn test_filter_sees_arguments() {
        let mut filters = Filters::new();
        filters.add(NGETTEXT, |value, args| {
            if args.number > 2 {
                format!("{} {}", args.number, args.plural)
            } else {
                value
            }
        });

        assert_eq!(filters.apply_plural("pommes".into(), &args()), "3 apples");
    }

    #[test]
    fn test_remove_all_and_has_filter() {
        let mut filters = Filters::new();
        assert!(!filters.has_filter(NGETTEXT));
        filters.add(NGETTEXT, |v, _| v);
        assert!(filters.has_filter(NGETTEXT));
        assert!(filters.remove_all(NGETTEXT));
        assert!(!filters.has_filter(NGETTEXT));
        assert!(!filters.remove_all(NGETTEXT));
    }
}

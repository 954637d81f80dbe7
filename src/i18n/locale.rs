//! Validated locale identifiers for configuration input.
//!
//! The translation engine itself takes plain `&str` locales; this type guards
//! the places where a locale enters from outside (environment, CLI).

use crate::i18n::error::LocaleError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

static LOCALE_REGEX: OnceLock<Regex> = OnceLock::new();

/// A locale such as `en_US`, `fr` or `pt_BR_formal`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale(String);

impl Locale {
    /// Validate `code` as `language[_REGION][_variant]`.
    ///
    /// # Example
    /// ```ignore
    /// let locale = Locale::new("fr_FR")?;
    /// assert_eq!(locale.language(), "fr");
    /// ```
    pub fn new(code: &str) -> Result<Self, LocaleError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(LocaleError::Empty);
        }

        let regex = LOCALE_REGEX.get_or_init(|| {
            Regex::new(r"^[a-z]{2,3}(?:_[A-Z]{2})?(?:_[A-Za-z0-9]+)?$").unwrap()
        });
        if !regex.is_match(code) {
            return Err(LocaleError::Invalid(code.to_string()));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The language subtag (`fr` for `fr_FR`).
    pub fn language(&self) -> &str {
        self.0.split('_').next().unwrap_or(&self.0)
    }

    /// The two-letter region subtag, if present.
    pub fn region(&self) -> Option<&str> {
        self.0
            .split('_')
            .nth(1)
            .filter(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_uppercase()))
    }
}

impl FromStr for Locale {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Locale {
    type Error = LocaleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.0
    }
}

impl AsRef<str> for Locale {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

use crate::i18n::{CatalogFormat, Locale, DEFAULT_DOMAIN};
use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    // Locale the translator starts in
    pub locale: Locale,

    // Catalog discovery
    pub languages_dir: PathBuf,
    pub domains: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let locale = std::env::var("L10N_LOCALE").unwrap_or_else(|_| "en_US".to_string());

        Ok(Self {
            locale: Locale::new(&locale).context("L10N_LOCALE is not a valid locale")?,

            languages_dir: std::env::var("L10N_LANGUAGES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("languages")),
            domains: std::env::var("L10N_DOMAINS")
                .ok()
                .map(|v| parse_domains(&v))
                .filter(|domains| !domains.is_empty())
                .unwrap_or_else(|| vec![DEFAULT_DOMAIN.to_string()]),
        })
    }

    /// Catalog paths tried for `domain`, in preference order.
    ///
    /// The default domain lives in `<dir>/<locale>.<ext>`, every other
    /// domain in `<dir>/<domain>-<locale>.<ext>`.
    pub fn catalog_candidates(&self, domain: &str) -> Vec<PathBuf> {
        let stem = if domain == DEFAULT_DOMAIN {
            self.locale.to_string()
        } else {
            format!("{}-{}", domain, self.locale)
        };

        [CatalogFormat::Mo, CatalogFormat::Json]
            .into_iter()
            .map(|format| self.languages_dir.join(format!("{}.{}", stem, format.extension())))
            .collect()
    }

    /// The first existing catalog for `domain`.
    pub fn find_catalog(&self, domain: &str) -> Option<PathBuf> {
        self.catalog_candidates(domain)
            .into_iter()
            .find(|path| path.is_file())
    }
}

fn parse_domains(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|domain| !domain.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::path::Path;
    use tempfile::TempDir;

    fn clear_env() {
        std::env::remove_var("L10N_LOCALE");
        std::env::remove_var("L10N_LANGUAGES_DIR");
        std::env::remove_var("L10N_DOMAINS");
    }

    // ==================== from_env Tests ====================

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env().expect("Should use defaults");
        assert_eq!(config.locale.as_str(), "en_US");
        assert_eq!(config.languages_dir, PathBuf::from("languages"));
        assert_eq!(config.domains, vec!["default".to_string()]);
    }

    #[test]
    #[serial]
    fn test_reads_environment() {
        clear_env();
        std::env::set_var("L10N_LOCALE", "fr_FR");
        std::env::set_var("L10N_LANGUAGES_DIR", "/srv/i18n");
        std::env::set_var("L10N_DOMAINS", "default, shop ,,admin");

        let config = Config::from_env().expect("Should parse");
        assert_eq!(config.locale.as_str(), "fr_FR");
        assert_eq!(config.languages_dir, PathBuf::from("/srv/i18n"));
        assert_eq!(config.domains, vec!["default", "shop", "admin"]);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_locale_is_an_error() {
        clear_env();
        std::env::set_var("L10N_LOCALE", "../../etc/passwd");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("L10N_LOCALE"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_blank_domains_fall_back_to_default() {
        clear_env();
        std::env::set_var("L10N_DOMAINS", " , ");
        let config = Config::from_env().unwrap();
        assert_eq!(config.domains, vec!["default".to_string()]);
        clear_env();
    }

    // ==================== Catalog Path Tests ====================

    fn config_in(dir: &Path, locale: &str) -> Config {
        Config {
            locale: Locale::new(locale).unwrap(),
            languages_dir: dir.to_path_buf(),
            domains: vec![DEFAULT_DOMAIN.to_string()],
        }
    }

    #[test]
    fn test_catalog_candidates() {
        let config = config_in(Path::new("languages"), "de_DE");
        assert_eq!(
            config.catalog_candidates(DEFAULT_DOMAIN),
            vec![
                PathBuf::from("languages/de_DE.mo"),
                PathBuf::from("languages/de_DE.json")
            ]
        );
        assert_eq!(
            config.catalog_candidates("shop")[0],
            PathBuf::from("languages/shop-de_DE.mo")
        );
    }

    #[test]
    fn test_find_catalog_prefers_mo() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path(), "fr_FR");
        assert_eq!(config.find_catalog(DEFAULT_DOMAIN), None);

        std::fs::write(dir.path().join("fr_FR.json"), "{}").unwrap();
        assert_eq!(
            config.find_catalog(DEFAULT_DOMAIN),
            Some(dir.path().join("fr_FR.json"))
        );

        std::fs::write(dir.path().join("fr_FR.mo"), b"").unwrap();
        assert_eq!(
            config.find_catalog(DEFAULT_DOMAIN),
            Some(dir.path().join("fr_FR.mo"))
        );
    }
}

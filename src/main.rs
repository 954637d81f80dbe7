//! Translation lookup tool.
//!
//! Usage:
//!   l10n-cache "Hello" "Goodbye"        # Translate each argument
//!   l10n-cache --headers                 # Print catalog headers per domain
//!   l10n-cache --domain shop "Checkout"  # Look up in another text domain
//!
//! Optional environment variables:
//! - L10N_LOCALE (defaults to en_US)
//! - L10N_LANGUAGES_DIR (defaults to languages)
//! - L10N_DOMAINS (defaults to default)

use anyhow::{bail, Result};
use l10n_cache::config::Config;
use l10n_cache::i18n::{StringProxy, Translator, DEFAULT_DOMAIN};
use tracing::{info, warn};

fn main() -> Result<()> {
    // Load .env file (optional)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("l10n_cache=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let show_headers = args.iter().any(|a| a == "--headers");
    let mut domain = DEFAULT_DOMAIN.to_string();
    let mut texts = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--headers" => {}
            "--domain" => match iter.next() {
                Some(value) => domain = value.clone(),
                None => bail!("--domain requires a value"),
            },
            _ => texts.push(arg.clone()),
        }
    }

    let config = Config::from_env()?;
    info!("Starting translation lookup for locale {}", config.locale);

    let translator = Translator::for_locale(config.locale.as_str());
    for catalog_domain in &config.domains {
        match config.find_catalog(catalog_domain) {
            Some(path) => {
                if !translator.load(&path, catalog_domain, None) {
                    warn!("Could not load {} for domain {}", path.display(), catalog_domain);
                }
            }
            None => warn!(
                "No catalog for domain {} in {}",
                catalog_domain,
                config.languages_dir.display()
            ),
        }
    }

    if show_headers {
        for catalog_domain in &config.domains {
            let headers = translator.with_cache(|cache| cache.controller().get_headers(catalog_domain));
            println!("[{}]", catalog_domain);
            for (name, value) in headers {
                println!("{}: {}", name, value);
            }
        }
    }

    for text in &texts {
        let translated = translator.text(text, &domain);
        println!("{} => {}", text, translated.resolve());
    }

    let report = translator.with_cache(|cache| cache.metrics().report());
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

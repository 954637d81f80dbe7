//! Jed-style JSON catalogs (the format used for script translations).
//!
//! ```json
//! {
//!   "domain": "messages",
//!   "locale_data": {
//!     "messages": {
//!       "": { "domain": "messages", "lang": "fr_FR", "plural-forms": "nplurals=2; plural=(n > 1);" },
//!       "Hello": ["Bonjour"],
//!       "apple": ["pomme", "pommes"]
//!     }
//!   }
//! }
//! ```
//!
//! Plural entries are keyed by the singular text only, which is why the
//! controller retries plural lookups with the bare singular key.

use crate::i18n::error::CatalogError;
use crate::i18n::file::Catalog;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

const DEFAULT_JSON_DOMAIN: &str = "messages";

#[derive(Debug, Serialize, Deserialize)]
struct JedDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    domain: Option<String>,
    locale_data: BTreeMap<String, Map<String, Value>>,
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Catalog, CatalogError> {
    let document: JedDocument = serde_json::from_slice(bytes)?;

    let messages = document
        .domain
        .as_deref()
        .and_then(|domain| document.locale_data.get(domain))
        .or_else(|| document.locale_data.values().next())
        .ok_or(CatalogError::MissingLocaleData)?;

    let mut catalog = Catalog::new();
    for (key, value) in messages {
        if key.is_empty() {
            if let Value::Object(headers) = value {
                for (name, value) in headers {
                    if let Value::String(value) = value {
                        catalog.set_header(name.replace('_', "-"), value.clone());
                    }
                }
            }
            continue;
        }

        // Jed 1.x documents may carry a leading null (the msgid_plural slot)
        let forms: Vec<&str> = match value {
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
            Value::String(single) => vec![single.as_str()],
            _ => continue,
        };
        if !forms.is_empty() {
            catalog.insert(key.clone(), forms.join("\0"));
        }
    }

    Ok(catalog)
}

pub(crate) fn encode(catalog: &Catalog) -> Result<Vec<u8>, CatalogError> {
    let mut messages = Map::new();

    let mut headers: Map<String, Value> = catalog
        .headers()
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();
    headers.insert(
        "domain".to_string(),
        Value::String(DEFAULT_JSON_DOMAIN.to_string()),
    );
    messages.insert(String::new(), Value::Object(headers));

    for (key, translation) in catalog.entries() {
        // Plural keys are stored as "singular\0plural"; JSON keys by the singular
        let singular = key.split('\0').next().unwrap_or(key);
        // Entries are sorted, so a standalone singular precedes its plural
        if messages.contains_key(singular) {
            warn!("Dropping plural entry {:?} from JSON export: key already taken", key);
            continue;
        }
        let forms = translation
            .split('\0')
            .map(|form| Value::String(form.to_string()))
            .collect();
        messages.insert(singular.to_string(), Value::Array(forms));
    }

    let document = JedDocument {
        domain: Some(DEFAULT_JSON_DOMAIN.to_string()),
        locale_data: BTreeMap::from([(DEFAULT_JSON_DOMAIN.to_string(), messages)]),
    };

    Ok(serde_json::to_vec(&document)?)
}

//! HTML and attribute escaping for translated output.
//!
//! Special characters are encoded as entities, except an `&` that already
//! begins a valid entity, so escaping a string twice is harmless.

use regex::Regex;
use std::sync::OnceLock;

static ENTITY_REGEX: OnceLock<Regex> = OnceLock::new();

/// Escape text for use inside HTML element content.
pub fn esc_html(text: &str) -> String {
    encode_special_chars(text)
}

/// Escape text for use inside an HTML attribute value.
pub fn esc_attr(text: &str) -> String {
    encode_special_chars(text)
}

fn starts_with_entity(text: &str) -> bool {
    let regex = ENTITY_REGEX.get_or_init(|| {
        Regex::new(r"^&(?:[A-Za-z][A-Za-z0-9]{1,31}|#[0-9]{1,7}|#[xX][0-9A-Fa-f]{1,6});").unwrap()
    });
    regex.is_match(text)
}

fn encode_special_chars(text: &str) -> String {
    if !text.contains(&['&', '<', '>', '"', '\''][..]) {
        return text.to_string();
    }

    let mut escaped = String::with_capacity(text.len() + 16);
    for (index, c) in text.char_indices() {
        match c {
            '&' if starts_with_entity(&text[index..]) => escaped.push('&'),
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}

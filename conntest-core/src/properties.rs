//! Properties-file loading into a flat [`ConnectionConfig`].
//!
//! The file format is the classic Java `.properties` layout that both
//! connectivity tools read their credentials from:
//!
//! ```text
//! # comment
//! jdbc.url = jdbc:postgresql://db.internal:5432/app
//! jdbc.username=app
//! ldap.search.filter : (objectClass=*)
//! long.value = first part \
//!              second part
//! ```
//!
//! No schema validation happens here. Keys that are not in the file are simply
//! absent from the mapping; the connectors decide what absence means.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Key suffixes whose values are never displayed.
const SECRET_KEY_SUFFIXES: &[&str] = &["password", "credentials"];

/// The properties file could not be opened, read, or decoded.
///
/// Always classified as a configuration error (exit code 2), distinct from
/// any failure of the connection attempt.
#[derive(Debug, Error)]
#[error("{}: {source}", path.display())]
pub struct ConfigFileError {
    /// Path that was being loaded
    pub path: PathBuf,
    /// Underlying I/O failure
    #[source]
    pub source: io::Error,
}

impl ConfigFileError {
    /// Returns true if the file does not exist.
    pub fn is_not_found(&self) -> bool {
        self.source.kind() == io::ErrorKind::NotFound
    }
}

/// Immutable key/value mapping loaded from a properties file.
///
/// # Security
/// `Debug` and `Display` never print the values of password or credential
/// keys.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionConfig {
    entries: BTreeMap<String, String>,
}

impl ConnectionConfig {
    /// Loads and parses the properties file at `path`.
    ///
    /// # Errors
    /// Returns [`ConfigFileError`] if the file cannot be read or contains a
    /// malformed `\uXXXX` escape.
    pub async fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let to_error = |source: io::Error| ConfigFileError {
            path: path.to_path_buf(),
            source,
        };

        let bytes = tokio::fs::read(path).await.map_err(to_error)?;
        let config = Self::parse(&decode(bytes)).map_err(to_error)?;

        if config.is_empty() {
            tracing::debug!("{} defines no properties", path.display());
        } else {
            tracing::debug!(
                "Loaded {} properties from {}",
                config.len(),
                path.display()
            );
        }
        Ok(config)
    }

    /// Parses properties text.
    ///
    /// # Errors
    /// Returns an `InvalidData` error for a malformed `\uXXXX` escape.
    pub fn parse(input: &str) -> io::Result<Self> {
        let mut entries = BTreeMap::new();
        for line in logical_lines(input) {
            let (key, value) = split_key_value(&line)?;
            entries.insert(key, value);
        }
        Ok(Self { entries })
    }

    /// Builds a config from key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the value for `key` as an owned string, if present.
    pub fn get_owned(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    /// Returns a copy of this config with `key` set to `value`.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Iterates over the keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the file held no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if values of `key` must never be displayed.
    pub fn is_secret_key(key: &str) -> bool {
        let lower = key.to_ascii_lowercase();
        SECRET_KEY_SUFFIXES
            .iter()
            .any(|suffix| lower.ends_with(suffix))
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.entries {
            if Self::is_secret_key(key) {
                map.entry(key, &"****");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

impl fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.keys().collect();
        write!(f, "ConnectionConfig([{}])", keys.join(", "))
        // Values are intentionally omitted
    }
}

/// Decodes file content as UTF-8, falling back to ISO-8859-1.
fn decode(bytes: Vec<u8>) -> String {
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().into_iter().map(char::from).collect(),
    };
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{000C}')
}

/// Joins natural lines into logical lines, dropping comments and blanks.
fn logical_lines(input: &str) -> Vec<String> {
    let normalized = input.replace("\r\n", "\n");
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut continuing = false;

    for natural in normalized.split(['\n', '\r']) {
        let trimmed = natural.trim_start_matches(is_blank);

        if !continuing
            && (trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!'))
        {
            continue;
        }

        let trailing_backslashes = trimmed.chars().rev().take_while(|c| *c == '\\').count();
        match trimmed.strip_suffix('\\') {
            Some(head) if trailing_backslashes % 2 == 1 => {
                current.push_str(head);
                continuing = true;
            }
            _ => {
                current.push_str(trimmed);
                lines.push(std::mem::take(&mut current));
                continuing = false;
            }
        }
    }

    // A continuation backslash on the very last line
    if continuing && !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Splits a logical line at the first unescaped separator.
fn split_key_value(line: &str) -> io::Result<(String, String)> {
    let chars: Vec<char> = line.chars().collect();
    let mut key_end = chars.len();
    let mut value_start = chars.len();
    let mut has_separator = false;
    let mut preceding_backslash = false;

    for (index, &c) in chars.iter().enumerate() {
        if !preceding_backslash && (c == '=' || c == ':') {
            key_end = index;
            value_start = index.saturating_add(1);
            has_separator = true;
            break;
        }
        if !preceding_backslash && is_blank(c) {
            key_end = index;
            value_start = index.saturating_add(1);
            break;
        }
        preceding_backslash = c == '\\' && !preceding_backslash;
    }

    while let Some(&c) = chars.get(value_start) {
        if is_blank(c) {
            value_start = value_start.saturating_add(1);
        } else if !has_separator && (c == '=' || c == ':') {
            has_separator = true;
            value_start = value_start.saturating_add(1);
        } else {
            break;
        }
    }

    let key = unescape(chars.get(..key_end).unwrap_or_default())?;
    let value = unescape(chars.get(value_start..).unwrap_or_default())?;
    Ok((key, value))
}

/// Resolves backslash escapes.
fn unescape(chars: &[char]) -> io::Result<String> {
    let mut out = String::with_capacity(chars.len());
    let mut iter = chars.iter().copied();

    while let Some(c) = iter.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match iter.next() {
            Some('u') => {
                let hex: String = iter.by_ref().take(4).collect();
                let code = (hex.len() == 4)
                    .then(|| u32::from_str_radix(&hex, 16).ok())
                    .flatten()
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        io::Error::new(io::ErrorKind::InvalidData, "Malformed \\uxxxx encoding")
                    })?;
                out.push(code);
            }
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

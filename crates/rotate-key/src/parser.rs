//! Transaction id extraction from the client's free-form output.
//!
//! The client offers no stable machine-readable signal, so extraction is a
//! list of strategies tried in order. The bare-hex fallback can pick up any
//! 64-hex value (a block id, for instance) when no labeled id is printed.

use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use url::Url;

pub const DEFAULT_EXPLORER_URL: &str = "https://explorer.xprnetwork.org/transaction/";

static LABELED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\btransaction[_\s]?id["']?\s*[:=]?\s*["']?([0-9a-f]+)\b"#)
        .expect("labeled transaction id pattern is valid")
});

static BARE_HEX_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[0-9a-f]{64}\b").expect("bare transaction id pattern is valid")
});

pub trait TransactionIdExtractor: fmt::Debug + Send + Sync {
    fn extract(&self, output: &str) -> Option<String>;
}

/// Reads the id out of clients that print a JSON document.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonField;

impl TransactionIdExtractor for JsonField {
    fn extract(&self, output: &str) -> Option<String> {
        let value: Value = serde_json::from_str(output.trim()).ok()?;

        ["/transaction_id", "/transactionId", "/processed/id"]
            .into_iter()
            .find_map(|pointer| value.pointer(pointer)?.as_str())
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
    }
}

/// First match of a regex; capture group 1 when present, else the whole match.
#[derive(Clone, Debug)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    pub const fn new(regex: Regex) -> Self {
        Self { regex }
    }

    /// `transaction_id: <hex>`, `transaction id = <hex>`, `"transaction_id": "<hex>"`.
    pub fn labeled() -> Self {
        Self::new(LABELED_ID.clone())
    }

    /// Any standalone 64-character hex token.
    pub fn bare_hex() -> Self {
        Self::new(BARE_HEX_ID.clone())
    }
}

impl TransactionIdExtractor for Pattern {
    fn extract(&self, output: &str) -> Option<String> {
        let captures = self.regex.captures(output)?;
        let found = captures.get(1).or_else(|| captures.get(0))?;

        Some(found.as_str().to_owned())
    }
}

#[derive(Debug)]
pub struct ResponseParser {
    extractors: Vec<Box<dyn TransactionIdExtractor>>,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new(vec![
            Box::new(JsonField),
            Box::new(Pattern::labeled()),
            Box::new(Pattern::bare_hex()),
        ])
    }
}

impl ResponseParser {
    pub fn new(extractors: Vec<Box<dyn TransactionIdExtractor>>) -> Self {
        Self { extractors }
    }

    pub fn transaction_id(&self, output: &str) -> Option<String> {
        self.extractors
            .iter()
            .find_map(|extractor| extractor.extract(output))
    }
}

/// Normalizes an explorer base so that ids are appended rather than
/// replacing the last path segment.
pub fn explorer_base(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

pub fn transaction_link(explorer: &Url, transaction_id: &str) -> String {
    format!("{explorer}{transaction_id}")
}

//! Input records: the item catalog, per-trial responses, and JSONL reading.
//!
//! Every result file is JSON Lines. Real records carry a `UID` and a response
//! field; marker records (`"type": "canary"`) carry the watermark tag and are
//! never treated as responses.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coerce::{coerce_f64, coerce_field};

/// `type` value of marker records.
pub const CANARY_TYPE: &str = "canary";

// ---------------------------------------------------------------------------
// Identifiers and items
// ---------------------------------------------------------------------------

/// Item identifier. Integer in the published data, but strings are accepted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Uid {
    Int(i64),
    Text(String),
}

impl Uid {
    /// Read a UID from a JSON scalar. Integral floats (`3.0`) are accepted.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Uid::Int).or_else(|| {
                let f = n.as_f64()?;
                (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(Uid::Int(f as i64))
            }),
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    None
                } else {
                    Some(Uid::Text(s.to_string()).normalized())
                }
            }
            _ => None,
        }
    }

    /// Integral text (`"12"`) becomes `Int`, so it matches catalog UIDs.
    pub fn normalized(self) -> Self {
        match self {
            Uid::Text(s) => match s.trim().parse::<i64>() {
                Ok(i) => Uid::Int(i),
                Err(_) => Uid::Text(s),
            },
            int => int,
        }
    }

    /// Output map key.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Uid::Int(i) => write!(f, "{i}"),
            Uid::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Uid {
    fn from(v: i64) -> Self {
        Uid::Int(v)
    }
}

/// One reasoning item from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "UID")]
    pub uid: Uid,
    pub premise: String,
    pub hypothesis: String,
    /// Ground-truth label, kept as published (number or text).
    pub hard_label: Value,
}

impl Item {
    /// Parse a catalog line. Extra fields are ignored.
    pub fn from_value(value: &Value) -> io::Result<Self> {
        let mut item = Item::deserialize(value).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("invalid item record: {e}"))
        })?;
        item.uid = item.uid.normalized();
        Ok(item)
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Which field holds the numeric response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseField {
    /// Human result files.
    Response,
    /// Model result files.
    Answer,
}

impl ResponseField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Response => "response",
            Self::Answer => "answer",
        }
    }
}

/// Per-item statistics precomputed upstream and attached to human records.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HumanAnnotation {
    pub median: Option<f64>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub diff_entropy: Option<f64>,
}

impl HumanAnnotation {
    fn from_value(value: &Value) -> Self {
        Self {
            median: coerce_field(value, "median_response"),
            mean: coerce_field(value, "mean_response"),
            std: coerce_field(value, "std_response"),
            diff_entropy: coerce_field(value, "diff_entropy_response"),
        }
    }
}

/// One trial outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRecord {
    pub uid: Uid,
    /// Coerced response; `None` if missing or unparsable.
    pub value: Option<f64>,
    /// Reasoning tokens spent (model records only).
    pub reasoning_tokens: Option<f64>,
    pub annotation: HumanAnnotation,
}

impl ResponseRecord {
    /// Build a record from a JSON line. `None` if the line has no usable UID.
    pub fn from_value(value: &Value, field: ResponseField) -> Option<Self> {
        let uid = value.get("UID").and_then(Uid::from_value)?;
        Some(Self {
            uid,
            value: coerce_field(value, field.as_str()),
            reasoning_tokens: value.get("reasoning_token_count").and_then(coerce_f64),
            annotation: HumanAnnotation::from_value(value),
        })
    }

    /// Shorthand for tests and synthetic inputs.
    pub fn new(uid: impl Into<Uid>, value: Option<f64>) -> Self {
        Self {
            uid: uid.into(),
            value,
            reasoning_tokens: None,
            annotation: HumanAnnotation::default(),
        }
    }
}

/// True for watermark marker lines.
pub fn is_canary(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some(CANARY_TYPE)
}

/// Convert raw lines into response records, dropping marker records and
/// lines without a UID.
pub fn parse_responses(values: &[Value], field: ResponseField) -> Vec<ResponseRecord> {
    let mut skipped = 0usize;
    let records: Vec<ResponseRecord> = values
        .iter()
        .filter(|v| !is_canary(v))
        .filter_map(|v| {
            let rec = ResponseRecord::from_value(v, field);
            if rec.is_none() {
                skipped += 1;
            }
            rec
        })
        .collect();
    if skipped > 0 {
        debug!("skipped {skipped} record(s) without a UID");
    }
    records
}

// ---------------------------------------------------------------------------
// JSONL
// ---------------------------------------------------------------------------

/// Read a JSON Lines file. Blank lines are ignored; lines that are not valid
/// JSON (including lines that are not valid UTF-8) are logged and skipped.
pub fn read_jsonl(path: &Path) -> io::Result<Vec<Value>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut values = Vec::new();
    for (idx, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_slice::<Value>(trimmed) {
            Ok(v) => values.push(v),
            Err(e) => warn!("{}:{}: skipping malformed line: {e}", path.display(), idx + 1),
        }
    }
    Ok(values)
}

/// Read the item catalog. Every line must be a complete item.
pub fn read_items(path: &Path) -> io::Result<Vec<Item>> {
    read_jsonl(path)?
        .iter()
        .map(|v| {
            Item::from_value(v).map_err(|e| {
                io::Error::new(e.kind(), format!("{}: {e}", path.display()))
            })
        })
        .collect()
}

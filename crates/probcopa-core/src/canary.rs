//! Canary watermarking for the published artifact.
//!
//! A canary is a sentinel record carrying an opaque tag taken from the marker
//! line of the human results file. Canaries are spliced into ordered
//! sequences (the item list) and into per-UID response arrays at positions
//! drawn from a `ChaCha8Rng` seeded per target, so a leaked copy of the
//! artifact can be matched to the run that produced it.
//!
//! Insertion only adds elements: real records are never removed or reordered.

use std::collections::BTreeMap;
use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::records::is_canary;

/// Characters of the tag shown in logs.
pub const TAG_DISPLAY_LEN: usize = 16;

/// Opaque watermark tag. Never parsed or validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanaryTag(String);

impl CanaryTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix for log output.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(TAG_DISPLAY_LEN) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }

    /// The sentinel record carrying this tag.
    pub fn sentinel(&self) -> Canary {
        Canary {
            canary_hex: self.0.clone(),
        }
    }
}

impl fmt::Display for CanaryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}...", self.short())
    }
}

/// Sentinel record: `{"type": "canary", "canary_hex": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "canary")]
pub struct Canary {
    pub canary_hex: String,
}

/// An element of a watermarked collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Watermarked<T> {
    Real(T),
    Canary(Canary),
}

impl<T> Watermarked<T> {
    pub fn is_canary(&self) -> bool {
        matches!(self, Watermarked::Canary(_))
    }

    pub fn as_real(&self) -> Option<&T> {
        match self {
            Watermarked::Real(v) => Some(v),
            Watermarked::Canary(_) => None,
        }
    }
}

/// Watermark configuration: how many sentinels go where, and with which seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanaryConfig {
    /// Sentinels spliced into the item list.
    pub item_count: usize,
    pub item_seed: u64,
    /// Human response arrays that receive one sentinel each.
    pub response_count: usize,
    pub response_seed: u64,
}

impl Default for CanaryConfig {
    fn default() -> Self {
        Self {
            item_count: 10,
            item_seed: 42,
            response_count: 20,
            response_seed: 200,
        }
    }
}

// ---------------------------------------------------------------------------
// Tag extraction
// ---------------------------------------------------------------------------

/// The tag of the first marker record, if any. An empty tag means no
/// watermark.
pub fn extract_canary_hex(values: &[Value]) -> Option<CanaryTag> {
    values
        .iter()
        .filter(|v| is_canary(v))
        .find_map(|v| v.get("canary_hex").and_then(Value::as_str))
        .filter(|tag| !tag.is_empty())
        .map(CanaryTag::new)
}

// ---------------------------------------------------------------------------
// Sequence insertion
// ---------------------------------------------------------------------------

/// Insertion offsets for a sequence of length `len`.
///
/// `min(count, len + 1)` distinct offsets drawn uniformly without replacement
/// from `0..=len`, sorted ascending.
pub fn sequence_offsets(len: usize, count: usize, seed: u64) -> Vec<usize> {
    let slots = len + 1;
    let k = count.min(slots);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut offsets = rand::seq::index::sample(&mut rng, slots, k).into_vec();
    offsets.sort_unstable();
    offsets
}

/// Splice sentinels into `seq` at [`sequence_offsets`].
///
/// A sentinel at offset `p` lands immediately before the `p`-th real element;
/// offset `len` appends.
pub fn insert_into_sequence<T>(
    seq: Vec<T>,
    tag: &CanaryTag,
    count: usize,
    seed: u64,
) -> Vec<Watermarked<T>> {
    let offsets = sequence_offsets(seq.len(), count, seed);
    let mut out = Vec::with_capacity(seq.len() + offsets.len());
    let mut pending = offsets.iter().peekable();
    for (pos, item) in seq.into_iter().enumerate() {
        if pending.next_if(|&&p| p == pos).is_some() {
            out.push(Watermarked::Canary(tag.sentinel()));
        }
        out.push(Watermarked::Real(item));
    }
    if pending.next().is_some() {
        out.push(Watermarked::Canary(tag.sentinel()));
    }
    out
}

// ---------------------------------------------------------------------------
// Keyed-array insertion
// ---------------------------------------------------------------------------

/// Where a keyed insertion put its sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedInsertion<K> {
    pub key: K,
    pub offset: usize,
}

/// Insert one sentinel into each of `min(count, map.len())` arrays.
///
/// Keys are sampled without replacement in map order; for each sampled key
/// (in sampling order) one offset is drawn uniformly from `0..=len` of that
/// key's array. Returns the insertions performed.
pub fn insert_into_keyed<K, T>(
    map: &mut BTreeMap<K, Vec<Watermarked<T>>>,
    tag: &CanaryTag,
    count: usize,
    seed: u64,
) -> Vec<KeyedInsertion<K>>
where
    K: Ord + Clone,
{
    let keys: Vec<K> = map.keys().cloned().collect();
    let k = count.min(keys.len());
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let chosen = rand::seq::index::sample(&mut rng, keys.len(), k).into_vec();

    let mut done = Vec::with_capacity(k);
    for idx in chosen {
        let key = &keys[idx];
        let Some(arr) = map.get_mut(key) else {
            continue;
        };
        let offset = rng.random_range(0..=arr.len());
        arr.insert(offset, Watermarked::Canary(tag.sentinel()));
        done.push(KeyedInsertion {
            key: key.clone(),
            offset,
        });
    }
    done
}

/// Wrap every element of every array as a real record.
pub fn wrap_keyed<K: Ord, T>(map: BTreeMap<K, Vec<T>>) -> BTreeMap<K, Vec<Watermarked<T>>> {
    map.into_iter()
        .map(|(k, v)| (k, v.into_iter().map(Watermarked::Real).collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tag() -> CanaryTag {
        CanaryTag::new("deadbeefcafef00d0123456789abcdef")
    }

    fn reals<T: Clone>(seq: &[Watermarked<T>]) -> Vec<T> {
        seq.iter().filter_map(|w| w.as_real().cloned()).collect()
    }

    #[test]
    fn extract_first_marker() {
        let lines = vec![
            json!({"UID": 1, "response": 3}),
            json!({"type": "canary", "canary_hex": "aa11"}),
            json!({"type": "canary", "canary_hex": "bb22"}),
        ];
        assert_eq!(extract_canary_hex(&lines), Some(CanaryTag::new("aa11")));
        assert_eq!(extract_canary_hex(&lines[..1]), None);
    }

    #[test]
    fn empty_tag_disables_watermark() {
        let lines = vec![
            json!({"type": "canary", "canary_hex": ""}),
            json!({"UID": 1, "response": 3}),
        ];
        assert_eq!(extract_canary_hex(&lines), None);
    }

    #[test]
    fn short_tag_for_logs() {
        assert_eq!(tag().short(), "deadbeefcafef00d");
        assert_eq!(CanaryTag::new("ab").short(), "ab");
        assert_eq!(tag().to_string(), "deadbeefcafef00d...");
    }

    #[test]
    fn sentinel_shape() {
        let v = serde_json::to_value(tag().sentinel()).unwrap();
        assert_eq!(v, json!({"type": "canary", "canary_hex": "deadbeefcafef00d0123456789abcdef"}));
        let w: Watermarked<u32> = Watermarked::Real(7);
        assert_eq!(serde_json::to_value(&w).unwrap(), json!(7));
    }

    #[test]
    fn offsets_are_reproducible() {
        let a = sequence_offsets(95, 10, 42);
        let b = sequence_offsets(95, 10, 42);
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
        assert!(a.iter().all(|&p| p <= 95));
        assert_ne!(a, sequence_offsets(95, 10, 43));
    }

    #[test]
    fn sequence_insertion_preserves_order() {
        let seq: Vec<u32> = (0..95).collect();
        let out = insert_into_sequence(seq.clone(), &tag(), 10, 42);
        assert_eq!(out.len(), 105);
        assert_eq!(out.iter().filter(|w| w.is_canary()).count(), 10);
        assert_eq!(reals(&out), seq);
    }

    #[test]
    fn sentinels_land_at_offsets() {
        let seq: Vec<u32> = (0..20).collect();
        let offsets = sequence_offsets(20, 5, 9);
        let out = insert_into_sequence(seq, &tag(), 5, 9);
        // The i-th sentinel (0-based) sits at output index offset + i.
        let canary_idx: Vec<usize> = out
            .iter()
            .enumerate()
            .filter(|(_, w)| w.is_canary())
            .map(|(i, _)| i)
            .collect();
        let expected: Vec<usize> = offsets.iter().enumerate().map(|(i, p)| p + i).collect();
        assert_eq!(canary_idx, expected);
    }

    #[test]
    fn count_is_capped_at_len_plus_one() {
        let out = insert_into_sequence(vec![1, 2, 3], &tag(), 10, 42);
        assert_eq!(out.len(), 7);
        // Every slot is filled: canary and real strictly alternate.
        for (i, w) in out.iter().enumerate() {
            assert_eq!(w.is_canary(), i % 2 == 0);
        }
        let empty = insert_into_sequence(Vec::<u8>::new(), &tag(), 3, 1);
        assert_eq!(empty.len(), 1);
        assert!(empty[0].is_canary());
    }

    #[test]
    fn zero_count_is_identity() {
        let out = insert_into_sequence(vec!['a', 'b'], &tag(), 0, 42);
        assert_eq!(out, vec![Watermarked::Real('a'), Watermarked::Real('b')]);
    }

    fn response_map(keys: usize) -> BTreeMap<String, Vec<Watermarked<Option<f64>>>> {
        let raw: BTreeMap<String, Vec<Option<f64>>> = (0..keys)
            .map(|k| (format!("{k}"), (0..(k % 4)).map(|v| Some(v as f64)).collect()))
            .collect();
        wrap_keyed(raw)
    }

    #[test]
    fn keyed_insertion_touches_exactly_count_keys() {
        let before = response_map(30);
        let mut after = before.clone();
        let done = insert_into_keyed(&mut after, &tag(), 20, 200);
        assert_eq!(done.len(), 20);

        let mut touched = 0;
        for (key, arr) in &after {
            let orig = &before[key];
            let canaries = arr.iter().filter(|w| w.is_canary()).count();
            if done.iter().any(|d| &d.key == key) {
                touched += 1;
                assert_eq!(canaries, 1);
                assert_eq!(arr.len(), orig.len() + 1);
                assert_eq!(reals(arr), reals(orig));
            } else {
                assert_eq!(arr, orig);
            }
        }
        assert_eq!(touched, 20);
    }

    #[test]
    fn keyed_insertion_caps_at_key_count() {
        let mut map = response_map(5);
        let done = insert_into_keyed(&mut map, &tag(), 20, 200);
        assert_eq!(done.len(), 5);
        assert!(map.values().all(|arr| arr.iter().filter(|w| w.is_canary()).count() == 1));
    }

    #[test]
    fn keyed_insertion_is_reproducible() {
        let mut a = response_map(50);
        let mut b = response_map(50);
        let da = insert_into_keyed(&mut a, &tag(), 20, 200);
        let db = insert_into_keyed(&mut b, &tag(), 20, 200);
        assert_eq!(da, db);
        assert_eq!(a, b);
    }

    #[test]
    fn keyed_offset_within_array_bounds() {
        let mut map = response_map(12);
        let lens: BTreeMap<String, usize> = map.iter().map(|(k, v)| (k.clone(), v.len())).collect();
        for ins in insert_into_keyed(&mut map, &tag(), 12, 3) {
            assert!(ins.offset <= lens[&ins.key]);
            assert!(map[&ins.key][ins.offset].is_canary());
        }
    }
}

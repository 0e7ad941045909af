//! Strict-JSON sanitizing of the assembled output tree.
//!
//! JSON has no NaN or Infinity. Every float in the output tree is an
//! `Option<f64>`; sanitizing walks the tree and turns any non-finite value
//! into `None`, which serializes as `null`.

use std::collections::BTreeMap;

use crate::canary::Watermarked;
use crate::records::Item;

/// Replace non-finite floats reachable from `self` with absence.
pub trait Sanitize {
    fn sanitize(&mut self);
}

/// Sanitize by value.
pub fn sanitize<T: Sanitize>(mut value: T) -> T {
    value.sanitize();
    value
}

/// `Some(x)` if `x` is finite.
pub fn finite(x: f64) -> Option<f64> {
    x.is_finite().then_some(x)
}

impl Sanitize for Option<f64> {
    fn sanitize(&mut self) {
        *self = self.and_then(finite);
    }
}

impl<T: Sanitize> Sanitize for Vec<T> {
    fn sanitize(&mut self) {
        self.iter_mut().for_each(|v| v.sanitize());
    }
}

impl<K, T: Sanitize> Sanitize for BTreeMap<K, T> {
    fn sanitize(&mut self) {
        self.values_mut().for_each(|v| v.sanitize());
    }
}

impl<T: Sanitize> Sanitize for Watermarked<T> {
    fn sanitize(&mut self) {
        if let Watermarked::Real(inner) = self {
            inner.sanitize();
        }
    }
}

// Items hold text and a JSON label only.
impl Sanitize for Item {
    fn sanitize(&mut self) {}
}

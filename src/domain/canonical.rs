//! Canonical serialization of parameter sets for signing and verification.
//!
//! The canonical form is `k1=v1&k2=v2&...` over the non-reserved entries,
//! sorted by key in byte order. Nested values are rendered as compact JSON.

use super::params::{ParameterSet, RESERVED_KEYS};

/// Knobs that differ between the acquirer's protocol generations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalOptions {
    /// Drop entries whose value is empty. Required by the legacy protocol.
    pub drop_empty: bool,
    /// Extra keys excluded on top of `sign` and `sign_type`.
    pub reserved: Vec<String>,
}

impl CanonicalOptions {
    pub fn dropping_empty() -> Self {
        Self {
            drop_empty: true,
            reserved: Vec::new(),
        }
    }

    pub fn keeping_empty() -> Self {
        Self::default()
    }

    fn is_reserved(&self, key: &str) -> bool {
        RESERVED_KEYS.contains(&key) || self.reserved.iter().any(|r| r == key)
    }
}

/// Canonical string form of `params`.
pub fn canonical_string(params: &ParameterSet, options: &CanonicalOptions) -> String {
    let mut pairs: Vec<(&str, String)> = params
        .iter()
        .filter(|(key, _)| !options.is_reserved(key))
        .filter(|(_, value)| !(options.drop_empty && value.is_empty()))
        .map(|(key, value)| (key, value.to_string()))
        .collect();

    // ParameterSet already iterates in key order; sort anyway so the output
    // never depends on the container.
    pairs.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

/// Canonical UTF-8 bytes of `params`. Empty when nothing remains.
pub fn canonicalize(params: &ParameterSet, options: &CanonicalOptions) -> Vec<u8> {
    canonical_string(params, options).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ParameterSet {
        [
            ("trade_status", "TRADE_SUCCESS"),
            ("out_trade_no", "SO1001"),
            ("trade_no", "2017A"),
            ("sign", "c2lnbmF0dXJl"),
            ("sign_type", "RSA2"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_sorted_join_without_reserved_keys() {
        let canonical = canonical_string(&sample(), &CanonicalOptions::keeping_empty());
        assert_eq!(
            canonical,
            "out_trade_no=SO1001&trade_no=2017A&trade_status=TRADE_SUCCESS"
        );
    }

    #[test]
    fn test_reserved_values_do_not_matter() {
        let mut altered = sample();
        altered.insert("sign", "something else entirely");
        altered.insert("sign_type", "RSA");

        let options = CanonicalOptions::keeping_empty();
        assert_eq!(canonicalize(&sample(), &options), canonicalize(&altered, &options));
    }

    #[test]
    fn test_extra_reserved_keys() {
        let options = CanonicalOptions {
            drop_empty: false,
            reserved: vec!["trade_no".to_string()],
        };
        assert_eq!(
            canonical_string(&sample(), &options),
            "out_trade_no=SO1001&trade_status=TRADE_SUCCESS"
        );
    }

    #[test]
    fn test_drop_empty_toggle() {
        let mut params = sample();
        params.insert("body", "");

        assert_eq!(
            canonical_string(&params, &CanonicalOptions::dropping_empty()),
            "out_trade_no=SO1001&trade_no=2017A&trade_status=TRADE_SUCCESS"
        );
        assert_eq!(
            canonical_string(&params, &CanonicalOptions::keeping_empty()),
            "body=&out_trade_no=SO1001&trade_no=2017A&trade_status=TRADE_SUCCESS"
        );
    }

    #[test]
    fn test_nested_value_is_compact_json() {
        let mut params = ParameterSet::new();
        params.insert("promo", json!({"code": "A1", "pct": 10}));
        params.insert("amount", "9.90");

        assert_eq!(
            canonical_string(&params, &CanonicalOptions::keeping_empty()),
            r#"amount=9.90&promo={"code":"A1","pct":10}"#
        );
    }

    #[test]
    fn test_nested_value_keeps_declared_order() {
        let mut params = ParameterSet::new();
        params.insert("biz", json!({"zeta": 1, "alpha": 2}));

        assert_eq!(
            canonical_string(&params, &CanonicalOptions::keeping_empty()),
            r#"biz={"zeta":1,"alpha":2}"#
        );
    }

    #[test]
    fn test_byte_order_puts_uppercase_and_underscore_first() {
        let params: ParameterSet = [("b", "1"), ("_input_charset", "utf-8"), ("B", "2"), ("a", "3")]
            .into_iter()
            .collect();
        assert_eq!(
            canonical_string(&params, &CanonicalOptions::keeping_empty()),
            "B=2&_input_charset=utf-8&a=3&b=1"
        );
    }

    #[test]
    fn test_only_reserved_keys_yield_empty_bytes() {
        let params: ParameterSet = [("sign", "x"), ("sign_type", "RSA2")].into_iter().collect();
        assert!(canonicalize(&params, &CanonicalOptions::keeping_empty()).is_empty());
        assert!(canonicalize(&ParameterSet::new(), &CanonicalOptions::dropping_empty()).is_empty());
    }
}

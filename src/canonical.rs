//! Order-insensitive JSON comparison.
//!
//! A document is canonicalized recursively: object entries are sorted by key,
//! and array elements are sorted, so two documents compare equal when they hold
//! the same key/value pairs and the same multiset of elements at every level.

use std::cmp::Ordering;

use serde_json::{Number, Value};

/// A JSON value in canonical (sorted) form with a total order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Canonical {
    Null,
    Bool(bool),
    Number(CanonicalNumber),
    String(String),
    Array(Vec<Canonical>),
    Object(Vec<(String, Canonical)>),
}

impl Canonical {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Canonical::Null,
            Value::Bool(b) => Canonical::Bool(*b),
            Value::Number(n) => Canonical::Number(CanonicalNumber::from(n)),
            Value::String(s) => Canonical::String(s.clone()),
            Value::Array(items) => {
                let mut items: Vec<_> = items.iter().map(Canonical::from_value).collect();
                items.sort();
                Canonical::Array(items)
            }
            Value::Object(map) => {
                let mut entries: Vec<_> = map
                    .iter()
                    .map(|(key, value)| (key.clone(), Canonical::from_value(value)))
                    .collect();
                entries.sort();
                Canonical::Object(entries)
            }
        }
    }
}

/// Returns true when `a` and `b` are equal up to key order and element order.
pub fn json_equivalent(a: &Value, b: &Value) -> bool {
    Canonical::from_value(a) == Canonical::from_value(b)
}

/// A JSON number with a total order.
///
/// Values compare by their exact numeric value, so `1` and `1.0` are equal
/// but an integer above 2^53 never equals the float it rounds to.
#[derive(Debug, Clone, Copy)]
pub enum CanonicalNumber {
    Int(i128),
    Float(f64),
}

impl From<&Number> for CanonicalNumber {
    fn from(n: &Number) -> Self {
        if let Some(i) = n.as_i64() {
            CanonicalNumber::Int(i128::from(i))
        } else if let Some(u) = n.as_u64() {
            CanonicalNumber::Int(i128::from(u))
        } else {
            CanonicalNumber::Float(n.as_f64().unwrap_or(f64::NAN))
        }
    }
}

impl Ord for CanonicalNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        match (*self, *other) {
            (CanonicalNumber::Int(a), CanonicalNumber::Int(b)) => a.cmp(&b),
            (CanonicalNumber::Int(i), CanonicalNumber::Float(f)) => cmp_int_float(i, f),
            (CanonicalNumber::Float(f), CanonicalNumber::Int(i)) => cmp_int_float(i, f).reverse(),
            (CanonicalNumber::Float(a), CanonicalNumber::Float(b)) => {
                // -0.0 and 0.0 must stay equal.
                if a == b {
                    Ordering::Equal
                } else {
                    a.total_cmp(&b)
                }
            }
        }
    }
}

/// Exact comparison of an integer with a float.
///
/// Rounding to `f64` is monotonic, so a strict difference after rounding is
/// also a difference before it. A tie means `f` is integral and in range.
fn cmp_int_float(i: i128, f: f64) -> Ordering {
    let rounded = i as f64;
    if rounded == f {
        i.cmp(&(f as i128))
    } else {
        rounded.total_cmp(&f)
    }
}

impl PartialOrd for CanonicalNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for CanonicalNumber {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CanonicalNumber {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_is_ignored() {
        assert!(json_equivalent(
            &json!({"a": 1, "b": 2}),
            &json!({"b": 2, "a": 1})
        ));
    }

    #[test]
    fn value_differences_are_detected() {
        assert!(!json_equivalent(&json!({"a": 1}), &json!({"a": 2})));
        assert!(!json_equivalent(&json!({"a": 1}), &json!({"b": 1})));
        assert!(!json_equivalent(&json!("1"), &json!(1)));
    }

    #[test]
    fn arrays_compare_as_multisets() {
        assert!(json_equivalent(&json!([1, 2]), &json!([2, 1])));
        assert!(json_equivalent(&json!([1, 1, 2]), &json!([1, 2, 1])));
        assert!(!json_equivalent(&json!([1, 1, 2]), &json!([1, 2, 2])));
        assert!(!json_equivalent(&json!([1, 2]), &json!([1, 2, 2])));
    }

    #[test]
    fn nesting_is_canonicalized_recursively() {
        let a = json!({
            "tests": [
                {"name": "t1", "points": [3, 1], "meta": {"x": null, "y": true}},
                {"name": "t0", "points": []}
            ]
        });
        let b = json!({
            "tests": [
                {"points": [], "name": "t0"},
                {"meta": {"y": true, "x": null}, "points": [1, 3], "name": "t1"}
            ]
        });
        assert!(json_equivalent(&a, &b));
        assert!(json_equivalent(&b, &a));
    }

    #[test]
    fn mixed_type_arrays_have_a_stable_order() {
        assert!(json_equivalent(
            &json!([null, "s", 2, {"k": 1}, [1], false]),
            &json!([[1], false, {"k": 1}, 2, "s", null])
        ));
    }

    #[test]
    fn integers_and_floats_compare_numerically() {
        assert!(json_equivalent(&json!(1), &json!(1.0)));
        assert!(json_equivalent(&json!([2.5, 1]), &json!([1.0, 2.5])));
        assert!(!json_equivalent(&json!(1), &json!(1.5)));
        assert!(json_equivalent(&json!(u64::MAX), &json!(u64::MAX)));
        assert!(!json_equivalent(&json!(u64::MAX), &json!(u64::MAX - 1)));
    }

    #[test]
    fn large_integers_never_match_a_rounded_float() {
        let n: i64 = 1 << 53;
        let float = n as f64;

        assert!(json_equivalent(&json!(n), &json!(float)));
        assert!(!json_equivalent(&json!(n + 1), &json!(float)));

        let actual = json!([n + 1, float]);
        let expected = json!([float, n]);
        let expected_reordered = json!([n, float]);
        assert!(!json_equivalent(&actual, &expected));
        assert_eq!(
            json_equivalent(&actual, &expected),
            json_equivalent(&actual, &expected_reordered)
        );
        assert!(json_equivalent(&json!([n, float, n + 1]), &json!([n + 1, n, float])));
    }

    #[test]
    fn number_order_is_transitive_across_ints_and_floats() {
        let n: i128 = 1 << 53;
        let values = [
            CanonicalNumber::Int(n),
            CanonicalNumber::Int(n + 1),
            CanonicalNumber::Float(n as f64),
            CanonicalNumber::Float((n + 2) as f64),
            CanonicalNumber::Float(-0.0),
            CanonicalNumber::Int(0),
        ];
        for a in &values {
            for b in &values {
                for c in &values {
                    if a <= b && b <= c {
                        assert!(a <= c, "{:?} <= {:?} <= {:?}", a, b, c);
                    }
                }
            }
        }
    }

    #[test]
    fn equivalence_is_symmetric() {
        let samples = [
            json!({"x": [1, 2, 3]}),
            json!({"x": [3, 2, 1]}),
            json!({"x": [3, 2]}),
            json!([]),
            json!({}),
        ];
        for a in &samples {
            for b in &samples {
                assert_eq!(json_equivalent(a, b), json_equivalent(b, a));
            }
        }
    }
}

//! Result comparator: type-aware deep equality between an entry point's
//! actual return value and a test case's expected value.

use crate::types::DynamicValue;

/// Absolute tolerance for float-to-float comparison.
pub const FLOAT_TOLERANCE: f64 = 1e-9;

/// Decide whether `actual` equals `expected`.
///
/// Rules, in order: float pairs compare within [`FLOAT_TOLERANCE`] (NaN
/// equals nothing); sequences compare element-wise; mappings compare by
/// key set and per-key values; everything else falls through to native
/// equality, with numeric kinds comparing across type the way the
/// submission language does.
pub fn values_equal(actual: &DynamicValue, expected: &DynamicValue) -> bool {
    match (actual, expected) {
        (DynamicValue::Float(a), DynamicValue::Float(b)) => (a - b).abs() < FLOAT_TOLERANCE,
        (DynamicValue::Seq(a), DynamicValue::Seq(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (DynamicValue::Map(a), DynamicValue::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| values_equal(x, y)))
        }
        (DynamicValue::Unit, DynamicValue::Unit) => true,
        (DynamicValue::Text(a), DynamicValue::Text(b)) => a == b,
        (DynamicValue::Int(a), DynamicValue::Int(b)) => a == b,
        (DynamicValue::Bool(a), DynamicValue::Bool(b)) => a == b,
        (a, b) => match (a.as_number(), b.as_number()) {
            // Exact numeric equality across int/float/bool, not the
            // tolerant float rule: that one needs floats on both sides.
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn seq(items: Vec<DynamicValue>) -> DynamicValue {
        DynamicValue::Seq(items)
    }

    #[test]
    fn floats_compare_within_tolerance() {
        let sum = DynamicValue::Float(0.1 + 0.2);
        let expected = DynamicValue::Float(0.3);
        assert!(values_equal(&sum, &expected));
        assert!(!values_equal(
            &DynamicValue::Float(0.3001),
            &DynamicValue::Float(0.3)
        ));
    }

    #[test]
    fn nan_equals_nothing_including_itself() {
        let nan = DynamicValue::Float(f64::NAN);
        assert!(!values_equal(&nan, &nan));
        assert!(!values_equal(&nan, &DynamicValue::Float(1.0)));
    }

    #[test]
    fn comparator_is_reflexive_on_nan_free_values() {
        let mut map = BTreeMap::new();
        map.insert("k".to_string(), seq(vec![DynamicValue::Float(1.5)]));
        let values = [
            DynamicValue::Unit,
            DynamicValue::Bool(false),
            DynamicValue::Int(-7),
            DynamicValue::Float(3.25),
            DynamicValue::Text("reflexive".into()),
            seq(vec![DynamicValue::Int(1), DynamicValue::Text("x".into())]),
            DynamicValue::Map(map),
        ];
        for v in &values {
            assert!(values_equal(v, v), "{:?} should equal itself", v);
        }
    }

    #[test]
    fn sequences_compare_recursively() {
        let a = seq(vec![DynamicValue::Float(1.0 + 1e-12), DynamicValue::Int(2)]);
        let b = seq(vec![DynamicValue::Float(1.0), DynamicValue::Int(2)]);
        assert!(values_equal(&a, &b));
        assert!(!values_equal(
            &seq(vec![DynamicValue::Int(1)]),
            &seq(vec![DynamicValue::Int(1), DynamicValue::Int(2)])
        ));
    }

    #[test]
    fn mappings_compare_by_key_set() {
        let mut a = BTreeMap::new();
        a.insert("x".to_string(), DynamicValue::Int(1));
        let mut b = BTreeMap::new();
        b.insert("x".to_string(), DynamicValue::Int(1));
        assert!(values_equal(&DynamicValue::Map(a.clone()), &DynamicValue::Map(b.clone())));

        b.insert("y".to_string(), DynamicValue::Int(2));
        assert!(!values_equal(&DynamicValue::Map(a), &DynamicValue::Map(b)));
    }

    #[test]
    fn mixed_numeric_kinds_compare_exactly() {
        assert!(values_equal(&DynamicValue::Int(5), &DynamicValue::Float(5.0)));
        assert!(values_equal(&DynamicValue::Bool(true), &DynamicValue::Int(1)));
        assert!(!values_equal(
            &DynamicValue::Int(5),
            &DynamicValue::Float(5.0000001)
        ));
    }

    #[test]
    fn cross_type_comparisons_are_false() {
        assert!(!values_equal(
            &DynamicValue::Text("1".into()),
            &DynamicValue::Int(1)
        ));
        assert!(!values_equal(
            &seq(vec![]),
            &DynamicValue::Map(BTreeMap::new())
        ));
        assert!(!values_equal(&DynamicValue::Unit, &DynamicValue::Bool(false)));
    }
}

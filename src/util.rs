/// Asserts that a numerical value is in the provided interval `[a,b]` and panics
/// with a helpful message if not
///
/// ### Example
/// ```ignore
/// let value = 2.0;
/// assert_interval!(value, 0.0, 1.0);
/// ```
/// This will panic with the message "Invalid value for \`value\`. Must be in the interval \[0.0, 1.0\]."
#[macro_export]
macro_rules! assert_interval {
    ($var:expr, $a:expr, $b:expr) => {
        assert!(
            $var >= $a && $var <= $b,
            "Invalid value for `{}`. Must be in the interval [{}, {}].",
            stringify!($var),
            $a,
            $b,
        );
    };
}

/// Index of the first maximum of `values`
///
/// **Panics** if `values` is empty
pub(crate) fn argmax(values: &[f64]) -> usize {
    assert!(!values.is_empty(), "Cannot take the argmax of an empty slice");
    values
        .iter()
        .enumerate()
        .fold(0, |best, (i, &v)| if v > values[best] { i } else { best })
}

/// Indices of every entry tied for the maximum of `values`
pub(crate) fn argmax_ties(values: &[f64]) -> Vec<usize> {
    let max = max(values);
    values
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v == max)
        .map(|(i, _)| i)
        .collect()
}

/// Largest entry of `values`, or negative infinity if empty
pub(crate) fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_picks_first_maximum() {
        assert_eq!(argmax(&[0.0, 2.0, 1.0, 2.0]), 1);
        assert_eq!(argmax(&[-1.0]), 0);
    }

    #[test]
    fn argmax_ties_collects_all() {
        assert_eq!(argmax_ties(&[1.0, 0.0, 1.0]), vec![0, 2]);
        assert_eq!(argmax_ties(&[3.0]), vec![0]);
    }

    #[test]
    #[should_panic(expected = "Must be in the interval")]
    fn assert_interval_panics() {
        let value = 2.0;
        assert_interval!(value, 0.0, 1.0);
    }
}

//! Crossover detection between two aligned indicator series.

/// True when `a` strictly crosses above `b` at bar `i`.
///
/// Requires both series defined at `i` and `i - 1`, with `a[i-1] <= b[i-1]`
/// and `a[i] > b[i]`. Any undefined value, or `i == 0`, yields false.
pub fn crossover(a: &[Option<f64>], b: &[Option<f64>], i: usize) -> bool {
    if i == 0 {
        return false;
    }
    let values = (
        a.get(i - 1).copied().flatten(),
        b.get(i - 1).copied().flatten(),
        a.get(i).copied().flatten(),
        b.get(i).copied().flatten(),
    );
    match values {
        (Some(a_prev), Some(b_prev), Some(a_now), Some(b_now)) => {
            a_prev <= b_prev && a_now > b_now
        }
        _ => false,
    }
}

/// True when `a` strictly crosses below `b` at bar `i`.
pub fn crossunder(a: &[Option<f64>], b: &[Option<f64>], i: usize) -> bool {
    crossover(b, a, i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_cross_above() {
        let a = [Some(1.0), Some(3.0)];
        let b = [Some(2.0), Some(2.0)];
        assert!(crossover(&a, &b, 1));
        assert!(!crossunder(&a, &b, 1));
    }

    #[test]
    fn touch_then_cross_counts() {
        let a = [Some(2.0), Some(2.5)];
        let b = [Some(2.0), Some(2.0)];
        assert!(crossover(&a, &b, 1));
    }

    #[test]
    fn staying_above_is_not_a_cross() {
        let a = [Some(3.0), Some(4.0)];
        let b = [Some(2.0), Some(2.0)];
        assert!(!crossover(&a, &b, 1));
    }

    #[test]
    fn equal_now_is_not_a_cross() {
        let a = [Some(1.0), Some(2.0)];
        let b = [Some(2.0), Some(2.0)];
        assert!(!crossover(&a, &b, 1));
    }

    #[test]
    fn undefined_values_never_cross() {
        let a = [None, Some(3.0)];
        let b = [Some(2.0), Some(2.0)];
        assert!(!crossover(&a, &b, 1));

        let a = [Some(1.0), Some(3.0)];
        let b = [Some(2.0), None];
        assert!(!crossover(&a, &b, 1));
    }

    #[test]
    fn first_bar_and_out_of_range() {
        let a = [Some(3.0)];
        let b = [Some(2.0)];
        assert!(!crossover(&a, &b, 0));
        assert!(!crossover(&a, &b, 5));
    }

    #[test]
    fn detects_cross_below() {
        let a = [Some(3.0), Some(1.0)];
        let b = [Some(2.0), Some(2.0)];
        assert!(crossunder(&a, &b, 1));
    }
}

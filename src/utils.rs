use ndarray::{Array1, ArrayView1};
use num_traits::Float;

/// Exponentiates and normalizes `x` after subtracting its maximum, so large
/// scores cannot overflow.
pub(crate) fn softmax<V>(x: ArrayView1<V>) -> Array1<V>
where
    V: Float,
{
    let max = x.iter().fold(V::neg_infinity(), |a, b| a.max(*b));
    let exp = x.mapv(|v| (v - max).exp());
    let sum = exp.iter().fold(V::zero(), |a, b| a + *b);
    exp.mapv(|v| v / sum)
}

/// Index of the largest element; ties go to the first occurrence.
/// Elements that do not compare with themselves (NaN) are skipped.
pub(crate) fn argmax<V, I>(x: I) -> Option<usize>
where
    V: PartialOrd,
    I: IntoIterator<Item = V>,
{
    let mut best: Option<(usize, V)> = None;
    for (i, v) in x.into_iter().enumerate() {
        if v.partial_cmp(&v).is_none() {
            continue;
        }
        let better = match &best {
            Some((_, b)) => v > *b,
            None => true,
        };
        if better {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, Array1};
    use proptest::prelude::*;

    use super::{argmax, softmax};

    #[test]
    fn should_stay_finite_for_large_scores() {
        let p = softmax(arr1(&[1000., 0., -1000.]).view());
        assert!(p.iter().all(|v: &f64| v.is_finite()));
        assert_abs_diff_eq!(p[0], 1., epsilon = 1e-12);
    }

    #[test]
    fn should_pick_the_first_maximum() {
        assert_eq!(argmax(vec![1., 3., 3., 2.]), Some(1));
        assert_eq!(argmax(Vec::<f64>::new()), None);
    }

    #[test]
    fn should_skip_nan_scores() {
        assert_eq!(argmax(vec![f64::NAN, 0.5, 2., f64::NAN]), Some(2));
        assert_eq!(argmax(vec![-1., f64::NAN, -3.]), Some(0));
        assert_eq!(argmax(vec![f64::NAN, f64::NAN]), None);
    }

    proptest! {
        #[test]
        fn prop_softmax_sums_to_one(xs in prop::collection::vec(-1000.0f64..1000.0, 1..32)) {
            let p = softmax(Array1::from_vec(xs).view());
            prop_assert!(p.iter().all(|v| v.is_finite() && *v >= 0.));
            prop_assert!((p.sum() - 1.).abs() < 1e-9);
        }
    }
}

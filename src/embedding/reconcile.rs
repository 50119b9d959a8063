//! Adapting query vectors to the dimensionality of a persisted index.

/// Resize `vector` to exactly `dimension` components.
///
/// Shorter vectors are padded with zeros, longer ones keep their first
/// `dimension` components. The query-time vectorizer may be fit on a different
/// corpus than the index was built from, so this is lossy: it trades semantic
/// fidelity for never failing a query on a length mismatch.
pub fn reconcile_dimension(mut vector: Vec<f32>, dimension: usize) -> Vec<f32> {
    vector.resize(dimension, 0.0);
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pads_short_vector_with_zeros() {
        let out = reconcile_dimension(vec![1.0, 2.0], 5);
        assert_eq!(out, vec![1.0, 2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_truncates_long_vector_to_prefix() {
        let input = vec![1.0, 2.0, 3.0, 4.0];
        let out = reconcile_dimension(input.clone(), 2);
        assert_eq!(out, input[..2].to_vec());
    }

    #[test]
    fn test_equal_length_is_unchanged() {
        let input = vec![0.5, 0.25, 0.125];
        assert_eq!(reconcile_dimension(input.clone(), 3), input);
    }

    #[test]
    fn test_output_length_always_matches_target() {
        for len in 0..6 {
            for target in 0..6 {
                let input: Vec<f32> = (0..len).map(|i| i as f32 + 1.0).collect();
                let out = reconcile_dimension(input.clone(), target);
                assert_eq!(out.len(), target);
                let shared = len.min(target);
                assert_eq!(&out[..shared], &input[..shared]);
                assert!(out[shared..].iter().all(|&x| x == 0.0));
            }
        }
    }
}

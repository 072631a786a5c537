//! Shared mathematical utilities for sparse vector operations.
//!
//! Sparse vectors are slices of `(index, value)` pairs sorted by index with
//! no duplicate indices.

/// A sparse vector entry: `(dimension index, value)`
pub type SparseEntry = (usize, f32);

/// Compute the L2 norm (magnitude) of a sparse vector.
pub fn l2_norm(v: &[SparseEntry]) -> f32 {
    v.iter().map(|(_, x)| x * x).sum::<f32>().sqrt()
}

/// Compute the dot product of two sparse vectors.
///
/// Both inputs must be sorted by index.
pub fn sparse_dot(a: &[SparseEntry], b: &[SparseEntry]) -> f32 {
    let (mut i, mut j) = (0, 0);
    let mut dot = 0.0f32;

    while i < a.len() && j < b.len() {
        let (ia, va) = a[i];
        let (ib, vb) = b[j];
        match ia.cmp(&ib) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += va * vb;
                i += 1;
                j += 1;
            }
        }
    }

    dot
}

/// Turn a precomputed dot product and norms into a cosine similarity.
///
/// Returns 0.0 when either norm is zero.
pub fn cosine_from_parts(dot: f32, norm_a: f32, norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Compute cosine similarity between two sparse vectors.
///
/// Returns 0.0 if either vector is empty or has zero magnitude.
///
/// # Returns
/// Cosine similarity in range [-1.0, 1.0]
pub fn sparse_cosine(a: &[SparseEntry], b: &[SparseEntry]) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    cosine_from_parts(sparse_dot(a, b), l2_norm(a), l2_norm(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_cosine_identical() {
        let a = vec![(0, 1.0), (3, 2.0)];
        assert!((sparse_cosine(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sparse_cosine_disjoint_support() {
        let a = vec![(0, 1.0), (2, 1.0)];
        let b = vec![(1, 1.0), (3, 1.0)];
        assert_eq!(sparse_cosine(&a, &b), 0.0);
    }

    #[test]
    fn test_sparse_cosine_opposite() {
        let a = vec![(4, 1.0)];
        let b = vec![(4, -1.0)];
        assert!((sparse_cosine(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sparse_cosine_scaled() {
        let a = vec![(0, 0.5), (1, 0.5)];
        let b = vec![(0, 4.0), (1, 4.0)];
        // Same direction, should be 1.0
        assert!((sparse_cosine(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sparse_cosine_empty() {
        let a: Vec<SparseEntry> = vec![];
        let b = vec![(0, 1.0)];
        assert_eq!(sparse_cosine(&a, &b), 0.0);
    }

    #[test]
    fn test_sparse_cosine_zero_vector() {
        let a = vec![(0, 0.0), (1, 0.0)];
        let b = vec![(0, 1.0)];
        assert_eq!(sparse_cosine(&a, &b), 0.0);
    }

    #[test]
    fn test_sparse_dot_partial_overlap() {
        let a = vec![(0, 1.0), (2, 2.0), (5, 3.0)];
        let b = vec![(2, 4.0), (3, 7.0), (5, 1.0)];
        assert!((sparse_dot(&a, &b) - 11.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_norm() {
        let v = vec![(1, 3.0), (9, 4.0)];
        assert!((l2_norm(&v) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_from_parts_zero_norm() {
        assert_eq!(cosine_from_parts(1.0, 0.0, 2.0), 0.0);
    }
}

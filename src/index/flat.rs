//! Exact (flat) nearest-neighbor index.

use std::cmp::Ordering;

use super::{IndexError, IndexResult};

/// One search hit: an index row and its Euclidean distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f32,
}

/// Immutable collection of equal-length vectors searched by brute force.
///
/// Vectors are stored contiguously in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    rows: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Build an index whose dimensionality is the length of the first vector.
    ///
    /// An empty input yields an empty index of dimensionality 0.
    ///
    /// # Errors
    /// Returns `IndexError::DimensionMismatch` if any vector differs in length
    /// from the first one.
    pub fn build(vectors: Vec<Vec<f32>>) -> IndexResult<Self> {
        let dimension = vectors.first().map_or(0, Vec::len);
        Self::with_dimension(dimension, vectors)
    }

    /// Build an index with an explicit dimensionality.
    ///
    /// # Errors
    /// Returns `IndexError::DimensionMismatch` for the first vector whose length
    /// is not `dimension`.
    pub fn with_dimension(dimension: usize, vectors: Vec<Vec<f32>>) -> IndexResult<Self> {
        let rows = vectors.len();
        let mut data = Vec::with_capacity(dimension * rows);
        for (row, vector) in vectors.into_iter().enumerate() {
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    row,
                    expected: dimension,
                    found: vector.len(),
                });
            }
            data.extend(vector);
        }
        Ok(Self {
            dimension,
            rows,
            data,
        })
    }

    /// Build directly from row-major storage; `data.len()` must be `dimension * rows`.
    pub(crate) fn from_raw(dimension: usize, rows: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), dimension * rows);
        Self {
            dimension,
            rows,
            data,
        }
    }

    pub(crate) fn raw(&self) -> &[f32] {
        &self.data
    }

    /// Number of components in every stored vector.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored vector at `row`, if any.
    pub fn vector(&self, row: usize) -> Option<&[f32]> {
        if row >= self.len() {
            return None;
        }
        let start = row * self.dimension;
        Some(&self.data[start..start + self.dimension])
    }

    /// The `k` rows closest to `query`, nearest first.
    ///
    /// Ties keep row order. Returns every row when `k` exceeds the row count and
    /// nothing when the index is empty.
    ///
    /// # Errors
    /// Returns `IndexError::QueryDimension` if the query length differs from the
    /// index dimensionality; callers reconcile query vectors first.
    pub fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<Neighbor>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(IndexError::QueryDimension {
                expected: self.dimension,
                found: query.len(),
            });
        }

        let mut neighbors: Vec<Neighbor> = (0..self.rows)
            .map(|row| {
                let start = row * self.dimension;
                Neighbor {
                    row,
                    distance: euclidean_distance(query, &self.data[start..start + self.dimension]),
                }
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then(a.row.cmp(&b.row))
        });
        neighbors.truncate(k);

        Ok(neighbors)
    }
}

/// Euclidean (L2) distance between two equal-length vectors.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

//! 3-D projection of the whole collection for visualization.
//!
//! Each call reads a fresh snapshot, fits PCA to it, and rescales every axis
//! into `[-10, 10]`. Nothing is cached between calls.

use ndarray::Array2;

use crate::catalog::pca;
use crate::catalog::store::EmbeddingStore;
use crate::catalog::types::{ImageRecord, ProjectedPoint};
use crate::error::{Error, Result};

/// Fewest records a rank-3 projection is computed for.
pub const MIN_RECORDS: usize = 3;

/// Output dimensionality.
pub const AXES: usize = 3;

/// Half-width of the display range; coordinates land in `[-HALF_RANGE, HALF_RANGE]`.
pub const HALF_RANGE: f64 = 10.0;

/// An axis whose spread is within this fraction of its largest magnitude is
/// collapsed to `0.0`. Scale-relative, so small but distinct scores still span
/// the full range.
pub const AXIS_EPSILON: f64 = f64::EPSILON;

/// Produces the opaque preview payload paired with each projected point.
pub trait PreviewGenerator: Send + Sync {
    fn preview(&self, record: &ImageRecord) -> String;
}

impl<F> PreviewGenerator for F
where
    F: Fn(&ImageRecord) -> String + Send + Sync,
{
    fn preview(&self, record: &ImageRecord) -> String {
        self(record)
    }
}

/// Project every stored image into display space, in insertion order.
pub fn project(
    store: &EmbeddingStore,
    previews: &dyn PreviewGenerator,
) -> Result<Vec<ProjectedPoint>> {
    let records = store.fetch_all()?;
    if records.len() < MIN_RECORDS {
        return Err(Error::InsufficientData {
            required: MIN_RECORDS,
            actual: records.len(),
        });
    }

    let dim = store.dimensions();
    let matrix = Array2::from_shape_fn((records.len(), dim), |(i, j)| {
        f64::from(records[i].embedding[j])
    });
    let mut scores = pca::fit_transform(&matrix, AXES);
    normalize_axes(&mut scores);

    let points: Vec<ProjectedPoint> = records
        .iter()
        .zip(scores.rows())
        .map(|(record, row)| ProjectedPoint {
            id: record.id,
            position: [row[0] as f32, row[1] as f32, row[2] as f32],
            preview: previews.preview(record),
        })
        .collect();

    tracing::debug!(points = points.len(), dim, "projection computed");
    Ok(points)
}

/// Min-max scale each column into `[-HALF_RANGE, HALF_RANGE]`. A column with
/// no spread (relative to [`AXIS_EPSILON`]) or a non-finite one becomes all
/// zeros.
pub fn normalize_axes(scores: &mut Array2<f64>) {
    for mut column in scores.columns_mut() {
        let (min, max) = column
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let range = max - min;
        let scale = min.abs().max(max.abs());
        if !range.is_finite() || range <= AXIS_EPSILON * scale {
            column.fill(0.0);
            continue;
        }
        column.mapv_inplace(|v| (v - min) / range * (2.0 * HALF_RANGE) - HALF_RANGE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn normalize_hits_both_ends_exactly() {
        let mut scores = array![[3.0, -1.0], [7.0, 0.5], [5.0, 2.0]];
        normalize_axes(&mut scores);
        assert_eq!(scores.column(0).to_vec(), vec![-10.0, 10.0, 0.0]);
        assert_eq!(scores[[0, 1]], -10.0);
        assert_eq!(scores[[2, 1]], 10.0);
    }

    #[test]
    fn flat_axis_maps_to_zero() {
        let mut scores = array![[1.0, 4.0, 0.0], [2.0, 4.0, 0.0], [3.0, 4.0, 0.0]];
        normalize_axes(&mut scores);
        assert!(scores.column(1).iter().all(|&v| v == 0.0));
        assert!(scores.column(2).iter().all(|&v| v == 0.0));
        assert!(scores.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn tiny_spread_still_spans_full_range() {
        let mut scores = array![[-3e-11], [1e-12], [2e-11]];
        normalize_axes(&mut scores);
        assert_eq!(scores[[0, 0]], -10.0);
        assert_eq!(scores[[2, 0]], 10.0);
    }

    #[test]
    fn too_few_records_is_insufficient() {
        let store = EmbeddingStore::open_in_memory(3).unwrap();
        store.insert("a.jpg", &[1.0, 0.0, 0.0]).unwrap();
        let err = project(&store, &|_: &ImageRecord| String::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientData {
                required: 3,
                actual: 1
            }
        ));
    }
}

//! Per-column min-max scaling.

use fcx_schemas::Dataset;

/// Scale every column into `[0, 1]`.
///
/// Non-finite values are filled with `0.0` before scaling. A constant column
/// (zero range) maps to all zeros. Shape and column labels are unchanged.
pub fn min_max_normalize(data: &Dataset) -> Dataset {
    let n_cols = data.n_cols();
    let mut mins = vec![f64::INFINITY; n_cols];
    let mut maxs = vec![f64::NEG_INFINITY; n_cols];

    for row in data.rows() {
        for (j, v) in row.iter().enumerate() {
            let v = fill(*v);
            mins[j] = mins[j].min(v);
            maxs[j] = maxs[j].max(v);
        }
    }

    let rows = data
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(j, v)| {
                    let range = maxs[j] - mins[j];
                    if range > 0.0 {
                        (fill(*v) - mins[j]) / range
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect();

    // Same labels and row widths as the input, so the shape check cannot fail.
    Dataset::new(data.columns().to_vec(), rows).unwrap_or_else(|_| data.clone())
}

fn fill(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

use crate::error::Result;
use crate::kernel::Kernel;
use log::debug;
use ndarray::{Array2, ArrayView2, Zip};
use rayon::prelude::*;

/// Map a possibly out-of-range index into `[0, len)` by half-sample reflection.
///
/// `... c b a | a b c d | d c b ...`; the edge sample is repeated. Indices further than
/// one length away keep bouncing between the two edges.
#[inline]
pub fn reflect_index(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let len = len as isize;
    let mut i = i;
    while i < 0 || i >= len {
        if i < 0 {
            i = -i - 1;
        } else {
            i = 2 * len - i - 1;
        }
    }
    i as usize
}

/// Source index of every kernel tap along one axis, `len * n` entries.
fn tap_table(len: usize, n: usize, anchor: usize) -> Vec<usize> {
    let mut table = Vec::with_capacity(len * n);
    for pos in 0..len {
        for tap in 0..n {
            let offset = pos as isize + tap as isize - anchor as isize;
            table.push(reflect_index(offset, len));
        }
    }
    table
}

/// Correlate a band with a centered kernel under reflective boundary extension.
///
/// `out[y][x] = sum_{i,j} k[i][j] * in[reflect(y + i - N/2)][reflect(x + j - N/2)]`.
/// The kernel is not flipped.
pub fn correlate_reflect(data: ArrayView2<'_, f64>, kernel: &Kernel) -> Result<Array2<f64>> {
    let (nrows, ncols) = data.dim();
    let n = kernel.size();
    let anchor = kernel.anchor();
    let weights = kernel.weights();

    debug!(
        "Correlating {}x{} grid with {}x{} kernel (anchor {})",
        ncols, nrows, n, n, anchor
    );

    let row_taps = tap_table(nrows, n, anchor);
    let col_taps = tap_table(ncols, n, anchor);

    // Rows are independent; the result is identical for any thread count
    let rows: Vec<Vec<f64>> = (0..nrows)
        .into_par_iter()
        .map(|row| {
            let src_rows = &row_taps[row * n..(row + 1) * n];
            (0..ncols)
                .map(|col| {
                    let src_cols = &col_taps[col * n..(col + 1) * n];
                    let mut acc = 0.0;
                    for (i, &src_row) in src_rows.iter().enumerate() {
                        for (j, &src_col) in src_cols.iter().enumerate() {
                            acc += weights[[i, j]] * data[[src_row, src_col]];
                        }
                    }
                    acc
                })
                .collect()
        })
        .collect();

    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Ok(Array2::from_shape_vec((nrows, ncols), flat)?)
}

/// Whether `value` is the nodata sentinel; NaN sentinels match NaN samples
#[inline]
pub fn is_nodata(value: f64, nodata: f64) -> bool {
    value == nodata || (nodata.is_nan() && value.is_nan())
}

/// Put the sentinel back wherever the pre-convolution sample was nodata.
///
/// Returns the number of restored pixels.
pub fn restore_nodata(original: ArrayView2<'_, f64>, result: &mut Array2<f64>, nodata: f64) -> usize {
    let mut restored = 0;
    Zip::from(result).and(original).for_each(|out, &value| {
        if is_nodata(value, nodata) {
            *out = nodata;
            restored += 1;
        }
    });
    restored
}

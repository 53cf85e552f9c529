//! Equivalence-class partitioning and k-anonymity calculation.
//!
//! The partition is a pure function of (dataset, QI set): rows are grouped
//! by their joint value tuple on the QI attributes, and a record's
//! k-anonymity is the size of its group. Grouping is a single hashing pass
//! over the rows, never a pairwise comparison.

use std::collections::HashMap;

use log::debug;

use crate::data::{Dataset, QiSet, Value};
use crate::error::{InvariantViolation, Result};

/// Partition the dataset rows by their value tuple on `qi`.
///
/// Keys are value tuples in the QI set's attribute order; each class holds
/// the ascending row indices sharing that tuple. Missing values take part in
/// grouping as a distinct, stable value: two records both missing an
/// attribute are equal on it, and a missing value never matches a present
/// one. This deliberately differs from treating missing as a wildcard or
/// dropping the row, either of which would change the reported class sizes.
///
/// An attribute absent from the schema fails with a configuration error; an
/// empty dataset yields an empty map.
pub fn equivalence_classes(
    dataset: &Dataset,
    qi: &QiSet,
) -> Result<HashMap<Vec<Value>, Vec<usize>>> {
    let columns = qi.resolve(dataset.schema())?;
    let mut classes: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
    for (row, values) in dataset.rows().iter().enumerate() {
        let key: Vec<Value> = columns.iter().map(|&col| values[col].clone()).collect();
        classes.entry(key).or_default().push(row);
    }
    debug!(
        "partitioned {} rows into {} classes on [{}]",
        dataset.n_rows(),
        classes.len(),
        qi
    );
    Ok(classes)
}

/// Per-record k values and the set-level minimum class size.
///
/// Every record receives exactly one k, the size of its equivalence class;
/// the second return value is the smallest class size, the QI set's overall
/// k-anonymity (0 when there are no rows). A record covered zero or two
/// times, or class sizes that do not sum to the row count, can only come
/// from a broken partition and surface as invariant violations.
pub fn per_record_k(
    n_rows: usize,
    classes: &HashMap<Vec<Value>, Vec<usize>>,
) -> Result<(Vec<usize>, usize)> {
    let mut k_values = vec![0usize; n_rows];
    let mut covered = 0usize;
    let mut min_k = usize::MAX;
    for indices in classes.values() {
        let size = indices.len();
        min_k = min_k.min(size);
        for &row in indices {
            if row >= n_rows || k_values[row] != 0 {
                return Err(InvariantViolation::RowCoverage { row }.into());
            }
            k_values[row] = size;
        }
        covered += size;
    }
    if covered != n_rows {
        return Err(InvariantViolation::ClassSizeSum {
            sum: covered,
            rows: n_rows,
        }
        .into());
    }
    let min_k = if classes.is_empty() { 0 } else { min_k };
    Ok((k_values, min_k))
}

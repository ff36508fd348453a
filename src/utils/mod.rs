use crate::error::CopacError;
use ndarray::ArrayView2;

/// Identifier of an object in a [`crate::Dataset`].
pub type ObjectId = usize;

/// Order in which eigenpairs are arranged by eigenvalue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Fails with a Numeric error naming the first non-finite entry.
pub(crate) fn ensure_finite(matrix: ArrayView2<f64>) -> anyhow::Result<()> {
    if let Some(((row, col), value)) = matrix.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(CopacError::numeric(format!(
            "matrix entry ({row}, {col}) is not finite: {value}"
        ))
        .into());
    }
    Ok(())
}

/// Fails with a Parameter error unless `value` is finite and satisfies `check`.
pub(crate) fn ensure_param(
    name: &str,
    value: f64,
    constraint: &str,
    check: impl Fn(f64) -> bool,
) -> anyhow::Result<()> {
    if !value.is_finite() || !check(value) {
        return Err(CopacError::parameter(format!("{name} must be {constraint}, got {value}")).into());
    }
    Ok(())
}

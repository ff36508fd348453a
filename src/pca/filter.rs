//! # Eigenpair Filters
//!
//! A filter splits sorted eigenpairs into a *strong* subset, the local
//! correlation subspace, and a *weak* subset treated as noise. Filters see the
//! pairs strongest-first regardless of the sort order they were given in, and
//! the split they return is aligned with the input order.
//!
//! Negative eigenvalues caused by round-off count as zero variance.

use std::fmt::Debug;
use std::sync::Arc;

use crate::eigen::{EigenPair, SortedEigenPairs};
use crate::utils::{ensure_param, SortOrder};

pub const DEFAULT_ALPHA: f64 = 0.85;
pub const DEFAULT_RALPHA: f64 = 1.1;

/// Policy deciding which eigenpairs are strong.
pub trait EigenPairFilter: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn filter(&self, pairs: &SortedEigenPairs) -> FilteredEigenPairs;
}

/// Sorted eigenpairs together with a strong/weak label per pair.
///
/// Each pair carries exactly one label, so the strong and weak subsequences
/// are disjoint and together reproduce the sorted input.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredEigenPairs {
    pairs: Vec<EigenPair>,
    strong: Vec<bool>,
    order: SortOrder,
}

impl FilteredEigenPairs {
    /// Labels pair `i` of `pairs` as strong iff `is_strong(i, pair)`.
    pub fn from_fn(pairs: &SortedEigenPairs, is_strong: impl Fn(usize, &EigenPair) -> bool) -> Self {
        let strong = pairs
            .pairs()
            .iter()
            .enumerate()
            .map(|(i, p)| is_strong(i, p))
            .collect();
        FilteredEigenPairs {
            pairs: pairs.pairs().to_vec(),
            strong,
            order: pairs.order(),
        }
    }

    /// Marks the `count` most significant pairs as strong.
    pub fn with_strong_count(pairs: &SortedEigenPairs, count: usize) -> Self {
        let ranks = significance_ranks(pairs);
        Self::from_fn(pairs, |i, _| ranks[i] < count)
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// All pairs in their sorted order.
    pub fn pairs(&self) -> &[EigenPair] {
        &self.pairs
    }

    pub fn is_strong(&self, index: usize) -> bool {
        self.strong.get(index).copied().unwrap_or(false)
    }

    pub fn strong_pairs(&self) -> impl Iterator<Item = &EigenPair> + '_ {
        self.labelled().filter(|(s, _)| *s).map(|(_, p)| p)
    }

    pub fn weak_pairs(&self) -> impl Iterator<Item = &EigenPair> + '_ {
        self.labelled().filter(|(s, _)| !*s).map(|(_, p)| p)
    }

    pub fn strong_count(&self) -> usize {
        self.strong.iter().filter(|&&s| s).count()
    }

    pub fn weak_count(&self) -> usize {
        self.len() - self.strong_count()
    }

    fn labelled(&self) -> impl Iterator<Item = (bool, &EigenPair)> + '_ {
        self.strong.iter().copied().zip(self.pairs.iter())
    }
}

/// Positions of the pairs from strongest to weakest.
fn significance_order(pairs: &SortedEigenPairs) -> Vec<usize> {
    match pairs.order() {
        SortOrder::Descending => (0..pairs.len()).collect(),
        SortOrder::Ascending => (0..pairs.len()).rev().collect(),
    }
}

/// `ranks[i]` is the significance rank of pair `i`, 0 being the strongest.
fn significance_ranks(pairs: &SortedEigenPairs) -> Vec<usize> {
    let mut ranks = vec![0; pairs.len()];
    for (rank, index) in significance_order(pairs).into_iter().enumerate() {
        ranks[index] = rank;
    }
    ranks
}

/// Eigenvalues strongest-first, negatives clamped to zero.
fn significant_values(pairs: &SortedEigenPairs) -> Vec<f64> {
    significance_order(pairs)
        .into_iter()
        .map(|i| pairs.pairs()[i].eigenvalue.max(0.0))
        .collect()
}

/// Strong pairs are the shortest strongest-first prefix whose share of the
/// total variance reaches `alpha`. The pair that reaches it is strong.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentageEigenPairFilter {
    alpha: f64,
}

impl PercentageEigenPairFilter {
    pub fn new(alpha: f64) -> anyhow::Result<Self> {
        ensure_param("alpha", alpha, "in (0, 1]", |a| a > 0.0 && a <= 1.0)?;
        Ok(PercentageEigenPairFilter { alpha })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Default for PercentageEigenPairFilter {
    fn default() -> Self {
        PercentageEigenPairFilter { alpha: DEFAULT_ALPHA }
    }
}

impl EigenPairFilter for PercentageEigenPairFilter {
    fn name(&self) -> &'static str {
        "percentage"
    }

    fn filter(&self, pairs: &SortedEigenPairs) -> FilteredEigenPairs {
        let values = significant_values(pairs);
        let total: f64 = values.iter().sum();
        if self.alpha >= 1.0 || total <= 0.0 {
            return FilteredEigenPairs::with_strong_count(pairs, pairs.len());
        }

        let mut cumulative = 0.0;
        let mut count = values.len();
        for (rank, value) in values.iter().enumerate() {
            cumulative += value;
            if cumulative / total >= self.alpha {
                count = rank + 1;
                break;
            }
        }
        FilteredEigenPairs::with_strong_count(pairs, count)
    }
}

/// The `n` strongest pairs are strong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirstNEigenPairFilter {
    n: usize,
}

impl FirstNEigenPairFilter {
    pub fn new(n: usize) -> Self {
        FirstNEigenPairFilter { n }
    }
}

impl EigenPairFilter for FirstNEigenPairFilter {
    fn name(&self) -> &'static str {
        "first-n"
    }

    fn filter(&self, pairs: &SortedEigenPairs) -> FilteredEigenPairs {
        FilteredEigenPairs::with_strong_count(pairs, self.n.min(pairs.len()))
    }
}

/// Scans from the weakest pair upwards; the first pair whose eigenvalue is at
/// least `ralpha` times the mean of itself and all weaker pairs closes the
/// strong prefix. Without such a pair every direction is strong.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeEigenPairFilter {
    ralpha: f64,
}

impl RelativeEigenPairFilter {
    pub fn new(ralpha: f64) -> anyhow::Result<Self> {
        ensure_param("ralpha", ralpha, "non-negative", |r| r >= 0.0)?;
        Ok(RelativeEigenPairFilter { ralpha })
    }
}

impl Default for RelativeEigenPairFilter {
    fn default() -> Self {
        RelativeEigenPairFilter { ralpha: DEFAULT_RALPHA }
    }
}

impl EigenPairFilter for RelativeEigenPairFilter {
    fn name(&self) -> &'static str {
        "relative"
    }

    fn filter(&self, pairs: &SortedEigenPairs) -> FilteredEigenPairs {
        let values = significant_values(pairs);
        let d = values.len();
        let mut count = d;

        if d > 1 {
            let mut tail_sum = values[d - 1];
            for rank in (0..d - 1).rev() {
                tail_sum += values[rank];
                let mean = tail_sum / (d - rank) as f64;
                if values[rank] > 0.0 && values[rank] >= self.ralpha * mean {
                    count = rank + 1;
                    break;
                }
            }
        }
        FilteredEigenPairs::with_strong_count(pairs, count)
    }
}

/// Strong while the eigenvalue is at least `delta` (absolute mode) or at least
/// `delta` times the largest eigenvalue (relative mode).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitEigenPairFilter {
    delta: f64,
    absolute: bool,
}

impl LimitEigenPairFilter {
    pub fn new(delta: f64, absolute: bool) -> anyhow::Result<Self> {
        if absolute {
            ensure_param("delta", delta, "non-negative", |d| d >= 0.0)?;
        } else {
            ensure_param("delta", delta, "in [0, 1] for a relative limit", |d| {
                (0.0..=1.0).contains(&d)
            })?;
        }
        Ok(LimitEigenPairFilter { delta, absolute })
    }
}

impl EigenPairFilter for LimitEigenPairFilter {
    fn name(&self) -> &'static str {
        "limit"
    }

    fn filter(&self, pairs: &SortedEigenPairs) -> FilteredEigenPairs {
        let values = significant_values(pairs);
        let limit = if self.absolute {
            self.delta
        } else {
            values.first().copied().unwrap_or(0.0) * self.delta
        };
        let count = values.iter().take_while(|&&v| v >= limit).count();
        FilteredEigenPairs::with_strong_count(pairs, count)
    }
}

/// Knee detection: the strong prefix ends where the ratio between an
/// eigenvalue and the next weaker one is largest. A flat spectrum is all strong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignificantEigenPairFilter;

impl EigenPairFilter for SignificantEigenPairFilter {
    fn name(&self) -> &'static str {
        "significant"
    }

    fn filter(&self, pairs: &SortedEigenPairs) -> FilteredEigenPairs {
        let values = significant_values(pairs);
        let mut count = values.len();
        let mut max_contrast = 1.0;

        for (rank, w) in values.windows(2).enumerate() {
            let contrast = if w[1] > 0.0 {
                w[0] / w[1]
            } else if w[0] > 0.0 {
                f64::INFINITY
            } else {
                1.0
            };
            if contrast > max_contrast {
                max_contrast = contrast;
                count = rank + 1;
            }
        }
        FilteredEigenPairs::with_strong_count(pairs, count)
    }
}

/// Configuration-time choice of the eigenpair filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterPolicy {
    Percentage { alpha: f64 },
    FirstN { n: usize },
    Relative { ralpha: f64 },
    Limit { delta: f64, absolute: bool },
    Significant,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        FilterPolicy::Percentage {
            alpha: DEFAULT_ALPHA,
        }
    }
}

impl FilterPolicy {
    /// Validates the policy's parameters and instantiates the filter.
    pub fn into_filter(self) -> anyhow::Result<Arc<dyn EigenPairFilter>> {
        let filter: Arc<dyn EigenPairFilter> = match self {
            FilterPolicy::Percentage { alpha } => Arc::new(PercentageEigenPairFilter::new(alpha)?),
            FilterPolicy::FirstN { n } => Arc::new(FirstNEigenPairFilter::new(n)),
            FilterPolicy::Relative { ralpha } => Arc::new(RelativeEigenPairFilter::new(ralpha)?),
            FilterPolicy::Limit { delta, absolute } => Arc::new(LimitEigenPairFilter::new(delta, absolute)?),
            FilterPolicy::Significant => Arc::new(SignificantEigenPairFilter),
        };
        Ok(filter)
    }
}

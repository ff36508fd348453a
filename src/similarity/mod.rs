use ndarray::ArrayView1;
use num_traits::{Float, FromPrimitive, ToPrimitive};

/// Similarity of two vectors, larger meaning more alike.
pub trait SimilarityMeasure: Send + Sync {
    fn calculate<T>(&self, a: ArrayView1<T>, b: ArrayView1<T>) -> f64
    where
        T: Float + FromPrimitive + ToPrimitive;
}

/// `exp(-gamma * d)` for the Euclidean distance `d`, in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EuclideanSimilarity {
    gamma: f64,
}

impl EuclideanSimilarity {
    pub fn new(gamma: f64) -> Self {
        Self { gamma }
    }
}

impl Default for EuclideanSimilarity {
    fn default() -> Self {
        Self { gamma: 1.0 }
    }
}

impl SimilarityMeasure for EuclideanSimilarity {
    fn calculate<T>(&self, a: ArrayView1<T>, b: ArrayView1<T>) -> f64
    where
        T: Float + FromPrimitive + ToPrimitive,
    {
        let squared = a
            .iter()
            .zip(b.iter())
            .fold(T::zero(), |acc, (&x, &y)| acc + (x - y) * (x - y));
        let distance = squared.sqrt().to_f64().unwrap_or(f64::INFINITY);
        (-self.gamma * distance).exp()
    }
}

/// Cosine of the angle between the vectors; 0 when either is the zero vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CosineSimilarity;

impl SimilarityMeasure for CosineSimilarity {
    fn calculate<T>(&self, a: ArrayView1<T>, b: ArrayView1<T>) -> f64
    where
        T: Float + FromPrimitive + ToPrimitive,
    {
        let (dot, norm_a, norm_b) = a.iter().zip(b.iter()).fold(
            (T::zero(), T::zero(), T::zero()),
            |(dot, na, nb), (&x, &y)| (dot + x * y, na + x * x, nb + y * y),
        );
        let norm = (norm_a * norm_b).sqrt();
        if norm > T::epsilon() {
            (dot / norm).to_f64().unwrap_or(0.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_euclidean_similarity() {
        let a = array![0.0, 0.0];
        let b = array![3.0, 4.0];
        let sim = EuclideanSimilarity::default();
        assert_abs_diff_eq!(sim.calculate(a.view(), b.view()), (-5.0f64).exp(), epsilon = 1e-12);
        assert_abs_diff_eq!(sim.calculate(a.view(), a.view()), 1.0);

        let steep = EuclideanSimilarity::new(2.0);
        assert!(steep.calculate(a.view(), b.view()) < sim.calculate(a.view(), b.view()));
    }

    #[test]
    fn test_cosine_similarity() {
        let a = array![1.0f32, 2.0, 3.0];
        let b = array![2.0f32, 4.0, 6.0];
        assert_abs_diff_eq!(CosineSimilarity.calculate(a.view(), b.view()), 1.0, epsilon = 1e-6);

        let zero = array![0.0f32, 0.0, 0.0];
        assert_eq!(CosineSimilarity.calculate(a.view(), zero.view()), 0.0);
    }
}

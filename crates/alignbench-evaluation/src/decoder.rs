// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Condition decoders used inside each cross-validation fold.

A [`DecoderSpec`] is a recipe; every fold calls [`DecoderSpec::build`] to get a
fresh, untrained instance so nothing learned in one fold reaches another.
Both decoders are deterministic: classes are ordered by label and ties go to
the first class in that order.
*/

use alignbench_config::DecoderConfig;
use alignbench_structures::{AlignBenchError, AlignBenchResult, Label};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Classifier trained on a feature matrix and its condition labels
pub trait Decoder: Send {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[Label]) -> AlignBenchResult<()>;

    fn predict(&self, x: ArrayView2<'_, f64>) -> AlignBenchResult<Vec<Label>>;

    /// Fraction of rows whose predicted label equals `y`
    fn score(&self, x: ArrayView2<'_, f64>, y: &[Label]) -> AlignBenchResult<f64> {
        let predicted = self.predict(x)?;
        accuracy(&predicted, y)
    }
}

/// Fraction of positions where `predicted` and `truth` agree
pub fn accuracy(predicted: &[Label], truth: &[Label]) -> AlignBenchResult<f64> {
    if predicted.len() != truth.len() {
        return Err(AlignBenchError::shape_mismatch(
            "accuracy",
            format!("{} labels", truth.len()),
            format!("{} predictions", predicted.len()),
        ));
    }
    if truth.is_empty() {
        return Err(AlignBenchError::EmptyTable("labels to score".to_string()));
    }
    let correct = predicted.iter().zip(truth).filter(|(p, t)| p == t).count();
    Ok(correct as f64 / truth.len() as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoderKind {
    NearestCentroid,
    Logistic,
}

impl DecoderKind {
    pub fn from_name(name: &str) -> AlignBenchResult<Self> {
        match name.trim() {
            "nearest_centroid" => Ok(DecoderKind::NearestCentroid),
            "logistic" => Ok(DecoderKind::Logistic),
            other => Err(AlignBenchError::InvalidParameter(format!(
                "unknown decoder '{}'",
                other
            ))),
        }
    }
}

/// Recipe for building a fresh decoder per fold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderSpec {
    pub kind: DecoderKind,
    pub learning_rate: f64,
    pub epochs: usize,
    pub l2: f64,
}

impl Default for DecoderSpec {
    fn default() -> Self {
        DecoderSpec {
            kind: DecoderKind::NearestCentroid,
            learning_rate: 0.1,
            epochs: 200,
            l2: 1e-3,
        }
    }
}

impl DecoderSpec {
    pub fn nearest_centroid() -> Self {
        Self::default()
    }

    pub fn logistic(learning_rate: f64, epochs: usize, l2: f64) -> Self {
        DecoderSpec {
            kind: DecoderKind::Logistic,
            learning_rate,
            epochs,
            l2,
        }
    }

    /// Decoder named `name` with training parameters from the `[decoder]` section
    pub fn from_config(name: &str, config: &DecoderConfig) -> AlignBenchResult<Self> {
        Ok(DecoderSpec {
            kind: DecoderKind::from_name(name)?,
            learning_rate: config.learning_rate,
            epochs: config.epochs,
            l2: config.l2,
        })
    }

    /// A new untrained decoder
    pub fn build(&self) -> Box<dyn Decoder> {
        match self.kind {
            DecoderKind::NearestCentroid => Box::new(NearestCentroid::default()),
            DecoderKind::Logistic => Box::new(LogisticRegression::new(
                self.learning_rate,
                self.epochs,
                self.l2,
            )),
        }
    }
}

/// Sorted distinct labels and the class index of every row
fn encode_labels(y: &[Label]) -> (Vec<Label>, Vec<usize>) {
    let mut classes: Vec<Label> = y.to_vec();
    classes.sort();
    classes.dedup();
    let indices = y
        .iter()
        .map(|label| classes.binary_search(label).unwrap_or(0))
        .collect();
    (classes, indices)
}

fn check_training_input(x: &ArrayView2<'_, f64>, y: &[Label]) -> AlignBenchResult<()> {
    if x.nrows() != y.len() {
        return Err(AlignBenchError::shape_mismatch(
            "decoder fit",
            format!("{} rows", y.len()),
            format!("{} rows", x.nrows()),
        ));
    }
    if y.is_empty() {
        return Err(AlignBenchError::EmptyTable("decoder training rows".to_string()));
    }
    Ok(())
}

fn not_fitted() -> AlignBenchError {
    AlignBenchError::InvalidState {
        expected: "fitted decoder".to_string(),
        actual: "unfitted decoder".to_string(),
    }
}

fn check_width(expected: usize, x: &ArrayView2<'_, f64>) -> AlignBenchResult<()> {
    if x.ncols() != expected {
        return Err(AlignBenchError::shape_mismatch(
            "decoder predict",
            format!("{} features", expected),
            format!("{} features", x.ncols()),
        ));
    }
    Ok(())
}

/// Assigns each row to the class with the closest mean (squared Euclidean)
#[derive(Debug, Clone, Default)]
pub struct NearestCentroid {
    classes: Vec<Label>,
    centroids: Option<Array2<f64>>,
}

impl Decoder for NearestCentroid {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[Label]) -> AlignBenchResult<()> {
        check_training_input(&x, y)?;
        let (classes, indices) = encode_labels(y);

        let mut sums = Array2::<f64>::zeros((classes.len(), x.ncols()));
        let mut counts = vec![0usize; classes.len()];
        for (row, &class) in x.axis_iter(Axis(0)).zip(&indices) {
            let mut centroid = sums.row_mut(class);
            centroid += &row;
            counts[class] += 1;
        }
        for (mut centroid, &count) in sums.axis_iter_mut(Axis(0)).zip(&counts) {
            centroid /= count as f64;
        }

        self.classes = classes;
        self.centroids = Some(sums);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> AlignBenchResult<Vec<Label>> {
        let centroids = self.centroids.as_ref().ok_or_else(not_fitted)?;
        check_width(centroids.ncols(), &x)?;

        Ok(x.axis_iter(Axis(0))
            .map(|row| {
                let mut best = 0;
                let mut best_distance = f64::INFINITY;
                for (class, centroid) in centroids.axis_iter(Axis(0)).enumerate() {
                    let distance: f64 = row
                        .iter()
                        .zip(centroid.iter())
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum();
                    if distance < best_distance {
                        best = class;
                        best_distance = distance;
                    }
                }
                self.classes[best].clone()
            })
            .collect())
    }
}

/// Multinomial logistic regression trained by full-batch gradient descent.
///
/// Features are standardized with the training mean and standard deviation;
/// weights start at zero so training is deterministic.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    learning_rate: f64,
    epochs: usize,
    l2: f64,
    classes: Vec<Label>,
    mean: Array1<f64>,
    scale: Array1<f64>,
    weights: Option<Array2<f64>>,
    bias: Array1<f64>,
}

impl LogisticRegression {
    pub fn new(learning_rate: f64, epochs: usize, l2: f64) -> Self {
        LogisticRegression {
            learning_rate,
            epochs,
            l2,
            classes: Vec::new(),
            mean: Array1::zeros(0),
            scale: Array1::zeros(0),
            weights: None,
            bias: Array1::zeros(0),
        }
    }

    fn standardize(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        (&x - &self.mean) / &self.scale
    }

    fn probabilities(&self, z: &Array2<f64>, weights: &Array2<f64>) -> Array2<f64> {
        let mut logits = z.dot(weights) + &self.bias;
        for mut row in logits.axis_iter_mut(Axis(0)) {
            let max = row.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
            row.mapv_inplace(|v| (v - max).exp());
            let total = row.sum();
            row /= total;
        }
        logits
    }
}

impl Decoder for LogisticRegression {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[Label]) -> AlignBenchResult<()> {
        check_training_input(&x, y)?;
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(AlignBenchError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }

        let (classes, indices) = encode_labels(y);
        let (n, d) = x.dim();
        let c = classes.len();

        self.mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(d));
        self.scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 1e-12 { s } else { 1.0 });
        self.bias = Array1::zeros(c);
        self.classes = classes;

        let z = self.standardize(x);
        let mut one_hot = Array2::<f64>::zeros((n, c));
        for (row, &class) in indices.iter().enumerate() {
            one_hot[[row, class]] = 1.0;
        }

        let mut weights = Array2::<f64>::zeros((d, c));
        for _ in 0..self.epochs {
            let residual = self.probabilities(&z, &weights) - &one_hot;
            let grad_w = z.t().dot(&residual) / n as f64 + &weights * self.l2;
            let grad_b = residual.sum_axis(Axis(0)) / n as f64;
            weights.scaled_add(-self.learning_rate, &grad_w);
            self.bias.scaled_add(-self.learning_rate, &grad_b);
        }

        self.weights = Some(weights);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> AlignBenchResult<Vec<Label>> {
        let weights = self.weights.as_ref().ok_or_else(not_fitted)?;
        check_width(weights.nrows(), &x)?;

        let probabilities = self.probabilities(&self.standardize(x), weights);
        Ok(probabilities
            .axis_iter(Axis(0))
            .map(|row| {
                let mut best = 0;
                for (class, &p) in row.iter().enumerate() {
                    if p > row[best] {
                        best = class;
                    }
                }
                self.classes[best].clone()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn labels(values: &[&str]) -> Vec<Label> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn separable() -> (Array2<f64>, Vec<Label>) {
        (
            array![[0.0, 0.1], [0.2, -0.1], [5.0, 5.1], [4.8, 5.2]],
            labels(&["a", "a", "b", "b"]),
        )
    }

    #[test]
    fn test_nearest_centroid_separable() {
        let (x, y) = separable();
        let mut decoder = DecoderSpec::nearest_centroid().build();
        decoder.fit(x.view(), &y).unwrap();
        assert_eq!(decoder.score(x.view(), &y).unwrap(), 1.0);
        assert_eq!(
            decoder.predict(array![[4.0, 4.0], [1.0, 0.0]].view()).unwrap(),
            labels(&["b", "a"])
        );
    }

    #[test]
    fn test_nearest_centroid_tie_goes_to_first_label() {
        let x = array![[0.0], [2.0]];
        let y = labels(&["z", "y"]);
        let mut decoder = NearestCentroid::default();
        decoder.fit(x.view(), &y).unwrap();
        assert_eq!(decoder.predict(array![[1.0]].view()).unwrap(), labels(&["y"]));
    }

    #[test]
    fn test_logistic_separable() {
        let (x, y) = separable();
        let mut decoder = DecoderSpec::logistic(0.5, 300, 1e-4).build();
        decoder.fit(x.view(), &y).unwrap();
        assert_eq!(decoder.score(x.view(), &y).unwrap(), 1.0);
    }

    #[test]
    fn test_logistic_is_deterministic() {
        let (x, y) = separable();
        let spec = DecoderSpec::logistic(0.1, 50, 1e-3);
        let mut a = spec.build();
        let mut b = spec.build();
        a.fit(x.view(), &y).unwrap();
        b.fit(x.view(), &y).unwrap();
        let probe = array![[2.4, 2.6], [2.6, 2.4]];
        assert_eq!(a.predict(probe.view()).unwrap(), b.predict(probe.view()).unwrap());
    }

    #[test]
    fn test_predict_before_fit() {
        let decoder = NearestCentroid::default();
        assert!(matches!(
            decoder.predict(array![[1.0]].view()),
            Err(AlignBenchError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_fit_rejects_mismatched_labels() {
        let (x, _) = separable();
        let mut decoder = NearestCentroid::default();
        assert!(matches!(
            decoder.fit(x.view(), &labels(&["a"])),
            Err(AlignBenchError::DataShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_decoder_names() {
        assert_eq!(DecoderKind::from_name("logistic").unwrap(), DecoderKind::Logistic);
        assert!(DecoderKind::from_name("svm").is_err());
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&labels(&["a", "b"]), &labels(&["a", "a"])).unwrap(), 0.5);
        assert!(accuracy(&[], &[]).is_err());
    }
}

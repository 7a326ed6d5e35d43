use ndarray::Array2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    /// Paired with a softmax output layer.
    NegativeLogLikelihood,
}

impl Loss {
    /// Mean loss over the batch rows.
    pub fn calculate(&self, prediction: &Array2<f32>, target: &Array2<f32>) -> f32 {
        match self {
            Loss::NegativeLogLikelihood => {
                // Clamp to avoid log(0)
                let epsilon = 1e-7;
                let safe_pred = prediction.mapv(|x| x.clamp(epsilon, 1.0 - epsilon));
                let rows = prediction.nrows().max(1) as f32;
                -(target * &safe_pred.mapv(f32::ln)).sum() / rows
            }
        }
    }

    /// Gradient of the mean loss w.r.t. the output layer's pre-activation.
    pub fn output_delta(&self, prediction: &Array2<f32>, target: &Array2<f32>) -> Array2<f32> {
        match self {
            Loss::NegativeLogLikelihood => {
                let rows = prediction.nrows().max(1) as f32;
                (prediction - target) / rows
            }
        }
    }
}

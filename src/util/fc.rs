// External imports
use burn::tensor::{backend::Backend, Tensor};

/// Fully-connected projection `x · w + b`
///
/// # Arguments
///
/// * `x` - Input of shape [rows, in_features]
/// * `w` - Weights of shape [in_features, out_features]
/// * `b` - Bias of shape [1, out_features], broadcast over rows
///
/// # Returns
///
/// Projection of shape [rows, out_features]
pub fn fc<B: Backend>(x: Tensor<B, 2>, w: Tensor<B, 2>, b: Tensor<B, 2>) -> Tensor<B, 2> {
    x.matmul(w) + b
}

// External imports
use burn::tensor::{backend::Backend, Tensor, TensorData};
use ndarray::Array2;

// Internal imports
use crate::error::{FusionGruError, Result};

/// Move a host-side f32 matrix onto the backend device
pub fn array_to_tensor<B: Backend>(array: &Array2<f32>, device: &B::Device) -> Tensor<B, 2> {
    let (rows, cols) = array.dim();
    // Logical (row-major) order regardless of the array's memory layout
    let values: Vec<f32> = array.iter().copied().collect();
    Tensor::from_data(TensorData::new(values, [rows, cols]), device)
}

/// Read a backend tensor back into a host-side f32 matrix
pub fn tensor_to_array<B: Backend>(tensor: Tensor<B, 2>) -> Result<Array2<f32>> {
    let [rows, cols] = tensor.dims();
    let values = tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| FusionGruError::TensorData(format!("{:?}", e)))?;
    Ok(Array2::from_shape_vec((rows, cols), values)?)
}

// External imports
use burn::tensor::{backend::Backend, Tensor};
use log::debug;
use ndarray::Array2;

// Internal imports
use super::step_2_sequence_lod::SequenceLod;
use crate::constants::GRU_GATE_COUNT;
use crate::error::{FusionGruError, Result};
use crate::util::activation::Activation;
use crate::util::fc::fc;
use crate::util::tensor_utils::{array_to_tensor, tensor_to_array};

/// # Fusion GRU Reference
///
/// Float32 reference for the fused GRU operator. The input projection of every
/// row is computed up front (`XX = X · WeightX + Bias`), then each sequence of
/// the lod is walked row by row:
///
/// 1. `[u | r] = act_gate(h_(t-1) · Wh_ur + XX_t[0..2D])`
/// 2. `c = act_state((r ∘ h_(t-1)) · Wh_c + XX_t[2D..3D])`
/// 3. `h_t = u ∘ c + (1 - u) ∘ h_(t-1)`, or with `origin_mode`
///    `h_t = (1 - u) ∘ c + u ∘ h_(t-1)`
///
/// `WeightH` is stored as `[D, 3D]` but read as two flat blocks: the first
/// `2·D·D` elements are the `[D, 2D]` update/reset matrix `Wh_ur`, the
/// remaining `D·D` elements the `[D, D]` candidate matrix `Wh_c`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GruRecurrence {
    pub is_reverse: bool,
    pub origin_mode: bool,
    pub act_state: Activation,
    pub act_gate: Activation,
}

impl Default for GruRecurrence {
    fn default() -> Self {
        Self {
            is_reverse: false,
            origin_mode: false,
            act_state: Activation::Tanh,
            act_gate: Activation::Sigmoid,
        }
    }
}

impl GruRecurrence {
    /// Run the recurrence over every sequence of `lod`
    ///
    /// # Arguments
    ///
    /// * `xx` - Input projections of shape [T, 3D]
    /// * `lod` - Sequence layout of the T rows
    /// * `h0` - Initial hidden state of shape [N, D]
    /// * `weight_h` - Recurrent weights of shape [D, 3D]
    ///
    /// # Returns
    ///
    /// Hidden states of shape [T, D] in the original row order
    pub fn forward<B: Backend>(
        &self,
        xx: Tensor<B, 2>,
        lod: &SequenceLod,
        h0: Tensor<B, 2>,
        weight_h: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let device = xx.device();
        let [total_rows, gate_width] = xx.dims();
        let hidden_dim = gate_width / GRU_GATE_COUNT;

        let flat_weight_h = weight_h.reshape([hidden_dim * gate_width]);
        let w_update_reset = flat_weight_h
            .clone()
            .narrow(0, 0, 2 * hidden_dim * hidden_dim)
            .reshape([hidden_dim, 2 * hidden_dim]);
        let w_candidate = flat_weight_h
            .narrow(0, 2 * hidden_dim * hidden_dim, hidden_dim * hidden_dim)
            .reshape([hidden_dim, hidden_dim]);

        let mut hidden = Tensor::<B, 2>::zeros([total_rows, hidden_dim], &device);

        for (seq_idx, range) in lod.sequence_ranges().enumerate() {
            let mut rows: Vec<usize> = range.collect();
            if self.is_reverse {
                rows.reverse();
            }

            let mut h_prev = h0.clone().narrow(0, seq_idx, 1);
            for t in rows {
                let gates = xx.clone().narrow(0, t, 1);
                let h = self.step(
                    gates,
                    h_prev,
                    w_update_reset.clone(),
                    w_candidate.clone(),
                    hidden_dim,
                );
                hidden = hidden.slice_assign([t..t + 1, 0..hidden_dim], h.clone());
                h_prev = h;
            }
        }

        hidden
    }

    /// One GRU step for a single row
    fn step<B: Backend>(
        &self,
        gates: Tensor<B, 2>,
        h_prev: Tensor<B, 2>,
        w_update_reset: Tensor<B, 2>,
        w_candidate: Tensor<B, 2>,
        hidden_dim: usize,
    ) -> Tensor<B, 2> {
        let update_reset = self.act_gate.apply(
            h_prev.clone().matmul(w_update_reset) + gates.clone().narrow(1, 0, 2 * hidden_dim),
        );
        let u = update_reset.clone().narrow(1, 0, hidden_dim); // update gate
        let r = update_reset.narrow(1, hidden_dim, hidden_dim); // reset gate

        let reset_hidden = r * h_prev.clone();
        let c = self
            .act_state
            .apply(reset_hidden.matmul(w_candidate) + gates.narrow(1, 2 * hidden_dim, hidden_dim));

        let one_minus_u = u.clone().neg().add_scalar(1.0);
        if self.origin_mode {
            one_minus_u * c + u * h_prev
        } else {
            u * c + one_minus_u * h_prev
        }
    }
}

/// Borrowed f32 inputs of the fusion GRU
#[derive(Clone, Copy, Debug)]
pub struct FusionGruInputs<'a> {
    /// X of shape [T, M]
    pub x: &'a Array2<f32>,
    pub lod: &'a SequenceLod,
    /// H0 of shape [N, D], zeros when absent
    pub h0: Option<&'a Array2<f32>>,
    /// WeightX of shape [M, 3D]
    pub weight_x: &'a Array2<f32>,
    /// WeightH of shape [D, 3D]
    pub weight_h: &'a Array2<f32>,
    /// Bias of shape [1, 3D], zeros when absent
    pub bias: Option<&'a Array2<f32>>,
}

/// Dimensions implied by a validated set of inputs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FusionGruDims {
    pub total_rows: usize,
    pub batch_size: usize,
    pub input_dim: usize,
    pub hidden_dim: usize,
}

/// Check every input shape against the lod and the weight shapes
///
/// `x_dim`/`h0_dim` are passed as plain shapes so bf16 and f32 callers can
/// share the check.
pub fn validate_shapes(
    x_dim: (usize, usize),
    lod: &SequenceLod,
    h0_dim: Option<(usize, usize)>,
    weight_x_dim: (usize, usize),
    weight_h_dim: (usize, usize),
    bias_dim: Option<(usize, usize)>,
) -> Result<FusionGruDims> {
    let (total_rows, input_dim) = x_dim;
    lod.validate_rows("X", total_rows)?;

    let (hidden_dim, gate_width) = weight_h_dim;
    expect_shape("WeightH", [hidden_dim, GRU_GATE_COUNT * hidden_dim], weight_h_dim)?;
    if hidden_dim == 0 {
        return Err(FusionGruError::Unsupported("hidden size must be positive".into()));
    }
    expect_shape("WeightX", [input_dim, gate_width], weight_x_dim)?;
    if let Some(bias_dim) = bias_dim {
        expect_shape("Bias", [1, gate_width], bias_dim)?;
    }
    let batch_size = lod.num_sequences();
    if let Some(h0_dim) = h0_dim {
        expect_shape("H0", [batch_size, hidden_dim], h0_dim)?;
    }

    Ok(FusionGruDims {
        total_rows,
        batch_size,
        input_dim,
        hidden_dim,
    })
}

fn expect_shape(name: &str, expected: [usize; 2], actual: (usize, usize)) -> Result<()> {
    if expected != [actual.0, actual.1] {
        return Err(FusionGruError::ShapeMismatch {
            name: name.to_string(),
            expected: expected.to_vec(),
            actual: vec![actual.0, actual.1],
        });
    }
    Ok(())
}

/// Outputs of the reference computation
#[derive(Clone, Debug, PartialEq)]
pub struct FusionGruOutput {
    /// Input projections of shape [T, 3D]
    pub xx: Array2<f32>,
    /// Hidden states of shape [T, D]
    pub hidden: Array2<f32>,
}

/// Float32 reference fusion GRU
///
/// # Arguments
///
/// * `inputs` - X, lod, optional H0, WeightX, WeightH and optional Bias
/// * `recurrence` - Direction, origin mode and activations
/// * `device` - Device to run the computation on
///
/// # Returns
///
/// The input projection `XX` and the hidden states
pub fn fusion_gru<B: Backend>(
    inputs: &FusionGruInputs<'_>,
    recurrence: &GruRecurrence,
    device: &B::Device,
) -> Result<FusionGruOutput> {
    let dims = validate_shapes(
        inputs.x.dim(),
        inputs.lod,
        inputs.h0.map(|h0| h0.dim()),
        inputs.weight_x.dim(),
        inputs.weight_h.dim(),
        inputs.bias.map(|bias| bias.dim()),
    )?;
    debug!(
        "Reference fusion GRU: T={} N={} M={} D={}",
        dims.total_rows, dims.batch_size, dims.input_dim, dims.hidden_dim
    );

    let gate_width = GRU_GATE_COUNT * dims.hidden_dim;
    let x = array_to_tensor::<B>(inputs.x, device);
    let weight_x = array_to_tensor::<B>(inputs.weight_x, device);
    let weight_h = array_to_tensor::<B>(inputs.weight_h, device);
    let bias = match inputs.bias {
        Some(bias) => array_to_tensor::<B>(bias, device),
        None => Tensor::zeros([1, gate_width], device),
    };
    let h0 = match inputs.h0 {
        Some(h0) => array_to_tensor::<B>(h0, device),
        None => Tensor::zeros([dims.batch_size, dims.hidden_dim], device),
    };

    let xx = fc(x, weight_x, bias);
    let hidden = recurrence.forward(xx.clone(), inputs.lod, h0, weight_h);

    Ok(FusionGruOutput {
        xx: tensor_to_array(xx)?,
        hidden: tensor_to_array(hidden)?,
    })
}

// External imports
use burn::tensor::backend::Backend;
use log::debug;
use ndarray::Array2;
use std::marker::PhantomData;

// Internal imports
use super::step_1_bf16_conversion::{convert_float_to_uint16, convert_uint16_to_float_midpoint};
use super::step_2_sequence_lod::SequenceLod;
use super::step_3_reference_gru::{fusion_gru, FusionGruInputs, GruRecurrence};
use super::step_4_op_test::{
    required, KernelRegistry, OpAttrs, OpKernel, TensorValue, Variable, VariableMap,
};
use crate::constants::FUSION_GRU_OP_TYPE;
use crate::error::{FusionGruError, Result};
use crate::util::activation::Activation;

/// # Fusion GRU Kernel
///
/// Runs the fused GRU operator in one of two precisions, picked by the
/// encoding of input `X`:
///
/// - **bfloat16** (requires `use_mkldnn`): X and H0 arrive as truncated bf16
///   and are widened to the centre of their truncation interval. WeightX,
///   WeightH and Bias stay f32, products accumulate in f32 and the recurrent
///   state is carried in f32. Only the emitted `Hidden` is truncated back to
///   bf16, unless `force_fp32_output` is set.
/// - **float32**: the plain computation, identical to the reference.
///
/// ## Inputs
///
/// `X` (with lod), `WeightX`, `WeightH`, optional `Bias`, optional `H0`
///
/// ## Attributes
///
/// `activation`, `gate_activation`, `is_reverse`, `origin_mode`,
/// `force_fp32_output`, `use_mkldnn`
///
/// ## Outputs
///
/// `Hidden` (with the lod of X) and `XX`, the f32 input projection
#[derive(Debug, Clone)]
pub struct FusionGruKernel<B: Backend> {
    device: B::Device,
    _backend: PhantomData<B>,
}

impl<B: Backend> FusionGruKernel<B> {
    pub fn new(device: &B::Device) -> Self {
        Self {
            device: device.clone(),
            _backend: PhantomData,
        }
    }

    fn recurrence(attrs: &OpAttrs) -> Result<GruRecurrence> {
        Ok(GruRecurrence {
            is_reverse: attrs.get_bool_or("is_reverse", false)?,
            origin_mode: attrs.get_bool_or("origin_mode", false)?,
            act_state: Activation::from_name(attrs.get_str_or("activation", "tanh")?)?,
            act_gate: Activation::from_name(attrs.get_str_or("gate_activation", "sigmoid")?)?,
        })
    }

    fn compute_bf16(
        &self,
        inputs: &VariableMap,
        attrs: &OpAttrs,
        lod: &SequenceLod,
    ) -> Result<VariableMap> {
        if !attrs.get_bool_or("use_mkldnn", false)? {
            return Err(FusionGruError::Unsupported(
                "bfloat16 fusion_gru is only available with use_mkldnn".into(),
            ));
        }
        let force_fp32_output = attrs.get_bool_or("force_fp32_output", false)?;
        let recurrence = Self::recurrence(attrs)?;

        let x = convert_uint16_to_float_midpoint(required(inputs, "X")?.as_bf16("X")?);
        // H0 may arrive in either encoding
        let h0 = inputs.get("H0").map(|h0| match &h0.value {
            TensorValue::Bf16(bits) => convert_uint16_to_float_midpoint(bits),
            TensorValue::Fp32(values) => values.clone(),
        });
        debug!(
            "bf16 fusion GRU: X={:?} reverse={} origin_mode={} fp32_out={}",
            x.dim(),
            recurrence.is_reverse,
            recurrence.origin_mode,
            force_fp32_output
        );

        let (xx, hidden) = self.run(inputs, &x, h0.as_ref(), lod, &recurrence)?;
        let hidden = if force_fp32_output {
            TensorValue::Fp32(hidden)
        } else {
            TensorValue::Bf16(convert_float_to_uint16(&hidden))
        };
        Ok(outputs(hidden, xx, lod))
    }

    fn compute_fp32(
        &self,
        inputs: &VariableMap,
        attrs: &OpAttrs,
        lod: &SequenceLod,
    ) -> Result<VariableMap> {
        let recurrence = Self::recurrence(attrs)?;
        let x = required(inputs, "X")?.as_fp32("X")?;
        let h0 = optional_fp32(inputs, "H0")?;

        let (xx, hidden) = self.run(inputs, x, h0, lod, &recurrence)?;
        Ok(outputs(TensorValue::Fp32(hidden), xx, lod))
    }

    /// Shared f32 computation once X and H0 are in f32
    fn run(
        &self,
        inputs: &VariableMap,
        x: &Array2<f32>,
        h0: Option<&Array2<f32>>,
        lod: &SequenceLod,
        recurrence: &GruRecurrence,
    ) -> Result<(Array2<f32>, Array2<f32>)> {
        let output = fusion_gru::<B>(
            &FusionGruInputs {
                x,
                lod,
                h0,
                weight_x: required(inputs, "WeightX")?.as_fp32("WeightX")?,
                weight_h: required(inputs, "WeightH")?.as_fp32("WeightH")?,
                bias: optional_fp32(inputs, "Bias")?,
            },
            recurrence,
            &self.device,
        )?;
        Ok((output.xx, output.hidden))
    }
}

fn optional_fp32<'a>(inputs: &'a VariableMap, name: &str) -> Result<Option<&'a Array2<f32>>> {
    inputs.get(name).map(|var| var.as_fp32(name)).transpose()
}

fn outputs(hidden: TensorValue, xx: Array2<f32>, lod: &SequenceLod) -> VariableMap {
    let mut outputs = VariableMap::new();
    outputs.insert("Hidden".to_string(), Variable::with_lod(hidden, lod.clone()));
    outputs.insert("XX".to_string(), Variable::from(xx));
    outputs
}

impl<B: Backend> OpKernel for FusionGruKernel<B> {
    fn op_type(&self) -> &'static str {
        FUSION_GRU_OP_TYPE
    }

    fn compute(&self, inputs: &VariableMap, attrs: &OpAttrs) -> Result<VariableMap> {
        let x = required(inputs, "X")?;
        let lod = x
            .lod
            .as_ref()
            .ok_or_else(|| FusionGruError::InvalidLod("input 'X' carries no lod".into()))?;

        match &x.value {
            TensorValue::Bf16(_) => self.compute_bf16(inputs, attrs, lod),
            TensorValue::Fp32(_) => self.compute_fp32(inputs, attrs, lod),
        }
    }
}

/// Registry holding every kernel this crate provides
pub fn default_registry<B: Backend>(device: &B::Device) -> KernelRegistry {
    let mut registry = KernelRegistry::new();
    registry.register(FusionGruKernel::<B>::new(device));
    registry
}

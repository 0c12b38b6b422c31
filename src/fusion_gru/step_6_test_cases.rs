// External imports
use anyhow::Context;
use burn::tensor::backend::Backend;
use log::info;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// Internal imports
use super::step_1_bf16_conversion::convert_float_to_uint16;
use super::step_2_sequence_lod::SequenceLod;
use super::step_3_reference_gru::{fusion_gru, FusionGruInputs, GruRecurrence};
use super::step_4_op_test::{CheckReport, KernelRegistry, OpTest, TensorValue, Variable};
use crate::constants::{
    BF16_ERROR_MARGIN, DEFAULT_HIDDEN_DIM, DEFAULT_INPUT_DIM, DEFAULT_LOD_LENGTHS, DEFAULT_SEED,
    FP32_OUTPUT_ERROR_MARGIN, FUSION_GRU_OP_TYPE, GRU_GATE_COUNT,
};
use crate::error::Result;
use crate::util::activation::Activation;

/// Configuration of one bf16 fusion GRU check
///
/// `Default` is the base case; derived cases override single fields through
/// their `set_confs` hook.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionGruTestConfig {
    pub lod: Vec<Vec<usize>>,
    /// Input dimension M
    pub input_dim: usize,
    /// Hidden dimension D
    pub hidden_dim: usize,
    pub is_reverse: bool,
    pub with_h0: bool,
    pub with_bias: bool,
    pub act_state: Activation,
    pub act_gate: Activation,
    pub origin_mode: bool,
    pub use_mkldnn: bool,
    pub force_fp32_output: bool,
    pub error_margin: f64,
    pub seed: u64,
}

impl Default for FusionGruTestConfig {
    fn default() -> Self {
        Self {
            lod: vec![DEFAULT_LOD_LENGTHS.to_vec()],
            input_dim: DEFAULT_INPUT_DIM,
            hidden_dim: DEFAULT_HIDDEN_DIM,
            is_reverse: false,
            with_h0: false,
            with_bias: true,
            act_state: Activation::Tanh,
            act_gate: Activation::Sigmoid,
            origin_mode: false,
            use_mkldnn: true,
            force_fp32_output: false,
            error_margin: BF16_ERROR_MARGIN,
            seed: DEFAULT_SEED,
        }
    }
}

impl FusionGruTestConfig {
    /// Load a configuration from a JSON file; missing fields take base values
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }

    fn recurrence(&self) -> GruRecurrence {
        GruRecurrence {
            is_reverse: self.is_reverse,
            origin_mode: self.origin_mode,
            act_state: self.act_state,
            act_gate: self.act_gate,
        }
    }
}

/// A named check: the base configuration plus its overrides
#[derive(Clone, Copy, Debug)]
pub struct FusionGruTestCase {
    pub name: &'static str,
    pub set_confs: fn(&mut FusionGruTestConfig),
}

impl FusionGruTestCase {
    /// Base configuration with this case's overrides applied
    pub fn config(&self) -> FusionGruTestConfig {
        let mut config = FusionGruTestConfig::default();
        (self.set_confs)(&mut config);
        config
    }
}

fn base_confs(_config: &mut FusionGruTestConfig) {}

fn origin_mode_confs(config: &mut FusionGruTestConfig) {
    config.origin_mode = true;
}

fn without_bias_confs(config: &mut FusionGruTestConfig) {
    config.with_bias = false;
}

fn reverse_confs(config: &mut FusionGruTestConfig) {
    config.is_reverse = true;
}

fn with_h0_confs(config: &mut FusionGruTestConfig) {
    config.with_h0 = true;
}

fn force_fp32_output_confs(config: &mut FusionGruTestConfig) {
    config.force_fp32_output = true;
    // f32 outputs compare as values, not encoding units
    config.error_margin = FP32_OUTPUT_ERROR_MARGIN;
}

pub const FUSION_GRU_BF16: FusionGruTestCase = FusionGruTestCase {
    name: "fusion_gru_bf16",
    set_confs: base_confs,
};

pub const FUSION_GRU_BF16_ORIGIN_MODE: FusionGruTestCase = FusionGruTestCase {
    name: "fusion_gru_bf16_origin_mode",
    set_confs: origin_mode_confs,
};

pub const FUSION_GRU_BF16_WITHOUT_BIAS: FusionGruTestCase = FusionGruTestCase {
    name: "fusion_gru_bf16_without_bias",
    set_confs: without_bias_confs,
};

pub const FUSION_GRU_BF16_REVERSE: FusionGruTestCase = FusionGruTestCase {
    name: "fusion_gru_bf16_reverse",
    set_confs: reverse_confs,
};

pub const FUSION_GRU_BF16_WITH_H0: FusionGruTestCase = FusionGruTestCase {
    name: "fusion_gru_bf16_with_h0",
    set_confs: with_h0_confs,
};

pub const FUSION_GRU_BF16_FORCE_FP32_OUTPUT: FusionGruTestCase = FusionGruTestCase {
    name: "fusion_gru_bf16_force_fp32_output",
    set_confs: force_fp32_output_confs,
};

/// Every registered case, base case first
pub fn registered_cases() -> Vec<FusionGruTestCase> {
    vec![
        FUSION_GRU_BF16,
        FUSION_GRU_BF16_ORIGIN_MODE,
        FUSION_GRU_BF16_WITHOUT_BIAS,
        FUSION_GRU_BF16_REVERSE,
        FUSION_GRU_BF16_WITH_H0,
        FUSION_GRU_BF16_FORCE_FP32_OUTPUT,
    ]
}

fn random_array(rng: &mut StdRng, rows: usize, cols: usize) -> Array2<f32> {
    Array2::from_shape_fn((rows, cols), |_| rng.random::<f32>())
}

/// Build the operator check for `config`
///
/// Random f32 inputs feed the reference; the kernel gets X (and H0) as bf16,
/// the weights and bias as f32. The expected `Hidden` is the reference output
/// truncated to bf16, unless the case forces f32 output.
pub fn set_up<B: Backend>(config: &FusionGruTestConfig, device: &B::Device) -> Result<OpTest> {
    let lod = SequenceLod::new(&config.lod)?;
    let total_rows = lod.total_len();
    let batch_size = lod.num_sequences();
    let m = config.input_dim;
    let d = config.hidden_dim;
    let gate_width = GRU_GATE_COUNT * d;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let x_fp32 = random_array(&mut rng, total_rows, m);
    let weight_x = random_array(&mut rng, m, gate_width);
    let weight_h = random_array(&mut rng, d, gate_width);
    // Bias stays f32 even on the bf16 path
    let bias = if config.with_bias {
        random_array(&mut rng, 1, gate_width)
    } else {
        Array2::zeros((1, gate_width))
    };
    let h0_fp32 = if config.with_h0 {
        random_array(&mut rng, batch_size, d)
    } else {
        Array2::zeros((batch_size, d))
    };

    let reference = fusion_gru::<B>(
        &FusionGruInputs {
            x: &x_fp32,
            lod: &lod,
            h0: Some(&h0_fp32),
            weight_x: &weight_x,
            weight_h: &weight_h,
            bias: Some(&bias),
        },
        &config.recurrence(),
        device,
    )?;

    let mut test = OpTest::new(FUSION_GRU_OP_TYPE);
    test.inputs.insert(
        "X".into(),
        Variable::with_lod(TensorValue::Bf16(convert_float_to_uint16(&x_fp32)), lod.clone()),
    );
    test.inputs.insert("WeightX".into(), Variable::from(weight_x));
    test.inputs.insert("WeightH".into(), Variable::from(weight_h));
    if config.with_bias {
        test.inputs.insert("Bias".into(), Variable::from(bias));
    }
    if config.with_h0 {
        test.inputs
            .insert("H0".into(), Variable::from(convert_float_to_uint16(&h0_fp32)));
    }

    let expected_hidden = if config.force_fp32_output {
        TensorValue::Fp32(reference.hidden)
    } else {
        TensorValue::Bf16(convert_float_to_uint16(&reference.hidden))
    };
    test.outputs
        .insert("Hidden".into(), Variable::with_lod(expected_hidden, lod));

    test.attrs
        .set("activation", config.act_state.name())
        .set("gate_activation", config.act_gate.name())
        .set("is_reverse", config.is_reverse)
        .set("origin_mode", config.origin_mode)
        .set("force_fp32_output", config.force_fp32_output)
        .set("use_mkldnn", config.use_mkldnn);

    Ok(test)
}

/// Set the check up and run it through `registry`
pub fn test_check_output<B: Backend>(
    config: &FusionGruTestConfig,
    registry: &KernelRegistry,
    device: &B::Device,
) -> Result<CheckReport> {
    info!(
        "Checking fusion GRU: lod={:?} M={} D={} reverse={} bias={} h0={} origin_mode={}",
        config.lod,
        config.input_dim,
        config.hidden_dim,
        config.is_reverse,
        config.with_bias,
        config.with_h0,
        config.origin_mode
    );
    let test = set_up::<B>(config, device)?;
    let report = test.check_output(registry, config.error_margin)?;
    Ok(report)
}

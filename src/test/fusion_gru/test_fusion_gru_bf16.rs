// External imports
use anyhow::Result;
use burn_ndarray::{NdArray, NdArrayDevice};
use ndarray::Array2;

// Internal imports
use crate::constants::FUSION_GRU_OP_TYPE;
use crate::error::FusionGruError;
use crate::fusion_gru::step_1_bf16_conversion::convert_uint16_to_float;
use crate::fusion_gru::step_4_op_test::{
    KernelRegistry, OpAttrs, OpKernel, OpTest, TensorValue, Variable, VariableMap,
};
use crate::fusion_gru::step_5_bf16_kernel::default_registry;
use crate::fusion_gru::step_6_test_cases::{
    registered_cases, set_up, test_check_output, FusionGruTestCase, FusionGruTestConfig,
    FUSION_GRU_BF16, FUSION_GRU_BF16_FORCE_FP32_OUTPUT, FUSION_GRU_BF16_ORIGIN_MODE,
    FUSION_GRU_BF16_REVERSE, FUSION_GRU_BF16_WITHOUT_BIAS, FUSION_GRU_BF16_WITH_H0,
};

type TestBackend = NdArray<f32>;

fn registry() -> KernelRegistry {
    default_registry::<TestBackend>(&NdArrayDevice::Cpu)
}

/// Emits a fixed `Hidden`, ignoring its inputs
struct FixedHiddenKernel {
    hidden: Variable,
}

impl OpKernel for FixedHiddenKernel {
    fn op_type(&self) -> &'static str {
        FUSION_GRU_OP_TYPE
    }

    fn compute(
        &self,
        _inputs: &VariableMap,
        _attrs: &OpAttrs,
    ) -> crate::error::Result<VariableMap> {
        let mut outputs = VariableMap::new();
        outputs.insert("Hidden".to_string(), self.hidden.clone());
        Ok(outputs)
    }
}

fn fixed_registry(hidden: Variable) -> KernelRegistry {
    let mut registry = KernelRegistry::new();
    registry.register(FixedHiddenKernel { hidden });
    registry
}

/// Expected `Hidden` of `test` with `shift` added to every bf16 code
fn shifted_expectation(test: &OpTest, shift: u16) -> Result<Variable> {
    let expected = &test.outputs["Hidden"];
    let bits = expected.as_bf16("Hidden")?.mapv(|b| b + shift);
    Ok(Variable {
        value: TensorValue::Bf16(bits),
        lod: expected.lod.clone(),
    })
}

/// Largest distance in bf16 codes between the kernel's and the expected `Hidden`
fn max_code_distance(test: &OpTest) -> Result<u16> {
    let outputs = registry()
        .get(FUSION_GRU_OP_TYPE)?
        .compute(&test.inputs, &test.attrs)?;
    let actual = outputs["Hidden"].as_bf16("Hidden")?;
    let expected = test.outputs["Hidden"].as_bf16("Hidden")?;
    Ok(actual
        .iter()
        .zip(expected.iter())
        .map(|(a, e)| a.abs_diff(*e))
        .max()
        .unwrap_or(0))
}

fn run_case(case: FusionGruTestCase) -> Result<()> {
    let device = NdArrayDevice::Cpu;
    let config = case.config();
    let report = test_check_output::<TestBackend>(&config, &registry(), &device)?;
    assert_eq!(report.outputs.len(), 1);
    assert_eq!(report.outputs[0].name, "Hidden");
    assert!(report.max_abs_diff() <= config.error_margin);
    Ok(())
}

#[test]
fn test_fusion_gru_bf16_check_output() -> Result<()> {
    run_case(FUSION_GRU_BF16)
}

#[test]
fn test_fusion_gru_bf16_origin_mode_check_output() -> Result<()> {
    run_case(FUSION_GRU_BF16_ORIGIN_MODE)
}

#[test]
fn test_fusion_gru_bf16_without_bias_check_output() -> Result<()> {
    run_case(FUSION_GRU_BF16_WITHOUT_BIAS)
}

#[test]
fn test_fusion_gru_bf16_reverse_check_output() -> Result<()> {
    run_case(FUSION_GRU_BF16_REVERSE)
}

#[test]
fn test_fusion_gru_bf16_with_h0_check_output() -> Result<()> {
    run_case(FUSION_GRU_BF16_WITH_H0)
}

#[test]
fn test_fusion_gru_bf16_force_fp32_output_check_output() -> Result<()> {
    run_case(FUSION_GRU_BF16_FORCE_FP32_OUTPUT)
}

#[test]
fn test_every_registered_case_passes_across_seeds() -> Result<()> {
    let device = NdArrayDevice::Cpu;
    let registry = registry();
    for case in registered_cases() {
        for seed in [1u64, 2, 3] {
            let config = FusionGruTestConfig {
                seed,
                ..case.config()
            };
            test_check_output::<TestBackend>(&config, &registry, &device)?;
        }
    }
    Ok(())
}

#[test]
fn test_bf16_hidden_within_one_code_of_truncated_reference() -> Result<()> {
    let device = NdArrayDevice::Cpu;
    let cases = [
        FUSION_GRU_BF16,
        FUSION_GRU_BF16_WITHOUT_BIAS,
        FUSION_GRU_BF16_ORIGIN_MODE,
        FUSION_GRU_BF16_REVERSE,
        FUSION_GRU_BF16_WITH_H0,
    ];
    for case in cases {
        for seed in 0u64..16 {
            let config = FusionGruTestConfig {
                seed,
                ..case.config()
            };
            let test = set_up::<TestBackend>(&config, &device)?;
            let distance = max_code_distance(&test)?;
            assert!(distance <= 1, "{} seed {}: {} codes apart", case.name, seed, distance);
        }
    }
    Ok(())
}

#[test]
fn test_kernel_two_codes_off_fails_check() -> Result<()> {
    let device = NdArrayDevice::Cpu;
    let test = set_up::<TestBackend>(&FUSION_GRU_BF16.config(), &device)?;

    let one_off = fixed_registry(shifted_expectation(&test, 1)?);
    assert_eq!(test.check_output(&one_off, 1.0)?.max_abs_diff(), 1.0);

    let two_off = fixed_registry(shifted_expectation(&test, 2)?);
    match test.check_output(&two_off, 1.0) {
        Err(FusionGruError::OutputMismatch { name, abs_diff, .. }) => {
            assert_eq!(name, "Hidden");
            assert_eq!(abs_diff, 2.0);
        }
        other => panic!("expected an output mismatch, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_constant_zero_kernel_fails_every_case() -> Result<()> {
    let device = NdArrayDevice::Cpu;
    for case in registered_cases() {
        let config = case.config();
        let test = set_up::<TestBackend>(&config, &device)?;
        let expected = &test.outputs["Hidden"];
        let zeros = match &expected.value {
            TensorValue::Bf16(bits) => TensorValue::Bf16(Array2::zeros(bits.dim())),
            TensorValue::Fp32(values) => TensorValue::Fp32(Array2::zeros(values.dim())),
        };
        let registry = fixed_registry(Variable {
            value: zeros,
            lod: expected.lod.clone(),
        });
        assert!(
            matches!(
                test.check_output(&registry, config.error_margin),
                Err(FusionGruError::OutputMismatch { .. })
            ),
            "{} accepted an all-zero Hidden",
            case.name
        );
    }
    Ok(())
}

#[test]
fn test_expected_hidden_is_truncated_reference() -> Result<()> {
    let device = NdArrayDevice::Cpu;
    let test = set_up::<TestBackend>(&FUSION_GRU_BF16.config(), &device)?;
    let expected = test.outputs["Hidden"].as_bf16("Hidden")?;
    let widened = convert_uint16_to_float(expected);
    // Convex mix of tanh outputs and a zero initial state
    assert!(widened.iter().all(|v| v.abs() <= 1.0));
    let lod = test.outputs["Hidden"].lod.as_ref().map(|lod| lod.lengths().to_vec());
    assert_eq!(lod, Some(vec![2, 4, 3]));
    Ok(())
}

#[test]
fn test_mismatched_expectation_fails_check() -> Result<()> {
    let device = NdArrayDevice::Cpu;
    let mut test = set_up::<TestBackend>(&FUSION_GRU_BF16.config(), &device)?;

    // 3.0 (0x4040) is out of reach of any GRU state
    let lod = test.outputs["Hidden"].lod.clone();
    let shifted = Array2::from_elem((9, 5), 0x4040u16);
    test.outputs.insert(
        "Hidden".into(),
        Variable {
            value: TensorValue::Bf16(shifted),
            lod,
        },
    );

    match test.check_output(&registry(), 1.0) {
        Err(FusionGruError::OutputMismatch { name, .. }) => assert_eq!(name, "Hidden"),
        other => panic!("expected an output mismatch, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_missing_kernel_fails_check() -> Result<()> {
    let device = NdArrayDevice::Cpu;
    let test = set_up::<TestBackend>(&FUSION_GRU_BF16.config(), &device)?;
    assert!(matches!(
        test.check_output(&KernelRegistry::new(), 1.0),
        Err(FusionGruError::UnknownOpType(_))
    ));
    Ok(())
}

#[test]
fn test_disabled_accelerated_path_fails_check() {
    let device = NdArrayDevice::Cpu;
    let config = FusionGruTestConfig {
        use_mkldnn: false,
        ..FusionGruTestConfig::default()
    };
    assert!(test_check_output::<TestBackend>(&config, &registry(), &device).is_err());
}

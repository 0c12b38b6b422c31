/// # Fusion GRU bfloat16 Check
///
/// This module checks a fused GRU operator running in bfloat16 against a
/// float32 reference of the same computation.
///
/// ## Module Structure:
///
/// 1. **step_1_bf16_conversion**: f32 to bf16 bit truncation and widening
/// 2. **step_2_sequence_lod**: Sequence-length descriptor of a flattened batch
/// 3. **step_3_reference_gru**: Float32 reference fusion GRU
/// 4. **step_4_op_test**: Operator test harness with `check_output`
/// 5. **step_5_bf16_kernel**: bf16 (and f32) fusion GRU kernel
/// 6. **step_6_test_cases**: Base configuration, `set_confs` overrides and setup
///
/// The kernel computes the same recurrence as the reference but only sees the
/// bf16 codes of its inputs, widened to the middle of their truncation interval.
/// Its bf16 `Hidden` stays within one code of the truncated reference.
///
pub mod step_1_bf16_conversion;
pub mod step_2_sequence_lod;
pub mod step_3_reference_gru;
pub mod step_5_bf16_kernel;
pub mod step_6_test_cases;

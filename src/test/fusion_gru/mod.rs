/// Tests for the bf16 fusion GRU operator check
///
/// This module contains tests for:
///
/// * The base case (forward, bias, no initial state)
/// * The origin-mode and bias-disabled overrides
/// * Reverse direction, bf16 initial state and forced f32 output
/// * Failure reporting when the kernel and the expectation disagree
pub mod test_fusion_gru_bf16;

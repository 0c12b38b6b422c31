// Operator identity
pub const FUSION_GRU_OP_TYPE: &str = "fusion_gru";

// Default sequence layout: three sequences covering 9 rows
pub const DEFAULT_LOD_LENGTHS: [usize; 3] = [2, 4, 3];

// Default dimensions
pub const DEFAULT_INPUT_DIM: usize = 3; // M
pub const DEFAULT_HIDDEN_DIM: usize = 5; // D

// Number of gate blocks (update, reset, candidate)
pub const GRU_GATE_COUNT: usize = 3;

// Comparison tolerances
pub const BF16_ERROR_MARGIN: f64 = 1.0; // one unit of the 16-bit encoding
pub const FP32_OUTPUT_ERROR_MARGIN: f64 = 0.0078125; // one bf16 step at [1, 2)
pub const DEFAULT_RTOL: f64 = 1e-5;

// Random input generation
pub const DEFAULT_SEED: u64 = 123;

// Activation clipping thresholds
pub const SIGMOID_THRESHOLD_MIN: f32 = -40.0;
pub const SIGMOID_THRESHOLD_MAX: f32 = 13.0;
pub const EXP_MAX_INPUT: f32 = 40.0;

/// Test modules for the fusion GRU bf16 check
///
/// * `fusion_gru` - One test per registered case, running the bf16 kernel
///   through `check_output` against the truncated f32 reference, plus tests of
///   the setup flow around it
pub mod fusion_gru;

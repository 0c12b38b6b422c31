pub mod constants;
pub mod error;
pub mod fusion_gru;
#[cfg(test)]
pub mod test;
pub mod util {
    pub mod activation;
    pub mod fc;
    pub mod run_report;
    pub mod tensor_utils;
}

/// Compile-time build information
pub mod build_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// CPU backend used by the binary and the tests
pub type CpuBackend = burn_ndarray::NdArray<f32>;

use thiserror::Error;

/// Errors raised while preparing, running or checking the fusion GRU operator
#[derive(Debug, Error)]
pub enum FusionGruError {
    #[error("invalid lod: {0}")]
    InvalidLod(String),

    #[error("shape mismatch for '{name}': expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("missing input '{0}'")]
    MissingInput(String),

    #[error("missing output '{0}'")]
    MissingOutput(String),

    #[error("dtype mismatch for '{name}': expected {expected}, got {actual}")]
    DtypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("unknown activation '{0}'")]
    UnknownActivation(String),

    #[error("missing or mistyped attribute '{0}'")]
    InvalidAttribute(String),

    #[error("unsupported configuration: {0}")]
    Unsupported(String),

    #[error("no kernel registered for op type '{0}'")]
    UnknownOpType(String),

    #[error("tensor data conversion failed: {0}")]
    TensorData(String),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error(
        "output '{name}' mismatch at {index:?}: actual {actual}, expected {expected}, \
         abs diff {abs_diff} exceeds atol {atol} + rtol {rtol}"
    )]
    OutputMismatch {
        name: String,
        index: (usize, usize),
        actual: f64,
        expected: f64,
        abs_diff: f64,
        atol: f64,
        rtol: f64,
    },

    #[error("lod mismatch for output '{name}': expected {expected:?}, got {actual:?}")]
    LodMismatch {
        name: String,
        expected: Option<Vec<usize>>,
        actual: Option<Vec<usize>>,
    },
}

pub type Result<T> = std::result::Result<T, FusionGruError>;

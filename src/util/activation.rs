// External imports
use burn::tensor::{activation, backend::Backend, Tensor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Internal imports
use crate::constants::{EXP_MAX_INPUT, SIGMOID_THRESHOLD_MAX, SIGMOID_THRESHOLD_MIN};
use crate::error::FusionGruError;

/// Activation functions selectable by name for the GRU state and gates
///
/// `sigmoid` and `tanh` clip their exponent inputs so large pre-activations
/// never overflow `exp`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Identity,
    Sigmoid,
    Tanh,
    Relu,
}

impl Activation {
    /// Look an activation up by name (`identity`, `sigmoid`, `tanh`, `relu`)
    pub fn from_name(name: &str) -> Result<Self, FusionGruError> {
        match name {
            "identity" => Ok(Self::Identity),
            "sigmoid" => Ok(Self::Sigmoid),
            "tanh" => Ok(Self::Tanh),
            "relu" => Ok(Self::Relu),
            other => Err(FusionGruError::UnknownActivation(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Sigmoid => "sigmoid",
            Self::Tanh => "tanh",
            Self::Relu => "relu",
        }
    }

    /// Apply element-wise
    pub fn apply<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Self::Identity => x,
            // 1 / (1 + e^-x), x clipped to [-40, 13]
            Self::Sigmoid => x
                .clamp(SIGMOID_THRESHOLD_MIN, SIGMOID_THRESHOLD_MAX)
                .neg()
                .exp()
                .add_scalar(1.0)
                .recip(),
            // 2 / (1 + e^min(-2x, 40)) - 1
            Self::Tanh => x
                .mul_scalar(-2.0)
                .clamp_max(EXP_MAX_INPUT)
                .exp()
                .add_scalar(1.0)
                .recip()
                .mul_scalar(2.0)
                .sub_scalar(1.0),
            Self::Relu => activation::relu(x),
        }
    }
}

impl FromStr for Activation {
    type Err = FusionGruError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

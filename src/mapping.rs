//! In-place element-wise mapping.
//!
//! Mapping rewrites a matrix's own elements. A matrix bound to a transpose
//! partner is first detached onto a private copy, so the partner keeps
//! reading the values it had. All mapped values are computed before anything
//! is written: a failing callback leaves the matrix, and its partnership,
//! exactly as they were.

use serde::{Deserialize, Serialize};

use crate::construct::HostObject;
use crate::error::{Error, Result};
use crate::matrix::Matrix;

impl Matrix {
    /// Replaces every element `x` with `f(x)`, in logical order.
    pub fn map(&self, mut f: impl FnMut(f64) -> f64) -> Result<&Self> {
        let values: Vec<f64> = self.data().iter().map(|&x| f(x)).collect();
        self.commit(values)?;
        Ok(self)
    }

    /// Replaces every element with the result of a fallible host callback.
    ///
    /// The callback must return a host number; any float, infinite or NaN
    /// included, is accepted. `label` names the callback in the error raised
    /// when it fails.
    pub fn try_map<F, R, E>(&self, label: &str, mut f: F) -> Result<&Self>
    where
        F: FnMut(f64) -> core::result::Result<R, E>,
        R: Into<HostObject>,
        E: core::fmt::Display,
    {
        let snapshot = self.data();
        let mut values = Vec::with_capacity(snapshot.len());
        for (i, &x) in snapshot.iter().enumerate() {
            let mapped: HostObject = f(x)
                .map_err(|e| Error::Callback {
                    label: label.to_owned(),
                    element: format!("{x:.4}"),
                    reason: e.to_string(),
                })?
                .into();
            let HostObject::Scalar(mapped) = mapped else {
                return Err(Error::type_mismatch(
                    format!("mapped element {i}"),
                    "float",
                    mapped.kind(),
                ));
            };
            values.push(mapped);
        }
        self.commit(values)?;
        Ok(self)
    }

    /// Applies an activation function element-wise.
    pub fn activate(&self, activation: Activation) -> Result<&Self> {
        self.map(|x| activation.forward(x))
    }

    /// Replaces every element with the activation's derivative at that element.
    pub fn activate_backward(&self, activation: Activation) -> Result<&Self> {
        self.map(|x| activation.backward(x))
    }

    /// Writes logical-order `values` into this matrix's own buffer.
    fn commit(&self, values: Vec<f64>) -> Result<()> {
        self.detach_with_copy()?;
        let mut guard = self.header_mut();
        let header = &mut *guard;
        let (rows, cols, order) = (header.rows, header.cols, header.order);
        let buffer = header.storage.make_mut();
        for (i, value) in values.into_iter().enumerate() {
            buffer[order.offset(rows, cols, i)] = value;
        }
        header.cache.clear();
        Ok(())
    }
}

/// Pointwise activation functions and their derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Sigmoid,
    Relu,
    LeakyRelu,
    Tanh,
}

const LEAKY_SLOPE: f64 = 0.01;

impl Activation {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sigmoid => "sigmoid",
            Self::Relu => "relu",
            Self::LeakyRelu => "leaky_relu",
            Self::Tanh => "tanh",
        }
    }

    #[must_use]
    pub fn forward(self, x: f64) -> f64 {
        match self {
            Self::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Self::Relu => {
                if x <= 0.0 {
                    0.0
                } else {
                    x
                }
            }
            Self::LeakyRelu => {
                if x <= 0.0 {
                    x * LEAKY_SLOPE
                } else {
                    x
                }
            }
            Self::Tanh => x.tanh(),
        }
    }

    /// Derivative of [`Activation::forward`] at `x`.
    #[must_use]
    pub fn backward(self, x: f64) -> f64 {
        match self {
            Self::Sigmoid => {
                let s = Self::Sigmoid.forward(x);
                s * (1.0 - s)
            }
            Self::Relu => {
                if x <= 0.0 {
                    0.0
                } else {
                    1.0
                }
            }
            Self::LeakyRelu => {
                if x <= 0.0 {
                    LEAKY_SLOPE
                } else {
                    1.0
                }
            }
            Self::Tanh => 1.0 - x.tanh().powi(2),
        }
    }
}

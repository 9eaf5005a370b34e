//! A dense, rectangular `f64` matrix engine meant to sit behind a host
//! language's numeric value type.
//!
//! Matrices are built from scalars, flat lists, nested lists or other
//! matrices, combined element-wise or by matrix multiplication, filled from
//! seeded uniform and Gaussian draws and mapped in place. Reading a matrix's
//! transpose gives a view over the same buffer rather than a copy.
//!
//! ```
//! use quantum_matrix::Matrix;
//!
//! let a = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]], None).unwrap();
//! let b = Matrix::from_rows(&[[5.0, 6.0], [7.0, 8.0]], None).unwrap();
//! let c = a.matmul(&b).unwrap();
//! assert_eq!(c.to_rows(), vec![vec![19.0, 22.0], vec![43.0, 50.0]]);
//! assert!(a.transpose().transpose().ptr_eq(&a));
//! ```

pub mod arithmetic;
pub mod construct;
pub mod error;
mod format;
pub mod mapping;
pub mod matrix;
pub mod random;
pub mod sampler;
pub mod storage;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub use arithmetic::{apply, BinaryOp, CompareOp};
pub use construct::{value_kind, Dims, HostObject, HostValue};
pub use error::{Error, Result};
pub use mapping::Activation;
pub use matrix::Matrix;
pub use random::{GaussParams, UniformParams};
pub use sampler::{seed, Sampler};
pub use storage::IndexOrder;

/// Settings for the demo binary, read from `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shape, distribution and seed of the weight matrix.
    pub weights: GaussParams,
    /// Shape, bounds and seed of the input matrix.
    pub input: UniformParams,
    pub activation: Activation,
    pub iterations: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            weights: GaussParams {
                dims: Dims::new(4, 3).unwrap_or_default(),
                seed: Some(42),
                ..GaussParams::default()
            },
            input: UniformParams {
                lower: -1.0,
                dims: Dims::new(3, 2).unwrap_or_default(),
                ..UniformParams::default()
            },
            activation: Activation::Sigmoid,
            iterations: 3,
        }
    }
}

/// Loads the demo config from `path`, or `config.json` when `None`.
///
/// A missing file falls back to [`Config::default`].
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or_else(|| Path::new("config.json"));
    let config = match std::fs::read_to_string(path) {
        Ok(config) => config,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "config not found, using defaults");
            return Ok(Config::default());
        }
        Err(e) => {
            return Err(Error::Config {
                message: format!("{}: {e}", path.display()),
            })
        }
    };
    serde_json::from_str(&config).map_err(|e| Error::Config {
        message: format!("{}: {e}", path.display()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let config = load_config(Some(Path::new("no/such/config.json"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn config_fields_are_optional() {
        let config: Config = serde_json::from_str(
            r#"{"activation": "tanh", "input": {"dims": [3, 5], "seed": 7}}"#,
        )
        .unwrap();
        assert_eq!(config.activation, Activation::Tanh);
        assert_eq!(config.input.dims, Dims::new(3, 5).unwrap());
        assert_eq!(config.input.seed, Some(7));
        assert_eq!(config.iterations, Config::default().iterations);
    }

    #[test]
    fn malformed_config_is_an_error() {
        let path = std::env::temp_dir().join("quantum_matrix_bad_config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_config(Some(path.as_path())),
            Err(Error::Config { .. })
        ));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn invalid_dims_in_config_are_rejected() {
        assert!(serde_json::from_str::<Config>(r#"{"weights": {"dims": [0, 3]}}"#).is_err());
    }

    #[test]
    fn default_config_shapes_chain() {
        let config = Config::default();
        let w = Matrix::gauss(config.weights).unwrap();
        let x = Matrix::uniform(config.input).unwrap();
        let h = w.matmul(&x).unwrap();
        assert_eq!(h.shape(), (4, 2));
        assert_eq!(w.transpose().matmul(&h).unwrap().shape(), (3, 2));
    }
}

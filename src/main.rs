//! # A small demonstration of the matrix engine
//!
//! Builds a seeded Gaussian weight matrix and a uniform input, then runs a few
//! rounds of a toy dense layer: multiply, activate in place, and project back
//! through the transpose view of the weights.

use quantum_matrix::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Reads `config.json` (or falls back to defaults) and prints each round.
/// Set `RUST_LOG=debug` to watch transpose views being created and detached.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let c = load_config(None)?;

    let weights = Matrix::gauss(c.weights)?;
    let mut signal = Matrix::uniform(c.input)?;
    info!(
        weights = ?weights.shape(),
        input = ?signal.shape(),
        activation = c.activation.name(),
        "starting"
    );
    println!("weights:\n{weights}\n");
    println!("input:\n{signal}\n");

    for idx_t in 0..c.iterations {
        let hidden = weights.matmul(&signal)?;
        hidden.activate(c.activation)?;

        // weights.transpose() shares the weight buffer; nothing is copied here
        let projected = weights.transpose().matmul(&hidden)?;
        let scale = projected.data().iter().fold(0.0_f64, |m, x| m.max(x.abs()));
        signal = if scale > 0.0 {
            projected.div_scalar(scale)?
        } else {
            projected
        };

        info!(round = idx_t, max_abs = scale, "round complete");
        println!("round {idx_t} hidden:\n{hidden}\n");
    }

    println!("final signal:\n{signal:?}");
    Ok(())
}

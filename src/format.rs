//! Debug and display forms of a matrix.
//!
//! Both strings are rendered on first use and cached on the matrix until its
//! buffer changes.

use core::fmt::{self, Write};
use std::rc::Rc;

use crate::matrix::{Cache, Header, Matrix};

const SCIENTIFIC_THRESHOLD: f64 = 1000.0;
const CELL_WIDTH: usize = 7;

impl Matrix {
    /// `rows = R\ncols = C\ndata = [e0, e1, ...]`, elements to 4 decimal places.
    #[must_use]
    pub fn debug_string(&self) -> Rc<str> {
        self.cached_string(debug_slot, render_debug)
    }

    /// One bracketed line per row with fixed-width cells.
    #[must_use]
    pub fn display_string(&self) -> Rc<str> {
        self.cached_string(display_slot, render_display)
    }
}

fn debug_slot(cache: &mut Cache) -> &mut Option<Rc<str>> {
    &mut cache.debug
}

fn display_slot(cache: &mut Cache) -> &mut Option<Rc<str>> {
    &mut cache.display
}

fn render_debug(header: &Header) -> String {
    let mut out = format!("rows = {}\ncols = {}\ndata = [", header.rows, header.cols);
    for (i, x) in header.logical().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        if x.is_nan() {
            out.push_str("nan");
        } else {
            let _ = write!(out, "{x:.4}");
        }
    }
    out.push(']');
    out
}

fn render_display(header: &Header) -> String {
    let mut out = String::with_capacity(header.size() * (CELL_WIDTH + 1) + header.rows * 5);
    for row in 0..header.rows {
        if row > 0 {
            out.push('\n');
        }
        out.push_str("[ ");
        for col in 0..header.cols {
            if col > 0 {
                out.push(' ');
            }
            out.push_str(&cell(header.at(row * header.cols + col)));
        }
        out.push_str(" ]");
    }
    out
}

// %7.3f below the threshold, %7.1e at or above it
fn cell(x: f64) -> String {
    if x.is_nan() {
        format!("{:>width$}", "nan", width = CELL_WIDTH)
    } else if x.abs() >= SCIENTIFIC_THRESHOLD {
        format!("{:>width$}", scientific(x), width = CELL_WIDTH)
    } else {
        format!("{x:>width$.3}", width = CELL_WIDTH)
    }
}

fn scientific(x: f64) -> String {
    let plain = format!("{x:.1e}");
    let Some((mantissa, exponent)) = plain.split_once('e') else {
        // inf has no exponent
        return plain;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.abs())
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.debug_string())
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

//! Element-wise arithmetic, scalar broadcast and matrix multiplication.
//!
//! Every operation reads its operands through their index orders and writes
//! a fresh row-major result, so transpose views take part without being
//! copied first. Operands are checked before the result buffer is filled and
//! a failing operation returns no matrix.

use core::ops::{Add, Div, Mul, Sub};

use crate::construct::{Dims, HostValue};
use crate::error::{Error, Result};
use crate::matrix::Matrix;
use crate::storage::{alloc_buffer, Storage};

/// Binary operators a host can apply to matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    MatMul,
}

impl BinaryOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::MatMul => "@",
        }
    }
}

/// Comparison operators a host can apply to matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// The operator's host symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// Applies `op` to two host operands.
///
/// `+`, `-` and `@` need two matrices. `*` also accepts a number on either
/// side and `/` a number on the right; both broadcast the number over every
/// element. Anything else is an unsupported operand combination.
pub fn apply(op: BinaryOp, lhs: HostValue<'_>, rhs: HostValue<'_>) -> Result<Matrix> {
    let unsupported = || Error::unsupported(op.symbol(), lhs.kind(), rhs.kind());
    match (lhs, rhs) {
        (HostValue::Matrix(a), HostValue::Matrix(b)) => match op {
            BinaryOp::Add => a.add_elementwise(b),
            BinaryOp::Sub => a.sub_elementwise(b),
            BinaryOp::Mul => a.mul_elementwise(b),
            BinaryOp::Div => a.div_elementwise(b),
            BinaryOp::MatMul => a.matmul(b),
        },
        (HostValue::Matrix(a), scalar) => match (op, scalar.as_scalar()) {
            (BinaryOp::Mul, Some(k)) => a.scale(k),
            (BinaryOp::Div, Some(k)) => a.div_scalar(k),
            _ => Err(unsupported()),
        },
        (scalar, HostValue::Matrix(b)) => match (op, scalar.as_scalar()) {
            (BinaryOp::Mul, Some(k)) => b.scale(k),
            _ => Err(unsupported()),
        },
        _ => Err(unsupported()),
    }
}

impl Matrix {
    /// Combines two equally shaped matrices position by position.
    fn merge(&self, other: &Matrix, combine: impl Fn(f64, f64) -> Result<f64>) -> Result<Matrix> {
        let (a, b) = (self.header(), other.header());
        if (a.rows, a.cols) != (b.rows, b.cols) {
            return Err(Error::shape_mismatch((a.rows, a.cols), (b.rows, b.cols)));
        }
        let mut data = alloc_buffer(a.size())?;
        for i in 0..a.size() {
            data.push(combine(a.at(i), b.at(i))?);
        }
        Ok(Matrix::from_storage(a.rows, a.cols, Storage::from_vec(data)))
    }

    fn broadcast(&self, f: impl Fn(f64) -> f64) -> Result<Matrix> {
        let header = self.header();
        let storage = Storage::from_fn(header.size(), |i| f(header.at(i)))?;
        Ok(Matrix::from_storage(header.rows, header.cols, storage))
    }

    pub fn add_elementwise(&self, other: &Matrix) -> Result<Matrix> {
        self.merge(other, |x, y| Ok(x + y))
    }

    pub fn sub_elementwise(&self, other: &Matrix) -> Result<Matrix> {
        self.merge(other, |x, y| Ok(x - y))
    }

    /// Element-wise (Hadamard) product.
    pub fn mul_elementwise(&self, other: &Matrix) -> Result<Matrix> {
        self.merge(other, |x, y| Ok(x * y))
    }

    /// Element-wise quotient. A single zero divisor fails the whole operation.
    pub fn div_elementwise(&self, other: &Matrix) -> Result<Matrix> {
        self.merge(other, |x, y| {
            if y == 0.0 {
                return Err(Error::DivisionByZero {
                    message: "divisor matrix cannot contain 0",
                });
            }
            Ok(x / y)
        })
    }

    /// Every element multiplied by `k`.
    pub fn scale(&self, k: f64) -> Result<Matrix> {
        self.broadcast(|x| x * k)
    }

    /// Every element divided by `k`; `k == 0` is rejected before allocating.
    pub fn div_scalar(&self, k: f64) -> Result<Matrix> {
        if k == 0.0 {
            return Err(Error::DivisionByZero {
                message: "divisor scalar cannot be 0",
            });
        }
        self.broadcast(|x| x / k)
    }

    /// Matrix product `self @ other`.
    ///
    /// Rows of `self` are read through its row order and columns of `other`
    /// through its column order, so multiplying by a transpose view reads the
    /// shared buffer directly.
    pub fn matmul(&self, other: &Matrix) -> Result<Matrix> {
        let (a, b) = (self.header(), other.header());
        if a.cols != b.rows {
            return Err(Error::dimension(format!(
                "Matrix 1 has dims ({}, {}) while Matrix 2 has dims ({}, {}); incompatible for multiplication",
                a.rows, a.cols, b.rows, b.cols
            )));
        }
        let dims = Dims::new(a.rows, b.cols)?;
        let inner = a.cols;
        let (lhs, rhs) = (a.storage.as_slice(), b.storage.as_slice());
        let mut data = alloc_buffer(dims.size())?;
        for row in 0..dims.rows() {
            for col in 0..dims.cols() {
                let mut acc = 0.0;
                for k in 0..inner {
                    acc += lhs[a.row_offset(row * inner + k)] * rhs[b.col_offset(col * b.rows + k)];
                }
                data.push(acc);
            }
        }
        Ok(Matrix::from_storage(dims.rows(), dims.cols(), Storage::from_vec(data)))
    }

    /// Compares against a host operand.
    ///
    /// Only equality and inequality against another matrix are defined.
    pub fn compare(&self, op: CompareOp, other: HostValue<'_>) -> Result<bool> {
        match (op, other) {
            (CompareOp::Eq, HostValue::Matrix(other)) => Ok(self == other),
            (CompareOp::Ne, HostValue::Matrix(other)) => Ok(self != other),
            _ => Err(Error::unsupported(op.symbol(), "Matrix", other.kind())),
        }
    }
}

impl Add for &Matrix {
    type Output = Result<Matrix>;

    fn add(self, rhs: &Matrix) -> Result<Matrix> {
        self.add_elementwise(rhs)
    }
}

impl Sub for &Matrix {
    type Output = Result<Matrix>;

    fn sub(self, rhs: &Matrix) -> Result<Matrix> {
        self.sub_elementwise(rhs)
    }
}

impl Mul for &Matrix {
    type Output = Result<Matrix>;

    fn mul(self, rhs: &Matrix) -> Result<Matrix> {
        self.mul_elementwise(rhs)
    }
}

impl Div for &Matrix {
    type Output = Result<Matrix>;

    fn div(self, rhs: &Matrix) -> Result<Matrix> {
        self.div_elementwise(rhs)
    }
}

impl Mul<f64> for &Matrix {
    type Output = Result<Matrix>;

    fn mul(self, k: f64) -> Result<Matrix> {
        self.scale(k)
    }
}

impl Mul<&Matrix> for f64 {
    type Output = Result<Matrix>;

    fn mul(self, m: &Matrix) -> Result<Matrix> {
        m.scale(self)
    }
}

impl Div<f64> for &Matrix {
    type Output = Result<Matrix>;

    fn div(self, k: f64) -> Result<Matrix> {
        self.div_scalar(k)
    }
}

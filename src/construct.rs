//! Building matrices from scalars, flat lists, nested lists or other matrices.
//!
//! Host values arrive as [`serde_json::Value`]; [`Matrix::construct`] picks the
//! right pipeline from the shape of the argument the way an overloaded host
//! constructor would. The typed constructors (`filled`, `from_flat`,
//! `from_rows`, ...) are the same pipelines for callers that already hold
//! Rust values.
//!
//! Every input is validated before the buffer is populated, so a failed
//! construction never leaves a matrix behind.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::matrix::Matrix;
use crate::storage::{alloc_buffer, Storage};

/// Validated matrix dimensions: both positive, with a representable product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(usize, usize)", into = "(usize, usize)")]
pub struct Dims {
    rows: usize,
    cols: usize,
}

impl Dims {
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(non_positive(rows as i64, cols as i64));
        }
        if rows.checked_mul(cols).is_none() {
            return Err(Error::dimension(format!(
                "dims ({rows}, {cols}) exceed the addressable element count"
            )));
        }
        Ok(Self { rows, cols })
    }

    /// Parses a host dims tuple: one or two positive integers.
    ///
    /// A single entry `[n]` means `(n, 1)`.
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Array(items) = value else {
            return Err(Error::type_mismatch("dims", "tuple", value_kind(value)));
        };
        if items.is_empty() || items.len() > 2 {
            return Err(Error::dimension(format!(
                "dims must have 1 or 2 args, found {} args",
                items.len()
            )));
        }
        let mut dims = [1_i64; 2];
        for (slot, item) in dims.iter_mut().zip(items) {
            *slot = item
                .as_i64()
                .ok_or_else(|| Error::type_mismatch("dims", "int", value_kind(item)))?;
        }
        let [rows, cols] = dims;
        if rows < 1 || cols < 1 {
            return Err(non_positive(rows, cols));
        }
        let rows = usize::try_from(rows).map_err(|_| non_positive(rows, cols))?;
        let cols = usize::try_from(cols).map_err(|_| non_positive(rows as i64, cols))?;
        Self::new(rows, cols)
    }

    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.rows * self.cols
    }
}

impl Default for Dims {
    fn default() -> Self {
        Self { rows: 1, cols: 1 }
    }
}

impl TryFrom<(usize, usize)> for Dims {
    type Error = Error;

    fn try_from((rows, cols): (usize, usize)) -> Result<Self> {
        Self::new(rows, cols)
    }
}

impl From<Dims> for (usize, usize) {
    fn from(dims: Dims) -> Self {
        (dims.rows, dims.cols)
    }
}

fn non_positive(rows: i64, cols: i64) -> Error {
    Error::dimension(format!(
        "dims must be positive, non-zero values: ({rows}, {cols})"
    ))
}

fn empty_input() -> Error {
    Error::dimension("matrix constructed from list must have at least one element")
}

/// A borrowed host operand.
#[derive(Clone, Copy)]
pub enum HostValue<'a> {
    Matrix(&'a Matrix),
    Value(&'a Value),
    Object(&'a HostObject),
}

impl HostValue<'_> {
    /// The host type name used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Matrix(_) => "Matrix",
            Self::Value(value) => value_kind(value),
            Self::Object(object) => object.kind(),
        }
    }

    /// The numeric value, if this is a host number.
    #[must_use]
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Value(value) => value.scalar(),
            Self::Object(object) => object.scalar(),
            Self::Matrix(_) => None,
        }
    }
}

impl<'a> From<&'a Matrix> for HostValue<'a> {
    fn from(matrix: &'a Matrix) -> Self {
        Self::Matrix(matrix)
    }
}

impl<'a> From<&'a Value> for HostValue<'a> {
    fn from(value: &'a Value) -> Self {
        Self::Value(value)
    }
}

impl<'a> From<&'a HostObject> for HostValue<'a> {
    fn from(object: &'a HostObject) -> Self {
        Self::Object(object)
    }
}

/// An owned host value.
///
/// Unlike JSON, a host float may be infinite or NaN, so this is what host
/// callbacks return and what [`Matrix::to_host`] produces.
#[derive(Debug, Clone, PartialEq)]
pub enum HostObject {
    Scalar(f64),
    List(Vec<HostObject>),
    /// Anything else, known only by its host type name.
    Other(&'static str),
}

impl HostObject {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "float",
            Self::List(_) => "list",
            Self::Other(kind) => *kind,
        }
    }
}

impl From<f64> for HostObject {
    fn from(x: f64) -> Self {
        Self::Scalar(x)
    }
}

impl From<&Value> for HostObject {
    fn from(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::List(items.iter().map(Self::from).collect()),
            other => other.as_f64().map_or_else(|| Self::Other(value_kind(other)), Self::Scalar),
        }
    }
}

impl From<Value> for HostObject {
    fn from(value: Value) -> Self {
        Self::from(&value)
    }
}

#[must_use]
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

// the shape of a host argument, as seen by the construction pipeline
trait HostTree: Sized {
    fn kind(&self) -> &'static str;
    fn scalar(&self) -> Option<f64>;
    fn items(&self) -> Option<&[Self]>;
}

impl HostTree for Value {
    fn kind(&self) -> &'static str {
        value_kind(self)
    }

    fn scalar(&self) -> Option<f64> {
        self.as_f64()
    }

    fn items(&self) -> Option<&[Self]> {
        self.as_array().map(Vec::as_slice)
    }
}

impl HostTree for HostObject {
    fn kind(&self) -> &'static str {
        HostObject::kind(self)
    }

    fn scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(x) => Some(*x),
            _ => None,
        }
    }

    fn items(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

fn build<T: HostTree>(source: &T, dims: Option<Dims>) -> Result<Matrix> {
    if let Some(scalar) = source.scalar() {
        return Matrix::filled(scalar, dims.unwrap_or_default());
    }
    let Some(items) = source.items() else {
        return Err(Error::type_mismatch(
            "data",
            "Matrix, float or list",
            source.kind(),
        ));
    };
    let Some(first) = items.first() else {
        return Err(empty_input());
    };
    if first.scalar().is_some() {
        let flat = items
            .iter()
            .map(|item| {
                item.scalar()
                    .ok_or_else(|| Error::type_mismatch("matrix elements", "float", item.kind()))
            })
            .collect::<Result<Vec<f64>>>()?;
        return Matrix::from_flat(&flat, dims);
    }
    let Some(first) = first.items() else {
        return Err(Error::type_mismatch("matrix elements", "float", first.kind()));
    };
    let cols = first.len();
    let mut rows = Vec::with_capacity(items.len());
    for (i, row) in items.iter().enumerate() {
        let Some(row) = row.items() else {
            return Err(Error::type_mismatch("rows in data", "list", row.kind()));
        };
        if row.len() != cols {
            return Err(ragged(cols, i, row.len()));
        }
        let row = row
            .iter()
            .map(|item| {
                item.scalar()
                    .ok_or_else(|| Error::type_mismatch("matrix data", "float", item.kind()))
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }
    Matrix::from_rows(&rows, dims)
}

impl Matrix {
    /// Builds a matrix from a host argument, dispatching on its shape.
    ///
    /// * a matrix is deep-copied,
    /// * a number fills a matrix of `dims` (default `(1, 1)`),
    /// * a list of numbers is a flat list, `dims` defaulting to `(len, 1)`,
    /// * a list of lists is a nested list whose shape must match `dims` if given.
    pub fn construct(source: HostValue<'_>, dims: Option<Dims>) -> Result<Matrix> {
        match source {
            HostValue::Matrix(matrix) => {
                if let Some(dims) = dims {
                    if (dims.rows, dims.cols) != matrix.shape() {
                        return Err(shape_conflict("matrix", matrix.shape(), dims));
                    }
                }
                Matrix::copy_of(matrix)
            }
            HostValue::Value(value) => Matrix::from_value(value, dims),
            HostValue::Object(object) => Matrix::from_host(object, dims),
        }
    }

    /// Builds a matrix from a plain host value; see [`Matrix::construct`].
    pub fn from_value(value: &Value, dims: Option<Dims>) -> Result<Matrix> {
        build(value, dims)
    }

    /// Builds a matrix from an owned host value; see [`Matrix::construct`].
    pub fn from_host(object: &HostObject, dims: Option<Dims>) -> Result<Matrix> {
        build(object, dims)
    }

    /// Deep copy in logical order; the copy is never a transpose view.
    pub fn copy_of(source: &Matrix) -> Result<Matrix> {
        let header = source.header();
        let storage = Storage::from_fn(header.size(), |i| header.at(i))?;
        Ok(Matrix::from_storage(header.rows, header.cols, storage))
    }

    /// A matrix of `dims` with every element equal to `value`.
    pub fn filled(value: f64, dims: Dims) -> Result<Matrix> {
        let storage = Storage::filled(dims.size(), value)?;
        Ok(Matrix::from_storage(dims.rows, dims.cols, storage))
    }

    pub fn zeros(dims: Dims) -> Result<Matrix> {
        Matrix::filled(0.0, dims)
    }

    /// A matrix from a flat, row-major list of values.
    ///
    /// Without `dims` the result is a column vector of `values.len()` rows.
    pub fn from_flat(values: &[f64], dims: Option<Dims>) -> Result<Matrix> {
        if values.is_empty() {
            return Err(empty_input());
        }
        let dims = match dims {
            Some(dims) => dims,
            None => Dims::new(values.len(), 1)?,
        };
        if dims.size() != values.len() {
            return Err(Error::dimension(format!(
                "matrix with dims=({}, {}) cannot be created from {} value(s)",
                dims.rows,
                dims.cols,
                values.len()
            )));
        }
        let mut data = alloc_buffer(values.len())?;
        data.extend_from_slice(values);
        Ok(Matrix::from_storage(dims.rows, dims.cols, Storage::from_vec(data)))
    }

    /// A matrix from a list of equally long rows.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R], dims: Option<Dims>) -> Result<Matrix> {
        let Some(first) = rows.first() else {
            return Err(empty_input());
        };
        let first: &[f64] = first.as_ref();
        let (n_rows, n_cols) = (rows.len(), first.len());
        if n_cols == 0 {
            return Err(non_positive(n_rows as i64, 0));
        }
        if let Some(dims) = dims {
            if (dims.rows, dims.cols) != (n_rows, n_cols) {
                return Err(shape_conflict("2D array", (n_rows, n_cols), dims));
            }
        }
        for (i, row) in rows.iter().enumerate() {
            let row: &[f64] = row.as_ref();
            if row.len() != n_cols {
                return Err(ragged(n_cols, i, row.len()));
            }
        }
        let dims = Dims::new(n_rows, n_cols)?;
        let mut data = alloc_buffer(dims.size())?;
        for row in rows {
            let row: &[f64] = row.as_ref();
            data.extend_from_slice(row);
        }
        Ok(Matrix::from_storage(dims.rows, dims.cols, Storage::from_vec(data)))
    }

    /// The logical elements as a host list of row lists.
    #[must_use]
    pub fn to_host(&self) -> HostObject {
        HostObject::List(
            self.to_rows()
                .into_iter()
                .map(|row| HostObject::List(row.into_iter().map(HostObject::Scalar).collect()))
                .collect(),
        )
    }
}

fn shape_conflict(what: &str, found: (usize, usize), dims: Dims) -> Error {
    Error::dimension(format!(
        "dims of given {what} ({}, {}) don't match dims specified ({}, {})",
        found.0, found.1, dims.rows, dims.cols
    ))
}

fn ragged(expected: usize, row: usize, found: usize) -> Error {
    Error::dimension(format!(
        "expected {expected} element(s) in row {row}, but found {found} element(s)"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{GaussParams, UniformParams};
    use crate::sampler::Sampler;
    use proptest::prelude::*;
    use serde_json::json;

    fn dims(rows: usize, cols: usize) -> Option<Dims> {
        Some(Dims::new(rows, cols).unwrap())
    }

    #[test]
    fn dims_reject_zero() {
        assert_eq!(
            Dims::new(0, 3).unwrap_err().to_string(),
            "dims must be positive, non-zero values: (0, 3)"
        );
        assert!(Dims::new(usize::MAX, 2).is_err());
    }

    #[test]
    fn dims_from_host_tuple() {
        assert_eq!(Dims::from_value(&json!([2, 3])).unwrap(), Dims::new(2, 3).unwrap());
        assert_eq!(Dims::from_value(&json!([4])).unwrap(), Dims::new(4, 1).unwrap());
        assert_eq!(
            Dims::from_value(&json!([-1, 3])).unwrap_err().to_string(),
            "dims must be positive, non-zero values: (-1, 3)"
        );
        assert!(matches!(
            Dims::from_value(&json!([1, 2, 3])),
            Err(Error::Dimension { .. })
        ));
        assert!(matches!(
            Dims::from_value(&json!([1.5, 2])),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            Dims::from_value(&json!("2x2")),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn dims_deserialize_validated() {
        let ok: Dims = serde_json::from_value(json!([3, 2])).unwrap();
        assert_eq!((ok.rows(), ok.cols()), (3, 2));
        assert!(serde_json::from_value::<Dims>(json!([0, 2])).is_err());
    }

    #[test]
    fn scalar_fill_defaults_to_one_by_one() {
        let m = Matrix::from_value(&json!(5), None).unwrap();
        assert_eq!(m.shape(), (1, 1));
        assert_eq!(&*m.data(), &[5.0]);
        let m = Matrix::from_value(&json!(2.5), dims(2, 3)).unwrap();
        assert_eq!(&*m.data(), &[2.5; 6]);
    }

    #[test]
    fn zeros_fill() {
        let m = Matrix::zeros(Dims::new(3, 3).unwrap()).unwrap();
        assert!(m.data().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn flat_list_defaults_to_column() {
        let m = Matrix::from_value(&json!([1, 2, 3]), None).unwrap();
        assert_eq!(m.shape(), (3, 1));
        let m = Matrix::from_value(&json!([1, 2, 3, 4]), dims(2, 2)).unwrap();
        assert_eq!(m.to_rows(), vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn flat_list_count_mismatch() {
        assert_eq!(
            Matrix::from_flat(&[1.0, 2.0, 3.0], dims(2, 2))
                .unwrap_err()
                .to_string(),
            "matrix with dims=(2, 2) cannot be created from 3 value(s)"
        );
    }

    #[test]
    fn flat_list_rejects_non_numbers() {
        let err = Matrix::from_value(&json!([1, "two", 3]), None).unwrap_err();
        assert_eq!(
            err,
            Error::type_mismatch("matrix elements", "float", "str")
        );
    }

    #[test]
    fn nested_list_infers_shape() {
        let m = Matrix::from_value(&json!([[1, 2, 3], [4, 5, 6]]), None).unwrap();
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(&*m.data(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn nested_list_ragged_names_row() {
        let err = Matrix::from_value(&json!([[1, 2, 3], [4, 5]]), None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected 3 element(s) in row 1, but found 2 element(s)"
        );
        let err = Matrix::from_rows(&[vec![1.0], vec![2.0, 3.0]], None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected 1 element(s) in row 1, but found 2 element(s)"
        );
    }

    #[test]
    fn nested_list_dims_must_match() {
        let err = Matrix::from_value(&json!([[1, 2, 3], [4, 5, 6]]), dims(3, 2)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "dims of given 2D array (2, 3) don't match dims specified (3, 2)"
        );
    }

    #[test]
    fn nested_list_rejects_bad_rows_and_elements() {
        assert!(matches!(
            Matrix::from_value(&json!([[1, 2], 3]), None),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            Matrix::from_value(&json!([[1, null]]), None),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            Matrix::from_value(&json!([[]]), None),
            Err(Error::Dimension { .. })
        ));
    }

    #[test]
    fn empty_and_unsupported_inputs() {
        assert!(matches!(
            Matrix::from_value(&json!([]), None),
            Err(Error::Dimension { .. })
        ));
        assert!(Matrix::from_flat(&[], None).is_err());
        assert_eq!(
            Matrix::from_value(&json!("abc"), None).unwrap_err(),
            Error::type_mismatch("data", "Matrix, float or list", "str")
        );
        assert!(matches!(
            Matrix::from_value(&json!([true]), None),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn copy_is_deep_and_row_major() {
        let m = Matrix::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]], None).unwrap();
        let t = m.transpose();
        let copy = Matrix::construct(HostValue::Matrix(&t), None).unwrap();
        assert!(copy == t);
        assert!(!copy.shares_storage_with(&t));
        assert!(!copy.is_transpose_view());
        copy.map(|x| x * 10.0).unwrap();
        assert_eq!(&*t.data(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert!(Matrix::construct(HostValue::Matrix(&m), dims(3, 2)).is_err());
    }

    #[test]
    fn host_value_kinds() {
        let m = Matrix::zeros(Dims::default()).unwrap();
        assert_eq!(HostValue::from(&m).kind(), "Matrix");
        assert_eq!(HostValue::from(&json!(1)).kind(), "int");
        assert_eq!(HostValue::from(&json!(1.5)).kind(), "float");
        assert_eq!(HostValue::from(&json!({})).kind(), "dict");
        assert_eq!(HostValue::from(&json!(3)).as_scalar(), Some(3.0));
    }

    #[test]
    fn to_host_nests_rows() {
        let m = Matrix::from_rows(&[[1.5, 2.0], [3.0, 4.0]], None).unwrap();
        assert_eq!(
            m.to_host(),
            HostObject::from(json!([[1.5, 2.0], [3.0, 4.0]]))
        );
    }

    #[test]
    fn non_finite_elements_survive_the_host_boundary() {
        let m = Matrix::from_flat(&[f64::INFINITY, 1.0, f64::NEG_INFINITY, f64::NAN], None)
            .unwrap();
        let back = Matrix::construct(HostValue::Object(&m.to_host()), None).unwrap();
        assert_eq!(back.shape(), (4, 1));
        let data = back.data();
        assert_eq!(&data[..3], &[f64::INFINITY, 1.0, f64::NEG_INFINITY]);
        assert!(data[3].is_nan());

        let nested = HostObject::List(vec![
            HostObject::List(vec![HostObject::Scalar(f64::NAN), HostObject::Scalar(2.0)]),
            HostObject::List(vec![HostObject::Scalar(3.0), HostObject::Scalar(f64::INFINITY)]),
        ]);
        let m = Matrix::from_host(&nested, None).unwrap();
        assert_eq!(m.shape(), (2, 2));
        assert_eq!(m.get(1, 1), Some(f64::INFINITY));
    }

    #[test]
    fn host_objects_from_json() {
        assert_eq!(HostObject::from(json!(3)), HostObject::Scalar(3.0));
        assert_eq!(HostObject::from(json!("x")), HostObject::Other("str"));
        assert_eq!(HostObject::from(json!(null)).kind(), "null");
        assert_eq!(
            Matrix::from_host(&HostObject::List(vec![HostObject::Other("dict")]), None)
                .unwrap_err(),
            Error::type_mismatch("matrix elements", "float", "dict")
        );
        assert_eq!(HostValue::Object(&HostObject::Scalar(f64::NAN)).kind(), "float");
    }

    proptest! {
        #[test]
        fn prop_every_pipeline_keeps_size_consistent(
            rows in 1_usize..8,
            cols in 1_usize..8,
            fill in -100.0_f64..100.0,
            seed in any::<u64>(),
        ) {
            let d = Dims::new(rows, cols).unwrap();
            let values: Vec<f64> = (0..rows * cols).map(|i| i as f64 * fill).collect();
            let nested: Vec<&[f64]> = values.chunks(cols).collect();
            let mut sampler = Sampler::seeded(seed);

            let scalar = Matrix::filled(fill, d).unwrap();
            let flat = Matrix::from_flat(&values, Some(d)).unwrap();
            let column = Matrix::from_flat(&values, None).unwrap();
            let from_rows = Matrix::from_rows(&nested, None).unwrap();
            let from_json = Matrix::from_value(&json!(nested), None).unwrap();
            let copy = Matrix::copy_of(&flat).unwrap();
            let gauss = Matrix::gauss_with(
                &mut sampler,
                GaussParams { dims: d, ..GaussParams::default() },
            )
            .unwrap();
            let uniform = Matrix::uniform_with(
                &mut sampler,
                UniformParams { dims: d, ..UniformParams::default() },
            )
            .unwrap();
            let sum = (&flat + &scalar).unwrap();
            let scaled = (&flat * 2.0).unwrap();
            let view = flat.transpose();
            let product = flat.matmul(&view).unwrap();
            let outer = view.matmul(&flat).unwrap();

            let shaped = [
                (&scalar, (rows, cols)),
                (&flat, (rows, cols)),
                (&column, (rows * cols, 1)),
                (&from_rows, (rows, cols)),
                (&from_json, (rows, cols)),
                (&copy, (rows, cols)),
                (&gauss, (rows, cols)),
                (&uniform, (rows, cols)),
                (&sum, (rows, cols)),
                (&scaled, (rows, cols)),
                (&view, (cols, rows)),
                (&product, (rows, rows)),
                (&outer, (cols, cols)),
            ];
            for (m, shape) in shaped {
                prop_assert_eq!(m.shape(), shape);
                prop_assert_eq!(m.rows() * m.cols(), m.size());
                prop_assert_eq!(m.data().len(), m.size());
                prop_assert_eq!(m.to_rows().len(), m.rows());
            }
        }
    }
}

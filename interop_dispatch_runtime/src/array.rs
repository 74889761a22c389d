//! Dense N-dimensional array storage
//!
//! Backing store for host arrays exposed to scripts. Indices are zero-based
//! and row-major, matching host-side array conventions rather than script
//! table conventions.

// SAFETY: i64→usize casts are guarded by a non-negative check first.
#![allow(clippy::cast_sign_loss)]

use crate::error::{RuntimeError, RuntimeResult};
use crate::value::DynamicValue;

/// Row-major array of dynamic values with a fixed shape.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseArray {
    shape: Vec<usize>,
    data: Vec<DynamicValue>,
}

impl DenseArray {
    /// Create an array of the given shape filled with `fill`.
    pub fn filled(shape: &[usize], fill: DynamicValue) -> Self {
        let len = shape.iter().product();
        Self {
            shape: shape.to_vec(),
            data: vec![fill; len],
        }
    }

    /// Create an array from row-major data.
    pub fn from_vec(shape: &[usize], data: Vec<DynamicValue>) -> RuntimeResult<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(RuntimeError::argument_error(format!(
                "shape {:?} needs {} elements, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            shape: shape.to_vec(),
            data,
        })
    }

    /// Number of dimensions
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn offset(&self, indices: &[i64]) -> RuntimeResult<usize> {
        if indices.len() != self.shape.len() {
            return Err(RuntimeError::argument_error(format!(
                "array of rank {} indexed with {} indices",
                self.shape.len(),
                indices.len()
            )));
        }
        let mut offset = 0usize;
        for (&index, &dim) in indices.iter().zip(&self.shape) {
            if index < 0 || index as usize >= dim {
                return Err(RuntimeError::bounds_error(index, dim));
            }
            offset = offset * dim + index as usize;
        }
        Ok(offset)
    }

    /// Get element at the given zero-based indices
    pub fn get(&self, indices: &[i64]) -> RuntimeResult<DynamicValue> {
        let offset = self.offset(indices)?;
        Ok(self.data[offset].clone())
    }

    /// Set element at the given zero-based indices
    pub fn set(&mut self, indices: &[i64], value: DynamicValue) -> RuntimeResult<()> {
        let offset = self.offset(indices)?;
        self.data[offset] = value;
        Ok(())
    }

    /// Elements in row-major order
    pub fn iter(&self) -> impl Iterator<Item = &DynamicValue> {
        self.data.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> DenseArray {
        let data = [2, 4, 6, 7, 8, 9]
            .into_iter()
            .map(DynamicValue::from)
            .collect();
        DenseArray::from_vec(&[2, 3], data).unwrap()
    }

    #[test]
    fn test_dense_array_creation() {
        let arr = DenseArray::filled(&[3], DynamicValue::Number(0.0));
        assert_eq!(arr.len(), 3);
        assert_eq!(arr.rank(), 1);

        assert!(DenseArray::from_vec(&[2, 2], vec![DynamicValue::Nil]).is_err());
    }

    #[test]
    fn test_row_major_access() {
        let arr = grid();
        assert_eq!(arr.get(&[0, 0]).unwrap(), DynamicValue::from(2));
        assert_eq!(arr.get(&[1, 2]).unwrap(), DynamicValue::from(9));
        assert_eq!(arr.get(&[1, 0]).unwrap(), DynamicValue::from(7));
    }

    #[test]
    fn test_bounds_and_rank_checks() {
        let mut arr = grid();
        assert_eq!(
            arr.get(&[2, 0]),
            Err(RuntimeError::bounds_error(2, 2))
        );
        assert!(matches!(arr.get(&[-1, 0]), Err(RuntimeError::BoundsError { .. })));
        assert!(matches!(arr.get(&[0]), Err(RuntimeError::ArgumentError(_))));

        arr.set(&[0, 1], DynamicValue::from(40)).unwrap();
        assert_eq!(arr.get(&[0, 1]).unwrap(), DynamicValue::from(40));
    }
}

/*
 * @Description  : 2阶张量（矩阵）相关运算，供全连接层使用
 */

use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use ndarray::{ArrayView2, Axis, Ix1, Ix2};

impl Tensor {
    fn as_matrix(&self) -> Result<ArrayView2<'_, f32>, TensorError> {
        self.data
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| TensorError::DimensionMismatch {
                expected: 2,
                got: self.dimension(),
            })
    }

    fn check_inner(&self, a: usize, b: usize, other: &Self) -> Result<(), TensorError> {
        if a == b {
            Ok(())
        } else {
            Err(TensorError::OperatorError {
                operator: Operator::Mul,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: other.shape().to_vec(),
            })
        }
    }

    /// 矩阵乘法`self · other`
    pub fn mat_mul(&self, other: &Self) -> Result<Self, TensorError> {
        let (a, b) = (self.as_matrix()?, other.as_matrix()?);
        self.check_inner(a.ncols(), b.nrows(), other)?;
        Ok(Self::from_array(a.dot(&b).into_dyn()))
    }

    /// `selfᵀ · other`
    pub fn t_mat_mul(&self, other: &Self) -> Result<Self, TensorError> {
        let (a, b) = (self.as_matrix()?, other.as_matrix()?);
        self.check_inner(a.nrows(), b.nrows(), other)?;
        Ok(Self::from_array(a.t().dot(&b).into_dyn()))
    }

    /// `self · otherᵀ`
    pub fn mat_mul_t(&self, other: &Self) -> Result<Self, TensorError> {
        let (a, b) = (self.as_matrix()?, other.as_matrix()?);
        self.check_inner(a.ncols(), b.ncols(), other)?;
        Ok(Self::from_array(a.dot(&b.t()).into_dyn()))
    }

    /// 每一行加上同一个行向量（形状`[cols]`），常用于加偏置
    pub fn add_row_vector(&self, row: &Self) -> Result<Self, TensorError> {
        let a = self.as_matrix()?;
        if row.dimension() != 1 || row.size() != a.ncols() {
            return Err(TensorError::OperatorError {
                operator: Operator::Add,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: row.shape().to_vec(),
            });
        }
        let row = row
            .data
            .view()
            .into_dimensionality::<Ix1>()
            .map_err(|_| TensorError::DimensionMismatch {
                expected: 1,
                got: row.dimension(),
            })?;
        let mut out = a.to_owned();
        out += &row;
        Ok(Self::from_array(out.into_dyn()))
    }

    /// 按列求和，`[rows, cols]` -> `[cols]`
    pub fn sum_rows(&self) -> Result<Self, TensorError> {
        Ok(Self::from_array(
            self.as_matrix()?.sum_axis(Axis(0)).into_dyn(),
        ))
    }
}

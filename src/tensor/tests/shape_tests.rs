use crate::assert_err;
use crate::errors::TensorError;
use crate::tensor::Tensor;

#[test]
fn test_reshape_keeps_row_major_order() -> Result<(), TensorError> {
    let t = Tensor::new(&[1., 2., 3., 4., 5., 6.], &[1, 6]);
    let r = t.reshape(&[1, 2, 3])?;
    assert_eq!(r.shape(), &[1, 2, 3]);
    assert_eq!(r.data_as_slice(), t.data_as_slice());
    assert_err!(
        t.reshape(&[4, 2]),
        TensorError::IncompatibleReshape { .. }
    );
    Ok(())
}

#[test]
fn test_flatten_batch() -> Result<(), TensorError> {
    let t = Tensor::zeros(&[2, 3, 4, 5]);
    assert_eq!(t.flatten_batch()?.shape(), &[2, 60]);
    Ok(())
}

#[test]
fn test_concat_and_split_channels() -> Result<(), TensorError> {
    let image = Tensor::full(1., &[2, 3, 4, 4]);
    let mask = Tensor::full(2., &[2, 1, 4, 4]);
    let merged = Tensor::concat_channels(&[&image, &mask])?;
    assert_eq!(merged.shape(), &[2, 4, 4, 4]);
    // 第1个样本的最后一个通道来自掩码
    let first = merged.select_batch(0)?;
    assert_eq!(first.data_as_slice()[3 * 16], 2.);
    assert_eq!(first.data_as_slice()[3 * 16 - 1], 1.);

    let parts = merged.split_channels(&[3, 1])?;
    assert_eq!(parts[0], image);
    assert_eq!(parts[1], mask);
    Ok(())
}

#[test]
fn test_concat_errors() {
    let a = Tensor::zeros(&[1, 3, 4, 4]);
    let b = Tensor::zeros(&[1, 1, 4, 5]);
    assert_err!(
        Tensor::concat_channels(&[&a, &b]),
        TensorError::OperatorError { .. }
    );
    assert_err!(Tensor::concat_channels(&[]), TensorError::EmptyList);
    assert_err!(a.split_channels(&[2, 2]));
}

#[test]
fn test_select_batch() -> Result<(), TensorError> {
    let t = Tensor::new(&[1., 2., 3., 4.], &[2, 2]);
    assert_eq!(t.select_batch(1)?, Tensor::new(&[3., 4.], &[1, 2]));
    assert_err!(
        t.select_batch(2),
        TensorError::ValueMustSatisfyComparison { .. }
    );
    Ok(())
}

#[test]
fn test_argmax_rows() -> Result<(), TensorError> {
    let t = Tensor::new(&[0.9, 0.1, 0.2, 0.8, 0.5, 0.5], &[3, 2]);
    assert_eq!(t.argmax_rows()?, vec![0, 1, 0]);
    assert_err!(
        Tensor::zeros(&[2]).argmax_rows(),
        TensorError::DimensionMismatch { expected: 2, got: 1 }
    );
    Ok(())
}

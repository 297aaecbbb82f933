use approx::assert_abs_diff_eq;

use crate::data::{
    ExamplePreProcessor, ImageDataSetIterator, ImagePreProcessingScaler, MemoryDataSetIterator,
    TrainingExample,
};
use crate::tensor::Tensor;

#[test]
fn test_scaler_default_range() {
    let scaler = ImagePreProcessingScaler::default();
    assert_abs_diff_eq!(scaler.scale(0.0), 0.0);
    assert_abs_diff_eq!(scaler.scale(255.0), 1.0);
    assert_abs_diff_eq!(scaler.scale(51.0), 0.2, epsilon = 1e-6);
}

#[test]
fn test_scaler_custom_range() {
    let scaler = ImagePreProcessingScaler::new(-1.0, 1.0);
    assert_abs_diff_eq!(scaler.scale(0.0), -1.0);
    assert_abs_diff_eq!(scaler.scale(127.5), 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(scaler.scale(255.0), 1.0);

    let scaler = ImagePreProcessingScaler::default().with_max_pixel(1.0);
    assert_abs_diff_eq!(scaler.scale(0.5), 0.5);
}

#[test]
fn test_scaler_applies_to_all_images() {
    let mut example = TrainingExample::new(
        Tensor::full(255.0, &[1, 3, 2, 2]),
        Tensor::full(0.0, &[1, 1, 2, 2]),
        Tensor::full(102.0, &[1, 3, 2, 2]),
    )
    .unwrap();
    ImagePreProcessingScaler::default().pre_process(&mut example);
    assert_eq!(example.input(), &Tensor::ones(&[1, 3, 2, 2]));
    assert_eq!(example.mask(), &Tensor::zeros(&[1, 1, 2, 2]));
    assert_abs_diff_eq!(example.ground_truth().data_as_slice()[0], 0.4, epsilon = 1e-6);
}

#[test]
fn test_iterator_pre_processor_applied_once() {
    let examples = (0..2)
        .map(|_| {
            TrainingExample::new(
                Tensor::full(255.0, &[1, 3, 2, 2]),
                Tensor::full(255.0, &[1, 1, 2, 2]),
                Tensor::full(255.0, &[1, 3, 2, 2]),
            )
            .unwrap()
        })
        .collect();
    let mut iterator = MemoryDataSetIterator::new(examples, 3, 7).unwrap();
    assert!(iterator.pre_processor().is_none());
    iterator.set_pre_processor(Box::new(ImagePreProcessingScaler::default()));
    assert!(iterator.pre_processor().is_some());

    // 多次取出也只缩放过一次
    for _ in 0..3 {
        let example = iterator.next().unwrap();
        assert_eq!(example.input(), &Tensor::ones(&[1, 3, 2, 2]));
    }
    let example = iterator.next_random();
    assert_eq!(example.mask(), &Tensor::ones(&[1, 1, 2, 2]));
}

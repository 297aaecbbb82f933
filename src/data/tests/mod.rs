mod transforms;

use crate::data::TrainingExample;
use crate::tensor::Tensor;

/// 构造一个各像素值均为`value`的样本（2x2图）
fn make_example(value: f32) -> TrainingExample {
    TrainingExample::new(
        Tensor::full(value, &[1, 3, 2, 2]),
        Tensor::full(1.0, &[1, 1, 2, 2]),
        Tensor::full(value + 0.5, &[1, 3, 2, 2]),
    )
    .unwrap()
}

/// 样本的标识值（输入图的第一个像素）
fn id_of(example: &TrainingExample) -> f32 {
    example.input().data_as_slice()[0]
}

use burn::{prelude::*, tensor::activation::log_softmax};

/// Categorical cross-entropy between logits and one-hot targets.
///
/// logits, one_hot: [batch, classes] → mean loss, shape [1]
pub fn categorical_cross_entropy<B: Backend>(
    logits:  Tensor<B, 2>,
    one_hot: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let log_probs = log_softmax(logits, 1);
    (log_probs * one_hot).sum_dim(1).mean().neg()
}

/// Number of rows whose arg-max matches the target class
pub fn correct_predictions<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    predicted
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

#![cfg(test)]

use std::num::NonZeroUsize;

use ndarray::{Array2, Array4};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    arch::{
        Model, Sequential,
        activations::ActFn,
        layers::{Layer, MapShape},
        loss::{CategoricalCrossEntropy, LossFn},
    },
    initialization::variance_scaling,
    optimization::Adam,
    training::FitConfig,
};

fn loss_at(net: &mut Sequential, params: &[f32], x: &Array2<f32>, y: &Array2<f32>) -> f32 {
    let y_pred = net.forward(params, x.view()).unwrap();
    CategoricalCrossEntropy.loss(y_pred.view(), y.view())
}

#[test]
fn test_ml_gradient_matches_finite_differences() {
    let input = MapShape::new(4, 4, 1);
    let mut net = Sequential::new([
        Layer::conv2d(input, 2, 3, None),
        Layer::max_pool2d(MapShape::new(2, 2, 2), 2, 2),
        Layer::flatten(MapShape::new(1, 1, 2)),
        Layer::dense((2, 3), Some(ActFn::softmax())),
    ]);

    let mut rng = StdRng::seed_from_u64(5);
    let params = variance_scaling(net.layers(), &mut rng);
    let x = Array2::from_shape_fn((3, input.len()), |_| rng.random::<f32>());
    let y = Array2::from_shape_fn((3, 3), |(n, c)| (n == c) as u8 as f32);

    let y_pred = net.forward(&params, x.view()).unwrap();
    let d = CategoricalCrossEntropy.loss_prime(y_pred.view(), y.view());
    let mut grad = vec![0.; params.len()];
    net.backward(&params, &mut grad, d).unwrap();

    let eps = 1e-3;
    for i in 0..params.len() {
        let mut plus = params.clone();
        let mut minus = params.clone();
        plus[i] += eps;
        minus[i] -= eps;

        let numeric =
            (loss_at(&mut net, &plus, &x, &y) - loss_at(&mut net, &minus, &x, &y)) / (2. * eps);

        let tolerance = 1e-2 + 5e-2 * numeric.abs();
        assert!(
            (numeric - grad[i]).abs() < tolerance,
            "param {i}: numeric {numeric} analytic {}",
            grad[i]
        );
    }
}

/// Images with a single full-length bar, vertical ones are class 0 and horizontal ones class 1.
fn bars(n: usize, rng: &mut StdRng) -> (Array4<f32>, Array2<f32>) {
    let side = 6;
    let mut x = Array4::zeros((n, side, side, 1));
    let mut y = Array2::zeros((n, 2));

    for i in 0..n {
        let class = i % 2;
        let at = rng.random_range(0..side);

        for j in 0..side {
            let (row, col) = if class == 0 { (j, at) } else { (at, j) };
            x[[i, row, col, 0]] = 1.;
        }
        y[[i, class]] = 1.;
    }

    (x, y)
}

#[test]
fn test_ml_conv_net_tells_bars_apart() {
    let mut rng = StdRng::seed_from_u64(42);
    let input = MapShape::new(6, 6, 1);
    let network = Sequential::new([
        Layer::conv2d(input, 4, 3, Some(ActFn::relu())),
        Layer::max_pool2d(MapShape::new(4, 4, 4), 2, 2),
        Layer::flatten(MapShape::new(2, 2, 4)),
        Layer::dense((16, 2), Some(ActFn::softmax())),
    ]);
    let optimizer = Adam::new(network.size(), 0.02, 0.9, 0.999, 1e-7);
    let mut model = Model::new(
        network,
        input,
        optimizer,
        CategoricalCrossEntropy::new(),
        &mut rng,
    );

    let (x, y) = bars(32, &mut rng);
    let (val_x, val_y) = bars(16, &mut rng);
    let config = FitConfig {
        epochs: 50,
        batch_size: NonZeroUsize::new(8).unwrap(),
        shuffle: true,
    };

    let last = model
        .fit(x.view(), y.view(), Some((val_x.view(), val_y.view())), config, &mut rng)
        .last()
        .unwrap()
        .unwrap();

    assert!(last.loss < 0.3, "{last}");
    assert!(last.val_accuracy.unwrap() >= 0.9, "{last}");
}

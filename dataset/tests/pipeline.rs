use std::{io::Cursor, num::NonZeroUsize};

use dataset::{DecoderConfig, MemorySource, Partition, PartitionedDataset, decode};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use rand::{SeedableRng, rngs::StdRng};

const IMAGE_SIZE: usize = 4;
const CLASSES: usize = 2;

/// Four examples, example `i` has every pixel set to `10 * (i + 1)` and class `i % 2`.
fn assets() -> MemorySource {
    let sprite = GrayImage::from_fn(IMAGE_SIZE as u32, 4, |_, y| Luma([10 * (y as u8 + 1)]));
    let mut png = Vec::new();
    DynamicImage::ImageLuma8(sprite)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();

    let labels = vec![
        1, 0, //
        0, 1, //
        1, 0, //
        0, 1, //
    ];

    let mut source = MemorySource::new();
    source.insert("mnist.png", png).insert("labels", labels);
    source
}

fn config() -> DecoderConfig {
    DecoderConfig {
        sprite_path: "mnist.png".into(),
        labels_path: "labels".into(),
        total_examples: 4,
        image_size: IMAGE_SIZE,
        num_classes: CLASSES,
        chunk_rows: NonZeroUsize::new(2).unwrap(),
    }
}

async fn draw_one(seed: u64) -> (Vec<f32>, Vec<f32>, usize) {
    let decoded = decode(&assets(), &config()).await.unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    let ds = PartitionedDataset::new(decoded, 0.5, &mut rng).unwrap();

    assert_eq!(ds.len(Partition::Train), 2);
    assert_eq!(ds.len(Partition::Test), 2);

    let batch = ds.next_batch(Partition::Train, 1).unwrap();
    let expected = ds.indices(Partition::Train)[1];
    (batch.inputs.iter().copied().collect(), batch.targets.iter().copied().collect(), expected)
}

#[tokio::test]
async fn decode_partition_and_batch_end_to_end() {
    let (pixels, target, expected) = draw_one(1234).await;

    let value = 10.0 * (expected as f32 + 1.0) / 255.0;
    assert_eq!(pixels, vec![value; IMAGE_SIZE]);

    let mut one_hot = vec![0.0; CLASSES];
    one_hot[expected % CLASSES] = 1.0;
    assert_eq!(target, one_hot);
}

#[tokio::test]
async fn same_seed_draws_the_same_example() {
    for seed in [0, 1, 42, 1234] {
        assert_eq!(draw_one(seed).await, draw_one(seed).await);
    }
}

#[tokio::test]
async fn a_two_example_partition_only_serves_single_example_batches() {
    let decoded = decode(&assets(), &config()).await.unwrap();
    let ds = PartitionedDataset::new(decoded, 0.5, &mut StdRng::seed_from_u64(0)).unwrap();

    assert!(ds.next_batch(Partition::Test, 1).is_ok());
    assert!(ds.next_batch(Partition::Test, 2).is_err());
}

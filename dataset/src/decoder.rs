use std::num::NonZeroUsize;

use image::imageops;
use log::{debug, info};
use tokio::task;

use crate::{AssetSource, DatasetErr, DecodedDataset, Result};

/// Rows of the sprite rendered into the off-screen surface at once.
pub const DEFAULT_CHUNK_ROWS: usize = 5000;

/// Where the raw assets live and how they are laid out.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    pub sprite_path: String,
    pub labels_path: String,
    pub total_examples: usize,
    pub image_size: usize,
    pub num_classes: usize,
    pub chunk_rows: NonZeroUsize,
}

/// Fetches the image sprite and the label bytes concurrently and decodes them into a
/// `DecodedDataset`.
///
/// # Arguments
/// * `source` - Where to fetch the assets from.
/// * `config` - The assets' paths and layout.
///
/// # Returns
/// The full unsplit dataset, or an error if either asset is unreachable or malformed.
pub async fn decode<S: AssetSource>(source: &S, config: &DecoderConfig) -> Result<DecodedDataset> {
    let (sprite, labels) = tokio::try_join!(
        fetch(source, &config.sprite_path),
        fetch(source, &config.labels_path),
    )?;

    info!(
        sprite_bytes = sprite.len(),
        label_bytes = labels.len();
        "fetched dataset assets"
    );

    let expected = config.total_examples * config.num_classes;
    if labels.len() != expected {
        return Err(DatasetErr::SizeMismatch {
            what: "label bytes",
            got: labels.len(),
            expected,
        });
    }

    let (total, image_size, chunk_rows) =
        (config.total_examples, config.image_size, config.chunk_rows);
    let images = task::spawn_blocking(move || decode_sprite(&sprite, total, image_size, chunk_rows))
        .await
        .map_err(DatasetErr::DecodeTask)??;

    DecodedDataset::new(images, labels, config.image_size, config.num_classes)
}

async fn fetch<S: AssetSource>(source: &S, path: &str) -> Result<Vec<u8>> {
    source
        .fetch(path)
        .await
        .map_err(|source| DatasetErr::AssetFetch {
            path: path.to_string(),
            source,
        })
}

/// Decodes an image sprite holding one example per row into normalized pixel values.
///
/// The sprite is processed `chunk_rows` rows at a time: each chunk is cropped into its own
/// surface and only the red channel is read back, every channel holds the same value in a
/// grayscale sprite. When `total` is not a multiple of `chunk_rows` the last chunk only
/// covers the remaining rows.
///
/// # Arguments
/// * `bytes` - The encoded sprite.
/// * `total` - The amount of examples (rows) to decode.
/// * `image_size` - The amount of pixels per example (the sprite's width).
/// * `chunk_rows` - The amount of rows per chunk.
///
/// # Returns
/// `total * image_size` floats in `[0, 1]`.
pub fn decode_sprite(
    bytes: &[u8],
    total: usize,
    image_size: usize,
    chunk_rows: NonZeroUsize,
) -> Result<Vec<f32>> {
    let sprite = image::load_from_memory(bytes)?.into_rgba8();
    let (width, height) = sprite.dimensions();

    if width as usize != image_size || (height as usize) < total {
        return Err(DatasetErr::SpriteGeometry {
            width,
            height,
            image_size,
            total,
        });
    }

    let chunk_rows = chunk_rows.get();
    let mut images = vec![0.0; total * image_size];

    for (i, dst) in images.chunks_mut(chunk_rows * image_size).enumerate() {
        let row = i * chunk_rows;
        let rows = dst.len() / image_size;
        debug!("decoding sprite rows {row}..{}", row + rows);

        let surface = imageops::crop_imm(&sprite, 0, row as u32, width, rows as u32).to_image();

        for (pixel, value) in surface.as_raw().chunks_exact(4).zip(dst.iter_mut()) {
            *value = pixel[0] as f32 / 255.0;
        }
    }

    Ok(images)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, GrayImage, ImageFormat, Luma};

    use super::*;
    use crate::MemorySource;

    fn encode_sprite(width: u32, height: u32) -> Vec<u8> {
        let sprite = GrayImage::from_fn(width, height, |x, y| Luma([((x + y * width) % 256) as u8]));
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(sprite)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn chunk(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn sprite_pixels_are_normalized_row_major() {
        let bytes = encode_sprite(4, 3);
        let images = decode_sprite(&bytes, 3, 4, chunk(1)).unwrap();

        assert_eq!(images.len(), 12);
        for (i, &v) in images.iter().enumerate() {
            assert_eq!(v, i as f32 / 255.0);
        }
    }

    #[test]
    fn uneven_last_chunk_is_decoded_like_the_rest() {
        let bytes = encode_sprite(4, 5);
        let whole = decode_sprite(&bytes, 5, 4, chunk(5)).unwrap();
        let chunked = decode_sprite(&bytes, 5, 4, chunk(2)).unwrap();

        assert_eq!(whole, chunked);
    }

    #[test]
    fn only_the_requested_rows_are_decoded() {
        let bytes = encode_sprite(4, 6);
        let images = decode_sprite(&bytes, 2, 4, chunk(5)).unwrap();
        assert_eq!(images.len(), 8);
    }

    #[test]
    fn wrong_geometry_is_rejected() {
        let bytes = encode_sprite(4, 2);

        let err = decode_sprite(&bytes, 3, 4, chunk(1)).unwrap_err();
        assert!(matches!(err, DatasetErr::SpriteGeometry { height: 2, .. }));

        let err = decode_sprite(&bytes, 2, 5, chunk(1)).unwrap_err();
        assert!(matches!(err, DatasetErr::SpriteGeometry { width: 4, .. }));
    }

    #[test]
    fn garbage_sprite_fails_to_decode() {
        let err = decode_sprite(&[1, 2, 3], 1, 1, chunk(1)).unwrap_err();
        assert!(matches!(err, DatasetErr::Decode(_)));
    }

    fn config() -> DecoderConfig {
        DecoderConfig {
            sprite_path: "sprite.png".into(),
            labels_path: "labels".into(),
            total_examples: 2,
            image_size: 4,
            num_classes: 2,
            chunk_rows: chunk(5000),
        }
    }

    #[tokio::test]
    async fn missing_asset_is_a_fetch_error() {
        let mut source = MemorySource::new();
        source.insert("sprite.png", encode_sprite(4, 2));

        let err = decode(&source, &config()).await.unwrap_err();
        assert!(matches!(err, DatasetErr::AssetFetch { ref path, .. } if path == "labels"));
    }

    #[tokio::test]
    async fn label_bytes_must_match_the_examples() {
        let mut source = MemorySource::new();
        source
            .insert("sprite.png", encode_sprite(4, 2))
            .insert("labels", vec![1, 0, 0]);

        let err = decode(&source, &config()).await.unwrap_err();
        assert!(matches!(
            err,
            DatasetErr::SizeMismatch {
                what: "label bytes",
                got: 3,
                expected: 4
            }
        ));
    }

    #[tokio::test]
    async fn decoding_twice_is_bit_identical() {
        let mut source = MemorySource::new();
        source
            .insert("sprite.png", encode_sprite(4, 2))
            .insert("labels", vec![1, 0, 0, 1]);

        let a = decode(&source, &config()).await.unwrap();
        let b = decode(&source, &config()).await.unwrap();

        assert_eq!(a.len(), 2);
        assert_eq!(a.labels(), &[1, 0, 0, 1]);
        let bits = |ds: &DecodedDataset| ds.images().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }
}

pub mod batch;
pub mod dataset;
pub mod decoder;
pub mod error;
pub mod partition;
pub mod source;

pub use batch::{BATCH_INDEX_OFFSET, Batch};
pub use dataset::DecodedDataset;
pub use decoder::{DEFAULT_CHUNK_ROWS, DecoderConfig, decode, decode_sprite};
pub use error::{DatasetErr, Result};
pub use partition::{Partition, PartitionedDataset, shuffled_indices, split_counts};
pub use source::{AssetSource, FsSource, MemorySource};

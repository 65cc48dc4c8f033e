use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
};

/// Retrieves raw asset bytes (the image sprite and the label file) by path.
#[allow(unused)]
#[trait_variant::make(AssetSource: Send)]
pub trait AssetSourceTemplate: Sync {
    /// Should fetch the whole asset at `path`.
    ///
    /// # Arguments
    /// * `path` - The asset path, relative to the source.
    ///
    /// # Returns
    /// The asset bytes or an io error if it's unreachable.
    async fn fetch(&self, path: &str) -> io::Result<Vec<u8>>;
}

/// Reads assets from the local filesystem, relative to a root directory.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    /// Creates a new `FsSource`.
    ///
    /// # Arguments
    /// * `root` - The directory the asset paths are relative to.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl AssetSource for FsSource {
    async fn fetch(&self, path: &str) -> io::Result<Vec<u8>> {
        let full = self.root.join(path);
        log::debug!("reading asset {}", full.display());
        tokio::fs::read(full).await
    }
}

/// Serves assets that already live in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    assets: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an asset, replacing any previous one under the same path.
    pub fn insert<S: Into<String>>(&mut self, path: S, bytes: Vec<u8>) -> &mut Self {
        self.assets.insert(path.into(), bytes);
        self
    }
}

impl AssetSource for MemorySource {
    async fn fetch(&self, path: &str) -> io::Result<Vec<u8>> {
        self.assets.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no asset at '{path}'"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AssetSource, FsSource, MemorySource, io};

    #[tokio::test]
    async fn memory_source_serves_registered_assets() {
        let mut source = MemorySource::new();
        source.insert("labels", vec![1, 2, 3]);

        assert_eq!(source.fetch("labels").await.unwrap(), [1, 2, 3]);

        let err = source.fetch("missing").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn fs_source_reports_missing_files() {
        let source = FsSource::new(std::env::temp_dir());
        let err = source.fetch("definitely-not-here.bin").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}

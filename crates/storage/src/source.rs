use std::io::SeekFrom;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::LocalStore;
use crate::error::Result;

/// An open source file that is read one chunk at a time.
#[derive(Debug)]
pub struct SourceFile {
    path: PathBuf,
    file: File,
    size: u64,
}
impl SourceFile {
    pub(crate) fn new(path: PathBuf, file: File, size: u64) -> Self {
        Self { path, file, size }
    }

    /// Size at the time the file was opened.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Reads up to `len` bytes starting at `offset`. Fewer bytes come back
    /// only when the end of the file is reached.
    pub async fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.file
            .seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| LocalStore::map_io_error(e, &self.path))?;
        let mut buffer = Vec::with_capacity(len);
        (&mut self.file)
            .take(len as u64)
            .read_to_end(&mut buffer)
            .await
            .map_err(|e| LocalStore::map_io_error(e, &self.path))?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use crate::LocalStore;

    #[tokio::test]
    async fn test_read_at() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"0123456789").unwrap();
        let store = LocalStore::new(dir.path()).unwrap();
        let mut source = store.open("a.mp4").await.unwrap();
        assert_eq!(source.size(), 10);
        assert_eq!(source.read_at(0, 4).await.unwrap(), b"0123");
        assert_eq!(source.read_at(8, 4).await.unwrap(), b"89");
        // Rewinding is allowed, for resends from an earlier offset.
        assert_eq!(source.read_at(2, 3).await.unwrap(), b"234");
        assert!(source.read_at(10, 4).await.unwrap().is_empty());
    }
}

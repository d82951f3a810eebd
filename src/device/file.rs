//! File-backed block device.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;

use crate::cache::BlockData;
use crate::common::config::BLOCK_SIZE;
use crate::common::{BlockId, Error, Result};

/// A fixed-capacity disk image stored in a single file.
///
/// # File Layout
/// Blocks are laid out sequentially; block N lives at offset
/// `N * BLOCK_SIZE`:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┐
/// │ Block 0 │ Block 1 │  ...    │ Block N │
/// │ (1KB)   │ (1KB)   │         │ (1KB)   │
/// └─────────┴─────────┴─────────┴─────────┘
/// ```
///
/// The capacity is fixed when the image is created; reads and writes
/// beyond it fail with `Error::BlockOutOfRange`. One `FileDevice` serves
/// one device number; requests carrying a different device number are
/// rejected the same way.
///
/// # Thread Safety
/// The file handle sits behind a `Mutex`, so the device is `&self` and
/// the cache may issue I/O for different slots concurrently.
///
/// # Durability
/// Every write is followed by `fsync()`. Conservative, and fine for a
/// cache whose write-through contract is "on return, it is on disk".
pub struct FileDevice {
    file: Mutex<File>,
    /// Device number this image serves.
    device: u32,
    /// Number of blocks in the image.
    block_count: u32,
}

impl FileDevice {
    /// Create a new disk image with `block_count` zeroed blocks.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, device: u32, block_count: u32) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        file.set_len(block_count as u64 * BLOCK_SIZE as u64)?;
        file.sync_all()?;

        Ok(Self {
            file: Mutex::new(file),
            device,
            block_count,
        })
    }

    /// Open an existing disk image; capacity comes from the file size.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P, device: u32) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let file_size = file.metadata()?.len();
        let block_count = (file_size / BLOCK_SIZE as u64) as u32;

        Ok(Self {
            file: Mutex::new(file),
            device,
            block_count,
        })
    }

    /// Open an existing image, or create one if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(
        path: P,
        device: u32,
        block_count: u32,
    ) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path, device)
        } else {
            Self::create(path, device, block_count)
        }
    }

    /// Number of blocks in the image.
    #[inline]
    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    /// Device number this image serves.
    #[inline]
    pub fn device(&self) -> u32 {
        self.device
    }

    fn check(&self, id: BlockId) -> Result<u64> {
        if id.device != self.device || id.block >= self.block_count {
            return Err(Error::BlockOutOfRange(id));
        }
        Ok(id.block as u64 * BLOCK_SIZE as u64)
    }
}

impl super::BlockDevice for FileDevice {
    fn read_block(&self, id: BlockId, buf: &mut BlockData) -> Result<()> {
        let offset = self.check(id)?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf.as_mut_slice())?;

        Ok(())
    }

    fn write_block(&self, id: BlockId, buf: &BlockData) -> Result<()> {
        let offset = self.check(id)?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf.as_slice())?;
        file.sync_all()?; // fsync for durability

        Ok(())
    }
}

use byteorder::{BigEndian, ByteOrder};
use std::fmt;

/// Size of the page header: a single big-endian `used` pointer.
pub const HEADER_SIZE: usize = 4;

/// Offset of the `used` pointer inside the page header.
const USED_OFFSET: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageId(pub u32);

impl PageId {
    /// Byte offset of this page inside a file of `page_size` pages.
    pub fn offset(self, page_size: usize) -> u64 {
        self.0 as u64 * page_size as u64
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An in-memory copy of one fixed-size page of a table file.
///
/// The dirty flag is transient and never persisted: it is set whenever the
/// buffer is handed out mutably and cleared once the buffer reaches the file.
#[derive(Debug)]
pub struct Page {
    id: PageId,
    data: Box<[u8]>,
    dirty: bool,
}

impl Page {
    /// Create a zero-filled page.
    pub fn new(id: PageId, page_size: usize) -> Self {
        Self {
            id,
            data: vec![0u8; page_size].into_boxed_slice(),
            dirty: false,
        }
    }

    pub(crate) fn from_data(id: PageId, data: Box<[u8]>) -> Self {
        Self {
            id,
            data,
            dirty: false,
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.dirty = true;
        &mut self.data
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Offset just past the last record, or `None` for a page whose header
    /// was never written. Zero is never a valid offset since records start
    /// after the header.
    pub fn used(&self) -> Option<usize> {
        match read_used(&self.data) {
            0 => None,
            used => Some(used),
        }
    }

    /// Write the header of an uninitialized page so that it reports an
    /// empty record area. Initialized pages are left untouched.
    pub fn init_header(&mut self) {
        if self.used().is_none() {
            self.set_used(HEADER_SIZE);
        }
    }

    pub fn set_used(&mut self, used: usize) {
        BigEndian::write_u32(
            &mut self.data_mut()[USED_OFFSET..USED_OFFSET + HEADER_SIZE],
            used as u32,
        );
    }

    /// Bytes left between `used` and the end of the page.
    pub fn free_space(&self) -> usize {
        let used = self.used().unwrap_or(HEADER_SIZE).max(HEADER_SIZE);
        self.data.len().saturating_sub(used)
    }
}

fn read_used(data: &[u8]) -> usize {
    BigEndian::read_u32(&data[USED_OFFSET..USED_OFFSET + HEADER_SIZE]) as usize
}

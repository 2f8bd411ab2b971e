//! Mapped file - Exclusive ownership of one memory mapping
//!
//! A [`MappedFile`] is created unmapped, maps (part of) a file through a
//! [`FileHandle`], and unmaps on drop. Once mapped, the region no longer
//! depends on the handle: the caller may close it right away.

use std::fmt;
use std::mem;
use std::os::unix::io::AsRawFd;
use std::ptr;
use std::slice;

use libc::{c_void, off_t};
use log::error;

use kestrel_sys::{Native, StatusCode, SystemCalls, MAP_FAILED};

use crate::flags::{MapFlags, ProtFlags};
use crate::handle::FileHandle;

/// Owner of one memory mapping
///
/// # Example
/// ```no_run
/// use kestrel_file::{FileHandle, MappedFile, OpenFlags, StatusCode};
///
/// let mut file = FileHandle::new();
/// assert_eq!(file.open("/etc/hostname", OpenFlags::RDONLY, 0), StatusCode::OK);
///
/// let mut mapping = MappedFile::new();
/// assert_eq!(mapping.map(&file), StatusCode::OK);
/// drop(file);
///
/// println!("{}", String::from_utf8_lossy(mapping.as_slice()));
/// ```
pub struct MappedFile<S: SystemCalls = Native> {
    data: *mut c_void,
    size: usize,
    prot: ProtFlags,
    sys: S,
}

// SAFETY: the region is owned exclusively and only reachable through `&self`
// or `&mut self`; shared access hands out `&[u8]` only.
unsafe impl<S: SystemCalls + Send> Send for MappedFile<S> {}
// SAFETY: see above
unsafe impl<S: SystemCalls + Sync> Sync for MappedFile<S> {}

impl MappedFile<Native> {
    /// Create an unmapped instance on the native backend
    pub const fn new() -> Self {
        Self::with_system(Native)
    }
}

impl Default for MappedFile<Native> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SystemCalls> MappedFile<S> {
    /// Create an unmapped instance that calls through `sys`
    pub const fn with_system(sys: S) -> Self {
        Self {
            data: ptr::null_mut(),
            size: 0,
            prot: ProtFlags::NONE,
            sys,
        }
    }

    /// Map the whole file read-only and private
    pub fn map<F: SystemCalls>(&mut self, file: &FileHandle<F>) -> StatusCode {
        self.map_with(file, ProtFlags::default(), MapFlags::default())
    }

    /// Map the whole file with the chosen protection and mapping flags
    ///
    /// The size comes from `fstat` on `file`; a failed `fstat` is returned
    /// unchanged and nothing is mapped. A file too large for the address
    /// space fails with `EOVERFLOW`.
    ///
    /// See [`as_slice`](MappedFile::as_slice) before mapping with
    /// [`MapFlags::SHARED`].
    pub fn map_with<F: SystemCalls>(
        &mut self,
        file: &FileHandle<F>,
        prot: ProtFlags,
        flags: MapFlags,
    ) -> StatusCode {
        let (st, status) = file.metadata();
        if status.is_err() {
            return status;
        }
        match mapping_length(st.st_size) {
            Ok(length) => self.map_range(file, 0, length, prot, flags),
            Err(status) => {
                error!("Failed to map file: size={} : {}", st.st_size, status);
                status
            }
        }
    }

    /// Map `length` bytes of the file starting at `offset`
    ///
    /// The caller keeps `offset` inside the file and `length` non-zero and
    /// within the file; the kernel rejects what it rejects.
    ///
    /// See [`as_slice`](MappedFile::as_slice) before mapping with
    /// [`MapFlags::SHARED`].
    ///
    /// # Returns
    /// `StatusCode::OK` once the new region is installed; any previous
    /// region is then unmapped with failures logged and otherwise ignored
    /// (call [`unmap`](MappedFile::unmap) first to observe them). On failure
    /// the translated status, with the previous region left intact.
    pub fn map_range<F: SystemCalls>(
        &mut self,
        file: &FileHandle<F>,
        offset: off_t,
        length: usize,
        prot: ProtFlags,
        flags: MapFlags,
    ) -> StatusCode {
        // SAFETY: a null address hint lets the kernel pick fresh pages, so no
        // existing memory is replaced
        let data = unsafe {
            self.sys.mmap(
                ptr::null_mut(),
                length,
                prot.bits(),
                flags.bits(),
                file.as_raw_fd(),
                offset,
            )
        };
        if data == MAP_FAILED {
            let status = self.sys.errno_to_status();
            error!(
                "Failed to map file: offset={}, length={}, prot={:#x}, flags={:#x} : {}",
                offset,
                length,
                prot.bits(),
                flags.bits(),
                status
            );
            return status;
        }

        let _ = self.unmap();
        self.data = data;
        self.size = length;
        self.prot = prot;
        StatusCode::OK
    }

    /// Release the mapping
    ///
    /// Unmapping an unmapped instance succeeds without calling the primitive.
    /// The instance always ends unmapped, even when the primitive fails.
    pub fn unmap(&mut self) -> StatusCode {
        if !self.is_open() {
            return StatusCode::OK;
        }

        let data = mem::replace(&mut self.data, ptr::null_mut());
        let size = mem::take(&mut self.size);
        self.prot = ProtFlags::NONE;

        // SAFETY: `data` and `size` describe a region this instance mapped,
        // and every borrow of it has ended since `unmap` takes `&mut self`
        if unsafe { self.sys.munmap(data, size) } != 0 {
            let status = self.sys.errno_to_status();
            error!("Failed to unmap file: size={} : {}", size, status);
            return status;
        }
        StatusCode::OK
    }

    pub fn is_open(&self) -> bool {
        !self.data.is_null()
    }

    /// Length of the mapped region, `0` when unmapped
    pub fn size(&self) -> usize {
        self.size
    }

    /// Protection the region was mapped with
    pub fn prot(&self) -> ProtFlags {
        self.prot
    }

    /// Base address, null when unmapped
    pub fn as_ptr(&self) -> *const u8 {
        self.data.cast()
    }

    /// The mapped bytes
    ///
    /// Empty when unmapped or mapped without [`ProtFlags::READ`].
    ///
    /// # Aliasing
    /// The bytes follow the file, not this borrow. Anything that writes the
    /// mapped range while the slice is alive (`pwrite` through any handle
    /// on the file, another `SHARED` mapping, another process) changes
    /// memory behind a `&[u8]`, which is undefined behaviour. With
    /// [`MapFlags::SHARED`] the caller must not write the file until the
    /// slice is dropped; re-borrow afterwards to observe the new contents.
    /// Truncating the file underneath a mapping faults on access.
    pub fn as_slice(&self) -> &[u8] {
        if !self.is_open() || !self.prot.contains(ProtFlags::READ) {
            return &[];
        }
        // SAFETY: `data` points to `size` readable bytes mapped by this
        // instance; writers stay out per the aliasing contract above
        unsafe { slice::from_raw_parts(self.data.cast(), self.size) }
    }

    /// The mapped bytes, writable
    ///
    /// Empty when unmapped.
    ///
    /// # Safety
    /// The region must have been mapped with [`ProtFlags::WRITE`] (and
    /// `READ`), and no other mapping of the same file may be accessed while
    /// the returned slice is alive.
    pub unsafe fn as_mut_slice(&mut self) -> &mut [u8] {
        if !self.is_open() {
            return &mut [];
        }
        // SAFETY: upheld by the caller
        unsafe { slice::from_raw_parts_mut(self.data.cast(), self.size) }
    }

    /// The system call provider this mapping calls through
    pub fn system(&self) -> &S {
        &self.sys
    }

    /// Move the mapping out, leaving this instance unmapped
    pub fn take(&mut self) -> Self
    where
        S: Clone,
    {
        Self {
            data: mem::replace(&mut self.data, ptr::null_mut()),
            size: mem::take(&mut self.size),
            prot: mem::replace(&mut self.prot, ProtFlags::NONE),
            sys: self.sys.clone(),
        }
    }
}

fn mapping_length(st_size: off_t) -> Result<usize, StatusCode> {
    usize::try_from(st_size).map_err(|_| StatusCode::EOVERFLOW)
}

impl<S: SystemCalls> Drop for MappedFile<S> {
    fn drop(&mut self) {
        let _ = self.unmap();
    }
}

impl<S: SystemCalls> fmt::Debug for MappedFile<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedFile")
            .field("data", &self.data)
            .field("size", &self.size)
            .field("prot", &self.prot)
            .finish_non_exhaustive()
    }
}

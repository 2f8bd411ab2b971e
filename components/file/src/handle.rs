//! File handle - Exclusive ownership of one OS file descriptor
//!
//! A [`FileHandle`] owns at most one descriptor. Ownership moves, never
//! copies: Rust moves transfer it, [`FileHandle::take`] moves it out and
//! leaves the source empty, and dropping a handle closes what it owns.
//!
//! Every operation is one primitive call through the handle's
//! [`SystemCalls`] provider; failures come back as a [`StatusCode`], alone or
//! paired with the primitive's native result.

use std::ffi::CString;
use std::io::{IoSlice, IoSliceMut};
use std::mem;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};
use std::path::Path;

use libc::{mode_t, off_t};
use log::{error, trace};
use static_assertions::{assert_eq_size, assert_not_impl_any};

use kestrel_sys::{config, Native, StatusCode, SystemCalls, FAILED};

use crate::flags::{OpenFlags, Whence};

/// Descriptor value held by an empty handle
const NO_DESCRIPTOR: RawFd = -1;

/// Owner of one OS file descriptor
///
/// # Type Parameters
/// * `S` - System call provider, [`Native`] unless a test injects a mock
///
/// # Example
/// ```no_run
/// use kestrel_file::{FileHandle, OpenFlags, StatusCode, Whence};
///
/// let mut file = FileHandle::new();
/// let status = file.open("/tmp/greeting", OpenFlags::CREAT | OpenFlags::RDWR, 0o644);
/// assert_eq!(status, StatusCode::OK);
///
/// let (written, status) = file.write(b"Hello, World!");
/// assert!(status.is_ok() && written == 13);
///
/// let (offset, _) = file.seek(0, Whence::Start);
/// assert_eq!(offset, 0);
/// ```
#[derive(Debug)]
pub struct FileHandle<S: SystemCalls = Native> {
    fd: RawFd,
    sys: S,
}

// Owning a descriptor costs exactly the descriptor
assert_eq_size!(FileHandle, RawFd);
assert_not_impl_any!(FileHandle: Clone, Copy);

impl FileHandle<Native> {
    /// Create an empty handle on the native backend
    ///
    /// Call [`open`](FileHandle::open) to open a file.
    pub const fn new() -> Self {
        Self::with_system(Native)
    }
}

impl Default for FileHandle<Native> {
    fn default() -> Self {
        Self::new()
    }
}

impl FromRawFd for FileHandle<Native> {
    /// Adopt `fd`; the handle closes it on drop
    unsafe fn from_raw_fd(fd: RawFd) -> Self {
        Self {
            fd,
            sys: Native,
        }
    }
}

impl<S: SystemCalls> FileHandle<S> {
    /// Create an empty handle that calls through `sys`
    pub const fn with_system(sys: S) -> Self {
        Self {
            fd: NO_DESCRIPTOR,
            sys,
        }
    }

    /// Open a file
    ///
    /// # Arguments
    /// * `path` - Path of the file to open
    /// * `flags` - `open(2)` flags
    /// * `mode` - Permission bits used if the file is created
    ///
    /// # Returns
    /// `StatusCode::OK` on success, otherwise:
    /// - `ALREADY_OPEN` if this handle already owns a descriptor (it is kept)
    /// - `INVALID_ARGUMENT` if `path` contains a NUL byte
    /// - the translated `errno` if the primitive fails; the handle stays empty
    pub fn open(&mut self, path: impl AsRef<Path>, flags: OpenFlags, mode: mode_t) -> StatusCode {
        let path = path.as_ref();
        trace!(
            "Opening file: path={}, flags={:#x}, mode={:#o}",
            path.display(),
            flags.bits(),
            mode
        );

        if self.is_open() {
            error!(
                "Failed to open file: path={} : {}",
                path.display(),
                StatusCode::ALREADY_OPEN
            );
            return StatusCode::ALREADY_OPEN;
        }

        let c_path = match CString::new(path.as_os_str().as_bytes()) {
            Ok(c_path) => c_path,
            Err(_) => {
                error!(
                    "Failed to open file: path={} : {}",
                    path.display(),
                    StatusCode::INVALID_ARGUMENT
                );
                return StatusCode::INVALID_ARGUMENT;
            }
        };

        let fd = self.sys.open(&c_path, flags.bits(), mode);
        if fd == FAILED {
            let status = self.sys.errno_to_status();
            error!(
                "Failed to open file: path={}, flags={:#x}, mode={:#o} : {}",
                path.display(),
                flags.bits(),
                mode,
                status
            );
            return status;
        }

        self.fd = fd;
        StatusCode::OK
    }

    /// Open a file read-only, creating it (if asked to) with the default mode
    pub fn open_default(&mut self, path: impl AsRef<Path>) -> StatusCode {
        self.open(path, OpenFlags::default(), config::DEFAULT_OPEN_MODE)
    }

    /// Close whatever this handle owns, then open `path`
    ///
    /// If closing fails, that status is returned and nothing is opened; the
    /// handle is empty either way.
    pub fn reopen(&mut self, path: impl AsRef<Path>, flags: OpenFlags, mode: mode_t) -> StatusCode {
        let status = self.close();
        if status.is_err() {
            return status;
        }
        self.open(path, flags, mode)
    }

    /// Close the file
    ///
    /// Closing an empty handle succeeds without calling the primitive. The
    /// handle always ends empty, even when the primitive fails.
    pub fn close(&mut self) -> StatusCode {
        if !self.is_open() {
            return StatusCode::OK;
        }

        let fd = mem::replace(&mut self.fd, NO_DESCRIPTOR);
        if self.sys.close(fd) != 0 {
            let status = self.sys.errno_to_status();
            error!("Failed to close file : {}", status);
            return status;
        }
        StatusCode::OK
    }

    pub fn is_open(&self) -> bool {
        self.fd != NO_DESCRIPTOR
    }

    /// The owned descriptor, if any
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.is_open().then_some(self.fd)
    }

    /// The system call provider this handle calls through
    pub fn system(&self) -> &S {
        &self.sys
    }

    /// Release ownership without closing
    pub fn into_raw_fd(mut self) -> Option<RawFd> {
        let fd = mem::replace(&mut self.fd, NO_DESCRIPTOR);
        (fd != NO_DESCRIPTOR).then_some(fd)
    }

    /// Move the descriptor out, leaving this handle empty
    pub fn take(&mut self) -> Self
    where
        S: Clone,
    {
        Self {
            fd: mem::replace(&mut self.fd, NO_DESCRIPTOR),
            sys: self.sys.clone(),
        }
    }

    /// Query file metadata into `buf`
    ///
    /// Fails with `EBADF` when the handle is empty.
    pub fn stat(&self, buf: &mut libc::stat) -> StatusCode {
        let rc = self.sys.fstat(self.fd, buf);
        self.check(rc, "fstat").1
    }

    /// Query file metadata
    pub fn metadata(&self) -> (libc::stat, StatusCode) {
        // SAFETY: `stat` is plain integer fields, all-zero is a valid value
        let mut st: libc::stat = unsafe { mem::zeroed() };
        let status = self.stat(&mut st);
        (st, status)
    }

    /// Read into `buf` from the current offset
    ///
    /// # Returns
    /// Bytes read and the status. A short read (including `0` at end of
    /// file) is not an error; on failure the count is the native `-1`.
    pub fn read(&self, buf: &mut [u8]) -> (isize, StatusCode) {
        let rc = self.sys.read(self.fd, buf);
        self.check(rc, "read")
    }

    /// Read into `buf` from `offset` without moving the file offset
    pub fn pread(&self, buf: &mut [u8], offset: off_t) -> (isize, StatusCode) {
        let rc = self.sys.pread(self.fd, buf, offset);
        self.check(rc, "pread")
    }

    /// Scatter-read into `iov` from the current offset
    pub fn readv(&self, iov: &mut [IoSliceMut<'_>]) -> (isize, StatusCode) {
        let rc = self.sys.readv(self.fd, iov);
        self.check(rc, "readv")
    }

    /// Scatter-read into `iov` from `offset` without moving the file offset
    pub fn preadv(&self, iov: &mut [IoSliceMut<'_>], offset: off_t) -> (isize, StatusCode) {
        let rc = self.sys.preadv(self.fd, iov, offset);
        self.check(rc, "preadv")
    }

    /// Write `buf` at the current offset
    ///
    /// A short write is not an error; on failure the count is the native `-1`.
    pub fn write(&self, buf: &[u8]) -> (isize, StatusCode) {
        let rc = self.sys.write(self.fd, buf);
        self.check(rc, "write")
    }

    /// Write `buf` at `offset` without moving the file offset
    pub fn pwrite(&self, buf: &[u8], offset: off_t) -> (isize, StatusCode) {
        let rc = self.sys.pwrite(self.fd, buf, offset);
        self.check(rc, "pwrite")
    }

    /// Gather-write `iov` at the current offset
    pub fn writev(&self, iov: &[IoSlice<'_>]) -> (isize, StatusCode) {
        let rc = self.sys.writev(self.fd, iov);
        self.check(rc, "writev")
    }

    /// Gather-write `iov` at `offset` without moving the file offset
    pub fn pwritev(&self, iov: &[IoSlice<'_>], offset: off_t) -> (isize, StatusCode) {
        let rc = self.sys.pwritev(self.fd, iov, offset);
        self.check(rc, "pwritev")
    }

    /// Move the file offset
    ///
    /// # Returns
    /// The resulting offset from the start of the file, or `-1` on failure
    pub fn seek(&self, offset: off_t, whence: Whence) -> (off_t, StatusCode) {
        let rc = self.sys.lseek(self.fd, offset, whence.as_raw());
        self.check(rc, "lseek")
    }

    /// Duplicate the descriptor
    ///
    /// The new handle is an independent owner of the same open file; closing
    /// one does not affect the other. On failure the returned handle is empty.
    pub fn dup(&self) -> (FileHandle<S>, StatusCode)
    where
        S: Clone,
    {
        let fd = self.sys.dup(self.fd);
        if fd == FAILED {
            let status = self.sys.errno_to_status();
            error!("Failed to duplicate file : {}", status);
            return (Self::with_system(self.sys.clone()), status);
        }

        let file = Self {
            fd,
            sys: self.sys.clone(),
        };
        (file, StatusCode::OK)
    }

    /// Flush written data to stable storage
    pub fn flush(&self) -> StatusCode {
        let rc = self.sys.fsync(self.fd);
        self.check(rc, "fsync").1
    }

    fn check<T>(&self, rc: T, primitive: &str) -> (T, StatusCode)
    where
        T: Copy + PartialEq + From<i8>,
    {
        if rc == T::from(-1) {
            let status = self.sys.errno_to_status();
            error!("File {} failed : {}", primitive, status);
            return (rc, status);
        }
        (rc, StatusCode::OK)
    }
}

impl<S: SystemCalls> AsRawFd for FileHandle<S> {
    /// The owned descriptor, or `-1` for an empty handle
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl<S: SystemCalls> Drop for FileHandle<S> {
    fn drop(&mut self) {
        // Failures are logged by close() and otherwise unobservable
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_sys::mock::MockSystemCalls;
    use tempfile::TempDir;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn rw_create() -> OpenFlags {
        OpenFlags::CREAT | OpenFlags::RDWR
    }

    fn scratch() -> (TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_file.txt");
        (dir, path)
    }

    #[test]
    fn test_open_close() {
        init_logging();
        let (_dir, path) = scratch();

        let mut file = FileHandle::new();
        assert!(!file.is_open());

        assert_eq!(file.open(&path, rw_create(), 0o644), StatusCode::OK);
        assert!(file.is_open());
        assert!(path.exists());

        assert_eq!(file.close(), StatusCode::OK);
        assert!(!file.is_open());
    }

    #[test]
    fn test_open_missing_file() {
        let (_dir, path) = scratch();
        let mut file = FileHandle::new();

        assert_eq!(file.open_default(&path), StatusCode::ENOENT);
        assert!(!file.is_open());
        assert_eq!(file.raw_fd(), None);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut file = FileHandle::new();
        assert_eq!(file.close(), StatusCode::OK);
        assert_eq!(file.close(), StatusCode::OK);
        assert!(!file.is_open());
    }

    #[test]
    fn test_close_empty_handle_skips_primitive() {
        let sys = MockSystemCalls::new();
        let mut file = FileHandle::with_system(&sys);
        assert_eq!(file.close(), StatusCode::OK);
        assert_eq!(sys.close.call_count(), 0);
    }

    #[test]
    fn test_open_twice_is_rejected() {
        let (_dir, path) = scratch();
        let sys = MockSystemCalls::new();
        let mut file = FileHandle::with_system(&sys);

        assert_eq!(file.open(&path, rw_create(), 0o644), StatusCode::OK);
        let fd = file.raw_fd();
        assert_eq!(file.open(&path, rw_create(), 0o644), StatusCode::ALREADY_OPEN);
        assert_eq!(file.raw_fd(), fd);
        assert_eq!(sys.open.call_count(), 1);
    }

    #[test]
    fn test_reopen_switches_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        let sys = MockSystemCalls::new();
        let mut file = FileHandle::with_system(&sys);

        assert_eq!(file.open(&first, rw_create(), 0o644), StatusCode::OK);
        assert_eq!(file.reopen(&second, rw_create(), 0o644), StatusCode::OK);
        assert!(file.is_open());
        assert!(second.exists());
        assert_eq!(sys.close.call_count(), 1);
        assert_eq!(sys.open.call_count(), 2);
    }

    #[test]
    fn test_reopen_stops_on_close_failure() {
        let (_dir, path) = scratch();
        let sys = MockSystemCalls::new();
        let mut file = FileHandle::with_system(&sys);
        assert_eq!(file.open(&path, rw_create(), 0o644), StatusCode::OK);
        let fd = file.raw_fd().unwrap();

        sys.close.mock_return_value_once(FAILED);
        sys.fail_with(StatusCode::EIO, 1);
        assert_eq!(file.reopen(&path, rw_create(), 0o644), StatusCode::EIO);
        assert!(!file.is_open());
        assert_eq!(sys.open.call_count(), 1);

        // The forced failure never reached the kernel
        assert_eq!(Native.close(fd), 0);
    }

    #[test]
    fn test_interior_nul_path() {
        let sys = MockSystemCalls::new();
        let mut file = FileHandle::with_system(&sys);

        assert_eq!(
            file.open("bad\0path", OpenFlags::RDONLY, 0),
            StatusCode::INVALID_ARGUMENT
        );
        assert!(!file.is_open());
        assert_eq!(sys.open.call_count(), 0);
    }

    #[test]
    fn test_forced_open_failure() {
        let (_dir, path) = scratch();
        let sys = MockSystemCalls::new();
        let mut file = FileHandle::with_system(&sys);

        sys.open.mock_return_value(FAILED, 2);
        sys.fail_with(StatusCode::EACCES, 2);
        for _ in 0..2 {
            assert_eq!(file.open(&path, rw_create(), 0o644), StatusCode::EACCES);
            assert!(!file.is_open());
        }

        assert_eq!(file.open(&path, rw_create(), 0o644), StatusCode::OK);
        assert!(file.is_open());
        assert_eq!(sys.open.call_count(), 3);
        assert_eq!(sys.errno_to_status.call_count(), 2);
    }

    #[test]
    fn test_close_failure_still_closes() {
        let (_dir, path) = scratch();
        let sys = MockSystemCalls::new();
        let mut file = FileHandle::with_system(&sys);
        assert_eq!(file.open(&path, rw_create(), 0o644), StatusCode::OK);
        let fd = file.raw_fd().unwrap();

        sys.close.mock_return_value_once(FAILED);
        sys.fail_with(StatusCode::EINTR, 1);
        assert_eq!(file.close(), StatusCode::EINTR);
        assert!(!file.is_open());
        assert_eq!(file.close(), StatusCode::OK);
        assert_eq!(sys.close.call_count(), 1);

        assert_eq!(Native.close(fd), 0);
    }

    #[test]
    fn test_drop_swallows_close_failure() {
        let (_dir, path) = scratch();
        let sys = MockSystemCalls::new();
        let fd;
        {
            let mut file = FileHandle::with_system(&sys);
            assert_eq!(file.open(&path, rw_create(), 0o644), StatusCode::OK);
            fd = file.raw_fd().unwrap();
            sys.close.mock_return_value_once(FAILED);
            sys.fail_with(StatusCode::EIO, 1);
        }
        assert_eq!(sys.close.call_count(), 1);
        assert_eq!(Native.close(fd), 0);
    }

    #[test]
    fn test_stat_on_empty_handle() {
        let file = FileHandle::new();
        let (_, status) = file.metadata();
        assert_eq!(status, StatusCode::EBADF);
    }

    #[test]
    fn test_stat_reports_size() {
        let (_dir, path) = scratch();
        let mut file = FileHandle::new();
        assert_eq!(file.open(&path, rw_create(), 0o644), StatusCode::OK);
        assert_eq!(file.write(b"Hello, World!"), (13, StatusCode::OK));

        let (st, status) = file.metadata();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(st.st_size, 13);
    }

    #[test]
    fn test_read_write_round_trip() {
        let (_dir, path) = scratch();
        let mut file = FileHandle::new();
        assert_eq!(file.open(&path, rw_create(), 0o644), StatusCode::OK);

        let data = b"Hello, World!";
        assert_eq!(file.write(data), (13, StatusCode::OK));
        assert_eq!(file.flush(), StatusCode::OK);
        assert_eq!(file.seek(0, Whence::Start), (0, StatusCode::OK));

        let mut buf = [0u8; 13];
        assert_eq!(file.read(&mut buf), (13, StatusCode::OK));
        assert_eq!(&buf, data);

        // At end of file a read is short, not failed
        assert_eq!(file.read(&mut buf), (0, StatusCode::OK));
    }

    #[test]
    fn test_positional_io() {
        let (_dir, path) = scratch();
        let mut file = FileHandle::new();
        assert_eq!(file.open(&path, rw_create(), 0o644), StatusCode::OK);

        assert_eq!(file.pwrite(b"Hello, World!", 0), (13, StatusCode::OK));
        assert_eq!(file.pwrite(b"LL", 2), (2, StatusCode::OK));

        let mut buf = [0u8; 8];
        assert_eq!(file.pread(&mut buf, 2), (8, StatusCode::OK));
        assert_eq!(&buf, b"LLo, Wor");

        // Positional calls leave the file offset alone
        assert_eq!(file.seek(0, Whence::Current), (0, StatusCode::OK));
    }

    #[test]
    fn test_vectored_io() {
        let (_dir, path) = scratch();
        let mut file = FileHandle::new();
        assert_eq!(file.open(&path, rw_create(), 0o644), StatusCode::OK);

        let (written, status) = file.writev(&[IoSlice::new(b"Hello, "), IoSlice::new(b"World!")]);
        assert_eq!((written, status), (13, StatusCode::OK));
        assert_eq!(file.pwritev(&[IoSlice::new(b"J"), IoSlice::new(b"ELLO")], 0), (5, StatusCode::OK));

        let mut head = [0u8; 7];
        let mut tail = [0u8; 6];
        assert_eq!(file.seek(0, Whence::Start).1, StatusCode::OK);
        let (read, status) = file.readv(&mut [IoSliceMut::new(&mut head), IoSliceMut::new(&mut tail)]);
        assert_eq!((read, status), (13, StatusCode::OK));
        assert_eq!(&head, b"JELLO, ");
        assert_eq!(&tail, b"World!");

        let mut word = [0u8; 5];
        let (read, status) = file.preadv(&mut [IoSliceMut::new(&mut word)], 7);
        assert_eq!((read, status), (5, StatusCode::OK));
        assert_eq!(&word, b"World");
    }

    #[test]
    fn test_seek_from_end() {
        let (_dir, path) = scratch();
        let mut file = FileHandle::new();
        assert_eq!(file.open(&path, rw_create(), 0o644), StatusCode::OK);
        assert_eq!(file.write(b"Hello, World!"), (13, StatusCode::OK));

        assert_eq!(file.seek(-2, Whence::End), (11, StatusCode::OK));
        let mut buf = [0u8; 2];
        assert_eq!(file.read(&mut buf), (2, StatusCode::OK));
        assert_eq!(&buf, b"d!");
    }

    #[test]
    fn test_seek_before_start_fails() {
        let (_dir, path) = scratch();
        let mut file = FileHandle::new();
        assert_eq!(file.open(&path, rw_create(), 0o644), StatusCode::OK);
        assert_eq!(file.seek(-1, Whence::Start), (-1, StatusCode::EINVAL));
    }

    #[test]
    fn test_io_on_empty_handle() {
        let file = FileHandle::new();
        let mut buf = [0u8; 4];
        assert_eq!(file.read(&mut buf), (-1, StatusCode::EBADF));
        assert_eq!(file.write(b"data"), (-1, StatusCode::EBADF));
        assert_eq!(file.flush(), StatusCode::EBADF);
    }

    #[test]
    fn test_forced_transfer_failures() {
        let (_dir, path) = scratch();
        let sys = MockSystemCalls::new();
        let mut file = FileHandle::with_system(&sys);
        assert_eq!(file.open(&path, rw_create(), 0o644), StatusCode::OK);

        sys.write.mock_return_value_once(-1);
        sys.fail_with(StatusCode::ENOSPC, 1);
        assert_eq!(file.write(b"abc"), (-1, StatusCode::ENOSPC));

        sys.pread.mock_return_value_once(-1);
        sys.fail_with(StatusCode::EIO, 1);
        let mut buf = [0u8; 3];
        assert_eq!(file.pread(&mut buf, 0), (-1, StatusCode::EIO));

        sys.fsync.mock_return_value_once(FAILED);
        sys.fail_with(StatusCode::EIO, 1);
        assert_eq!(file.flush(), StatusCode::EIO);

        sys.lseek.mock_return_value_once(-1);
        sys.fail_with(StatusCode::ESPIPE, 1);
        assert_eq!(file.seek(0, Whence::Start), (-1, StatusCode::ESPIPE));

        // Nothing queued any more: native behaviour resumes
        assert_eq!(file.write(b"abc"), (3, StatusCode::OK));
        assert_eq!(sys.write.call_count(), 2);
    }

    #[test]
    fn test_forced_short_write_is_not_an_error() {
        let (_dir, path) = scratch();
        let sys = MockSystemCalls::new();
        let mut file = FileHandle::with_system(&sys);
        assert_eq!(file.open(&path, rw_create(), 0o644), StatusCode::OK);

        sys.write.mock_return_value_once(1);
        assert_eq!(file.write(b"abc"), (1, StatusCode::OK));
        assert_eq!(sys.errno_to_status.call_count(), 0);
    }

    #[test]
    fn test_forced_failure_without_status_is_still_an_error() {
        let (_dir, path) = scratch();
        std::fs::write(&path, b"Hello, World!").unwrap();
        let sys = MockSystemCalls::new();

        crossbeam::scope(|s| {
            s.spawn(|_| {
                let mut file = FileHandle::with_system(&sys);
                assert_eq!(file.open(&path, OpenFlags::RDONLY, 0), StatusCode::OK);

                sys.readv.mock_return_value(-1, 1);
                let mut buf = [0u8; 5];
                let (read, status) = file.readv(&mut [IoSliceMut::new(&mut buf)]);
                assert_eq!(read, -1);
                assert_eq!(status, StatusCode::EIO);

                sys.pwrite.mock_errno(StatusCode::EDQUOT);
                sys.pwrite.mock_return_value_once(-1);
                assert_eq!(file.pwrite(b"x", 0), (-1, StatusCode::EDQUOT));
            });
        })
        .unwrap();
    }

    /// Force two failures of one transfer primitive, then let the third
    /// call through. `$buf` starts as `JELLO`; reads overwrite it, writes
    /// send it to the file, which starts as `Hello, World!`.
    macro_rules! assert_forced_transfer {
        ($primitive:ident, |$file:ident, $buf:ident| $call:expr, $buf_after:expr, $file_after:expr) => {{
            let (_dir, path) = scratch();
            std::fs::write(&path, b"Hello, World!").unwrap();
            let sys = MockSystemCalls::new();
            let mut $file = FileHandle::with_system(&sys);
            assert_eq!($file.open(&path, OpenFlags::RDWR, 0), StatusCode::OK);
            let mut $buf = *b"JELLO";

            sys.$primitive.mock_return_value(-1, 2);
            sys.fail_with(StatusCode::ENOSPC, 2);
            for _ in 0..2 {
                assert_eq!($call, (-1, StatusCode::ENOSPC), "{}", stringify!($primitive));
            }
            assert_eq!(&$buf, b"JELLO", "{}", stringify!($primitive));

            assert_eq!($call, (5, StatusCode::OK), "{}", stringify!($primitive));
            assert_eq!(&$buf, $buf_after, "{}", stringify!($primitive));
            assert_eq!(std::fs::read(&path).unwrap(), $file_after, "{}", stringify!($primitive));

            assert_eq!(sys.$primitive.call_count(), 3, "{}", stringify!($primitive));
            assert_eq!(sys.$primitive.remaining(), 0, "{}", stringify!($primitive));
            assert_eq!(sys.errno_to_status.call_count(), 2, "{}", stringify!($primitive));
            let transfers = sys.read.call_count()
                + sys.pread.call_count()
                + sys.readv.call_count()
                + sys.preadv.call_count()
                + sys.write.call_count()
                + sys.pwrite.call_count()
                + sys.writev.call_count()
                + sys.pwritev.call_count();
            assert_eq!(transfers, 3, "{}", stringify!($primitive));
        }};
    }

    #[test]
    fn test_forced_failures_of_every_transfer() {
        init_logging();
        let initial = b"Hello, World!";

        assert_forced_transfer!(read, |file, buf| file.read(&mut buf), b"Hello", initial);
        assert_forced_transfer!(pread, |file, buf| file.pread(&mut buf, 7), b"World", initial);
        assert_forced_transfer!(
            readv,
            |file, buf| file.readv(&mut [IoSliceMut::new(&mut buf)]),
            b"Hello",
            initial
        );
        assert_forced_transfer!(
            preadv,
            |file, buf| file.preadv(&mut [IoSliceMut::new(&mut buf)], 7),
            b"World",
            initial
        );
        assert_forced_transfer!(write, |file, buf| file.write(&buf), b"JELLO", b"JELLO, World!");
        assert_forced_transfer!(pwrite, |file, buf| file.pwrite(&buf, 7), b"JELLO", b"Hello, JELLO!");
        assert_forced_transfer!(
            writev,
            |file, buf| file.writev(&[IoSlice::new(&buf)]),
            b"JELLO",
            b"JELLO, World!"
        );
        assert_forced_transfer!(
            pwritev,
            |file, buf| file.pwritev(&[IoSlice::new(&buf)], 7),
            b"JELLO",
            b"Hello, JELLO!"
        );
    }

    #[test]
    fn test_dup_empty_handle() {
        let file = FileHandle::new();
        let (copy, status) = file.dup();
        assert_eq!(status, StatusCode::EBADF);
        assert!(!copy.is_open());
    }

    #[test]
    fn test_dup_outlives_source() {
        let (_dir, path) = scratch();
        let mut file = FileHandle::new();
        assert_eq!(file.open(&path, rw_create(), 0o644), StatusCode::OK);
        assert_eq!(file.write(b"Hello, World!"), (13, StatusCode::OK));

        let (mut copy, status) = file.dup();
        assert_eq!(status, StatusCode::OK);
        assert!(copy.is_open());
        assert_ne!(copy.raw_fd(), file.raw_fd());

        assert_eq!(file.close(), StatusCode::OK);
        assert!(copy.is_open());

        let mut buf = [0u8; 5];
        assert_eq!(copy.pread(&mut buf, 0), (5, StatusCode::OK));
        assert_eq!(&buf, b"Hello");
        assert_eq!(copy.close(), StatusCode::OK);
    }

    #[test]
    fn test_forced_dup_failure() {
        let (_dir, path) = scratch();
        let sys = MockSystemCalls::new();
        let mut file = FileHandle::with_system(&sys);
        assert_eq!(file.open(&path, rw_create(), 0o644), StatusCode::OK);

        sys.dup.mock_return_value_once(FAILED);
        sys.fail_with(StatusCode::EMFILE, 1);
        let (copy, status) = file.dup();
        assert_eq!(status, StatusCode::EMFILE);
        assert!(!copy.is_open());
        assert!(file.is_open());
    }

    #[test]
    fn test_take_leaves_source_empty() {
        let (_dir, path) = scratch();
        let sys = MockSystemCalls::new();
        let mut source = FileHandle::with_system(&sys);
        assert_eq!(source.open(&path, rw_create(), 0o644), StatusCode::OK);
        let fd = source.raw_fd();

        let moved = source.take();
        assert!(!source.is_open());
        assert_eq!(moved.raw_fd(), fd);
        assert_eq!(sys.close.call_count(), 0);
    }

    #[test]
    fn test_move_assignment_closes_previous() {
        let dir = tempfile::tempdir().unwrap();
        let sys = MockSystemCalls::new();

        let mut target = FileHandle::with_system(&sys);
        assert_eq!(target.open(dir.path().join("a"), rw_create(), 0o644), StatusCode::OK);
        let mut source = FileHandle::with_system(&sys);
        assert_eq!(source.open(dir.path().join("b"), rw_create(), 0o644), StatusCode::OK);
        let source_fd = source.raw_fd();

        let before = sys.close.call_count();
        target = source.take();
        assert_eq!(sys.close.call_count(), before + 1);
        assert_eq!(target.raw_fd(), source_fd);
        assert!(!source.is_open());
    }

    #[test]
    fn test_into_raw_fd_releases_ownership() {
        let (_dir, path) = scratch();
        let sys = MockSystemCalls::new();
        let mut file = FileHandle::with_system(&sys);
        assert_eq!(file.open(&path, rw_create(), 0o644), StatusCode::OK);

        let fd = file.into_raw_fd().unwrap();
        assert_eq!(sys.close.call_count(), 0);

        let adopted = unsafe { FileHandle::from_raw_fd(fd) };
        assert_eq!(adopted.as_raw_fd(), fd);
    }
}

//! Mock backend for fault injection
//!
//! # WARNING: test configuration only
//!
//! This module exists only when the `mock` feature is enabled (crates enable
//! it from `[dev-dependencies]`). It lets a test force any primitive to fail
//! on its Nth invocation without reproducing the real failure condition
//! (disk full, permission loss, ...).
//!
//! ## Usage
//!
//! ```rust
//! use kestrel_sys::mock::MockSystemCalls;
//! use kestrel_sys::{StatusCode, SystemCalls, FAILED};
//!
//! let sys = MockSystemCalls::new();
//!
//! // The next two fsync calls fail with EIO
//! sys.fsync.mock_return_value(FAILED, 2);
//! sys.fail_with(StatusCode::EIO, 2);
//!
//! assert_eq!(sys.fsync(0), FAILED);
//! assert_eq!(sys.errno_to_status(), StatusCode::EIO);
//! assert_eq!(sys.fsync.call_count(), 1);
//!
//! sys.reset_mocks();
//! assert_eq!(sys.fsync.call_count(), 0);
//! ```
//!
//! A forced result also sets the calling thread's `errno` (`EIO` unless
//! [`MockSystemCall::mock_errno`] chose another), so a forced failure
//! sentinel always translates to a failure status, never to whatever the
//! thread's last real call left behind.
//!
//! ## Concurrency
//!
//! Each primitive has its own lock. Counting a call and consuming a queued
//! override happen under one acquisition, so every counted call observes
//! either the forced result or the native one, never a mix. The native
//! primitive itself runs after the lock is released.

use std::ffi::CStr;
use std::fmt;
use std::io::{IoSlice, IoSliceMut};
use std::os::unix::io::RawFd;
use std::sync::{Mutex, MutexGuard, PoisonError};

use libc::{c_int, c_void, mode_t, off_t};
use log::trace;

use crate::{Native, StatusCode, SystemCalls, FAILED};

/// `errno` a forced result leaves behind unless told otherwise
pub const DEFAULT_FORCED_ERRNO: StatusCode = StatusCode::EIO;

#[derive(Debug)]
struct MockState<R> {
    result: R,
    errno: StatusCode,
    remaining: usize,
    calls: usize,
}

/// One interceptable primitive
///
/// `R` is the primitive's native result type.
pub struct MockSystemCall<R> {
    name: &'static str,
    default: R,
    state: Mutex<MockState<R>>,
}

impl<R: Copy + fmt::Debug + Send> MockSystemCall<R> {
    /// Create a mock whose queued result starts as `default`
    pub const fn new(name: &'static str, default: R) -> Self {
        Self {
            name,
            default,
            state: Mutex::new(MockState {
                result: default,
                errno: DEFAULT_FORCED_ERRNO,
                remaining: 0,
                calls: 0,
            }),
        }
    }

    /// Name of the wrapped primitive
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Invoke the primitive
    ///
    /// Counts the call, then returns the queued result if an override is
    /// pending; otherwise runs `native` and returns its result. A queued
    /// result sets the thread's `errno` to the configured value.
    pub fn call(&self, native: impl FnOnce() -> R) -> R {
        let forced = {
            let mut state = self.lock();
            state.calls += 1;
            if state.remaining > 0 {
                state.remaining -= 1;
                trace!(
                    "Mock system call name={}, result={:?}, errno={:?}, count={}",
                    self.name,
                    state.result,
                    state.errno,
                    state.remaining + 1
                );
                Some((state.result, state.errno))
            } else {
                None
            }
        };

        match forced {
            Some((result, errno)) => {
                // After unlocking, so nothing in between can clobber it
                set_errno(errno.raw());
                result
            }
            None => native(),
        }
    }

    /// Queue `result` for the next `count` invocations
    ///
    /// Replaces anything queued before. Once `count` calls have observed the
    /// result, the primitive resumes native behaviour.
    pub fn mock_return_value(&self, result: R, count: usize) {
        let mut state = self.lock();
        state.result = result;
        state.remaining = count;
    }

    /// Queue `result` for the next invocation only
    pub fn mock_return_value_once(&self, result: R) {
        self.mock_return_value(result, 1);
    }

    /// Choose the `errno` left behind by queued results
    ///
    /// Sticks until [`reset`](MockSystemCall::reset).
    pub fn mock_errno(&self, errno: StatusCode) {
        self.lock().errno = errno;
    }

    /// Number of invocations since creation or the last reset
    pub fn call_count(&self) -> usize {
        self.lock().calls
    }

    /// Number of queued overrides not yet observed
    pub fn remaining(&self) -> usize {
        self.lock().remaining
    }

    /// Clear the queued override and the call counter
    pub fn reset(&self) {
        let mut state = self.lock();
        state.result = self.default;
        state.errno = DEFAULT_FORCED_ERRNO;
        state.remaining = 0;
        state.calls = 0;
    }

    // A panicking test must not wedge the counters for everyone else
    fn lock(&self) -> MutexGuard<'_, MockState<R>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn set_errno(errno: c_int) {
    // SAFETY: the errno accessor returns a valid pointer to the calling
    // thread's errno slot
    unsafe {
        #[cfg(any(target_os = "linux", target_os = "emscripten", target_os = "redox"))]
        let slot = libc::__errno_location();
        #[cfg(target_os = "android")]
        let slot = libc::__errno();
        #[cfg(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "dragonfly"
        ))]
        let slot = libc::__error();
        #[cfg(any(target_os = "netbsd", target_os = "openbsd"))]
        let slot = libc::__errno();

        *slot = errno;
    }
}

impl<R: Copy + fmt::Debug + Send> fmt::Debug for MockSystemCall<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("MockSystemCall")
            .field("name", &self.name)
            .field("result", &state.result)
            .field("errno", &state.errno)
            .field("remaining", &state.remaining)
            .field("calls", &state.calls)
            .finish()
    }
}

/// Interceptable provider for every primitive Kestrel uses
///
/// Calls without a queued override fall through to [`Native`]. Instances are
/// independent of one another, so concurrently running tests each build
/// their own and never observe each other's overrides or counters.
///
/// The `mmap` mock carries addresses as `usize`; queue
/// `libc::MAP_FAILED as usize` to force a mapping failure. Forcing a
/// successful address also needs a `munmap` override, or the owner will
/// unmap memory it never mapped.
#[derive(Debug)]
pub struct MockSystemCalls {
    pub open: MockSystemCall<RawFd>,
    pub close: MockSystemCall<c_int>,
    pub fstat: MockSystemCall<c_int>,
    pub read: MockSystemCall<isize>,
    pub pread: MockSystemCall<isize>,
    pub readv: MockSystemCall<isize>,
    pub preadv: MockSystemCall<isize>,
    pub write: MockSystemCall<isize>,
    pub pwrite: MockSystemCall<isize>,
    pub writev: MockSystemCall<isize>,
    pub pwritev: MockSystemCall<isize>,
    pub lseek: MockSystemCall<off_t>,
    pub dup: MockSystemCall<RawFd>,
    pub fsync: MockSystemCall<c_int>,
    pub mmap: MockSystemCall<usize>,
    pub munmap: MockSystemCall<c_int>,
    pub errno_to_status: MockSystemCall<StatusCode>,
    native: Native,
}

impl MockSystemCalls {
    pub const fn new() -> Self {
        Self {
            open: MockSystemCall::new("open", FAILED),
            close: MockSystemCall::new("close", FAILED),
            fstat: MockSystemCall::new("fstat", FAILED),
            read: MockSystemCall::new("read", -1),
            pread: MockSystemCall::new("pread", -1),
            readv: MockSystemCall::new("readv", -1),
            preadv: MockSystemCall::new("preadv", -1),
            write: MockSystemCall::new("write", -1),
            pwrite: MockSystemCall::new("pwrite", -1),
            writev: MockSystemCall::new("writev", -1),
            pwritev: MockSystemCall::new("pwritev", -1),
            lseek: MockSystemCall::new("lseek", -1),
            dup: MockSystemCall::new("dup", FAILED),
            fsync: MockSystemCall::new("fsync", FAILED),
            mmap: MockSystemCall::new("mmap", usize::MAX),
            munmap: MockSystemCall::new("munmap", FAILED),
            errno_to_status: MockSystemCall::new("errno_to_status", StatusCode::OK),
            native: Native,
        }
    }

    /// Reset every primitive and the errno translation in one call
    pub fn reset_mocks(&self) {
        self.open.reset();
        self.close.reset();
        self.fstat.reset();
        self.read.reset();
        self.pread.reset();
        self.readv.reset();
        self.preadv.reset();
        self.write.reset();
        self.pwrite.reset();
        self.writev.reset();
        self.pwritev.reset();
        self.lseek.reset();
        self.dup.reset();
        self.fsync.reset();
        self.mmap.reset();
        self.munmap.reset();
        self.errno_to_status.reset();
    }

    /// Make the next `count` errno translations report `status`
    ///
    /// Overrides whatever `errno` the forced results left behind, for
    /// whichever primitive fails next.
    pub fn fail_with(&self, status: StatusCode, count: usize) {
        self.errno_to_status.mock_return_value(status, count);
    }
}

impl Default for MockSystemCalls {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCalls for MockSystemCalls {
    fn open(&self, path: &CStr, flags: c_int, mode: mode_t) -> RawFd {
        self.open.call(|| self.native.open(path, flags, mode))
    }

    fn close(&self, fd: RawFd) -> c_int {
        self.close.call(|| self.native.close(fd))
    }

    fn fstat(&self, fd: RawFd, buf: &mut libc::stat) -> c_int {
        self.fstat.call(|| self.native.fstat(fd, buf))
    }

    fn read(&self, fd: RawFd, buf: &mut [u8]) -> isize {
        self.read.call(|| self.native.read(fd, buf))
    }

    fn pread(&self, fd: RawFd, buf: &mut [u8], offset: off_t) -> isize {
        self.pread.call(|| self.native.pread(fd, buf, offset))
    }

    fn readv(&self, fd: RawFd, iov: &mut [IoSliceMut<'_>]) -> isize {
        self.readv.call(|| self.native.readv(fd, iov))
    }

    fn preadv(&self, fd: RawFd, iov: &mut [IoSliceMut<'_>], offset: off_t) -> isize {
        self.preadv.call(|| self.native.preadv(fd, iov, offset))
    }

    fn write(&self, fd: RawFd, buf: &[u8]) -> isize {
        self.write.call(|| self.native.write(fd, buf))
    }

    fn pwrite(&self, fd: RawFd, buf: &[u8], offset: off_t) -> isize {
        self.pwrite.call(|| self.native.pwrite(fd, buf, offset))
    }

    fn writev(&self, fd: RawFd, iov: &[IoSlice<'_>]) -> isize {
        self.writev.call(|| self.native.writev(fd, iov))
    }

    fn pwritev(&self, fd: RawFd, iov: &[IoSlice<'_>], offset: off_t) -> isize {
        self.pwritev.call(|| self.native.pwritev(fd, iov, offset))
    }

    fn lseek(&self, fd: RawFd, offset: off_t, whence: c_int) -> off_t {
        self.lseek.call(|| self.native.lseek(fd, offset, whence))
    }

    fn dup(&self, fd: RawFd) -> RawFd {
        self.dup.call(|| self.native.dup(fd))
    }

    fn fsync(&self, fd: RawFd) -> c_int {
        self.fsync.call(|| self.native.fsync(fd))
    }

    unsafe fn mmap(
        &self,
        addr: *mut c_void,
        length: usize,
        prot: c_int,
        flags: c_int,
        fd: RawFd,
        offset: off_t,
    ) -> *mut c_void {
        let addr = addr as usize;
        let mapped = self.mmap.call(|| {
            // SAFETY: upheld by the caller
            unsafe { self.native.mmap(addr as *mut c_void, length, prot, flags, fd, offset) as usize }
        });
        mapped as *mut c_void
    }

    unsafe fn munmap(&self, addr: *mut c_void, length: usize) -> c_int {
        let addr = addr as usize;
        self.munmap.call(|| {
            // SAFETY: upheld by the caller
            unsafe { self.native.munmap(addr as *mut c_void, length) }
        })
    }

    fn errno_to_status(&self) -> StatusCode {
        self.errno_to_status.call(|| self.native.errno_to_status())
    }
}

//! # Kestrel System Call Layer
//!
//! This crate is the single indirection point through which Kestrel invokes
//! every operating-system primitive it uses:
//! - **Native backend**: a zero-sized provider whose methods are one inlined
//!   libc call each (production)
//! - **Mock backend**: interceptable primitives with a call counter and a
//!   programmable forced result (tests only)
//!
//! ## Usage
//!
//! ```rust
//! use kestrel_sys::{Native, SystemCalls};
//!
//! let sys = Native;
//! let fd = sys.dup(0);
//! if fd == -1 {
//!     let status = sys.errno_to_status();
//!     assert!(status.is_err());
//! } else {
//!     assert_eq!(sys.close(fd), 0);
//! }
//! ```
//!
//! ## Build Modes
//!
//! ```bash
//! # Native only (production)
//! cargo build
//!
//! # Mock backend available (testing only)
//! cargo test --features mock
//! ```
//!
//! Owning types are generic over [`SystemCalls`], so the provider is chosen
//! by the caller and monomorphised: production code pays nothing for the
//! indirection, and tests inject their own [`mock::MockSystemCalls`] instead
//! of driving process-wide state.

#![deny(unsafe_op_in_unsafe_fn)]

use std::ffi::CStr;
use std::io::{IoSlice, IoSliceMut};
use std::os::unix::io::RawFd;
use std::sync::Arc;

use libc::{c_int, c_void, mode_t, off_t};

/// Backend configuration and detection
pub mod config;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

mod native;

pub use kestrel_status::{errno_to_status, status_to_string, StatusCode};
pub use native::Native;

/// Native failure sentinel returned by descriptor-style primitives
pub const FAILED: c_int = -1;

/// Native failure sentinel returned by `mmap`
pub const MAP_FAILED: *mut c_void = libc::MAP_FAILED;

/// One method per wrapped OS primitive
///
/// Every method takes the native arguments (slices instead of pointer and
/// length pairs) and returns the native result unchanged, including the
/// failure sentinel. Translating a failure into a [`StatusCode`] is the
/// caller's job, through [`SystemCalls::errno_to_status`].
pub trait SystemCalls: Send + Sync {
    /// `open(2)`: descriptor, or `-1`
    fn open(&self, path: &CStr, flags: c_int, mode: mode_t) -> RawFd;

    /// `close(2)`: `0`, or `-1`
    fn close(&self, fd: RawFd) -> c_int;

    /// `fstat(2)`: `0`, or `-1`
    fn fstat(&self, fd: RawFd, buf: &mut libc::stat) -> c_int;

    /// `read(2)`: bytes read, or `-1`
    fn read(&self, fd: RawFd, buf: &mut [u8]) -> isize;

    /// `pread(2)`: bytes read at `offset`, or `-1`
    fn pread(&self, fd: RawFd, buf: &mut [u8], offset: off_t) -> isize;

    /// `readv(2)`: bytes scattered into `iov`, or `-1`
    fn readv(&self, fd: RawFd, iov: &mut [IoSliceMut<'_>]) -> isize;

    /// `preadv(2)`: bytes scattered into `iov` from `offset`, or `-1`
    fn preadv(&self, fd: RawFd, iov: &mut [IoSliceMut<'_>], offset: off_t) -> isize;

    /// `write(2)`: bytes written, or `-1`
    fn write(&self, fd: RawFd, buf: &[u8]) -> isize;

    /// `pwrite(2)`: bytes written at `offset`, or `-1`
    fn pwrite(&self, fd: RawFd, buf: &[u8], offset: off_t) -> isize;

    /// `writev(2)`: bytes gathered from `iov`, or `-1`
    fn writev(&self, fd: RawFd, iov: &[IoSlice<'_>]) -> isize;

    /// `pwritev(2)`: bytes gathered from `iov` and written at `offset`, or `-1`
    fn pwritev(&self, fd: RawFd, iov: &[IoSlice<'_>], offset: off_t) -> isize;

    /// `lseek(2)`: resulting offset, or `-1`
    fn lseek(&self, fd: RawFd, offset: off_t, whence: c_int) -> off_t;

    /// `dup(2)`: new descriptor, or `-1`
    fn dup(&self, fd: RawFd) -> RawFd;

    /// `fsync(2)`: `0`, or `-1`
    fn fsync(&self, fd: RawFd) -> c_int;

    /// `mmap(2)`: mapping address, or [`MAP_FAILED`]
    ///
    /// # Safety
    /// With `MAP_FIXED` (or a hint the kernel honours) the new mapping can
    /// replace memory the process still references.
    unsafe fn mmap(
        &self,
        addr: *mut c_void,
        length: usize,
        prot: c_int,
        flags: c_int,
        fd: RawFd,
        offset: off_t,
    ) -> *mut c_void;

    /// `munmap(2)`: `0`, or `-1`
    ///
    /// # Safety
    /// Nothing may reference `[addr, addr + length)` after the call.
    unsafe fn munmap(&self, addr: *mut c_void, length: usize) -> c_int;

    /// Translate the calling thread's current `errno` into a [`StatusCode`]
    fn errno_to_status(&self) -> StatusCode;
}

macro_rules! forward_system_calls {
    ($($provider:ty),* $(,)?) => {
        $(
            impl<S: SystemCalls + ?Sized> SystemCalls for $provider {
                #[inline]
                fn open(&self, path: &CStr, flags: c_int, mode: mode_t) -> RawFd {
                    (**self).open(path, flags, mode)
                }

                #[inline]
                fn close(&self, fd: RawFd) -> c_int {
                    (**self).close(fd)
                }

                #[inline]
                fn fstat(&self, fd: RawFd, buf: &mut libc::stat) -> c_int {
                    (**self).fstat(fd, buf)
                }

                #[inline]
                fn read(&self, fd: RawFd, buf: &mut [u8]) -> isize {
                    (**self).read(fd, buf)
                }

                #[inline]
                fn pread(&self, fd: RawFd, buf: &mut [u8], offset: off_t) -> isize {
                    (**self).pread(fd, buf, offset)
                }

                #[inline]
                fn readv(&self, fd: RawFd, iov: &mut [IoSliceMut<'_>]) -> isize {
                    (**self).readv(fd, iov)
                }

                #[inline]
                fn preadv(&self, fd: RawFd, iov: &mut [IoSliceMut<'_>], offset: off_t) -> isize {
                    (**self).preadv(fd, iov, offset)
                }

                #[inline]
                fn write(&self, fd: RawFd, buf: &[u8]) -> isize {
                    (**self).write(fd, buf)
                }

                #[inline]
                fn pwrite(&self, fd: RawFd, buf: &[u8], offset: off_t) -> isize {
                    (**self).pwrite(fd, buf, offset)
                }

                #[inline]
                fn writev(&self, fd: RawFd, iov: &[IoSlice<'_>]) -> isize {
                    (**self).writev(fd, iov)
                }

                #[inline]
                fn pwritev(&self, fd: RawFd, iov: &[IoSlice<'_>], offset: off_t) -> isize {
                    (**self).pwritev(fd, iov, offset)
                }

                #[inline]
                fn lseek(&self, fd: RawFd, offset: off_t, whence: c_int) -> off_t {
                    (**self).lseek(fd, offset, whence)
                }

                #[inline]
                fn dup(&self, fd: RawFd) -> RawFd {
                    (**self).dup(fd)
                }

                #[inline]
                fn fsync(&self, fd: RawFd) -> c_int {
                    (**self).fsync(fd)
                }

                #[inline]
                unsafe fn mmap(
                    &self,
                    addr: *mut c_void,
                    length: usize,
                    prot: c_int,
                    flags: c_int,
                    fd: RawFd,
                    offset: off_t,
                ) -> *mut c_void {
                    // SAFETY: forwarded verbatim, the caller upholds the contract
                    unsafe { (**self).mmap(addr, length, prot, flags, fd, offset) }
                }

                #[inline]
                unsafe fn munmap(&self, addr: *mut c_void, length: usize) -> c_int {
                    // SAFETY: forwarded verbatim, the caller upholds the contract
                    unsafe { (**self).munmap(addr, length) }
                }

                #[inline]
                fn errno_to_status(&self) -> StatusCode {
                    (**self).errno_to_status()
                }
            }
        )*
    };
}

forward_system_calls!(&S, Arc<S>, Box<S>);

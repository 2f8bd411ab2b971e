//! Native backend
//!
//! Every method is a single libc call with the arguments passed through.

use std::ffi::CStr;
use std::io::{IoSlice, IoSliceMut};
use std::os::unix::io::RawFd;

use libc::{c_int, c_void, mode_t, off_t};
use static_assertions::{assert_eq_align, assert_eq_size};

use crate::{errno_to_status, StatusCode, SystemCalls};

// IoSlice/IoSliceMut are passed to the kernel as iovec arrays
assert_eq_size!(IoSlice<'static>, libc::iovec);
assert_eq_align!(IoSlice<'static>, libc::iovec);
assert_eq_size!(IoSliceMut<'static>, libc::iovec);
assert_eq_align!(IoSliceMut<'static>, libc::iovec);

/// Direct pass-through to the operating system
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Native;

#[inline]
fn iov_count(len: usize) -> c_int {
    len.min(c_int::MAX as usize) as c_int
}

impl SystemCalls for Native {
    #[inline]
    fn open(&self, path: &CStr, flags: c_int, mode: mode_t) -> RawFd {
        // SAFETY: `path` is a valid NUL-terminated string for the whole call
        unsafe { libc::open(path.as_ptr(), flags, mode as libc::c_uint) }
    }

    #[inline]
    fn close(&self, fd: RawFd) -> c_int {
        // SAFETY: closing an arbitrary descriptor cannot violate memory safety
        unsafe { libc::close(fd) }
    }

    #[inline]
    fn fstat(&self, fd: RawFd, buf: &mut libc::stat) -> c_int {
        // SAFETY: `buf` is a valid, writable stat structure
        unsafe { libc::fstat(fd, buf) }
    }

    #[inline]
    fn read(&self, fd: RawFd, buf: &mut [u8]) -> isize {
        // SAFETY: the kernel writes at most `buf.len()` bytes into `buf`
        unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) }
    }

    #[inline]
    fn pread(&self, fd: RawFd, buf: &mut [u8], offset: off_t) -> isize {
        // SAFETY: the kernel writes at most `buf.len()` bytes into `buf`
        unsafe { libc::pread(fd, buf.as_mut_ptr().cast(), buf.len(), offset) }
    }

    #[inline]
    fn readv(&self, fd: RawFd, iov: &mut [IoSliceMut<'_>]) -> isize {
        // SAFETY: IoSliceMut is ABI-compatible with iovec and every slice is writable
        unsafe { libc::readv(fd, iov.as_mut_ptr().cast(), iov_count(iov.len())) }
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[inline]
    fn preadv(&self, fd: RawFd, iov: &mut [IoSliceMut<'_>], offset: off_t) -> isize {
        // SAFETY: IoSliceMut is ABI-compatible with iovec and every slice is writable
        unsafe { libc::preadv(fd, iov.as_mut_ptr().cast(), iov_count(iov.len()), offset) }
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    fn preadv(&self, fd: RawFd, iov: &mut [IoSliceMut<'_>], offset: off_t) -> isize {
        let mut total: isize = 0;
        for slice in iov.iter_mut() {
            let want = slice.len();
            let rc = self.pread(fd, slice, offset + total as off_t);
            if rc < 0 {
                return if total == 0 { rc } else { total };
            }
            total += rc;
            if (rc as usize) < want {
                break;
            }
        }
        total
    }

    #[inline]
    fn write(&self, fd: RawFd, buf: &[u8]) -> isize {
        // SAFETY: the kernel reads at most `buf.len()` bytes from `buf`
        unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) }
    }

    #[inline]
    fn pwrite(&self, fd: RawFd, buf: &[u8], offset: off_t) -> isize {
        // SAFETY: the kernel reads at most `buf.len()` bytes from `buf`
        unsafe { libc::pwrite(fd, buf.as_ptr().cast(), buf.len(), offset) }
    }

    #[inline]
    fn writev(&self, fd: RawFd, iov: &[IoSlice<'_>]) -> isize {
        // SAFETY: IoSlice is ABI-compatible with iovec
        unsafe { libc::writev(fd, iov.as_ptr().cast(), iov_count(iov.len())) }
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[inline]
    fn pwritev(&self, fd: RawFd, iov: &[IoSlice<'_>], offset: off_t) -> isize {
        // SAFETY: IoSlice is ABI-compatible with iovec
        unsafe { libc::pwritev(fd, iov.as_ptr().cast(), iov_count(iov.len()), offset) }
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    fn pwritev(&self, fd: RawFd, iov: &[IoSlice<'_>], offset: off_t) -> isize {
        let mut total: isize = 0;
        for slice in iov {
            let rc = self.pwrite(fd, slice, offset + total as off_t);
            if rc < 0 {
                return if total == 0 { rc } else { total };
            }
            total += rc;
            if (rc as usize) < slice.len() {
                break;
            }
        }
        total
    }

    #[inline]
    fn lseek(&self, fd: RawFd, offset: off_t, whence: c_int) -> off_t {
        // SAFETY: no memory is passed to the kernel
        unsafe { libc::lseek(fd, offset, whence) }
    }

    #[inline]
    fn dup(&self, fd: RawFd) -> RawFd {
        // SAFETY: no memory is passed to the kernel
        unsafe { libc::dup(fd) }
    }

    #[inline]
    fn fsync(&self, fd: RawFd) -> c_int {
        // SAFETY: no memory is passed to the kernel
        unsafe { libc::fsync(fd) }
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
        // SAFETY: upheld by the caller
        unsafe { libc::mmap(addr, length, prot, flags, fd, offset) }
    }

    #[inline]
    unsafe fn munmap(&self, addr: *mut c_void, length: usize) -> c_int {
        // SAFETY: upheld by the caller
        unsafe { libc::munmap(addr, length) }
    }

    #[inline]
    fn errno_to_status(&self) -> StatusCode {
        errno_to_status(std::io::Error::last_os_error().raw_os_error().unwrap_or(0))
    }
}

//! Typed flag sets for the integer arguments of `open` and `mmap`
//!
//! Every set keeps unknown bits (`from_bits_retain`), so a native flag
//! Kestrel has no name for still reaches the primitive unchanged.

use bitflags::bitflags;
use libc::c_int;

use kestrel_sys::config;

bitflags! {
    /// `open(2)` flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: c_int {
        const WRONLY = libc::O_WRONLY;
        const RDWR = libc::O_RDWR;
        const CREAT = libc::O_CREAT;
        const EXCL = libc::O_EXCL;
        const TRUNC = libc::O_TRUNC;
        const APPEND = libc::O_APPEND;
        const CLOEXEC = libc::O_CLOEXEC;
        const SYNC = libc::O_SYNC;
        const NONBLOCK = libc::O_NONBLOCK;
    }
}

impl OpenFlags {
    /// Read-only access (the zero access mode)
    pub const RDONLY: Self = Self::empty();
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self::from_bits_retain(config::DEFAULT_OPEN_FLAGS)
    }
}

bitflags! {
    /// `mmap(2)` protection
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ProtFlags: c_int {
        const READ = libc::PROT_READ;
        const WRITE = libc::PROT_WRITE;
        const EXEC = libc::PROT_EXEC;
    }
}

impl ProtFlags {
    /// Pages may not be accessed
    pub const NONE: Self = Self::empty();
}

impl Default for ProtFlags {
    fn default() -> Self {
        Self::from_bits_retain(config::DEFAULT_PROT)
    }
}

bitflags! {
    /// `mmap(2)` mapping type and modifiers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MapFlags: c_int {
        const SHARED = libc::MAP_SHARED;
        const PRIVATE = libc::MAP_PRIVATE;
    }
}

impl Default for MapFlags {
    fn default() -> Self {
        Self::from_bits_retain(config::DEFAULT_MAP_FLAGS)
    }
}

/// Origin of a [`seek`](crate::FileHandle::seek) offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Whence {
    /// Absolute offset (`SEEK_SET`)
    Start,
    /// Relative to the current offset (`SEEK_CUR`)
    Current,
    /// Relative to the end of the file (`SEEK_END`)
    End,
}

impl Whence {
    pub const fn as_raw(self) -> c_int {
        match self {
            Whence::Start => libc::SEEK_SET,
            Whence::Current => libc::SEEK_CUR,
            Whence::End => libc::SEEK_END,
        }
    }
}

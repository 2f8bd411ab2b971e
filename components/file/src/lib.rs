//! Kestrel File - Owning handles for files and memory mappings
//!
//! # Purpose
//! Wraps the OS file and mapping primitives in two owning types that never
//! leak a descriptor or a mapping and never panic on failure:
//! - [`FileHandle`]: one file descriptor, closed on drop
//! - [`MappedFile`]: one memory mapping, unmapped on drop
//!
//! # Integration Points
//! - Depends on: kestrel-sys (every primitive call), kestrel-status (results)
//! - Provides to: applications doing raw file and mapped I/O
//!
//! # Architecture
//! Both types are generic over a [`SystemCalls`] provider, [`Native`] by
//! default. Operations return a [`StatusCode`], or a `(value, StatusCode)`
//! pair when the primitive produces a value; failures are never thrown.
//!
//! # Testing Strategy
//! - Unit tests: each operation against real temporary files
//! - Fault injection: `MockSystemCalls` forces a primitive's Nth call to fail
//! - Integration tests: ownership transfer, concurrent handles, mapping lifetime
//!
//! # Example
//! ```no_run
//! use kestrel_file::{FileHandle, MappedFile, OpenFlags, StatusCode};
//!
//! let mut file = FileHandle::new();
//! let status = file.open("/tmp/data", OpenFlags::CREAT | OpenFlags::RDWR, 0o644);
//! if status.is_err() {
//!     eprintln!("open failed: {}", status);
//!     return;
//! }
//! let (_, status) = file.write(b"Hello, World!");
//! assert_eq!(status, StatusCode::OK);
//!
//! let mut mapping = MappedFile::new();
//! assert_eq!(mapping.map(&file), StatusCode::OK);
//! assert_eq!(mapping.as_slice(), b"Hello, World!");
//! ```

#![deny(unsafe_op_in_unsafe_fn)]

mod flags;
mod handle;
mod mapped;

pub use flags::{MapFlags, OpenFlags, ProtFlags, Whence};
pub use handle::FileHandle;
pub use mapped::MappedFile;

pub use kestrel_sys::{config, errno_to_status, status_to_string, Native, StatusCode, SystemCalls};

/// Fault-injection backend (test configuration only)
#[cfg(feature = "mock")]
pub use kestrel_sys::mock;

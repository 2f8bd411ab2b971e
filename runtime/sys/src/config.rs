//! Defaults and backend detection

use libc::{c_int, mode_t};

/// Flags used by `open` when the caller does not choose any: read-only
pub const DEFAULT_OPEN_FLAGS: c_int = libc::O_RDONLY;

/// Permission bits used when `open` creates a file: `rwxr--r--`
pub const DEFAULT_OPEN_MODE: mode_t = libc::S_IRWXU | libc::S_IRGRP | libc::S_IROTH;

/// Protection used when a whole file is mapped without explicit flags
pub const DEFAULT_PROT: c_int = libc::PROT_READ;

/// Mapping flags used when a whole file is mapped without explicit flags
pub const DEFAULT_MAP_FLAGS: c_int = libc::MAP_PRIVATE;

/// Which backends this build carries
pub fn backend_mode() -> &'static str {
    if is_mock() {
        "mock"
    } else {
        "native"
    }
}

/// Check if the mock backend is compiled in (test configuration)
pub const fn is_mock() -> bool {
    cfg!(any(test, feature = "mock"))
}

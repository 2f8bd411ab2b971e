//! Named status codes
//!
//! Every platform `errno` value that Kestrel knows by name, together with its
//! fixed description. Names that only exist on Linux-family targets are
//! compiled only there; everything else is identical on every Unix target.
//!
//! Some names alias the same number on some targets (`EDEADLOCK`/`EDEADLK`,
//! `EWOULDBLOCK`/`EAGAIN`, `EOPNOTSUPP`/`ENOTSUP` on Linux). Lookup is
//! first-match, so an alias always renders as the name listed first.

use crate::StatusCode;

macro_rules! errno_codes {
    ($( $(#[$attr:meta])* $name:ident => $desc:literal; )*) => {
        impl StatusCode {
            $(
                $(#[$attr])*
                #[doc = $desc]
                pub const $name: StatusCode = StatusCode(libc::$name);
            )*
        }

        /// Look up the symbolic name and description of a platform errno value.
        pub(crate) fn lookup_errno(raw: i32) -> Option<(&'static str, &'static str)> {
            $(
                $(#[$attr])*
                {
                    if raw == libc::$name {
                        return Some((stringify!($name), $desc));
                    }
                }
            )*
            None
        }
    };
}

errno_codes! {
    E2BIG => "argument list too long";
    EACCES => "permission denied";
    EADDRINUSE => "address already in use";
    EADDRNOTAVAIL => "address not available";
    EAFNOSUPPORT => "address family not supported";
    EAGAIN => "resource temporarily unavailable";
    EALREADY => "connection already in progress";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EBADE => "invalid exchange";
    EBADF => "bad file descriptor";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EBADFD => "file descriptor in bad state";
    EBADMSG => "bad message";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EBADR => "invalid request descriptor";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EBADRQC => "invalid request code";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EBADSLT => "invalid slot";
    EBUSY => "device or resource busy";
    ECANCELED => "operation canceled";
    ECHILD => "no child processes";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    ECHRNG => "channel number out of range";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    ECOMM => "communication error on send";
    ECONNABORTED => "connection aborted";
    ECONNREFUSED => "connection refused";
    ECONNRESET => "connection reset";
    EDEADLK => "resource deadlock avoided";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EDEADLOCK => "resource deadlock avoided";
    EDESTADDRREQ => "destination address required";
    EDOM => "mathematics argument out of domain of function";
    EDQUOT => "disk quota exceeded";
    EEXIST => "file exists";
    EFAULT => "bad address";
    EFBIG => "file too large";
    EHOSTDOWN => "host is down";
    EHOSTUNREACH => "host is unreachable";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EHWPOISON => "memory page has hardware error";
    EIDRM => "identifier removed";
    EILSEQ => "invalid or incomplete multibyte or wide character";
    EINPROGRESS => "operation in progress";
    EINTR => "interrupted function call";
    EINVAL => "invalid argument";
    EIO => "input/output error";
    EISCONN => "socket is connected";
    EISDIR => "is a directory";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EISNAM => "is a named type file";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EKEYEXPIRED => "key has expired";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EKEYREJECTED => "key was rejected by service";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EKEYREVOKED => "key has been revoked";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EL2HLT => "level 2 halted";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EL2NSYNC => "level 2 not synchronized";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EL3HLT => "level 3 halted";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EL3RST => "level 3 reset";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    ELIBACC => "cannot access a needed shared library";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    ELIBBAD => "accessing a corrupted shared library";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    ELIBMAX => "attempting to link in too many shared libraries";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    ELIBSCN => ".lib section in a.out corrupted";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    ELIBEXEC => "cannot exec a shared library directly";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    ELNRNG => "link number out of range";
    ELOOP => "too many levels of symbolic links";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EMEDIUMTYPE => "wrong medium type";
    EMFILE => "too many open files";
    EMLINK => "too many links";
    EMSGSIZE => "message too long";
    EMULTIHOP => "multihop attempted";
    ENAMETOOLONG => "filename too long";
    ENETDOWN => "network is down";
    ENETRESET => "connection aborted by network";
    ENETUNREACH => "network unreachable";
    ENFILE => "too many open files in system";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    ENOANO => "no anode";
    ENOBUFS => "no buffer space available";
    ENODATA => "the named attribute does not exist, or the process has no access to this attribute";
    ENODEV => "no such device";
    ENOENT => "no such file or directory";
    ENOEXEC => "exec format error";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    ENOKEY => "required key not available";
    ENOLCK => "no locks available";
    ENOLINK => "link has been severed";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    ENOMEDIUM => "no medium found";
    ENOMEM => "not enough space/cannot allocate memory";
    ENOMSG => "no message of the desired type";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    ENONET => "machine is not on the network";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    ENOPKG => "package not installed";
    ENOPROTOOPT => "protocol not available";
    ENOSPC => "no space left on device";
    ENOSR => "no stream resources";
    ENOSTR => "not a stream";
    ENOSYS => "function not implemented";
    ENOTBLK => "block device required";
    ENOTCONN => "the socket is not connected";
    ENOTDIR => "not a directory";
    ENOTEMPTY => "directory not empty";
    ENOTRECOVERABLE => "state not recoverable";
    ENOTSOCK => "not a socket";
    ENOTSUP => "operation not supported";
    ENOTTY => "inappropriate i/o control operation";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    ENOTUNIQ => "name not unique on network";
    ENXIO => "no such device or address";
    EOPNOTSUPP => "operation not supported on socket";
    EOVERFLOW => "value too large to be stored in data type";
    EOWNERDEAD => "owner died";
    EPERM => "operation not permitted";
    EPFNOSUPPORT => "protocol family not supported";
    EPIPE => "broken pipe";
    EPROTO => "protocol error";
    EPROTONOSUPPORT => "protocol not supported";
    EPROTOTYPE => "protocol wrong type for socket";
    ERANGE => "result too large";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EREMCHG => "remote address changed";
    EREMOTE => "object is remote";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EREMOTEIO => "remote i/o error";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    ERESTART => "interrupted system call should be restarted";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    ERFKILL => "operation not possible due to rf-kill";
    EROFS => "read-only filesystem";
    ESHUTDOWN => "cannot send after transport endpoint shutdown";
    ESPIPE => "invalid seek";
    ESOCKTNOSUPPORT => "socket type not supported";
    ESRCH => "no such process";
    ESTALE => "stale file handle";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    ESTRPIPE => "streams pipe error";
    ETIME => "timer expired";
    ETIMEDOUT => "connection timed out";
    ETOOMANYREFS => "too many references: cannot splice";
    ETXTBSY => "text file busy";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EUCLEAN => "structure needs cleaning";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EUNATCH => "protocol driver not attached";
    EUSERS => "too many users";
    EWOULDBLOCK => "operation would block";
    EXDEV => "invalid cross-device link";
    #[cfg(any(target_os = "linux", target_os = "android"))]
    EXFULL => "exchange full";
}

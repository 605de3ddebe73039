//! Error vocabulary shared by the archive layer and filesystems built on it

use std::io;
use thiserror::Error;

/// Every failure the archive and mount layers can report.
///
/// The set is fixed; archivers and filesystem operations never surface
/// anything outside this enumeration. Host I/O errors are classified into
/// the matching kind, with [`ErrorCode::Io`] catching the remainder.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    #[error("out of memory")]
    OutOfMemory,

    #[error("not initialized")]
    NotInitialized,

    #[error("already initialized")]
    IsInitialized,

    #[error("argv[0] is null")]
    Argv0IsNull,

    #[error("unsupported")]
    Unsupported,

    #[error("past end of file")]
    PastEof,

    #[error("files still open")]
    FilesStillOpen,

    #[error("invalid argument")]
    InvalidArgument,

    #[error("not mounted")]
    NotMounted,

    #[error("not found")]
    NotFound,

    #[error("symlinks are forbidden")]
    SymlinkForbidden,

    #[error("write directory is not set")]
    NoWriteDir,

    #[error("file open for reading")]
    OpenForReading,

    #[error("file open for writing")]
    OpenForWriting,

    #[error("not a file")]
    NotAFile,

    #[error("read-only filesystem")]
    ReadOnly,

    #[error("corrupted")]
    Corrupt,

    #[error("infinite symbolic link loop")]
    SymlinkLoop,

    #[error("i/o error: {0}")]
    Io(io::ErrorKind),

    #[error("permission denied")]
    Permission,

    #[error("no space available for writing")]
    NoSpace,

    #[error("filename is illegal or insecure")]
    BadFilename,

    #[error("tried to modify a file the OS needs")]
    Busy,

    #[error("directory isn't empty")]
    DirNotEmpty,

    #[error("OS reported an error")]
    OsError,

    #[error("duplicate resource")]
    Duplicate,

    #[error("bad password")]
    BadPassword,

    #[error("app callback reported error")]
    AppCallback,

    #[error("unknown error")]
    Other,
}

impl From<io::Error> for ErrorCode {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => ErrorCode::NotFound,
            io::ErrorKind::PermissionDenied => ErrorCode::Permission,
            io::ErrorKind::AlreadyExists => ErrorCode::Duplicate,
            io::ErrorKind::DirectoryNotEmpty => ErrorCode::DirNotEmpty,
            io::ErrorKind::StorageFull => ErrorCode::NoSpace,
            io::ErrorKind::InvalidInput => ErrorCode::InvalidArgument,
            io::ErrorKind::UnexpectedEof => ErrorCode::Corrupt,
            kind => ErrorCode::Io(kind),
        }
    }
}

impl From<ErrorCode> for io::Error {
    fn from(code: ErrorCode) -> Self {
        let kind = match code {
            ErrorCode::NotFound => io::ErrorKind::NotFound,
            ErrorCode::Permission => io::ErrorKind::PermissionDenied,
            ErrorCode::Duplicate => io::ErrorKind::AlreadyExists,
            ErrorCode::DirNotEmpty => io::ErrorKind::DirectoryNotEmpty,
            ErrorCode::NoSpace => io::ErrorKind::StorageFull,
            ErrorCode::InvalidArgument => io::ErrorKind::InvalidInput,
            ErrorCode::PastEof => io::ErrorKind::UnexpectedEof,
            ErrorCode::Io(kind) => kind,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, code)
    }
}

pub type Result<T> = std::result::Result<T, ErrorCode>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_classify_into_fixed_kinds() {
        let err = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(ErrorCode::from(err), ErrorCode::NotFound);

        let err = io::Error::new(io::ErrorKind::PermissionDenied, "no");
        assert_eq!(ErrorCode::from(err), ErrorCode::Permission);

        let err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe");
        assert_eq!(ErrorCode::from(err), ErrorCode::Io(io::ErrorKind::BrokenPipe));
    }

    #[test]
    fn round_trips_through_io_error_keep_the_kind() {
        let io_err = io::Error::from(ErrorCode::NotFound);
        assert_eq!(io_err.kind(), io::ErrorKind::NotFound);
        assert_eq!(ErrorCode::from(io_err), ErrorCode::NotFound);
    }
}

//! Thread-local last-error channel
//!
//! Every fallible public operation reports through `Result`, and in
//! addition records its failure here, per thread. `last_error_code` exists
//! for callers that route results through code which drops the error value
//! (FFI shims, callback plumbing) and want to ask afterwards what went
//! wrong.

use std::cell::Cell;

pub use unpak::error::{ErrorCode, Result};

thread_local! {
    static LAST_ERROR: Cell<Option<ErrorCode>> = const { Cell::new(None) };
}

/// Returns the calling thread's most recent error and clears it. `None`
/// means nothing failed since the last call.
pub fn last_error_code() -> Option<ErrorCode> {
    LAST_ERROR.take()
}

/// Records a failure for the calling thread. Successes pass through without
/// disturbing an error recorded by an earlier call.
pub(crate) fn track<T>(result: Result<T>) -> Result<T> {
    if let Err(code) = &result {
        LAST_ERROR.set(Some(*code));
    }
    result
}

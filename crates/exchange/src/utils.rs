//! Utility macros shared by the exchange crate.

/// Early-returns `Err($error)` when `$predicate` does not hold.
///
/// Works like `assert!`, but for recoverable preconditions: the error is
/// converted with `Into` so a concrete error may be returned from a function
/// that yields the top-level [`HttpError`](crate::protocol::HttpError).
///
/// ```ignore
/// ensure!(!self.replying, ProtocolError::AlreadyReplying);
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error.into());
        }
    };
}

pub(crate) use ensure;

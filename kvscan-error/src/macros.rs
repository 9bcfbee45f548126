/// Returns early with an error (like `anyhow::bail!`).
///
/// Forms:
/// - `bail!(err)`: any type convertible into `StackError`;
/// - `bail!(code, "msg")`: a `GenericError` with the given code;
/// - `bail!(code, "fmt {}", arg)`: formatted message.
///
/// ```ignore
/// use kvscan_error::{bail, StatusCode};
///
/// fn check_count(count: u64) -> kvscan_error::KvResult<()> {
///     if count == 0 {
///         bail!(StatusCode::InvalidArgs, "COUNT must be positive");
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err($crate::StackError::from($err))
    };
    ($code:expr, $msg:expr) => {
        return Err($crate::StackError::new(
            $crate::types::GenericError::new($code, $msg)
        ))
    };
    ($code:expr, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::StackError::new(
            $crate::types::GenericError::new($code, format!($fmt, $($arg)*))
        ))
    };
}

/// Checks a condition and calls `bail!` when it is false.
///
/// Forms mirror `bail!`.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            $crate::bail!($err);
        }
    };
    ($cond:expr, $code:expr, $msg:expr) => {
        if !($cond) {
            $crate::bail!($code, $msg);
        }
    };
    ($cond:expr, $code:expr, $fmt:expr, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($code, $fmt, $($arg)*);
        }
    };
}

/// Extension for `Result` that attaches context frames.
pub trait ResultExt<T> {
    /// Wraps the error into a `StackError` and pushes `ctx`.
    fn context<C>(
        self,
        ctx: C,
    ) -> Result<T, crate::StackError>
    where
        C: Into<String>;

    /// Lazy variant, `f` only runs on error.
    fn with_context<C, F>(
        self,
        f: F,
    ) -> Result<T, crate::StackError>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<crate::StackError>,
{
    #[track_caller]
    fn context<C>(
        self,
        ctx: C,
    ) -> Result<T, crate::StackError>
    where
        C: Into<String>,
    {
        self.map_err(|e| e.into().context(ctx))
    }

    #[track_caller]
    fn with_context<C, F>(
        self,
        f: F,
    ) -> Result<T, crate::StackError>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.into().context(f()))
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CommandError, GenericError, KvResult, StatusCode};

    #[test]
    fn test_bail_simple() {
        fn example() -> KvResult<()> {
            bail!(CommandError::InvalidArgument {
                reason: "empty key".to_string()
            });
        }

        let err = example().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidArgs);
    }

    #[test]
    fn test_bail_with_format() {
        fn example(count: u64) -> KvResult<()> {
            bail!(StatusCode::InvalidArgs, "bad COUNT: {}", count);
        }

        let err = example(0).unwrap_err();
        assert!(err.to_string().contains("bad COUNT: 0"));
    }

    #[test]
    fn test_ensure() {
        fn validate(weights: usize, keys: usize) -> KvResult<()> {
            ensure!(keys > 0, StatusCode::InvalidArgs, "at least one key");
            ensure!(
                weights == 0 || weights == keys,
                StatusCode::InvalidArgs,
                "{} weights for {} keys",
                weights,
                keys
            );
            Ok(())
        }

        assert!(validate(0, 2).is_ok());
        assert!(validate(2, 2).is_ok());
        assert!(validate(1, 2).is_err());
        assert!(validate(0, 0).is_err());
    }

    #[test]
    fn test_result_ext() {
        fn inner() -> Result<(), GenericError> {
            Err(GenericError::new(StatusCode::Internal, "inner error"))
        }

        fn outer() -> KvResult<()> {
            inner().context("outer context")?;
            Ok(())
        }

        let err = outer().unwrap_err();
        assert_eq!(err.contexts().len(), 1);
        assert_eq!(err.contexts()[0].message, "outer context");
    }

    #[test]
    fn test_with_context_lazy() {
        fn example(success: bool) -> KvResult<()> {
            let result: Result<(), GenericError> = if success {
                Ok(())
            } else {
                Err(GenericError::new(StatusCode::Internal, "error"))
            };

            result.with_context(|| format!("attempt success={success}"))?;
            Ok(())
        }

        assert!(example(true).is_ok());
        let err = example(false).unwrap_err();
        assert_eq!(err.contexts()[0].message, "attempt success=false");
    }
}

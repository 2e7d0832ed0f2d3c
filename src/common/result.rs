use crate::common::error::SmokerError;

/// Result alias used across the crate.
pub type SmokerResult<T> = Result<T, SmokerError>;

/// Helper for converting `Option` values at the library boundary.
pub trait OptionExt<T> {
    /// Convert an `Option` into a `SmokerResult` with the given error.
    fn ok_or_smoker(self, error: SmokerError) -> SmokerResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_smoker(self, error: SmokerError) -> SmokerResult<T> {
        self.ok_or(error)
    }
}

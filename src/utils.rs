//! # Utility Functions Module
//!
//! Helpers for building argument lists for external tools.

/// Converts a sequence of string-like items to `Vec<String>`.
///
/// Accepts anything that implements `ToString`, so flags and numeric values
/// can be mixed without repeated `.to_string()` calls.
///
/// # Example
/// ```rust
/// use wao_stager::utils::to_string_vec;
///
/// let quality = 80;
/// let args = to_string_vec(["-q", &quality.to_string()]);
/// assert_eq!(args, vec!["-q", "80"]);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// Builds a `Vec<String>` argument list from mixed expressions.
///
/// # Example
/// ```rust
/// use wao_stager::args;
///
/// let width = 1920;
/// let args = args!["-mw", width];
/// assert_eq!(args, vec!["-mw", "1920"]);
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        $crate::utils::to_string_vec([$($item.to_string()),*])
    };
}

/// Splits a file name into stem and extension (with its leading dot).
///
/// `"photo.web.jpg"` becomes `("photo.web", ".jpg")`; names without a dot
/// keep an empty extension.
pub fn split_file_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(0) | None => (name, ""),
        Some(idx) => name.split_at(idx),
    }
}

/// Configuration for [`parse`](crate::parse).
///
/// # Example
///
/// ```rust
/// use jsonquill::ParseOptions;
///
/// let options = ParseOptions { collect_comments: true, ..Default::default() };
/// let document = jsonquill::parse("[1, 2] // tail", &options);
/// assert_eq!(document.comments().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Record the source range of every comment in
    /// [`JsonDocument::comments`](crate::JsonDocument::comments), in source
    /// order. Default: false.
    pub collect_comments: bool,

    /// Tolerate `//` and `/* */` comments without a diagnostic, as JSONC
    /// documents do. When false, every comment still scans and (if requested)
    /// is collected, but also yields a "Comments are not permitted in JSON."
    /// diagnostic. Default: true.
    pub allow_comments: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            collect_comments: false,
            allow_comments: true,
        }
    }
}

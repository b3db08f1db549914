use thiserror::Error;

/// Everything that can go wrong while loading, caching or releasing a
/// resource.
///
/// `UnsupportedResourceType` and `LoadFailed` are failures of a load.
/// The remaining kinds are warning-class: the operation that produced them
/// was a no-op and the cache is unchanged.
///
/// Cloneable because one in-flight load hands the same outcome to every
/// caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The type name is not a known resource type, or no strategy is
    /// registered for it.
    #[error("Unsupported resource type : {0}")]
    UnsupportedResourceType(String),

    /// The strategy could not produce content for the source `path`.
    #[error("Failed to load resource from : {path} ({reason})")]
    LoadFailed { path: String, reason: String },

    #[error("No cached resource under key : {0}")]
    NotFound(String),

    /// Release on an entry nobody holds.
    #[error("Resource released more often than acquired : {0}")]
    DoubleRelease(String),

    #[error("A resource is already cached under key : {0}")]
    AlreadyCached(String),
}

impl ResourceError {
    /// `true` for the kinds that leave the cache untouched and are only
    /// worth a warning.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            ResourceError::NotFound(_)
                | ResourceError::DoubleRelease(_)
                | ResourceError::AlreadyCached(_)
        )
    }
}

use serde::Serialize;

/// The implementation and test snippets pulled out of a response.
///
/// Either field may be missing when the response did not follow the expected layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedArtifact {
    pub implementation: Option<String>,
    pub test: Option<String>,
}

impl ExtractedArtifact {
    /// True when either snippet is missing.
    pub fn needs_retry(&self) -> bool {
        self.implementation.is_none() || self.test.is_none()
    }

    /// Borrows both snippets when both are present.
    pub fn parts(&self) -> Option<(&str, &str)> {
        match (&self.implementation, &self.test) {
            (Some(implementation), Some(test)) => Some((implementation, test)),
            _ => None,
        }
    }
}

/// Trait for pulling an artifact out of unstructured response text.
pub trait ResponseParser {
    /// Extracts the implementation and test snippets from `text`.
    ///
    /// An absent `text` yields an empty artifact without evaluating any pattern.
    fn extract(&self, text: Option<&str>) -> ExtractedArtifact;
}

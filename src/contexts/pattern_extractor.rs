use crate::data::{ExtractedArtifact, ResponseParser};
use regex::{Regex, RegexBuilder};
use std::fmt;

/// Built-in response layouts the extractor knows how to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Implementation in the first ```<lang> block, test in the second one
    Fenced,
    /// `Implementation:` and `Test:` labeled sections, fences optional
    Labeled,
}

impl ResponseFormat {
    pub const ALL: [ResponseFormat; 2] = [ResponseFormat::Fenced, ResponseFormat::Labeled];

    pub fn name(&self) -> &'static str {
        match self {
            ResponseFormat::Fenced => "fenced",
            ResponseFormat::Labeled => "labeled",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(name))
    }

    /// Returns the (implementation, test) pattern pair for `language`
    pub fn patterns(&self, language: &str) -> (String, String) {
        match self {
            ResponseFormat::Fenced => {
                let fence = format!("```{}[ \\t]*\\r?\\n", regex::escape(&language.to_lowercase()));
                (
                    format!("{fence}(.*?)```"),
                    format!("{fence}.*?```.*?{fence}(.*?)```"),
                )
            }
            ResponseFormat::Labeled => (
                r"(?m)^[#*> \t]*(?i:implementation)[*]*:[*]*[ \t]*\r?\n?(?:```[\w+.-]*[ \t]*\r?\n)?(.*?)(?:```[ \t]*)?\s*^[#*> \t]*(?i:test)[*]*:".to_string(),
                r"(?m)^[#*> \t]*(?i:test)[*]*:[*]*[ \t]*\r?\n?(?:```[\w+.-]*[ \t]*\r?\n)?(.*?)(?:```|\z)".to_string(),
            ),
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Extracts an implementation block and a test block with a configured pattern pair.
///
/// Both patterns are compiled so that `.` also matches line breaks, and the first
/// capture group of each pattern is the extracted snippet.
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    implementation: Regex,
    test: Regex,
}

impl PatternExtractor {
    /// Compiles a pattern pair
    ///
    /// # Arguments
    /// * `implementation` - Pattern whose first capture group is the implementation
    /// * `test` - Pattern whose first capture group is the test case
    pub fn new(implementation: &str, test: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            implementation: compile(implementation)?,
            test: compile(test)?,
        })
    }

    pub fn for_format(format: ResponseFormat, language: &str) -> Result<Self, regex::Error> {
        let (implementation, test) = format.patterns(language);
        Self::new(&implementation, &test)
    }

    pub fn implementation_pattern(&self) -> &str {
        self.implementation.as_str()
    }

    pub fn test_pattern(&self) -> &str {
        self.test.as_str()
    }
}

impl ResponseParser for PatternExtractor {
    fn extract(&self, text: Option<&str>) -> ExtractedArtifact {
        let Some(text) = text else {
            tracing::warn!("Result is None. Skipping extraction.");
            return ExtractedArtifact::default();
        };

        tracing::info!("### Extracting implementation");
        let implementation = first_capture(&self.implementation, text);
        if implementation.is_none() {
            tracing::warn!(
                "Implementation failed to generate or wrong output format. Setting retry to true."
            );
        }

        tracing::info!("### Extracting test case");
        let test = first_capture(&self.test, text);
        if test.is_none() {
            tracing::warn!("Test case failed to generate or wrong output format. Setting retry to true.");
        }

        ExtractedArtifact {
            implementation,
            test,
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .dot_matches_new_line(true)
        .build()
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FENCED_RESPONSE: &str = "Here is a function that removes duplicates:\n\
        ```javascript\n\
        function removeDuplicates(arr) {\n  return [...new Set(arr)];\n}\n\
        ```\n\
        And a test case:\n\
        ```javascript\n\
        console.assert(removeDuplicates([1, 1, 2]).length === 2);\n\
        ```\n";

    fn fenced() -> PatternExtractor {
        PatternExtractor::for_format(ResponseFormat::Fenced, "JavaScript").unwrap()
    }

    fn labeled() -> PatternExtractor {
        PatternExtractor::for_format(ResponseFormat::Labeled, "JavaScript").unwrap()
    }

    #[test]
    fn test_fenced_extracts_both_blocks() {
        let artifact = fenced().extract(Some(FENCED_RESPONSE));

        assert_eq!(
            artifact.implementation.as_deref(),
            Some("function removeDuplicates(arr) {\n  return [...new Set(arr)];\n}")
        );
        assert_eq!(
            artifact.test.as_deref(),
            Some("console.assert(removeDuplicates([1, 1, 2]).length === 2);")
        );
        assert!(!artifact.needs_retry());
    }

    #[test]
    fn test_fenced_missing_test_block() {
        let text = "```javascript\nfunction f() { return 1; }\n```\nNo test, sorry.";
        let artifact = fenced().extract(Some(text));

        assert_eq!(artifact.implementation.as_deref(), Some("function f() { return 1; }"));
        assert_eq!(artifact.test, None);
        assert!(artifact.needs_retry());
    }

    #[test]
    fn test_fenced_ignores_other_languages() {
        let text = "```python\ndef f():\n    pass\n```";
        let artifact = fenced().extract(Some(text));

        assert_eq!(artifact, ExtractedArtifact::default());
        assert!(artifact.needs_retry());
    }

    #[test]
    fn test_absent_text_needs_retry() {
        let artifact = fenced().extract(None);

        assert_eq!(artifact.implementation, None);
        assert_eq!(artifact.test, None);
        assert!(artifact.needs_retry());
    }

    #[test]
    fn test_empty_block_counts_as_missing() {
        let text = "```javascript\n   \n```\n```javascript\nf();\n```";
        let artifact = fenced().extract(Some(text));

        assert_eq!(artifact.implementation, None);
        assert!(artifact.needs_retry());
    }

    #[test]
    fn test_labeled_sections_with_fences() {
        let text = "**Implementation:**\n\
            ```javascript\n\
            function f(a) { const o = {test: 1}; return a; }\n\
            ```\n\n\
            ### Test:\n\
            ```js\n\
            f([1]);\n\
            ```";
        let artifact = labeled().extract(Some(text));

        assert_eq!(
            artifact.implementation.as_deref(),
            Some("function f(a) { const o = {test: 1}; return a; }")
        );
        assert_eq!(artifact.test.as_deref(), Some("f([1]);"));
    }

    #[test]
    fn test_labeled_sections_without_fences() {
        let text = "Implementation:\nfunction f() {}\nTest:\nf();\n";
        let artifact = labeled().extract(Some(text));

        assert_eq!(artifact.implementation.as_deref(), Some("function f() {}"));
        assert_eq!(artifact.test.as_deref(), Some("f();"));
    }

    #[test]
    fn test_labeled_does_not_read_fenced_layout() {
        let artifact = labeled().extract(Some(FENCED_RESPONSE));
        assert!(artifact.needs_retry());
    }

    #[test]
    fn test_custom_pattern_pair() {
        let extractor = PatternExtractor::new(r"<impl>(.*?)</impl>", r"<test>(.*?)</test>").unwrap();
        let artifact = extractor.extract(Some("<impl>\nlet a = 1;\n</impl><test> a; </test>"));

        assert_eq!(artifact.implementation.as_deref(), Some("let a = 1;"));
        assert_eq!(artifact.test.as_deref(), Some("a;"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        assert!(PatternExtractor::new(r"(unclosed", r"(.*)").is_err());
    }

    #[test]
    fn test_language_is_escaped() {
        let extractor = PatternExtractor::for_format(ResponseFormat::Fenced, "C++").unwrap();
        let text = "```c++\nint main() {}\n```\n```c++\nassert(1);\n```";
        let artifact = extractor.extract(Some(text));

        assert_eq!(artifact.implementation.as_deref(), Some("int main() {}"));
        assert_eq!(artifact.test.as_deref(), Some("assert(1);"));
    }

    #[test]
    fn test_format_from_name() {
        assert_eq!(ResponseFormat::from_name("fenced"), Some(ResponseFormat::Fenced));
        assert_eq!(ResponseFormat::from_name("Labeled"), Some(ResponseFormat::Labeled));
        assert_eq!(ResponseFormat::from_name("xml"), None);
    }
}

use scraper::ElementRef;
use serde::Serialize;

/// Owned snapshot of a matched HTML element
///
/// Parsed documents are dropped once a page is extracted, so matches keep
/// everything a postprocessing step may need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedElement {
    /// Lowercase tag name
    pub tag: String,

    /// Attributes as reported by the parser
    pub attrs: Vec<(String, String)>,

    /// Concatenated descendant text
    pub text: String,

    /// Markup of the children
    #[serde(skip)]
    pub inner_html: String,

    /// Markup of the element itself
    #[serde(skip)]
    pub html: String,
}

impl MatchedElement {
    pub fn from_element(element: &ElementRef<'_>) -> Self {
        let value = element.value();
        Self {
            tag: value.name().to_string(),
            attrs: value
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            text: element.text().collect::<String>(),
            inner_html: element.inner_html(),
            html: element.html(),
        }
    }

    /// Returns the value of an attribute, if present
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Text with surrounding whitespace removed
    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }
}

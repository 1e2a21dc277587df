use std::collections::BTreeSet;

/// A video codec known to the decoding backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodecInfo {
    pub id: String,
    pub description: String,
    pub mime_types: BTreeSet<String>,
}

impl CodecInfo {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            mime_types: BTreeSet::new(),
        }
    }

    pub fn with_mime_types<I, S>(mut self, mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mime_types.extend(mime_types.into_iter().map(Into::into));
        self
    }
}

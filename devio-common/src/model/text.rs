use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

/// Trimmed, non-empty body of a post or comment.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct BodyText(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Text is required")]
pub struct EmptyBodyTextError;

impl BodyText {
    pub fn new(text: &str) -> Result<Self, EmptyBodyTextError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Err(EmptyBodyTextError)
        } else {
            Ok(Self(trimmed.to_owned()))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for BodyText {
    type Error = EmptyBodyTextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl<'de> Deserialize<'de> for BodyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        BodyText::new(&inner)
            .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"BodyText"))
    }
}

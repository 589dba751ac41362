use crate::model::Id;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

pub const DISPLAY_NAME_MAX_LEN: usize = 50;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub name: DisplayName,
    pub avatar: Option<String>,
}

/// Name and avatar of an author, copied onto posts and comments when they are
/// written. Later profile edits do not reach existing content.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct DisplaySnapshot {
    pub name: DisplayName,
    pub avatar: Option<String>,
}

impl User {
    #[must_use]
    pub fn display_snapshot(&self) -> DisplaySnapshot {
        DisplaySnapshot {
            name: self.name.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct DisplayName(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The display name is invalid: {0:?}")]
pub struct InvalidDisplayNameError(String);

impl DisplayName {
    pub fn new(name: String) -> Result<Self, InvalidDisplayNameError> {
        let len = name.chars().count();
        if len > 0 && len <= DISPLAY_NAME_MAX_LEN {
            Ok(DisplayName(name))
        } else {
            Err(InvalidDisplayNameError(name))
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

impl<'de> Deserialize<'de> for DisplayName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        DisplayName::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"DisplayName"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::user::{DISPLAY_NAME_MAX_LEN, DisplayName};

    #[test]
    fn display_name_length() {
        assert!(DisplayName::new("ada".to_owned()).is_ok());
        assert!(DisplayName::new(String::new()).is_err());
        assert!(DisplayName::new("é".repeat(DISPLAY_NAME_MAX_LEN)).is_ok());
        assert!(DisplayName::new("x".repeat(DISPLAY_NAME_MAX_LEN + 1)).is_err());
    }
}

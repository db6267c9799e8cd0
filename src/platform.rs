use serde::{Deserialize, Serialize};
use std::fmt;

const DEFAULT_KEY_NAME: &str = "Default";

/// Override scope. `Default` sorts before every named platform.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlatformKey {
    Default,
    Platform(String),
}

impl PlatformKey {
    /// `"Default"` is reserved and always maps to [`PlatformKey::Default`].
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == DEFAULT_KEY_NAME {
            PlatformKey::Default
        } else {
            PlatformKey::Platform(name)
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, PlatformKey::Default)
    }

    pub fn name(&self) -> &str {
        match self {
            PlatformKey::Default => DEFAULT_KEY_NAME,
            PlatformKey::Platform(name) => name,
        }
    }
}

impl From<String> for PlatformKey {
    fn from(name: String) -> Self {
        PlatformKey::named(name)
    }
}

impl From<&str> for PlatformKey {
    fn from(name: &str) -> Self {
        PlatformKey::named(name)
    }
}

impl From<PlatformKey> for String {
    fn from(key: PlatformKey) -> Self {
        match key {
            PlatformKey::Default => DEFAULT_KEY_NAME.to_string(),
            PlatformKey::Platform(name) => name,
        }
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformKeySpace {
    keys: Vec<PlatformKey>,
}

impl PlatformKeySpace {
    /// Keeps first-seen order, drops duplicates, and moves `Default` to the front.
    pub fn new(keys: impl IntoIterator<Item = PlatformKey>) -> Self {
        let mut ordered = vec![PlatformKey::Default];
        for key in keys {
            if !ordered.contains(&key) {
                ordered.push(key);
            }
        }
        Self { keys: ordered }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(PlatformKey::named))
    }

    pub fn keys(&self) -> &[PlatformKey] {
        &self.keys
    }

    pub fn platforms(&self) -> impl Iterator<Item = &PlatformKey> {
        self.keys.iter().filter(|key| !key.is_default())
    }

    pub fn contains(&self, key: &PlatformKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn position(&self, key: &PlatformKey) -> Option<usize> {
        self.keys.iter().position(|candidate| candidate == key)
    }
}

impl Default for PlatformKeySpace {
    fn default() -> Self {
        Self::new(std::iter::empty())
    }
}

//! Bundles of source files, as written by the bundler and kept by storage.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// A set of named source files, in tab order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub files: Vec<BundleFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleFile {
    /// Path relative to the bundle root, e.g. `src/server/server.go`.
    pub name: String,
    pub body: String,
}

impl BundleFile {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }

    /// Final path component, used as the tab label.
    pub fn basename(&self) -> &str {
        Path::new(&self.name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.name)
    }

    /// File extension without the dot, empty if there is none.
    pub fn file_type(&self) -> &str {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
    }
}

impl Bundle {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// A bundle together with the storage id it was loaded from or saved as.
///
/// An empty id denotes the built-in default bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBundle {
    pub id: String,
    pub bundle: Bundle,
}

/// Body returned by the `/load` and `/save` storage endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageResponse {
    #[serde(rename = "Link", default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Bundle JSON, encoded as a string.
    #[serde(rename = "Data", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(rename = "Error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Older storage shape: `{"slug"|"link": id, "data": "<bundle json>"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyBundle {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    pub data: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("legacy bundle has neither slug nor link")]
    MissingId,

    #[error("error parsing bundle data: {0}")]
    Data(#[from] serde_json::Error),
}

impl LegacyBundle {
    /// Map the legacy shape onto a [`StoredBundle`]. `slug` wins over `link`.
    pub fn normalize(self) -> Result<StoredBundle, BundleError> {
        let id = self
            .slug
            .filter(|s| !s.is_empty())
            .or(self.link.filter(|l| !l.is_empty()))
            .ok_or(BundleError::MissingId)?;
        let bundle = Bundle::from_json(&self.data)?;
        Ok(StoredBundle { id, bundle })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_file_names() {
        let file = BundleFile::new("src/server/server.go", "");
        assert_eq!(file.basename(), "server.go");
        assert_eq!(file.file_type(), "go");

        let file = BundleFile::new("Makefile", "");
        assert_eq!(file.basename(), "Makefile");
        assert_eq!(file.file_type(), "");
    }

    #[test]
    fn test_bundle_from_json() {
        let bundle =
            Bundle::from_json(r#"{"files":[{"name":"client.js","body":"x"}]}"#).unwrap();
        assert_eq!(bundle.files, vec![BundleFile::new("client.js", "x")]);
    }

    #[test]
    fn test_normalize_legacy_slug() {
        let legacy: LegacyBundle = serde_json::from_str(
            r#"{"slug":"_abc","link":"_ignored","data":"{\"files\":[{\"name\":\"a.go\",\"body\":\"b\"}]}"}"#,
        )
        .unwrap();
        let stored = legacy.normalize().unwrap();
        assert_eq!(stored.id, "_abc");
        assert_eq!(stored.bundle.files[0], BundleFile::new("a.go", "b"));
    }

    #[test]
    fn test_normalize_legacy_link() {
        let legacy: LegacyBundle =
            serde_json::from_str(r#"{"link":"_def","data":"{\"files\":[]}"}"#).unwrap();
        let stored = legacy.normalize().unwrap();
        assert_eq!(stored.id, "_def");
        assert!(stored.bundle.files.is_empty());
    }

    #[test]
    fn test_normalize_legacy_errors() {
        let legacy: LegacyBundle = serde_json::from_str(r#"{"data":"{\"files\":[]}"}"#).unwrap();
        assert!(matches!(legacy.normalize(), Err(BundleError::MissingId)));

        let legacy: LegacyBundle = serde_json::from_str(r#"{"slug":"_x","data":"nope"}"#).unwrap();
        assert!(matches!(legacy.normalize(), Err(BundleError::Data(_))));
    }
}

//! Compile request body.

use serde::{Deserialize, Serialize};

use crate::Bundle;

/// Body of `POST /compile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub files: Vec<RunFile>,
    /// Always empty; the backend assigns identities itself.
    #[serde(rename = "Identities", default)]
    pub identities: Vec<serde_json::Value>,
}

/// One source file of a compile request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFile {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Body")]
    pub body: String,
}

impl From<&Bundle> for RunRequest {
    fn from(bundle: &Bundle) -> Self {
        Self {
            files: bundle
                .files
                .iter()
                .map(|f| RunFile {
                    name: f.name.clone(),
                    body: f.body.clone(),
                })
                .collect(),
            identities: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BundleFile;

    #[test]
    fn test_request_wire_shape() {
        let bundle = Bundle {
            files: vec![BundleFile::new("a.go", "package main")],
        };
        let body = serde_json::to_string(&RunRequest::from(&bundle)).unwrap();
        assert_eq!(
            body,
            r#"{"files":[{"Name":"a.go","Body":"package main"}],"Identities":[]}"#
        );
    }

    #[test]
    fn test_request_preserves_file_order() {
        let bundle = Bundle {
            files: vec![
                BundleFile::new("src/server/server.go", "s"),
                BundleFile::new("src/client/client.go", "c"),
            ],
        };
        let request = RunRequest::from(&bundle);
        let names: Vec<_> = request.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["src/server/server.go", "src/client/client.go"]);
    }
}

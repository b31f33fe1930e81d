//! Directory listing tool (`FileSystemServer`)

use crate::server::{ToolFailure, ToolHandler, ToolServer, string_arg};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use toolrelay_domain::{ParamType, ToolDescriptor, ToolParameter};

pub struct ListFiles;

#[async_trait]
impl ToolHandler for ListFiles {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("list_files", "List the entries of a directory.").with_parameter(
            ToolParameter::new("directory", "The root directory.", true)
                .with_type(ParamType::String),
        )
    }

    async fn call(&self, arguments: &Map<String, Value>) -> Result<Value, ToolFailure> {
        let directory = string_arg(arguments, "directory")?;

        let mut entries = tokio::fs::read_dir(directory)
            .await
            .map_err(|e| ToolFailure::Domain(format!("Cannot list '{}': {}", directory, e)))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ToolFailure::Domain(format!("Cannot list '{}': {}", directory, e)))?
        {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
        files.sort();

        Ok(json!({ "files": files }))
    }
}

pub fn server() -> ToolServer {
    ToolServer::new("FileSystemServer", env!("CARGO_PKG_VERSION")).with_tool(ListFiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lists_sorted_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let mut arguments = Map::new();
        arguments.insert("directory".into(), json!(dir.path().to_string_lossy()));
        let value = ListFiles.call(&arguments).await.unwrap();
        assert_eq!(value, json!({"files": ["a.txt", "b.txt", "sub"]}));
    }

    #[tokio::test]
    async fn test_missing_directory_is_domain_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut arguments = Map::new();
        arguments.insert(
            "directory".into(),
            json!(dir.path().join("missing").to_string_lossy()),
        );
        assert!(matches!(
            ListFiles.call(&arguments).await,
            Err(ToolFailure::Domain(msg)) if msg.contains("Cannot list")
        ));
    }
}

//! Loading JSON documents from a file or a directory

use crate::domain::{AnonymizerError, Document, JsonDocumentReader, Result};
use std::path::{Path, PathBuf};

/// One input file and its parsed document
#[derive(Debug)]
pub struct InputDocument {
    pub path: PathBuf,
    pub document: Result<Document>,
}

/// List the `.json` files under `input`, or `input` itself when it is a file
///
/// Directory entries are sorted by name so runs are reproducible.
pub fn list_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(input)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file() && path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(AnonymizerError::Configuration(format!(
            "No .json documents found in {}",
            input.display()
        )));
    }
    Ok(paths)
}

/// Read and parse every input; parse failures are kept per file
pub fn read_inputs(input: &Path, reader: &JsonDocumentReader) -> Result<Vec<InputDocument>> {
    let inputs = list_inputs(input)?
        .into_iter()
        .map(|path| {
            let document = std::fs::read_to_string(&path)
                .map_err(AnonymizerError::from)
                .and_then(|content| reader.read_str(&content));
            if let Err(e) = &document {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read document");
            }
            InputDocument { path, document }
        })
        .collect();
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_listing_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let paths = list_inputs(dir.path()).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_inputs(dir.path()).is_err());
    }

    #[test]
    fn test_parse_failures_are_kept_per_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("good.json"),
            r#"{"resourceType": "Patient", "gender": "female"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("bad.json"), "not json").unwrap();

        let inputs = read_inputs(dir.path(), &JsonDocumentReader::new()).unwrap();
        assert_eq!(inputs.len(), 2);
        assert!(inputs[0].document.is_err());
        assert!(inputs[1].document.is_ok());
    }
}

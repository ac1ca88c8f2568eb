//! Artifact path resolution and writing

use std::path::{is_separator, Path, PathBuf};

use crate::error::{GenerateError, Result};

/// Extension of generated artifacts
pub const ARTIFACT_EXTENSION: &str = "prototxt";

/// Final path of the artifact for `output`
///
/// When `output` names a directory (empty, ending in a separator, or an
/// existing directory) the file is named after the model. The `.prototxt`
/// extension is appended whenever the file name carries a different one.
pub fn resolve_output_path(output: &Path, model_name: &str) -> PathBuf {
    let names_directory = output.as_os_str().is_empty()
        || output.to_string_lossy().ends_with(is_separator)
        || output.is_dir();

    let (dir, file) = match (names_directory, output.file_name()) {
        (false, Some(file)) => (
            output.parent().map(Path::to_path_buf).unwrap_or_default(),
            file.to_os_string(),
        ),
        _ => (output.to_path_buf(), model_name.into()),
    };

    let mut file = file;
    if Path::new(&file).extension().map_or(true, |ext| ext != ARTIFACT_EXTENSION) {
        file.push(".");
        file.push(ARTIFACT_EXTENSION);
    }
    dir.join(file)
}

/// Write `text` to `path`, creating the parent directory if needed
pub fn write_artifact(path: &Path, text: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|err| GenerateError::io(dir, err))?;
    }
    std::fs::write(path, text).map_err(|err| GenerateError::io(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_is_kept() {
        assert_eq!(
            resolve_output_path(Path::new("out/net.prototxt"), "Net"),
            PathBuf::from("out/net.prototxt")
        );
    }

    #[test]
    fn test_extension_is_forced() {
        assert_eq!(
            resolve_output_path(Path::new("out/net.txt"), "Net"),
            PathBuf::from("out/net.txt.prototxt")
        );
        assert_eq!(
            resolve_output_path(Path::new("net"), "Net"),
            PathBuf::from("net.prototxt")
        );
    }

    #[test]
    fn test_directory_uses_model_name() {
        assert_eq!(
            resolve_output_path(Path::new("build/"), "ResNet"),
            PathBuf::from("build/ResNet.prototxt")
        );
        assert_eq!(
            resolve_output_path(Path::new(""), "ResNet"),
            PathBuf::from("ResNet.prototxt")
        );
    }

    #[test]
    fn test_existing_directory_uses_model_name() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve_output_path(dir.path(), "Net"),
            dir.path().join("Net.prototxt")
        );
    }

    #[test]
    fn test_write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/net.prototxt");
        write_artifact(&path, "name: \"Net\"\n").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "name: \"Net\"\n");
    }
}

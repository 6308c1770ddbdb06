//! Fragment and template sources for strata.
//!
//! This module provides:
//! - Path configuration: the template root and its conventional
//!   `components/` and `registry/` subdirectories
//! - The [`FragmentSource`] trait: anything able to produce a document
//!   qualifies as a fragment
//! - File loading for YAML and JSON template documents
//! - Template-id resolution for nested-stack placeholders

use crate::document::Document;
use crate::error::{Result, StrataError};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// File extensions recognized as template documents, in lookup order.
const TEMPLATE_EXTENSIONS: &[&str] = &["yml", "yaml", "json"];

/// Conventional components directory name under the template root.
const COMPONENTS_DIRECTORY: &str = "components";

/// Conventional shortcut-registry directory name under the template root.
const REGISTRY_DIRECTORY: &str = "registry";

/// Resolved paths for a template tree.
///
/// Defaults are derived from the root; either subdirectory can be pointed
/// elsewhere.
#[derive(Debug, Clone)]
pub struct TemplatePaths {
    root: PathBuf,
    components_dir: PathBuf,
    registry_dir: PathBuf,
}

impl TemplatePaths {
    /// Paths rooted at a template directory, with conventional
    /// subdirectories.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        TemplatePaths {
            components_dir: root.join(COMPONENTS_DIRECTORY),
            registry_dir: root.join(REGISTRY_DIRECTORY),
            root,
        }
    }

    /// Use a custom components directory.
    pub fn with_components_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.components_dir = dir.into();
        self
    }

    /// Use a custom shortcut-registry directory.
    pub fn with_registry_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.registry_dir = dir.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn components_dir(&self) -> &Path {
        &self.components_dir
    }

    pub fn registry_dir(&self) -> &Path {
        &self.registry_dir
    }

    /// Locate a component file by name, trying each recognized extension.
    pub fn component_file(&self, name: &str) -> Result<PathBuf> {
        for extension in TEMPLATE_EXTENSIONS {
            let candidate = self.components_dir.join(format!("{name}.{extension}"));
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(StrataError::NotFound(format!(
            "component '{}' not found under '{}'",
            name,
            self.components_dir.display()
        )))
    }
}

/// Anything able to produce a document qualifies as a fragment source.
///
/// Production happens once, at load time; a formation never consults the
/// source again on recompile.
pub trait FragmentSource {
    fn produce(&self) -> Result<Document>;
}

impl FragmentSource for Document {
    fn produce(&self) -> Result<Document> {
        Ok(self.clone())
    }
}

/// A YAML or JSON template file acting as a fragment source.
#[derive(Debug, Clone)]
pub struct ComponentFile {
    path: PathBuf,
}

impl ComponentFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ComponentFile { path: path.into() }
    }
}

impl FragmentSource for ComponentFile {
    fn produce(&self) -> Result<Document> {
        load_document_file(&self.path)
    }
}

/// Load a YAML or JSON file into a document.
pub fn load_document_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        StrataError::NotFound(format!(
            "failed to read template file '{}': {}",
            path.display(),
            e
        ))
    })?;
    let value: Value = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|e| {
            StrataError::Validation(format!(
                "malformed JSON template '{}': {}",
                path.display(),
                e
            ))
        })?,
        _ => serde_yaml::from_str(&content).map_err(|e| {
            StrataError::Validation(format!(
                "malformed YAML template '{}': {}",
                path.display(),
                e
            ))
        })?,
    };
    Ok(Document::from_value(&value))
}

/// Resolve a template id to a file under the template root.
///
/// Double underscores in the id separate directories; dashes in file names
/// match underscores in the id. The components and registry directories do
/// not hold deployable templates and are skipped. Failure enumerates every
/// discoverable template id.
pub fn resolve_template(paths: &TemplatePaths, template_id: &str) -> Result<PathBuf> {
    let wanted = template_id.replace("__", "/");
    let mut found: Vec<(String, PathBuf)> = Vec::new();
    collect_template_files(paths.root(), paths, &mut found)?;

    if let Some((_, path)) = found.iter().find(|(id, _)| *id == wanted) {
        return Ok(path.clone());
    }

    let mut ids: Vec<&str> = found.iter().map(|(id, _)| id.as_str()).collect();
    ids.sort_unstable();
    Err(StrataError::Lookup(format!(
        "failed to locate nested template '{}' (valid: {})",
        template_id,
        ids.join(", ")
    )))
}

/// Recursively collect template files under a directory, keyed by
/// normalized id (relative path without extension, dashes as underscores).
fn collect_template_files(
    dir: &Path,
    paths: &TemplatePaths,
    found: &mut Vec<(String, PathBuf)>,
) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| {
        StrataError::NotFound(format!(
            "failed to read template directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let mut children: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|e| StrataError::NotFound(format!("failed to read directory entry: {e}")))?;
        children.push(entry.path());
    }
    children.sort();

    for path in children {
        if path.is_dir() {
            if path == paths.components_dir() || path == paths.registry_dir() {
                continue;
            }
            collect_template_files(&path, paths, found)?;
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some(ext) if TEMPLATE_EXTENSIONS.contains(&ext)
        ) {
            let relative = path.strip_prefix(paths.root()).unwrap_or(&path);
            let id = relative
                .with_extension("")
                .to_string_lossy()
                .replace('\\', "/")
                .replace('-', "_");
            found.push((id, path));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_paths_derive_conventional_subdirectories() {
        let paths = TemplatePaths::new("/tmp/templates");
        assert_eq!(paths.components_dir(), Path::new("/tmp/templates/components"));
        assert_eq!(paths.registry_dir(), Path::new("/tmp/templates/registry"));
    }

    #[test]
    fn test_component_file_extension_lookup_order() {
        let dir = tempfile::tempdir().unwrap();
        let components = dir.path().join("components");
        fs::create_dir_all(&components).unwrap();
        fs::write(components.join("base.yaml"), "{}").unwrap();
        fs::write(components.join("base.json"), "{}").unwrap();

        let paths = TemplatePaths::new(dir.path());
        let file = paths.component_file("base").unwrap();
        assert_eq!(file.extension().and_then(|e| e.to_str()), Some("yaml"));
    }

    #[test]
    fn test_component_file_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let paths = TemplatePaths::new(dir.path());
        let err = paths.component_file("missing").unwrap_err();
        assert!(matches!(err, StrataError::NotFound(_)));
    }

    #[test]
    fn test_load_yaml_document() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bucket.yml");
        fs::write(
            &file,
            "Resources:\n  Bucket:\n    Type: AWS::S3::Bucket\n",
        )
        .unwrap();

        let doc = load_document_file(&file).unwrap();
        assert_eq!(
            doc.dump(),
            json!({"Resources": {"Bucket": {"Type": "AWS::S3::Bucket"}}})
        );
    }

    #[test]
    fn test_load_json_document_recognizes_intrinsics() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("outputs.json");
        fs::write(
            &file,
            r#"{"Outputs": {"Name": {"Value": {"Ref": "Bucket"}}}}"#,
        )
        .unwrap();

        let doc = load_document_file(&file).unwrap();
        assert_eq!(
            doc.dump(),
            json!({"Outputs": {"Name": {"Value": {"Ref": "Bucket"}}}})
        );
    }

    #[test]
    fn test_load_malformed_yaml_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("broken.yml");
        fs::write(&file, "a: [unclosed").unwrap();
        let err = load_document_file(&file).unwrap_err();
        assert!(matches!(err, StrataError::Validation(_)));
    }

    #[test]
    fn test_document_is_its_own_fragment_source() {
        let mut doc = Document::new();
        doc.set(&["Resources", "A", "Type"], "AWS::S3::Bucket");
        let produced = doc.produce().unwrap();
        assert_eq!(produced, doc);
    }

    #[test]
    fn test_resolve_template_with_directory_separator() {
        let dir = tempfile::tempdir().unwrap();
        let network = dir.path().join("network");
        fs::create_dir_all(&network).unwrap();
        fs::write(network.join("vpc.yml"), "{}").unwrap();

        let paths = TemplatePaths::new(dir.path());
        let file = resolve_template(&paths, "network__vpc").unwrap();
        assert_eq!(file, network.join("vpc.yml"));
    }

    #[test]
    fn test_resolve_template_dashes_match_underscores() {
        let dir = tempfile::tempdir().unwrap();
        let network = dir.path().join("network");
        fs::create_dir_all(&network).unwrap();
        fs::write(network.join("my-subnet.yml"), "{}").unwrap();

        let paths = TemplatePaths::new(dir.path());
        let file = resolve_template(&paths, "network__my_subnet").unwrap();
        assert_eq!(file, network.join("my-subnet.yml"));
    }

    #[test]
    fn test_resolve_template_skips_components_and_registry() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("components")).unwrap();
        fs::write(dir.path().join("components/vpc.yml"), "{}").unwrap();
        fs::write(dir.path().join("top.yml"), "{}").unwrap();

        let paths = TemplatePaths::new(dir.path());
        let err = resolve_template(&paths, "vpc").unwrap_err();
        match err {
            StrataError::Lookup(msg) => {
                assert!(msg.contains("valid: top"), "{msg}");
                assert!(!msg.contains("components"), "{msg}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_template_missing_enumerates_ids() {
        let dir = tempfile::tempdir().unwrap();
        let network = dir.path().join("network");
        fs::create_dir_all(&network).unwrap();
        fs::write(network.join("vpc.yml"), "{}").unwrap();
        fs::write(dir.path().join("app.json"), "{}").unwrap();

        let paths = TemplatePaths::new(dir.path());
        let err = resolve_template(&paths, "nope").unwrap_err();
        match err {
            StrataError::Lookup(msg) => {
                assert!(msg.contains("valid: app, network/vpc"), "{msg}")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

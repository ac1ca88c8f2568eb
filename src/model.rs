//! The model: a root composite plus global parameters

use std::path::Path;

use chrono::{Local, NaiveDateTime};
use tracing::info;

use crate::block::{Cursor, CompositeBlock, LoadContext};
use crate::config::GenerateConfig;
use crate::error::Result;
use crate::output::write_artifact;
use crate::params::ParameterSet;

/// Timestamp format of the `# GENERATED` header line
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H-%M";

/// A generated network description
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    params: ParameterSet,
    root: Option<CompositeBlock>,
    outputs: Cursor,
    max_depth: usize,
}

impl Model {
    /// Create a model with global parameters and default settings
    pub fn new(params: ParameterSet) -> Self {
        Self::with_config(&GenerateConfig::new().with_params(params))
    }

    pub fn with_config(config: &GenerateConfig) -> Self {
        Self {
            name: config.default_name.clone(),
            params: config.params.clone(),
            root: None,
            outputs: Cursor::new(),
            max_depth: config.max_depth,
        }
    }

    /// Load the root composite file and everything below it
    ///
    /// The model adopts the root file's `name` when it declares one.
    pub fn load(&mut self, file: impl AsRef<Path>) -> Result<()> {
        let file = file.as_ref();
        let mut root = CompositeBlock::new(self.params.clone());
        let mut ctx = LoadContext::new(self.max_depth);
        self.outputs = root.load(file, Cursor::new(), "", &mut ctx)?;

        if let Some(name) = root.name() {
            self.name = name.to_string();
        }
        info!(
            model = %self.name,
            file = %file.display(),
            outputs = ?self.outputs.outputs,
            "model loaded"
        );
        self.root = Some(root);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root parameters, including defaults declared by the root file once loaded
    pub fn parameters(&self) -> &ParameterSet {
        self.root
            .as_ref()
            .map_or(&self.params, CompositeBlock::parameters)
    }

    /// Cursor left by the last block of the root composite
    pub fn outputs(&self) -> &Cursor {
        &self.outputs
    }

    pub fn root(&self) -> Option<&CompositeBlock> {
        self.root.as_ref()
    }

    /// Render the artifact stamped with the current local time
    pub fn generate(&self) -> String {
        self.generate_at(Local::now().naive_local())
    }

    /// Render the artifact stamped with `timestamp`
    pub fn generate_at(&self, timestamp: NaiveDateTime) -> String {
        let mut header = String::from("# PARAMS:");
        for (key, value) in self.parameters().iter() {
            header.push_str(&format!("\n# {:<10}: {}", key, value));
        }
        let body = self.root.as_ref().map(CompositeBlock::generate).unwrap_or_default();
        format!(
            "name: \"{}\"\n{}\n\n# GENERATED : {}\n\n{}",
            self.name,
            header,
            timestamp.format(TIMESTAMP_FORMAT),
            body
        )
    }

    /// Render and write the artifact to `path`
    pub fn store(&self, path: &Path) -> Result<()> {
        write_artifact(path, &self.generate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(12, 5, 0))
            .expect("valid timestamp")
    }

    #[test]
    fn test_unloaded_model_header() {
        let params: ParameterSet = [("NUM", "64"), ("DEPTH", "3")].into_iter().collect();
        let model = Model::new(params);
        assert_eq!(model.name(), "DefaultNet");
        insta::assert_snapshot!(model.generate_at(noon()).trim_end(), @r###"
        name: "DefaultNet"
        # PARAMS:
        # NUM       : 64
        # DEPTH     : 3

        # GENERATED : 2024-03-09 12-05
        "###);
    }

    #[test]
    fn test_store_creates_directories() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("nested/out/net.prototxt");
        Model::new(ParameterSet::new()).store(&path).expect("Should store");

        let written = std::fs::read_to_string(&path).expect("Should read back");
        assert!(written.starts_with("name: \"DefaultNet\"\n# PARAMS:\n"));
        assert!(written.contains("# GENERATED : "));
    }

    #[test]
    fn test_default_name_from_config() {
        let model = Model::with_config(&GenerateConfig::new().with_default_name("Net"));
        assert!(model.generate_at(noon()).starts_with("name: \"Net\"\n# PARAMS:\n\n"));
    }
}

//! protogen - Caffe prototxt generation from composable templates
//!
//! A model is described by a tree of YAML files (composite blocks) whose
//! leaves are prototxt templates. Loading the tree resolves `::NAME`
//! parameter references, expands repeated blocks, qualifies layer names with
//! their tree path and wires each block's inputs to the outputs of the
//! previous one.
//!
//! # Example
//!
//! ```rust,no_run
//! use protogen::{generate_with_config, GenerateConfig};
//!
//! let config = GenerateConfig::new().with_param("NUM", "64");
//! let prototxt = generate_with_config("models/resnet.yaml", &config).unwrap();
//! assert!(prototxt.starts_with("name: "));
//! ```

pub mod block;
pub mod config;
pub mod error;
pub mod expr;
pub mod model;
pub mod output;
pub mod params;
pub mod template;

pub use block::{Block, CompositeBlock, Cursor, LeafBlock};
pub use config::{GenerateConfig, Settings, SettingsError};
pub use error::{GenerateError, Result};
pub use expr::{ExpressionError, Value};
pub use model::Model;
pub use output::{resolve_output_path, write_artifact};
pub use params::{resolve_references, ParameterSet};

use std::path::{Path, PathBuf};

/// Load the model rooted at `path`
pub fn load_model(path: impl AsRef<Path>, config: &GenerateConfig) -> Result<Model> {
    let mut model = Model::with_config(config);
    model.load(path)?;
    Ok(model)
}

/// Generate the prototxt for the model rooted at `path` with default configuration
pub fn generate(path: impl AsRef<Path>) -> Result<String> {
    generate_with_config(path, &GenerateConfig::default())
}

/// Generate the prototxt for the model rooted at `path`
pub fn generate_with_config(path: impl AsRef<Path>, config: &GenerateConfig) -> Result<String> {
    Ok(load_model(path, config)?.generate())
}

/// Generate the model rooted at `path` and write it under `output`
///
/// The artifact is rendered completely before anything is written, so a
/// failing model leaves no file behind. Returns the path written.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use protogen::{generate_to_file, GenerateConfig};
///
/// let written = generate_to_file(
///     "models/resnet.yaml",
///     Path::new("build/"),
///     &GenerateConfig::default(),
/// )
/// .unwrap();
/// println!("Model generated: {}", written.display());
/// ```
pub fn generate_to_file(
    path: impl AsRef<Path>,
    output: &Path,
    config: &GenerateConfig,
) -> Result<PathBuf> {
    let model = load_model(path, config)?;
    let target = resolve_output_path(output, model.name());
    model.store(&target)?;
    Ok(target)
}

//! Save/load a whole model builder as JSON.
//!
//! The model file is the portable representation of a builder:
//! - the prepared three-series table
//! - the cached lag selection (if any)
//! - the fitted model (if any)
//!
//! The schema is defined by `domain::ModelFile`. Loading restores the exact
//! state, so a loaded builder forecasts identically to the one that was saved.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::domain::ModelFile;
use crate::error::AppError;
use crate::var::{MODEL_FILE_TOOL, VarModelBuilder};

/// Write a builder to a model JSON file.
pub fn save_model(path: &Path, builder: &VarModelBuilder) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create model file '{}': {e}", path.display())))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &builder.to_model_file())
        .map_err(|e| AppError::new(2, format!("Failed to write model file: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write model file: {e}")))?;

    info!(path = %path.display(), fitted = builder.is_fitted(), "model saved");
    Ok(())
}

/// Read a builder back from a model JSON file.
pub fn load_model(path: &Path) -> Result<VarModelBuilder, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open model file '{}': {e}", path.display())))?;
    let model_file: ModelFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid model file: {e}")))?;

    if model_file.tool != MODEL_FILE_TOOL {
        return Err(AppError::new(
            2,
            format!("Model file was written by '{}', expected '{MODEL_FILE_TOOL}'.", model_file.tool),
        ));
    }

    let builder = VarModelBuilder::from_model_file(model_file)?;
    info!(path = %path.display(), fitted = builder.is_fitted(), "model loaded");
    Ok(builder)
}

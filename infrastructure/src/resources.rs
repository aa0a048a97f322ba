//! Rubric and calibration example loading
//!
//! Both resources are read once at startup and held immutable. Validation
//! happens here so a broken deployment fails before the first grading run:
//! a rubric missing scoring anchors or a blank calibration file is a
//! descriptive configuration error, not a runtime surprise.

use crate::config::FileResourcesConfig;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use tribunal_domain::{CalibrationSet, DomainError, RaterId, Rubric};

/// Errors loading grading resources from disk
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("resource file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read resource file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid resource {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: DomainError,
    },
}

fn read_resource(path: &Path) -> Result<String, ResourceError> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ResourceError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ResourceError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Load and validate the shared rubric
pub fn load_rubric(path: &Path) -> Result<Rubric, ResourceError> {
    let text = read_resource(path)?;
    let rubric = Rubric::new(text).map_err(|source| ResourceError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), bytes = rubric.text().len(), "rubric loaded");
    Ok(rubric)
}

/// Load the per-rater calibration example files
pub fn load_calibration_set(
    config: &FileResourcesConfig,
) -> Result<CalibrationSet, ResourceError> {
    let mut examples = BTreeMap::new();
    for rater in RaterId::ALL {
        let path = config.calibration.for_rater(rater);
        examples.insert(rater, read_resource(path)?);
    }

    let set = CalibrationSet::new(examples).map_err(|source| {
        // MissingCalibration names the rater; report the matching file
        let path = match &source {
            DomainError::MissingCalibration(label) => RaterId::ALL
                .iter()
                .find(|r| r.label() == label)
                .map(|r| config.calibration.for_rater(*r).clone())
                .unwrap_or_default(),
            _ => PathBuf::new(),
        };
        ResourceError::Invalid { path, source }
    })?;

    info!("calibration examples loaded for all raters");
    Ok(set)
}

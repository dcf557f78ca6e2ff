//! Reading and writing scene files.
//!
//! Loading sniffs the document and dispatches to the matching reader:
//!
//! 1. `openlabel.metadata.schema_version` present: OpenLABEL 1.0.
//! 2. `metadata.project_id == "trains_4"` with `coordinateSystems` and
//!    `frames`: the understand.ai predecessor format, converted to
//!    OpenLABEL records first.
//!
//! Anything else is rejected with
//! [`UnsupportedFormat`](RaillabelError::UnsupportedFormat). Saving always
//! writes OpenLABEL.
//!
//! Recoverable deviations never fail an operation; they are appended to the
//! caller's [`Warnings`].

mod attributes;
mod entries;
mod openlabel_json;
mod schema;
mod understand_ai_json;

use std::fs::{self, File};
use std::io::{BufWriter, Write as _};
use std::path::Path;

use serde_json::Value;

use crate::error::RaillabelError;
use crate::model::Scene;
use crate::warnings::Warnings;

pub use schema::{RequiredFieldsValidator, SchemaValidator};
pub use understand_ai_json::{translate_sensor_id, PROJECT_ID as UNDERSTAND_AI_PROJECT_ID};
pub(crate) use openlabel_json::parse_timestamp;

/// A recognised input dialect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    OpenLabel,
    UnderstandAi,
}

impl InputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputFormat::OpenLabel => "openlabel",
            InputFormat::UnderstandAi => "understand_ai",
        }
    }
}

/// Identifies the dialect of a parsed JSON document.
pub fn detect_format(document: &Value) -> Option<InputFormat> {
    if document.pointer("/openlabel/metadata/schema_version").is_some() {
        Some(InputFormat::OpenLabel)
    } else if understand_ai_json::is_understand_ai(document) {
        Some(InputFormat::UnderstandAi)
    } else {
        None
    }
}

/// Options for loading.
#[derive(Clone, Copy, Default)]
pub struct LoadOptions<'a> {
    /// Runs on the OpenLABEL document before conversion. Predecessor
    /// documents are validated after their conversion to OpenLABEL.
    pub validator: Option<&'a dyn SchemaValidator>,
}

/// Options for saving.
#[derive(Clone, Copy, Default)]
pub struct SaveOptions<'a> {
    /// Indent the output. Field order is unaffected.
    pub pretty: bool,
    /// Runs on the generated document before it is written.
    pub validator: Option<&'a dyn SchemaValidator>,
}

impl SaveOptions<'_> {
    /// Default options with indentation enabled.
    pub fn pretty() -> Self {
        Self {
            pretty: true,
            validator: None,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Reads a scene file.
///
/// # Errors
/// [`RaillabelError::Io`] if the file cannot be read, otherwise see
/// [`from_slice`].
pub fn load(path: &Path, warnings: &mut Warnings) -> Result<Scene, RaillabelError> {
    load_with(path, &LoadOptions::default(), warnings)
}

/// Reads a scene file with explicit options.
pub fn load_with(
    path: &Path,
    options: &LoadOptions<'_>,
    warnings: &mut Warnings,
) -> Result<Scene, RaillabelError> {
    let bytes = fs::read(path)?;
    read_document(&bytes, path, options, warnings)
}

/// Reads a scene from a JSON string.
pub fn from_str(json: &str, warnings: &mut Warnings) -> Result<Scene, RaillabelError> {
    read_document(
        json.as_bytes(),
        Path::new("<string>"),
        &LoadOptions::default(),
        warnings,
    )
}

/// Reads a scene from JSON bytes.
///
/// # Errors
/// - [`RaillabelError::Parse`] for malformed JSON.
/// - [`RaillabelError::Schema`] for documents violating the mandatory shape.
/// - [`RaillabelError::UnsupportedFormat`] for unrecognised documents.
pub fn from_slice(bytes: &[u8], warnings: &mut Warnings) -> Result<Scene, RaillabelError> {
    from_slice_with(bytes, &LoadOptions::default(), warnings)
}

/// Reads a scene from JSON bytes with explicit options.
pub fn from_slice_with(
    bytes: &[u8],
    options: &LoadOptions<'_>,
    warnings: &mut Warnings,
) -> Result<Scene, RaillabelError> {
    read_document(bytes, Path::new("<bytes>"), options, warnings)
}

fn read_document(
    bytes: &[u8],
    path: &Path,
    options: &LoadOptions<'_>,
    warnings: &mut Warnings,
) -> Result<Scene, RaillabelError> {
    let document: Value = serde_json::from_slice(bytes).map_err(|source| RaillabelError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let format = match detect_format(&document) {
        Some(format) => format,
        None if document.get("openlabel").is_some() => {
            return Err(RaillabelError::schema(
                path,
                "$.openlabel.metadata.schema_version: missing required field",
            ));
        }
        None => {
            return Err(RaillabelError::UnsupportedFormat {
                path: path.to_path_buf(),
                message: "document is neither OpenLABEL nor an understand.ai trains_4 export"
                    .to_string(),
            });
        }
    };

    let scene = match format {
        InputFormat::OpenLabel => {
            if let Some(validator) = options.validator {
                run_validator(validator, &document, path)?;
            }
            drop(document);
            openlabel_json::read_slice(bytes, path, warnings)?
        }
        InputFormat::UnderstandAi => {
            drop(document);
            let converted = understand_ai_json::read_slice(bytes, path, warnings)?;
            if let Some(validator) = options.validator {
                let root = openlabel_json::JsonRoot {
                    openlabel: converted,
                };
                let document = to_document(&root, path)?;
                run_validator(validator, &document, path)?;
                openlabel_json::json_to_scene(root.openlabel, path, warnings)?
            } else {
                openlabel_json::json_to_scene(converted, path, warnings)?
            }
        }
    };

    tracing::debug!(
        path = %path.display(),
        format = format.as_str(),
        sensors = scene.sensors.len(),
        objects = scene.objects.len(),
        frames = scene.frames.len(),
        warnings = warnings.len(),
        "loaded scene"
    );
    Ok(scene)
}

// ============================================================================
// Saving
// ============================================================================

/// Writes a scene as OpenLABEL JSON.
///
/// # Errors
/// - [`RaillabelError::Schema`] if the scene has dangling references or
///   the validator rejects the output.
/// - [`RaillabelError::UnsupportedAttributeType`] for unwritable attributes.
/// - [`RaillabelError::Io`] / [`RaillabelError::Write`] on write failure.
pub fn save(
    scene: &Scene,
    path: &Path,
    options: &SaveOptions<'_>,
    warnings: &mut Warnings,
) -> Result<(), RaillabelError> {
    let root = build_document(scene, path, options, warnings)?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let written = if options.pretty {
        serde_json::to_writer_pretty(&mut writer, &root)
    } else {
        serde_json::to_writer(&mut writer, &root)
    };
    written.map_err(|source| RaillabelError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush()?;

    tracing::debug!(
        path = %path.display(),
        frames = scene.frames.len(),
        warnings = warnings.len(),
        "saved scene"
    );
    Ok(())
}

/// Serializes a scene to OpenLABEL JSON bytes.
pub fn to_vec(
    scene: &Scene,
    options: &SaveOptions<'_>,
    warnings: &mut Warnings,
) -> Result<Vec<u8>, RaillabelError> {
    let path = Path::new("<bytes>");
    let root = build_document(scene, path, options, warnings)?;
    let bytes = if options.pretty {
        serde_json::to_vec_pretty(&root)
    } else {
        serde_json::to_vec(&root)
    };
    bytes.map_err(|source| RaillabelError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Serializes a scene to an OpenLABEL JSON string.
pub fn to_string(
    scene: &Scene,
    options: &SaveOptions<'_>,
    warnings: &mut Warnings,
) -> Result<String, RaillabelError> {
    let path = Path::new("<string>");
    let root = build_document(scene, path, options, warnings)?;
    let text = if options.pretty {
        serde_json::to_string_pretty(&root)
    } else {
        serde_json::to_string(&root)
    };
    text.map_err(|source| RaillabelError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn build_document(
    scene: &Scene,
    path: &Path,
    options: &SaveOptions<'_>,
    warnings: &mut Warnings,
) -> Result<openlabel_json::JsonRoot, RaillabelError> {
    let root = openlabel_json::scene_to_json(scene, path, warnings)?;
    if let Some(validator) = options.validator {
        let document = to_document(&root, path)?;
        run_validator(validator, &document, path)?;
    }
    Ok(root)
}

fn to_document(root: &openlabel_json::JsonRoot, path: &Path) -> Result<Value, RaillabelError> {
    serde_json::to_value(root).map_err(|source| RaillabelError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn run_validator(
    validator: &dyn SchemaValidator,
    document: &Value,
    path: &Path,
) -> Result<(), RaillabelError> {
    validator
        .validate(document)
        .map_err(|issues| RaillabelError::Schema {
            path: path.to_path_buf(),
            issues,
        })
}

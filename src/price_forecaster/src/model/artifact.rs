//! On-disk model artifacts.
//!
//! Binary layout (any extension other than `.json`):
//!
//! | bytes  | content                                         |
//! |--------|-------------------------------------------------|
//! | 0..8   | magic `PXFCAST\0`                               |
//! | 8..12  | format version, `u32` little endian             |
//! | 12..   | [`ModelSpec`] encoded with bincode (standard)   |
//!
//! A `.json` path holds the whole [`ModelArtifact`] as JSON instead, which is
//! handy for hand-written fixtures.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    errors::ArtifactError,
    model::{Forecaster, ModelSpec},
};

/// Leading bytes of every binary artifact.
pub const ARTIFACT_MAGIC: [u8; 8] = *b"PXFCAST\0";

/// The only artifact format version this build reads and writes.
pub const FORMAT_VERSION: u32 = 1;

const MAX_PAYLOAD_BYTES: usize = 64 * 1024 * 1024;

/// A persisted model plus the format version it was written with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Format version; see [`FORMAT_VERSION`].
    pub format_version: u32,
    /// The fitted backend.
    pub model: ModelSpec,
}

impl ModelArtifact {
    /// Wraps a model at the current format version.
    pub fn new(model: impl Into<ModelSpec>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            model: model.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Binary,
    Json,
}

impl Encoding {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Encoding::Json,
            _ => Encoding::Binary,
        }
    }
}

#[derive(Deserialize)]
struct VersionHeader {
    format_version: u32,
}

fn bincode_config() -> impl bincode::config::Config {
    bincode::config::standard().with_limit::<{ MAX_PAYLOAD_BYTES }>()
}

fn check_version(found: u32) -> Result<(), ArtifactError> {
    if found == FORMAT_VERSION {
        Ok(())
    } else {
        Err(ArtifactError::UnsupportedVersion {
            found,
            supported: FORMAT_VERSION,
        })
    }
}

/// Loads the artifact at `path` and returns its model behind [`Forecaster`].
///
/// # Errors
///
/// * [`ArtifactError::NotFound`] / [`ArtifactError::Io`] - the file is missing or unreadable
/// * [`ArtifactError::BadMagic`], [`ArtifactError::UnsupportedVersion`],
///   [`ArtifactError::Deserialize`] - the contents are not a compatible artifact
/// * [`ArtifactError::InvalidModel`] - the artifact decodes to an unusable model
pub fn load_model(path: impl AsRef<Path>) -> Result<Box<dyn Forecaster>, ArtifactError> {
    let path = path.as_ref();
    let artifact = read_artifact(path)?;
    artifact
        .model
        .validate()
        .map_err(ArtifactError::InvalidModel)?;

    info!(
        path = %path.display(),
        kind = artifact.model.kind(),
        "loaded model artifact"
    );
    Ok(artifact.model.into_forecaster())
}

/// Reads and decodes an artifact without validating the model inside.
pub fn read_artifact(path: impl AsRef<Path>) -> Result<ModelArtifact, ArtifactError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| ArtifactError::from_io(path.to_path_buf(), e))?;
    debug!(path = %path.display(), bytes = bytes.len(), "read model artifact");

    match Encoding::for_path(path) {
        Encoding::Binary => decode_binary(path, &bytes),
        Encoding::Json => decode_json(&bytes),
    }
}

/// Writes `artifact` to `path`, picking the encoding from the extension.
pub fn save_model(path: impl AsRef<Path>, artifact: &ModelArtifact) -> Result<(), ArtifactError> {
    let path = path.as_ref();
    let bytes = match Encoding::for_path(path) {
        Encoding::Binary => encode_binary(artifact)?,
        Encoding::Json => serde_json::to_vec_pretty(artifact)
            .map_err(|e| ArtifactError::Serialize(e.to_string()))?,
    };
    fs::write(path, bytes).map_err(|source| ArtifactError::Io {
        path: PathBuf::from(path),
        source,
    })?;

    info!(path = %path.display(), kind = artifact.model.kind(), "saved model artifact");
    Ok(())
}

fn encode_binary(artifact: &ModelArtifact) -> Result<Vec<u8>, ArtifactError> {
    let payload = bincode::serde::encode_to_vec(&artifact.model, bincode_config())
        .map_err(|e| ArtifactError::Serialize(e.to_string()))?;

    let mut bytes = Vec::with_capacity(ARTIFACT_MAGIC.len() + 4 + payload.len());
    bytes.extend_from_slice(&ARTIFACT_MAGIC);
    bytes.extend_from_slice(&artifact.format_version.to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

fn decode_binary(path: &Path, bytes: &[u8]) -> Result<ModelArtifact, ArtifactError> {
    let Some(rest) = bytes.strip_prefix(ARTIFACT_MAGIC.as_slice()) else {
        return Err(ArtifactError::BadMagic {
            path: path.to_path_buf(),
        });
    };
    let Some((version, payload)) = rest.split_first_chunk::<4>() else {
        return Err(ArtifactError::Deserialize(
            "truncated header: missing format version".to_string(),
        ));
    };

    let format_version = u32::from_le_bytes(*version);
    check_version(format_version)?;

    let (model, read): (ModelSpec, usize) =
        bincode::serde::decode_from_slice(payload, bincode_config())
            .map_err(|e| ArtifactError::Deserialize(e.to_string()))?;
    if read != payload.len() {
        return Err(ArtifactError::Deserialize(format!(
            "{} trailing bytes after model payload",
            payload.len() - read
        )));
    }

    Ok(ModelArtifact {
        format_version,
        model,
    })
}

fn decode_json(bytes: &[u8]) -> Result<ModelArtifact, ArtifactError> {
    let header: VersionHeader =
        serde_json::from_slice(bytes).map_err(|e| ArtifactError::Deserialize(e.to_string()))?;
    check_version(header.format_version)?;

    serde_json::from_slice(bytes).map_err(|e| ArtifactError::Deserialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{
        errors::ForecastError,
        model::{ArimaModel, ArimaOrder, RandomWalkModel},
    };

    fn arima() -> ArimaModel {
        ArimaModel::new(
            ArimaOrder::new(1, 1, 1),
            vec![0.35],
            vec![-0.2],
            0.12,
            vec![141.2, 143.9, 144.1, 145.0],
            vec![0.6, -0.4],
        )
        .unwrap()
    }

    #[test]
    fn binary_artifact_survives_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("best_arima_model.bin");
        let artifact = ModelArtifact::new(arima());

        save_model(&path, &artifact).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"PXFCAST\0");
        let restored = read_artifact(&path).unwrap();
        assert_eq!(restored, artifact);
        match &restored.model {
            ModelSpec::Arima(model) => {
                assert_eq!(model.order(), ArimaOrder::new(1, 1, 1));
                assert_eq!(model.ar_coefficients(), &[0.35]);
                assert_eq!(model.ma_coefficients(), &[-0.2]);
            }
            other => panic!("expected an ARIMA model, got {}", other.kind()),
        }

        let model = load_model(&path).unwrap();
        assert_eq!(model.forecast(1).unwrap(), arima().forecast(1).unwrap());
    }

    #[test]
    fn json_artifact_is_selected_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("naive.JSON");
        let artifact = ModelArtifact::new(RandomWalkModel::new(145.0, 0.5).unwrap());

        save_model(&path, &artifact).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"RandomWalk\""));
        assert_eq!(load_model(&path).unwrap().forecast(1).unwrap(), vec![145.5]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_model(dir.path().join("absent.bin")).err().unwrap();
        assert!(matches!(err, ArtifactError::NotFound { .. }));
    }

    #[test]
    fn foreign_file_is_rejected_by_magic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("best_arima_model.pkl");
        // A pickle protocol 4 header.
        fs::write(&path, b"\x80\x04\x95\x10\x00\x00\x00\x00\x00\x00\x00").unwrap();

        let err = load_model(&path).err().unwrap();
        assert!(matches!(err, ArtifactError::BadMagic { .. }));
    }

    #[test]
    fn truncated_payload_fails_to_deserialize() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        save_model(&path, &ModelArtifact::new(arima())).unwrap();

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();
        assert!(matches!(
            load_model(&path).err().unwrap(),
            ArtifactError::Deserialize(_)
        ));

        fs::write(&path, &bytes[..10]).unwrap();
        assert!(matches!(
            load_model(&path).err().unwrap(),
            ArtifactError::Deserialize(_)
        ));
    }

    #[test]
    fn newer_format_version_is_unsupported() {
        let dir = TempDir::new().unwrap();
        for name in ["model.bin", "model.json"] {
            let path = dir.path().join(name);
            let mut artifact = ModelArtifact::new(arima());
            artifact.format_version = FORMAT_VERSION + 1;
            save_model(&path, &artifact).unwrap();

            let err = load_model(&path).err().unwrap();
            assert!(
                matches!(err, ArtifactError::UnsupportedVersion { found: 2, supported: 1 }),
                "{name}: {err:?}"
            );
        }
    }

    #[test]
    fn inconsistent_model_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(
            &path,
            r#"{
                "format_version": 1,
                "model": {"Arima": {
                    "order": {"p": 1, "d": 0, "q": 0},
                    "ar_coeffs": [],
                    "ma_coeffs": [],
                    "mean": 0.0,
                    "history": [1.0],
                    "residuals": []
                }}
            }"#,
        )
        .unwrap();

        // Decoding alone succeeds; validation is what catches it.
        assert!(read_artifact(&path).is_ok());
        let err = load_model(&path).err().unwrap();
        assert!(matches!(
            err,
            ArtifactError::InvalidModel(ForecastError::InvalidParameter {
                name: "ar_coeffs",
                ..
            })
        ));
    }
}

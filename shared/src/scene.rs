//! Opaque scene descriptions.
//!
//! A scene is a YAML or JSON document that is forwarded to workers
//! verbatim. Only two things are ever looked at: the raster size under
//! `camera`, and the `rendering.partial_render` list that restricts a
//! render to a set of pixel coordinates.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::resolution::Resolution;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("invalid scene JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid scene YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("scene must be a mapping")]
    NotAnObject,

    #[error("scene is missing a positive integer `camera.{0}`")]
    MissingDimension(&'static str),
}

pub type SceneResult<T> = Result<T, SceneError>;

#[derive(Debug, Clone)]
pub struct SceneDescription {
    raw: String,
    document: Map<String, Value>,
    resolution: Resolution,
}

impl SceneDescription {
    pub fn parse(raw: impl Into<String>) -> SceneResult<Self> {
        let raw = raw.into();
        let value = serde_json::from_str::<Value>(&raw)
            .or_else(|_| serde_yaml::from_str(&raw))?;
        let document = match value {
            Value::Object(document) => document,
            _ => return Err(SceneError::NotAnObject),
        };

        let camera = document.get("camera");
        let dimension = |key: &'static str| -> SceneResult<u32> {
            camera
                .and_then(|camera| camera.get(key))
                .and_then(as_dimension)
                .filter(|value| *value > 0)
                .and_then(|value| u32::try_from(value).ok())
                .ok_or(SceneError::MissingDimension(key))
        };
        let resolution = Resolution::new(dimension("width")?, dimension("height")?);

        Ok(Self {
            raw,
            document,
            resolution,
        })
    }

    /// The scene exactly as it was received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Serializes the scene with `rendering.partial_render` set to `pixels`.
    /// The result is JSON, which YAML readers accept as well.
    pub fn with_partial_render(&self, pixels: &[(u32, u32)]) -> SceneResult<String> {
        let mut document = self.document.clone();
        let rendering = document
            .entry("rendering")
            .or_insert_with(|| Value::Object(Map::new()));
        if !rendering.is_object() {
            *rendering = Value::Object(Map::new());
        }

        let coordinates = pixels
            .iter()
            .map(|(x, y)| Value::Array(vec![Value::from(*x), Value::from(*y)]))
            .collect();
        if let Value::Object(rendering) = rendering {
            rendering.insert("partial_render".to_owned(), Value::Array(coordinates));
        }

        Ok(serde_json::to_string(&document)?)
    }
}

/// Whole numbers only. YAML scenes often spell sizes as `800.0`.
fn as_dimension(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|v| v.fract() == 0.0 && *v >= 0.0 && *v <= u32::MAX as f64)
            .map(|v| v as u64)
    })
}

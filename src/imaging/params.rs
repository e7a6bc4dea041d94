//! Parameter types and the caller-parameter decoder.
//!
//! Callers hand over a loosely typed blob: a JSON object whose values are
//! scalars (numbers, strings, booleans). [`ParameterSet::parse`] turns that
//! blob into a [`ParameterSet`]; [`ParameterSet::decode`] then maps it onto the
//! typed parameter struct a given operation declares. Unknown keys and
//! mismatched types are rejected at that point, before any pixel work runs.
//!
//! ## Types
//!
//! - [`ParameterSet`]: Decoded scalar mapping, empty when no blob was given.
//! - [`Parameters`]: Trait every typed parameter struct implements.
//! - [`NoParams`]: For operations that accept nothing.
//! - [`AdjustmentParams`]: Percentage-domain brightness/contrast/saturation plus hue degrees.
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`Sharpening`]: Unsharp-mask parameters (sigma + threshold).

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use super::buffer::ImageBuffer;
use super::color;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("malformed parameter blob: {0}")]
    Malformed(String),
    #[error("parameter blob must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("parameter '{0}' must be a number, string or boolean")]
    NotAScalar(String),
    #[error("{0}")]
    Invalid(String),
}

/// A single caller-supplied parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(Number),
    Text(String),
    Bool(bool),
}

impl Scalar {
    fn into_value(self) -> Value {
        match self {
            Scalar::Number(n) => Value::Number(n),
            Scalar::Text(s) => Value::String(s),
            Scalar::Bool(b) => Value::Bool(b),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Number(v.into())
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

/// Flat name → scalar mapping supplied alongside an operation identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    values: BTreeMap<String, Scalar>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an optional JSON blob.
    ///
    /// Absent or blank input yields an empty set. Anything that is not a JSON
    /// object of scalars is an error.
    pub fn parse(blob: Option<&str>) -> Result<Self, ParamError> {
        let Some(blob) = blob.filter(|b| !b.trim().is_empty()) else {
            return Ok(Self::new());
        };
        let value: Value =
            serde_json::from_str(blob).map_err(|e| ParamError::Malformed(e.to_string()))?;
        let object = match value {
            Value::Object(object) => object,
            Value::Null => return Err(ParamError::NotAnObject("null")),
            Value::Bool(_) => return Err(ParamError::NotAnObject("a boolean")),
            Value::Number(_) => return Err(ParamError::NotAnObject("a number")),
            Value::String(_) => return Err(ParamError::NotAnObject("a string")),
            Value::Array(_) => return Err(ParamError::NotAnObject("an array")),
        };

        let mut values = BTreeMap::new();
        for (key, value) in object {
            let scalar = match value {
                Value::Number(n) => Scalar::Number(n),
                Value::String(s) => Scalar::Text(s),
                Value::Bool(b) => Scalar::Bool(b),
                Value::Null | Value::Array(_) | Value::Object(_) => {
                    return Err(ParamError::NotAScalar(key));
                }
            };
            values.insert(key, scalar);
        }
        Ok(Self { values })
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Scalar>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Map the set onto a typed parameter struct and validate it.
    pub fn decode<P: Parameters>(&self) -> Result<P, ParamError> {
        let object: Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone().into_value()))
            .collect();
        let params: P = serde_json::from_value(Value::Object(object))
            .map_err(|e| ParamError::Invalid(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }
}

/// Typed parameters for one operation.
///
/// Implementors derive `Deserialize` with `deny_unknown_fields` and put range
/// checks in [`validate`](Parameters::validate).
pub trait Parameters: DeserializeOwned + Send + Sync + 'static {
    fn validate(&self) -> Result<(), ParamError> {
        Ok(())
    }
}

/// Parameters of an operation that takes none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoParams {}

impl Parameters for NoParams {}

/// Parameters of the `adjustments` operation.
///
/// Brightness, contrast and saturation are percentages where `100` is
/// neutral; hue is a rotation in degrees. Each key is optional and only the
/// present ones are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdjustmentParams {
    pub brightness: Option<f32>,
    pub contrast: Option<f32>,
    pub saturation: Option<f32>,
    pub hue: Option<f32>,
}

impl Parameters for AdjustmentParams {}

/// One color adjustment with its transform-facing argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adjustment {
    Brightness(f32),
    Contrast(f32),
    Saturation(f32),
    Hue(f32),
}

impl Adjustment {
    pub fn name(&self) -> &'static str {
        match self {
            Adjustment::Brightness(_) => "brightness",
            Adjustment::Contrast(_) => "contrast",
            Adjustment::Saturation(_) => "saturation",
            Adjustment::Hue(_) => "hue",
        }
    }

    pub fn apply(&self, image: &ImageBuffer) -> ImageBuffer {
        match *self {
            Adjustment::Brightness(f) => color::brightness(image, f),
            Adjustment::Contrast(f) => color::contrast(image, f),
            Adjustment::Saturation(f) => color::saturation(image, f),
            Adjustment::Hue(deg) => color::hue(image, deg),
        }
    }
}

impl AdjustmentParams {
    /// Present adjustments in application order: brightness, contrast,
    /// saturation, hue.
    ///
    /// Percentages are divided by 100 (negative values coerce to 0); hue
    /// passes through unscaled.
    pub fn adjustments(&self) -> Vec<Adjustment> {
        let factor = |percent: f32| percent.max(0.0) / 100.0;
        let mut steps = Vec::with_capacity(4);
        if let Some(p) = self.brightness {
            steps.push(Adjustment::Brightness(factor(p)));
        }
        if let Some(p) = self.contrast {
            steps.push(Adjustment::Contrast(factor(p)));
        }
        if let Some(p) = self.saturation {
            steps.push(Adjustment::Saturation(factor(p)));
        }
        if let Some(deg) = self.hue {
            steps.push(Adjustment::Hue(deg));
        }
        steps
    }
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Sharpening parameters for unsharp mask.
///
/// - `sigma`: Standard deviation of the Gaussian blur (higher = more sharpening)
/// - `threshold`: Minimum brightness difference to sharpen (0 = sharpen all pixels)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sharpening {
    pub sigma: f32,
    pub threshold: i32,
}

impl Sharpening {
    /// Light sharpening, enough to recover edges after an upscale.
    pub fn light() -> Self {
        Self {
            sigma: 0.5,
            threshold: 0,
        }
    }
}

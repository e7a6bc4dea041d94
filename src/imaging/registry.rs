//! Capability registry: operation identifier → transform.
//!
//! Two kinds of identifiers resolve here:
//!
//! - **Reserved** literals (`background_removal`, `auto_color`,
//!   `adjustments`) matched by exact string equality. They never contain a
//!   `.`, so they cannot collide with the second kind.
//! - **Dotted** `category.function` pairs, split on the first `.` and looked
//!   up in the namespace registered under `category`.
//!
//! Everything is registered explicitly while the registry is built; after
//! that it is read-only and shared by reference across requests.
//!
//! Resolving yields a [`Capability`]. Preparing it against a
//! [`ParameterSet`] decodes the parameters into the transform's typed struct
//! and returns a [`Plan`]: the ordered [`Step`]s the pipeline will run.

use super::buffer::ImageBuffer;
use super::params::{AdjustmentParams, NoParams, ParamError, ParameterSet, Parameters};
use super::plugins;
use super::providers::{ProviderError, Providers};
use crate::config::LimitsConfig;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

pub const BACKGROUND_REMOVAL: &str = "background_removal";
pub const AUTO_COLOR: &str = "auto_color";
pub const ADJUSTMENTS: &str = "adjustments";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
    #[error("invalid operation identifier '{0}'")]
    InvalidIdentifier(String),
    #[error("operation '{0}' is already registered")]
    Duplicate(String),
}

/// Failure reported by a transform while running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransformError {
    message: String,
}

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ProviderError> for TransformError {
    fn from(err: ProviderError) -> Self {
        Self::new(err.to_string())
    }
}

/// Output of one step. `Ok(None)` means the transform produced nothing.
pub type TransformOutput = Result<Option<ImageBuffer>, TransformError>;

/// Conversion of a transform's return value into a [`TransformOutput`].
pub trait IntoOutput {
    fn into_output(self) -> TransformOutput;
}

impl IntoOutput for ImageBuffer {
    fn into_output(self) -> TransformOutput {
        Ok(Some(self))
    }
}

impl IntoOutput for Result<ImageBuffer, TransformError> {
    fn into_output(self) -> TransformOutput {
        self.map(Some)
    }
}

impl IntoOutput for Result<Option<ImageBuffer>, TransformError> {
    fn into_output(self) -> TransformOutput {
        self
    }
}

type StepFn = dyn Fn(&ImageBuffer) -> TransformOutput + Send + Sync;

/// A single transform invocation with its parameters already bound.
pub struct Step {
    name: String,
    run: Box<StepFn>,
}

impl Step {
    pub fn new<F, R>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&ImageBuffer) -> R + Send + Sync + 'static,
        R: IntoOutput,
    {
        Self {
            name: name.into(),
            run: Box::new(move |image| run(image).into_output()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(&self, image: &ImageBuffer) -> TransformOutput {
        (self.run)(image)
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish()
    }
}

/// A resolved operation with decoded parameters, ready to run.
#[derive(Debug)]
pub struct Plan {
    pub operation: String,
    pub steps: Vec<Step>,
}

type PrepareFn = dyn Fn(&ParameterSet) -> Result<Vec<Step>, ParamError> + Send + Sync;

/// A registered operation.
pub struct Capability {
    id: String,
    summary: &'static str,
    params: &'static [&'static str],
    prepare: Box<PrepareFn>,
}

impl Capability {
    /// A capability running one transform with typed parameters `P`.
    pub fn single<P, F, R>(
        id: impl Into<String>,
        summary: &'static str,
        params: &'static [&'static str],
        transform: F,
    ) -> Self
    where
        P: Parameters,
        F: Fn(&ImageBuffer, &P) -> R + Send + Sync + 'static,
        R: IntoOutput + 'static,
    {
        let id = id.into();
        let step_name = id.clone();
        let transform = Arc::new(transform);
        Self::staged(id, summary, params, move |set| {
            let decoded: P = set.decode()?;
            let transform = Arc::clone(&transform);
            Ok(vec![Step::new(step_name.clone(), move |image| {
                transform(image, &decoded)
            })])
        })
    }

    /// A capability whose preparation yields any number of steps.
    pub fn staged<F>(
        id: impl Into<String>,
        summary: &'static str,
        params: &'static [&'static str],
        prepare: F,
    ) -> Self
    where
        F: Fn(&ParameterSet) -> Result<Vec<Step>, ParamError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            summary,
            params,
            prepare: Box::new(prepare),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn summary(&self) -> &'static str {
        self.summary
    }

    /// Names of the accepted parameters, for listings.
    pub fn params(&self) -> &'static [&'static str] {
        self.params
    }

    /// Decode `params` and bind them into a runnable plan.
    pub fn prepare(&self, params: &ParameterSet) -> Result<Plan, ParamError> {
        Ok(Plan {
            operation: self.id.clone(),
            steps: (self.prepare)(params)?,
        })
    }
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capability")
            .field("id", &self.id)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Static table of every operation the pipeline can dispatch.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    reserved: BTreeMap<String, Capability>,
    namespaces: BTreeMap<String, BTreeMap<String, Capability>>,
}

impl CapabilityRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The full built-in catalogue: reserved operations, the
    /// `super_resolution.realesrgan` entry and every plugin namespace.
    pub fn with_providers(
        providers: Providers,
        limits: &LimitsConfig,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        register_builtins(&mut registry, providers)?;
        plugins::register_all(&mut registry, limits)?;
        Ok(registry)
    }

    /// Register a reserved literal. Reserved names may not contain `.`.
    pub fn register_reserved(&mut self, capability: Capability) -> Result<(), RegistryError> {
        let id = capability.id().to_string();
        if id.is_empty() || id.contains('.') {
            return Err(RegistryError::InvalidIdentifier(id));
        }
        if self.reserved.contains_key(&id) {
            return Err(RegistryError::Duplicate(id));
        }
        self.reserved.insert(id, capability);
        Ok(())
    }

    /// Register `category.function`; the capability id must be that pair.
    pub fn register(&mut self, capability: Capability) -> Result<(), RegistryError> {
        let id = capability.id().to_string();
        let Some((category, function)) = id.split_once('.') else {
            return Err(RegistryError::InvalidIdentifier(id));
        };
        if category.is_empty() || function.is_empty() {
            return Err(RegistryError::InvalidIdentifier(id));
        }
        let namespace = self.namespaces.entry(category.to_string()).or_default();
        if namespace.contains_key(function) {
            return Err(RegistryError::Duplicate(id));
        }
        namespace.insert(function.to_string(), capability);
        Ok(())
    }

    /// Look up an operation identifier.
    pub fn resolve(&self, operation: &str) -> Result<&Capability, RegistryError> {
        if let Some(capability) = self.reserved.get(operation) {
            return Ok(capability);
        }
        operation
            .split_once('.')
            .and_then(|(category, function)| self.namespaces.get(category)?.get(function))
            .ok_or_else(|| RegistryError::UnknownOperation(operation.to_string()))
    }

    /// Every registered capability: reserved first, then namespaces in order.
    pub fn capabilities(&self) -> impl Iterator<Item = &Capability> {
        self.reserved
            .values()
            .chain(self.namespaces.values().flat_map(|ns| ns.values()))
    }

    pub fn len(&self) -> usize {
        self.reserved.len() + self.namespaces.values().map(BTreeMap::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn register_builtins(
    registry: &mut CapabilityRegistry,
    providers: Providers,
) -> Result<(), RegistryError> {
    let Providers {
        background,
        super_resolution,
        color,
    } = providers;

    registry.register_reserved(Capability::single(
        BACKGROUND_REMOVAL,
        "Remove the image background",
        &[],
        move |image: &ImageBuffer, _: &NoParams| -> TransformOutput {
            Ok(background.remove_background(image)?)
        },
    ))?;

    registry.register_reserved(Capability::single(
        AUTO_COLOR,
        "Automatic white balance and levels",
        &[],
        move |image: &ImageBuffer, _: &NoParams| -> TransformOutput {
            Ok(color.color_correct(image)?)
        },
    ))?;

    registry.register_reserved(Capability::staged(
        ADJUSTMENTS,
        "Brightness, contrast, saturation (percent) and hue (degrees)",
        &["brightness", "contrast", "saturation", "hue"],
        |set| {
            let params: AdjustmentParams = set.decode()?;
            Ok(params
                .adjustments()
                .into_iter()
                .map(|adjustment| Step::new(adjustment.name(), move |image| adjustment.apply(image)))
                .collect())
        },
    ))?;

    registry.register(Capability::single(
        "super_resolution.realesrgan",
        "Upscale the image",
        &[],
        move |image: &ImageBuffer, _: &NoParams| -> TransformOutput {
            Ok(super_resolution.super_resolve(image)?)
        },
    ))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::providers::tests::{MockProvider, MockResponse, mock_providers};
    use crate::test_helpers::{color_ramp, uniform};

    fn registry() -> CapabilityRegistry {
        let mock = Arc::new(MockProvider::new(MockResponse::Echo));
        CapabilityRegistry::with_providers(mock_providers(&mock), &LimitsConfig::default()).unwrap()
    }

    fn run(plan: &Plan, image: &ImageBuffer) -> ImageBuffer {
        plan.steps.iter().fold(image.clone(), |current, step| {
            step.run(&current).unwrap().unwrap()
        })
    }

    #[test]
    fn reserved_operations_resolve() {
        let registry = registry();
        for id in [BACKGROUND_REMOVAL, AUTO_COLOR, ADJUSTMENTS] {
            assert_eq!(registry.resolve(id).unwrap().id(), id);
        }
    }

    #[test]
    fn dotted_operations_resolve() {
        let registry = registry();
        let cap = registry.resolve("super_resolution.realesrgan").unwrap();
        assert_eq!(cap.id(), "super_resolution.realesrgan");
        let cap = registry.resolve("geometric_transformations.rotate").unwrap();
        assert_eq!(cap.id(), "geometric_transformations.rotate");
    }

    #[test]
    fn unknown_operations_carry_identifier() {
        let registry = registry();
        for id in ["nonexistent.op", "geometric_transformations.warp", "nodots", "", "."] {
            assert_eq!(
                registry.resolve(id).unwrap_err(),
                RegistryError::UnknownOperation(id.to_string())
            );
        }
    }

    #[test]
    fn split_happens_on_first_dot() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register(Capability::single(
                "ns.fn.with.dots",
                "",
                &[],
                |image: &ImageBuffer, _: &NoParams| image.clone(),
            ))
            .unwrap();
        assert!(registry.resolve("ns.fn.with.dots").is_ok());
        assert!(registry.resolve("ns.fn").is_err());
    }

    #[test]
    fn reserved_names_with_dots_are_rejected() {
        let mut registry = CapabilityRegistry::new();
        let err = registry
            .register_reserved(Capability::single(
                "a.b",
                "",
                &[],
                |image: &ImageBuffer, _: &NoParams| image.clone(),
            ))
            .unwrap_err();
        assert_eq!(err, RegistryError::InvalidIdentifier("a.b".into()));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = registry();
        let err = registry
            .register(Capability::single(
                "super_resolution.realesrgan",
                "",
                &[],
                |image: &ImageBuffer, _: &NoParams| image.clone(),
            ))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Duplicate("super_resolution.realesrgan".into())
        );
    }

    #[test]
    fn adjustments_plan_follows_fixed_order() {
        let registry = registry();
        let params =
            ParameterSet::parse(Some(r#"{"hue": 10, "brightness": 120, "saturation": 90}"#)).unwrap();
        let plan = registry.resolve(ADJUSTMENTS).unwrap().prepare(&params).unwrap();
        let names: Vec<&str> = plan.steps.iter().map(Step::name).collect();
        assert_eq!(names, vec!["brightness", "saturation", "hue"]);
    }

    #[test]
    fn empty_adjustments_plan_has_no_steps() {
        let registry = registry();
        let plan = registry
            .resolve(ADJUSTMENTS)
            .unwrap()
            .prepare(&ParameterSet::new())
            .unwrap();
        assert!(plan.steps.is_empty());
        let img = color_ramp(5, 5);
        assert_eq!(run(&plan, &img), img);
    }

    #[test]
    fn parameterless_operations_reject_parameters() {
        let registry = registry();
        let params = ParameterSet::parse(Some(r#"{"strength": 2}"#)).unwrap();
        assert!(registry.resolve(BACKGROUND_REMOVAL).unwrap().prepare(&params).is_err());
    }

    #[test]
    fn provider_errors_become_transform_errors() {
        let mock = Arc::new(MockProvider::new(MockResponse::Fail("no gpu".into())));
        let registry =
            CapabilityRegistry::with_providers(mock_providers(&mock), &LimitsConfig::default())
                .unwrap();
        let plan = registry
            .resolve(AUTO_COLOR)
            .unwrap()
            .prepare(&ParameterSet::new())
            .unwrap();
        let err = plan.steps[0].run(&uniform(2, 2, [1, 1, 1])).unwrap_err();
        assert_eq!(err.message(), "no gpu");
    }

    #[test]
    fn catalogue_lists_reserved_first() {
        let registry = registry();
        let ids: Vec<&str> = registry.capabilities().map(Capability::id).collect();
        assert_eq!(&ids[..3], &[ADJUSTMENTS, AUTO_COLOR, BACKGROUND_REMOVAL]);
        assert!(ids.contains(&"super_resolution.realesrgan"));
        assert_eq!(ids.len(), registry.len());
    }
}

//! Dispatch pipeline: bytes + operation identifier → encoded result.
//!
//! Each edit request walks a fixed sequence of stages:
//!
//! ```text
//! Received → Resolved → ParametersDecoded → Applied → Normalized → Encoded
//! ```
//!
//! and ends either `Completed` with the encoded bytes or failed with exactly
//! one [`ErrorKind`]. Stages never run out of order and no partial result is
//! ever returned.
//!
//! | Stage | Failure |
//! |---|---|
//! | Received (decode) | `DecodeError` |
//! | Resolved | `UnknownOperation` |
//! | ParametersDecoded | `InvalidParameters` |
//! | Applied | `TransformInvocationError` (error or panic inside a step) |
//! | Normalized | `ProcessingFailed` (a step produced nothing) |
//! | Encoded | `EncodeError` |
//!
//! The pipeline borrows an immutable [`CapabilityRegistry`] and codec; it holds
//! no state between requests, so one instance can serve many threads.

use crate::imaging::{
    BufferError, CapabilityRegistry, CodecError, ImageBuffer, ImageCodec, OutputFormat,
    ParamError, ParameterSet, Plan,
};
use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info};

/// Default size of a blank layer.
pub const BLANK_WIDTH: u32 = 800;
pub const BLANK_HEIGHT: u32 = 600;

const WHITE: [u8; 3] = [255, 255, 255];

/// Position of a request in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Resolved,
    ParametersDecoded,
    Applied,
    Normalized,
    Encoded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Resolved => "resolved",
            Stage::ParametersDecoded => "parameters_decoded",
            Stage::Applied => "applied",
            Stage::Normalized => "normalized",
            Stage::Encoded => "encoded",
        };
        f.write_str(name)
    }
}

/// The six ways a request can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DecodeError,
    UnknownOperation,
    InvalidParameters,
    TransformInvocationError,
    ProcessingFailed,
    EncodeError,
}

impl ErrorKind {
    /// Response status: 400 for caller mistakes, 500 for processing failures.
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::DecodeError | ErrorKind::UnknownOperation | ErrorKind::InvalidParameters => {
                400
            }
            ErrorKind::TransformInvocationError
            | ErrorKind::ProcessingFailed
            | ErrorKind::EncodeError => 500,
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    Decode(CodecError),
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
    #[error("invalid parameters for '{operation}': {source}")]
    InvalidParameters {
        operation: String,
        #[source]
        source: ParamError,
    },
    #[error("'{operation}' failed in step '{step}': {message}")]
    TransformInvocation {
        operation: String,
        step: String,
        message: String,
    },
    #[error("'{operation}' produced no image")]
    ProcessingFailed { operation: String },
    #[error("{0}")]
    Encode(CodecError),
}

/// Boundary view of a failure: status plus a concise message, no payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub status: u16,
    pub message: String,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Decode(_) => ErrorKind::DecodeError,
            PipelineError::UnknownOperation(_) => ErrorKind::UnknownOperation,
            PipelineError::InvalidParameters { .. } => ErrorKind::InvalidParameters,
            PipelineError::TransformInvocation { .. } => ErrorKind::TransformInvocationError,
            PipelineError::ProcessingFailed { .. } => ErrorKind::ProcessingFailed,
            PipelineError::Encode(_) => ErrorKind::EncodeError,
        }
    }

    /// The operation the failure belongs to, when one was resolved.
    pub fn operation(&self) -> Option<&str> {
        match self {
            PipelineError::UnknownOperation(op)
            | PipelineError::InvalidParameters { operation: op, .. }
            | PipelineError::TransformInvocation { operation: op, .. }
            | PipelineError::ProcessingFailed { operation: op } => Some(op),
            PipelineError::Decode(_) | PipelineError::Encode(_) => None,
        }
    }

    pub fn to_failure(&self) -> Failure {
        Failure {
            status: self.kind().status(),
            message: self.to_string(),
        }
    }
}

/// A successful edit: encoded bytes plus what a caller needs to serve them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

/// One inbound edit request.
#[derive(Debug, Clone, Copy)]
pub struct EditRequest<'a> {
    /// Encoded image payload.
    pub image: &'a [u8],
    pub operation: &'a str,
    /// Optional JSON parameter blob.
    pub params: Option<&'a str>,
    pub format: OutputFormat,
}

/// Runs edit requests against a registry and codec.
#[derive(Debug)]
pub struct Pipeline<'a, C: ImageCodec> {
    registry: &'a CapabilityRegistry,
    codec: &'a C,
}

impl<'a, C: ImageCodec> Pipeline<'a, C> {
    pub fn new(registry: &'a CapabilityRegistry, codec: &'a C) -> Self {
        Self { registry, codec }
    }

    /// Run a full request, logging the outcome.
    pub fn edit(&self, request: &EditRequest<'_>) -> Result<Completed, PipelineError> {
        let start = Instant::now();
        let result = self.run(request);
        let elapsed_ms = start.elapsed().as_millis();
        match &result {
            Ok(done) => info!(
                operation = request.operation,
                elapsed_ms,
                bytes = done.bytes.len(),
                width = done.width,
                height = done.height,
                "edit completed"
            ),
            Err(err) => error!(
                operation = request.operation,
                kind = ?err.kind(),
                elapsed_ms,
                error = ?err,
                "edit failed"
            ),
        }
        result
    }

    fn run(&self, request: &EditRequest<'_>) -> Result<Completed, PipelineError> {
        let image = self.codec.decode(request.image).map_err(PipelineError::Decode)?;
        debug!(
            operation = request.operation,
            stage = %Stage::Received,
            width = image.width(),
            height = image.height()
        );
        let result = self.process(request.operation, request.params, image)?;
        self.encode(&result, request.format)
    }

    /// Resolve, decode parameters, apply and normalize, on an already
    /// decoded buffer. The returned buffer is always three-channel.
    pub fn process(
        &self,
        operation: &str,
        params: Option<&str>,
        image: ImageBuffer,
    ) -> Result<ImageBuffer, PipelineError> {
        let capability = self
            .registry
            .resolve(operation)
            .map_err(|_| PipelineError::UnknownOperation(operation.to_string()))?;
        debug!(operation, stage = %Stage::Resolved);

        let invalid = |source| PipelineError::InvalidParameters {
            operation: operation.to_string(),
            source,
        };
        let set = ParameterSet::parse(params).map_err(invalid)?;
        let plan = capability.prepare(&set).map_err(invalid)?;
        debug!(
            operation,
            stage = %Stage::ParametersDecoded,
            params = set.len(),
            steps = plan.steps.len()
        );

        let applied = self.apply(&plan, image)?;
        debug!(operation, stage = %Stage::Applied);

        let normalized = applied.into_bgr();
        debug!(operation, stage = %Stage::Normalized);
        Ok(normalized)
    }

    /// Run every step of `plan` in order. A step that errors or panics stops
    /// the run; a step that returns nothing is a processing failure.
    pub fn apply(&self, plan: &Plan, image: ImageBuffer) -> Result<ImageBuffer, PipelineError> {
        let mut current = image;
        for step in &plan.steps {
            debug!(operation = %plan.operation, step = step.name(), "running step");
            let outcome = catch_unwind(AssertUnwindSafe(|| step.run(&current)));
            let invocation = |message: String| PipelineError::TransformInvocation {
                operation: plan.operation.clone(),
                step: step.name().to_string(),
                message,
            };
            current = match outcome {
                Ok(Ok(Some(next))) => next,
                Ok(Ok(None)) => {
                    return Err(PipelineError::ProcessingFailed {
                        operation: plan.operation.clone(),
                    });
                }
                Ok(Err(err)) => return Err(invocation(err.message().to_string())),
                Err(payload) => return Err(invocation(panic_message(payload.as_ref()))),
            };
        }
        Ok(current)
    }

    /// Decode and re-encode as three-channel PNG, with no transform.
    pub fn normalize(&self, bytes: &[u8]) -> Result<Completed, PipelineError> {
        let image = self.codec.decode(bytes).map_err(PipelineError::Decode)?;
        debug!(stage = %Stage::Received, width = image.width(), height = image.height());
        self.encode(&image.into_bgr(), OutputFormat::Png)
    }

    /// Encode a buffer for the caller.
    pub fn encode(
        &self,
        image: &ImageBuffer,
        format: OutputFormat,
    ) -> Result<Completed, PipelineError> {
        let bytes = self
            .codec
            .encode(image, format)
            .map_err(PipelineError::Encode)?;
        debug!(stage = %Stage::Encoded, %format, bytes = bytes.len());
        Ok(Completed {
            bytes,
            mime_type: format.mime_type(),
            format,
            width: image.width(),
            height: image.height(),
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "transform panicked".to_string()
    }
}

/// An all-white three-channel image.
pub fn blank_layer(width: u32, height: u32) -> Result<ImageBuffer, BufferError> {
    ImageBuffer::filled(width, height, WHITE)
}

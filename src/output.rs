//! CLI output formatting for every subcommand.
//!
//! # Output Format
//!
//! ## Edit
//!
//! ```text
//! 001 beach.jpg → out/beach-adjustments.png
//!     800x600 image/png, 412331 bytes
//! 002 night.png: error [400]: unknown operation 'nonexistent.op'
//!
//! Edited 1 image, 1 failed
//! ```
//!
//! ## Operations
//!
//! ```text
//! Reserved
//!     adjustments (brightness, contrast, saturation, hue)
//!         Brightness, contrast, saturation (percent) and hue (degrees)
//!
//! geometric_transformations
//!     rotate (angle)
//!         Rotate clockwise by 90, 180 or 270 degrees
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>` or `String`)
//! for testability and a `print_*` wrapper that writes to stdout or stderr.
//! Format functions are pure and do no I/O.

use crate::imaging::{Capability, CapabilityRegistry};
use crate::pipeline::{Completed, Failure};
use std::path::{Path, PathBuf};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `error [<status>]: <message>`
pub fn format_failure(failure: &Failure) -> String {
    format!("error [{}]: {}", failure.status, failure.message)
}

/// Format the result of one written image.
///
/// ```text
/// out/beach-adjustments.png
///     800x600 image/png, 412331 bytes
/// ```
pub fn format_written(output: &Path, done: &Completed) -> Vec<String> {
    vec![
        output.display().to_string(),
        format!(
            "{}{}x{} {}, {} bytes",
            indent(1),
            done.width,
            done.height,
            done.mime_type,
            done.bytes.len()
        ),
    ]
}

/// Format one edited input. Successful entries carry the output path.
pub fn format_edit_result(
    index: usize,
    input: &Path,
    result: &Result<(PathBuf, Completed), Failure>,
) -> Vec<String> {
    let head = format!("{} {}", format_index(index), file_label(input));
    match result {
        Ok((output, done)) => {
            let mut lines = format_written(output, done);
            lines[0] = format!("{head} \u{2192} {}", lines[0]);
            lines
        }
        Err(failure) => vec![format!("{head}: {}", format_failure(failure))],
    }
}

pub fn format_edit_summary(succeeded: usize, failed: usize) -> String {
    if failed == 0 {
        format!("Edited {}", plural(succeeded, "image"))
    } else {
        format!("Edited {}, {} failed", plural(succeeded, "image"), failed)
    }
}

fn capability_lines(capability: &Capability, name: &str) -> Vec<String> {
    let header = if capability.params().is_empty() {
        format!("{}{}", indent(1), name)
    } else {
        format!("{}{} ({})", indent(1), name, capability.params().join(", "))
    };
    let mut lines = vec![header];
    if !capability.summary().is_empty() {
        lines.push(format!("{}{}", indent(2), capability.summary()));
    }
    lines
}

/// Format the operation catalogue: reserved literals first, then one block
/// per `category` namespace.
pub fn format_operations(registry: &CapabilityRegistry) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current: Option<String> = None;
    for capability in registry.capabilities() {
        let (section, name) = match capability.id().split_once('.') {
            Some((category, function)) => (category.to_string(), function),
            None => ("Reserved".to_string(), capability.id()),
        };
        if current.as_deref() != Some(section.as_str()) {
            if current.is_some() {
                lines.push(String::new());
            }
            lines.push(section.clone());
            current = Some(section);
        }
        lines.extend(capability_lines(capability, name));
    }
    lines
}

pub fn format_saved(path: &Path) -> String {
    format!("Image saved successfully to {}", path.display())
}

/// Print operation catalogue to stdout.
pub fn print_operations(registry: &CapabilityRegistry) {
    for line in format_operations(registry) {
        println!("{}", line);
    }
}

pub fn print_edit_result(
    index: usize,
    input: &Path,
    result: &Result<(PathBuf, Completed), Failure>,
) {
    for line in format_edit_result(index, input, result) {
        if result.is_ok() {
            println!("{}", line);
        } else {
            eprintln!("{}", line);
        }
    }
}

pub fn print_written(output: &Path, done: &Completed) {
    for line in format_written(output, done) {
        println!("{}", line);
    }
}

pub fn print_failure(failure: &Failure) {
    eprintln!("{}", format_failure(failure));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use crate::imaging::OutputFormat;
    use crate::imaging::providers::tests::{MockProvider, MockResponse, mock_providers};
    use std::sync::Arc;

    fn completed() -> Completed {
        Completed {
            bytes: vec![0; 1234],
            mime_type: "image/png",
            format: OutputFormat::Png,
            width: 800,
            height: 600,
        }
    }

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn failure_line() {
        let failure = Failure {
            status: 400,
            message: "unknown operation 'x.y'".into(),
        };
        assert_eq!(format_failure(&failure), "error [400]: unknown operation 'x.y'");
    }

    #[test]
    fn edit_success_lines() {
        let result = Ok((PathBuf::from("out/beach-adjustments.png"), completed()));
        let lines = format_edit_result(1, Path::new("photos/beach.jpg"), &result);
        assert_eq!(
            lines,
            vec![
                "001 beach.jpg \u{2192} out/beach-adjustments.png".to_string(),
                "    800x600 image/png, 1234 bytes".to_string(),
            ]
        );
    }

    #[test]
    fn edit_failure_line() {
        let result = Err(Failure {
            status: 500,
            message: "'auto_color' produced no image".into(),
        });
        let lines = format_edit_result(2, Path::new("night.png"), &result);
        assert_eq!(
            lines,
            vec!["002 night.png: error [500]: 'auto_color' produced no image".to_string()]
        );
    }

    #[test]
    fn summary_wording() {
        assert_eq!(format_edit_summary(1, 0), "Edited 1 image");
        assert_eq!(format_edit_summary(3, 0), "Edited 3 images");
        assert_eq!(format_edit_summary(2, 1), "Edited 2 images, 1 failed");
    }

    #[test]
    fn saved_message() {
        assert_eq!(
            format_saved(Path::new("saved/edit-abc.png")),
            "Image saved successfully to saved/edit-abc.png"
        );
    }

    #[test]
    fn operations_grouped_by_namespace() {
        let mock = Arc::new(MockProvider::new(MockResponse::Echo));
        let registry =
            CapabilityRegistry::with_providers(mock_providers(&mock), &LimitsConfig::default())
                .unwrap();
        let lines = format_operations(&registry);

        assert_eq!(lines[0], "Reserved");
        assert_eq!(
            lines[1],
            "    adjustments (brightness, contrast, saturation, hue)"
        );
        assert!(lines.contains(&"geometric_transformations".to_string()));
        assert!(lines.contains(&"    rotate (angle)".to_string()));
        assert!(lines.contains(&"super_resolution".to_string()));
        assert!(lines.contains(&"    realesrgan".to_string()));
        // Blank line between sections, never at the start
        assert!(!lines[0].is_empty());
        let reserved_end = lines.iter().position(String::is_empty).unwrap();
        assert_eq!(lines[reserved_end + 1], "color_adjustments");
    }
}

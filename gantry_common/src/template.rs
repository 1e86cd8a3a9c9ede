//! Movement templates: named sequences of formation patterns.
//!
//! A template file resolves into plain [`MoveRequest`] values; nothing
//! here talks to the bus.
//!
//! # TOML Example
//!
//! ```toml
//! layout = "shared_track"
//! axis_count = 4
//!
//! [patterns]
//! half = [-0.5, -0.2, 0.2, 0.5]
//!
//! [[templates]]
//! name = "demo"
//! steps = [
//!     { pattern = "spread", divisor = 2 },
//!     { pattern = "half" },
//!     { pattern = "home", mode = "sequential" },
//! ]
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::command::{ExecutionMode, MotionProfile, MoveRequest};
use crate::config::{ConfigError, ConfigLoader};
use crate::topology::LayoutMode;

/// Patterns for the four-axis formation, always available.
const BUILTIN_PATTERNS: &[(&str, [f64; 4])] = &[
    ("home", [0.0, 0.0, 0.0, 0.0]),
    ("end", [-1.1, -1.1, 1.1, 1.1]),
    ("spread", [-1.1, 0.0, 0.0, 1.1]),
    ("spread_equal", [-1.1, -0.4, 0.4, 1.1]),
    ("left", [-1.1, -1.1, -1.1, -1.1]),
    ("right", [1.1, 1.1, 1.1, 1.1]),
];

/// Look up a built-in pattern by name.
pub fn builtin_pattern(name: &str) -> Option<&'static [f64]> {
    BUILTIN_PATTERNS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, targets)| targets.as_slice())
}

#[derive(Debug, Clone, Error)]
pub enum TemplateError {
    #[error("template file: {0}")]
    Load(#[from] ConfigError),

    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("template '{template}' references unknown pattern '{pattern}'")]
    UnknownPattern { template: String, pattern: String },

    #[error("pattern '{pattern}' has {len} targets but the session has {axis_count} axes")]
    PatternTooLong {
        pattern: String,
        len: usize,
        axis_count: usize,
    },

    #[error("template file is for {expected}, session runs {actual}")]
    SessionMismatch { expected: String, actual: String },
}

/// One step of a template.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateStep {
    #[serde(alias = "pattern_name")]
    pub pattern: String,
    #[serde(default)]
    pub divisor: Option<u32>,
    #[serde(default)]
    pub mode: Option<ExecutionMode>,
    #[serde(default)]
    pub profile: Option<MotionProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovementTemplate {
    pub name: String,
    pub steps: Vec<TemplateStep>,
}

/// Contents of a template file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateFile {
    /// Layout the templates were written for.
    #[serde(default, alias = "type")]
    pub layout: Option<String>,
    #[serde(default, alias = "total_slaves")]
    pub axis_count: Option<usize>,
    #[serde(default)]
    pub patterns: BTreeMap<String, Vec<f64>>,
    #[serde(default, alias = "template")]
    pub templates: Vec<MovementTemplate>,
}

/// Values applied to steps that do not override them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDefaults {
    pub profile: MotionProfile,
    pub divisor: u32,
}

impl TemplateFile {
    /// Load a TOML or JSON template file.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        Ok(<Self as ConfigLoader>::load(path)?)
    }

    /// File-defined pattern first, then the built-ins.
    pub fn pattern(&self, name: &str) -> Option<&[f64]> {
        self.patterns
            .get(name)
            .map(Vec::as_slice)
            .or_else(|| builtin_pattern(name))
    }

    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|t| t.name.as_str())
    }

    /// Reject files written for another rig.
    pub fn check_session(&self, layout: LayoutMode, axis_count: usize) -> Result<(), TemplateError> {
        if let Some(expected) = &self.layout {
            if !layout_matches(expected, layout) {
                return Err(TemplateError::SessionMismatch {
                    expected: expected.clone(),
                    actual: layout.name().to_string(),
                });
            }
        }
        match self.axis_count {
            Some(expected) if expected != axis_count => Err(TemplateError::SessionMismatch {
                expected: format!("{expected} axes"),
                actual: format!("{axis_count} axes"),
            }),
            _ => Ok(()),
        }
    }

    /// Resolve a template into the move requests of its steps, in order.
    pub fn resolve(
        &self,
        name: &str,
        defaults: StepDefaults,
        axis_count: usize,
    ) -> Result<Vec<MoveRequest>, TemplateError> {
        let template = self
            .templates
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string()))?;

        template
            .steps
            .iter()
            .map(|step| {
                let targets = self.pattern(&step.pattern).ok_or_else(|| {
                    TemplateError::UnknownPattern {
                        template: template.name.clone(),
                        pattern: step.pattern.clone(),
                    }
                })?;
                if targets.len() > axis_count {
                    return Err(TemplateError::PatternTooLong {
                        pattern: step.pattern.clone(),
                        len: targets.len(),
                        axis_count,
                    });
                }
                Ok(
                    MoveRequest::from_positions(targets, step.profile.unwrap_or(defaults.profile))
                        .with_divisor(step.divisor.unwrap_or(defaults.divisor))
                        .with_mode(step.mode.unwrap_or_default())
                        .with_label(format!("{}/{}", template.name, step.pattern)),
                )
            })
            .collect()
    }
}

fn layout_matches(name: &str, layout: LayoutMode) -> bool {
    let name = name.to_ascii_lowercase();
    name == layout.name()
        || matches!(
            (name.as_str(), layout),
            ("matrix", LayoutMode::GroupedRows { .. }) | ("hmrs", LayoutMode::PairedZone)
        )
}

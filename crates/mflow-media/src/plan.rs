//! Invocation plans: the ordered argument list for one ffmpeg run.

use std::path::{Path, PathBuf};

use crate::error::{MediaError, MediaResult};

/// One positional element of an invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanElement {
    /// Engine-wide options, emitted before any input
    Global(Vec<String>),
    /// Options scoped to one input, followed by its locator
    Input { options: Vec<String>, locator: String },
    /// Single filter graph applied after all inputs
    FilterGraph(String),
    /// Options scoped to one output, followed by its destination
    Output {
        options: Vec<String>,
        destination: PathBuf,
    },
}

/// Compiled, immutable ffmpeg invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationPlan {
    elements: Vec<PlanElement>,
}

impl InvocationPlan {
    pub fn builder() -> PlanBuilder {
        PlanBuilder::default()
    }

    pub fn elements(&self) -> &[PlanElement] {
        &self.elements
    }

    /// Input locators in declared order.
    pub fn inputs(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                PlanElement::Input { locator, .. } => Some(locator.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Output destinations in declared order.
    pub fn outputs(&self) -> Vec<&Path> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                PlanElement::Output { destination, .. } => Some(destination.as_path()),
                _ => None,
            })
            .collect()
    }

    /// The filter graph argument, if any.
    pub fn filter_graph(&self) -> Option<&str> {
        self.elements.iter().find_map(|e| match e {
            PlanElement::FilterGraph(graph) => Some(graph.as_str()),
            _ => None,
        })
    }

    /// Flatten into engine arguments.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for element in &self.elements {
            match element {
                PlanElement::Global(options) => args.extend(options.iter().cloned()),
                PlanElement::Input { options, locator } => {
                    args.extend(options.iter().cloned());
                    args.push("-i".to_string());
                    args.push(locator.clone());
                }
                PlanElement::FilterGraph(graph) => {
                    args.push("-filter_complex".to_string());
                    args.push(graph.clone());
                }
                PlanElement::Output {
                    options,
                    destination,
                } => {
                    args.extend(options.iter().cloned());
                    args.push(destination.to_string_lossy().to_string());
                }
            }
        }
        args
    }
}

/// Builder for [`InvocationPlan`].
///
/// Elements are emitted in the engine's fixed slot order regardless of the
/// order builder methods are called in: globals, inputs, filter graph, outputs.
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    overwrite: bool,
    log_level: Option<String>,
    globals: Vec<String>,
    inputs: Vec<PlanElement>,
    filter_graph: Option<String>,
    outputs: Vec<PlanElement>,
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self {
            overwrite: true,
            log_level: Some("error".to_string()),
            globals: Vec::new(),
            inputs: Vec::new(),
            filter_graph: None,
            outputs: Vec::new(),
        }
    }
}

impl PlanBuilder {
    /// Whether to pass `-y`.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set `-v <level>`; `None` leaves the engine default.
    pub fn log_level(mut self, level: Option<&str>) -> Self {
        self.log_level = level.map(str::to_string);
        self
    }

    /// Add global arguments.
    pub fn global_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.globals.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add an input with its scoped options.
    pub fn input<I, S>(mut self, options: I, locator: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push(PlanElement::Input {
            options: options.into_iter().map(Into::into).collect(),
            locator: locator.into(),
        });
        self
    }

    /// Set the filter graph.
    pub fn filter_graph(mut self, graph: impl Into<String>) -> Self {
        self.filter_graph = Some(graph.into());
        self
    }

    /// Add an output with its scoped options.
    pub fn output<I, S>(mut self, options: I, destination: impl AsRef<Path>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs.push(PlanElement::Output {
            options: options.into_iter().map(Into::into).collect(),
            destination: destination.as_ref().to_path_buf(),
        });
        self
    }

    /// Build the plan. At least one input and one output are required.
    pub fn build(self) -> MediaResult<InvocationPlan> {
        if self.inputs.is_empty() {
            return Err(MediaError::malformed("at least one input is required"));
        }
        if self.outputs.is_empty() {
            return Err(MediaError::malformed("at least one output is required"));
        }

        let mut globals = Vec::new();
        if self.overwrite {
            globals.push("-y".to_string());
        }
        if let Some(level) = self.log_level {
            globals.push("-v".to_string());
            globals.push(level);
        }
        globals.extend(self.globals);

        let mut elements = Vec::with_capacity(self.inputs.len() + self.outputs.len() + 2);
        elements.push(PlanElement::Global(globals));
        elements.extend(self.inputs);
        if let Some(graph) = self.filter_graph {
            elements.push(PlanElement::FilterGraph(graph));
        }
        elements.extend(self.outputs);

        Ok(InvocationPlan { elements })
    }
}

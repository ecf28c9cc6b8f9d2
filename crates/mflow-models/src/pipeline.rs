//! Declarative pipeline specification.
//!
//! A pipeline is an ordered description of engine inputs, filter expressions,
//! outputs and engine-wide options. Every list keeps its declared order all the
//! way into the compiled invocation, because the engine resolves option scope
//! positionally.

use serde::{Deserialize, Serialize};

/// Argument attached to an option: a string or a number on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionArgument {
    Text(String),
    Number(serde_json::Number),
}

impl OptionArgument {
    /// Render the argument as a single engine token.
    pub fn to_arg(&self) -> String {
        match self {
            OptionArgument::Text(s) => s.clone(),
            OptionArgument::Number(n) => n.to_string(),
        }
    }
}

/// A single engine option, e.g. `{"option": "-c:v", "argument": "libx264"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliOption {
    pub option: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<OptionArgument>,
}

impl CliOption {
    /// Option without argument (flag).
    pub fn flag(option: impl Into<String>) -> Self {
        Self {
            option: option.into(),
            argument: None,
        }
    }

    /// Option with a text argument.
    pub fn with_arg(option: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            option: option.into(),
            argument: Some(OptionArgument::Text(argument.into())),
        }
    }

    /// Engine tokens for this option, in order.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = vec![self.option.clone()];
        if let Some(arg) = &self.argument {
            tokens.push(arg.to_arg());
        }
        tokens
    }
}

/// One engine input: a source locator and the options that scope to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    pub file_url: String,
    #[serde(default)]
    pub options: Vec<CliOption>,
}

/// One filter-graph fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub filter: String,
}

/// One engine output. The destination path is generated at compile time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputSpec {
    #[serde(default)]
    pub options: Vec<CliOption>,
}

impl OutputSpec {
    /// Argument of the last `-f` option, if any.
    pub fn format(&self) -> Option<String> {
        self.options
            .iter()
            .rev()
            .find(|o| o.option == "-f")
            .and_then(|o| o.argument.as_ref())
            .map(OptionArgument::to_arg)
    }
}

/// Metadata fields requested for every output artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataRequest {
    pub thumbnail: bool,
    pub filesize: bool,
    pub duration: bool,
    pub bitrate: bool,
    pub encoder: bool,
}

impl MetadataRequest {
    /// True when at least one field is requested.
    pub fn any(&self) -> bool {
        self.thumbnail || self.filesize || self.duration || self.bitrate || self.encoder
    }
}

/// Full declarative description of one media job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub inputs: Vec<InputSpec>,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    pub outputs: Vec<OutputSpec>,
    #[serde(default)]
    pub global_options: Vec<CliOption>,
    #[serde(default)]
    pub metadata: MetadataRequest,
}

impl PipelineSpec {
    /// Copy of this spec with every input locator replaced, in order.
    ///
    /// Used once sources have been fetched to local paths.
    pub fn with_input_locators<I, S>(&self, locators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = self.clone();
        for (input, locator) in spec.inputs.iter_mut().zip(locators) {
            input.file_url = locator.into();
        }
        spec
    }
}

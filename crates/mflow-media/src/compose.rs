//! Pipeline compiler: declarative spec to invocation plan.
//!
//! Compilation is pure. Nothing is executed until the plan is handed to
//! [`FfmpegRunner`](crate::command::FfmpegRunner), so a spec that fails to
//! compile never produces a partial run.

use std::path::{Path, PathBuf};

use mflow_models::{CliOption, JobId, OutputSpec, PipelineSpec};

use crate::error::{MediaError, MediaResult};
use crate::plan::InvocationPlan;

/// Separator used to join filter expressions into one filter graph.
pub const FILTER_GRAPH_SEPARATOR: &str = ";";

const DEFAULT_OUTPUT_EXTENSION: &str = "mp4";

/// Generates output destinations for a job.
#[derive(Debug, Clone)]
pub struct OutputNaming {
    work_dir: PathBuf,
    job_id: String,
}

impl OutputNaming {
    pub fn new(work_dir: impl AsRef<Path>, job_id: &JobId) -> Self {
        Self {
            work_dir: work_dir.as_ref().to_path_buf(),
            job_id: job_id.to_string(),
        }
    }

    /// Destination for the output at `index`: `{job_id}_output_{index}.{ext}`.
    pub fn destination(&self, index: usize, output: &OutputSpec) -> PathBuf {
        self.work_dir
            .join(format!("{}_output_{}.{}", self.job_id, index, output_extension(output)))
    }
}

/// File extension for an output: its `-f` format when usable, else `mp4`.
pub fn output_extension(output: &OutputSpec) -> String {
    output
        .format()
        .filter(|f| !f.is_empty() && f.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| DEFAULT_OUTPUT_EXTENSION.to_string())
}

/// Compile a pipeline spec into an invocation plan.
pub fn compile(spec: &PipelineSpec, naming: &OutputNaming) -> MediaResult<InvocationPlan> {
    if spec.inputs.is_empty() {
        return Err(MediaError::malformed("pipeline has no inputs"));
    }
    if spec.outputs.is_empty() {
        return Err(MediaError::malformed("pipeline has no outputs"));
    }

    let mut builder = InvocationPlan::builder().global_args(option_tokens(&spec.global_options)?);

    for (index, input) in spec.inputs.iter().enumerate() {
        if input.file_url.trim().is_empty() {
            return Err(MediaError::malformed(format!("input {index} has an empty file_url")));
        }
        builder = builder.input(option_tokens(&input.options)?, input.file_url.clone());
    }

    if !spec.filters.is_empty() {
        let mut fragments = Vec::with_capacity(spec.filters.len());
        for (index, filter) in spec.filters.iter().enumerate() {
            let expr = filter.filter.trim();
            if expr.is_empty() {
                return Err(MediaError::malformed(format!("filter {index} is empty")));
            }
            fragments.push(expr);
        }
        builder = builder.filter_graph(fragments.join(FILTER_GRAPH_SEPARATOR));
    }

    for (index, output) in spec.outputs.iter().enumerate() {
        builder = builder.output(option_tokens(&output.options)?, naming.destination(index, output));
    }

    builder.build()
}

/// Engine tokens for an option list, after checking every option.
fn option_tokens(options: &[CliOption]) -> MediaResult<Vec<String>> {
    let mut tokens = Vec::with_capacity(options.len() * 2);
    for option in options {
        check_option(option)?;
        tokens.extend(option.tokens());
    }
    Ok(tokens)
}

/// Options must look like a single engine flag.
fn check_option(option: &CliOption) -> MediaResult<()> {
    let name = option.option.as_str();
    let well_formed = name.len() > 1
        && name.starts_with('-')
        && !name.chars().any(|c| c.is_whitespace() || c == '\0');
    if !well_formed {
        return Err(MediaError::unsupported(name));
    }

    if let Some(arg) = &option.argument {
        if arg.to_arg().contains('\0') {
            return Err(MediaError::unsupported(format!("{name}: argument contains NUL")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mflow_models::{FilterSpec, InputSpec, MetadataRequest};

    fn naming() -> OutputNaming {
        OutputNaming::new("/work", &JobId::from_string("job1"))
    }

    fn input(url: &str, options: Vec<CliOption>) -> InputSpec {
        InputSpec {
            file_url: url.to_string(),
            options,
        }
    }

    fn spec(inputs: Vec<InputSpec>, filters: &[&str], outputs: Vec<OutputSpec>) -> PipelineSpec {
        PipelineSpec {
            inputs,
            filters: filters
                .iter()
                .map(|f| FilterSpec { filter: f.to_string() })
                .collect(),
            outputs,
            global_options: vec![],
            metadata: MetadataRequest::default(),
        }
    }

    #[test]
    fn test_single_input_single_filter_single_output() {
        let spec = spec(
            vec![input("a.mp4", vec![])],
            &["scale=640:480"],
            vec![OutputSpec::default()],
        );

        let plan = compile(&spec, &naming()).unwrap();
        assert_eq!(plan.inputs(), vec!["a.mp4"]);
        assert_eq!(plan.filter_graph(), Some("scale=640:480"));
        assert_eq!(plan.outputs(), vec![Path::new("/work/job1_output_0.mp4")]);

        let args = plan.args();
        assert_eq!(args.iter().filter(|a| *a == "-filter_complex").count(), 1);
    }

    #[test]
    fn test_counts_and_order_are_preserved() {
        let spec = spec(
            vec![input("a.mp4", vec![]), input("b.mp4", vec![]), input("c.wav", vec![])],
            &[],
            vec![
                OutputSpec::default(),
                OutputSpec {
                    options: vec![CliOption::with_arg("-f", "webm")],
                },
            ],
        );

        let plan = compile(&spec, &naming()).unwrap();
        assert_eq!(plan.inputs(), vec!["a.mp4", "b.mp4", "c.wav"]);
        assert_eq!(
            plan.outputs(),
            vec![
                Path::new("/work/job1_output_0.mp4"),
                Path::new("/work/job1_output_1.webm"),
            ]
        );
        assert!(plan.filter_graph().is_none());

        let args = plan.args();
        let pos = |s: &str| args.iter().position(|a| a == s).unwrap();
        assert!(pos("a.mp4") < pos("b.mp4"));
        assert!(pos("b.mp4") < pos("c.wav"));
        assert!(pos("/work/job1_output_0.mp4") < pos("/work/job1_output_1.webm"));
        assert!(pos("c.wav") < pos("/work/job1_output_0.mp4"));
    }

    #[test]
    fn test_input_options_precede_their_locator() {
        let spec = spec(
            vec![
                input("a.mp4", vec![CliOption::with_arg("-ss", "5"), CliOption::with_arg("-t", "10")]),
                input("b.mp4", vec![CliOption::flag("-re")]),
            ],
            &[],
            vec![OutputSpec::default()],
        );

        let args = compile(&spec, &naming()).unwrap().args();
        let a = args.iter().position(|x| x == "a.mp4").unwrap();
        assert_eq!(&args[a - 5..=a], &["-ss", "5", "-t", "10", "-i", "a.mp4"]);
        let b = args.iter().position(|x| x == "b.mp4").unwrap();
        assert_eq!(&args[b - 2..=b], &["-re", "-i", "b.mp4"]);
    }

    #[test]
    fn test_filters_concatenated_in_order_after_inputs() {
        let spec = spec(
            vec![input("a.mp4", vec![]), input("b.mp4", vec![])],
            &["[0:v][1:v]hstack=inputs=2[v]", "[v]scale=1280:-2[out]"],
            vec![OutputSpec {
                options: vec![CliOption::with_arg("-map", "[out]")],
            }],
        );

        let plan = compile(&spec, &naming()).unwrap();
        assert_eq!(
            plan.filter_graph(),
            Some("[0:v][1:v]hstack=inputs=2[v];[v]scale=1280:-2[out]")
        );

        let args = plan.args();
        let graph = args.iter().position(|a| a == "-filter_complex").unwrap();
        let last_input = args.iter().position(|a| a == "b.mp4").unwrap();
        let map = args.iter().position(|a| a == "-map").unwrap();
        assert!(last_input < graph && graph < map);
    }

    #[test]
    fn test_global_options_come_first() {
        let mut spec = spec(vec![input("a.mp4", vec![])], &[], vec![OutputSpec::default()]);
        spec.global_options = vec![CliOption::flag("-hide_banner"), CliOption::with_arg("-threads", "2")];

        let args = compile(&spec, &naming()).unwrap().args();
        let first_input = args.iter().position(|a| a == "-i").unwrap();
        let banner = args.iter().position(|a| a == "-hide_banner").unwrap();
        assert!(banner < first_input);
        assert_eq!(&args[banner..banner + 3], &["-hide_banner", "-threads", "2"]);
    }

    #[test]
    fn test_structural_minimums() {
        let no_inputs = spec(vec![], &[], vec![OutputSpec::default()]);
        assert!(matches!(compile(&no_inputs, &naming()), Err(MediaError::MalformedPipeline(_))));

        let no_outputs = spec(vec![input("a.mp4", vec![])], &[], vec![]);
        assert!(matches!(compile(&no_outputs, &naming()), Err(MediaError::MalformedPipeline(_))));

        let empty_filter = spec(vec![input("a.mp4", vec![])], &["  "], vec![OutputSpec::default()]);
        assert!(matches!(compile(&empty_filter, &naming()), Err(MediaError::MalformedPipeline(_))));

        let empty_url = spec(vec![input("", vec![])], &[], vec![OutputSpec::default()]);
        assert!(matches!(compile(&empty_url, &naming()), Err(MediaError::MalformedPipeline(_))));
    }

    #[test]
    fn test_rejects_non_flag_options() {
        for bad in ["c:v", "-", "-c v", "-x\0"] {
            let spec = spec(
                vec![input("a.mp4", vec![CliOption::flag(bad)])],
                &[],
                vec![OutputSpec::default()],
            );
            assert!(
                matches!(compile(&spec, &naming()), Err(MediaError::UnsupportedOption(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_odd_format_falls_back_to_mp4() {
        let out = OutputSpec {
            options: vec![CliOption::with_arg("-f", "../../etc")],
        };
        assert_eq!(output_extension(&out), "mp4");
    }

    #[test]
    fn test_compile_is_deterministic() {
        let spec = spec(vec![input("a.mp4", vec![])], &["null"], vec![OutputSpec::default()]);
        assert_eq!(compile(&spec, &naming()).unwrap(), compile(&spec, &naming()).unwrap());
    }
}

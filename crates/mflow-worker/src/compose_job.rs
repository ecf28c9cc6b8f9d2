//! Composition jobs: multi-input, multi-filter, multi-output pipelines.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use mflow_media::{compile, extract_metadata, OutputMetadata, OutputNaming};
use mflow_models::ComposeRequest;

use crate::error::{WorkerError, WorkerResult};
use crate::handler::{JobContext, MediaJobHandler};

/// One published output in a composition response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposeArtifact {
    pub file_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoder: Option<String>,
}

impl MediaJobHandler {
    pub(crate) async fn run_compose(
        &self,
        ctx: &mut JobContext<'_>,
        request: ComposeRequest,
    ) -> WorkerResult<Value> {
        let spec = request.pipeline;
        let naming = OutputNaming::new(self.work_dir(), ctx.job_id);

        // Reject bad specs before touching the network.
        compile(&spec, &naming)?;
        ctx.logger.log_start(&format!(
            "{} inputs, {} filters, {} outputs",
            spec.inputs.len(),
            spec.filters.len(),
            spec.outputs.len()
        ));

        let mut local_inputs = Vec::with_capacity(spec.inputs.len());
        for input in &spec.inputs {
            let path = ctx.fetch(self.storage.as_ref(), &input.file_url).await?;
            local_inputs.push(path.to_string_lossy().to_string());
        }
        ctx.logger.log_progress("inputs fetched");

        let plan = compile(&spec.with_input_locators(local_inputs), &naming)?;
        let output = match self.runner.run(&plan).await {
            Ok(output) => output,
            Err(e) => {
                remove_partial_outputs(plan.outputs()).await;
                return Err(e.into());
            }
        };
        ctx.logger.log_progress(&format!("{} outputs produced", output.artifacts.len()));

        let mut artifacts = Vec::with_capacity(output.artifacts.len());
        for (index, artifact) in output.artifacts.iter().enumerate() {
            let metadata = if spec.metadata.any() {
                extract_metadata(&self.runner, artifact, &spec.metadata).await
            } else {
                OutputMetadata::default()
            };
            let thumbnail = metadata.thumbnail.clone();

            match self.publish_artifact(artifact, metadata).await {
                Ok(published) => artifacts.push(published),
                Err(e) => {
                    let unpublished = &output.artifacts[index..];
                    ctx.logger.log_warning(&format!(
                        "publish failed, removing {} unpublished outputs",
                        unpublished.len()
                    ));
                    let mut leftovers: Vec<&Path> = unpublished.iter().map(PathBuf::as_path).collect();
                    leftovers.extend(thumbnail.as_deref());
                    remove_partial_outputs(leftovers).await;
                    return Err(e);
                }
            }
        }

        Ok(serde_json::to_value(artifacts)?)
    }

    async fn publish_artifact(&self, artifact: &Path, metadata: OutputMetadata) -> WorkerResult<ComposeArtifact> {
        let file_url = self.publish(artifact).await?;
        let thumbnail_url = match &metadata.thumbnail {
            Some(thumbnail) => Some(self.publish(thumbnail).await?),
            None => None,
        };

        Ok(ComposeArtifact {
            file_url,
            thumbnail_url,
            filesize: metadata.filesize,
            duration: metadata.duration,
            bitrate: metadata.bitrate,
            encoder: metadata.encoder,
        })
    }

    /// Publish a local file under its own file name.
    pub(crate) async fn publish(&self, path: &Path) -> WorkerResult<String> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| WorkerError::invalid_request(format!("no file name in {}", path.display())))?;
        self.storage
            .publish(path, &file_name)
            .await
            .map_err(WorkerError::upload_failed)
    }
}

/// Best-effort removal of whatever a failed run left behind.
pub(crate) async fn remove_partial_outputs(paths: Vec<&Path>) {
    for path in paths {
        let _ = tokio::fs::remove_file(path).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_artifact_omits_missing_fields() {
        let artifact = ComposeArtifact {
            file_url: "http://h/download/a.mp4".into(),
            thumbnail_url: None,
            filesize: Some(10),
            duration: None,
            bitrate: None,
            encoder: None,
        };
        assert_eq!(
            serde_json::to_value(&artifact).unwrap(),
            json!({"file_url": "http://h/download/a.mp4", "filesize": 10})
        );
    }
}

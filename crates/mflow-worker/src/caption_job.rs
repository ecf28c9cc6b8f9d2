//! Caption burn-in jobs.

use serde_json::Value;

use mflow_media::caption_plan;
use mflow_models::CaptionRequest;

use crate::compose_job::remove_partial_outputs;
use crate::error::{WorkerError, WorkerResult};
use crate::handler::{JobContext, MediaJobHandler};

impl MediaJobHandler {
    pub(crate) async fn run_caption(
        &self,
        ctx: &mut JobContext<'_>,
        request: CaptionRequest,
    ) -> WorkerResult<Value> {
        if request.video_url.trim().is_empty() {
            return Err(WorkerError::invalid_request("video_url is empty"));
        }
        if request.captions.trim().is_empty() {
            return Err(WorkerError::invalid_request("captions is empty"));
        }
        ctx.logger.log_start("caption burn-in");

        let video = ctx.fetch(self.storage.as_ref(), &request.video_url).await?;
        let subtitles = ctx.fetch(self.storage.as_ref(), &request.captions).await?;
        if tokio::fs::metadata(&subtitles).await?.len() == 0 {
            return Err(WorkerError::invalid_request("subtitle file is empty"));
        }

        let output = self.work_dir().join(format!("{}_captioned.mp4", ctx.job_id));
        let plan = caption_plan(&video, &subtitles, &output)?;
        if let Err(e) = self.runner.run(&plan).await {
            remove_partial_outputs(plan.outputs()).await;
            return Err(e.into());
        }

        let url = self.publish(&output).await?;
        ctx.logger.log_progress(&format!("published {url}"));
        Ok(Value::String(url))
    }
}

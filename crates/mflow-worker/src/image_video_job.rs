//! Image-to-video jobs.

use serde_json::Value;

use mflow_media::{image_to_video_plan, read_image_dimensions};
use mflow_models::ImageToVideoRequest;

use crate::compose_job::remove_partial_outputs;
use crate::error::{WorkerError, WorkerResult};
use crate::handler::{JobContext, MediaJobHandler};

impl MediaJobHandler {
    pub(crate) async fn run_image_to_video(
        &self,
        ctx: &mut JobContext<'_>,
        request: ImageToVideoRequest,
    ) -> WorkerResult<Value> {
        if request.image_url.trim().is_empty() {
            return Err(WorkerError::invalid_request("image_url is empty"));
        }
        ctx.logger.log_start(&format!(
            "{}s at {} fps",
            request.length, request.frame_rate
        ));

        let image = ctx.fetch(self.storage.as_ref(), &request.image_url).await?;
        let dimensions = read_image_dimensions(&image).await?;

        let output = self.work_dir().join(format!("{}.mp4", ctx.job_id));
        let plan = image_to_video_plan(&image, dimensions, request.length, request.frame_rate, &output)?;
        if let Err(e) = self.runner.run(&plan).await {
            remove_partial_outputs(plan.outputs()).await;
            return Err(e.into());
        }

        let url = self.publish(&output).await?;
        ctx.logger.log_progress(&format!("published {url}"));
        Ok(Value::String(url))
    }
}

//! Request handlers.

pub mod health;
pub mod jobs;

pub use health::health;
pub use jobs::{submit_caption, submit_compose, submit_image_to_video};

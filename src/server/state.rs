//! Shared handler state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::llm::MultimodalModel;
use crate::pipeline::MultimodalPipeline;
use crate::tts::TextToSpeech;

/// Cloned into every handler; all services sit behind `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<MultimodalPipeline>,
    upload_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(pipeline: Arc<MultimodalPipeline>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            pipeline,
            upload_dir: Arc::new(upload_dir.into()),
        }
    }

    pub fn pipeline(&self) -> &MultimodalPipeline {
        &self.pipeline
    }

    pub fn model(&self) -> &dyn MultimodalModel {
        self.pipeline.model().as_ref()
    }

    pub fn tts(&self) -> &TextToSpeech {
        self.pipeline.tts().as_ref()
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }
}

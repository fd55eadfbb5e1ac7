//! In-memory ClipboardReader for unit tests

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::backend::ClipboardReader;
use super::error::ClipboardError;
use super::format::{ClipboardImage, ImageFormat};
use crate::exec::ExecError;

#[derive(Debug, Clone, Copy)]
pub enum Answer {
    Yes,
    No,
    Fail(&'static str),
}

#[derive(Debug, Default)]
pub struct Calls {
    pub available: AtomicUsize,
    pub has_image: AtomicUsize,
    pub detect: AtomicUsize,
    pub read: AtomicUsize,
}

pub struct StubReader {
    name: &'static str,
    tool: String,
    available: bool,
    has_image: Answer,
    image: Option<Result<ClipboardImage, &'static str>>,
    calls: Arc<Calls>,
}

impl StubReader {
    pub fn new(name: &'static str) -> Self {
        StubReader {
            name,
            tool: name.to_string(),
            available: true,
            has_image: Answer::No,
            image: None,
            calls: Arc::new(Calls::default()),
        }
    }

    pub fn tool(mut self, tool: &str) -> Self {
        self.tool = tool.to_string();
        self
    }

    pub fn available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    pub fn has_image(mut self, answer: Answer) -> Self {
        self.has_image = answer;
        self
    }

    pub fn image(mut self, image: Result<ClipboardImage, &'static str>) -> Self {
        self.image = Some(image);
        self
    }

    pub fn calls(&self) -> Arc<Calls> {
        Arc::clone(&self.calls)
    }

    fn failure(&self, message: &str) -> ClipboardError {
        ClipboardError::Tool {
            tool: self.name,
            source: ExecError::Failed {
                program: self.name.to_string(),
                code: Some(1),
                stderr: message.to_string(),
            },
        }
    }

    fn image_result(&self) -> Result<ClipboardImage, ClipboardError> {
        match &self.image {
            Some(Ok(image)) => Ok(image.clone()),
            Some(Err(message)) => Err(self.failure(message)),
            None => Err(ClipboardError::NoImage),
        }
    }
}

#[async_trait]
impl ClipboardReader for StubReader {
    fn name(&self) -> &'static str {
        self.name
    }

    fn required_tool(&self) -> String {
        self.tool.clone()
    }

    async fn is_tool_available(&self) -> bool {
        self.calls.available.fetch_add(1, Ordering::SeqCst);
        self.available
    }

    async fn has_image(&self) -> Result<bool, ClipboardError> {
        self.calls.has_image.fetch_add(1, Ordering::SeqCst);
        match self.has_image {
            Answer::Yes => Ok(true),
            Answer::No => Ok(false),
            Answer::Fail(message) => Err(self.failure(message)),
        }
    }

    async fn detect_format(&self) -> Result<ImageFormat, ClipboardError> {
        self.calls.detect.fetch_add(1, Ordering::SeqCst);
        self.image_result().map(|image| image.format)
    }

    async fn read_image(&self) -> Result<ClipboardImage, ClipboardError> {
        self.calls.read.fetch_add(1, Ordering::SeqCst);
        self.image_result()
    }
}

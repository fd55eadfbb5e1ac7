use async_trait::async_trait;

use super::backend::ClipboardReader;
use super::error::{BackendFailure, ClipboardError};
use super::format::{ClipboardImage, ImageFormat};

/// Ordered composite of readers, tried front to back until one succeeds
///
/// Members are awaited strictly in sequence. Nothing is cached between calls:
/// the clipboard may change, so every call starts again from the first member.
pub struct FallbackChain {
    readers: Vec<Box<dyn ClipboardReader>>,
}

impl FallbackChain {
    /// Build a chain from an ordered list of readers
    ///
    /// # Panics
    ///
    /// Panics if `readers` is empty; an empty chain is a construction bug.
    pub fn new(readers: Vec<Box<dyn ClipboardReader>>) -> Self {
        assert!(
            !readers.is_empty(),
            "FallbackChain requires at least one reader"
        );
        FallbackChain { readers }
    }

    pub fn members(&self) -> &[Box<dyn ClipboardReader>] {
        &self.readers
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    /// Member names in chain order
    pub fn member_names(&self) -> Vec<&'static str> {
        self.readers.iter().map(|r| r.name()).collect()
    }
}

#[async_trait]
impl ClipboardReader for FallbackChain {
    fn name(&self) -> &'static str {
        "fallback-chain"
    }

    fn required_tool(&self) -> String {
        self.readers
            .iter()
            .map(|r| r.required_tool())
            .collect::<Vec<_>>()
            .join(" or ")
    }

    async fn is_tool_available(&self) -> bool {
        for reader in &self.readers {
            if reader.is_tool_available().await {
                return true;
            }
        }
        false
    }

    async fn has_image(&self) -> Result<bool, ClipboardError> {
        for reader in &self.readers {
            match reader.has_image().await {
                Ok(true) => {
                    log::debug!("{} reports an image on the clipboard", reader.name());
                    return Ok(true);
                }
                Ok(false) => {}
                Err(e) => log::warn!("{} image probe failed: {}", reader.name(), e),
            }
        }
        Ok(false)
    }

    async fn detect_format(&self) -> Result<ImageFormat, ClipboardError> {
        let mut failures = Vec::new();
        for reader in &self.readers {
            match reader.detect_format().await {
                Ok(format) => {
                    log::debug!("{} detected {} image", reader.name(), format);
                    return Ok(format);
                }
                Err(error) => failures.push(BackendFailure {
                    backend: reader.name(),
                    error,
                }),
            }
        }
        Err(ClipboardError::Aggregate(failures))
    }

    async fn read_image(&self) -> Result<ClipboardImage, ClipboardError> {
        let mut failures = Vec::new();
        for reader in &self.readers {
            match reader.read_image().await {
                Ok(image) => {
                    log::info!(
                        "Read {} bytes of {} from clipboard via {}",
                        image.data.len(),
                        image.format,
                        reader.name()
                    );
                    return Ok(image);
                }
                Err(error) => failures.push(BackendFailure {
                    backend: reader.name(),
                    error,
                }),
            }
        }
        Err(ClipboardError::Aggregate(failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::stub::{Answer, StubReader};
    use std::sync::atomic::Ordering;

    fn png(byte: u8) -> ClipboardImage {
        ClipboardImage::new(vec![byte; 4], ImageFormat::Png)
    }

    #[test]
    #[should_panic(expected = "at least one reader")]
    fn test_empty_chain_panics() {
        FallbackChain::new(Vec::new());
    }

    #[test]
    fn test_required_tool_joins_members() {
        let chain = FallbackChain::new(vec![
            Box::new(StubReader::new("a").tool("xclip")),
            Box::new(StubReader::new("b").tool("wl-clipboard")),
        ]);
        assert_eq!(chain.required_tool(), "xclip or wl-clipboard");
        assert_eq!(chain.member_names(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_is_tool_available_short_circuits() {
        let first = StubReader::new("a").available(false);
        let second = StubReader::new("b").available(true);
        let third = StubReader::new("c").available(true);
        let third_calls = third.calls();

        let chain = FallbackChain::new(vec![Box::new(first), Box::new(second), Box::new(third)]);
        assert!(chain.is_tool_available().await);
        assert_eq!(third_calls.available.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_has_image_skips_throwing_member() {
        // X11 probe throws, Wayland reports an image
        let chain = FallbackChain::new(vec![
            Box::new(StubReader::new("xclip").has_image(Answer::Fail("display closed"))),
            Box::new(StubReader::new("wl-paste").has_image(Answer::Yes)),
            Box::new(StubReader::new("xclip-file")),
        ]);
        assert!(chain.has_image().await.unwrap());
    }

    #[tokio::test]
    async fn test_has_image_false_when_exhausted() {
        let chain = FallbackChain::new(vec![
            Box::new(StubReader::new("a").has_image(Answer::No)),
            Box::new(StubReader::new("b").has_image(Answer::Fail("boom"))),
        ]);
        assert!(!chain.has_image().await.unwrap());
    }

    #[tokio::test]
    async fn test_read_returns_first_success_and_stops() {
        let third = StubReader::new("c").image(Ok(png(3)));
        let third_calls = third.calls();

        let chain = FallbackChain::new(vec![
            Box::new(StubReader::new("a").image(Err("a broke"))),
            Box::new(StubReader::new("b").image(Ok(png(2)))),
            Box::new(third),
        ]);

        let image = chain.read_image().await.unwrap();
        assert_eq!(image, png(2));
        assert_eq!(third_calls.read.load(Ordering::SeqCst), 0);

        let format = chain.detect_format().await.unwrap();
        assert_eq!(format, ImageFormat::Png);
        assert_eq!(third_calls.detect.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_failures_aggregate_in_order() {
        let chain = FallbackChain::new(vec![
            Box::new(StubReader::new("a").image(Err("first"))),
            Box::new(StubReader::new("b").image(Err("second"))),
            Box::new(StubReader::new("c").image(Err("third"))),
        ]);

        let err = chain.read_image().await.unwrap_err();
        let failures = err.failures();
        assert_eq!(failures.len(), 3);
        assert_eq!(
            failures.iter().map(|f| f.backend).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        assert!(failures[0].error.to_string().contains("first"));
        assert!(failures[1].error.to_string().contains("second"));
        assert!(failures[2].error.to_string().contains("third"));

        let message = err.to_string();
        let first = message.find("first").unwrap();
        let third = message.find("third").unwrap();
        assert!(first < third);
    }

    #[tokio::test]
    async fn test_every_call_restarts_from_front() {
        let first = StubReader::new("a").image(Err("nope"));
        let first_calls = first.calls();
        let chain = FallbackChain::new(vec![
            Box::new(first),
            Box::new(StubReader::new("b").image(Ok(png(1)))),
        ]);

        chain.read_image().await.unwrap();
        chain.read_image().await.unwrap();
        assert_eq!(first_calls.read.load(Ordering::SeqCst), 2);
    }
}

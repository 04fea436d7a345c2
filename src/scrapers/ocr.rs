use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::task::JoinError;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("image is empty")]
    EmptyImage,
    #[error("failed to invoke {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("OCR engine failed: {0}")]
    EngineFailed(String),
}

/// Turns an image into raw multi-line text
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError>;
}

/// Runs the `tesseract` CLI with the image on stdin
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
    lang: String,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new()
    }
}

impl TesseractOcr {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            lang: "eng".to_string(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    fn spawn_error(&self, source: std::io::Error) -> OcrError {
        OcrError::Spawn {
            binary: self.binary.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl TextRecognizer for TesseractOcr {
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        if image.is_empty() {
            return Err(OcrError::EmptyImage);
        }

        let mut child = Command::new(&self.binary)
            .arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| OcrError::EngineFailed("stdin unavailable".to_string()))?;
        let input = image.to_vec();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        if let Some(reason) = writer_failure(writer.await) {
            warn!(%reason, "Failed to feed slip image to OCR engine");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::EngineFailed(stderr.trim().to_string()));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(bytes = image.len(), chars = text.len(), "Extracted text from slip image");
        Ok(text)
    }
}

/// Why the stdin writer task failed, if it did
fn writer_failure(joined: Result<std::io::Result<()>, JoinError>) -> Option<String> {
    match joined {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(format!("write error: {}", e)),
        Err(e) => Some(format!("writer task aborted: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[tokio::test]
    async fn test_writer_failures_are_reported() {
        assert!(writer_failure(Ok(Ok(()))).is_none());

        let broken = writer_failure(Ok(Err(Error::new(ErrorKind::BrokenPipe, "pipe closed"))));
        assert!(broken.unwrap().contains("pipe closed"));

        let panicked: Result<std::io::Result<()>, JoinError> = tokio::spawn(async {
            if true {
                panic!("writer blew up");
            }
            Ok(())
        })
        .await;
        let reason = writer_failure(panicked).unwrap();
        assert!(reason.starts_with("writer task aborted"));
    }

    #[tokio::test]
    async fn test_empty_image_is_rejected() {
        let ocr = TesseractOcr::new();
        let result = ocr.recognize(&[]).await;
        assert!(matches!(result, Err(OcrError::EmptyImage)));
    }

    #[tokio::test]
    async fn test_missing_binary_reports_spawn_error() {
        let ocr = TesseractOcr::new().with_binary("/nonexistent/tesseract-binary");
        let result = ocr.recognize(b"\x89PNG").await;
        match result {
            Err(OcrError::Spawn { binary, .. }) => {
                assert_eq!(binary, "/nonexistent/tesseract-binary")
            }
            other => panic!("expected spawn error, got {:?}", other),
        }
    }
}

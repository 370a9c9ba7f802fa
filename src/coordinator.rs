use anyhow::Result;
use std::future::Future;
use std::path::PathBuf;

use crate::data_uri;
use crate::failure::FailureKind;
#[cfg(test)]
use crate::gemini::ImageService;
use crate::history::History;
use crate::locale::Language;
use crate::storage::KeyValueStore;
use crate::types::{AspectRatio, GeneratedImage, RequestStatus};

/// Snapshot of the form taken when a generation starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub reference: Option<String>,
}

/// Owns everything the interface shows and every transition between states.
pub struct Coordinator<S: KeyValueStore> {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    current_image: Option<GeneratedImage>,
    reference_image: Option<GeneratedImage>,
    history: History<S>,
    generation: RequestStatus,
    enhancement: RequestStatus,
    error: Option<String>,
    language: Language,
}

impl<S: KeyValueStore> Coordinator<S> {
    pub fn new(history: History<S>, language: Language) -> Self {
        Coordinator {
            prompt: String::new(),
            aspect_ratio: AspectRatio::default(),
            current_image: None,
            reference_image: None,
            history,
            generation: RequestStatus::Idle,
            enhancement: RequestStatus::Idle,
            error: None,
            language,
        }
    }

    pub fn current_image(&self) -> Option<&GeneratedImage> {
        self.current_image.as_ref()
    }

    pub fn reference_image(&self) -> Option<&GeneratedImage> {
        self.reference_image.as_ref()
    }

    pub fn history(&self) -> &History<S> {
        &self.history
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[cfg(test)]
    pub fn generation_status(&self) -> RequestStatus {
        self.generation
    }

    pub fn is_generating(&self) -> bool {
        self.generation.is_pending()
    }

    pub fn is_enhancing(&self) -> bool {
        self.enhancement.is_pending()
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn has_prompt(&self) -> bool {
        !self.prompt.trim().is_empty()
    }

    pub fn set_prompt(&mut self, prompt: String) {
        self.prompt = prompt;
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: AspectRatio) {
        self.aspect_ratio = aspect_ratio;
    }

    pub fn apply_suggestion(&mut self, suggestion: &str) {
        self.prompt = suggestion.to_string();
    }

    /// Returns `None` for a blank prompt, in which case nothing changes.
    pub fn begin_generation(&mut self) -> Option<GenerationRequest> {
        if !self.has_prompt() {
            return None;
        }

        self.generation = RequestStatus::Pending;
        self.error = None;
        self.current_image = None;

        Some(GenerationRequest {
            prompt: self.prompt.clone(),
            aspect_ratio: self.aspect_ratio,
            reference: self.reference_image.as_ref().map(|r| r.url.clone()),
        })
    }

    pub fn finish_generation(&mut self, request: GenerationRequest, outcome: Result<Option<String>>) {
        match outcome {
            Ok(Some(url)) => {
                let image = GeneratedImage::new(url, request.prompt, request.aspect_ratio);
                tracing::info!(id = %image.id, aspect_ratio = %image.aspect_ratio, "image generated");
                self.current_image = Some(image.clone());
                self.history.append(image);
                self.generation = RequestStatus::Succeeded;
            }
            Ok(None) => self.fail(FailureKind::NoImage),
            Err(e) => {
                let message = format!("{:#}", e);
                tracing::error!(error = %message, "generation failed");
                self.fail(FailureKind::classify(&message));
            }
        }
    }

    fn fail(&mut self, kind: FailureKind) {
        self.error = Some(kind.message(self.language).to_string());
        self.generation = RequestStatus::Failed;
    }

    #[cfg(test)]
    pub async fn generate<G: ImageService + ?Sized>(&mut self, service: &G) -> Option<&GeneratedImage> {
        let request = self.begin_generation()?;
        let outcome = service
            .request_image(&request.prompt, request.aspect_ratio, request.reference.as_deref())
            .await;
        self.finish_generation(request, outcome);
        self.current_image.as_ref()
    }

    /// Returns the text to enhance, or `None` if blank or already in flight.
    pub fn begin_enhancement(&mut self) -> Option<String> {
        if !self.has_prompt() || self.enhancement.is_pending() {
            return None;
        }
        self.enhancement = RequestStatus::Pending;
        Some(self.prompt.clone())
    }

    pub fn finish_enhancement(&mut self, outcome: Result<Option<String>>) {
        match outcome {
            Ok(Some(enhanced)) => {
                self.prompt = enhanced;
                self.enhancement = RequestStatus::Succeeded;
            }
            Ok(None) => {
                tracing::warn!("enhancement returned no text");
                self.enhancement = RequestStatus::Failed;
            }
            Err(e) => {
                let message = format!("{:#}", e);
                tracing::error!(error = %message, "failed to enhance prompt");
                self.enhancement = RequestStatus::Failed;
            }
        }
    }

    #[cfg(test)]
    pub async fn enhance<G: ImageService + ?Sized>(&mut self, service: &G) -> Option<&str> {
        let original = self.begin_enhancement()?;
        let outcome = service.request_enhancement(&original).await;
        let replaced = matches!(outcome, Ok(Some(_)));
        self.finish_enhancement(outcome);
        replaced.then_some(self.prompt.as_str())
    }

    /// Shows a history entry again, reusing its prompt and aspect ratio.
    pub fn select_from_history(&mut self, id: &str) -> bool {
        let Some(entry) = self.history.find(id).cloned() else {
            return false;
        };
        self.prompt = entry.prompt.clone();
        self.aspect_ratio = entry.aspect_ratio;
        self.current_image = Some(entry);
        true
    }

    pub fn use_as_reference(&mut self, image: GeneratedImage) {
        self.reference_image = Some(image);
    }

    pub fn clear_reference(&mut self) {
        self.reference_image = None;
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Snapshots the displayed image; the returned future does the encoding off the UI thread.
    pub fn download_current(&self, dir: PathBuf) -> impl Future<Output = Result<PathBuf>> + Send + 'static {
        let image = self.current_image.clone();
        async move {
            let image = image.ok_or_else(|| anyhow::anyhow!("No image to download"))?;
            data_uri::save_png_detached(image, dir).await
        }
    }
}

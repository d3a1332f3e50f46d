//! Content generation boundary.
//!
//! The HTTP clients for the two providers live outside this crate. They are
//! plugged in through [`GenerationOrchestrator`], which returns slide texts and
//! base64 image payloads. Everything the application does *around* those
//! calls is here and is deterministic:
//!
//! - prompt templating ([`thesis_extraction_prompt`], [`slide_generation_prompt`],
//!   [`fill_thesis_prompt`], [`image_prompt`])
//! - splitting the model's reply into slides ([`split_slide_texts`])
//! - planning image requests per provider ([`ImageRequest`]), including the
//!   OpenAI 4:5 square-then-crop path
//! - building a [`Carousel`] from a result ([`generate_carousel`]) and
//!   regenerating one background with rollback ([`regenerate_image`])

use crate::imaging::{ImagingError, crop_to_ratio};
use crate::ratio::{ApiProvider, OPENAI_CROPPED_RATIO, openai_image_size};
use crate::settings::{
    ARTICLE_HEADING, ARTICLE_PLACEHOLDER, GenerationSettings, LAST_SLIDE_IMAGE_PROMPT, SLIDE_BREAK,
    THESIS_EXTRACTION_PROMPT, THESIS_PLACEHOLDER, VisualSettings,
};
use crate::slides::{Background, Carousel};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

/// Appended to OpenAI prompts when a square image will be cropped to 4:5.
pub const CROP_HINT: &str = "IMPORTANT: This image will be vertically cropped to a 4:5 aspect \
ratio. Compose it with the main subject in the center, leaving ample space at the top and \
bottom to allow for cropping.";

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Please provide your {0} API key to continue")]
    MissingApiKey(&'static str),
    #[error("Provider request failed: {0}")]
    Provider(String),
    #[error("The reply contained no usable slide separators")]
    NoSlides,
    #[error("Provider returned an unusable image: {0}")]
    InvalidImage(String),
    #[error("Slide {0} does not have an image background")]
    NotAnImageSlide(u32),
    #[error("No slide with id {0}")]
    UnknownSlide(u32),
    #[error("No reference text to generate an image from")]
    NoSourceText,
}

impl From<ImagingError> for OrchestratorError {
    fn from(e: ImagingError) -> Self {
        Self::InvalidImage(e.to_string())
    }
}

/// One generated slide text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideText {
    pub slide_number: u32,
    pub text: String,
}

/// Output of a bulk generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub slides: Vec<SlideText>,
    /// Base64 JPEG for the first slide.
    pub background_image_first: String,
    /// Base64 JPEG for the last slide.
    pub background_image_last: String,
}

/// The external text + image generator.
///
/// Implementations perform network I/O and are expected to use
/// [`ImageRequest`] to shape image calls and [`ImageRequest::finish`] to
/// post-process the returned payload.
pub trait GenerationOrchestrator {
    fn generate(
        &self,
        article: &str,
        api_key: &str,
        settings: &GenerationSettings,
        on_progress: &mut dyn FnMut(&str),
    ) -> Result<GenerationResult, OrchestratorError>;

    /// Produce a new base64 image for slide `slide_id` of `total_slides`.
    fn regenerate_image(
        &self,
        source_text: &str,
        api_key: &str,
        settings: &GenerationSettings,
        slide_id: u32,
        total_slides: u32,
    ) -> Result<String, OrchestratorError>;
}

// ============================================================================
// Prompt helpers
// ============================================================================

pub fn thesis_extraction_prompt(article: &str) -> String {
    THESIS_EXTRACTION_PROMPT.replacen(ARTICLE_PLACEHOLDER, article, 1)
}

pub fn slide_generation_prompt(settings: &GenerationSettings, article: &str) -> String {
    format!(
        "{}\n\n---\n\n{}\n\n{}",
        settings.slide_prompt, ARTICLE_HEADING, article
    )
}

pub fn fill_thesis_prompt(template: &str, thesis: &str) -> String {
    template.replace(THESIS_PLACEHOLDER, thesis)
}

/// Image prompt for slide `slide_id`: the closing prompt for the last slide,
/// the configured prompt otherwise.
pub fn image_prompt(settings: &GenerationSettings, thesis: &str, slide_id: u32, total: u32) -> String {
    let template = if slide_id == total && total > 1 {
        LAST_SLIDE_IMAGE_PROMPT
    } else {
        settings.image_prompt.as_str()
    };
    fill_thesis_prompt(template, thesis)
}

/// Split a model reply on the slide separator, trimming and dropping blanks.
pub fn split_slide_texts(raw: &str) -> Result<Vec<SlideText>, OrchestratorError> {
    let slides: Vec<SlideText> = raw
        .split(SLIDE_BREAK)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .enumerate()
        .map(|(i, text)| SlideText {
            slide_number: i as u32 + 1,
            text: text.to_string(),
        })
        .collect();
    if slides.is_empty() {
        return Err(OrchestratorError::NoSlides);
    }
    Ok(slides)
}

// ============================================================================
// Image request planning
// ============================================================================

/// How an image should be requested from a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub provider: ApiProvider,
    pub model: String,
    pub prompt: String,
    /// Ratio passed to Gemini, or the ratio matching `size` for OpenAI.
    pub aspect_ratio: &'static str,
    /// OpenAI pixel size (`"1024x1024"` etc.); `None` for Gemini.
    pub size: Option<&'static str>,
    /// Ratio to crop the returned image to, if the provider cannot produce it.
    pub crop_to: Option<&'static str>,
}

impl ImageRequest {
    pub fn plan(settings: &GenerationSettings, prompt: &str) -> Self {
        let provider = settings.api_provider;
        match provider {
            ApiProvider::OpenAi if settings.aspect_ratio == OPENAI_CROPPED_RATIO => Self {
                provider,
                model: settings.image_model.clone(),
                prompt: format!("{prompt}\n\n{CROP_HINT}"),
                aspect_ratio: "1:1",
                size: Some(openai_image_size("1:1")),
                crop_to: Some(OPENAI_CROPPED_RATIO),
            },
            ApiProvider::OpenAi => {
                let ratio = provider.effective_ratio(&settings.aspect_ratio);
                Self {
                    provider,
                    model: settings.image_model.clone(),
                    prompt: prompt.to_string(),
                    aspect_ratio: ratio,
                    size: Some(openai_image_size(ratio)),
                    crop_to: None,
                }
            }
            ApiProvider::Gemini => Self {
                provider,
                model: settings.image_model.clone(),
                prompt: prompt.to_string(),
                aspect_ratio: provider.effective_ratio(&settings.aspect_ratio),
                size: None,
                crop_to: None,
            },
        }
    }

    /// Post-process a provider payload: decode base64 and apply the planned
    /// crop. Returns base64 again, as the orchestrator contract expects.
    pub fn finish(&self, payload_b64: &str) -> Result<String, OrchestratorError> {
        let Some(ratio) = self.crop_to else {
            return Ok(payload_b64.to_string());
        };
        let bytes = STANDARD
            .decode(payload_b64.trim())
            .map_err(|e| OrchestratorError::InvalidImage(e.to_string()))?;
        let cropped = crop_to_ratio(&bytes, ratio)?;
        Ok(STANDARD.encode(cropped))
    }
}

// ============================================================================
// Session operations
// ============================================================================

fn require_key(settings: &GenerationSettings, api_key: &str) -> Result<(), OrchestratorError> {
    if api_key.trim().is_empty() {
        return Err(OrchestratorError::MissingApiKey(
            settings.api_provider.display_name(),
        ));
    }
    Ok(())
}

fn decode_image(b64: &str) -> Result<Vec<u8>, OrchestratorError> {
    STANDARD
        .decode(b64.trim())
        .map_err(|e| OrchestratorError::InvalidImage(e.to_string()))
}

/// Run a bulk generation and build the carousel.
///
/// Nothing is kept on failure: the caller goes back to the input stage with
/// the error.
pub fn generate_carousel(
    orchestrator: &dyn GenerationOrchestrator,
    article: &str,
    api_key: &str,
    settings: &GenerationSettings,
    visual: &VisualSettings,
    on_progress: &mut dyn FnMut(&str),
) -> Result<Carousel, OrchestratorError> {
    require_key(settings, api_key)?;
    let mut result = orchestrator.generate(article, api_key, settings, on_progress)?;
    if result.slides.is_empty() {
        return Err(OrchestratorError::NoSlides);
    }
    result.slides.sort_by_key(|s| s.slide_number);

    let first = decode_image(&result.background_image_first)?;
    let last = decode_image(&result.background_image_last)?;
    let texts = result.slides.into_iter().map(|s| s.text).collect();
    let carousel = Carousel::from_parts(texts, first, last, &visual.colors);
    tracing::info!(slides = carousel.len(), provider = %settings.api_provider, "carousel generated");
    Ok(carousel)
}

/// Replace the image of the first or last slide.
///
/// The slide holds [`Background::Pending`] only while the orchestrator runs. On any
/// failure the previous background is put back and the error returned; other
/// slides are never touched.
pub fn regenerate_image(
    carousel: &mut Carousel,
    orchestrator: &dyn GenerationOrchestrator,
    slide_id: u32,
    api_key: &str,
    settings: &GenerationSettings,
    article: &str,
) -> Result<(), OrchestratorError> {
    require_key(settings, api_key)?;
    if carousel.get(slide_id).is_none() {
        return Err(OrchestratorError::UnknownSlide(slide_id));
    }
    if !carousel.is_image_slide(slide_id) {
        return Err(OrchestratorError::NotAnImageSlide(slide_id));
    }
    let total = carousel.len() as u32;

    let Some(slide) = carousel.get_mut(slide_id) else {
        return Err(OrchestratorError::UnknownSlide(slide_id));
    };
    let source_text = if slide.text.trim().is_empty() {
        article.to_string()
    } else {
        slide.text.clone()
    };
    if source_text.trim().is_empty() {
        return Err(OrchestratorError::NoSourceText);
    }
    // Pending only for the duration of the call. The carousel stays borrowed
    // throughout, so the slide never leaves here Pending.
    let previous = std::mem::replace(&mut slide.background, Background::Pending);

    let outcome = orchestrator
        .regenerate_image(&source_text, api_key, settings, slide_id, total)
        .and_then(|b64| decode_image(&b64));

    match outcome {
        Ok(bytes) => {
            slide.background = Background::Image(bytes);
            Ok(())
        }
        Err(e) => {
            tracing::warn!(slide_id, error = %e, "image regeneration failed, restoring previous image");
            slide.background = previous;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DEFAULT_IMAGE_PROMPT;
    use crate::test_helpers::{gradient_image, png_bytes};
    use std::cell::RefCell;

    /// Scripted orchestrator that records calls.
    #[derive(Default)]
    struct ScriptedOrchestrator {
        result: Option<GenerationResult>,
        image: Option<String>,
        calls: RefCell<Vec<String>>,
    }

    impl GenerationOrchestrator for ScriptedOrchestrator {
        fn generate(
            &self,
            _article: &str,
            _api_key: &str,
            _settings: &GenerationSettings,
            on_progress: &mut dyn FnMut(&str),
        ) -> Result<GenerationResult, OrchestratorError> {
            on_progress("writing copy");
            self.calls.borrow_mut().push("generate".into());
            self.result
                .clone()
                .ok_or_else(|| OrchestratorError::Provider("HTTP 500".into()))
        }

        fn regenerate_image(
            &self,
            source_text: &str,
            _api_key: &str,
            _settings: &GenerationSettings,
            slide_id: u32,
            total_slides: u32,
        ) -> Result<String, OrchestratorError> {
            self.calls
                .borrow_mut()
                .push(format!("regenerate {slide_id}/{total_slides}: {source_text}"));
            self.image
                .clone()
                .ok_or_else(|| OrchestratorError::Provider("rate limited".into()))
        }
    }

    fn result(n: u32) -> GenerationResult {
        GenerationResult {
            // Deliberately out of order
            slides: (1..=n)
                .rev()
                .map(|i| SlideText {
                    slide_number: i,
                    text: format!("Slide {i}"),
                })
                .collect(),
            background_image_first: STANDARD.encode([1u8, 1]),
            background_image_last: STANDARD.encode([2u8, 2]),
        }
    }

    fn carousel(n: u32) -> Carousel {
        let orch = ScriptedOrchestrator {
            result: Some(result(n)),
            ..Default::default()
        };
        generate_carousel(
            &orch,
            "article",
            "key",
            &GenerationSettings::default(),
            &VisualSettings::default(),
            &mut |_| {},
        )
        .unwrap()
    }

    #[test]
    fn split_drops_blank_segments() {
        let raw = "\n  Hook\nbody ---SLIDE_BREAK--- \n---SLIDE_BREAK---Second\n---SLIDE_BREAK---   ";
        let slides = split_slide_texts(raw).unwrap();
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].text, "Hook\nbody");
        assert_eq!(slides[1], SlideText { slide_number: 2, text: "Second".into() });
    }

    #[test]
    fn split_without_content_fails() {
        assert!(matches!(split_slide_texts(" ---SLIDE_BREAK--- "), Err(OrchestratorError::NoSlides)));
    }

    #[test]
    fn prompts_are_filled() {
        let settings = GenerationSettings::default();
        assert!(thesis_extraction_prompt("ARTICLE BODY").ends_with("ARTICLE BODY\n"));
        assert!(slide_generation_prompt(&settings, "BODY").ends_with("\n\nBODY"));
        assert!(
            slide_generation_prompt(&settings, "BODY")
                .contains("\n\n---\n\nAnalise o seguinte artigo:\n\nBODY")
        );
        let cover = image_prompt(&settings, "O tempo é escasso", 1, 7);
        assert!(cover.contains("tese principal: O tempo é escasso."));
        assert!(!cover.contains("[TESE_PRINCIPAL]"));
        assert_eq!(cover, DEFAULT_IMAGE_PROMPT.replace("[TESE_PRINCIPAL]", "O tempo é escasso"));
        let closing = image_prompt(&settings, "O tempo é escasso", 7, 7);
        assert_eq!(closing, LAST_SLIDE_IMAGE_PROMPT.replace("[TESE_PRINCIPAL]", "O tempo é escasso"));
    }

    #[test]
    fn custom_template_without_placeholder_is_kept() {
        assert_eq!(fill_thesis_prompt("a lone tree", "x"), "a lone tree");
        assert_eq!(fill_thesis_prompt("[TESE_PRINCIPAL] / [TESE_PRINCIPAL]", "x"), "x / x");
    }

    #[test]
    fn openai_four_five_plans_square_with_crop() {
        let plan = ImageRequest::plan(&GenerationSettings::default(), "a door");
        assert_eq!(plan.size, Some("1024x1024"));
        assert_eq!(plan.crop_to, Some("4:5"));
        assert!(plan.prompt.starts_with("a door\n\n") && plan.prompt.ends_with(CROP_HINT));
    }

    #[test]
    fn openai_other_ratios_map_to_sizes() {
        let settings = GenerationSettings {
            aspect_ratio: "3:4".into(),
            ..GenerationSettings::default()
        };
        let plan = ImageRequest::plan(&settings, "p");
        assert_eq!(plan.aspect_ratio, "9:16");
        assert_eq!(plan.size, Some("1024x1792"));
        assert_eq!(plan.crop_to, None);
    }

    #[test]
    fn gemini_plans_closest_ratio() {
        let settings = GenerationSettings {
            api_provider: ApiProvider::Gemini,
            aspect_ratio: "2:3".into(),
            ..GenerationSettings::default()
        };
        let plan = ImageRequest::plan(&settings, "p");
        assert_eq!(plan.aspect_ratio, "3:4");
        assert_eq!(plan.size, None);
        assert_eq!(plan.prompt, "p");
    }

    #[test]
    fn finish_crops_square_payload_to_four_five() {
        let plan = ImageRequest::plan(&GenerationSettings::default(), "p");
        let payload = STANDARD.encode(png_bytes(&gradient_image(100, 100)));
        let out = STANDARD.decode(plan.finish(&payload).unwrap()).unwrap();
        let img = crate::imaging::decode(&out).unwrap();
        assert_eq!((img.width(), img.height()), (80, 100));
    }

    #[test]
    fn finish_passes_through_without_crop() {
        let settings = GenerationSettings {
            aspect_ratio: "1:1".into(),
            ..GenerationSettings::default()
        };
        let plan = ImageRequest::plan(&settings, "p");
        assert_eq!(plan.finish("not even base64").unwrap(), "not even base64");
    }

    #[test]
    fn finish_rejects_broken_payload() {
        let plan = ImageRequest::plan(&GenerationSettings::default(), "p");
        assert!(matches!(plan.finish("@@@"), Err(OrchestratorError::InvalidImage(_))));
        let junk = STANDARD.encode(b"not an image");
        assert!(matches!(plan.finish(&junk), Err(OrchestratorError::InvalidImage(_))));
    }

    #[test]
    fn generate_builds_sorted_carousel() {
        let c = carousel(5);
        let texts: Vec<&str> = c.slides().iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Slide 1", "Slide 2", "Slide 3", "Slide 4", "Slide 5"]);
        assert_eq!(c.get(1).unwrap().background, Background::Image(vec![1, 1]));
        assert_eq!(c.get(5).unwrap().background, Background::Image(vec![2, 2]));
    }

    #[test]
    fn generate_requires_api_key() {
        let orch = ScriptedOrchestrator::default();
        let err = generate_carousel(
            &orch,
            "a",
            "  ",
            &GenerationSettings::default(),
            &VisualSettings::default(),
            &mut |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, OrchestratorError::MissingApiKey("OpenAI")));
        assert!(orch.calls.borrow().is_empty());
    }

    #[test]
    fn generate_failure_propagates_and_reports_progress() {
        let orch = ScriptedOrchestrator::default();
        let mut messages = Vec::new();
        let err = generate_carousel(
            &orch,
            "a",
            "key",
            &GenerationSettings::default(),
            &VisualSettings::default(),
            &mut |m| messages.push(m.to_string()),
        )
        .unwrap_err();
        assert!(matches!(err, OrchestratorError::Provider(_)));
        assert_eq!(messages, vec!["writing copy"]);
    }

    #[test]
    fn regenerate_replaces_last_image() {
        let mut c = carousel(4);
        let orch = ScriptedOrchestrator {
            image: Some(STANDARD.encode([7u8, 7, 7])),
            ..Default::default()
        };
        regenerate_image(&mut c, &orch, 4, "key", &GenerationSettings::default(), "article").unwrap();
        assert_eq!(c.get(4).unwrap().background, Background::Image(vec![7, 7, 7]));
        assert_eq!(orch.calls.borrow()[0], "regenerate 4/4: Slide 4");
    }

    #[test]
    fn regenerate_leaves_no_pending_slide_and_other_slides_alone() {
        let mut c = carousel(5);
        let before = c.clone();
        let orch = ScriptedOrchestrator {
            image: Some(STANDARD.encode([9u8])),
            ..Default::default()
        };
        regenerate_image(&mut c, &orch, 1, "key", &GenerationSettings::default(), "article").unwrap();
        assert!(c.pending_ids().is_empty());
        assert_eq!(c.get(1).unwrap().background, Background::Image(vec![9]));
        for id in 2..=5 {
            assert_eq!(c.get(id), before.get(id));
        }
    }

    #[test]
    fn regenerate_failure_restores_previous_image() {
        let mut c = carousel(4);
        let before = c.clone();
        let orch = ScriptedOrchestrator::default();
        let err =
            regenerate_image(&mut c, &orch, 1, "key", &GenerationSettings::default(), "article")
                .unwrap_err();
        assert!(matches!(err, OrchestratorError::Provider(_)));
        assert_eq!(c, before);
        assert!(c.pending_ids().is_empty());
    }

    #[test]
    fn regenerate_bad_payload_restores_previous_image() {
        let mut c = carousel(3);
        let before = c.clone();
        let orch = ScriptedOrchestrator {
            image: Some("%%%".into()),
            ..Default::default()
        };
        let err =
            regenerate_image(&mut c, &orch, 3, "key", &GenerationSettings::default(), "article")
                .unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidImage(_)));
        assert_eq!(c, before);
    }

    #[test]
    fn regenerate_rejects_interior_and_unknown_slides() {
        let mut c = carousel(4);
        let orch = ScriptedOrchestrator::default();
        let settings = GenerationSettings::default();
        assert!(matches!(
            regenerate_image(&mut c, &orch, 2, "key", &settings, "a"),
            Err(OrchestratorError::NotAnImageSlide(2))
        ));
        assert!(matches!(
            regenerate_image(&mut c, &orch, 9, "key", &settings, "a"),
            Err(OrchestratorError::UnknownSlide(9))
        ));
        assert!(orch.calls.borrow().is_empty());
    }

    #[test]
    fn regenerate_falls_back_to_article_text() {
        let mut c = carousel(3);
        c.update_text(1, "   ");
        let orch = ScriptedOrchestrator {
            image: Some(STANDARD.encode([5u8])),
            ..Default::default()
        };
        regenerate_image(&mut c, &orch, 1, "key", &GenerationSettings::default(), "the article")
            .unwrap();
        assert_eq!(orch.calls.borrow()[0], "regenerate 1/3: the article");
    }
}

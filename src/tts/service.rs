//! `text_to_speech`: the single entry point of the synthesis core.
//!
//! ```text
//! text ─▶ clean (if markup) ─▶ resolve voice ─┬─ < threshold ─▶ one call ───────────┐
//!                                             └─ ≥ threshold ─▶ plan ─▶ parallel ───┤
//!                                                                 │ (any failure)    ▼
//!                                                                 └────▶ cascade ─▶ file
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::TtsConfig;
use crate::tts::assembler::{assemble, AudioStore, OutputKind, StorageError, Waveform};
use crate::tts::cascade::{FallbackCascade, Tier};
use crate::tts::engine::{synthesize_text, SpeechSynthesizer, SynthesisError};
use crate::tts::executor::ParallelExecutor;
use crate::tts::normalizer::{clean_text_for_tts, needs_cleaning};
use crate::tts::planner::ChunkPlanner;
use crate::tts::voices::{resolve_voice, VoiceSelection};

/// Synthesis orchestrator shared by the pipeline and the HTTP layer.
pub struct TextToSpeech {
    engine: Arc<dyn SpeechSynthesizer>,
    planner: ChunkPlanner,
    executor: ParallelExecutor,
    cascade: FallbackCascade,
    store: AudioStore,
    voices_dir: PathBuf,
    default_voice: String,
    default_speed: f32,
    chunk_threshold_chars: usize,
}

impl TextToSpeech {
    /// Build the orchestrator; every file is written into `output_dir`.
    pub fn new(
        engine: Arc<dyn SpeechSynthesizer>,
        config: &TtsConfig,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let store = AudioStore::new(output_dir, config.output_sample_rate);
        Self {
            planner: ChunkPlanner::from_config(config),
            executor: ParallelExecutor::new(Arc::clone(&engine), config.max_workers),
            cascade: FallbackCascade::new(Arc::clone(&engine), store.clone()),
            engine,
            store,
            voices_dir: config.voices_dir.clone(),
            default_voice: config.default_voice.clone(),
            default_speed: config.default_speed,
            chunk_threshold_chars: config.chunk_threshold_chars,
        }
    }

    pub fn store(&self) -> &AudioStore {
        &self.store
    }

    pub fn default_voice(&self) -> &str {
        &self.default_voice
    }

    /// Speed for callers that do not pick one.
    pub fn default_speed(&self) -> f32 {
        self.default_speed
    }

    /// Synthesize `text` and return the filename of the written WAV.
    ///
    /// Engine failures degrade the audio (partial, apology, silence) but are
    /// never returned.
    ///
    /// # Errors
    ///
    /// Only [`StorageError`], when the output file cannot be written.
    pub async fn text_to_speech(
        &self,
        text: &str,
        voice: &str,
        speed: f32,
    ) -> Result<String, StorageError> {
        let text = if needs_cleaning(text) {
            clean_text_for_tts(text)
        } else {
            text.to_string()
        };
        let voice = resolve_voice(voice, &self.voices_dir, &self.default_voice);

        let len = text.chars().count();
        if len < self.chunk_threshold_chars {
            log::debug!("tts: {len} chars, single-call path");
            return match synthesize_text(self.engine.as_ref(), &text, &voice, speed).await {
                Ok(samples) => self.store.write(&Waveform::new(samples), OutputKind::Response),
                Err(e) => {
                    log::warn!("tts: single-call synthesis failed: {e}");
                    // The single call already was the whole-text attempt.
                    self.cascade
                        .synthesize_from(Tier::SentenceBySentence, &text, &voice, speed)
                        .await
                }
            };
        }

        match self.synthesize_chunked(&text, &voice, speed).await {
            Ok(waveform) => self.store.write(&waveform, OutputKind::Response),
            Err(e) => {
                log::warn!("tts: chunked synthesis failed, falling back: {e}");
                self.cascade.synthesize_with_fallback(&text, &voice, speed).await
            }
        }
    }

    async fn synthesize_chunked(
        &self,
        text: &str,
        voice: &VoiceSelection,
        speed: f32,
    ) -> Result<Waveform, SynthesisError> {
        let chunks = self.planner.plan(text)?;
        log::debug!("tts: {} chunks, {} workers", chunks.len(), self.executor.max_workers());
        let results = self.executor.synthesize(chunks, voice, speed).await?;
        Ok(assemble(results))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::cascade::APOLOGY_TEXT;
    use crate::tts::engine::MockSynthesizer;
    use tempfile::{tempdir, TempDir};

    /// ~300 characters of plain prose in several sentences.
    const PROSE: &str = "The picture shows a small wooden boat resting on a calm lake. \
        Tall pine trees line the far shore under a pale morning sky. \
        A thin layer of mist hangs over the water near the reeds. \
        Two ducks swim slowly past the bow of the boat. \
        Nothing else moves in the scene, which feels very quiet.";

    struct Fixture {
        out: TempDir,
        voices: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                out: tempdir().unwrap(),
                voices: tempdir().unwrap(),
            }
        }

        fn service(&self, engine: Arc<MockSynthesizer>) -> TextToSpeech {
            let config = TtsConfig {
                voices_dir: self.voices.path().to_path_buf(),
                ..TtsConfig::default()
            };
            TextToSpeech::new(engine, &config, self.out.path())
        }

        fn samples(&self, name: &str) -> Vec<i16> {
            hound::WavReader::open(self.out.path().join(name))
                .unwrap()
                .samples::<i16>()
                .map(Result::unwrap)
                .collect()
        }
    }

    #[tokio::test]
    async fn short_text_uses_single_call() {
        let fx = Fixture::new();
        let engine = Arc::new(MockSynthesizer::ok());
        let name = fx
            .service(engine.clone())
            .text_to_speech("Hello.", "af_heart", 1.0)
            .await
            .unwrap();

        assert!(name.ends_with("_response.wav"));
        assert!(!name.ends_with("_error_response.wav"));
        assert_eq!(engine.texts(), vec!["Hello."]);
        assert_eq!(fx.samples(&name).len(), 6);
        assert!(fx.samples(&name).iter().any(|&s| s != 0));
    }

    #[tokio::test]
    async fn long_text_is_chunked_and_kept_in_order() {
        assert!(PROSE.chars().count() >= 150);
        let fx = Fixture::new();
        let engine = Arc::new(MockSynthesizer::ok());
        let name = fx
            .service(engine.clone())
            .text_to_speech(PROSE, "af_heart", 1.0)
            .await
            .unwrap();

        let chunks = ChunkPlanner::default().plan(PROSE).unwrap();
        let expected: usize = chunks.iter().map(|c| c.content.chars().count()).sum();
        assert_eq!(fx.samples(&name).len(), expected);
        assert_eq!(engine.texts().len(), chunks.len());
        assert!(!engine.texts().contains(&APOLOGY_TEXT.to_string()));
    }

    #[tokio::test]
    async fn run_on_text_without_sentence_breaks_is_spoken_whole() {
        let run_on = "and then the river kept going ".repeat(6).trim_end().to_string();
        assert!(run_on.chars().count() >= 150);
        assert!(!needs_cleaning(&run_on));

        let fx = Fixture::new();
        let engine = Arc::new(MockSynthesizer::ok());
        let name = fx
            .service(engine.clone())
            .text_to_speech(&run_on, "af_heart", 1.0)
            .await
            .unwrap();

        assert!(name.ends_with("_response.wav"));
        assert!(!name.ends_with("_error_response.wav"));
        assert!(!name.ends_with("_silent_response.wav"));
        assert_eq!(engine.texts(), vec![run_on.clone()]);
        assert_eq!(fx.samples(&name).len(), run_on.chars().count());
    }

    #[tokio::test]
    async fn always_failing_engine_reaches_apology_then_silence() {
        let fx = Fixture::new();
        let engine = Arc::new(MockSynthesizer::failing_when(|t| t != APOLOGY_TEXT));
        let name = fx
            .service(engine.clone())
            .text_to_speech(PROSE, "af_heart", 1.0)
            .await
            .unwrap();

        assert!(name.ends_with("_error_response.wav"));
        let texts = engine.texts();
        // Parallel chunks, whole text, then each sentence before the apology.
        assert!(texts.contains(&PROSE.to_string()));
        assert!(texts.contains(&"Two ducks swim slowly past the bow of the boat.".to_string()));
        assert_eq!(texts.last().map(String::as_str), Some(APOLOGY_TEXT));
    }

    #[tokio::test]
    async fn unknown_voice_falls_back_to_default() {
        let fx = Fixture::new();
        let engine = Arc::new(MockSynthesizer::ok());
        let name = fx
            .service(engine.clone())
            .text_to_speech("Hello there.", "xx_unknown", 1.0)
            .await
            .unwrap();

        assert!(name.ends_with("_response.wav"));
        assert_eq!(engine.voices(), vec!["af_heart"]);
    }

    #[tokio::test]
    async fn local_voice_asset_is_used_directly() {
        let fx = Fixture::new();
        std::fs::write(fx.voices.path().join("my_voice.pt"), b"weights").unwrap();
        let engine = Arc::new(MockSynthesizer::ok());
        fx.service(engine.clone())
            .text_to_speech("Hello there.", "my_voice", 1.0)
            .await
            .unwrap();

        assert_eq!(engine.voices(), vec!["my_voice"]);
    }

    #[tokio::test]
    async fn dead_engine_writes_exactly_one_second_of_silence() {
        let fx = Fixture::new();
        let service = fx.service(Arc::new(MockSynthesizer::failing()));

        for text in ["Hello.", PROSE] {
            let name = service.text_to_speech(text, "af_heart", 1.0).await.unwrap();
            assert!(name.ends_with("_silent_response.wav"));
            let samples = fx.samples(&name);
            assert_eq!(samples.len(), 22_050);
            assert!(samples.iter().all(|&s| s == 0));
        }
    }

    #[tokio::test]
    async fn markup_is_cleaned_before_synthesis() {
        let fx = Fixture::new();
        let engine = Arc::new(MockSynthesizer::ok());
        fx.service(engine.clone())
            .text_to_speech("**Bold** answer.", "af_heart", 1.0)
            .await
            .unwrap();

        assert_eq!(engine.texts(), vec!["Bold answer."]);
    }

    #[tokio::test]
    async fn short_text_failure_skips_repeating_whole_text() {
        let fx = Fixture::new();
        let engine = Arc::new(MockSynthesizer::failing_when(|t| t.contains(' ') && t.len() > 12));
        let name = fx
            .service(engine.clone())
            .text_to_speech("Hi there. Bye now.", "af_heart", 1.0)
            .await
            .unwrap();

        assert!(name.ends_with("_response.wav"));
        assert_eq!(engine.texts(), vec!["Hi there. Bye now.", "Hi there.", "Bye now."]);
        assert_eq!(fx.samples(&name).len(), "Hi there.".len() + "Bye now.".len());
    }
}

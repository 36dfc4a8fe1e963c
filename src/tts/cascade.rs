//! Four-tier synthesis fallback that always yields a playable file.
//!
//! ```text
//! WholeText ──fail──▶ SentenceBySentence ──no audio──▶ Apology ──fail──▶ Silence
//!   _response.wav       _response.wav              _error_response.wav  _silent_response.wav
//! ```
//!
//! Each tier returns `Result<Waveform, SynthesisError>`; the cascade matches
//! on the error, logs it and moves to the next tier.  Silence cannot fail,
//! so the only error leaving [`FallbackCascade::synthesize_with_fallback`]
//! is a storage failure.

use std::fmt;
use std::sync::Arc;

use crate::tts::assembler::{AudioStore, OutputKind, StorageError, Waveform};
use crate::tts::engine::{synthesize_text, SpeechSynthesizer, SynthesisError};
use crate::tts::planner::split_at_sentence_breaks;
use crate::tts::voices::VoiceSelection;

/// Spoken when no part of the real answer could be synthesized.
pub const APOLOGY_TEXT: &str = "I'm sorry, I couldn't generate audio for this response.";

/// Cascade tiers, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    WholeText,
    SentenceBySentence,
    Apology,
    Silence,
}

impl Tier {
    fn next(self) -> Option<Tier> {
        match self {
            Tier::WholeText => Some(Tier::SentenceBySentence),
            Tier::SentenceBySentence => Some(Tier::Apology),
            Tier::Apology => Some(Tier::Silence),
            Tier::Silence => None,
        }
    }

    fn output_kind(self) -> OutputKind {
        match self {
            Tier::WholeText | Tier::SentenceBySentence => OutputKind::Response,
            Tier::Apology => OutputKind::ErrorResponse,
            Tier::Silence => OutputKind::SilentResponse,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::WholeText => "whole-text",
            Tier::SentenceBySentence => "sentence-by-sentence",
            Tier::Apology => "apology",
            Tier::Silence => "silence",
        };
        f.write_str(name)
    }
}

/// The audio a cascade run settled on, before it is written.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeOutcome {
    pub tier: Tier,
    pub waveform: Waveform,
}

pub struct FallbackCascade {
    engine: Arc<dyn SpeechSynthesizer>,
    store: AudioStore,
}

impl FallbackCascade {
    pub fn new(engine: Arc<dyn SpeechSynthesizer>, store: AudioStore) -> Self {
        Self { engine, store }
    }

    /// Run every tier from the top and write the result.
    ///
    /// Synthesis failures never surface; the returned filename always names
    /// a valid WAV file.
    pub async fn synthesize_with_fallback(
        &self,
        text: &str,
        voice: &VoiceSelection,
        speed: f32,
    ) -> Result<String, StorageError> {
        self.synthesize_from(Tier::WholeText, text, voice, speed).await
    }

    /// Like [`synthesize_with_fallback`](Self::synthesize_with_fallback) but
    /// skipping the tiers above `start`.
    pub async fn synthesize_from(
        &self,
        start: Tier,
        text: &str,
        voice: &VoiceSelection,
        speed: f32,
    ) -> Result<String, StorageError> {
        let outcome = self.run(start, text, voice, speed).await;
        if outcome.tier > Tier::WholeText {
            log::info!("tts: cascade settled on {} output", outcome.tier);
        }
        self.store.write(&outcome.waveform, outcome.tier.output_kind())
    }

    /// Walk the tiers from `start` until one produces audio.
    pub async fn run(
        &self,
        start: Tier,
        text: &str,
        voice: &VoiceSelection,
        speed: f32,
    ) -> CascadeOutcome {
        let mut tier = start;
        loop {
            match self.attempt(tier, text, voice, speed).await {
                Ok(waveform) => return CascadeOutcome { tier, waveform },
                Err(e) => log::warn!("tts: {tier} tier failed: {e}"),
            }
            tier = match tier.next() {
                Some(next) => next,
                None => {
                    return CascadeOutcome {
                        tier: Tier::Silence,
                        waveform: Waveform::silence(self.store.sample_rate()),
                    }
                }
            };
        }
    }

    async fn attempt(
        &self,
        tier: Tier,
        text: &str,
        voice: &VoiceSelection,
        speed: f32,
    ) -> Result<Waveform, SynthesisError> {
        match tier {
            Tier::WholeText => self.whole_text(text, voice, speed).await,
            Tier::SentenceBySentence => self.sentence_by_sentence(text, voice, speed).await,
            Tier::Apology => self.whole_text(APOLOGY_TEXT, voice, speed).await,
            Tier::Silence => Ok(Waveform::silence(self.store.sample_rate())),
        }
    }

    async fn whole_text(
        &self,
        text: &str,
        voice: &VoiceSelection,
        speed: f32,
    ) -> Result<Waveform, SynthesisError> {
        let samples = synthesize_text(self.engine.as_ref(), text, voice, speed).await?;
        Ok(Waveform::new(samples))
    }

    /// Synthesize each sentence on its own, keeping whatever succeeds.
    async fn sentence_by_sentence(
        &self,
        text: &str,
        voice: &VoiceSelection,
        speed: f32,
    ) -> Result<Waveform, SynthesisError> {
        let mut samples = Vec::new();
        for (i, sentence) in split_at_sentence_breaks(text).into_iter().enumerate() {
            match synthesize_text(self.engine.as_ref(), sentence, voice, speed).await {
                Ok(audio) => samples.extend(audio),
                Err(e) => log::warn!("tts: sentence {i} failed: {e}"),
            }
        }
        if samples.is_empty() {
            return Err(SynthesisError::NoAudio);
        }
        Ok(Waveform::new(samples))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::engine::MockSynthesizer;
    use tempfile::tempdir;

    const TEXT: &str = "First sentence here. Second one follows! Third?";

    fn cascade(engine: Arc<MockSynthesizer>, dir: &std::path::Path) -> FallbackCascade {
        FallbackCascade::new(engine, AudioStore::new(dir, 22_050))
    }

    #[tokio::test]
    async fn whole_text_success_stops_at_tier_one() {
        let dir = tempdir().unwrap();
        let engine = Arc::new(MockSynthesizer::ok());
        let outcome = cascade(engine.clone(), dir.path())
            .run(Tier::WholeText, TEXT, &VoiceSelection::named("af_heart"), 1.0)
            .await;

        assert_eq!(outcome.tier, Tier::WholeText);
        assert_eq!(outcome.waveform.len(), TEXT.len());
        assert_eq!(engine.texts(), vec![TEXT]);
    }

    #[tokio::test]
    async fn whole_text_failure_falls_to_sentences() {
        let dir = tempdir().unwrap();
        // Only the full text is rejected.
        let engine = Arc::new(MockSynthesizer::failing_when(|t| t.len() > 25));
        let outcome = cascade(engine.clone(), dir.path())
            .run(Tier::WholeText, TEXT, &VoiceSelection::named("af_heart"), 1.0)
            .await;

        assert_eq!(outcome.tier, Tier::SentenceBySentence);
        let expected = "First sentence here.".len() + "Second one follows!".len() + "Third?".len();
        assert_eq!(outcome.waveform.len(), expected);
        assert_eq!(engine.texts().len(), 4);
    }

    #[tokio::test]
    async fn partial_sentences_keep_what_succeeded() {
        let dir = tempdir().unwrap();
        let engine = Arc::new(MockSynthesizer::failing_when(|t| t != "Third?"));
        let outcome = cascade(engine, dir.path())
            .run(Tier::WholeText, TEXT, &VoiceSelection::named("af_heart"), 1.0)
            .await;

        assert_eq!(outcome.tier, Tier::SentenceBySentence);
        assert_eq!(outcome.waveform.len(), "Third?".len());
    }

    #[tokio::test]
    async fn nothing_synthesizes_except_apology() {
        let dir = tempdir().unwrap();
        let engine = Arc::new(MockSynthesizer::failing_when(|t| t != APOLOGY_TEXT));
        let c = cascade(engine, dir.path());

        let name = c
            .synthesize_with_fallback(TEXT, &VoiceSelection::named("af_heart"), 1.0)
            .await
            .unwrap();
        assert!(name.ends_with("_error_response.wav"));

        let reader = hound::WavReader::open(dir.path().join(&name)).unwrap();
        assert_eq!(reader.len() as usize, APOLOGY_TEXT.chars().count());
    }

    #[tokio::test]
    async fn dead_engine_yields_one_second_of_silence() {
        let dir = tempdir().unwrap();
        let c = cascade(Arc::new(MockSynthesizer::failing()), dir.path());

        let name = c
            .synthesize_with_fallback(TEXT, &VoiceSelection::named("af_heart"), 1.0)
            .await
            .unwrap();
        assert!(name.ends_with("_silent_response.wav"));

        let mut reader = hound::WavReader::open(dir.path().join(&name)).unwrap();
        assert_eq!(reader.spec().sample_rate, 22_050);
        let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(samples.len(), 22_050);
        assert!(samples.iter().all(|&s| s == 0));
    }

    #[tokio::test]
    async fn starting_below_whole_text_skips_it() {
        let dir = tempdir().unwrap();
        let engine = Arc::new(MockSynthesizer::ok());
        let outcome = cascade(engine.clone(), dir.path())
            .run(
                Tier::SentenceBySentence,
                TEXT,
                &VoiceSelection::named("af_heart"),
                1.0,
            )
            .await;

        assert_eq!(outcome.tier, Tier::SentenceBySentence);
        assert!(!engine.texts().contains(&TEXT.to_string()));
    }

    #[test]
    fn tiers_map_to_suffixes() {
        assert_eq!(Tier::WholeText.output_kind(), OutputKind::Response);
        assert_eq!(Tier::SentenceBySentence.output_kind(), OutputKind::Response);
        assert_eq!(Tier::Apology.output_kind(), OutputKind::ErrorResponse);
        assert_eq!(Tier::Silence.output_kind(), OutputKind::SilentResponse);
        assert_eq!(Tier::Silence.next(), None);
    }
}

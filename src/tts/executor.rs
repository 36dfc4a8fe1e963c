//! Bounded parallel synthesis of planned chunks.
//!
//! ```text
//!  chunks ──▶ JoinSet ──┬─ worker (permit 1) ─ synthesize(chunk 0) ─┐
//!                       ├─ worker (permit 2) ─ synthesize(chunk 1) ─┤──▶ sort by ordinal
//!                       └─ waits for a permit ─ chunk 2 …          ─┘
//! ```
//!
//! A failed chunk contributes an empty [`SynthesisResult`]; only a run in
//! which *every* chunk is empty fails as a whole.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::tts::engine::{synthesize_text, SpeechSynthesizer, SynthesisError};
use crate::tts::planner::{PlanError, TextChunk};
use crate::tts::voices::VoiceSelection;

/// Audio produced for one chunk; `samples` is empty when the chunk failed.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisResult {
    pub ordinal: usize,
    pub samples: Vec<f32>,
}

/// Runs chunk synthesis concurrently with at most `max_workers` calls in
/// flight against the shared engine.
pub struct ParallelExecutor {
    engine: Arc<dyn SpeechSynthesizer>,
    max_workers: usize,
}

impl ParallelExecutor {
    /// `max_workers` is raised to 1 when given as 0.
    pub fn new(engine: Arc<dyn SpeechSynthesizer>, max_workers: usize) -> Self {
        Self {
            engine,
            max_workers: max_workers.max(1),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Synthesize every chunk and return the results in ordinal order.
    ///
    /// # Errors
    ///
    /// [`SynthesisError::AllChunksFailed`] when no chunk produced audio.
    pub async fn synthesize(
        &self,
        chunks: Vec<TextChunk>,
        voice: &VoiceSelection,
        speed: f32,
    ) -> Result<Vec<SynthesisResult>, SynthesisError> {
        if chunks.is_empty() {
            return Err(PlanError::Empty.into());
        }
        let total = chunks.len();

        // Every ordinal gets a slot so a crashed worker still leaves an entry.
        let mut slots: BTreeMap<usize, Vec<f32>> =
            chunks.iter().map(|c| (c.ordinal, Vec::new())).collect();

        let permits = Arc::new(Semaphore::new(self.max_workers));
        let mut workers = JoinSet::new();

        for chunk in chunks {
            let engine = Arc::clone(&self.engine);
            let permits = Arc::clone(&permits);
            let voice = voice.clone();

            workers.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let samples =
                    match synthesize_text(engine.as_ref(), &chunk.content, &voice, speed).await {
                        Ok(samples) => samples,
                        Err(e) => {
                            log::warn!("tts: chunk {} failed: {e}", chunk.ordinal);
                            Vec::new()
                        }
                    };
                (chunk.ordinal, samples)
            });
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((ordinal, samples)) => {
                    slots.insert(ordinal, samples);
                }
                Err(e) => log::error!("tts: synthesis worker panicked: {e}"),
            }
        }

        let results: Vec<SynthesisResult> = slots
            .into_iter()
            .map(|(ordinal, samples)| SynthesisResult { ordinal, samples })
            .collect();

        let succeeded = results.iter().filter(|r| !r.samples.is_empty()).count();
        if succeeded == 0 {
            return Err(SynthesisError::AllChunksFailed(total));
        }
        log::debug!("tts: {succeeded}/{total} chunks synthesized");
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::engine::{MockSynthesizer, SpeechSegment, TtsError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn chunks(texts: &[&str]) -> Vec<TextChunk> {
        texts
            .iter()
            .enumerate()
            .map(|(ordinal, t)| TextChunk {
                content: t.to_string(),
                ordinal,
            })
            .collect()
    }

    /// Text is a chunk number; later chunks finish first and every sample
    /// carries the chunk number.  Tracks peak concurrency.
    struct ReverseFinisher {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ReverseFinisher {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for ReverseFinisher {
        async fn synthesize(
            &self,
            text: &str,
            _voice: &VoiceSelection,
            _speed: f32,
        ) -> Result<Vec<SpeechSegment>, TtsError> {
            let n: u64 = text
                .parse()
                .map_err(|_| TtsError::InvalidInput(text.into()))?;
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(60 - n * 10)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![SpeechSegment {
                text: text.into(),
                phonemes: None,
                samples: vec![n as f32; n as usize + 1],
            }])
        }
    }

    #[tokio::test]
    async fn results_follow_ordinal_not_completion_order() {
        let engine = Arc::new(ReverseFinisher::new());
        let executor = ParallelExecutor::new(engine.clone(), 2);

        let results = executor
            .synthesize(chunks(&["0", "1", "2", "3"]), &VoiceSelection::named("af_heart"), 1.0)
            .await
            .unwrap();

        let ordinals: Vec<usize> = results.iter().map(|r| r.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2, 3]);
        for r in &results {
            assert_eq!(r.samples.len(), r.ordinal + 1);
            assert!(r.samples.iter().all(|&s| s == r.ordinal as f32));
        }
    }

    #[tokio::test]
    async fn never_exceeds_worker_bound() {
        let engine = Arc::new(ReverseFinisher::new());
        let executor = ParallelExecutor::new(engine.clone(), 2);

        executor
            .synthesize(
                chunks(&["0", "1", "2", "3", "4"]),
                &VoiceSelection::named("af_heart"),
                1.0,
            )
            .await
            .unwrap();

        let peak = engine.peak.load(Ordering::SeqCst);
        assert!(peak <= 2, "peak concurrency {peak}");
        assert!(peak >= 1);
    }

    #[tokio::test]
    async fn failed_chunk_is_empty_but_others_survive() {
        let engine = Arc::new(MockSynthesizer::failing_when(|t| t.starts_with("bad")));
        let executor = ParallelExecutor::new(engine, 2);

        let results = executor
            .synthesize(
                chunks(&["good one.", "bad two.", "good three."]),
                &VoiceSelection::named("af_heart"),
                1.0,
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].samples.len(), "good one.".len());
        assert!(results[1].samples.is_empty());
        assert_eq!(results[2].samples.len(), "good three.".len());
    }

    #[tokio::test]
    async fn all_chunks_failing_is_an_error() {
        let engine = Arc::new(MockSynthesizer::failing());
        let executor = ParallelExecutor::new(engine, 2);

        let err = executor
            .synthesize(chunks(&["a.", "b.", "c."]), &VoiceSelection::named("af_heart"), 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::AllChunksFailed(3)));
    }

    #[tokio::test]
    async fn no_chunks_is_not_chunkable() {
        let executor = ParallelExecutor::new(Arc::new(MockSynthesizer::ok()), 2);
        let err = executor
            .synthesize(Vec::new(), &VoiceSelection::named("af_heart"), 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::NotChunkable(PlanError::Empty)));
    }

    #[test]
    fn zero_workers_is_raised_to_one() {
        let executor = ParallelExecutor::new(Arc::new(MockSynthesizer::ok()), 0);
        assert_eq!(executor.max_workers(), 1);
    }
}

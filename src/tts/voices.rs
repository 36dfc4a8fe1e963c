//! Kokoro voice registry and per-request voice resolution.
//!
//! [`AVAILABLE_VOICES`] lists every voice the Kokoro-82M release ships.
//! [`resolve_voice`] maps a requested identifier to the voice actually used:
//! a local `<id>.pt` asset wins, then a registry entry, then the default
//! voice (with one warning).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

// ---------------------------------------------------------------------------
// VoiceInfo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    Female,
    Male,
}

/// Static metadata for one voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoiceInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub language: &'static str,
    pub gender: Gender,
}

const fn voice(
    id: &'static str,
    name: &'static str,
    language: &'static str,
    gender: Gender,
) -> VoiceInfo {
    VoiceInfo {
        id,
        name,
        language,
        gender,
    }
}

/// All Kokoro voices, grouped by language in release order.
pub const AVAILABLE_VOICES: &[VoiceInfo] = &[
    voice("af_heart", "Heart", "American English", Gender::Female),
    voice("af_alloy", "Alloy", "American English", Gender::Female),
    voice("af_aoede", "Aoede", "American English", Gender::Female),
    voice("af_bella", "Bella", "American English", Gender::Female),
    voice("af_jessica", "Jessica", "American English", Gender::Female),
    voice("af_kore", "Kore", "American English", Gender::Female),
    voice("af_nicole", "Nicole", "American English", Gender::Female),
    voice("af_nova", "Nova", "American English", Gender::Female),
    voice("af_river", "River", "American English", Gender::Female),
    voice("af_sarah", "Sarah", "American English", Gender::Female),
    voice("af_sky", "Sky", "American English", Gender::Female),
    voice("am_adam", "Adam", "American English", Gender::Male),
    voice("am_echo", "Echo", "American English", Gender::Male),
    voice("am_eric", "Eric", "American English", Gender::Male),
    voice("am_fenrir", "Fenrir", "American English", Gender::Male),
    voice("am_liam", "Liam", "American English", Gender::Male),
    voice("am_michael", "Michael", "American English", Gender::Male),
    voice("am_onyx", "Onyx", "American English", Gender::Male),
    voice("am_puck", "Puck", "American English", Gender::Male),
    voice("am_santa", "Santa", "American English", Gender::Male),
    voice("bf_alice", "Alice", "British English", Gender::Female),
    voice("bf_emma", "Emma", "British English", Gender::Female),
    voice("bf_isabella", "Isabella", "British English", Gender::Female),
    voice("bf_lily", "Lily", "British English", Gender::Female),
    voice("bm_daniel", "Daniel", "British English", Gender::Male),
    voice("bm_fable", "Fable", "British English", Gender::Male),
    voice("bm_george", "George", "British English", Gender::Male),
    voice("bm_lewis", "Lewis", "British English", Gender::Male),
    voice("jf_alpha", "Alpha", "Japanese", Gender::Female),
    voice("jf_gongitsune", "Gongitsune", "Japanese", Gender::Female),
    voice("jf_nezumi", "Nezumi", "Japanese", Gender::Female),
    voice("jf_tebukuro", "Tebukuro", "Japanese", Gender::Female),
    voice("jm_kumo", "Kumo", "Japanese", Gender::Male),
    voice("zf_xiaobei", "Xiaobei", "Mandarin Chinese", Gender::Female),
    voice("zf_xiaoni", "Xiaoni", "Mandarin Chinese", Gender::Female),
    voice("zf_xiaoxiao", "Xiaoxiao", "Mandarin Chinese", Gender::Female),
    voice("zf_xiaoyi", "Xiaoyi", "Mandarin Chinese", Gender::Female),
    voice("zm_yunjian", "Yunjian", "Mandarin Chinese", Gender::Male),
    voice("zm_yunxi", "Yunxi", "Mandarin Chinese", Gender::Male),
    voice("zm_yunxia", "Yunxia", "Mandarin Chinese", Gender::Male),
    voice("zm_yunyang", "Yunyang", "Mandarin Chinese", Gender::Male),
    voice("ef_dora", "Dora", "Spanish", Gender::Female),
    voice("em_alex", "Alex", "Spanish", Gender::Male),
    voice("em_santa", "Santa", "Spanish", Gender::Male),
    voice("ff_siwis", "Siwis", "French", Gender::Female),
    voice("hf_alpha", "Alpha", "Hindi", Gender::Female),
    voice("hf_beta", "Beta", "Hindi", Gender::Female),
    voice("hm_omega", "Omega", "Hindi", Gender::Male),
    voice("hm_psi", "Psi", "Hindi", Gender::Male),
    voice("if_sara", "Sara", "Italian", Gender::Female),
    voice("im_nicola", "Nicola", "Italian", Gender::Male),
    voice("pf_dora", "Dora", "Brazilian Portuguese", Gender::Female),
    voice("pm_alex", "Alex", "Brazilian Portuguese", Gender::Male),
    voice("pm_santa", "Santa", "Brazilian Portuguese", Gender::Male),
];

/// Look up a voice by identifier.
pub fn find_voice(id: &str) -> Option<&'static VoiceInfo> {
    AVAILABLE_VOICES.iter().find(|v| v.id == id)
}

/// Voices grouped by language name; each list keeps registry order.
pub fn voices_by_language() -> BTreeMap<&'static str, Vec<&'static VoiceInfo>> {
    let mut grouped: BTreeMap<&'static str, Vec<&'static VoiceInfo>> = BTreeMap::new();
    for v in AVAILABLE_VOICES {
        grouped.entry(v.language).or_default().push(v);
    }
    grouped
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// The voice a synthesis request will actually use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSelection {
    /// Registry identifier sent to the engine.
    pub id: String,
    /// Local voice asset, when one exists on disk.
    pub asset: Option<PathBuf>,
}

impl VoiceSelection {
    pub fn named(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            asset: None,
        }
    }
}

/// Resolve `requested` against the local asset directory and the registry.
pub fn resolve_voice(requested: &str, voices_dir: &Path, default_voice: &str) -> VoiceSelection {
    let local = voices_dir.join(format!("{requested}.pt"));
    if !requested.is_empty() && local.is_file() {
        log::debug!("tts: using local voice asset {}", local.display());
        return VoiceSelection {
            id: requested.to_string(),
            asset: Some(local),
        };
    }

    if find_voice(requested).is_some() {
        return VoiceSelection::named(requested);
    }

    log::warn!("tts: unknown voice '{requested}', falling back to '{default_voice}'");
    VoiceSelection::named(default_voice)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

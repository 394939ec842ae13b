//! Sound effect IDs and the sink the simulation plays them through.

use std::io::Write;
use tracing::trace;

/// Shared sound effects, in the order the sound bank numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundEffectId {
    Chain01,
    Chain02,
    Chain03,
    Chain04,
    Chain05,
    Chain06,
    Chain07,
    PieceMove,
    PieceRotate,
}

impl SoundEffectId {
    const CHAINS: [Self; 7] = [
        Self::Chain01,
        Self::Chain02,
        Self::Chain03,
        Self::Chain04,
        Self::Chain05,
        Self::Chain06,
        Self::Chain07,
    ];

    /// Effect for a removal at `chain_count` (0 = first link). Everything past the seventh
    /// link reuses `Chain07`.
    pub fn for_chain(chain_count: u32) -> Self {
        let i = (chain_count as usize).min(Self::CHAINS.len() - 1);
        Self::CHAINS[i]
    }

    pub fn is_chain(self) -> bool {
        Self::CHAINS.contains(&self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackgroundMusicId {
    MainTheme,
}

/// Fire-and-forget audio output.
pub trait SoundSink {
    fn play_sound_effect(&mut self, id: SoundEffectId);
    fn play_background_music(&mut self, id: BackgroundMusicId);
}

/// Terminal stand-in for an audio device: logs every request, remembers the last effect
/// for the sidebar and optionally rings the bell on chains.
#[derive(Debug, Default)]
pub struct TerminalAudio {
    bell: bool,
    pending_bell: bool,
    last_effect: Option<SoundEffectId>,
    music: Option<BackgroundMusicId>,
}

impl TerminalAudio {
    pub fn new(bell: bool) -> Self {
        Self {
            bell,
            ..Self::default()
        }
    }

    pub fn last_effect(&self) -> Option<SoundEffectId> {
        self.last_effect
    }

    pub fn music(&self) -> Option<BackgroundMusicId> {
        self.music
    }

    /// Emits a queued bell. Called between frames so it never lands mid-draw.
    pub fn flush_bell(&mut self, out: &mut impl Write) -> std::io::Result<()> {
        if std::mem::take(&mut self.pending_bell) {
            out.write_all(b"\x07")?;
            out.flush()?;
        }
        Ok(())
    }
}

impl SoundSink for TerminalAudio {
    fn play_sound_effect(&mut self, id: SoundEffectId) {
        trace!(?id, "sound effect");
        self.last_effect = Some(id);
        if self.bell && id.is_chain() {
            self.pending_bell = true;
        }
    }

    fn play_background_music(&mut self, id: BackgroundMusicId) {
        trace!(?id, "background music");
        self.music = Some(id);
    }
}

/// Test double that records every request in order.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingAudio {
    pub effects: Vec<SoundEffectId>,
    pub music: Vec<BackgroundMusicId>,
}

#[cfg(test)]
impl RecordingAudio {
    pub fn count(&self, id: SoundEffectId) -> usize {
        self.effects.iter().filter(|&&e| e == id).count()
    }
}

#[cfg(test)]
impl SoundSink for RecordingAudio {
    fn play_sound_effect(&mut self, id: SoundEffectId) {
        self.effects.push(id);
    }

    fn play_background_music(&mut self, id: BackgroundMusicId) {
        self.music.push(id);
    }
}

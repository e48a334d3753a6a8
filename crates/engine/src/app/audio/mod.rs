#[cfg(feature = "device-audio")]
mod device;
#[cfg(feature = "device-audio")]
mod mixer;

use tracing::debug;

use super::assets::{Music, SoundEffect};

#[cfg(feature = "device-audio")]
pub use device::{AudioOutputError, DeviceAudio};

/// Effects remembered by [`LoggingAudio`]; older entries are dropped first.
const SFX_HISTORY_LEN: usize = 16;

/// Output side of the audio collaborator. Music loops until stopped or
/// replaced; effects fire once on any free channel.
pub trait AudioSink {
    /// `volume` is clamped to `0.0..=1.0`.
    fn play_music(&mut self, music: &Music, volume: f32);
    fn stop_music(&mut self);
    fn play_sfx(&mut self, effect: &SoundEffect);
}

/// Silent backend that logs every request and remembers what would be playing.
#[derive(Debug, Default)]
pub struct LoggingAudio {
    current_music: Option<(String, f32)>,
    sfx_played: Vec<String>,
}

impl LoggingAudio {
    pub fn current_music(&self) -> Option<(&str, f32)> {
        self.current_music
            .as_ref()
            .map(|(key, volume)| (key.as_str(), *volume))
    }

    /// The most recent effects, oldest first.
    pub fn sfx_played(&self) -> &[String] {
        &self.sfx_played
    }
}

impl AudioSink for LoggingAudio {
    fn play_music(&mut self, music: &Music, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        debug!(
            key = music.clip().key(),
            volume,
            duration_ms = music.clip().duration().as_millis() as u64,
            "music_started"
        );
        self.current_music = Some((music.clip().key().to_string(), volume));
    }

    fn stop_music(&mut self) {
        if let Some((key, _)) = self.current_music.take() {
            debug!(key = key.as_str(), "music_stopped");
        }
    }

    fn play_sfx(&mut self, effect: &SoundEffect) {
        debug!(key = effect.clip().key(), "sfx_played");
        if self.sfx_played.len() == SFX_HISTORY_LEN {
            self.sfx_played.remove(0);
        }
        self.sfx_played.push(effect.clip().key().to_string());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::app::assets::AudioClip;

    pub(crate) fn clip(key: &str, sample_rate: u32, channels: u16, samples: &[i16]) -> AudioClip {
        AudioClip::from_samples(key, sample_rate, channels, Arc::from(samples))
    }

    #[test]
    fn effect_history_keeps_only_the_latest_entries() {
        let mut audio = LoggingAudio::default();
        let jump = SoundEffect::from_clip(clip("jump", 8_000, 1, &[0; 4]));
        let land = SoundEffect::from_clip(clip("land", 8_000, 1, &[0; 4]));

        for _ in 0..SFX_HISTORY_LEN * 3 {
            audio.play_sfx(&jump);
        }
        audio.play_sfx(&land);

        assert_eq!(audio.sfx_played().len(), SFX_HISTORY_LEN);
        assert_eq!(audio.sfx_played().last().map(String::as_str), Some("land"));
    }

    #[test]
    fn music_volume_is_clamped_and_stop_clears_it() {
        let mut audio = LoggingAudio::default();
        let music = Music::from_clip(clip("bgm", 8_000, 1, &[0; 4]));

        audio.play_music(&music, 3.0);
        assert_eq!(audio.current_music(), Some(("bgm", 1.0)));
        audio.stop_music();
        assert_eq!(audio.current_music(), None);
    }
}

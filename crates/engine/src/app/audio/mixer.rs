use crate::app::assets::AudioClip;

/// Effects beyond this many at once are dropped.
pub(crate) const EFFECT_CHANNELS: usize = 8;

#[derive(Debug)]
struct Voice {
    clip: AudioClip,
    /// Read position in source frames.
    cursor: f64,
    volume: f32,
    looping: bool,
}

impl Voice {
    fn new(clip: AudioClip, volume: f32, looping: bool) -> Self {
        Self {
            clip,
            cursor: 0.0,
            volume,
            looping,
        }
    }

    /// Adds the sample under the cursor to every channel of `frame` and
    /// advances. Returns `false` once a one-shot voice has run out.
    fn mix_into(&mut self, frame: &mut [f32], output_rate: f64) -> bool {
        let channels = usize::from(self.clip.channels().max(1));
        let samples = self.clip.samples();
        let frames = samples.len() / channels;
        if frames == 0 {
            return false;
        }
        if self.cursor >= frames as f64 {
            if !self.looping {
                return false;
            }
            self.cursor %= frames as f64;
        }

        let base = (self.cursor as usize).min(frames - 1) * channels;
        for (channel, out) in frame.iter_mut().enumerate() {
            let source = samples
                .get(base + channel.min(channels - 1))
                .copied()
                .unwrap_or_default();
            *out += f32::from(source) / f32::from(i16::MAX) * self.volume;
        }
        self.cursor += f64::from(self.clip.sample_rate()) / output_rate;
        true
    }
}

/// Software mixer behind [`super::DeviceAudio`]: one looping music voice and
/// a fixed pool of one-shot effect voices, resampled by nearest frame.
#[derive(Debug)]
pub(crate) struct Mixer {
    output_rate: u32,
    output_channels: u16,
    music: Option<Voice>,
    effects: Vec<Voice>,
}

impl Mixer {
    pub(crate) fn new(output_rate: u32, output_channels: u16) -> Self {
        Self {
            output_rate,
            output_channels,
            music: None,
            effects: Vec::with_capacity(EFFECT_CHANNELS),
        }
    }

    pub(crate) fn play_music(&mut self, clip: AudioClip, volume: f32) {
        self.music = Some(Voice::new(clip, volume, true));
    }

    pub(crate) fn stop_music(&mut self) {
        self.music = None;
    }

    /// Returns `false` when every effect channel is busy.
    pub(crate) fn play_effect(&mut self, clip: AudioClip) -> bool {
        if self.effects.len() >= EFFECT_CHANNELS {
            return false;
        }
        self.effects.push(Voice::new(clip, 1.0, false));
        true
    }

    pub(crate) fn has_music(&self) -> bool {
        self.music.is_some()
    }

    pub(crate) fn active_effects(&self) -> usize {
        self.effects.len()
    }

    /// Overwrites `out` (interleaved, `output_channels` wide) with the next
    /// block of mixed audio.
    pub(crate) fn fill(&mut self, out: &mut [f32]) {
        let output_rate = f64::from(self.output_rate.max(1));
        out.fill(0.0);
        for frame in out.chunks_mut(usize::from(self.output_channels.max(1))) {
            let music_ended = self
                .music
                .as_mut()
                .is_some_and(|music| !music.mix_into(frame, output_rate));
            if music_ended {
                self.music = None;
            }
            self.effects
                .retain_mut(|effect| effect.mix_into(frame, output_rate));
            for sample in frame.iter_mut() {
                *sample = sample.clamp(-1.0, 1.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::audio::tests::clip;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1.0e-4
    }

    const FULL: i16 = i16::MAX;
    const HALF: i16 = i16::MAX / 2;

    #[test]
    fn silent_mixer_writes_zeros() {
        let mut mixer = Mixer::new(8_000, 2);
        let mut out = [0.7f32; 8];
        mixer.fill(&mut out);
        assert!(out.iter().all(|sample| *sample == 0.0));
    }

    #[test]
    fn music_loops_at_its_volume() {
        let mut mixer = Mixer::new(8_000, 1);
        mixer.play_music(clip("bgm", 8_000, 1, &[FULL, 0]), 0.25);

        let mut out = [0.0f32; 5];
        mixer.fill(&mut out);

        assert!(approx(out[0], 0.25));
        assert!(approx(out[1], 0.0));
        assert!(approx(out[2], 0.25));
        assert!(approx(out[4], 0.25));
        assert!(mixer.has_music());

        mixer.stop_music();
        mixer.fill(&mut out);
        assert!(out.iter().all(|sample| *sample == 0.0));
    }

    #[test]
    fn effect_plays_once_then_frees_its_channel() {
        let mut mixer = Mixer::new(8_000, 1);
        assert!(mixer.play_effect(clip("jump", 8_000, 1, &[HALF, HALF])));

        let mut out = [0.0f32; 4];
        mixer.fill(&mut out);

        assert!(approx(out[0], 0.5));
        assert!(approx(out[1], 0.5));
        assert_eq!(out[2], 0.0);
        assert_eq!(mixer.active_effects(), 0);
    }

    #[test]
    fn effects_beyond_the_channel_pool_are_dropped() {
        let mut mixer = Mixer::new(8_000, 1);
        for _ in 0..EFFECT_CHANNELS {
            assert!(mixer.play_effect(clip("jump", 8_000, 1, &[0; 16])));
        }
        assert!(!mixer.play_effect(clip("jump", 8_000, 1, &[0; 16])));
        assert_eq!(mixer.active_effects(), EFFECT_CHANNELS);
    }

    #[test]
    fn mono_clip_reaches_both_output_channels_and_sums_clamp() {
        let mut mixer = Mixer::new(8_000, 2);
        mixer.play_music(clip("bgm", 8_000, 1, &[FULL]), 1.0);
        mixer.play_effect(clip("jump", 8_000, 1, &[FULL]));

        let mut out = [0.0f32; 2];
        mixer.fill(&mut out);

        assert_eq!(out, [1.0, 1.0]);
    }

    #[test]
    fn lower_rate_clips_are_stretched_to_the_output_rate() {
        let mut mixer = Mixer::new(16_000, 1);
        mixer.play_effect(clip("jump", 8_000, 1, &[FULL, 0]));

        let mut out = [0.0f32; 5];
        mixer.fill(&mut out);

        assert!(approx(out[0], 1.0));
        assert!(approx(out[1], 1.0));
        assert!(approx(out[2], 0.0));
        assert!(approx(out[3], 0.0));
        assert_eq!(out[4], 0.0);
    }
}

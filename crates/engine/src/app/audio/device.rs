use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BuildStreamError, DefaultStreamConfigError, Device, FromSample, PlayStreamError, Sample,
    SampleFormat, SizedSample, Stream, StreamConfig,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::mixer::Mixer;
use super::AudioSink;
use crate::app::assets::{Music, SoundEffect};

#[derive(Debug, Error)]
pub enum AudioOutputError {
    #[error("no default audio output device")]
    NoDevice,
    #[error("failed to query the output device config: {0}")]
    Config(#[from] DefaultStreamConfigError),
    #[error("unsupported output sample format {0:?}")]
    UnsupportedFormat(SampleFormat),
    #[error("failed to build the output stream: {0}")]
    Build(#[from] BuildStreamError),
    #[error("failed to start the output stream: {0}")]
    Play(#[from] PlayStreamError),
}

/// Plays decoded clips on the default output device. The stream callback
/// pulls from a shared mixer; dropping this stops playback.
pub struct DeviceAudio {
    mixer: Arc<Mutex<Mixer>>,
    _stream: Stream,
}

impl DeviceAudio {
    pub fn open() -> Result<Self, AudioOutputError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioOutputError::NoDevice)?;
        let supported = device.default_output_config()?;
        let format = supported.sample_format();
        let config = supported.config();
        let mixer = Arc::new(Mutex::new(Mixer::new(
            config.sample_rate.0,
            config.channels,
        )));

        let stream = match format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, Arc::clone(&mixer))?,
            SampleFormat::I16 => build_stream::<i16>(&device, &config, Arc::clone(&mixer))?,
            SampleFormat::U16 => build_stream::<u16>(&device, &config, Arc::clone(&mixer))?,
            other => return Err(AudioOutputError::UnsupportedFormat(other)),
        };
        stream.play()?;

        info!(
            device = %device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            format = ?format,
            "audio_output_opened"
        );
        Ok(Self {
            mixer,
            _stream: stream,
        })
    }

    fn mixer(&self) -> MutexGuard<'_, Mixer> {
        lock(&self.mixer)
    }
}

fn lock(mixer: &Mutex<Mixer>) -> MutexGuard<'_, Mixer> {
    mixer.lock().unwrap_or_else(PoisonError::into_inner)
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mixer: Arc<Mutex<Mixer>>,
) -> Result<Stream, BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let mut block = Vec::<f32>::new();
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            block.resize(data.len(), 0.0);
            lock(&mixer).fill(&mut block);
            for (out, sample) in data.iter_mut().zip(&block) {
                *out = T::from_sample(*sample);
            }
        },
        |err| warn!(error = %err, "audio_stream_error"),
        None,
    )
}

impl AudioSink for DeviceAudio {
    fn play_music(&mut self, music: &Music, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.mixer().play_music(music.clip().clone(), volume);
        debug!(key = music.clip().key(), volume, "music_started");
    }

    fn stop_music(&mut self) {
        let mut mixer = self.mixer();
        if mixer.has_music() {
            mixer.stop_music();
            debug!("music_stopped");
        }
    }

    fn play_sfx(&mut self, effect: &SoundEffect) {
        let mut mixer = self.mixer();
        if mixer.play_effect(effect.clip().clone()) {
            debug!(
                key = effect.clip().key(),
                channels_busy = mixer.active_effects(),
                "sfx_played"
            );
        } else {
            debug!(key = effect.clip().key(), "sfx_dropped_no_free_channel");
        }
    }
}

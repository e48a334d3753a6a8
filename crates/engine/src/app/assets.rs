use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hound::{SampleFormat, WavReader};
use image::ImageReader;
use thiserror::Error;
use tracing::{debug, error};

use crate::asset_keys::{validate_asset_key, AssetKeyError};
use crate::AppPaths;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("invalid asset key `{key}`: {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: AssetKeyError,
    },
    #[error("failed to open texture {path}: {source}")]
    TextureOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode texture {path}: {source}")]
    TextureDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to read audio clip {path}: {source}")]
    AudioRead {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("unsupported audio format in {path}: {bits_per_sample}-bit {format}")]
    UnsupportedAudioFormat {
        path: PathBuf,
        bits_per_sample: u16,
        format: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Texture {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        (rgba.len() == width as usize * height as usize * 4).then_some(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Clamped to the texture edge.
    pub fn texel(&self, x: u32, y: u32) -> [u8; 4] {
        let x = x.min(self.width.saturating_sub(1)) as usize;
        let y = y.min(self.height.saturating_sub(1)) as usize;
        let offset = (y * self.width as usize + x) * 4;
        match self.rgba.get(offset..offset + 4) {
            Some(bytes) => [bytes[0], bytes[1], bytes[2], bytes[3]],
            None => [0, 0, 0, 0],
        }
    }
}

#[derive(Debug, Default)]
pub struct TextureStore {
    textures: Vec<Texture>,
    by_key: HashMap<String, TextureId>,
}

impl TextureStore {
    pub fn insert(&mut self, key: &str, texture: Texture) -> TextureId {
        if let Some(id) = self.by_key.get(key) {
            self.textures[id.0] = texture;
            return *id;
        }
        let id = TextureId(self.textures.len());
        self.textures.push(texture);
        self.by_key.insert(key.to_string(), id);
        id
    }

    pub fn get(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id.0)
    }

    pub fn id_for(&self, key: &str) -> Option<TextureId> {
        self.by_key.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

/// Decoded 16-bit PCM, shared between handles.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    key: String,
    sample_rate: u32,
    channels: u16,
    samples: Arc<[i16]>,
}

impl AudioClip {
    pub(crate) fn from_samples(
        key: &str,
        sample_rate: u32,
        channels: u16,
        samples: Arc<[i16]>,
    ) -> Self {
        Self {
            key: key.to_string(),
            sample_rate,
            channels,
            samples,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() as u64 / u64::from(self.channels.max(1));
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate.max(1)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Music(AudioClip);

impl Music {
    #[cfg(test)]
    pub(crate) fn from_clip(clip: AudioClip) -> Self {
        Self(clip)
    }

    pub fn clip(&self) -> &AudioClip {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoundEffect(AudioClip);

impl SoundEffect {
    #[cfg(test)]
    pub(crate) fn from_clip(clip: AudioClip) -> Self {
        Self(clip)
    }

    pub fn clip(&self) -> &AudioClip {
        &self.0
    }
}

/// Loads assets by key from the directories in [`AppPaths`]. Textures are
/// cached for the lifetime of the process; audio clips are owned by whoever
/// loaded them.
#[derive(Debug)]
pub struct Assets {
    paths: AppPaths,
    textures: TextureStore,
}

impl Assets {
    pub fn new(paths: AppPaths) -> Self {
        Self {
            paths,
            textures: TextureStore::default(),
        }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn textures(&self) -> &TextureStore {
        &self.textures
    }

    pub fn load_texture(&mut self, key: &str) -> Result<TextureId, AssetError> {
        if let Some(id) = self.textures.id_for(key) {
            return Ok(id);
        }
        check_key(key)?;
        let path = self.paths.textures_dir.join(format!("{key}.png"));
        let texture = decode_texture(path.clone()).inspect_err(|error| {
            error!(key, path = %path.display(), error = %error, "asset_load_failed");
        })?;
        debug!(
            key,
            width = texture.width,
            height = texture.height,
            "texture_loaded"
        );
        Ok(self.textures.insert(key, texture))
    }

    pub fn load_music(&self, key: &str) -> Result<Music, AssetError> {
        self.load_clip(key).map(Music)
    }

    pub fn load_sfx(&self, key: &str) -> Result<SoundEffect, AssetError> {
        self.load_clip(key).map(SoundEffect)
    }

    fn load_clip(&self, key: &str) -> Result<AudioClip, AssetError> {
        check_key(key)?;
        let path = self.paths.audio_dir.join(format!("{key}.wav"));
        let clip = decode_clip(key, path)?;
        debug!(
            key,
            duration_ms = clip.duration().as_millis() as u64,
            "audio_clip_loaded"
        );
        Ok(clip)
    }
}

fn check_key(key: &str) -> Result<(), AssetError> {
    validate_asset_key(key).map_err(|source| AssetError::InvalidKey {
        key: key.to_string(),
        source,
    })
}

fn decode_texture(path: PathBuf) -> Result<Texture, AssetError> {
    let reader = match ImageReader::open(&path) {
        Ok(reader) => reader,
        Err(source) => return Err(AssetError::TextureOpen { path, source }),
    };
    let decoded = match reader.decode() {
        Ok(decoded) => decoded,
        Err(source) => return Err(AssetError::TextureDecode { path, source }),
    };
    let image = decoded.to_rgba8();
    Ok(Texture {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

fn decode_clip(key: &str, path: PathBuf) -> Result<AudioClip, AssetError> {
    let mut reader = match WavReader::open(&path) {
        Ok(reader) => reader,
        Err(source) => return Err(AssetError::AudioRead { path, source }),
    };
    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        let format = match spec.sample_format {
            SampleFormat::Int => "int",
            SampleFormat::Float => "float",
        };
        return Err(AssetError::UnsupportedAudioFormat {
            path,
            bits_per_sample: spec.bits_per_sample,
            format,
        });
    }
    let samples = match reader.samples::<i16>().collect::<Result<Vec<_>, _>>() {
        Ok(samples) => samples,
        Err(source) => return Err(AssetError::AudioRead { path, source }),
    };
    Ok(AudioClip::from_samples(
        key,
        spec.sample_rate,
        spec.channels,
        samples.into(),
    ))
}

use std::process::ExitCode;

#[cfg(feature = "device-audio")]
use engine::DeviceAudio;
use engine::{run_app, AudioSink, LoggingAudio};
use tracing::{error, warn};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let audio = open_audio();
    if let Err(err) = run_app(app.config, app.paths, app.session, app.scenes, audio) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Falls back to the silent backend when no output device can be opened.
#[cfg(feature = "device-audio")]
fn open_audio() -> Box<dyn AudioSink> {
    match DeviceAudio::open() {
        Ok(audio) => Box::new(audio),
        Err(err) => {
            warn!(error = %err, fallback = "logging", "audio_output_unavailable");
            Box::new(LoggingAudio::default())
        }
    }
}

#[cfg(not(feature = "device-audio"))]
fn open_audio() -> Box<dyn AudioSink> {
    warn!(fallback = "logging", "audio_output_disabled");
    Box::new(LoggingAudio::default())
}

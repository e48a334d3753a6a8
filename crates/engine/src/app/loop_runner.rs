use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{error, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::AppPaths;

use super::assets::Assets;
use super::audio::AudioSink;
use super::input::ActionStates;
use super::metrics::LoopMetrics;
use super::rendering::{DrawList, Renderer};
use super::scene::{SceneContext, SceneMachine, SceneSwitchError};
use super::{InputAction, InputSnapshot, Scene, SceneCommand, SceneKey};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    /// World units visible across the window; height follows the aspect ratio.
    pub view_width_world: f32,
    pub clear_color: [u8; 4],
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Platformer".to_string(),
            window_width: 960,
            window_height: 720,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 15,
            metrics_log_interval: Duration::from_secs(5),
            view_width_world: 10.0,
            clear_color: [49, 140, 206, 255],
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("failed to present frame: {0}")]
    Render(#[source] PixelsError),
    #[error(transparent)]
    Scene(#[from] SceneSwitchError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Runs `scenes` until the window closes or Quit is pressed. The first scene
/// is initialised before the window opens so content errors surface early.
pub fn run_app<S>(
    config: LoopConfig,
    paths: AppPaths,
    mut shared: S,
    scenes: Vec<Box<dyn Scene<S>>>,
    mut audio: Box<dyn AudioSink>,
) -> Result<(), AppError> {
    let mut assets = Assets::new(paths);
    let mut scenes = SceneMachine::new(scenes, SceneKey(0))?;
    scenes.initialise_active(&mut SceneContext::new(
        &mut shared,
        audio.as_mut(),
        &mut assets,
    ))?;

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(
        Arc::clone(&window),
        config.view_width_world,
        config.clear_color,
    )
    .map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let mut clock = FixedStepClock::new(
        config.target_tps,
        config.max_frame_delta,
        config.max_ticks_per_frame,
    );
    let fixed_dt_seconds = clock.fixed_dt().as_secs_f32();
    let metrics_window = non_zero_or(config.metrics_log_interval, Duration::from_secs(1));
    info!(
        target_tps = config.target_tps.max(1),
        max_frame_delta_ms = clock.max_frame_delta.as_millis() as u64,
        max_ticks_per_frame = clock.max_ticks_per_frame,
        metrics_window_ms = metrics_window.as_millis() as u64,
        scene = scenes.active_name(),
        "loop_config"
    );

    let mut input_collector = InputCollector::default();
    let mut draw_list = DrawList::default();
    let mut last_frame_instant = Instant::now();
    let mut metrics = LoopMetrics::new(metrics_window, Instant::now());
    let mut fatal_error: Option<AppError> = None;

    let run_result = event_loop.run(|event, window_target| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested => {
                info!(reason = "window_close", "shutdown_requested");
                window_target.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                    warn!(error = %error, "renderer_resize_failed");
                    fatal_error = Some(AppError::CreateRenderer(error));
                    window_target.exit();
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                input_collector.handle_keyboard_input(&event);
                if input_collector.quit_requested() {
                    info!(reason = "quit_key", "shutdown_requested");
                    window_target.exit();
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                last_frame_instant = now;

                let step_plan = clock.advance(raw_frame_dt);
                for _ in 0..step_plan.ticks_to_run {
                    let input = input_collector.snapshot_for_tick();
                    let mut ctx = SceneContext::new(&mut shared, audio.as_mut(), &mut assets);
                    scenes.update_active(fixed_dt_seconds, &input, &mut ctx);
                }
                if step_plan.dropped_backlog > Duration::ZERO {
                    warn!(
                        dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                        max_ticks_per_frame = clock.max_ticks_per_frame,
                        "sim_clamp_triggered"
                    );
                }

                let mut ctx = SceneContext::new(&mut shared, audio.as_mut(), &mut assets);
                if let SceneCommand::SwitchTo(next_scene) = scenes.end_frame_active(&mut ctx) {
                    if let Err(switch_error) = scenes.switch_to(next_scene, &mut ctx) {
                        error!(error = %switch_error, "scene_switch_failed");
                        fatal_error = Some(switch_error.into());
                        window_target.exit();
                        return;
                    }
                }

                draw_list.clear();
                scenes.render_active(&shared, &mut draw_list);
                let camera = scenes.camera_active(&shared);
                if let Err(render_error) = renderer.render(&draw_list, &camera, assets.textures()) {
                    error!(error = %render_error, "renderer_draw_failed");
                    fatal_error = Some(AppError::Render(render_error));
                    window_target.exit();
                    return;
                }
                metrics.record_frame(raw_frame_dt, &step_plan);

                if let Some(snapshot) = metrics.take_snapshot(now) {
                    info!(
                        fps = snapshot.fps,
                        tps = snapshot.tps,
                        frame_time_ms = snapshot.frame_time_ms,
                        dropped_backlog_ms = snapshot.dropped_backlog_ms,
                        scene = scenes.active_name(),
                        "loop_metrics"
                    );
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            window.request_redraw();
        }
        Event::LoopExiting => {
            let mut ctx = SceneContext::new(&mut shared, audio.as_mut(), &mut assets);
            scenes.shutdown_all(&mut ctx);
            ctx.audio.stop_music();
            info!("shutdown");
        }
        _ => {}
    });

    if let Some(error) = fatal_error {
        return Err(error);
    }
    run_result.map_err(AppError::EventLoopRun)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPlan {
    pub ticks_to_run: u32,
    pub remaining_accumulator: Duration,
    pub dropped_backlog: Duration,
}

/// Fixed-timestep accumulator. Frame time is clamped, then consumed in whole
/// steps; the remainder carries into the next frame.
#[derive(Debug, Clone)]
pub struct FixedStepClock {
    fixed_dt: Duration,
    max_frame_delta: Duration,
    max_ticks_per_frame: u32,
    accumulator: Duration,
}

impl FixedStepClock {
    pub fn new(target_tps: u32, max_frame_delta: Duration, max_ticks_per_frame: u32) -> Self {
        Self {
            fixed_dt: Duration::from_secs_f64(1.0 / target_tps.max(1) as f64),
            max_frame_delta: non_zero_or(max_frame_delta, Duration::from_millis(250)),
            max_ticks_per_frame: max_ticks_per_frame.max(1),
            accumulator: Duration::ZERO,
        }
    }

    pub fn fixed_dt(&self) -> Duration {
        self.fixed_dt
    }

    pub fn leftover(&self) -> Duration {
        self.accumulator
    }

    pub fn advance(&mut self, raw_frame_dt: Duration) -> StepPlan {
        let clamped = clamp_frame_delta(raw_frame_dt, self.max_frame_delta);
        let plan = plan_sim_steps(
            self.accumulator.saturating_add(clamped),
            self.fixed_dt,
            self.max_ticks_per_frame,
        );
        self.accumulator = plan.remaining_accumulator;
        plan
    }
}

/// Key state between frames. Held keys are re-read for every tick; press
/// edges survive until the first tick that snapshots them.
#[derive(Debug, Default)]
struct InputCollector {
    action_states: ActionStates,
}

impl InputCollector {
    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        let is_pressed = key_event.state == ElementState::Pressed;
        self.update_action_state_from_physical_key(key_event.physical_key, is_pressed);
    }

    fn update_action_state_from_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        if let Some(action) = action_for_key(key) {
            self.action_states.set(action, is_pressed);
        }
    }

    fn quit_requested(&self) -> bool {
        self.action_states.is_down(InputAction::Quit)
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(self.action_states);
        self.action_states.clear_pressed();
        snapshot
    }
}

fn action_for_key(key: PhysicalKey) -> Option<InputAction> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    match code {
        KeyCode::KeyA | KeyCode::ArrowLeft => Some(InputAction::MoveLeft),
        KeyCode::KeyD | KeyCode::ArrowRight => Some(InputAction::MoveRight),
        KeyCode::KeyW | KeyCode::ArrowUp => Some(InputAction::MoveUp),
        KeyCode::Enter | KeyCode::NumpadEnter => Some(InputAction::Confirm),
        KeyCode::Space => Some(InputAction::Primary),
        KeyCode::KeyQ | KeyCode::Escape => Some(InputAction::Quit),
        _ => None,
    }
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn non_zero_or(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(50), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(2));
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn short_frames_accumulate_until_a_step_is_due() {
        let mut clock = FixedStepClock::new(100, Duration::from_millis(250), 10);
        assert_eq!(clock.advance(Duration::from_millis(4)).ticks_to_run, 0);
        assert_eq!(clock.advance(Duration::from_millis(4)).ticks_to_run, 0);
        assert_eq!(clock.advance(Duration::from_millis(4)).ticks_to_run, 1);
        assert_eq!(clock.leftover(), Duration::from_millis(2));
    }

    #[test]
    fn step_count_matches_total_time_over_fixed_step() {
        let mut clock = FixedStepClock::new(60, Duration::from_millis(250), 1000);
        let fixed = clock.fixed_dt();
        let mut seed = 0x2545_f491u32;
        let mut total = Duration::ZERO;
        let mut steps = 0u64;

        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let frame = Duration::from_micros(u64::from(seed % 40_000));
            total += frame;
            steps += u64::from(clock.advance(frame).ticks_to_run);
            assert!(clock.leftover() < fixed);
        }

        let expected = (total.as_nanos() / fixed.as_nanos()) as u64;
        assert!(steps.abs_diff(expected) <= 1, "steps={steps} expected={expected}");
    }

    #[test]
    fn press_edge_reaches_only_first_tick_of_frame() {
        let mut input = InputCollector::default();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyW), true);

        let first = input.snapshot_for_tick();
        let second = input.snapshot_for_tick();

        assert!(first.was_pressed(InputAction::MoveUp));
        assert!(first.is_down(InputAction::MoveUp));
        assert!(!second.was_pressed(InputAction::MoveUp));
        assert!(second.is_down(InputAction::MoveUp));
    }

    #[test]
    fn press_edge_waits_for_next_tick_when_frame_runs_none() {
        let mut input = InputCollector::default();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::Enter), true);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::Enter), false);

        let later = input.snapshot_for_tick();
        assert!(later.was_pressed(InputAction::Confirm));
        assert!(!later.is_down(InputAction::Confirm));
    }

    #[test]
    fn held_key_does_not_retrigger_edges() {
        let mut input = InputCollector::default();
        let space = PhysicalKey::Code(KeyCode::Space);

        input.update_action_state_from_physical_key(space, true);
        assert!(input.snapshot_for_tick().was_pressed(InputAction::Primary));
        input.update_action_state_from_physical_key(space, true);
        assert!(!input.snapshot_for_tick().was_pressed(InputAction::Primary));
        input.update_action_state_from_physical_key(space, false);
        input.update_action_state_from_physical_key(space, true);
        assert!(input.snapshot_for_tick().was_pressed(InputAction::Primary));
    }

    #[test]
    fn wasd_and_arrow_keys_map_to_actions() {
        let mut input = InputCollector::default();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyA), true);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::ArrowRight), true);

        let snapshot = input.snapshot_for_tick();
        assert!(snapshot.is_down(InputAction::MoveLeft));
        assert!(snapshot.is_down(InputAction::MoveRight));
        assert!(!snapshot.is_down(InputAction::MoveUp));
    }

    #[test]
    fn q_and_escape_request_quit() {
        for key in [KeyCode::KeyQ, KeyCode::Escape] {
            let mut input = InputCollector::default();
            input.update_action_state_from_physical_key(PhysicalKey::Code(key), true);
            assert!(input.quit_requested());
        }
        assert_eq!(action_for_key(PhysicalKey::Code(KeyCode::KeyZ)), None);
    }
}

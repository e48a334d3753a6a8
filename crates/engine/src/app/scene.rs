use thiserror::Error;
use tracing::{debug, info};

use super::assets::{AssetError, Assets};
use super::audio::AudioSink;
use super::input::{ActionStates, InputAction};
use super::rendering::RenderTarget;
use super::tilemap::TilemapError;

pub use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneKey(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    SwitchTo(SceneKey),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    actions: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(actions: ActionStates) -> Self {
        Self { actions }
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    /// True only for the step that received the key-down edge.
    pub fn was_pressed(&self, action: InputAction) -> bool {
        self.actions.was_pressed(action)
    }

    pub fn quit_requested(&self) -> bool {
        self.is_down(InputAction::Quit) || self.was_pressed(InputAction::Quit)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_action_pressed(mut self, action: InputAction) -> Self {
        self.actions.set_pressed(action);
        self
    }

    /// Same held keys, edges removed.
    pub fn held_only(mut self) -> Self {
        self.actions.clear_pressed();
        self
    }
}

/// World-space point at the centre of the view.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera2D {
    pub position: Vec2,
}

impl Camera2D {
    pub fn centered_on(position: Vec2) -> Self {
        Self { position }
    }
}

/// Everything a scene may touch besides its own state.
pub struct SceneContext<'a, S> {
    pub shared: &'a mut S,
    pub audio: &'a mut dyn AudioSink,
    pub assets: &'a mut Assets,
}

impl<'a, S> SceneContext<'a, S> {
    pub fn new(shared: &'a mut S, audio: &'a mut dyn AudioSink, assets: &'a mut Assets) -> Self {
        Self {
            shared,
            audio,
            assets,
        }
    }
}

#[derive(Debug, Error)]
pub enum SceneInitError {
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Tilemap(#[from] TilemapError),
}

#[derive(Debug, Error)]
pub enum SceneSwitchError {
    #[error("no scenes registered")]
    NoScenes,
    #[error("unknown scene {key:?} ({scene_count} registered)")]
    UnknownScene { key: SceneKey, scene_count: usize },
    #[error("failed to initialise scene `{name}`: {source}")]
    Init {
        name: String,
        #[source]
        source: SceneInitError,
    },
}

/// A scene is rebuilt from scratch by `initialise` on every entry and drops
/// every resource it holds in `teardown`.
pub trait Scene<S> {
    fn name(&self) -> &str;
    fn initialise(&mut self, ctx: &mut SceneContext<'_, S>) -> Result<(), SceneInitError>;
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        ctx: &mut SceneContext<'_, S>,
    );
    /// Called once per rendered frame after all fixed steps of that frame.
    fn end_frame(&mut self, ctx: &mut SceneContext<'_, S>) -> SceneCommand;
    fn camera(&self, shared: &S) -> Camera2D;
    fn render(&self, shared: &S, target: &mut dyn RenderTarget);
    fn teardown(&mut self, ctx: &mut SceneContext<'_, S>);
}

struct SceneRuntime<S> {
    scene: Box<dyn Scene<S>>,
    is_initialised: bool,
}

pub struct SceneMachine<S> {
    runtimes: Vec<SceneRuntime<S>>,
    active_scene: SceneKey,
}

impl<S> SceneMachine<S> {
    pub fn new(
        scenes: Vec<Box<dyn Scene<S>>>,
        active_scene: SceneKey,
    ) -> Result<Self, SceneSwitchError> {
        if scenes.is_empty() {
            return Err(SceneSwitchError::NoScenes);
        }
        if active_scene.0 >= scenes.len() {
            return Err(SceneSwitchError::UnknownScene {
                key: active_scene,
                scene_count: scenes.len(),
            });
        }
        let runtimes = scenes
            .into_iter()
            .map(|scene| SceneRuntime {
                scene,
                is_initialised: false,
            })
            .collect();
        Ok(Self {
            runtimes,
            active_scene,
        })
    }

    pub fn active_scene(&self) -> SceneKey {
        self.active_scene
    }

    pub fn active_name(&self) -> &str {
        self.active_runtime_ref().scene.name()
    }

    pub fn scene_count(&self) -> usize {
        self.runtimes.len()
    }

    pub fn initialise_active(
        &mut self,
        ctx: &mut SceneContext<'_, S>,
    ) -> Result<(), SceneSwitchError> {
        let runtime = self.active_runtime_mut();
        if runtime.is_initialised {
            return Ok(());
        }
        runtime
            .scene
            .initialise(ctx)
            .map_err(|source| SceneSwitchError::Init {
                name: runtime.scene.name().to_string(),
                source,
            })?;
        runtime.is_initialised = true;
        info!(scene = runtime.scene.name(), "scene_initialised");
        Ok(())
    }

    pub fn update_active(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        ctx: &mut SceneContext<'_, S>,
    ) {
        let runtime = self.active_runtime_mut();
        if runtime.is_initialised {
            runtime.scene.update(fixed_dt_seconds, input, ctx);
        }
    }

    pub fn end_frame_active(&mut self, ctx: &mut SceneContext<'_, S>) -> SceneCommand {
        let runtime = self.active_runtime_mut();
        if !runtime.is_initialised {
            return SceneCommand::None;
        }
        runtime.scene.end_frame(ctx)
    }

    pub fn camera_active(&self, shared: &S) -> Camera2D {
        self.active_runtime_ref().scene.camera(shared)
    }

    pub fn render_active(&self, shared: &S, target: &mut dyn RenderTarget) {
        let runtime = self.active_runtime_ref();
        if runtime.is_initialised {
            runtime.scene.render(shared, target);
        }
    }

    /// Tears the active scene down and initialises `next_scene` from scratch,
    /// including when `next_scene` is already active.
    pub fn switch_to(
        &mut self,
        next_scene: SceneKey,
        ctx: &mut SceneContext<'_, S>,
    ) -> Result<(), SceneSwitchError> {
        if next_scene.0 >= self.runtimes.len() {
            return Err(SceneSwitchError::UnknownScene {
                key: next_scene,
                scene_count: self.runtimes.len(),
            });
        }

        self.teardown_active(ctx);
        let previous = self.active_scene;
        self.active_scene = next_scene;
        self.initialise_active(ctx)?;
        info!(
            from = previous.0,
            to = next_scene.0,
            scene = self.active_name(),
            "scene_switched"
        );
        Ok(())
    }

    pub fn shutdown_all(&mut self, ctx: &mut SceneContext<'_, S>) {
        for runtime in &mut self.runtimes {
            if runtime.is_initialised {
                runtime.scene.teardown(ctx);
                runtime.is_initialised = false;
                debug!(scene = runtime.scene.name(), "scene_torn_down");
            }
        }
    }

    fn teardown_active(&mut self, ctx: &mut SceneContext<'_, S>) {
        let runtime = self.active_runtime_mut();
        if runtime.is_initialised {
            runtime.scene.teardown(ctx);
            runtime.is_initialised = false;
            debug!(scene = runtime.scene.name(), "scene_torn_down");
        }
    }

    fn active_runtime_ref(&self) -> &SceneRuntime<S> {
        &self.runtimes[self.active_scene.0]
    }

    fn active_runtime_mut(&mut self) -> &mut SceneRuntime<S> {
        &mut self.runtimes[self.active_scene.0]
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    use super::*;
    use crate::app::audio::LoggingAudio;
    use crate::app::rendering::DrawList;
    use crate::AppPaths;

    #[derive(Default)]
    struct Journal {
        events: Vec<String>,
    }

    struct CountingScene {
        name: &'static str,
        journal: Rc<RefCell<Journal>>,
        steps: u32,
        switch_after: Option<(u32, SceneKey)>,
        fail_init: bool,
    }

    impl CountingScene {
        fn boxed(name: &'static str, journal: &Rc<RefCell<Journal>>) -> Box<dyn Scene<u32>> {
            Box::new(Self {
                name,
                journal: Rc::clone(journal),
                steps: 0,
                switch_after: None,
                fail_init: false,
            })
        }
    }

    impl Scene<u32> for CountingScene {
        fn name(&self) -> &str {
            self.name
        }

        fn initialise(&mut self, _ctx: &mut SceneContext<'_, u32>) -> Result<(), SceneInitError> {
            if self.fail_init {
                return Err(TilemapError::ZeroTileSize.into());
            }
            self.steps = 0;
            self.journal
                .borrow_mut()
                .events
                .push(format!("init:{}", self.name));
            Ok(())
        }

        fn update(
            &mut self,
            _fixed_dt_seconds: f32,
            _input: &InputSnapshot,
            ctx: &mut SceneContext<'_, u32>,
        ) {
            self.steps += 1;
            *ctx.shared += 1;
        }

        fn end_frame(&mut self, _ctx: &mut SceneContext<'_, u32>) -> SceneCommand {
            match self.switch_after {
                Some((after, key)) if self.steps >= after => SceneCommand::SwitchTo(key),
                _ => SceneCommand::None,
            }
        }

        fn camera(&self, _shared: &u32) -> Camera2D {
            Camera2D::default()
        }

        fn render(&self, _shared: &u32, _target: &mut dyn RenderTarget) {}

        fn teardown(&mut self, _ctx: &mut SceneContext<'_, u32>) {
            self.journal
                .borrow_mut()
                .events
                .push(format!("teardown:{}", self.name));
        }
    }

    struct Harness {
        shared: u32,
        audio: LoggingAudio,
        assets: Assets,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                shared: 0,
                audio: LoggingAudio::default(),
                assets: Assets::new(AppPaths::from_root(PathBuf::from("/nonexistent"))),
            }
        }

        fn ctx(&mut self) -> SceneContext<'_, u32> {
            SceneContext::new(&mut self.shared, &mut self.audio, &mut self.assets)
        }
    }

    #[test]
    fn empty_scene_list_is_rejected() {
        assert!(matches!(
            SceneMachine::<u32>::new(Vec::new(), SceneKey(0)),
            Err(SceneSwitchError::NoScenes)
        ));
    }

    #[test]
    fn update_before_initialise_is_ignored() {
        let journal = Rc::new(RefCell::new(Journal::default()));
        let mut machine =
            SceneMachine::new(vec![CountingScene::boxed("a", &journal)], SceneKey(0))
                .expect("machine");
        let mut harness = Harness::new();

        machine.update_active(1.0 / 60.0, &InputSnapshot::empty(), &mut harness.ctx());
        assert_eq!(harness.shared, 0);

        machine
            .initialise_active(&mut harness.ctx())
            .expect("initialise");
        machine.update_active(1.0 / 60.0, &InputSnapshot::empty(), &mut harness.ctx());
        assert_eq!(harness.shared, 1);
    }

    #[test]
    fn switch_tears_down_then_initialises_next() {
        let journal = Rc::new(RefCell::new(Journal::default()));
        let mut machine = SceneMachine::new(
            vec![
                CountingScene::boxed("a", &journal),
                CountingScene::boxed("b", &journal),
            ],
            SceneKey(0),
        )
        .expect("machine");
        let mut harness = Harness::new();

        machine
            .initialise_active(&mut harness.ctx())
            .expect("initialise");
        machine
            .switch_to(SceneKey(1), &mut harness.ctx())
            .expect("switch");

        assert_eq!(machine.active_scene(), SceneKey(1));
        assert_eq!(machine.active_name(), "b");
        assert_eq!(
            journal.borrow().events,
            vec!["init:a", "teardown:a", "init:b"]
        );
    }

    #[test]
    fn switching_to_active_scene_reinitialises_it() {
        let journal = Rc::new(RefCell::new(Journal::default()));
        let mut machine =
            SceneMachine::new(vec![CountingScene::boxed("a", &journal)], SceneKey(0))
                .expect("machine");
        let mut harness = Harness::new();

        machine
            .initialise_active(&mut harness.ctx())
            .expect("initialise");
        machine
            .switch_to(SceneKey(0), &mut harness.ctx())
            .expect("switch");

        assert_eq!(
            journal.borrow().events,
            vec!["init:a", "teardown:a", "init:a"]
        );
    }

    #[test]
    fn unknown_scene_key_leaves_active_scene_running() {
        let journal = Rc::new(RefCell::new(Journal::default()));
        let mut machine =
            SceneMachine::new(vec![CountingScene::boxed("a", &journal)], SceneKey(0))
                .expect("machine");
        let mut harness = Harness::new();
        machine
            .initialise_active(&mut harness.ctx())
            .expect("initialise");

        let error = machine
            .switch_to(SceneKey(4), &mut harness.ctx())
            .expect_err("unknown key");

        assert!(matches!(
            error,
            SceneSwitchError::UnknownScene {
                key: SceneKey(4),
                scene_count: 1
            }
        ));
        assert_eq!(journal.borrow().events, vec!["init:a"]);
    }

    #[test]
    fn failed_initialise_reports_scene_name() {
        let journal = Rc::new(RefCell::new(Journal::default()));
        let broken = Box::new(CountingScene {
            name: "broken",
            journal: Rc::clone(&journal),
            steps: 0,
            switch_after: None,
            fail_init: true,
        });
        let mut machine = SceneMachine::new(
            vec![CountingScene::boxed("a", &journal), broken],
            SceneKey(0),
        )
        .expect("machine");
        let mut harness = Harness::new();
        machine
            .initialise_active(&mut harness.ctx())
            .expect("initialise");

        let error = machine
            .switch_to(SceneKey(1), &mut harness.ctx())
            .expect_err("init failure");
        match error {
            SceneSwitchError::Init { name, .. } => assert_eq!(name, "broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn end_frame_command_is_returned_to_caller() {
        let journal = Rc::new(RefCell::new(Journal::default()));
        let scene = Box::new(CountingScene {
            name: "a",
            journal: Rc::clone(&journal),
            steps: 0,
            switch_after: Some((2, SceneKey(1))),
            fail_init: false,
        });
        let mut machine =
            SceneMachine::new(vec![scene, CountingScene::boxed("b", &journal)], SceneKey(0))
                .expect("machine");
        let mut harness = Harness::new();
        machine
            .initialise_active(&mut harness.ctx())
            .expect("initialise");

        machine.update_active(0.1, &InputSnapshot::empty(), &mut harness.ctx());
        assert_eq!(machine.end_frame_active(&mut harness.ctx()), SceneCommand::None);
        machine.update_active(0.1, &InputSnapshot::empty(), &mut harness.ctx());
        assert_eq!(
            machine.end_frame_active(&mut harness.ctx()),
            SceneCommand::SwitchTo(SceneKey(1))
        );
    }

    #[test]
    fn shutdown_tears_down_only_initialised_scenes() {
        let journal = Rc::new(RefCell::new(Journal::default()));
        let mut machine = SceneMachine::new(
            vec![
                CountingScene::boxed("a", &journal),
                CountingScene::boxed("b", &journal),
            ],
            SceneKey(0),
        )
        .expect("machine");
        let mut harness = Harness::new();
        machine
            .initialise_active(&mut harness.ctx())
            .expect("initialise");

        machine.shutdown_all(&mut harness.ctx());
        machine.shutdown_all(&mut harness.ctx());

        assert_eq!(journal.borrow().events, vec!["init:a", "teardown:a"]);
        let mut draws = DrawList::default();
        machine.render_active(&harness.shared, &mut draws);
        assert!(draws.commands().is_empty());
    }

    #[test]
    fn snapshot_builders_set_held_and_edge_state() {
        let snapshot = InputSnapshot::empty()
            .with_action_down(InputAction::MoveLeft, true)
            .with_action_pressed(InputAction::Confirm);

        assert!(snapshot.is_down(InputAction::MoveLeft));
        assert!(snapshot.was_pressed(InputAction::MoveLeft));
        assert!(snapshot.was_pressed(InputAction::Confirm));
        assert!(!snapshot.is_down(InputAction::Confirm));

        let held = snapshot.held_only();
        assert!(held.is_down(InputAction::MoveLeft));
        assert!(!held.was_pressed(InputAction::Confirm));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveLeft,
    MoveRight,
    MoveUp,
    /// Enter.
    Confirm,
    /// Space: pause toggle in the platformer, flap in the lander.
    Primary,
    Quit,
}

const ACTION_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
    pressed: [bool; ACTION_COUNT],
}

impl ActionStates {
    /// A release followed by a press inside one frame still leaves the edge set.
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        let index = action.index();
        if is_down && !self.down[index] {
            self.pressed[index] = true;
        }
        self.down[index] = is_down;
    }

    pub(crate) fn set_pressed(&mut self, action: InputAction) {
        self.pressed[action.index()] = true;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn was_pressed(&self, action: InputAction) -> bool {
        self.pressed[action.index()]
    }

    pub(crate) fn clear_pressed(&mut self) {
        self.pressed = [false; ACTION_COUNT];
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveLeft => 0,
            InputAction::MoveRight => 1,
            InputAction::MoveUp => 2,
            InputAction::Confirm => 3,
            InputAction::Primary => 4,
            InputAction::Quit => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_sets_edge_once_while_held() {
        let mut states = ActionStates::default();
        states.set(InputAction::Confirm, true);
        assert!(states.was_pressed(InputAction::Confirm));

        states.clear_pressed();
        states.set(InputAction::Confirm, true);
        assert!(states.is_down(InputAction::Confirm));
        assert!(!states.was_pressed(InputAction::Confirm));
    }

    #[test]
    fn quick_tap_keeps_edge_after_release() {
        let mut states = ActionStates::default();
        states.set(InputAction::MoveUp, true);
        states.set(InputAction::MoveUp, false);

        assert!(!states.is_down(InputAction::MoveUp));
        assert!(states.was_pressed(InputAction::MoveUp));
    }
}

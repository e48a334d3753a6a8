use tracing::info;

pub(crate) const STARTING_LIVES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AppStatus {
    Running,
    Paused,
    Won,
    Lost,
}

impl AppStatus {
    fn as_token(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }
}

/// Application state shared by every scene for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GameSession {
    lives: u32,
    status: AppStatus,
}

impl GameSession {
    pub(crate) fn new(status: AppStatus) -> Self {
        Self {
            lives: STARTING_LIVES,
            status,
        }
    }

    pub(crate) fn lives(&self) -> u32 {
        self.lives
    }

    pub(crate) fn status(&self) -> AppStatus {
        self.status
    }

    pub(crate) fn is_running(&self) -> bool {
        self.status == AppStatus::Running
    }

    pub(crate) fn is_over(&self) -> bool {
        matches!(self.status, AppStatus::Won | AppStatus::Lost)
    }

    /// Running <-> Paused; a finished game stays finished.
    pub(crate) fn toggle_pause(&mut self) {
        let next = match self.status {
            AppStatus::Running => AppStatus::Paused,
            AppStatus::Paused => AppStatus::Running,
            AppStatus::Won | AppStatus::Lost => return,
        };
        self.set_status(next);
    }

    pub(crate) fn resume(&mut self) {
        if self.status == AppStatus::Paused {
            self.set_status(AppStatus::Running);
        }
    }

    pub(crate) fn lose_life(&mut self) -> u32 {
        self.lives = self.lives.saturating_sub(1);
        info!(lives = self.lives, "life_lost");
        self.lives
    }

    pub(crate) fn finish(&mut self, won: bool) {
        if self.is_over() {
            return;
        }
        self.set_status(if won { AppStatus::Won } else { AppStatus::Lost });
    }

    fn set_status(&mut self, status: AppStatus) {
        info!(
            from = self.status.as_token(),
            to = status.as_token(),
            "status_changed"
        );
        self.status = status;
    }
}

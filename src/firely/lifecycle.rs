//! Foreground/background signals forwarded by the host application.

/// Screen lifecycle callbacks, one variant per host callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    Created,
    Started,
    Resumed,
    Paused,
    Stopped,
    SaveInstanceState,
    Destroyed {
        /// The screen is the root of its task.
        is_task_root: bool,
        /// The screen is going away for good rather than being recreated.
        is_finishing: bool,
    },
}

/// What Firely does in response to a [`LifecycleEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleAction {
    Fetch,
    Activate,
    Ignore,
}

impl LifecycleEvent {
    /// Resume fetches. Pause activates in debug mode; outside debug mode only destroying the
    /// finishing task root activates.
    pub fn action(self, debug_mode: bool) -> LifecycleAction {
        match self {
            LifecycleEvent::Resumed => LifecycleAction::Fetch,
            LifecycleEvent::Paused if debug_mode => LifecycleAction::Activate,
            LifecycleEvent::Destroyed {
                is_task_root: true,
                is_finishing: true,
            } if !debug_mode => LifecycleAction::Activate,
            _ => LifecycleAction::Ignore,
        }
    }
}

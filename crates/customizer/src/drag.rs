/// Drag-to-reposition input state.
///
/// While drag mode is on the pointer belongs to the logo, so camera orbit is
/// suspended for the whole mode, not only for an active gesture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DragState {
    enabled: bool,
    active: bool,
}

impl DragState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn drag mode on or off. Turning it off ends any gesture in progress.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.active = false;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Start a gesture. Returns `false` when drag mode is off.
    pub fn begin(&mut self) -> bool {
        if self.enabled {
            self.active = true;
        }
        self.active
    }

    /// End the gesture, if any. Returns whether one was in progress.
    pub fn end(&mut self) -> bool {
        std::mem::take(&mut self.active)
    }

    pub fn is_dragging(&self) -> bool {
        self.active
    }

    pub fn orbit_enabled(&self) -> bool {
        !self.enabled && !self.active
    }
}

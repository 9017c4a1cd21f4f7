use super::directory::{DirectorySnapshot, FilterPolicy, WindowId, WindowInfo};
use super::geometry::{Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PickerEffect {
    Highlight { window: WindowId, frame: Rect },
    ClearHighlight,
}

/// Interactive selection sweep. Follows the pointer across the window list
/// and highlights the topmost eligible window under it; a click confirms,
/// escape cancels.
#[derive(Debug, Default)]
pub(crate) struct Picker {
    current: Option<WindowId>,
}

impl Picker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn current(&self) -> Option<WindowId> {
        self.current
    }

    /// Returns a highlight change, or `None` while the pointer stays over
    /// the same window.
    pub(crate) fn pointer_moved(
        &mut self,
        at: Point,
        snapshot: &DirectorySnapshot,
        policy: &FilterPolicy,
    ) -> Option<PickerEffect> {
        let hit = snapshot.window_at(at, policy);
        if hit.map(|w| w.id) == self.current {
            return None;
        }
        match hit {
            Some(w) => {
                self.current = Some(w.id);
                Some(PickerEffect::Highlight {
                    window: w.id,
                    frame: w.frame,
                })
            }
            None => {
                self.current = None;
                Some(PickerEffect::ClearHighlight)
            }
        }
    }

    /// The highlighted window, revalidated against a fresh snapshot. The
    /// highlight can outlive its window by a click's latency, so a vanished
    /// or no-longer-eligible target confirms to `None`.
    pub(crate) fn confirm(
        &mut self,
        snapshot: &DirectorySnapshot,
        policy: &FilterPolicy,
    ) -> Option<WindowInfo> {
        let id = self.current.take()?;
        snapshot
            .window(id)
            .filter(|w| policy.admits(w))
            .cloned()
    }

    pub(crate) fn cancel(&mut self) {
        self.current = None;
    }
}

use super::directory::{DirectorySnapshot, DisplayId, WindowId};
use super::geometry::Rect;

/// A single transient window-list miss is tolerated before the source is
/// declared closed; absence from the list on the next cycle is authoritative.
const MISS_TOLERANCE: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum TrackerEvent {
    Steady,
    Moved {
        frame: Rect,
        display: DisplayId,
        display_changed: bool,
    },
    Closed,
}

/// Poll-driven observer for one tracked window. Each tick compares the
/// window's current frame and covering display against the last observation
/// and reports steady, moved, or closed.
#[derive(Debug)]
pub(crate) struct GeometryTracker {
    window: WindowId,
    frame: Rect,
    display: DisplayId,
    misses: u8,
}

impl GeometryTracker {
    pub(crate) fn new(window: WindowId, frame: Rect, display: DisplayId) -> Self {
        Self {
            window,
            frame,
            display,
            misses: 0,
        }
    }

    pub(crate) fn frame(&self) -> Rect {
        self.frame
    }

    pub(crate) fn display(&self) -> DisplayId {
        self.display
    }

    pub(crate) fn observe(&mut self, snapshot: &DirectorySnapshot) -> TrackerEvent {
        let Some(frame) = snapshot.frame_of(self.window) else {
            self.misses += 1;
            if self.misses > MISS_TOLERANCE {
                return TrackerEvent::Closed;
            }
            return TrackerEvent::Steady;
        };
        self.misses = 0;

        let display = snapshot
            .display_for(&frame)
            .map(|d| d.id)
            .unwrap_or(self.display);

        if frame == self.frame && display == self.display {
            return TrackerEvent::Steady;
        }

        let display_changed = display != self.display;
        self.frame = frame;
        self.display = display;
        TrackerEvent::Moved {
            frame,
            display,
            display_changed,
        }
    }
}

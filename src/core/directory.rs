use regex::Regex;

use super::geometry::{Point, Rect};

/// Window id assigned by the window server. Unique among open windows, but
/// macOS reuses ids of closed windows, so holders must revalidate on use.
pub(crate) type WindowId = u32;
pub(crate) type DisplayId = u32;

/// A single entry from the window server's window list, in the window
/// server's coordinate space (origin top-left of the primary display).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WindowInfo {
    pub(crate) id: WindowId,
    pub(crate) pid: i32,
    pub(crate) title: Option<String>,
    pub(crate) bundle_id: Option<String>,
    pub(crate) frame: Rect,
    pub(crate) alpha: f64,
    pub(crate) layer: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DisplayInfo {
    pub(crate) id: DisplayId,
    pub(crate) frame: Rect,
    pub(crate) max_fps: u32,
    pub(crate) scale: f64,
}

/// Owners whose windows are never pinnable: docks, status bars, the capture
/// picker itself. Keyed by bundle identifier.
const SYSTEM_OWNERS: &[&str] = &[
    "com.apple.dock",
    "com.apple.screencaptureui",
    "com.apple.controlcenter",
    "com.apple.notificationcenterui",
    "com.apple.systemuiserver",
    "com.apple.WindowManager",
    "com.apple.Spotlight",
];

const MIN_WINDOW_EDGE: f64 = 40.0;
const NORMAL_LAYER: i32 = 0;

/// Uniform eligibility policy for every consumer of the window list.
pub(crate) struct FilterPolicy {
    blocklist: Vec<String>,
    title_excludes: Vec<Regex>,
    own_pid: Option<i32>,
}

impl FilterPolicy {
    pub(crate) fn new(
        blocklist: Vec<String>,
        title_excludes: Vec<Regex>,
        own_pid: Option<i32>,
    ) -> Self {
        Self {
            blocklist,
            title_excludes,
            own_pid,
        }
    }

    pub(crate) fn admits(&self, window: &WindowInfo) -> bool {
        if Some(window.pid) == self.own_pid {
            return false;
        }
        if window.alpha <= 0.0 || window.layer != NORMAL_LAYER {
            return false;
        }
        if window.frame.width < MIN_WINDOW_EDGE || window.frame.height < MIN_WINDOW_EDGE {
            return false;
        }
        if let Some(bundle_id) = &window.bundle_id {
            if SYSTEM_OWNERS.contains(&bundle_id.as_str()) {
                return false;
            }
            if self.blocklist.iter().any(|b| b == bundle_id) {
                return false;
            }
        }
        if let Some(title) = &window.title
            && self.title_excludes.iter().any(|re| re.is_match(title))
        {
            return false;
        }
        true
    }
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new(), None)
    }
}

/// One refresh of the window list plus the current display arrangement.
/// Windows are ordered front to back, as reported by the window server.
/// An OS query failure yields an empty snapshot, never an error.
#[derive(Debug, Clone, Default)]
pub(crate) struct DirectorySnapshot {
    windows: Vec<WindowInfo>,
    displays: Vec<DisplayInfo>,
}

impl DirectorySnapshot {
    pub(crate) fn new(windows: Vec<WindowInfo>, displays: Vec<DisplayInfo>) -> Self {
        Self { windows, displays }
    }

    pub(crate) fn window(&self, id: WindowId) -> Option<&WindowInfo> {
        self.windows.iter().find(|w| w.id == id)
    }

    pub(crate) fn frame_of(&self, id: WindowId) -> Option<Rect> {
        self.window(id).map(|w| w.frame)
    }

    pub(crate) fn eligible<'a, 'b>(
        &'a self,
        policy: &'b FilterPolicy,
    ) -> impl Iterator<Item = &'a WindowInfo> + use<'a, 'b> {
        self.windows.iter().filter(|w| policy.admits(w))
    }

    /// Topmost eligible window under the given point, by the window
    /// server's z-order.
    pub(crate) fn window_at(&self, at: Point, policy: &FilterPolicy) -> Option<&WindowInfo> {
        self.eligible(policy).find(move |w| w.frame.contains(at))
    }

    /// Whether no eligible window is stacked above this one within its own
    /// screen region.
    pub(crate) fn is_on_top(&self, id: WindowId, policy: &FilterPolicy) -> bool {
        let Some(target) = self.window(id) else {
            return false;
        };
        for w in self.eligible(policy) {
            if w.id == id {
                return true;
            }
            if w.frame.intersects(&target.frame) {
                return false;
            }
        }
        false
    }

    pub(crate) fn find_by_title<'a>(
        &'a self,
        title: &str,
        policy: &FilterPolicy,
    ) -> Option<&'a WindowInfo> {
        self.eligible(policy)
            .find(|w| w.title.as_deref() == Some(title))
    }

    pub(crate) fn display(&self, id: DisplayId) -> Option<&DisplayInfo> {
        self.displays.iter().find(|d| d.id == id)
    }

    /// Display covering the largest share of the given frame.
    pub(crate) fn display_for(&self, frame: &Rect) -> Option<&DisplayInfo> {
        self.displays
            .iter()
            .map(|d| (d, d.frame.overlap_area(frame)))
            .filter(|(_, area)| *area > 0.0)
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(d, _)| d)
    }
}

use super::directory::WindowInfo;
use super::geometry::Rect;

/// The accessibility tree can lag window creation, so a failed resolution is
/// retried on subsequent poll ticks up to this many times.
pub(crate) const MAX_RESOLVE_ATTEMPTS: u8 = 4;

/// What a top-level accessibility element reports about itself. The
/// accessibility API shares no key with the window list, so matching is by
/// title and geometry alone.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ManipulationCandidate {
    pub(crate) title: Option<String>,
    pub(crate) frame: Rect,
}

/// Match a window-list entry to one of its process's accessibility windows.
///
/// Geometry equality is the hard requirement; among geometry matches a title
/// match is preferred. Titles can be empty or duplicated, so if several
/// candidates still tie, the first wins. Returns the candidate index, or
/// `None` when nothing matches; callers degrade to no-op manipulation.
pub(crate) fn resolve(target: &WindowInfo, candidates: &[ManipulationCandidate]) -> Option<usize> {
    let mut first_frame_match = None;
    for (i, candidate) in candidates.iter().enumerate() {
        if !candidate.frame.matches(&target.frame) {
            continue;
        }
        if candidate.title == target.title {
            return Some(i);
        }
        if first_frame_match.is_none() {
            first_frame_match = Some(i);
        }
    }
    first_frame_match
}

use super::geometry::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct MirrorId(pub(crate) u64);

impl std::fmt::Display for MirrorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Process-wide record of which mirror currently forwards interaction to its
/// source window. At most one mirror holds it; writes are last-writer-wins on
/// the single UI context.
#[derive(Debug, Default)]
pub(crate) struct AvoidanceArbiter {
    record: Option<(MirrorId, Rect)>,
}

impl AvoidanceArbiter {
    pub(crate) fn claim(&mut self, id: MirrorId, frame: Rect) {
        self.record = Some((id, frame));
    }

    /// Clears the record if held by `id`. Returns whether anything changed.
    pub(crate) fn release(&mut self, id: MirrorId) -> bool {
        if self.holder() == Some(id) {
            self.record = None;
            return true;
        }
        false
    }

    pub(crate) fn holder(&self) -> Option<MirrorId> {
        self.record.map(|(id, _)| id)
    }

    /// Whether a mirror with the given frame must suppress itself: another
    /// mirror holds the record and the activated region intersects ours.
    pub(crate) fn suppresses(&self, id: MirrorId, frame: &Rect) -> bool {
        match self.record {
            Some((holder, region)) => holder != id && region.intersects(frame),
            None => false,
        }
    }
}

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::arbiter::{AvoidanceArbiter, MirrorId};
use super::directory::{DirectorySnapshot, WindowId, WindowInfo};
use super::mirror::{Effect, MirrorEvent, MirrorState, PinnedMirror};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct EngineConfig {
    pub(crate) opacity: f64,
    pub(crate) fps_cap: u32,
    pub(crate) pause_on_hover: bool,
    pub(crate) avoidance: bool,
}

/// Effects to execute against the platform layer, tagged with the mirror
/// they belong to. Already in execution order.
pub(crate) type EffectBatch = Vec<(MirrorId, Effect)>;

/// Owns every pinned mirror plus the activation record shared between them.
/// All methods run on the single UI context; mirrors are keyed by id so the
/// iteration order of a tick is stable.
pub(crate) struct Engine {
    config: EngineConfig,
    mirrors: BTreeMap<MirrorId, PinnedMirror>,
    arbiter: AvoidanceArbiter,
    next_id: u64,
}

impl Engine {
    pub(crate) fn new(config: EngineConfig) -> Self {
        Self {
            config,
            mirrors: BTreeMap::new(),
            arbiter: AvoidanceArbiter::default(),
            next_id: 1,
        }
    }

    /// Apply a changed runtime configuration to every mirror. Opacity takes
    /// effect immediately on visible mirrors; fps and hover behavior apply
    /// from the next reconfigure or hover.
    pub(crate) fn set_config(&mut self, config: EngineConfig) -> EffectBatch {
        self.config = config;
        let mut batch = EffectBatch::new();
        for mirror in self.mirrors.values_mut() {
            mirror.set_config(config.opacity, config.fps_cap, config.pause_on_hover);
            if mirror.state() == MirrorState::Live && !mirror.is_activated() {
                batch.push((mirror.id(), Effect::SetOpacity(config.opacity)));
            }
        }
        batch
    }

    pub(crate) fn len(&self) -> usize {
        self.mirrors.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }

    pub(crate) fn mirrors(&self) -> impl Iterator<Item = &PinnedMirror> {
        self.mirrors.values()
    }

    pub(crate) fn mirror(&self, id: MirrorId) -> Option<&PinnedMirror> {
        self.mirrors.get(&id)
    }

    pub(crate) fn mirror_for_source(&self, source: WindowId) -> Option<MirrorId> {
        self.mirrors
            .values()
            .find(|m| m.source() == source && m.state() != MirrorState::Closing)
            .map(|m| m.id())
    }

    /// Pin the window, or unpin it if a mirror of it already exists.
    pub(crate) fn toggle_pin(
        &mut self,
        window: &WindowInfo,
        snapshot: &DirectorySnapshot,
    ) -> EffectBatch {
        if let Some(existing) = self.mirror_for_source(window.id) {
            info!(mirror = %existing, source = window.id, "unpinning existing mirror");
            return self.unpin(existing);
        }

        let id = MirrorId(self.next_id);
        self.next_id += 1;
        let display = snapshot
            .display_for(&window.frame)
            .or_else(|| snapshot.display(0))
            .map(|d| d.id)
            .unwrap_or(0);
        info!(
            mirror = %id,
            source = window.id,
            frame = %window.frame,
            "pinning window"
        );
        let (mirror, effects) = PinnedMirror::open(
            id,
            window.id,
            window.frame,
            display,
            snapshot,
            self.config.opacity,
            self.config.fps_cap,
            self.config.pause_on_hover,
        );
        self.mirrors.insert(id, mirror);
        let mut batch = EffectBatch::new();
        self.absorb(id, effects, &mut batch);
        batch
    }

    pub(crate) fn unpin(&mut self, id: MirrorId) -> EffectBatch {
        let mut batch = EffectBatch::new();
        if let Some(mirror) = self.mirrors.get_mut(&id) {
            let effects = mirror.close();
            self.absorb(id, effects, &mut batch);
        }
        self.prune();
        batch
    }

    pub(crate) fn unpin_all(&mut self) -> EffectBatch {
        let ids: Vec<MirrorId> = self.mirrors.keys().copied().collect();
        let mut batch = EffectBatch::new();
        for id in ids {
            if let Some(mirror) = self.mirrors.get_mut(&id) {
                let effects = mirror.close();
                self.absorb(id, effects, &mut batch);
            }
        }
        self.prune();
        batch
    }

    /// One geometry poll over every mirror.
    pub(crate) fn tick(&mut self, snapshot: &DirectorySnapshot) -> EffectBatch {
        let ids: Vec<MirrorId> = self.mirrors.keys().copied().collect();
        let mut batch = EffectBatch::new();
        for id in ids {
            let Some(mirror) = self.mirrors.get_mut(&id) else {
                continue;
            };
            let effects = mirror.tick(snapshot);
            // An activated mirror drags its claimed region along with the
            // source window.
            if self.arbiter.holder() == Some(id) {
                let frame = mirror.frame();
                self.arbiter.claim(id, frame);
                self.refresh_avoidance(&mut batch);
            }
            self.absorb(id, effects, &mut batch);
        }
        self.prune();
        batch
    }

    /// Deliver a platform event to one mirror.
    pub(crate) fn handle(&mut self, id: MirrorId, event: MirrorEvent) -> EffectBatch {
        let mut batch = EffectBatch::new();
        if let Some(mirror) = self.mirrors.get_mut(&id) {
            let effects = mirror.handle(event);
            self.absorb(id, effects, &mut batch);
        }
        self.prune();
        batch
    }

    /// Route a mirror's effects to the output batch, consuming the
    /// activation bookkeeping ones and fanning out the resulting avoidance
    /// changes to the other mirrors.
    fn absorb(&mut self, id: MirrorId, effects: Vec<Effect>, batch: &mut EffectBatch) {
        for effect in effects {
            match effect {
                Effect::ClaimActivation { frame } => {
                    debug!(mirror = %id, "activation claimed");
                    self.arbiter.claim(id, frame);
                    self.refresh_avoidance(batch);
                }
                Effect::ReleaseActivation => {
                    if self.arbiter.release(id) {
                        debug!(mirror = %id, "activation released");
                        self.refresh_avoidance(batch);
                    }
                }
                other => batch.push((id, other)),
            }
        }
    }

    fn refresh_avoidance(&mut self, batch: &mut EffectBatch) {
        if !self.config.avoidance {
            return;
        }
        for mirror in self.mirrors.values_mut() {
            let suppressed = self.arbiter.suppresses(mirror.id(), &mirror.frame());
            for effect in mirror.handle(MirrorEvent::AvoidanceChanged { suppressed }) {
                batch.push((mirror.id(), effect));
            }
        }
    }

    fn prune(&mut self) {
        self.mirrors.retain(|id, m| {
            let keep = m.state() != MirrorState::Closing;
            if !keep {
                debug!(mirror = %id, "mirror closed");
            }
            keep
        });
    }
}

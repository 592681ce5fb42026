use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use scale_engine::{CreatureId, ScaleCacheReader};
use tracing::{debug, warn};

/// What the visual path would send to clients for one creature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum VisualUpdate {
    Scale { creature: CreatureId, factor: f64 },
    Revert { creature: CreatureId },
    Clear { creature: CreatureId },
}

/// Builds the update for `creature` from the cache alone.
pub(crate) fn visual_update(reader: &ScaleCacheReader, creature: CreatureId) -> VisualUpdate {
    match reader.get(creature) {
        Some(scale) if scale.reverts_to_unscaled() => VisualUpdate::Revert { creature },
        Some(scale) => VisualUpdate::Scale {
            creature,
            factor: scale.final_scale_factor,
        },
        None => VisualUpdate::Clear { creature },
    }
}

/// Background thread that turns "creature changed" notifications into
/// visual updates. It never sees resolution results directly.
pub(crate) struct VisualSyncWorker {
    notify: Sender<CreatureId>,
    handle: JoinHandle<Vec<VisualUpdate>>,
}

impl VisualSyncWorker {
    pub(crate) fn spawn(reader: ScaleCacheReader) -> std::io::Result<Self> {
        let (notify, inbox) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("visual-sync".to_string())
            .spawn(move || run_worker(reader, inbox))?;
        Ok(Self { notify, handle })
    }

    pub(crate) fn notify(&self, creature: CreatureId) {
        if self.notify.send(creature).is_err() {
            warn!(creature = creature.0, "visual_sync_channel_closed");
        }
    }

    /// Closes the channel and waits for the worker to drain it.
    pub(crate) fn finish(self) -> Vec<VisualUpdate> {
        drop(self.notify);
        match self.handle.join() {
            Ok(updates) => updates,
            Err(_) => {
                warn!("visual_sync_worker_panicked");
                Vec::new()
            }
        }
    }
}

fn run_worker(reader: ScaleCacheReader, inbox: Receiver<CreatureId>) -> Vec<VisualUpdate> {
    let mut sent = Vec::new();
    for creature in inbox {
        let update = visual_update(&reader, creature);
        debug!(update = ?update, "visual_update");
        sent.push(update);
    }
    sent
}

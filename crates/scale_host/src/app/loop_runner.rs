use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, SystemTime};

use scale_engine::{
    CreatureId, LifeStage, ObserverId, Outcome, Position, RegionSelector, ResolveSummary,
    ScaleConfig, ScaleEngine,
};
use tracing::{error, info, warn};

use super::attributes::{AttributeBook, AttributeSheet};
use super::bootstrap::{AppWiring, HostError};
use super::spawn_queue::{SpawnQueue, SpawnReason};
use super::visual_sync::{VisualSyncWorker, VisualUpdate};
use super::world::{SimWorld, SpawnSpec};

#[derive(Debug, Clone)]
pub(crate) struct LoopConfig {
    pub(crate) tick_interval: Duration,
    pub(crate) max_ticks: u64,
    pub(crate) check_interval_ticks: u64,
    pub(crate) max_spawns_per_tick: usize,
    pub(crate) observer: Option<ObserverId>,
    pub(crate) config_file: Option<PathBuf>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(50),
            max_ticks: 200,
            check_interval_ticks: 100,
            max_spawns_per_tick: 10,
            observer: None,
            config_file: None,
        }
    }
}

/// Authoritative tick context: owns the engine, the world and the spawn
/// queue. The visual sync worker runs on its own thread.
pub(crate) struct TickLoop {
    engine: ScaleEngine,
    world: SimWorld,
    attributes: AttributeBook,
    queue: SpawnQueue,
    visual: VisualSyncWorker,
    config: LoopConfig,
    config_stamp: Option<SystemTime>,
    tick: u64,
}

impl TickLoop {
    pub(crate) fn new(app: AppWiring) -> Result<Self, HostError> {
        let visual = VisualSyncWorker::spawn(app.engine.reader()).map_err(HostError::VisualSync)?;
        let config_stamp = app.config.config_file.as_deref().and_then(modified_at);
        Ok(Self {
            queue: SpawnQueue::new(app.config.max_spawns_per_tick),
            engine: app.engine,
            world: SimWorld::default(),
            attributes: app.attributes,
            visual,
            config: app.config,
            config_stamp,
            tick: 0,
        })
    }

    pub(crate) fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn engine(&self) -> &ScaleEngine {
        &self.engine
    }

    #[cfg(test)]
    pub(crate) fn attributes(&self) -> &AttributeBook {
        &self.attributes
    }

    pub(crate) fn creature_count(&self) -> usize {
        self.world.len()
    }

    pub(crate) fn pending_spawns(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn spawn(&mut self, spec: SpawnSpec<'_>, reason: SpawnReason) -> CreatureId {
        let id = self.world.spawn(spec);
        if let Some(profile) = self
            .world
            .get(id)
            .and_then(|creature| self.engine.species().lookup(&creature.kind))
        {
            self.attributes
                .register(id, AttributeSheet::for_profile(profile));
        }
        self.queue.schedule(id, reason, self.tick);
        id
    }

    pub(crate) fn despawn(&mut self, id: CreatureId) -> bool {
        if self.world.remove(id).is_none() {
            return false;
        }
        self.engine.creature_removed(id);
        self.attributes.forget(id);
        self.visual.notify(id);
        true
    }

    /// Promotes a juvenile and re-resolves it right away.
    pub(crate) fn grow_up(&mut self, id: CreatureId) -> Option<Outcome> {
        if !self.world.grow_up(id) {
            return None;
        }
        self.resolve_one(id)
    }

    pub(crate) fn relocate(
        &mut self,
        id: CreatureId,
        environment: &str,
        position: Position,
    ) -> Option<Outcome> {
        if !self.world.relocate(id, environment, position) {
            return None;
        }
        self.resolve_one(id)
    }

    pub(crate) fn step(&mut self) {
        self.tick += 1;
        for id in self.queue.drain_due(self.tick) {
            if self.world.is_live(id) {
                self.resolve_one(id);
            }
        }
        if self.config.check_interval_ticks > 0 && self.tick % self.config.check_interval_ticks == 0
        {
            self.maintenance();
        }
    }

    pub(crate) fn resolve_all(&mut self) -> ResolveSummary {
        let summary =
            self.engine
                .resolve_all_in(self.world.iter(), &RegionSelector::All, self.config.observer);
        for creature in self.world.iter() {
            self.visual.notify(creature.id);
        }
        summary
    }

    /// Stops the visual worker and returns every update it produced.
    pub(crate) fn finish(self) -> Vec<VisualUpdate> {
        self.visual.finish()
    }

    fn resolve_one(&mut self, id: CreatureId) -> Option<Outcome> {
        let creature = self.world.get(id)?;
        let outcome = self.engine.resolve(creature, self.config.observer);
        if outcome.is_applied() {
            self.visual.notify(id);
        }
        Some(outcome)
    }

    fn maintenance(&mut self) {
        let world = &self.world;
        self.engine.prune_stale(|id| world.is_live(id));
        self.reload_if_changed();

        let stats = self.engine.statistics(self.world.iter());
        info!(
            tick = self.tick,
            total = stats.total_creatures,
            scaled = stats.scaled_creatures,
            worlds = stats.worlds_checked,
            percentage = stats.scaled_percentage(),
            "scaling_statistics"
        );
    }

    fn reload_if_changed(&mut self) {
        let Some(path) = self.config.config_file.clone() else {
            return;
        };
        let stamp = modified_at(&path);
        if stamp == self.config_stamp {
            return;
        }
        self.config_stamp = stamp;

        match ScaleConfig::load_or_create(&path) {
            Ok(next) => {
                let event = self.engine.reload_config(next, "file");
                if self.engine.config().settings.apply_to_existing
                    && !event.changed_sections.is_empty()
                {
                    let summary = self.resolve_all();
                    info!(applied = summary.applied, "existing_creatures_rescaled");
                }
            }
            Err(error) => warn!(error = %error, "config_reload_failed"),
        }
    }
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

/// Spawns a fixed cast so a bare run exercises every layer once.
fn populate_demo(tick_loop: &mut TickLoop) -> DemoCast {
    let at = |x: f64, z: f64| Position { x, y: 64.0, z };
    let mut spawn = |kind: &'static str,
                     stage: LifeStage,
                     environment: &'static str,
                     reason: SpawnReason,
                     position: Position| {
        tick_loop.spawn(
            SpawnSpec {
                kind,
                stage,
                environment,
                world: "world",
                position,
            },
            reason,
        )
    };

    spawn("COW", LifeStage::Adult, "PLAINS", SpawnReason::Natural, at(0.0, 0.0));
    let calf = spawn("COW", LifeStage::Juvenile, "PLAINS", SpawnReason::Breeding, at(1.0, 0.0));
    let wolf = spawn("WOLF", LifeStage::Adult, "TAIGA", SpawnReason::Spawner, at(40.0, 12.0));
    let doomed = spawn("CHICKEN", LifeStage::Adult, "MEADOW", SpawnReason::Natural, at(3.0, 3.0));
    spawn("DOLPHIN", LifeStage::Adult, "DEEP_OCEAN", SpawnReason::Natural, at(200.0, 0.0));
    spawn("BEE", LifeStage::Adult, "FLOWER_FOREST", SpawnReason::Natural, at(5.0, 5.0));
    spawn("CAMEL", LifeStage::Adult, "DESERT", SpawnReason::Natural, at(-80.0, 10.0));
    spawn("POLAR_BEAR", LifeStage::Juvenile, "SNOWY_PLAINS", SpawnReason::Natural, at(0.0, 300.0));
    spawn("GHAST", LifeStage::Adult, "NETHER_WASTES", SpawnReason::Command, at(0.0, 0.0));

    DemoCast { calf, wolf, doomed }
}

struct DemoCast {
    calf: CreatureId,
    wolf: CreatureId,
    doomed: CreatureId,
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let max_ticks = app.config.max_ticks;
    let tick_interval = app.config.tick_interval;
    let mut tick_loop = match TickLoop::new(app) {
        Ok(tick_loop) => tick_loop,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    let cast = populate_demo(&mut tick_loop);
    for _ in 0..max_ticks {
        tick_loop.step();
        match tick_loop.tick() {
            20 => {
                tick_loop.grow_up(cast.calf);
            }
            30 => {
                let peak = Position {
                    x: 40.0,
                    y: 120.0,
                    z: 12.0,
                };
                tick_loop.relocate(cast.wolf, "JAGGED_PEAKS", peak);
            }
            40 => {
                tick_loop.despawn(cast.doomed);
            }
            _ => {}
        }
        if !tick_interval.is_zero() {
            thread::sleep(tick_interval);
        }
    }

    let cached = tick_loop.engine().cached_count();
    let creatures = tick_loop.creature_count();
    let pending = tick_loop.pending_spawns();
    let updates = tick_loop.finish();
    info!(
        ticks = max_ticks,
        creatures,
        cached,
        pending,
        visual_updates = updates.len(),
        "host_stopped"
    );
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use scale_engine::SkipReason;

    use super::super::bootstrap::test_wiring;
    use super::*;

    fn spec(kind: &str, stage: LifeStage) -> SpawnSpec<'_> {
        SpawnSpec {
            kind,
            stage,
            environment: "PLAINS",
            world: "world",
            position: Position::default(),
        }
    }

    fn tick_loop() -> TickLoop {
        TickLoop::new(test_wiring(ScaleConfig::default())).expect("tick loop")
    }

    #[test]
    fn creature_is_resolved_once_its_spawn_delay_elapses() {
        let mut tick_loop = tick_loop();
        let cow = tick_loop.spawn(spec("COW", LifeStage::Adult), SpawnReason::Natural);

        tick_loop.step();
        assert!(tick_loop.engine().cached(cow).is_none());
        tick_loop.step();
        let scale = tick_loop.engine().cached(cow).expect("resolved on tick 2");
        assert_eq!(scale.final_scale_factor, 1.07);

        let sheet = tick_loop.attributes().current(cow).expect("attributes");
        assert_eq!(sheet.max_health, Some(10.0 * scale.health_multiplier));
        assert_eq!(sheet.attack_damage, None);
    }

    #[test]
    fn despawn_evicts_cache_and_attributes() {
        let mut tick_loop = tick_loop();
        let cow = tick_loop.spawn(spec("COW", LifeStage::Adult), SpawnReason::Command);
        tick_loop.step();
        assert!(tick_loop.engine().cached(cow).is_some());

        assert!(tick_loop.despawn(cow));
        assert!(!tick_loop.despawn(cow));
        assert!(tick_loop.engine().cached(cow).is_none());
        assert!(tick_loop.attributes().current(cow).is_none());

        let updates = tick_loop.finish();
        assert_eq!(updates.last(), Some(&VisualUpdate::Clear { creature: cow }));
    }

    #[test]
    fn despawned_before_due_is_never_resolved() {
        let mut tick_loop = tick_loop();
        let pig = tick_loop.spawn(spec("PIG", LifeStage::Adult), SpawnReason::Spawner);
        tick_loop.despawn(pig);
        for _ in 0..5 {
            tick_loop.step();
        }
        assert_eq!(tick_loop.engine().cached_count(), 0);
    }

    #[test]
    fn growing_up_restores_adult_scale() {
        let mut tick_loop = tick_loop();
        let calf = tick_loop.spawn(spec("COW", LifeStage::Juvenile), SpawnReason::Breeding);
        for _ in 0..3 {
            tick_loop.step();
        }
        let juvenile = tick_loop.engine().cached(calf).expect("calf resolved");
        assert!(juvenile.is_juvenile);

        let outcome = tick_loop.grow_up(calf).expect("calf present");
        let adult = outcome.applied().expect("applied").clone();
        assert!(!adult.is_juvenile);
        assert!(adult.final_scale_factor > juvenile.final_scale_factor);
        assert!(tick_loop.grow_up(calf).is_none());
    }

    #[test]
    fn unknown_kinds_are_skipped_without_attributes() {
        let mut tick_loop = tick_loop();
        let ghast = tick_loop.spawn(spec("GHAST", LifeStage::Adult), SpawnReason::Command);
        tick_loop.step();
        assert!(tick_loop.engine().cached(ghast).is_none());
        assert!(tick_loop.attributes().current(ghast).is_none());
        assert_eq!(
            tick_loop.relocate(ghast, "DESERT", Position::default()),
            Some(Outcome::Skipped(SkipReason::MissingProfile))
        );
    }

    #[test]
    fn resolve_all_covers_every_live_creature() {
        let mut tick_loop = tick_loop();
        for kind in ["COW", "PIG", "SHEEP"] {
            tick_loop.spawn(spec(kind, LifeStage::Adult), SpawnReason::Breeding);
        }
        let summary = tick_loop.resolve_all();
        assert_eq!(summary.applied, 3);
        assert_eq!(tick_loop.engine().cached_count(), 3);
    }

    #[test]
    fn demo_run_finishes_with_a_consistent_cache() {
        let mut tick_loop = tick_loop();
        let cast = populate_demo(&mut tick_loop);
        for _ in 0..5 {
            tick_loop.step();
        }
        assert!(tick_loop.engine().cached(cast.calf).expect("calf").is_juvenile);
        assert!(tick_loop.despawn(cast.doomed));
        // eight known kinds spawned, one of them despawned
        assert_eq!(tick_loop.engine().cached_count(), 7);
    }
}

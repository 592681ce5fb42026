use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::biome::BiomeModifierResolver;
use crate::cache::{EntityScaleCache, ScaleCacheReader};
use crate::config::ScaleConfig;
use crate::preferences::{ObserverId, PreferenceStore};
use crate::species::{
    derive_damage, derive_health, derive_juvenile_factor, SpeciesProfile, SpeciesTable,
};
use crate::stats::ScalingStatistics;

use super::context::{CreatureId, CreatureView, RegionSelector};
use super::hooks::{ConfigReload, HookDecision, HookRegistry, ProposedScale};
use super::outcome::{InvalidResultError, Outcome, ResolveSummary, ResolvedScale, SkipReason};

const JUVENILE_SPEED_BONUS: f64 = 1.15;

/// Writes resolved multipliers onto live creature attributes. Called once per
/// successful resolution, after the cache entry is published.
pub trait AttributeApplier: Send {
    fn apply(&mut self, creature: CreatureId, scale: &ResolvedScale);
}

/// Turns a creature plus its context into a [`ResolvedScale`] and keeps the
/// per-creature cache current. The engine is the cache's only writer.
pub struct ScaleEngine {
    species: Arc<SpeciesTable>,
    config: ScaleConfig,
    biomes: BiomeModifierResolver,
    preferences: PreferenceStore,
    cache: EntityScaleCache,
    hooks: HookRegistry,
    appliers: Vec<Box<dyn AttributeApplier>>,
}

impl std::fmt::Debug for ScaleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScaleEngine")
            .field("species", &self.species.len())
            .field("cache", &self.cache)
            .field("hooks", &self.hooks)
            .field("appliers", &self.appliers.len())
            .finish()
    }
}

impl ScaleEngine {
    pub fn new(species: Arc<SpeciesTable>, mut config: ScaleConfig, preferences: PreferenceStore) -> Self {
        config.sanitize();
        let biomes = BiomeModifierResolver::new(&config.biomes);
        info!(
            species_count = species.len(),
            enabled = config.settings.enabled,
            min_scale = config.bounds.min_scale,
            max_scale = config.bounds.max_scale,
            "scale_engine_ready"
        );
        Self {
            species,
            config,
            biomes,
            preferences,
            cache: EntityScaleCache::new(),
            hooks: HookRegistry::default(),
            appliers: Vec::new(),
        }
    }

    pub fn config(&self) -> &ScaleConfig {
        &self.config
    }

    pub fn species(&self) -> &SpeciesTable {
        &self.species
    }

    pub fn biomes(&self) -> &BiomeModifierResolver {
        &self.biomes
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    pub fn reader(&self) -> ScaleCacheReader {
        self.cache.reader()
    }

    pub fn cached(&self, creature: CreatureId) -> Option<Arc<ResolvedScale>> {
        self.cache.get(creature)
    }

    pub fn cached_count(&self) -> usize {
        self.cache.count()
    }

    pub fn on_before_resolve<F>(&mut self, hook: F)
    where
        F: Fn(ProposedScale) -> HookDecision + Send + Sync + 'static,
    {
        self.hooks.push_before(Box::new(hook));
    }

    pub fn on_after_resolve<F>(&mut self, hook: F)
    where
        F: Fn(CreatureId, &ResolvedScale) + Send + Sync + 'static,
    {
        self.hooks.push_after(Box::new(hook));
    }

    pub fn on_config_reload<F>(&mut self, hook: F)
    where
        F: Fn(&ConfigReload) + Send + Sync + 'static,
    {
        self.hooks.push_reload(Box::new(hook));
    }

    pub fn add_applier<A>(&mut self, applier: A)
    where
        A: AttributeApplier + 'static,
    {
        self.appliers.push(Box::new(applier));
    }

    /// Resolves one creature. Only an `Applied` outcome touches the cache or
    /// any applier; every other outcome leaves prior state exactly as it was.
    pub fn resolve<C>(&mut self, creature: &C, observer: Option<ObserverId>) -> Outcome
    where
        C: CreatureView + ?Sized,
    {
        let id = creature.id();
        let profile = match self.eligible_profile(creature) {
            Ok(profile) => profile,
            Err(reason) => return Outcome::Skipped(reason),
        };

        let is_juvenile = creature.life_stage().is_juvenile();
        let observer_multiplier = observer.map(|observer| {
            self.preferences
                .effective_multiplier(observer, profile.primary_category())
        });
        let raw = self.base_scale(&profile, is_juvenile)
            * self.biomes.resolve(creature.environment(), &profile)
            * observer_multiplier.unwrap_or(1.0)
            * self.config.realistic.global_scale_multiplier;

        let proposal = ProposedScale {
            creature: id,
            observer,
            profile,
            scale_factor: raw,
            is_juvenile,
        };
        let proposal = match self.hooks.run_before(proposal) {
            HookDecision::Proceed(proposal) => proposal,
            HookDecision::Veto { reason } => {
                debug!(creature = id.0, kind = creature.kind(), reason = %reason, "scale_vetoed");
                return Outcome::Vetoed { reason };
            }
        };

        let suppressed = observer_multiplier == Some(0.0) && proposal.scale_factor == 0.0;
        let resolved = match self.finish(proposal, suppressed) {
            Ok(resolved) => Arc::new(resolved),
            Err(error) => {
                warn!(
                    creature = id.0,
                    kind = %error.kind,
                    field = error.field,
                    value = error.value,
                    "scale_invalid_result"
                );
                return Outcome::InvalidResult(error);
            }
        };

        self.publish(id, &resolved);
        Outcome::Applied(resolved)
    }

    /// Re-resolves every creature the selector matches.
    pub fn resolve_all_in<'a, C, I>(
        &mut self,
        creatures: I,
        selector: &RegionSelector,
        observer: Option<ObserverId>,
    ) -> ResolveSummary
    where
        C: CreatureView + ?Sized + 'a,
        I: IntoIterator<Item = &'a C>,
    {
        let mut summary = ResolveSummary::default();
        for creature in creatures {
            if !selector.contains(creature) {
                continue;
            }
            summary.record(&self.resolve(creature, observer));
        }
        debug!(
            considered = summary.considered,
            applied = summary.applied,
            skipped = summary.skipped,
            vetoed = summary.vetoed,
            invalid = summary.invalid,
            "scale_bulk_resolved"
        );
        summary
    }

    /// Forgets a creature that left the simulation. Returns whether it had an
    /// entry.
    pub fn creature_removed(&mut self, creature: CreatureId) -> bool {
        self.cache.evict(creature).is_some()
    }

    /// Sweeps entries for creatures that vanished without a removal event.
    pub fn prune_stale<F>(&mut self, is_live: F) -> usize
    where
        F: FnMut(CreatureId) -> bool,
    {
        let pruned = self.cache.retain_live(is_live);
        if pruned > 0 {
            debug!(pruned, remaining = self.cache.count(), "scale_cache_pruned");
        }
        pruned
    }

    /// Swaps in a new configuration and tells reload listeners which sections
    /// changed. Cached scales are kept until their creatures are re-resolved.
    pub fn reload_config(&mut self, mut config: ScaleConfig, source: &str) -> ConfigReload {
        config.sanitize();
        let changed_sections = self.config.changed_sections(&config);
        self.biomes = BiomeModifierResolver::new(&config.biomes);
        self.config = config;

        let event = ConfigReload {
            source: source.to_string(),
            changed_sections,
        };
        info!(
            source = %event.source,
            changed = ?event.changed_sections,
            "config_reloaded"
        );
        self.hooks.notify_reload(&event);
        event
    }

    pub fn statistics<'a, C, I>(&self, creatures: I) -> ScalingStatistics
    where
        C: CreatureView + ?Sized + 'a,
        I: IntoIterator<Item = &'a C>,
    {
        ScalingStatistics::collect(creatures, &self.config.worlds, &self.cache.reader())
    }

    fn eligible_profile<C>(&self, creature: &C) -> Result<Arc<SpeciesProfile>, SkipReason>
    where
        C: CreatureView + ?Sized,
    {
        if !self.config.settings.enabled {
            return Err(SkipReason::ScalingDisabled);
        }
        if !self.config.worlds.is_world_enabled(creature.world()) {
            return Err(SkipReason::WorldDisabled);
        }
        let Some(profile) = self.species.lookup(creature.kind()) else {
            trace!(creature = creature.id().0, kind = creature.kind(), "scale_profile_missing");
            return Err(SkipReason::MissingProfile);
        };
        if !self.config.mobs.is_kind_enabled(&profile.kind) {
            return Err(SkipReason::KindDisabled);
        }
        if !self.config.categories.allows(profile.categories) {
            return Err(SkipReason::CategoryDisabled);
        }
        Ok(Arc::clone(profile))
    }

    fn base_scale(&self, profile: &SpeciesProfile, is_juvenile: bool) -> f64 {
        let overrides = self.config.mobs.override_for(&profile.kind);
        let adult = overrides
            .and_then(|entry| entry.custom_scale)
            .unwrap_or(profile.nominal_scale_factor);
        let realistic = &self.config.realistic;
        if !(is_juvenile && realistic.baby_scaling) {
            return adult;
        }
        let juvenile_factor = overrides
            .and_then(|entry| entry.custom_baby_scale)
            .unwrap_or_else(|| derive_juvenile_factor(profile.reference_height_m));
        adult * juvenile_factor * realistic.baby_scale_multiplier
    }

    fn finish(
        &self,
        proposal: ProposedScale,
        suppressed: bool,
    ) -> Result<ResolvedScale, InvalidResultError> {
        let ProposedScale {
            profile,
            scale_factor,
            is_juvenile,
            ..
        } = proposal;
        ensure_finite(&profile.kind, "final_scale_factor", scale_factor)?;
        // A before-hook may have swapped in a profile the table would reject.
        ensure_positive(&profile.kind, "reference_height_m", profile.reference_height_m)?;
        ensure_positive(&profile.kind, "nominal_scale_factor", profile.nominal_scale_factor)?;

        if suppressed {
            return Ok(ResolvedScale {
                final_scale_factor: 0.0,
                health_multiplier: 1.0,
                damage_multiplier: 1.0,
                speed_multiplier: 1.0,
                source_profile: profile,
                is_juvenile,
                cancelled: true,
            });
        }

        let final_scale_factor = self.config.bounds.clamp(scale_factor);
        let size_ratio = final_scale_factor / profile.nominal_scale_factor;
        let realistic = &self.config.realistic;

        let health_multiplier = if realistic.realistic_health {
            let base = self
                .config
                .mobs
                .override_for(&profile.kind)
                .and_then(|entry| entry.custom_health)
                .unwrap_or_else(|| derive_health(profile.reference_height_m));
            base * size_ratio * realistic.global_health_multiplier
        } else {
            1.0
        };
        let damage_multiplier = if realistic.realistic_damage {
            derive_damage(profile.reference_height_m) * size_ratio
        } else {
            1.0
        };
        let speed_multiplier = if realistic.realistic_speed {
            let bonus = if is_juvenile { JUVENILE_SPEED_BONUS } else { 1.0 };
            profile.speed_multiplier * bonus
        } else {
            1.0
        };

        ensure_finite(&profile.kind, "health_multiplier", health_multiplier)?;
        ensure_finite(&profile.kind, "damage_multiplier", damage_multiplier)?;
        ensure_finite(&profile.kind, "speed_multiplier", speed_multiplier)?;

        Ok(ResolvedScale {
            final_scale_factor,
            health_multiplier,
            damage_multiplier,
            speed_multiplier,
            source_profile: profile,
            is_juvenile,
            cancelled: false,
        })
    }

    fn publish(&mut self, creature: CreatureId, resolved: &Arc<ResolvedScale>) {
        self.cache.put(creature, Arc::clone(resolved));
        for applier in &mut self.appliers {
            applier.apply(creature, resolved);
        }
        self.hooks.notify_after(creature, resolved);

        if self.config.settings.debug {
            info!(
                creature = creature.0,
                kind = %resolved.source_profile.kind,
                final_scale = resolved.final_scale_factor,
                health = resolved.health_multiplier,
                damage = resolved.damage_multiplier,
                speed = resolved.speed_multiplier,
                juvenile = resolved.is_juvenile,
                cancelled = resolved.cancelled,
                "scale_applied"
            );
        } else {
            debug!(
                creature = creature.0,
                kind = %resolved.source_profile.kind,
                final_scale = resolved.final_scale_factor,
                cancelled = resolved.cancelled,
                "scale_applied"
            );
        }
    }
}

fn ensure_positive(kind: &str, field: &'static str, value: f64) -> Result<(), InvalidResultError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(InvalidResultError {
            kind: kind.to_string(),
            field,
            value,
        })
    }
}

fn ensure_finite(kind: &str, field: &'static str, value: f64) -> Result<(), InvalidResultError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(InvalidResultError {
            kind: kind.to_string(),
            field,
            value,
        })
    }
}

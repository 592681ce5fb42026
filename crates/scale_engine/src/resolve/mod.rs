mod context;
mod engine;
mod hooks;
mod outcome;

pub use context::{CreatureId, CreatureView, LifeStage, Position, RegionSelector};
pub use engine::{AttributeApplier, ScaleEngine};
pub use hooks::{
    AfterResolveHook, BeforeResolveHook, ConfigReload, ConfigReloadHook, HookDecision,
    ProposedScale,
};
pub use outcome::{
    AttributeAdjustments, InvalidResultError, Outcome, ResolveSummary, ResolvedScale, SkipReason,
};

use std::sync::Arc;

use crate::preferences::ObserverId;
use crate::species::SpeciesProfile;

use super::context::CreatureId;
use super::outcome::ResolvedScale;

/// Scale as computed before any external adjustment. Before-resolve hooks
/// may hand back a modified copy or veto it outright.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedScale {
    pub creature: CreatureId,
    pub observer: Option<ObserverId>,
    pub profile: Arc<SpeciesProfile>,
    pub scale_factor: f64,
    pub is_juvenile: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HookDecision {
    Proceed(ProposedScale),
    Veto { reason: String },
}

/// Emitted after configuration is swapped in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigReload {
    pub source: String,
    pub changed_sections: Vec<&'static str>,
}

pub type BeforeResolveHook = dyn Fn(ProposedScale) -> HookDecision + Send + Sync;
pub type AfterResolveHook = dyn Fn(CreatureId, &ResolvedScale) + Send + Sync;
pub type ConfigReloadHook = dyn Fn(&ConfigReload) + Send + Sync;

#[derive(Default)]
pub(crate) struct HookRegistry {
    before: Vec<Box<BeforeResolveHook>>,
    after: Vec<Box<AfterResolveHook>>,
    reload: Vec<Box<ConfigReloadHook>>,
}

impl HookRegistry {
    pub(crate) fn push_before(&mut self, hook: Box<BeforeResolveHook>) {
        self.before.push(hook);
    }

    pub(crate) fn push_after(&mut self, hook: Box<AfterResolveHook>) {
        self.after.push(hook);
    }

    pub(crate) fn push_reload(&mut self, hook: Box<ConfigReloadHook>) {
        self.reload.push(hook);
    }

    /// Hooks run in registration order; the first veto stops the chain.
    pub(crate) fn run_before(&self, proposal: ProposedScale) -> HookDecision {
        let mut current = proposal;
        for hook in &self.before {
            match hook(current) {
                HookDecision::Proceed(next) => current = next,
                veto @ HookDecision::Veto { .. } => return veto,
            }
        }
        HookDecision::Proceed(current)
    }

    pub(crate) fn notify_after(&self, creature: CreatureId, scale: &ResolvedScale) {
        for hook in &self.after {
            hook(creature, scale);
        }
    }

    pub(crate) fn notify_reload(&self, event: &ConfigReload) {
        for hook in &self.reload {
            hook(event);
        }
    }

    pub(crate) fn len(&self) -> (usize, usize, usize) {
        (self.before.len(), self.after.len(), self.reload.len())
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (before, after, reload) = self.len();
        f.debug_struct("HookRegistry")
            .field("before", &before)
            .field("after", &after)
            .field("reload", &reload)
            .finish()
    }
}

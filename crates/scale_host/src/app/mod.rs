pub(crate) mod attributes;
pub(crate) mod bootstrap;
pub(crate) mod loop_runner;
pub(crate) mod spawn_queue;
pub(crate) mod visual_sync;
pub(crate) mod world;

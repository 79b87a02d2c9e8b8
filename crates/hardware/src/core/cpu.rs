//! Per-core front-end context.
//!
//! A `Core` bundles every piece of private state the front end keeps for one
//! simulated core: the decoupled front end (FTQ, recovery and stall state)
//! and the fusion unit. Nothing here is shared between cores.

use crate::common::CoreId;
use crate::config::Config;
use crate::core::pipeline::DecoupledFrontend;
use crate::core::units::fusion::FusionUnit;
use crate::stats;

/// Front-end state of one simulated core.
#[derive(Debug)]
pub struct Core {
    /// Identifier of this core.
    pub id: CoreId,
    /// Decoupled front end (FTQ, fill loop, recovery).
    pub frontend: DecoupledFrontend,
    /// Memory micro-op fusion unit.
    pub fusion: FusionUnit,
}

impl Core {
    /// Creates the front-end state of core `id`.
    pub fn new(id: CoreId, config: &Config) -> Self {
        Self {
            id,
            frontend: DecoupledFrontend::new(id, config),
            fusion: FusionUnit::new(id, &config.fusion),
        }
    }

    /// Prints the requested statistics sections of this core.
    ///
    /// See [`stats::STATS_SECTIONS`]; an empty slice prints everything.
    pub fn print_stats(&self, sections: &[String]) {
        stats::print_sections(
            self.id.index(),
            self.frontend.stats(),
            self.fusion.stats(),
            sections,
        );
    }
}

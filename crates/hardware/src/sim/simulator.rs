//! Simulator: owns the cores, the op pool and both collaborators side by side.
//!
//! Keeping the pool and collaborators next to the per-core state lets every
//! front-end call borrow exactly what it needs, with the active core passed
//! explicitly.

use tracing::info;

use crate::common::{ConfigError, CoreId, FrontendError, Result};
use crate::config::Config;
use crate::core::Core;
use crate::core::op::{Op, OpHandle, OpPool};
use crate::core::pipeline::{BranchPredictor, Frontend, RecoveryInfo};
use crate::core::units::fusion::FusionOutcome;

/// Top-level simulator: per-core front ends plus shared collaborators.
#[derive(Debug)]
pub struct Simulator<F, B> {
    cores: Vec<Core>,
    pool: OpPool,
    frontend: F,
    bp: B,
    cycle: u64,
}

impl<F: Frontend, B: BranchPredictor> Simulator<F, B> {
    /// Creates a simulator with `config.general.num_cores` idle cores.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found by [`Config::validate`].
    pub fn new(config: &Config, frontend: F, bp: B) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let cores = (0..config.general.num_cores)
            .map(|id| Core::new(CoreId::new(id), config))
            .collect();
        info!(
            cores = config.general.num_cores,
            ftq_capacity = config.ftq.initial_capacity,
            sizing = ?config.ftq.sizing.mode,
            "front end initialised"
        );
        Ok(Self {
            cores,
            pool: OpPool::with_capacity(config.general.num_cores * config.ftq.max_capacity * 8),
            frontend,
            bp,
            cycle: 0,
        })
    }

    /// Advances every core by one clock cycle, in core-id order.
    ///
    /// # Errors
    ///
    /// Propagates the first fatal [`FrontendError`]; the run must stop.
    pub fn tick(&mut self) -> Result<()> {
        self.cycle += 1;
        for core in &mut self.cores {
            let _ = core
                .frontend
                .tick(self.cycle, &mut self.frontend, &mut self.bp, &mut self.pool)?;
        }
        Ok(())
    }

    /// Recovers `core` from a misprediction.
    ///
    /// # Errors
    ///
    /// [`FrontendError::UnknownCore`] or any recovery error.
    pub fn recover(&mut self, core: CoreId, info: &RecoveryInfo) -> Result<()> {
        let cycle = self.cycle;
        let c = Self::slot(&mut self.cores, core)?;
        c.frontend.recover(cycle, info, &mut self.frontend, &mut self.pool)
    }

    /// Hands the next op of `core` to the instruction cache stage.
    ///
    /// # Errors
    ///
    /// [`FrontendError::UnknownCore`] or any drain error.
    pub fn fetch_op(&mut self, core: CoreId) -> Result<Option<(OpHandle, bool)>> {
        let c = Self::slot(&mut self.cores, core)?;
        c.frontend.fetch_op(&mut self.pool)
    }

    /// Gives back the op most recently fetched on `core`.
    ///
    /// # Errors
    ///
    /// [`FrontendError::UnknownCore`] or [`FrontendError::ReturnOutOfOrder`].
    pub fn return_op(&mut self, core: CoreId, handle: OpHandle) -> Result<()> {
        let c = Self::slot(&mut self.cores, core)?;
        c.frontend.return_op(&self.pool, handle)
    }

    /// Retires a fetched op: runs it through the fusion unit, releases any
    /// fetch stall it holds, notifies the Frontend and frees it.
    ///
    /// # Errors
    ///
    /// [`FrontendError::UnknownCore`] or [`FrontendError::StaleOpHandle`].
    pub fn retire(&mut self, handle: OpHandle) -> Result<Option<FusionOutcome>> {
        let op = self
            .pool
            .get(handle)
            .ok_or(FrontendError::StaleOpHandle(handle.0))?;
        let c = Self::slot(&mut self.cores, op.core)?;
        let outcome = c.fusion.on_commit(op);
        c.frontend.retire(op, &mut self.frontend);
        self.pool.free(handle)?;
        Ok(outcome)
    }

    /// Latches fresh sizing feedback on `core`.
    ///
    /// # Errors
    ///
    /// [`FrontendError::UnknownCore`].
    pub fn set_feedback(&mut self, core: CoreId, utility: f64, timeliness: f64) -> Result<()> {
        Self::slot(&mut self.cores, core)?.frontend.set_feedback(utility, timeliness);
        Ok(())
    }

    /// Address of the next op the instruction cache stage of `core` will see.
    ///
    /// # Errors
    ///
    /// [`FrontendError::UnknownCore`].
    pub fn next_fetch_addr(&self, core: CoreId) -> Result<u64> {
        Ok(self.core(core)?.frontend.next_fetch_addr(&self.frontend, &self.pool))
    }

    /// Front-end state of `core`.
    ///
    /// # Errors
    ///
    /// [`FrontendError::UnknownCore`].
    pub fn core(&self, core: CoreId) -> Result<&Core> {
        self.cores.get(core.index()).ok_or(FrontendError::UnknownCore(core))
    }

    /// Mutable front-end state of `core`, for iterator consumers.
    ///
    /// # Errors
    ///
    /// [`FrontendError::UnknownCore`].
    pub fn core_mut(&mut self, core: CoreId) -> Result<&mut Core> {
        Self::slot(&mut self.cores, core)
    }

    /// All cores, in id order.
    pub fn cores(&self) -> &[Core] {
        &self.cores
    }

    /// The op behind `handle`, if live.
    pub fn op(&self, handle: OpHandle) -> Option<&Op> {
        self.pool.get(handle)
    }

    /// The op pool.
    pub const fn pool(&self) -> &OpPool {
        &self.pool
    }

    /// The Frontend collaborator.
    pub const fn frontend(&self) -> &F {
        &self.frontend
    }

    /// The branch predictor collaborator.
    pub const fn branch_predictor(&self) -> &B {
        &self.bp
    }

    /// Mutable access to the branch predictor collaborator.
    pub fn branch_predictor_mut(&mut self) -> &mut B {
        &mut self.bp
    }

    /// Cycles simulated so far.
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Prints the requested statistics sections of every core.
    pub fn print_stats(&self, sections: &[String]) {
        for core in &self.cores {
            core.print_stats(sections);
        }
    }

    fn slot(cores: &mut [Core], core: CoreId) -> Result<&mut Core> {
        cores.get_mut(core.index()).ok_or(FrontendError::UnknownCore(core))
    }
}

//! Run statistics collection and the end-of-run report.
//!
//! This module counts what the controller did over a run and prints the
//! shutdown report:
//! 1. **SLA:** Per-tier violation percentages, queried from the simulator.
//! 2. **Energy:** Total cluster energy consumed.
//! 3. **Work:** Tasks seen and completed, migrations, wake and shutdown
//!    requests, warnings received, stale queue entries dropped.

use std::time::Instant;

use crate::common::{SlaClass, Time};
use crate::sim::Simulator;

/// Counters accumulated over a controller run.
#[derive(Clone, Debug)]
pub struct RunStats {
    start_time: Instant,
    /// Tasks delivered by arrival events.
    pub tasks_arrived: u64,
    /// Tasks delivered by completion events.
    pub tasks_completed: u64,
    /// Migrations the controller issued.
    pub migrations_started: u64,
    /// Migration completion events received.
    pub migrations_completed: u64,
    /// Wake transitions requested.
    pub wake_requests: u64,
    /// Shutdown/sleep transitions requested.
    pub shutdown_requests: u64,
    /// SLA warnings received.
    pub sla_warnings: u64,
    /// Memory warnings received.
    pub memory_warnings: u64,
    /// Wake-queue entries dropped because they no longer applied.
    pub stale_entries_dropped: u64,
}

impl Default for RunStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            tasks_arrived: 0,
            tasks_completed: 0,
            migrations_started: 0,
            migrations_completed: 0,
            wake_requests: 0,
            shutdown_requests: 0,
            sla_warnings: 0,
            memory_warnings: 0,
            stale_entries_dropped: 0,
        }
    }
}

impl RunStats {
    /// Creates a fresh counter set; the wall clock starts now.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prints the end-of-run report to stdout.
    ///
    /// `now` is the simulated time of the completion event, in microseconds.
    pub fn report(&self, sim: &dyn Simulator, now: Time) {
        let host_seconds = self.start_time.elapsed().as_secs_f64();
        let sim_seconds = now as f64 / 1_000_000.0;

        println!("\n==========================================================");
        println!("PLACEMENT CONTROLLER RUN REPORT");
        println!("==========================================================");
        for sla in SlaClass::ALL {
            println!("sla.violations.{sla}      {:.2} %", sim.sla_report(sla));
        }
        println!("----------------------------------------------------------");
        println!("cluster.energy           {}", sim.cluster_energy());
        println!("sim_seconds              {sim_seconds:.4} s");
        println!("host_seconds             {host_seconds:.4} s");
        println!("----------------------------------------------------------");
        println!("tasks.arrived            {}", self.tasks_arrived);
        println!("tasks.completed          {}", self.tasks_completed);
        println!("migrations.started       {}", self.migrations_started);
        println!("migrations.completed     {}", self.migrations_completed);
        println!("power.wake_requests      {}", self.wake_requests);
        println!("power.shutdown_requests  {}", self.shutdown_requests);
        println!("warnings.sla             {}", self.sla_warnings);
        println!("warnings.memory          {}", self.memory_warnings);
        println!("queue.stale_dropped      {}", self.stale_entries_dropped);
        println!("==========================================================");
    }
}

//! Emulator engine
//!
//! Owns the user arena, one resource grid per direction and the worker
//! pool, and runs the TTI loop:
//!
//! ```text
//! For each TTI t (now = t · 1 ms):
//! 1. User round (one job per user, both directions):
//!    step accumulators → release due data → generate traffic → ingest captures
//! 2. Grid round (one job per direction):
//!    every resource unit picks a user and delivers a grant to its link
//! 3. Advance time
//! ```
//!
//! Each user's downlink and uplink pipelines sit behind separate mutexes,
//! so the two grid jobs of a round never touch the same lock. Every random
//! stream is derived from the master seed per user and direction, which
//! makes a run identical whatever the number of worker threads.
//!
//! # Example
//!
//! ```
//! use ran_emulator_core::orchestrator::{Emulator, EmulatorConfig, UserConfig};
//!
//! let config = EmulatorConfig {
//!     worker_threads: 0,
//!     users: vec![UserConfig::default(); 3],
//!     ..EmulatorConfig::default()
//! };
//! let mut emulator = Emulator::from_config(config).unwrap();
//!
//! for _ in 0..20 {
//!     let result = emulator.tick();
//!     assert!(result.downlink.grid.grants <= emulator.grid_layout(result.downlink.direction).unit_count);
//! }
//! assert_eq!(emulator.current_tti(), 20);
//! ```

use crate::channel::{ChannelOracle, StaticChannel};
use crate::core::{TimeManager, TTI_SECONDS};
use crate::link::{
    capture_channel, BlerTable, CaptureError, CaptureHandle, HarqErrorModel, LinkContext, LinkPipeline,
    LinkProfile, LinkStats, StatsWindow,
};
use crate::models::Direction;
use crate::orchestrator::config::{ConfigError, EmulatorConfig};
use crate::policy::{MetricInfo, MetricWeights};
use crate::rng::derive_seed;
use crate::scheduler::{
    CandidateInfo, Grant, GridError, GridReport, LinkDirectory, ResourceGrid, SchedulingView,
};
use crate::threading::{PoolError, WorkerPool, Workload};
use crate::traffic::TrafficGenerator;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

/// Random streams reserved per user: DL link, UL link, traffic
const STREAMS_PER_USER: u64 = 3;

#[derive(Debug, Error)]
pub enum EmulatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("grid construction failed: {0}")]
    Grid(#[from] GridError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("user {0} not found")]
    UserNotFound(usize),

    #[error("cannot attach capture: {0}")]
    Capture(#[from] CaptureError),
}

// ============================================================================
// Tick Results
// ============================================================================

/// Per-direction outcome of one TTI
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionTick {
    pub direction: Direction,
    pub grid: GridReport,
    /// Synthetic bits admitted to the packet buffers
    pub generated_bits: u64,
    /// Synthetic bits refused by full buffers
    pub rejected_bits: u64,
    /// Bits released downstream
    pub released_bits: u64,
    /// Captured packets admitted
    pub captured_packets: usize,
}

impl DirectionTick {
    fn empty(direction: Direction) -> Self {
        Self {
            direction,
            grid: GridReport::default(),
            generated_bits: 0,
            rejected_bits: 0,
            released_bits: 0,
            captured_packets: 0,
        }
    }

    fn absorb(&mut self, user: &UserTick) {
        self.generated_bits += user.generated_bits;
        self.rejected_bits += user.rejected_bits;
        self.released_bits += user.released_bits;
        self.captured_packets += user.captured_packets;
    }
}

/// Result of [`Emulator::tick`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickResult {
    pub tti: u64,
    /// Simulation time at the start of the TTI (s)
    pub time_s: f64,
    pub downlink: DirectionTick,
    pub uplink: DirectionTick,
}

/// Static shape of one direction's grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub resource_blocks: u32,
    pub rbg_size: u32,
    pub freq_groups: usize,
    pub time_rows: usize,
    pub symbols_per_row: u32,
    pub unit_count: usize,
    pub resource_elements_per_tti: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct UserTick {
    generated_bits: u64,
    rejected_bits: u64,
    released_bits: u64,
    captured_packets: usize,
}

// ============================================================================
// Shared State
// ============================================================================

/// Work item of the pool; indices refer to the core's collections
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EmulatorJob {
    StepUser { index: usize, now: f64 },
    StepGrid { direction: Direction, now: f64 },
}

struct UserSlot {
    links: [Mutex<LinkPipeline>; 2],
    traffic: Mutex<TrafficGenerator>,
    weights: MetricWeights,
    ticks: [Mutex<UserTick>; 2],
}

/// State shared between the coordinator and the workers
pub struct EmulatorCore {
    users: Vec<UserSlot>,
    grids: [Mutex<ResourceGrid>; 2],
    grid_reports: [Mutex<GridReport>; 2],
    channel: Arc<dyn ChannelOracle>,
    tti_seconds: f64,
}

impl EmulatorCore {
    fn step_user(&self, index: usize, now: f64) {
        let Some(user) = self.users.get(index) else {
            return;
        };
        for direction in Direction::ALL {
            let mut link = user.links[direction.index()].lock();
            let mut tick = UserTick::default();

            link.step(now);
            tick.released_bits = link.release();

            let (bits, pkt_size) = {
                let mut traffic = user.traffic.lock();
                (traffic.generate(direction, self.tti_seconds), traffic.packet_size_bits())
            };
            if bits > 0 {
                match link.generate(bits, pkt_size) {
                    Ok(_) => tick.generated_bits = bits,
                    Err(err) => {
                        log::debug!("user {index} {direction}: {err}");
                        tick.rejected_bits = bits;
                    }
                }
            }
            tick.captured_packets = link.ingest_captured();

            *user.ticks[direction.index()].lock() = tick;
        }
    }

    fn step_grid(&self, direction: Direction, now: f64) {
        let mut directory = GridDirectory {
            core: self,
            direction,
            now,
        };
        let report = self.grids[direction.index()].lock().step(now, &mut directory);
        *self.grid_reports[direction.index()].lock() = report;
    }
}

impl Workload for EmulatorCore {
    type Job = EmulatorJob;

    fn execute(&self, job: EmulatorJob) {
        match job {
            EmulatorJob::StepUser { index, now } => self.step_user(index, now),
            EmulatorJob::StepGrid { direction, now } => self.step_grid(direction, now),
        }
    }
}

/// Scheduling view over one direction of the user arena
struct GridDirectory<'a> {
    core: &'a EmulatorCore,
    direction: Direction,
    now: f64,
}

impl SchedulingView for GridDirectory<'_> {
    fn user_count(&self) -> usize {
        self.core.users.len()
    }

    fn candidate(&self, user: usize, freq: usize, now: f64) -> CandidateInfo {
        let Some(slot) = self.core.users.get(user) else {
            return CandidateInfo::default();
        };
        let state = self.core.channel.observe(user, self.direction, freq, now);
        let link = slot.links[self.direction.index()].lock();
        let oldest = link.oldest_timestamp();
        CandidateInfo {
            has_data: link.has_data(),
            throughput: state.throughput_per_symbol,
            metric: MetricInfo {
                request_time: oldest,
                avg_throughput: link.average_throughput(),
                current_throughput: state.throughput_per_symbol,
                delay: (now - oldest).max(0.0),
                weights: slot.weights,
            },
        }
    }
}

impl LinkDirectory for GridDirectory<'_> {
    fn deliver(&mut self, grant: Grant) -> f64 {
        let Some(slot) = self.core.users.get(grant.user) else {
            return 0.0;
        };
        let state = self.core.channel.observe(grant.user, self.direction, grant.freq, self.now);
        let ctx = LinkContext {
            mcs: state.mcs,
            sinr_db: state.sinr_db,
            distance_m: self.core.channel.distance_m(grant.user, self.now),
        };
        let bits = grant.bits.max(0.0).floor() as u64;
        slot.links[self.direction.index()].lock().handle_grant(bits, ctx) as f64
    }
}

// ============================================================================
// Emulator
// ============================================================================

/// TTI-driven RAN emulator
pub struct Emulator {
    core: Arc<EmulatorCore>,
    pool: WorkerPool<EmulatorCore>,
    time: TimeManager,
}

impl Emulator {
    /// Build the emulator against an external channel oracle
    ///
    /// # Errors
    ///
    /// * [`EmulatorError::Config`] when the configuration fails validation
    /// * [`EmulatorError::Grid`] when a carrier is too narrow for its numerology
    /// * [`EmulatorError::Pool`] when a worker thread cannot be spawned
    pub fn new(config: EmulatorConfig, channel: Arc<dyn ChannelOracle>) -> Result<Self, EmulatorError> {
        config.validate()?;

        let downlink_grid = ResourceGrid::new(Direction::Downlink, &config.grid)?;
        let uplink_grid = ResourceGrid::new(Direction::Uplink, &config.grid)?;

        let model = Arc::new(if config.use_bler_tables {
            HarqErrorModel::Tables(BlerTable::generate())
        } else {
            HarqErrorModel::Flat(config.flat_error_probability)
        });
        let profile = |grid: &ResourceGrid| LinkProfile {
            modulation: config.modulation,
            layers: grid.mimo_layers(),
            rbg_size: grid.rbg_size(),
        };
        let profiles = [profile(&downlink_grid), profile(&uplink_grid)];

        let users = config
            .users
            .iter()
            .enumerate()
            .map(|(index, user)| {
                let base = index as u64 * STREAMS_PER_USER;
                let link = |direction: Direction| {
                    let link_config = match direction {
                        Direction::Downlink => &config.downlink,
                        Direction::Uplink => &config.uplink,
                    };
                    Mutex::new(LinkPipeline::new(
                        direction,
                        link_config,
                        profiles[direction.index()],
                        Arc::clone(&model),
                        derive_seed(config.seed, base + direction.index() as u64),
                    ))
                };
                UserSlot {
                    links: [link(Direction::Downlink), link(Direction::Uplink)],
                    traffic: Mutex::new(TrafficGenerator::new(
                        user.traffic.clone(),
                        derive_seed(config.seed, base + 2),
                    )),
                    weights: user.weights,
                    ticks: [Mutex::new(UserTick::default()), Mutex::new(UserTick::default())],
                }
            })
            .collect::<Vec<_>>();

        log::info!(
            "emulator: {} users, {} worker threads, seed {}",
            users.len(),
            config.worker_threads,
            config.seed
        );

        let core = Arc::new(EmulatorCore {
            users,
            grids: [Mutex::new(downlink_grid), Mutex::new(uplink_grid)],
            grid_reports: [Mutex::new(GridReport::default()), Mutex::new(GridReport::default())],
            channel,
            tti_seconds: TTI_SECONDS,
        });
        let pool = WorkerPool::new(Arc::clone(&core), config.worker_threads)?;

        Ok(Self {
            core,
            pool,
            time: TimeManager::new(TTI_SECONDS),
        })
    }

    /// Build the emulator with a [`StaticChannel`] made of the users' channel entries
    pub fn from_config(config: EmulatorConfig) -> Result<Self, EmulatorError> {
        let channel = StaticChannel::new(config.users.iter().map(|u| u.channel).collect());
        Self::new(config, Arc::new(channel))
    }

    /// Run one TTI
    pub fn tick(&mut self) -> TickResult {
        let now = self.time.now();
        let tti = self.time.current_tti();

        let user_jobs = (0..self.core.users.len())
            .map(|index| EmulatorJob::StepUser { index, now })
            .collect();
        self.pool.run_round(user_jobs);

        let grid_jobs = Direction::ALL
            .iter()
            .map(|&direction| EmulatorJob::StepGrid { direction, now })
            .collect();
        self.pool.run_round(grid_jobs);

        let mut ticks = [
            DirectionTick::empty(Direction::Downlink),
            DirectionTick::empty(Direction::Uplink),
        ];
        for tick in &mut ticks {
            let i = tick.direction.index();
            tick.grid = *self.core.grid_reports[i].lock();
            for user in &self.core.users {
                tick.absorb(&user.ticks[i].lock());
            }
        }

        self.time.advance_tti();
        let [downlink, uplink] = ticks;
        TickResult {
            tti,
            time_s: now,
            downlink,
            uplink,
        }
    }

    /// Run `ttis` TTIs and return every result
    pub fn run(&mut self, ttis: u64) -> Vec<TickResult> {
        (0..ttis).map(|_| self.tick()).collect()
    }

    pub fn current_tti(&self) -> u64 {
        self.time.current_tti()
    }

    /// Simulation time of the next TTI (s)
    pub fn now(&self) -> f64 {
        self.time.now()
    }

    pub fn user_count(&self) -> usize {
        self.core.users.len()
    }

    pub fn worker_threads(&self) -> usize {
        self.pool.threads()
    }

    pub fn grid_layout(&self, direction: Direction) -> GridLayout {
        let grid = self.core.grids[direction.index()].lock();
        GridLayout {
            resource_blocks: grid.resource_blocks(),
            rbg_size: grid.rbg_size(),
            freq_groups: grid.freq_groups(),
            time_rows: grid.time_rows(),
            symbols_per_row: grid.symbols_per_row(),
            unit_count: grid.unit_count(),
            resource_elements_per_tti: grid.resource_elements_per_tti(),
        }
    }

    /// Link statistics of one user and direction
    ///
    /// [`StatsWindow::SinceLastQuery`] resets the windowed accumulators.
    pub fn link_stats(
        &self,
        user: usize,
        direction: Direction,
        window: StatsWindow,
    ) -> Result<LinkStats, EmulatorError> {
        let slot = self.user(user)?;
        let stats = slot.links[direction.index()].lock().stats(window);
        Ok(stats)
    }

    /// Bits waiting in a user's packet buffer
    pub fn buffered_bits(&self, user: usize, direction: Direction) -> Result<u64, EmulatorError> {
        Ok(self.user(user)?.links[direction.index()].lock().buffered_bits())
    }

    /// Feed a user's link from a capture bridge
    ///
    /// The returned handle submits packets and receives their verdicts.
    /// A link configured with [`ReleaseMode::Blocks`](crate::link::ReleaseMode::Blocks) cannot report
    /// verdicts and is refused.
    pub fn attach_capture(
        &self,
        user: usize,
        direction: Direction,
    ) -> Result<CaptureHandle, EmulatorError> {
        let slot = self.user(user)?;
        let (handle, endpoint) = capture_channel();
        slot.links[direction.index()].lock().attach_capture(endpoint)?;
        Ok(handle)
    }

    fn user(&self, user: usize) -> Result<&UserSlot, EmulatorError> {
        self.core.users.get(user).ok_or(EmulatorError::UserNotFound(user))
    }
}

impl std::fmt::Debug for Emulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emulator")
            .field("tti", &self.time.current_tti())
            .field("users", &self.core.users.len())
            .field("worker_threads", &self.pool.threads())
            .finish()
    }
}

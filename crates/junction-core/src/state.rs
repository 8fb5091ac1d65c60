//! Junction state: the aggregate root the scheduler and phase controller
//! mutate.
//!
//! A [`JunctionState`] owns the four lane queues plus the signal,
//! processing and statistics fields of one junction. It is always held
//! behind the controller's mutex; nothing here is synchronized on its own.
//!
//! Queues only grow at the tail ([`JunctionState::enqueue`]) and only
//! shrink at the head ([`JunctionState::dequeue_passed`]), one vehicle at
//! a time, and every dequeue bumps the counters by exactly one.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use chrono::Utc;
use junction_types::{
    ActivityEntry, ActivityKind, JunctionId, JunctionSnapshot, LaneId, LaneSnapshot, SignalState,
    Vehicle, VehicleId,
};

/// Status shown on a fresh or freshly reset junction.
pub const INITIAL_STATUS: &str = "System Idle. Add vehicles to begin.";

/// Status shown when an idle tick finds every queue empty.
pub const IDLE_STATUS: &str = "System Idle. Waiting for vehicles.";

/// Status shown during the yellow interval of a normal episode.
pub const CLEARING_STATUS: &str = "Clearing intersection...";

/// Maximum number of activity entries kept per junction.
pub const ACTIVITY_LOG_CAPACITY: usize = 200;

/// Identity of one service episode.
///
/// `generation` changes on every reset, `episode` on every episode start.
/// A delayed phase step may only touch the state while its ticket is the
/// current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EpisodeTicket {
    /// Reset generation the episode was started in.
    pub generation: u64,
    /// Episode sequence number within the junction.
    pub episode: u64,
}

impl fmt::Display for EpisodeTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}/e{}", self.generation, self.episode)
    }
}

// ---------------------------------------------------------------------------
// Lane queues
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct LaneQueues {
    north: VecDeque<Vehicle>,
    east: VecDeque<Vehicle>,
    south: VecDeque<Vehicle>,
    west: VecDeque<Vehicle>,
}

impl LaneQueues {
    const fn get(&self, lane: LaneId) -> &VecDeque<Vehicle> {
        match lane {
            LaneId::North => &self.north,
            LaneId::East => &self.east,
            LaneId::South => &self.south,
            LaneId::West => &self.west,
        }
    }

    const fn get_mut(&mut self, lane: LaneId) -> &mut VecDeque<Vehicle> {
        match lane {
            LaneId::North => &mut self.north,
            LaneId::East => &mut self.east,
            LaneId::South => &mut self.south,
            LaneId::West => &mut self.west,
        }
    }
}

// ---------------------------------------------------------------------------
// Junction state
// ---------------------------------------------------------------------------

/// Mutable state of one junction.
#[derive(Debug)]
pub struct JunctionState {
    id: JunctionId,
    queues: LaneQueues,
    active_lane: Option<LaneId>,
    signal: SignalState,
    is_processing: bool,
    passing_vehicle: Option<Vehicle>,
    /// Round-robin cursor: the lane served by the last normal episode.
    last_served_lane: Option<LaneId>,
    cleared_lane: Option<(LaneId, EpisodeTicket)>,
    total_cleared: u64,
    emergency_cleared: u64,
    status_message: String,
    generation: u64,
    episode_counter: u64,
    current_episode: Option<EpisodeTicket>,
    activity: VecDeque<ActivityEntry>,
    activity_sequence: u64,
}

impl JunctionState {
    /// Create an idle junction with empty queues.
    pub fn new(id: JunctionId) -> Self {
        Self {
            id,
            queues: LaneQueues::default(),
            active_lane: None,
            signal: SignalState::Red,
            is_processing: false,
            passing_vehicle: None,
            last_served_lane: None,
            cleared_lane: None,
            total_cleared: 0,
            emergency_cleared: 0,
            status_message: INITIAL_STATUS.to_owned(),
            generation: 0,
            episode_counter: 0,
            current_episode: None,
            activity: VecDeque::new(),
            activity_sequence: 0,
        }
    }

    /// Reinitialize in place to the idle, empty form.
    ///
    /// The generation moves forward so every continuation scheduled before
    /// the reset is recognized as stale.
    pub fn reset(&mut self) {
        let generation = self.generation.saturating_add(1);
        let id = self.id.clone();
        *self = Self::new(id);
        self.generation = generation;
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Junction identifier.
    pub const fn id(&self) -> &JunctionId {
        &self.id
    }

    /// Queue of `lane`, head first.
    pub const fn queue(&self, lane: LaneId) -> &VecDeque<Vehicle> {
        self.queues.get(lane)
    }

    /// Number of vehicles waiting in `lane`.
    pub fn queue_len(&self, lane: LaneId) -> usize {
        self.queues.get(lane).len()
    }

    /// Most urgent priority waiting in `lane`; `None` for an empty lane.
    pub fn min_priority(&self, lane: LaneId) -> Option<u8> {
        self.queues.get(lane).iter().map(|v| v.priority).min()
    }

    /// Whether every lane is empty.
    pub fn all_queues_empty(&self) -> bool {
        LaneId::ALL.iter().all(|&lane| self.queues.get(lane).is_empty())
    }

    /// Whether a service episode is in flight.
    pub const fn is_processing(&self) -> bool {
        self.is_processing
    }

    /// Lane currently holding right-of-way.
    pub const fn active_lane(&self) -> Option<LaneId> {
        self.active_lane
    }

    /// Current signal aspect.
    pub const fn signal(&self) -> SignalState {
        self.signal
    }

    /// Vehicle currently crossing.
    pub const fn passing_vehicle(&self) -> Option<&Vehicle> {
        self.passing_vehicle.as_ref()
    }

    /// Lane served by the most recent normal episode.
    pub const fn last_served_lane(&self) -> Option<LaneId> {
        self.last_served_lane
    }

    /// Lane flagged as just cleared by an emergency episode.
    pub fn cleared_lane(&self) -> Option<LaneId> {
        self.cleared_lane.map(|(lane, _)| lane)
    }

    /// Vehicles dequeued since the last reset.
    pub const fn total_vehicles_cleared(&self) -> u64 {
        self.total_cleared
    }

    /// Dequeued vehicles with an emergency priority.
    pub const fn emergency_vehicles_cleared(&self) -> u64 {
        self.emergency_cleared
    }

    /// Current status message.
    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    /// Current reset generation.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Ticket of the episode in flight, if any.
    pub const fn current_episode(&self) -> Option<EpisodeTicket> {
        self.current_episode
    }

    // -----------------------------------------------------------------------
    // Ingestion
    // -----------------------------------------------------------------------

    /// Append `vehicle` to the tail of its lane.
    pub fn enqueue(&mut self, vehicle: Vehicle) {
        let message = format!("{} arrived in {} lane.", vehicle.category, vehicle.lane);
        self.record(
            ActivityKind::VehicleArrived,
            Some(vehicle.lane),
            Some(vehicle.id),
            message,
        );
        self.queues.get_mut(vehicle.lane).push_back(vehicle);
    }

    // -----------------------------------------------------------------------
    // Episode bookkeeping
    // -----------------------------------------------------------------------

    /// Mark the junction busy serving `lane` under green and hand out the
    /// new episode's ticket.
    pub const fn begin_episode(&mut self, lane: LaneId) -> EpisodeTicket {
        self.episode_counter = self.episode_counter.saturating_add(1);
        let ticket = EpisodeTicket {
            generation: self.generation,
            episode: self.episode_counter,
        };
        self.current_episode = Some(ticket);
        self.is_processing = true;
        self.active_lane = Some(lane);
        self.signal = SignalState::Green;
        ticket
    }

    /// Whether `ticket` names the episode in flight.
    pub fn is_current(&self, ticket: EpisodeTicket) -> bool {
        ticket.generation == self.generation && self.current_episode == Some(ticket)
    }

    /// Return to the idle red state.
    pub const fn finish_episode(&mut self) {
        self.signal = SignalState::Red;
        self.active_lane = None;
        self.is_processing = false;
        self.passing_vehicle = None;
        self.current_episode = None;
    }

    /// Set the signal aspect.
    pub const fn set_signal(&mut self, signal: SignalState) {
        self.signal = signal;
    }

    /// Set or clear the vehicle shown as crossing.
    pub const fn set_passing(&mut self, vehicle: Option<Vehicle>) {
        self.passing_vehicle = vehicle;
    }

    /// Move the round-robin cursor to `lane`.
    pub const fn set_last_served(&mut self, lane: LaneId) {
        self.last_served_lane = Some(lane);
    }

    /// Replace the status message. Returns whether it changed.
    pub fn set_status(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        if self.status_message == message {
            return false;
        }
        self.status_message = message;
        true
    }

    /// Remove the head of `lane` if it is the vehicle `expected`.
    ///
    /// On success the counters move by one and the vehicle is returned. A
    /// mismatching or empty head leaves the queue untouched.
    pub fn dequeue_passed(&mut self, lane: LaneId, expected: VehicleId) -> Option<Vehicle> {
        let queue = self.queues.get_mut(lane);
        if queue.front().map(|v| v.id) != Some(expected) {
            return None;
        }
        let vehicle = queue.pop_front()?;
        self.total_cleared = self.total_cleared.saturating_add(1);
        if vehicle.is_emergency() {
            self.emergency_cleared = self.emergency_cleared.saturating_add(1);
        }
        let message = format!("{} from {} lane passed.", vehicle.category, lane);
        self.record(
            ActivityKind::VehiclePassed,
            Some(lane),
            Some(vehicle.id),
            message,
        );
        Some(vehicle)
    }

    /// Flag `lane` as just cleared by the episode `ticket`.
    pub const fn mark_cleared(&mut self, lane: LaneId, ticket: EpisodeTicket) {
        self.cleared_lane = Some((lane, ticket));
    }

    /// Drop the cleared-lane flag if it still belongs to `ticket`.
    pub fn clear_marker(&mut self, ticket: EpisodeTicket) -> bool {
        match self.cleared_lane {
            Some((_, owner)) if owner == ticket && owner.generation == self.generation => {
                self.cleared_lane = None;
                true
            }
            _ => false,
        }
    }

    // -----------------------------------------------------------------------
    // Activity log
    // -----------------------------------------------------------------------

    /// Append an activity entry, dropping the oldest past capacity.
    pub fn record(
        &mut self,
        kind: ActivityKind,
        lane: Option<LaneId>,
        vehicle: Option<VehicleId>,
        message: impl Into<String>,
    ) {
        self.activity_sequence = self.activity_sequence.saturating_add(1);
        if self.activity.len() >= ACTIVITY_LOG_CAPACITY {
            self.activity.pop_front();
        }
        self.activity.push_back(ActivityEntry {
            sequence: self.activity_sequence,
            at: Utc::now(),
            kind,
            lane,
            vehicle,
            message: message.into(),
        });
    }

    /// Activity entries, oldest first.
    pub fn activity(&self) -> Vec<ActivityEntry> {
        self.activity.iter().cloned().collect()
    }

    // -----------------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------------

    /// Read-only copy for display collaborators.
    pub fn snapshot(&self) -> JunctionSnapshot {
        let lanes: BTreeMap<LaneId, LaneSnapshot> = LaneId::ALL
            .iter()
            .map(|&lane| {
                (
                    lane,
                    LaneSnapshot {
                        id: lane,
                        queue: self.queues.get(lane).iter().cloned().collect(),
                    },
                )
            })
            .collect();

        let waiting_emergency = LaneId::ALL
            .iter()
            .flat_map(|&lane| self.queues.get(lane).iter())
            .filter(|v| v.is_emergency())
            .count();

        JunctionSnapshot {
            id: self.id.clone(),
            lanes,
            active_lane: self.active_lane,
            signal_state: self.signal,
            is_processing: self.is_processing,
            passing_vehicle: self.passing_vehicle.clone(),
            last_processed_lane_index: self
                .last_served_lane
                .and_then(|lane| u8::try_from(lane.index()).ok()),
            cleared_lane_id: self.cleared_lane(),
            total_vehicles_cleared: self.total_cleared,
            emergency_vehicles_cleared: self.emergency_cleared,
            waiting_emergency_vehicles: u64::try_from(waiting_emergency).unwrap_or(u64::MAX),
            status_message: self.status_message.clone(),
        }
    }
}

//! Per-junction controller: the serializing unit around one
//! [`JunctionState`].
//!
//! Every mutation of a junction goes through its controller's mutex:
//! vehicle ingestion, scheduler ticks, each phase boundary of an episode,
//! the cleared-lane expiry and reset. Different junctions never share a
//! lock.
//!
//! An episode started by [`JunctionController::tick`] is driven by one
//! spawned task that sleeps between phase boundaries and re-locks the
//! state at each boundary. The lock is never held across a sleep.
//!
//! After every mutation a fresh [`JunctionSnapshot`] is broadcast to
//! subscribers.

use std::sync::Arc;
use std::time::Duration;

use junction_types::{
    ActivityEntry, JunctionId, JunctionSnapshot, LaneId, Vehicle, VehicleCategory, VehicleId,
};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use crate::operator::OperatorState;
use crate::phase::{Advance, Episode, EpisodeKind};
use crate::scheduler::{self, Decision};
use crate::state::{EpisodeTicket, IDLE_STATUS, INITIAL_STATUS, JunctionState};
use crate::timing::PhaseTiming;

/// Capacity of the snapshot broadcast channel.
const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

/// What a scheduler tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Ticks are suppressed by the operator.
    Paused,
    /// An episode was already in flight.
    Busy,
    /// Every queue was empty.
    Idle,
    /// Vehicles wait, but no lane was eligible.
    Waiting,
    /// A full emergency clearance of the lane began.
    EmergencyStarted(LaneId),
    /// A normal single-vehicle episode began on the lane.
    ServiceStarted(LaneId),
}

/// Owns one junction's state and drives its episodes.
#[derive(Debug)]
pub struct JunctionController {
    id: JunctionId,
    state: Mutex<JunctionState>,
    timing: PhaseTiming,
    operator: Arc<OperatorState>,
    tx: broadcast::Sender<JunctionSnapshot>,
}

impl JunctionController {
    /// Create an idle controller for junction `id`.
    pub fn new(id: JunctionId, timing: PhaseTiming, operator: Arc<OperatorState>) -> Self {
        let (tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(JunctionState::new(id.clone())),
            id,
            timing,
            operator,
            tx,
        }
    }

    /// Junction identifier.
    pub const fn id(&self) -> &JunctionId {
        &self.id
    }

    // -----------------------------------------------------------------------
    // Ingestion / Observation
    // -----------------------------------------------------------------------

    /// Admit a vehicle of `category` at the tail of `lane`.
    pub async fn add_vehicle(&self, category: VehicleCategory, lane: LaneId) -> VehicleId {
        let vehicle = Vehicle::new(category, lane);
        let id = vehicle.id;
        let mut state = self.state.lock().await;
        state.enqueue(vehicle);
        debug!(junction = %self.id, %lane, vehicle = %id, %category, "Vehicle admitted");
        self.publish(&state);
        id
    }

    /// Read-only copy of the junction.
    pub async fn snapshot(&self) -> JunctionSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Activity log, oldest first.
    pub async fn activity_log(&self) -> Vec<ActivityEntry> {
        self.state.lock().await.activity()
    }

    /// Receive a snapshot after every mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<JunctionSnapshot> {
        self.tx.subscribe()
    }

    /// Reinitialize the junction. Phase steps scheduled before the reset
    /// find their ticket stale and are discarded.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.reset();
        info!(junction = %self.id, generation = state.generation(), "Junction reset");
        self.publish(&state);
    }

    // -----------------------------------------------------------------------
    // Scheduling
    // -----------------------------------------------------------------------

    /// Run the cycle evaluator once and start an episode if it picks a
    /// lane. Returns without waiting for the episode to finish.
    pub async fn tick(self: &Arc<Self>) -> TickOutcome {
        if self.operator.is_paused() {
            return TickOutcome::Paused;
        }
        let block_size = self.operator.block_size();

        let mut state = self.state.lock().await;
        let (lane, kind) = match scheduler::evaluate(&state, block_size) {
            Decision::Busy => return TickOutcome::Busy,
            Decision::Empty => {
                if state.status_message() != INITIAL_STATUS && state.set_status(IDLE_STATUS) {
                    self.publish(&state);
                }
                return TickOutcome::Idle;
            }
            Decision::NoEligibleLane => return TickOutcome::Waiting,
            Decision::Emergency(lane) => (lane, EpisodeKind::Emergency),
            Decision::Normal(lane) => (lane, EpisodeKind::Normal),
        };

        let speed = self.operator.speed_multiplier();
        let (episode, wait) = match Episode::start(&mut state, lane, kind, &self.timing, speed) {
            Ok(started) => started,
            Err(err) => {
                warn!(junction = %self.id, %lane, %err, "Episode not started");
                return TickOutcome::Waiting;
            }
        };
        info!(
            junction = %self.id,
            %lane,
            kind = ?episode.kind(),
            vehicles = episode.vehicle_count(),
            ticket = %episode.ticket(),
            "Episode started"
        );
        self.publish(&state);
        drop(state);

        let outcome = match episode.kind() {
            EpisodeKind::Emergency => TickOutcome::EmergencyStarted(lane),
            EpisodeKind::Normal => TickOutcome::ServiceStarted(lane),
        };
        tokio::spawn(Arc::clone(self).drive_episode(episode, wait));
        outcome
    }

    /// Sleep between phase boundaries and apply each one under the lock
    /// until the episode finishes or goes stale.
    async fn drive_episode(self: Arc<Self>, mut episode: Episode, mut wait: Duration) {
        loop {
            tokio::time::sleep(wait).await;

            let step = {
                let mut state = self.state.lock().await;
                let speed = self.operator.speed_multiplier();
                let step = episode.advance(&mut state, &self.timing, speed);
                if step.is_ok() {
                    self.publish(&state);
                }
                step
            };

            match step {
                Ok(Advance::Wait(next)) => wait = next,
                Ok(Advance::Finished { cleared_marker }) => {
                    info!(
                        junction = %self.id,
                        lane = %episode.lane(),
                        ticket = %episode.ticket(),
                        "Episode finished"
                    );
                    if cleared_marker {
                        self.expire_cleared_marker(episode.ticket()).await;
                    }
                    return;
                }
                Err(err) => {
                    debug!(junction = %self.id, %err, "Discarding stale phase step");
                    return;
                }
            }
        }
    }

    /// Drop the cleared-lane flag after the fixed display delay, unless a
    /// reset or a later clearance replaced it meanwhile.
    async fn expire_cleared_marker(&self, ticket: EpisodeTicket) {
        tokio::time::sleep(self.timing.cleared_display()).await;
        let mut state = self.state.lock().await;
        if state.clear_marker(ticket) {
            self.publish(&state);
        } else {
            debug!(junction = %self.id, %ticket, "Cleared-lane flag already replaced");
        }
    }

    fn publish(&self, state: &JunctionState) {
        if self.tx.receiver_count() > 0 {
            // Lagging or departed receivers are not an error.
            let _ = self.tx.send(state.snapshot());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use junction_types::SignalState;

    use super::*;
    use crate::config::ControlConfig;

    fn controller() -> Arc<JunctionController> {
        let operator = Arc::new(OperatorState::new(&ControlConfig::default()).unwrap());
        Arc::new(JunctionController::new(
            JunctionId::new("A").unwrap(),
            PhaseTiming::default(),
            operator,
        ))
    }

    async fn advance_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn normal_episode_runs_green_yellow_red() {
        let junction = controller();
        for _ in 0..3 {
            junction.add_vehicle(VehicleCategory::Car, LaneId::North).await;
        }

        assert_eq!(junction.tick().await, TickOutcome::ServiceStarted(LaneId::North));
        let green = junction.snapshot().await;
        assert_eq!(green.signal_state, SignalState::Green);
        assert!(green.is_processing);
        assert_eq!(green.last_processed_lane_index, Some(0));
        assert!(green.passing_vehicle.is_some());

        advance_ms(1000).await;
        assert_eq!(junction.tick().await, TickOutcome::Busy);

        advance_ms(1500).await;
        let yellow = junction.snapshot().await;
        assert_eq!(yellow.signal_state, SignalState::Yellow);
        assert!(yellow.passing_vehicle.is_none());
        assert_eq!(yellow.queue_len(LaneId::North), 3);

        advance_ms(1000).await;
        let red = junction.snapshot().await;
        assert_eq!(red.signal_state, SignalState::Red);
        assert!(!red.is_processing);
        assert_eq!(red.active_lane, None);
        assert_eq!(red.queue_len(LaneId::North), 2);
        assert_eq!(red.total_vehicles_cleared, 1);
        assert_eq!(red.status_message, "Vehicle from North passed.");
    }

    #[tokio::test(start_paused = true)]
    async fn emergency_clearance_excludes_late_arrivals() {
        let junction = controller();
        junction.add_vehicle(VehicleCategory::Car, LaneId::South).await;
        junction.add_vehicle(VehicleCategory::Ambulance, LaneId::South).await;
        junction.add_vehicle(VehicleCategory::Car, LaneId::North).await;

        assert_eq!(junction.tick().await, TickOutcome::EmergencyStarted(LaneId::South));
        let late = junction.add_vehicle(VehicleCategory::Bus, LaneId::South).await;

        // Second captured vehicle passes at 1500, yellow at 3000, red at 4000.
        advance_ms(3500).await;
        let yellow = junction.snapshot().await;
        assert_eq!(yellow.signal_state, SignalState::Yellow);
        assert_eq!(yellow.cleared_lane_id, Some(LaneId::South));

        advance_ms(1000).await;
        let red = junction.snapshot().await;
        assert_eq!(red.signal_state, SignalState::Red);
        assert!(!red.is_processing);
        assert_eq!(red.total_vehicles_cleared, 2);
        assert_eq!(red.emergency_vehicles_cleared, 1);
        assert_eq!(red.status_message, "South lane cleared.");
        let south: Vec<VehicleId> = red
            .lane(LaneId::South)
            .unwrap()
            .queue
            .iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(south, vec![late]);
        assert_eq!(red.last_processed_lane_index, None);
        assert_eq!(red.cleared_lane_id, Some(LaneId::South));

        advance_ms(2000).await;
        assert_eq!(junction.snapshot().await.cleared_lane_id, None);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_discards_in_flight_episode() {
        let junction = controller();
        for _ in 0..3 {
            junction.add_vehicle(VehicleCategory::Car, LaneId::East).await;
        }
        assert_eq!(junction.tick().await, TickOutcome::ServiceStarted(LaneId::East));

        advance_ms(500).await;
        junction.reset().await;
        junction.add_vehicle(VehicleCategory::Car, LaneId::East).await;

        advance_ms(5000).await;
        let after = junction.snapshot().await;
        assert_eq!(after.signal_state, SignalState::Red);
        assert!(!after.is_processing);
        assert_eq!(after.total_vehicles_cleared, 0);
        assert_eq!(after.queue_len(LaneId::East), 1);
        assert_eq!(after.status_message, INITIAL_STATUS);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_discards_pending_cleared_flag() {
        let junction = controller();
        junction.add_vehicle(VehicleCategory::FireTruck, LaneId::West).await;
        assert_eq!(junction.tick().await, TickOutcome::EmergencyStarted(LaneId::West));

        advance_ms(2000).await;
        assert_eq!(junction.snapshot().await.cleared_lane_id, Some(LaneId::West));
        junction.reset().await;
        assert_eq!(junction.snapshot().await.cleared_lane_id, None);

        advance_ms(5000).await;
        let after = junction.snapshot().await;
        assert!(!after.is_processing);
        assert_eq!(after.total_vehicles_cleared, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_tick_starts_nothing() {
        let junction = controller();
        junction.add_vehicle(VehicleCategory::Ambulance, LaneId::North).await;
        junction.operator.pause();
        assert_eq!(junction.tick().await, TickOutcome::Paused);
        assert!(!junction.snapshot().await.is_processing);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_does_not_interrupt_running_episode() {
        let junction = controller();
        junction.add_vehicle(VehicleCategory::Police, LaneId::North).await;
        assert_eq!(junction.tick().await, TickOutcome::ServiceStarted(LaneId::North));
        junction.operator.pause();

        advance_ms(3500).await;
        let after = junction.snapshot().await;
        assert!(!after.is_processing);
        assert_eq!(after.total_vehicles_cleared, 1);
        assert_eq!(after.emergency_vehicles_cleared, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_message_only_after_first_service() {
        let junction = controller();
        assert_eq!(junction.tick().await, TickOutcome::Idle);
        assert_eq!(junction.snapshot().await.status_message, INITIAL_STATUS);

        junction.add_vehicle(VehicleCategory::Police, LaneId::East).await;
        assert_eq!(junction.tick().await, TickOutcome::ServiceStarted(LaneId::East));
        advance_ms(3500).await;

        assert_eq!(junction.tick().await, TickOutcome::Idle);
        assert_eq!(junction.snapshot().await.status_message, IDLE_STATUS);
    }

    #[tokio::test(start_paused = true)]
    async fn speed_change_applies_to_next_delay() {
        let junction = controller();
        junction.add_vehicle(VehicleCategory::Police, LaneId::North).await;
        junction.operator.set_speed_multiplier(2.0).unwrap();
        assert_eq!(junction.tick().await, TickOutcome::ServiceStarted(LaneId::North));

        // 750 + 500 green, then 500 yellow.
        advance_ms(1500).await;
        assert_eq!(junction.snapshot().await.signal_state, SignalState::Yellow);
        advance_ms(500).await;
        assert!(!junction.snapshot().await.is_processing);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_receive_snapshots() {
        let junction = controller();
        let mut rx = junction.subscribe();
        junction.add_vehicle(VehicleCategory::Car, LaneId::North).await;
        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.queue_len(LaneId::North), 1);
    }
}

//! Cycle evaluator: decides, once per tick, whether a junction starts a
//! new service episode and for which lane.
//!
//! Evaluation order:
//!
//! 1. **Guard** -- a busy junction or one with every queue empty does
//!    nothing.
//! 2. **Full clearance** -- if the most urgent waiting vehicle anywhere has
//!    priority at or below [`FULL_CLEARANCE_THRESHOLD`], its lane is drained
//!    completely. Ties go to the first lane in the fixed order.
//! 3. **Eligibility** -- a lane is eligible when it holds an emergency
//!    vehicle (priority at or below [`EMERGENCY_PRIORITY_THRESHOLD`]) or at
//!    least `block_size` vehicles.
//! 4. **Priority** -- eligible lanes sharing the lowest priority value are
//!    the finalists.
//! 5. **Round robin** -- finalists are scanned in the fixed order starting
//!    just after the lane the last normal episode served.
//!
//! [`evaluate`] is pure: it reads the state and returns a [`Decision`].
//! Acting on the decision is the controller's job.

use junction_types::{EMERGENCY_PRIORITY_THRESHOLD, LaneId};

use crate::state::JunctionState;

/// Priority at or below which a waiting vehicle forces a full clearance of
/// its lane (Ambulance and Fire Truck).
pub const FULL_CLEARANCE_THRESHOLD: u8 = 2;

/// Outcome of evaluating one junction on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// An episode is already in flight.
    Busy,
    /// Every queue is empty.
    Empty,
    /// Vehicles wait, but no lane is eligible yet.
    NoEligibleLane,
    /// Drain the whole lane.
    Emergency(LaneId),
    /// Serve the head vehicle of the lane.
    Normal(LaneId),
}

/// Decide what the junction should do on this tick.
pub fn evaluate(state: &JunctionState, block_size: usize) -> Decision {
    if state.is_processing() {
        return Decision::Busy;
    }
    if state.all_queues_empty() {
        return Decision::Empty;
    }

    if let Some(lane) = full_clearance_lane(state) {
        return Decision::Emergency(lane);
    }

    let finalists = finalists(state, block_size);
    round_robin(&finalists, state.last_served_lane())
        .map_or(Decision::NoEligibleLane, Decision::Normal)
}

/// Lane holding the most urgent vehicle, if that vehicle forces a full
/// clearance. The first lane in the fixed order wins ties.
fn full_clearance_lane(state: &JunctionState) -> Option<LaneId> {
    let mut best: Option<(LaneId, u8)> = None;
    for lane in LaneId::ALL {
        let Some(priority) = state.min_priority(lane) else {
            continue;
        };
        if best.is_none_or(|(_, current)| priority < current) {
            best = Some((lane, priority));
        }
    }
    best.filter(|&(_, priority)| priority <= FULL_CLEARANCE_THRESHOLD)
        .map(|(lane, _)| lane)
}

/// Eligible lanes tied at the lowest priority value, in the fixed order.
fn finalists(state: &JunctionState, block_size: usize) -> Vec<LaneId> {
    let eligible: Vec<(LaneId, u8)> = LaneId::ALL
        .into_iter()
        .filter_map(|lane| {
            let priority = state.min_priority(lane)?;
            let has_emergency = priority <= EMERGENCY_PRIORITY_THRESHOLD;
            (has_emergency || state.queue_len(lane) >= block_size).then_some((lane, priority))
        })
        .collect();

    let Some(lowest) = eligible.iter().map(|&(_, priority)| priority).min() else {
        return Vec::new();
    };
    eligible
        .into_iter()
        .filter(|&(_, priority)| priority == lowest)
        .map(|(lane, _)| lane)
        .collect()
}

/// First finalist in the fixed order, scanning from the lane after
/// `last_served` and wrapping once.
fn round_robin(finalists: &[LaneId], last_served: Option<LaneId>) -> Option<LaneId> {
    if let [only] = finalists {
        return Some(*only);
    }
    let start = last_served.map_or(0, |lane| lane.index().saturating_add(1));
    LaneId::ALL
        .iter()
        .cycle()
        .skip(start)
        .take(LaneId::ALL.len())
        .find(|lane| finalists.contains(lane))
        .copied()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use junction_types::{JunctionId, Vehicle, VehicleCategory};

    use super::*;

    fn state() -> JunctionState {
        JunctionState::new(JunctionId::new("A").unwrap())
    }

    fn fill(state: &mut JunctionState, lane: LaneId, categories: &[VehicleCategory]) {
        for &category in categories {
            state.enqueue(Vehicle::new(category, lane));
        }
    }

    const CARS: [VehicleCategory; 3] = [VehicleCategory::Car; 3];

    #[test]
    fn empty_junction_does_nothing() {
        assert_eq!(evaluate(&state(), 3), Decision::Empty);
    }

    #[test]
    fn busy_junction_does_nothing() {
        let mut state = state();
        fill(&mut state, LaneId::North, &[VehicleCategory::Ambulance]);
        let _ = state.begin_episode(LaneId::East);
        assert_eq!(evaluate(&state, 3), Decision::Busy);
    }

    #[test]
    fn ambulance_forces_full_clearance() {
        let mut state = state();
        fill(&mut state, LaneId::North, &CARS);
        fill(&mut state, LaneId::North, &CARS);
        fill(&mut state, LaneId::South, &[VehicleCategory::Car, VehicleCategory::Ambulance]);
        assert_eq!(evaluate(&state, 3), Decision::Emergency(LaneId::South));
    }

    #[test]
    fn fire_truck_forces_full_clearance() {
        let mut state = state();
        fill(&mut state, LaneId::West, &[VehicleCategory::FireTruck]);
        assert_eq!(evaluate(&state, 8), Decision::Emergency(LaneId::West));
    }

    #[test]
    fn most_urgent_lane_wins_clearance() {
        let mut state = state();
        fill(&mut state, LaneId::North, &[VehicleCategory::FireTruck]);
        fill(&mut state, LaneId::West, &[VehicleCategory::Ambulance]);
        assert_eq!(evaluate(&state, 3), Decision::Emergency(LaneId::West));
    }

    #[test]
    fn clearance_ties_use_fixed_order_not_round_robin() {
        let mut state = state();
        fill(&mut state, LaneId::West, &[VehicleCategory::Ambulance]);
        fill(&mut state, LaneId::East, &[VehicleCategory::Ambulance]);
        state.set_last_served(LaneId::North);
        assert_eq!(evaluate(&state, 3), Decision::Emergency(LaneId::East));
        state.set_last_served(LaneId::East);
        assert_eq!(evaluate(&state, 3), Decision::Emergency(LaneId::East));
    }

    #[test]
    fn police_is_eligible_without_clearance() {
        let mut state = state();
        fill(&mut state, LaneId::East, &[VehicleCategory::Police]);
        fill(&mut state, LaneId::North, &CARS);
        assert_eq!(evaluate(&state, 3), Decision::Normal(LaneId::East));
    }

    #[test]
    fn block_size_gates_normal_lanes() {
        let mut state = state();
        fill(&mut state, LaneId::North, &[VehicleCategory::Car, VehicleCategory::Car]);
        assert_eq!(evaluate(&state, 3), Decision::NoEligibleLane);
        fill(&mut state, LaneId::North, &[VehicleCategory::Car]);
        assert_eq!(evaluate(&state, 3), Decision::Normal(LaneId::North));
    }

    #[test]
    fn lower_priority_value_beats_longer_queue() {
        let mut state = state();
        fill(&mut state, LaneId::North, &CARS);
        fill(&mut state, LaneId::North, &CARS);
        fill(
            &mut state,
            LaneId::South,
            &[VehicleCategory::Car, VehicleCategory::Bus, VehicleCategory::Car],
        );
        assert_eq!(evaluate(&state, 3), Decision::Normal(LaneId::South));
    }

    #[test]
    fn round_robin_starts_after_last_served() {
        let mut state = state();
        for lane in LaneId::ALL {
            fill(&mut state, lane, &CARS);
        }
        assert_eq!(evaluate(&state, 3), Decision::Normal(LaneId::North));
        state.set_last_served(LaneId::North);
        assert_eq!(evaluate(&state, 3), Decision::Normal(LaneId::East));
        state.set_last_served(LaneId::South);
        assert_eq!(evaluate(&state, 3), Decision::Normal(LaneId::West));
        state.set_last_served(LaneId::West);
        assert_eq!(evaluate(&state, 3), Decision::Normal(LaneId::North));
    }

    #[test]
    fn round_robin_skips_non_finalists() {
        let mut state = state();
        fill(&mut state, LaneId::North, &CARS);
        fill(&mut state, LaneId::South, &CARS);
        state.set_last_served(LaneId::North);
        assert_eq!(evaluate(&state, 3), Decision::Normal(LaneId::South));
        state.set_last_served(LaneId::South);
        assert_eq!(evaluate(&state, 3), Decision::Normal(LaneId::North));
    }

    #[test]
    fn single_finalist_ignores_cursor() {
        let mut state = state();
        fill(&mut state, LaneId::North, &CARS);
        state.set_last_served(LaneId::North);
        assert_eq!(evaluate(&state, 3), Decision::Normal(LaneId::North));
    }
}

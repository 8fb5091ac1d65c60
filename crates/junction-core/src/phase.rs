//! Phase controller: the timed sub-state sequence of one service episode.
//!
//! An [`Episode`] is an explicit state machine. [`Episode::start`] applies
//! the green step and returns the delay until the next boundary; each call
//! to [`Episode::advance`] applies one boundary and returns either the
//! next delay or [`Advance::Finished`]. The caller owns the sleeping and
//! the locking, so the machine itself is synchronous and testable without
//! a clock.
//!
//! Sequences:
//!
//! - **Emergency**: for every vehicle of the queue captured at start, show
//!   it as passing and dequeue it, then wait one crossing time. After the
//!   last one: yellow, cleared-lane flag, wait the yellow interval, red.
//! - **Normal**: show the head vehicle as passing under green, wait the
//!   crossing time plus the fixed buffer, yellow, wait the yellow
//!   interval, dequeue it and return to red.
//!
//! Every step first checks the episode's [`EpisodeTicket`]. A step that
//! fires after a reset, or after the episode ended, fails with
//! [`PhaseError::StaleEpisode`] without touching the state.

use std::time::Duration;

use junction_types::{ActivityKind, LaneId, SignalState, Vehicle};
use tracing::{debug, warn};

use crate::state::{CLEARING_STATUS, EpisodeTicket, JunctionState};
use crate::timing::PhaseTiming;

/// Errors raised by phase steps.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    /// The step belongs to an episode that is no longer in flight.
    #[error("episode {ticket} is no longer current")]
    StaleEpisode {
        /// Ticket carried by the discarded step.
        ticket: EpisodeTicket,
    },

    /// An episode was requested for a lane with nothing queued.
    #[error("lane {lane} has no vehicle to serve")]
    EmptyLane {
        /// The empty lane.
        lane: LaneId,
    },
}

/// Kind of service episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeKind {
    /// Full clearance of every vehicle queued at start.
    Emergency,
    /// Single-vehicle service of the lane head.
    Normal,
}

/// What the driver should do after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Sleep this long, then advance again.
    Wait(Duration),
    /// The junction is back to red and idle.
    Finished {
        /// Whether a cleared-lane flag was raised and awaits expiry.
        cleared_marker: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Next captured vehicle to pass, by position.
    Clearing { next: usize },
    ClearanceYellow,
    ServiceYellow,
    ServiceDone,
    Done,
}

/// One service episode in flight.
#[derive(Debug, Clone)]
pub struct Episode {
    ticket: EpisodeTicket,
    lane: LaneId,
    kind: EpisodeKind,
    /// Queue captured at start; a normal episode holds only the head.
    vehicles: Vec<Vehicle>,
    step: Step,
}

impl Episode {
    /// Begin an episode on `lane` and apply its green step.
    ///
    /// Returns the episode and the delay until its next boundary. Fails
    /// without mutating the state if the lane is empty.
    pub fn start(
        state: &mut JunctionState,
        lane: LaneId,
        kind: EpisodeKind,
        timing: &PhaseTiming,
        speed: f64,
    ) -> Result<(Self, Duration), PhaseError> {
        let Some(head) = state.queue(lane).front().cloned() else {
            return Err(PhaseError::EmptyLane { lane });
        };
        let ticket = state.begin_episode(lane);

        match kind {
            EpisodeKind::Emergency => {
                let vehicles: Vec<Vehicle> = state.queue(lane).iter().cloned().collect();
                let message = format!("Emergency vehicle detected! Clearing {lane} lane.");
                state.set_status(message.clone());
                state.record(ActivityKind::EmergencyStarted, Some(lane), Some(head.id), message);

                let mut episode = Self {
                    ticket,
                    lane,
                    kind,
                    vehicles,
                    step: Step::Clearing { next: 0 },
                };
                let wait = episode.clear_next(state, timing, speed);
                Ok((episode, wait))
            }
            EpisodeKind::Normal => {
                state.set_last_served(lane);
                let message = format!("Processing {lane} lane. Next up: a {}.", head.category);
                state.set_status(message.clone());
                state.record(ActivityKind::ServiceStarted, Some(lane), Some(head.id), message);
                state.set_passing(Some(head.clone()));

                let episode = Self {
                    ticket,
                    lane,
                    kind,
                    vehicles: vec![head],
                    step: Step::ServiceYellow,
                };
                Ok((episode, timing.service_green(speed)))
            }
        }
    }

    /// Apply the next boundary of the episode.
    pub fn advance(
        &mut self,
        state: &mut JunctionState,
        timing: &PhaseTiming,
        speed: f64,
    ) -> Result<Advance, PhaseError> {
        if !state.is_current(self.ticket) {
            return Err(PhaseError::StaleEpisode {
                ticket: self.ticket,
            });
        }

        match self.step {
            Step::Clearing { .. } => Ok(Advance::Wait(self.clear_next(state, timing, speed))),
            Step::ClearanceYellow => {
                state.finish_episode();
                let message = format!("{} lane cleared.", self.lane);
                state.set_status(message.clone());
                state.record(ActivityKind::LaneCleared, Some(self.lane), None, message);
                self.step = Step::Done;
                Ok(Advance::Finished {
                    cleared_marker: true,
                })
            }
            Step::ServiceYellow => {
                state.set_signal(SignalState::Yellow);
                state.set_passing(None);
                state.set_status(CLEARING_STATUS);
                self.step = Step::ServiceDone;
                Ok(Advance::Wait(timing.yellow_light(speed)))
            }
            Step::ServiceDone => {
                if let Some(vehicle) = self.vehicles.first() {
                    self.pass(state, vehicle);
                }
                state.finish_episode();
                state.set_status(format!("Vehicle from {} passed.", self.lane));
                self.step = Step::Done;
                Ok(Advance::Finished {
                    cleared_marker: false,
                })
            }
            Step::Done => Ok(Advance::Finished {
                cleared_marker: false,
            }),
        }
    }

    /// Ticket identifying this episode.
    pub const fn ticket(&self) -> EpisodeTicket {
        self.ticket
    }

    /// Lane being served.
    pub const fn lane(&self) -> LaneId {
        self.lane
    }

    /// Kind of episode.
    pub const fn kind(&self) -> EpisodeKind {
        self.kind
    }

    /// Number of vehicles this episode will dequeue.
    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    /// Pass the next captured vehicle, or switch to yellow once all have
    /// passed. Returns the delay until the next boundary.
    fn clear_next(
        &mut self,
        state: &mut JunctionState,
        timing: &PhaseTiming,
        speed: f64,
    ) -> Duration {
        let Step::Clearing { next } = self.step else {
            return Duration::ZERO;
        };

        if let Some(vehicle) = self.vehicles.get(next) {
            state.set_passing(Some(vehicle.clone()));
            self.pass(state, vehicle);
            self.step = Step::Clearing {
                next: next.saturating_add(1),
            };
            return timing.vehicle_process(speed);
        }

        state.set_signal(SignalState::Yellow);
        state.set_passing(None);
        state.mark_cleared(self.lane, self.ticket);
        self.step = Step::ClearanceYellow;
        timing.yellow_light(speed)
    }

    /// Dequeue `vehicle` from the head of the lane, leaving the queue alone
    /// if the head is some other vehicle.
    fn pass(&self, state: &mut JunctionState, vehicle: &Vehicle) {
        if state.dequeue_passed(self.lane, vehicle.id).is_some() {
            debug!(
                junction = %state.id(),
                lane = %self.lane,
                vehicle = %vehicle.id,
                category = %vehicle.category,
                "Vehicle passed"
            );
        } else {
            warn!(
                junction = %state.id(),
                lane = %self.lane,
                vehicle = %vehicle.id,
                ticket = %self.ticket,
                "Lane head is not the captured vehicle, skipping dequeue"
            );
        }
    }
}

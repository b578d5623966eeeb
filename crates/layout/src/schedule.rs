//! Event → room → timeslot assignment.
//!
//! # Formulations
//!
//! - **QUBO**: one binary per `(event, room, slot)`, index `(e·R + r)·T + t`.
//!   A one-hot penalty per event (diagonal `−λ₁`, pairwise `+2λ₁`, i.e.
//!   `λ₁(Σx − 1)² − λ₁`), capacity overflow `λ₃(guests − capacity)²`, missing
//!   amenities and over-long events `λ₃` each, preference rewards subtracted
//!   from the diagonal, and `+λ₂` between events sharing a room in
//!   overlapping slots.
//! - **Potts**: one k-ary spin per event choosing a room, uniform negative
//!   coupling between all event pairs, field = preference − room penalties.
//!   Slots are filled afterwards.
//! - **Transport**: entropic optimal transport of guests onto room capacity,
//!   rounded to the heaviest room per event, slots filled afterwards.
//!
//! Whatever the method, the decoded schedule is repaired (conflicts dropped,
//! unassigned events placed greedily) and compared with a greedy baseline; the
//! lower objective wins. The solver never fails: an infeasible instance comes
//! back with `feasible: false` and a list of violations.

use nalgebra::DMatrix;
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};
use venue_core::{
    sinkhorn, solve_potts_sa, solve_qubo_pt, solve_qubo_sa, Error, PottsModel, PtConfig,
    QuboMatrix, Result, SaConfig, SinkhornConfig,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An event to schedule.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventSpec {
    /// Identifier.
    pub id: String,
    /// Expected guests.
    pub guests: u32,
    /// Length in minutes.
    pub duration_minutes: u32,
    /// Preference per room id, typically in `[0, 1]`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub preferences: BTreeMap<String, f64>,
    /// Amenities the room must offer.
    #[cfg_attr(feature = "serde", serde(default))]
    pub required_amenities: Vec<String>,
}

impl EventSpec {
    /// Creates an event with no preferences or requirements.
    pub fn new(id: impl Into<String>, guests: u32, duration_minutes: u32) -> Self {
        Self {
            id: id.into(),
            guests,
            duration_minutes,
            preferences: BTreeMap::new(),
            required_amenities: Vec::new(),
        }
    }

    /// Adds a room preference.
    pub fn with_preference(mut self, room_id: impl Into<String>, score: f64) -> Self {
        self.preferences.insert(room_id.into(), score);
        self
    }

    /// Adds a required amenity.
    pub fn with_amenity(mut self, amenity: impl Into<String>) -> Self {
        self.required_amenities.push(amenity.into());
        self
    }

    fn preference(&self, room: &RoomSpec) -> f64 {
        self.preferences.get(&room.id).copied().unwrap_or(0.0)
    }

    fn missing_amenities<'a>(&'a self, room: &'a RoomSpec) -> impl Iterator<Item = &'a String> {
        self.required_amenities
            .iter()
            .filter(move |a| !room.amenities.contains(a))
    }
}

/// A bookable room.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoomSpec {
    /// Identifier.
    pub id: String,
    /// Guest capacity.
    pub capacity: u32,
    /// Amenities on offer.
    #[cfg_attr(feature = "serde", serde(default))]
    pub amenities: Vec<String>,
}

impl RoomSpec {
    /// Creates a room without amenities.
    pub fn new(id: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            capacity,
            amenities: Vec::new(),
        }
    }

    /// Adds an amenity.
    pub fn with_amenity(mut self, amenity: impl Into<String>) -> Self {
        self.amenities.push(amenity.into());
        self
    }
}

/// A time window, in minutes from midnight of `day`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeslotSpec {
    /// Identifier.
    pub id: String,
    /// Start minute.
    pub start_minute: u32,
    /// End minute.
    pub end_minute: u32,
    /// Day index.
    #[cfg_attr(feature = "serde", serde(default))]
    pub day: u32,
}

impl TimeslotSpec {
    /// Creates a timeslot.
    pub fn new(id: impl Into<String>, day: u32, start_minute: u32, end_minute: u32) -> Self {
        Self {
            id: id.into(),
            start_minute,
            end_minute,
            day,
        }
    }

    /// Length in minutes.
    pub fn duration(&self) -> u32 {
        self.end_minute.saturating_sub(self.start_minute)
    }

    /// Returns true if the two windows share any time.
    pub fn overlaps(&self, other: &TimeslotSpec) -> bool {
        self.day == other.day
            && self.start_minute < other.end_minute
            && other.start_minute < self.end_minute
    }
}

/// Solver used by [`SchedulingSolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SchedulingMethod {
    /// Simulated annealing on the QUBO.
    #[default]
    QuboAnnealing,
    /// Parallel tempering on the QUBO.
    QuboTempering,
    /// Simulated annealing on the Potts room model.
    Potts,
    /// Entropic optimal transport of guests onto rooms.
    Transport,
    /// Greedy placement only.
    Greedy,
}

impl fmt::Display for SchedulingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulingMethod::QuboAnnealing => "qubo_annealing",
            SchedulingMethod::QuboTempering => "qubo_tempering",
            SchedulingMethod::Potts => "potts",
            SchedulingMethod::Transport => "transport",
            SchedulingMethod::Greedy => "greedy",
        };
        f.write_str(name)
    }
}

/// One scheduled event.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventAssignment {
    /// Event id.
    pub event_id: String,
    /// Room id.
    pub room_id: String,
    /// Timeslot id.
    pub timeslot_id: String,
}

/// Outcome of a scheduling run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScheduleResult {
    /// Assigned events; unassigned events are absent.
    pub assignments: Vec<EventAssignment>,
    /// Penalties minus preference rewards (lower is better).
    pub objective: f64,
    /// True when no violation remains.
    pub feasible: bool,
    /// Wall-clock solve time.
    pub solve_time: Duration,
    /// Human-readable constraint violations.
    pub violations: Vec<String>,
    /// Method that was requested.
    pub method: SchedulingMethod,
}

/// Penalty weights shared by every formulation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SchedulingPenalties {
    /// λ₁: exactly one placement per event.
    pub one_hot: f64,
    /// λ₂: two events in one room at overlapping times.
    pub conflict: f64,
    /// λ₃: capacity overflow (squared), missing amenity, over-long event.
    pub capacity: f64,
    /// Multiplier on room preferences.
    pub preference: f64,
}

impl Default for SchedulingPenalties {
    fn default() -> Self {
        Self {
            one_hot: 20.0,
            conflict: 20.0,
            capacity: 5.0,
            preference: 1.0,
        }
    }
}

/// Configuration for [`SchedulingSolver`].
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Solver.
    pub method: SchedulingMethod,
    /// Penalty weights.
    pub penalties: SchedulingPenalties,
    /// Annealing settings for the QUBO and Potts methods.
    pub sa: SaConfig,
    /// Tempering settings for the QUBO method.
    pub pt: PtConfig,
    /// Transport settings.
    pub sinkhorn: SinkhornConfig,
    /// Random seed; overrides the seeds of `sa` and `pt`.
    pub seed: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            method: SchedulingMethod::default(),
            penalties: SchedulingPenalties::default(),
            sa: SaConfig::default()
                .with_initial_temp(20.0)
                .with_final_temp(0.01)
                .with_iterations_per_temp(100)
                .with_max_iterations(20_000),
            pt: PtConfig::default()
                .with_temperature_range(0.05, 20.0)
                .with_sweeps(200),
            sinkhorn: SinkhornConfig::default(),
            seed: 42,
        }
    }
}

impl SchedulerConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the method.
    pub fn with_method(mut self, method: SchedulingMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the penalty weights.
    pub fn with_penalties(mut self, penalties: SchedulingPenalties) -> Self {
        self.penalties = penalties;
        self
    }

    /// Sets the annealing settings.
    pub fn with_sa(mut self, sa: SaConfig) -> Self {
        self.sa = sa;
        self
    }

    /// Sets the tempering settings.
    pub fn with_pt(mut self, pt: PtConfig) -> Self {
        self.pt = pt;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// QUBO variable of `(event, room, slot)`.
pub fn schedule_var(event: usize, room: usize, slot: usize, n_rooms: usize, n_slots: usize) -> usize {
    (event * n_rooms + room) * n_slots + slot
}

/// Placement per event: `(room, slot)` or unassigned.
type Placement = Vec<Option<(usize, usize)>>;

struct Instance<'a> {
    events: &'a [EventSpec],
    rooms: &'a [RoomSpec],
    slots: &'a [TimeslotSpec],
    penalties: SchedulingPenalties,
}

impl<'a> Instance<'a> {
    /// Room-only cost of putting event `e` in room `r`.
    fn room_cost(&self, e: usize, r: usize) -> f64 {
        let (event, room) = (&self.events[e], &self.rooms[r]);
        let mut cost = 0.0;
        if event.guests > room.capacity {
            cost += self.penalties.capacity * f64::from(event.guests - room.capacity).powi(2);
        }
        cost += self.penalties.capacity * event.missing_amenities(room).count() as f64;
        cost - self.penalties.preference * event.preference(room)
    }

    /// Cost of `(e, r, t)` ignoring other events.
    fn unary(&self, e: usize, r: usize, t: usize) -> f64 {
        let mut cost = self.room_cost(e, r);
        if self.events[e].duration_minutes > self.slots[t].duration() {
            cost += self.penalties.capacity;
        }
        cost
    }

    fn clash(&self, a: (usize, usize), b: (usize, usize)) -> bool {
        a.0 == b.0 && self.slots[a.1].overlaps(&self.slots[b.1])
    }

    /// Cost of adding `(e, r, t)` given the other placements.
    fn marginal(&self, e: usize, r: usize, t: usize, placement: &Placement) -> f64 {
        let clashes = placement
            .iter()
            .enumerate()
            .filter(|(o, p)| *o != e && p.is_some_and(|p| self.clash(p, (r, t))))
            .count();
        self.unary(e, r, t) + self.penalties.conflict * clashes as f64
    }

    /// Cheapest `(room, slot)` for `e`, optionally restricted to one room.
    fn best_slot(&self, e: usize, room: Option<usize>, placement: &Placement) -> Option<(usize, usize)> {
        let rooms: Vec<usize> = match room {
            Some(r) => vec![r],
            None => (0..self.rooms.len()).collect(),
        };
        let mut best: Option<((usize, usize), f64)> = None;
        for r in rooms {
            for t in 0..self.slots.len() {
                let cost = self.marginal(e, r, t, placement);
                if best.map_or(true, |(_, c)| cost < c) {
                    best = Some(((r, t), cost));
                }
            }
        }
        best.map(|(p, _)| p)
    }

    fn objective(&self, placement: &Placement) -> f64 {
        let mut total = 0.0;
        for (e, p) in placement.iter().enumerate() {
            match p {
                Some((r, t)) => total += self.unary(e, *r, *t),
                None => total += self.penalties.one_hot,
            }
        }
        for a in 0..placement.len() {
            for b in a + 1..placement.len() {
                if let (Some(pa), Some(pb)) = (placement[a], placement[b]) {
                    if self.clash(pa, pb) {
                        total += self.penalties.conflict;
                    }
                }
            }
        }
        total
    }

    fn violations(&self, placement: &Placement) -> Vec<String> {
        let mut out = Vec::new();
        for (e, p) in placement.iter().enumerate() {
            let event = &self.events[e];
            let Some((r, t)) = *p else {
                out.push(format!("event {} is unassigned", event.id));
                continue;
            };
            let (room, slot) = (&self.rooms[r], &self.slots[t]);
            if event.guests > room.capacity {
                out.push(format!(
                    "event {}: {} guests exceed room {} capacity {}",
                    event.id, event.guests, room.id, room.capacity
                ));
            }
            for amenity in event.missing_amenities(room) {
                out.push(format!("event {}: room {} lacks {}", event.id, room.id, amenity));
            }
            if event.duration_minutes > slot.duration() {
                out.push(format!(
                    "event {}: {} min does not fit timeslot {} ({} min)",
                    event.id,
                    event.duration_minutes,
                    slot.id,
                    slot.duration()
                ));
            }
        }
        for a in 0..placement.len() {
            for b in a + 1..placement.len() {
                if let (Some(pa), Some(pb)) = (placement[a], placement[b]) {
                    if self.clash(pa, pb) {
                        out.push(format!(
                            "events {} and {} overlap in room {}",
                            self.events[a].id, self.events[b].id, self.rooms[pa.0].id
                        ));
                    }
                }
            }
        }
        out
    }

    /// Largest events first, each at its cheapest free placement.
    fn greedy(&self) -> Placement {
        let mut order: Vec<usize> = (0..self.events.len()).collect();
        order.sort_by(|&a, &b| self.events[b].guests.cmp(&self.events[a].guests).then(a.cmp(&b)));
        let mut placement = vec![None; self.events.len()];
        for e in order {
            placement[e] = self.best_slot(e, None, &placement);
        }
        placement
    }

    /// Drops the later event of every clash, then places the unassigned.
    fn repair(&self, mut placement: Placement) -> Placement {
        for a in 0..placement.len() {
            for b in a + 1..placement.len() {
                if let (Some(pa), Some(pb)) = (placement[a], placement[b]) {
                    if self.clash(pa, pb) {
                        placement[b] = None;
                    }
                }
            }
        }
        for e in 0..placement.len() {
            if placement[e].is_none() {
                placement[e] = self.best_slot(e, None, &placement);
            }
        }
        placement
    }

    /// Fills slots for a room-per-event choice.
    fn fill_slots(&self, rooms: &[usize]) -> Placement {
        let mut placement = vec![None; self.events.len()];
        for (e, &r) in rooms.iter().enumerate() {
            placement[e] = self.best_slot(e, Some(r), &placement);
        }
        placement
    }

    fn to_result(
        &self,
        placement: &Placement,
        method: SchedulingMethod,
        started: Instant,
    ) -> ScheduleResult {
        let assignments = placement
            .iter()
            .enumerate()
            .filter_map(|(e, p)| {
                p.map(|(r, t)| EventAssignment {
                    event_id: self.events[e].id.clone(),
                    room_id: self.rooms[r].id.clone(),
                    timeslot_id: self.slots[t].id.clone(),
                })
            })
            .collect();
        let violations = self.violations(placement);
        ScheduleResult {
            assignments,
            objective: self.objective(placement),
            feasible: violations.is_empty(),
            solve_time: started.elapsed(),
            violations,
            method,
        }
    }
}

/// Builds the scheduling QUBO (see the module docs).
pub fn build_scheduling_qubo(
    events: &[EventSpec],
    rooms: &[RoomSpec],
    slots: &[TimeslotSpec],
    penalties: &SchedulingPenalties,
) -> QuboMatrix {
    let instance = Instance {
        events,
        rooms,
        slots,
        penalties: *penalties,
    };
    let (n_rooms, n_slots) = (rooms.len(), slots.len());
    let per_event = n_rooms * n_slots;
    let mut q = QuboMatrix::new(events.len() * per_event);
    let var = |e, r, t| schedule_var(e, r, t, n_rooms, n_slots);

    for e in 0..events.len() {
        let base = e * per_event;
        for a in 0..per_event {
            for b in a + 1..per_event {
                q.add(base + a, base + b, 2.0 * penalties.one_hot);
            }
        }
        for r in 0..n_rooms {
            for t in 0..n_slots {
                let i = var(e, r, t);
                q.add(i, i, -penalties.one_hot + instance.unary(e, r, t));
            }
        }
    }

    for e1 in 0..events.len() {
        for e2 in e1 + 1..events.len() {
            for r in 0..n_rooms {
                for t1 in 0..n_slots {
                    for t2 in 0..n_slots {
                        if slots[t1].overlaps(&slots[t2]) {
                            q.add(var(e1, r, t1), var(e2, r, t2), penalties.conflict);
                        }
                    }
                }
            }
        }
    }
    q
}

/// Builds the room-choice Potts model (see the module docs).
///
/// The pair coupling is `−λ₂ / T`, since `T` slots can host that many events
/// per room before they collide.
pub fn build_potts_scheduling(
    events: &[EventSpec],
    rooms: &[RoomSpec],
    slots: &[TimeslotSpec],
    penalties: &SchedulingPenalties,
) -> PottsModel {
    let instance = Instance {
        events,
        rooms,
        slots,
        penalties: *penalties,
    };
    let mut model = PottsModel::new(events.len(), rooms.len());
    let coupling = -penalties.conflict / slots.len().max(1) as f64;
    for i in 0..events.len() {
        for j in i + 1..events.len() {
            model.set_coupling(i, j, coupling);
        }
        for r in 0..rooms.len() {
            model.set_field(i, r, -instance.room_cost(i, r));
        }
    }
    model
}

/// Checks ids and time windows.
pub fn validate_schedule_input(
    events: &[EventSpec],
    rooms: &[RoomSpec],
    slots: &[TimeslotSpec],
) -> Result<()> {
    fn unique<'a>(kind: &str, ids: impl Iterator<Item = &'a String>) -> Result<()> {
        let mut seen = HashSet::new();
        for id in ids {
            if !seen.insert(id) {
                return Err(Error::InvalidSchedule(format!("duplicate {} id '{}'", kind, id)));
            }
        }
        Ok(())
    }
    unique("event", events.iter().map(|e| &e.id))?;
    unique("room", rooms.iter().map(|r| &r.id))?;
    unique("timeslot", slots.iter().map(|s| &s.id))?;

    if let Some(slot) = slots.iter().find(|s| s.end_minute <= s.start_minute) {
        return Err(Error::InvalidSchedule(format!(
            "timeslot '{}' ends before it starts",
            slot.id
        )));
    }
    if let Some(event) = events.iter().find(|e| e.duration_minutes == 0) {
        return Err(Error::InvalidSchedule(format!(
            "event '{}' has zero duration",
            event.id
        )));
    }
    Ok(())
}

/// Event scheduler.
#[derive(Debug, Clone, Default)]
pub struct SchedulingSolver {
    config: SchedulerConfig,
}

impl SchedulingSolver {
    /// Creates a solver.
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Assigns every event to a room and timeslot.
    pub fn solve(
        &self,
        events: &[EventSpec],
        rooms: &[RoomSpec],
        slots: &[TimeslotSpec],
    ) -> ScheduleResult {
        let started = Instant::now();
        let method = self.config.method;
        let instance = Instance {
            events,
            rooms,
            slots,
            penalties: self.config.penalties,
        };

        if rooms.is_empty() || slots.is_empty() {
            log::warn!(
                "cannot schedule {} events: {} rooms, {} timeslots",
                events.len(),
                rooms.len(),
                slots.len()
            );
            return instance.to_result(&vec![None; events.len()], method, started);
        }

        let candidate = match method {
            SchedulingMethod::QuboAnnealing | SchedulingMethod::QuboTempering => {
                self.solve_qubo(&instance)
            }
            SchedulingMethod::Potts => self.solve_potts(&instance),
            SchedulingMethod::Transport => self.solve_transport(&instance),
            SchedulingMethod::Greedy => instance.greedy(),
        };
        let repaired = instance.repair(candidate);

        let baseline = instance.greedy();
        let (ours, greedy) = (instance.objective(&repaired), instance.objective(&baseline));
        let chosen = if greedy < ours {
            log::debug!("{}: greedy baseline wins ({:.3} < {:.3})", method, greedy, ours);
            baseline
        } else {
            repaired
        };

        let result = instance.to_result(&chosen, method, started);
        log::info!(
            "scheduled {} events with {}: objective {:.3}, feasible {}, {} violations",
            events.len(),
            method,
            result.objective,
            result.feasible,
            result.violations.len()
        );
        result
    }

    fn solve_qubo(&self, instance: &Instance<'_>) -> Placement {
        let q = build_scheduling_qubo(instance.events, instance.rooms, instance.slots, &instance.penalties);
        let bits = match self.config.method {
            SchedulingMethod::QuboTempering => {
                solve_qubo_pt(&q, &self.config.pt.clone().with_seed(self.config.seed)).assignment
            }
            _ => solve_qubo_sa(&q, &self.config.sa.clone().with_seed(self.config.seed)).assignment,
        };

        let (n_rooms, n_slots) = (instance.rooms.len(), instance.slots.len());
        (0..instance.events.len())
            .map(|e| {
                // Several set bits: keep the cheapest.
                let mut best: Option<((usize, usize), f64)> = None;
                for r in 0..n_rooms {
                    for t in 0..n_slots {
                        if bits[schedule_var(e, r, t, n_rooms, n_slots)] {
                            let cost = instance.unary(e, r, t);
                            if best.map_or(true, |(_, c)| cost < c) {
                                best = Some(((r, t), cost));
                            }
                        }
                    }
                }
                best.map(|(p, _)| p)
            })
            .collect()
    }

    fn solve_potts(&self, instance: &Instance<'_>) -> Placement {
        let model =
            build_potts_scheduling(instance.events, instance.rooms, instance.slots, &instance.penalties);
        let labels =
            solve_potts_sa(&model, &self.config.sa.clone().with_seed(self.config.seed)).assignment;
        instance.fill_slots(&labels)
    }

    fn solve_transport(&self, instance: &Instance<'_>) -> Placement {
        let (n_events, n_rooms) = (instance.events.len(), instance.rooms.len());
        if n_events == 0 {
            return Vec::new();
        }
        let supply: Vec<f64> = instance
            .events
            .iter()
            .map(|e| f64::from(e.guests.max(1)))
            .collect();
        let demand: Vec<f64> = instance
            .rooms
            .iter()
            .map(|r| f64::from(r.capacity.max(1)))
            .collect();
        let cost = DMatrix::from_fn(n_events, n_rooms, |e, r| {
            let (event, room) = (&instance.events[e], &instance.rooms[r]);
            let overflow = f64::from(event.guests.saturating_sub(room.capacity));
            overflow / f64::from(event.guests.max(1))
                + event.missing_amenities(room).count() as f64
                - event.preference(room)
        });

        match sinkhorn(&supply, &demand, &cost, &self.config.sinkhorn) {
            Ok(plan) => {
                let rooms: Vec<usize> = (0..n_events)
                    .map(|e| {
                        (0..n_rooms)
                            .max_by(|&a, &b| plan.plan[(e, a)].total_cmp(&plan.plan[(e, b)]).then(b.cmp(&a)))
                            .unwrap_or(0)
                    })
                    .collect();
                instance.fill_slots(&rooms)
            }
            Err(err) => {
                log::warn!("transport relaxation failed ({}); using greedy", err);
                instance.greedy()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn easy() -> (Vec<EventSpec>, Vec<RoomSpec>, Vec<TimeslotSpec>) {
        let events = vec![
            EventSpec::new("keynote", 80, 120),
            EventSpec::new("lunch", 50, 60),
            EventSpec::new("panel", 20, 90),
        ];
        let rooms = vec![RoomSpec::new("hall", 100), RoomSpec::new("salon", 60)];
        let slots = vec![
            TimeslotSpec::new("am", 0, 9 * 60, 12 * 60),
            TimeslotSpec::new("pm", 0, 13 * 60, 16 * 60),
        ];
        (events, rooms, slots)
    }

    #[test]
    fn test_timeslot_overlap() {
        let a = TimeslotSpec::new("a", 0, 540, 720);
        let b = TimeslotSpec::new("b", 0, 700, 800);
        let c = TimeslotSpec::new("c", 0, 720, 800);
        let d = TimeslotSpec::new("d", 1, 540, 720);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(!a.overlaps(&d));
        assert_eq!(a.duration(), 180);
    }

    #[test]
    fn test_qubo_size_and_index() {
        let (events, rooms, slots) = easy();
        let q = build_scheduling_qubo(&events, &rooms, &slots, &SchedulingPenalties::default());
        assert_eq!(q.n(), 12);
        assert_eq!(q.as_slice().len(), 12 * 13 / 2);
        assert_eq!(schedule_var(2, 1, 1, 2, 2), 11);
    }

    #[test]
    fn test_qubo_energy_matches_objective() {
        let (events, rooms, slots) = easy();
        let penalties = SchedulingPenalties::default();
        let q = build_scheduling_qubo(&events, &rooms, &slots, &penalties);
        let instance = Instance {
            events: &events,
            rooms: &rooms,
            slots: &slots,
            penalties,
        };

        // Includes a capacity overflow (keynote in the salon) and a clash.
        let placement: Placement = vec![Some((1, 0)), Some((1, 0)), Some((0, 1))];
        let mut bits = vec![false; q.n()];
        for (e, p) in placement.iter().enumerate() {
            if let Some((r, t)) = p {
                bits[schedule_var(e, *r, *t, 2, 2)] = true;
            }
        }
        let shift = penalties.one_hot * events.len() as f64;
        assert_relative_eq!(q.evaluate(&bits) + shift, instance.objective(&placement), epsilon = 1e-9);
    }

    #[test]
    fn test_one_hot_penalty_shape() {
        let events = vec![EventSpec::new("e", 10, 30)];
        let rooms = vec![RoomSpec::new("r", 100)];
        let slots = vec![
            TimeslotSpec::new("a", 0, 0, 60),
            TimeslotSpec::new("b", 0, 60, 120),
        ];
        let q = build_scheduling_qubo(&events, &rooms, &slots, &SchedulingPenalties::default());
        assert_relative_eq!(q.evaluate(&[false, false]), 0.0);
        assert_relative_eq!(q.evaluate(&[true, false]), -20.0);
        assert_relative_eq!(q.evaluate(&[true, true]), 0.0);
    }

    #[test]
    fn test_potts_model_shape() {
        let (events, rooms, slots) = easy();
        let model = build_potts_scheduling(&events, &rooms, &slots, &SchedulingPenalties::default());
        assert_eq!(model.n(), 3);
        assert_eq!(model.k(), 2);
        assert!(model.coupling(0, 1) < 0.0);
        // Keynote overflows the salon by 20 guests.
        assert!(model.field(0, 1) < model.field(0, 0));
    }

    #[test]
    fn test_every_method_feasible_on_easy_instance() {
        let (events, rooms, slots) = easy();
        for method in [
            SchedulingMethod::QuboAnnealing,
            SchedulingMethod::QuboTempering,
            SchedulingMethod::Potts,
            SchedulingMethod::Transport,
            SchedulingMethod::Greedy,
        ] {
            let solver = SchedulingSolver::new(SchedulerConfig::new().with_method(method).with_seed(3));
            let result = solver.solve(&events, &rooms, &slots);
            assert!(result.feasible, "{}: {:?}", method, result.violations);
            assert_eq!(result.assignments.len(), 3);
            assert_eq!(result.method, method);
        }
    }

    #[test]
    fn test_overflow_flagged_infeasible() {
        let events = vec![EventSpec::new("expo", 500, 60)];
        let rooms = vec![RoomSpec::new("hall", 100)];
        let slots = vec![TimeslotSpec::new("am", 0, 540, 720)];
        let result = SchedulingSolver::default().solve(&events, &rooms, &slots);
        assert!(!result.feasible);
        assert_eq!(result.assignments.len(), 1);
        assert!(result.violations.iter().any(|v| v.contains("exceed")));
    }

    #[test]
    fn test_preference_respected() {
        let events = vec![EventSpec::new("gala", 40, 60).with_preference("terrace", 1.0)];
        let rooms = vec![RoomSpec::new("hall", 100), RoomSpec::new("terrace", 50)];
        let slots = vec![TimeslotSpec::new("eve", 0, 1080, 1320)];
        let result = SchedulingSolver::default().solve(&events, &rooms, &slots);
        assert_eq!(result.assignments[0].room_id, "terrace");
    }

    #[test]
    fn test_amenity_violation_reported() {
        let events = vec![EventSpec::new("film", 30, 60).with_amenity("projector")];
        let rooms = vec![RoomSpec::new("lounge", 40)];
        let slots = vec![TimeslotSpec::new("am", 0, 540, 720)];
        let result = SchedulingSolver::new(SchedulerConfig::new().with_method(SchedulingMethod::Greedy))
            .solve(&events, &rooms, &slots);
        assert!(!result.feasible);
        assert!(result.violations[0].contains("projector"));

        let rooms = vec![RoomSpec::new("lounge", 40), RoomSpec::new("cinema", 40).with_amenity("projector")];
        let result = SchedulingSolver::default().solve(&events, &rooms, &slots);
        assert!(result.feasible);
        assert_eq!(result.assignments[0].room_id, "cinema");
    }

    #[test]
    fn test_no_rooms_is_soft_failure() {
        let (events, _, slots) = easy();
        let result = SchedulingSolver::default().solve(&events, &[], &slots);
        assert!(!result.feasible);
        assert!(result.assignments.is_empty());
        assert_eq!(result.violations.len(), 3);
    }

    #[test]
    fn test_validate_schedule_input() {
        let (events, rooms, slots) = easy();
        assert!(validate_schedule_input(&events, &rooms, &slots).is_ok());
        let dup = vec![RoomSpec::new("hall", 10), RoomSpec::new("hall", 20)];
        assert!(matches!(
            validate_schedule_input(&events, &dup, &slots),
            Err(Error::InvalidSchedule(_))
        ));
        let bad = vec![TimeslotSpec::new("x", 0, 600, 540)];
        assert!(validate_schedule_input(&events, &rooms, &bad).is_err());
    }
}

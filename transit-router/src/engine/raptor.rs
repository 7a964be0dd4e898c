//! Round-based optimal path search over the static timetable.
//!
//! Classic RAPTOR shape: round k holds the best known arrival time per
//! stop using at most k trips. Each round scans every route touching a
//! stop improved in the previous round, boards the earliest catchable
//! trip, and improves arrival labels downstream; walking transfers are
//! relaxed after the route scan. Rounds stop when nothing improves or
//! the round budget is exhausted.
//!
//! One journey is emitted per round that strictly improves the best
//! destination arrival, so the output is the Pareto set of
//! (arrival time, trip count) trade-offs.
//!
//! All stops here are *positions* (indices into the loaded stop array),
//! not persistent stop ids. Translation happens in the adapter.

use tracing::trace;

use super::assets::{RouteRecord, RouteTable};
use crate::domain::Seconds;

const INFINITY: Seconds = Seconds::MAX;

/// One raw leg as reported by the search, in stop positions.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLeg {
    /// Boarding stop position.
    pub from_stop_position: usize,

    /// Alighting stop position.
    pub to_stop_position: usize,

    /// Departure time, seconds since midnight.
    pub departure_time: Seconds,

    /// Arrival time, seconds since midnight.
    pub arrival_time: Seconds,

    /// Route display name. `None` for a walking transfer.
    pub route_name: Option<String>,

    /// Whether this leg is a walking transfer.
    pub is_transfer: bool,

    /// Route direction, when the dataset carries one.
    pub direction: Option<String>,

    /// Positions of the stops served strictly between boarding and
    /// alighting, parallel to `intermediate_arrival_times`.
    pub intermediate_stop_positions: Vec<usize>,

    /// Arrival times at the intermediate stops, parallel to
    /// `intermediate_stop_positions`.
    pub intermediate_arrival_times: Vec<Seconds>,
}

/// A raw journey: ordered raw legs from an origin to a destination.
pub type RawJourney = Vec<RawLeg>;

/// How a stop label was achieved, for journey reconstruction.
#[derive(Debug, Clone)]
enum Parent {
    /// Label copied from the previous round, or never set.
    None,

    /// The stop is a query origin.
    Origin,

    /// Reached by riding a trip.
    Ride {
        route: usize,
        trip: usize,
        board_seq: usize,
        alight_seq: usize,
    },

    /// Reached by a walking transfer within the same round.
    Walk { from: usize, departure: Seconds },
}

/// Per-query label state, bundled so the round steps share one signature.
struct SearchState {
    /// `labels[k][stop]`: best arrival at `stop` using at most k trips.
    labels: Vec<Vec<Seconds>>,

    /// Parallel to `labels`; how each label was achieved.
    parents: Vec<Vec<Parent>>,

    /// Tightest arrival per stop across all rounds, for pruning.
    best: Vec<Seconds>,

    /// Stops improved during the current round.
    marked: Vec<usize>,
}

impl SearchState {
    fn new(stop_count: usize) -> Self {
        Self {
            labels: vec![vec![INFINITY; stop_count]],
            parents: vec![vec![Parent::None; stop_count]],
            best: vec![INFINITY; stop_count],
            marked: Vec::new(),
        }
    }

    fn open_round(&mut self, stop_count: usize) {
        let previous = self.labels.last().cloned().unwrap_or_default();
        self.labels.push(previous);
        self.parents.push(vec![Parent::None; stop_count]);
        self.marked.clear();
    }

    fn improve(&mut self, round: usize, stop: usize, arrival: Seconds, parent: Parent) -> bool {
        if arrival >= self.labels[round][stop] || arrival >= self.best[stop] {
            return false;
        }
        self.labels[round][stop] = arrival;
        self.parents[round][stop] = parent;
        self.best[stop] = arrival;
        if !self.marked.contains(&stop) {
            self.marked.push(stop);
        }
        true
    }
}

/// The searchable network: routes grouped by stop plus the walking
/// transfer adjacency. Built once at initialization and read-only
/// afterwards.
pub struct Network {
    stop_count: usize,
    routes: Vec<RouteRecord>,
    routes_by_stop: Vec<Vec<usize>>,
    transfers_from: Vec<Vec<(usize, Seconds)>>,
}

impl Network {
    /// Build the search structures from a decoded route table.
    ///
    /// `stop_count` is the size of the stop table; the route table must
    /// already be validated against it (see `decode_route_table`).
    pub fn new(stop_count: usize, table: RouteTable) -> Self {
        let mut routes_by_stop = vec![Vec::new(); stop_count];
        for (route_idx, route) in table.routes.iter().enumerate() {
            for &position in &route.stop_positions {
                routes_by_stop[position].push(route_idx);
            }
        }

        let mut transfers_from = vec![Vec::new(); stop_count];
        for transfer in &table.transfers {
            transfers_from[transfer.from_position]
                .push((transfer.to_position, transfer.duration_seconds));
        }

        Self {
            stop_count,
            routes: table.routes,
            routes_by_stop,
            transfers_from,
        }
    }

    /// Number of stops the network was built against.
    pub fn stop_count(&self) -> usize {
        self.stop_count
    }

    /// Compute Pareto-optimal journeys from any origin position to any
    /// destination position, departing at or after `departure`.
    ///
    /// Returns at most one journey per trip count, fewest trips first.
    /// Empty input sets yield an empty result.
    pub fn search(
        &self,
        origins: &[usize],
        destinations: &[usize],
        departure: Seconds,
        max_rounds: usize,
    ) -> Vec<RawJourney> {
        if origins.is_empty() || destinations.is_empty() {
            return Vec::new();
        }

        let mut state = SearchState::new(self.stop_count);
        for &origin in origins {
            if origin < self.stop_count {
                state.improve(0, origin, departure, Parent::Origin);
            }
        }

        // A journey may start with a walk.
        self.relax_transfers(0, &mut state);

        let mut journeys = Vec::new();
        let mut best_destination_arrival = INFINITY;

        if let Some(journey) =
            self.collect_round(0, destinations, &state, &mut best_destination_arrival)
        {
            journeys.push(journey);
        }

        let mut round = 0;
        while !state.marked.is_empty() && round < max_rounds {
            round += 1;
            trace!(round, marked = state.marked.len(), "search round");

            let scan_list = self.routes_touching(&state.marked);
            state.open_round(self.stop_count);

            for (route_idx, first_seq) in scan_list {
                self.scan_route(route_idx, first_seq, round, &mut state);
            }

            self.relax_transfers(round, &mut state);

            if let Some(journey) =
                self.collect_round(round, destinations, &state, &mut best_destination_arrival)
            {
                journeys.push(journey);
            }
        }

        journeys
    }

    /// Routes serving any marked stop, each with the earliest marked
    /// sequence position to start scanning from.
    fn routes_touching(&self, marked: &[usize]) -> Vec<(usize, usize)> {
        let mut first_seq: Vec<Option<usize>> = vec![None; self.routes.len()];

        for &stop in marked {
            for &route_idx in &self.routes_by_stop[stop] {
                let route = &self.routes[route_idx];
                for (seq, &position) in route.stop_positions.iter().enumerate() {
                    if position == stop {
                        let entry = &mut first_seq[route_idx];
                        if entry.is_none_or(|existing| seq < existing) {
                            *entry = Some(seq);
                        }
                    }
                }
            }
        }

        first_seq
            .into_iter()
            .enumerate()
            .filter_map(|(route_idx, seq)| seq.map(|s| (route_idx, s)))
            .collect()
    }

    /// Ride along one route from `first_seq`, boarding the earliest
    /// catchable trip and improving downstream arrival labels.
    fn scan_route(&self, route_idx: usize, first_seq: usize, round: usize, state: &mut SearchState) {
        let route = &self.routes[route_idx];
        let mut onboard: Option<(usize, usize)> = None; // (trip index, board seq)

        for seq in first_seq..route.stop_positions.len() {
            let stop = route.stop_positions[seq];

            if let Some((trip_idx, board_seq)) = onboard {
                let arrival = route.trips[trip_idx].arrivals[seq];
                state.improve(
                    round,
                    stop,
                    arrival,
                    Parent::Ride {
                        route: route_idx,
                        trip: trip_idx,
                        board_seq,
                        alight_seq: seq,
                    },
                );
            }

            // Board here, or switch to an earlier catchable trip, when the
            // previous round reached this stop early enough.
            let reachable_at = state.labels[round - 1][stop];
            if reachable_at == INFINITY {
                continue;
            }
            let catchable = route
                .trips
                .iter()
                .position(|trip| trip.departures[seq] >= reachable_at);
            if let Some(trip_idx) = catchable {
                let earlier = match onboard {
                    Some((current, _)) => trip_idx < current,
                    None => true,
                };
                if earlier {
                    onboard = Some((trip_idx, seq));
                }
            }
        }
    }

    /// Relax walking transfers out of every stop improved this round.
    fn relax_transfers(&self, round: usize, state: &mut SearchState) {
        // Snapshot: a walk never chains onto another walk from this round.
        let sources: Vec<usize> = state.marked.clone();

        for stop in sources {
            let departure = state.labels[round][stop];
            if departure == INFINITY {
                continue;
            }
            for &(to, duration) in &self.transfers_from[stop] {
                let arrival = departure.saturating_add(duration);
                state.improve(round, to, arrival, Parent::Walk { from: stop, departure });
            }
        }
    }

    /// If this round strictly improved the best destination arrival,
    /// reconstruct and return the corresponding journey.
    fn collect_round(
        &self,
        round: usize,
        destinations: &[usize],
        state: &SearchState,
        best_destination_arrival: &mut Seconds,
    ) -> Option<RawJourney> {
        let (stop, arrival) = destinations
            .iter()
            .filter(|&&d| d < self.stop_count)
            .map(|&d| (d, state.labels[round][d]))
            .min_by_key(|&(_, arrival)| arrival)?;

        if arrival >= *best_destination_arrival {
            return None;
        }
        *best_destination_arrival = arrival;

        self.reconstruct(round, stop, state)
    }

    /// Walk the parent chain backwards from `(round, stop)` and emit the
    /// legs in travel order.
    fn reconstruct(&self, round: usize, stop: usize, state: &SearchState) -> Option<RawJourney> {
        let mut legs: Vec<RawLeg> = Vec::new();
        let mut round = round;
        let mut stop = stop;

        loop {
            match &state.parents[round][stop] {
                Parent::Origin => break,
                Parent::None => {
                    // Label copied from an earlier round; step down.
                    if round == 0 {
                        return None;
                    }
                    round -= 1;
                }
                Parent::Walk { from, departure } => {
                    legs.push(RawLeg {
                        from_stop_position: *from,
                        to_stop_position: stop,
                        departure_time: *departure,
                        arrival_time: state.labels[round][stop],
                        route_name: None,
                        is_transfer: true,
                        direction: None,
                        intermediate_stop_positions: Vec::new(),
                        intermediate_arrival_times: Vec::new(),
                    });
                    stop = *from;
                }
                Parent::Ride {
                    route,
                    trip,
                    board_seq,
                    alight_seq,
                } => {
                    let route_record = &self.routes[*route];
                    let trip_record = &route_record.trips[*trip];

                    let between = (*board_seq + 1)..*alight_seq;
                    legs.push(RawLeg {
                        from_stop_position: route_record.stop_positions[*board_seq],
                        to_stop_position: route_record.stop_positions[*alight_seq],
                        departure_time: trip_record.departures[*board_seq],
                        arrival_time: trip_record.arrivals[*alight_seq],
                        route_name: Some(route_record.name.clone()),
                        is_transfer: false,
                        direction: route_record.direction.clone(),
                        intermediate_stop_positions: route_record.stop_positions[between.clone()]
                            .to_vec(),
                        intermediate_arrival_times: trip_record.arrivals[between].to_vec(),
                    });

                    stop = route_record.stop_positions[*board_seq];
                    if round == 0 {
                        return None;
                    }
                    round -= 1;
                }
            }
        }

        legs.reverse();
        Some(legs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::{RouteRecord, TransferRecord, TripRecord};

    fn route(name: &str, stops: Vec<usize>, trips: Vec<(Vec<u32>, Vec<u32>)>) -> RouteRecord {
        RouteRecord {
            name: name.to_string(),
            direction: None,
            stop_positions: stops,
            trips: trips
                .into_iter()
                .map(|(departures, arrivals)| TripRecord {
                    departures,
                    arrivals,
                })
                .collect(),
        }
    }

    fn network(
        stop_count: usize,
        routes: Vec<RouteRecord>,
        transfers: Vec<TransferRecord>,
    ) -> Network {
        Network::new(stop_count, RouteTable { routes, transfers })
    }

    #[test]
    fn direct_single_trip() {
        let net = network(
            2,
            vec![route(
                "A",
                vec![0, 1],
                vec![(vec![28_800, 29_400], vec![28_800, 29_400])],
            )],
            Vec::new(),
        );

        let journeys = net.search(&[0], &[1], 28_800, 6);

        assert_eq!(journeys.len(), 1);
        let leg = &journeys[0][0];
        assert_eq!(leg.from_stop_position, 0);
        assert_eq!(leg.to_stop_position, 1);
        assert_eq!(leg.departure_time, 28_800);
        assert_eq!(leg.arrival_time, 29_400);
        assert_eq!(leg.route_name.as_deref(), Some("A"));
        assert!(!leg.is_transfer);
    }

    #[test]
    fn departure_after_last_trip_finds_nothing() {
        let net = network(
            2,
            vec![route(
                "A",
                vec![0, 1],
                vec![(vec![28_800, 29_400], vec![28_800, 29_400])],
            )],
            Vec::new(),
        );

        assert!(net.search(&[0], &[1], 30_000, 6).is_empty());
    }

    #[test]
    fn empty_inputs_find_nothing() {
        let net = network(
            2,
            vec![route(
                "A",
                vec![0, 1],
                vec![(vec![28_800, 29_400], vec![28_800, 29_400])],
            )],
            Vec::new(),
        );

        assert!(net.search(&[], &[1], 28_800, 6).is_empty());
        assert!(net.search(&[0], &[], 28_800, 6).is_empty());
    }

    #[test]
    fn boards_the_earliest_catchable_trip() {
        let net = network(
            2,
            vec![route(
                "A",
                vec![0, 1],
                vec![
                    (vec![28_000, 28_600], vec![28_000, 28_600]),
                    (vec![28_800, 29_400], vec![28_800, 29_400]),
                    (vec![30_000, 30_600], vec![30_000, 30_600]),
                ],
            )],
            Vec::new(),
        );

        let journeys = net.search(&[0], &[1], 28_100, 6);

        assert_eq!(journeys.len(), 1);
        assert_eq!(journeys[0][0].departure_time, 28_800);
        assert_eq!(journeys[0][0].arrival_time, 29_400);
    }

    #[test]
    fn one_change_at_shared_stop() {
        // Route A: 0 -> 1, route B: 1 -> 2.
        let net = network(
            3,
            vec![
                route(
                    "A",
                    vec![0, 1],
                    vec![(vec![28_800, 29_100], vec![28_800, 29_100])],
                ),
                route(
                    "B",
                    vec![1, 2],
                    vec![(vec![29_400, 29_700], vec![29_400, 29_700])],
                ),
            ],
            Vec::new(),
        );

        let journeys = net.search(&[0], &[2], 28_800, 6);

        assert_eq!(journeys.len(), 1);
        let journey = &journeys[0];
        assert_eq!(journey.len(), 2);
        assert_eq!(journey[0].route_name.as_deref(), Some("A"));
        assert_eq!(journey[1].route_name.as_deref(), Some("B"));
        assert_eq!(journey[1].arrival_time, 29_700);
    }

    #[test]
    fn walking_transfer_becomes_a_transfer_leg() {
        // Route A ends at stop 1; stop 2 is a 2-minute walk away and
        // route B leaves from there.
        let net = network(
            4,
            vec![
                route(
                    "A",
                    vec![0, 1],
                    vec![(vec![28_800, 29_100], vec![28_800, 29_100])],
                ),
                route(
                    "B",
                    vec![2, 3],
                    vec![(vec![29_400, 29_700], vec![29_400, 29_700])],
                ),
            ],
            vec![TransferRecord {
                from_position: 1,
                to_position: 2,
                duration_seconds: 120,
            }],
        );

        let journeys = net.search(&[0], &[3], 28_800, 6);

        assert_eq!(journeys.len(), 1);
        let journey = &journeys[0];
        assert_eq!(journey.len(), 3);

        let walk = &journey[1];
        assert!(walk.is_transfer);
        assert_eq!(walk.route_name, None);
        assert_eq!(walk.from_stop_position, 1);
        assert_eq!(walk.to_stop_position, 2);
        assert_eq!(walk.departure_time, 29_100);
        assert_eq!(walk.arrival_time, 29_220);
    }

    #[test]
    fn pareto_front_direct_versus_faster_change() {
        // Direct route S: 0 -> 2 arriving 30_600.
        // A then B via stop 1 arrives earlier (29_700) with one change.
        let net = network(
            3,
            vec![
                route(
                    "S",
                    vec![0, 2],
                    vec![(vec![28_800, 30_600], vec![28_800, 30_600])],
                ),
                route(
                    "A",
                    vec![0, 1],
                    vec![(vec![28_800, 29_100], vec![28_800, 29_100])],
                ),
                route(
                    "B",
                    vec![1, 2],
                    vec![(vec![29_400, 29_700], vec![29_400, 29_700])],
                ),
            ],
            Vec::new(),
        );

        let journeys = net.search(&[0], &[2], 28_800, 6);

        assert_eq!(journeys.len(), 2);
        // Fewest trips first: the direct journey, then the faster change.
        assert_eq!(journeys[0].len(), 1);
        assert_eq!(journeys[0][0].arrival_time, 30_600);
        assert_eq!(journeys[1].len(), 2);
        assert_eq!(journeys[1][1].arrival_time, 29_700);
    }

    #[test]
    fn intermediate_stops_are_reported_in_order() {
        let net = network(
            4,
            vec![route(
                "T1",
                vec![0, 1, 2, 3],
                vec![(
                    vec![28_800, 28_900, 29_000, 29_100],
                    vec![28_800, 28_890, 28_990, 29_090],
                )],
            )],
            Vec::new(),
        );

        let journeys = net.search(&[0], &[3], 28_800, 6);

        assert_eq!(journeys.len(), 1);
        let leg = &journeys[0][0];
        assert_eq!(leg.intermediate_stop_positions, vec![1, 2]);
        assert_eq!(leg.intermediate_arrival_times, vec![28_890, 28_990]);
    }

    #[test]
    fn multiple_origins_pick_the_better_one() {
        // Origin 1 is served by a faster trip than origin 0.
        let net = network(
            3,
            vec![
                route(
                    "A",
                    vec![0, 2],
                    vec![(vec![29_000, 30_000], vec![29_000, 30_000])],
                ),
                route(
                    "B",
                    vec![1, 2],
                    vec![(vec![28_900, 29_200], vec![28_900, 29_200])],
                ),
            ],
            Vec::new(),
        );

        let journeys = net.search(&[0, 1], &[2], 28_800, 6);

        assert_eq!(journeys.len(), 1);
        assert_eq!(journeys[0][0].from_stop_position, 1);
        assert_eq!(journeys[0][0].arrival_time, 29_200);
    }

    #[test]
    fn round_budget_bounds_transfers() {
        // Reaching stop 3 needs three trips; a budget of two finds none.
        let net = network(
            4,
            vec![
                route("A", vec![0, 1], vec![(vec![100, 200], vec![100, 200])]),
                route("B", vec![1, 2], vec![(vec![300, 400], vec![300, 400])]),
                route("C", vec![2, 3], vec![(vec![500, 600], vec![500, 600])]),
            ],
            Vec::new(),
        );

        assert!(net.search(&[0], &[3], 0, 2).is_empty());
        assert_eq!(net.search(&[0], &[3], 0, 3).len(), 1);
    }

    #[test]
    fn out_of_range_positions_are_ignored() {
        let net = network(
            2,
            vec![route(
                "A",
                vec![0, 1],
                vec![(vec![28_800, 29_400], vec![28_800, 29_400])],
            )],
            Vec::new(),
        );

        let journeys = net.search(&[0, 99], &[1, 42], 28_800, 6);
        assert_eq!(journeys.len(), 1);
    }
}

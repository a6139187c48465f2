//! Property-based tests for the trip session engine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use crate::catalog::{Catalog, Coordinates, Route};
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

const HERE: Coordinates = Coordinates::new(4.53, -75.68);
const TEST_ROUTE: &str = "prop";

fn t(seconds: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 5, 0, 0).unwrap() + Duration::seconds(seconds)
}

fn test_context(base_price: u64) -> TripContext {
    let mut catalog = Catalog::builtin();
    catalog.routes.push(Route {
        id: TEST_ROUTE.to_string(),
        name: "Depot ↔ Terminal".to_string(),
        description: String::new(),
        base_price,
    });
    TripContext::new(Arc::new(catalog))
}

fn started_engine(base_price: u64) -> SessionEngine {
    let mut engine = SessionEngine::new(test_context(base_price), "prop-session");
    engine.set_vehicle("v1").unwrap();
    engine.set_route(TEST_ROUTE).unwrap();
    engine.set_turn("Mañana (5:00 - 13:00)").unwrap();
    engine.start(t(0)).unwrap();
    engine
}

/// Conductor button presses
#[derive(Debug, Clone, Copy)]
enum Press {
    Board,
    Alight,
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_press() -> impl Strategy<Value = Press> {
    prop_oneof![Just(Press::Board), Just(Press::Alight)]
}

fn arb_presses() -> impl Strategy<Value = Vec<Press>> {
    proptest::collection::vec(arb_press(), 0..60)
}

fn arb_field() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), Just("  ".to_string()), "[a-z0-9]{1,8}"]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-z0-9]{0,4}".prop_map(|vehicle_id| Event::SetVehicle { vehicle_id }),
        "[a-z0-9]{0,4}".prop_map(|route_id| Event::SetRoute { route_id }),
        "[a-z ]{0,6}".prop_map(|turn| Event::SetTurn { turn }),
        (0i64..10_000).prop_map(|s| Event::Start { at: t(s) }),
        (0i64..10_000).prop_map(|s| Event::Board {
            at: t(s),
            location: HERE
        }),
        (0i64..10_000).prop_map(|s| Event::Alight {
            at: t(s),
            location: HERE
        }),
        Just(Event::Finish),
        (0i64..10_000, "[a-z]{6}").prop_map(|(s, next_id)| Event::ConfirmClose {
            at: t(s),
            next_id
        }),
    ]
}

fn press(engine: &mut SessionEngine, press: Press, at: DateTime<Utc>) -> Tally {
    match press {
        Press::Board => engine.record_board(at, HERE),
        Press::Alight => engine.record_alight(at, HERE),
    }
    .unwrap()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Onboard count follows boards minus accepted alights and never dips below zero
    #[test]
    fn prop_onboard_matches_model(presses in arb_presses()) {
        let mut engine = started_engine(1);
        let mut expected: u32 = 0;

        for (i, p) in presses.iter().enumerate() {
            let before = engine.event_count();
            let tally = press(&mut engine, *p, t(i as i64));
            match p {
                Press::Board => {
                    expected += 1;
                    prop_assert!(tally.appended);
                }
                Press::Alight if expected == 0 => {
                    prop_assert!(!tally.appended);
                    prop_assert_eq!(engine.event_count(), before);
                }
                Press::Alight => {
                    expected -= 1;
                    prop_assert!(tally.appended);
                }
            }
            prop_assert_eq!(tally.onboard, expected);
            prop_assert_eq!(engine.onboard(), expected);
        }
    }

    // Every logged snapshot equals boards so far minus alights so far
    #[test]
    fn prop_event_log_is_consistent(presses in arb_presses()) {
        let mut engine = started_engine(1);
        for (i, p) in presses.iter().enumerate() {
            press(&mut engine, *p, t(i as i64));
        }

        let session = engine.state().session().unwrap();
        let (mut boards, mut alights) = (0u32, 0u32);
        for event in session.events() {
            match event.kind {
                PassengerEventKind::Board => boards += 1,
                PassengerEventKind::Alight => alights += 1,
            }
            prop_assert!(alights <= boards);
            prop_assert_eq!(event.onboard_count, boards - alights);
        }
    }

    // Fare is boards times base price no matter how many alights happened
    #[test]
    fn prop_total_is_boards_times_fare(presses in arb_presses(), fare in 0u64..50_000) {
        let mut engine = started_engine(fare);
        for (i, p) in presses.iter().enumerate() {
            press(&mut engine, *p, t(i as i64));
        }
        engine.finish().unwrap();
        let closed = engine.confirm_close(t(100_000), "next").unwrap();

        let boards = presses.iter().filter(|p| matches!(p, Press::Board)).count() as u64;
        prop_assert_eq!(closed.board_count() as u64, boards);
        prop_assert_eq!(closed.total_collected(), boards * fare);
    }

    // A closed session ignores every further mutation
    #[test]
    fn prop_closed_session_is_frozen(
        presses in arb_presses(),
        after in arb_presses(),
        refare in 0u64..50_000,
    ) {
        let mut engine = started_engine(2_500);
        for (i, p) in presses.iter().enumerate() {
            press(&mut engine, *p, t(i as i64));
        }
        engine.finish().unwrap();
        let mut closed = engine.confirm_close(t(100_000), "next").unwrap();
        let frozen = closed.clone();

        for (i, p) in after.iter().enumerate() {
            let at = t(200_000 + i as i64);
            match p {
                Press::Board => prop_assert_eq!(closed.board(at, HERE), None),
                Press::Alight => prop_assert_eq!(closed.alight(at, HERE), None),
            }
        }
        prop_assert!(!closed.finalize(refare, t(300_000)));
        prop_assert_eq!(closed, frozen);
    }

    // Start succeeds iff all three configuration fields are non-blank
    #[test]
    fn prop_start_validation(
        vehicle in arb_field(),
        route in arb_field(),
        turn in arb_field(),
    ) {
        let mut engine = SessionEngine::new(test_context(1), "draft");
        engine.set_vehicle(vehicle.clone()).unwrap();
        engine.set_route(route.clone()).unwrap();
        engine.set_turn(turn.clone()).unwrap();
        let before = engine.state().clone();

        let complete = [&vehicle, &route, &turn].iter().all(|f| !f.trim().is_empty());
        match engine.start(t(0)) {
            Ok(()) => {
                prop_assert!(complete);
                prop_assert_eq!(engine.state().phase_name(), "operating");
            }
            Err(TransitionError::MissingConfiguration(fields)) => {
                prop_assert!(!complete);
                prop_assert!(!fields.is_empty());
                prop_assert_eq!(engine.state(), &before);
            }
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }

    // Closing produces a fresh draft with a new id and an empty log
    #[test]
    fn prop_close_resets_to_fresh_draft(presses in arb_presses(), next_id in "[a-z]{4,10}") {
        prop_assume!(next_id != "prop-session");
        let mut engine = started_engine(1);
        for (i, p) in presses.iter().enumerate() {
            press(&mut engine, *p, t(i as i64));
        }
        engine.finish().unwrap();
        let closed = engine.confirm_close(t(100_000), next_id.clone()).unwrap();

        prop_assert_ne!(closed.id(), engine.state().session_id());
        prop_assert_eq!(engine.state(), &TripState::new(next_id));
        prop_assert_eq!(engine.event_count(), 0);
        prop_assert_eq!(engine.onboard(), 0);
    }

    // Rejected events never change the state, accepted ones never shrink the log
    #[test]
    fn prop_random_events_keep_log_append_only(events in proptest::collection::vec(arb_event(), 0..40)) {
        let ctx = test_context(1_000);
        let mut state = TripState::new("draft");

        for event in events {
            let before = state.clone();
            match transition(&state, &ctx, event) {
                Ok(result) => {
                    if let (Some(old), Some(new)) = (before.session(), result.new_state.session()) {
                        prop_assert!(new.events().len() >= old.events().len());
                        prop_assert_eq!(&new.events()[..old.events().len()], old.events());
                    }
                    for effect in &result.effects {
                        if let Effect::PersistSession { session } = effect {
                            let reset = matches!(result.new_state, TripState::Configuring { .. });
                            prop_assert!(session.is_closed());
                            prop_assert!(reset);
                        }
                    }
                    state = result.new_state;
                }
                Err(_) => prop_assert_eq!(&state, &before),
            }
        }
    }
}

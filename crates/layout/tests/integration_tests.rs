//! Integration tests for venue-layout.

use venue_layout::{
    analyze_layout, compute_energy_breakdown, compute_layout_energy, generate_template_layout,
    items_to_state, parse_description, perturb_layout, state_to_items, EventSpec, FurnitureItem,
    FurnitureKind, Layout, LayoutStyle, LayoutWeights, Orchestrator, PipelineConfig,
    PlanRequest, RoomBoundary, RoomSpec, SchedulerConfig, SchedulingMethod, SchedulingSolver,
    TimeslotSpec,
};

fn ballroom() -> RoomBoundary {
    RoomBoundary::rectangle(60.0, 40.0)
        .with_exit(0.0, 20.0, 6.0)
        .with_exit(60.0, 20.0, 6.0)
        .with_exit(30.0, 40.0, 6.0)
}

fn within_room(layout: &Layout, tolerance: f64) -> bool {
    let (w, h) = (layout.room.width, layout.room.height);
    layout.items.iter().all(|item| {
        item.obb().corners().iter().all(|&(x, y)| {
            x >= -tolerance && x <= w + tolerance && y >= -tolerance && y <= h + tolerance
        })
    })
}

mod template_tests {
    use super::*;

    #[test]
    fn test_theater_60x40_capacity_80() {
        let room = ballroom();
        let layout = generate_template_layout(&room, LayoutStyle::Theater, 80, 1);

        let stages: Vec<&FurnitureItem> = layout
            .items
            .iter()
            .filter(|i| i.kind == FurnitureKind::Stage)
            .collect();
        assert_eq!(stages.len(), 1);
        assert!(stages[0].y < 20.0);

        let chairs = layout.count(FurnitureKind::Chair);
        assert!((40..=80).contains(&chairs), "{} chairs", chairs);
        assert!(within_room(&layout, 1.0));
    }

    #[test]
    fn test_banquet_dance_floor_threshold() {
        let room = ballroom();
        let small = generate_template_layout(&room, LayoutStyle::Banquet, 50, 1);
        let large = generate_template_layout(&room, LayoutStyle::Banquet, 51, 1);
        assert_eq!(small.count(FurnitureKind::DanceFloor), 0);
        assert_eq!(large.count(FurnitureKind::DanceFloor), 1);
        assert_eq!(small.count(FurnitureKind::Bar), 1);
        assert!(small.count(FurnitureKind::RoundTable) >= 7);
    }

    #[test]
    fn test_description_drives_style() {
        let parsed = parse_description("Classroom training for 40 attendees");
        assert_eq!(parsed.style, LayoutStyle::Classroom);
        assert_eq!(parsed.capacity, 40);

        let layout = generate_template_layout(&ballroom(), parsed.style, parsed.capacity, 3);
        assert_eq!(layout.count(FurnitureKind::Podium), 1);
        assert!(layout.total_seats() <= 40);
    }

    #[test]
    fn test_template_energy_cached() {
        let room = ballroom();
        let layout = generate_template_layout(&room, LayoutStyle::Boardroom, 12, 9);
        let energy = compute_layout_energy(&layout.items, &room, &LayoutWeights::default(), 12);
        assert!((layout.energy - energy).abs() < 1e-9);
    }
}

mod energy_tests {
    use super::*;

    #[test]
    fn test_energy_non_negative_and_pure() {
        let room = ballroom();
        let layout = generate_template_layout(&room, LayoutStyle::Cocktail, 60, 4);
        let snapshot = layout.clone();
        let weights = LayoutWeights::default();
        let a = compute_layout_energy(&layout.items, &room, &weights, 60);
        let b = compute_layout_energy(&layout.items, &room, &weights, 60);
        assert!(a >= 0.0);
        assert_eq!(a, b);
        assert_eq!(layout, snapshot);
    }

    #[test]
    fn test_breakdown_weighted_total_matches() {
        let room = ballroom();
        let layout = generate_template_layout(&room, LayoutStyle::Banquet, 80, 2);
        let weights = LayoutWeights::default();
        let breakdown = compute_energy_breakdown(&layout.items, &room, 80);
        let total = compute_layout_energy(&layout.items, &room, &weights, 80);
        assert!((breakdown.total(&weights) - total).abs() < 1e-6);
        assert!(breakdown.as_array().iter().all(|t| *t >= 0.0));
    }

    #[test]
    fn test_pile_up_costs_more() {
        let room = ballroom();
        let layout = generate_template_layout(&room, LayoutStyle::Banquet, 40, 2);
        let mut piled = layout.clone();
        for item in &mut piled.items {
            item.x = 30.0;
            item.y = 20.0;
        }
        let weights = LayoutWeights::default();
        let spread = compute_layout_energy(&layout.items, &room, &weights, 40);
        let stacked = compute_layout_energy(&piled.items, &room, &weights, 40);
        assert!(stacked > spread);
    }
}

mod state_tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_state_roundtrip_after_perturbation() {
        let room = ballroom();
        let layout = generate_template_layout(&room, LayoutStyle::UShape, 20, 1);
        let mut rng = StdRng::seed_from_u64(8);
        let moved = perturb_layout(&layout, 2.0, &mut rng);
        let (state, templates) = items_to_state(&moved.items);
        assert_eq!(state.len(), 3 * templates.len());
        assert_eq!(state_to_items(&state, &templates), moved.items);
    }
}

mod schedule_tests {
    use super::*;

    fn conference() -> (Vec<EventSpec>, Vec<RoomSpec>, Vec<TimeslotSpec>) {
        let events = vec![
            EventSpec::new("opening", 150, 60).with_amenity("stage"),
            EventSpec::new("track-a", 60, 90).with_preference("salon-a", 1.0),
            EventSpec::new("track-b", 55, 90).with_preference("salon-b", 1.0),
            EventSpec::new("lunch", 150, 60),
            EventSpec::new("closing", 120, 45).with_amenity("stage"),
        ];
        let rooms = vec![
            RoomSpec::new("ballroom", 200).with_amenity("stage"),
            RoomSpec::new("salon-a", 80),
            RoomSpec::new("salon-b", 80),
        ];
        let slots = vec![
            TimeslotSpec::new("d1-am", 0, 9 * 60, 11 * 60),
            TimeslotSpec::new("d1-mid", 0, 11 * 60, 13 * 60),
            TimeslotSpec::new("d1-pm", 0, 14 * 60, 16 * 60),
        ];
        (events, rooms, slots)
    }

    #[test]
    fn test_conference_feasible_for_every_method() {
        let (events, rooms, slots) = conference();
        for method in [
            SchedulingMethod::QuboAnnealing,
            SchedulingMethod::QuboTempering,
            SchedulingMethod::Potts,
            SchedulingMethod::Transport,
            SchedulingMethod::Greedy,
        ] {
            let result = SchedulingSolver::new(SchedulerConfig::new().with_method(method))
                .solve(&events, &rooms, &slots);
            assert!(result.feasible, "{}: {:?}", method, result.violations);
            assert_eq!(result.assignments.len(), events.len());
        }
    }

    #[test]
    fn test_conference_respects_preferences() {
        let (events, rooms, slots) = conference();
        let result = SchedulingSolver::default().solve(&events, &rooms, &slots);
        let room_of = |id: &str| {
            result
                .assignments
                .iter()
                .find(|a| a.event_id == id)
                .map(|a| a.room_id.clone())
        };
        assert_eq!(room_of("track-a").as_deref(), Some("salon-a"));
        assert_eq!(room_of("track-b").as_deref(), Some("salon-b"));
        assert_eq!(room_of("opening").as_deref(), Some("ballroom"));
    }

    #[test]
    fn test_too_many_events_is_infeasible() {
        let events: Vec<EventSpec> = (0..4).map(|i| EventSpec::new(format!("e{}", i), 10, 60)).collect();
        let rooms = vec![RoomSpec::new("only", 50)];
        let slots = vec![
            TimeslotSpec::new("a", 0, 540, 600),
            TimeslotSpec::new("b", 0, 600, 660),
        ];
        let result = SchedulingSolver::default().solve(&events, &rooms, &slots);
        assert!(!result.feasible);
        assert!(result.violations.iter().any(|v| v.contains("overlap")));
    }
}

mod pipeline_tests {
    use super::*;

    #[test]
    fn test_full_pipeline_smoke() {
        let room = RoomBoundary::rectangle(40.0, 30.0)
            .with_exit(0.0, 15.0, 6.0)
            .with_exit(40.0, 15.0, 6.0);
        let mut request = PlanRequest::new("Banquet dinner for 24 guests", room.clone());
        request.events = vec![EventSpec::new("dinner", 24, 120)];
        request.rooms = vec![RoomSpec::new("main", 40)];
        request.timeslots = vec![TimeslotSpec::new("evening", 0, 18 * 60, 22 * 60)];

        let orchestrator = Orchestrator::new(PipelineConfig::quick().with_seed(11));
        let response = orchestrator
            .run_full_pipeline(&request)
            .expect("valid request");

        assert!(response.schedule.feasible);
        assert_eq!(response.stats.len(), 5);
        assert!(!response.optimized.items.is_empty());
        assert!(response.alternatives.len() <= orchestrator.config().alternatives);
        assert!(!response.pareto.is_empty());
        for item in &response.optimized.items {
            assert!((0.0..=40.0).contains(&item.x));
            assert!((0.0..=30.0).contains(&item.y));
        }

        let initial = orchestrator.generate_initial(&request.description, &room);
        let weights = LayoutWeights::default();
        let before = compute_layout_energy(&initial.items, &room, &weights, 24);
        assert!(response.optimized.energy <= before + 1e-9);
    }

    #[test]
    fn test_invalid_request_rejected() {
        let request = PlanRequest::new("theater", RoomBoundary::new(vec![(0.0, 0.0), (1.0, 0.0)]));
        let orchestrator = Orchestrator::new(PipelineConfig::quick());
        assert!(orchestrator.run_full_pipeline(&request).is_err());
    }

    #[test]
    fn test_analysis_of_generated_layout() {
        let room = ballroom();
        let layout = generate_template_layout(&room, LayoutStyle::Theater, 80, 1);
        let report = analyze_layout(&layout.items, &room);
        assert!(report.coverage > 0.0 && report.coverage <= 1.0);
        assert!(report.connectivity > 0.0 && report.connectivity <= 1.0);
        assert!(report.dead_space_fraction < 1.0);
    }
}

use hikebot_core::{Difficulty, RouteFilters};
use hikebot_trails::{passes_filters, recommend, seed::fixture_routes, RouteCatalog};

fn filter_grid() -> Vec<RouteFilters> {
    let mut grid = Vec::new();
    for difficulty in [None, Some(Difficulty::Easy), Some(Difficulty::Moderate), Some(Difficulty::Hard)] {
        for max_distance_km in [None, Some(12.0), Some(20.0)] {
            for max_drive_time_min in [None, Some(60), Some(150)] {
                for need_water in [false, true] {
                    grid.push(RouteFilters {
                        difficulty,
                        max_distance_km,
                        max_drive_time_min,
                        need_water,
                        limit: Some(20),
                        ..Default::default()
                    });
                }
            }
        }
    }
    grid
}

#[test]
fn recommendations_always_satisfy_hard_filters() {
    let routes = fixture_routes();
    for filters in filter_grid() {
        let recs = recommend(&routes, &filters);
        let expected = routes.iter().filter(|r| passes_filters(r, &filters)).count();
        assert_eq!(recs.len(), expected, "filters: {filters:?}");

        for rec in &recs {
            assert!(passes_filters(&rec.route, &filters));
            assert!(!rec.reasons.is_empty());
            assert_eq!(rec.score, (rec.score * 1000.0).round() / 1000.0);
        }
        for pair in recs.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.score > b.score
                    || (a.score == b.score
                        && (a.route.drive_time_min, &a.route.id) <= (b.route.drive_time_min, &b.route.id))
            );
        }
    }
}

#[test]
fn recommendation_is_deterministic() {
    let catalog = RouteCatalog::fixtures();
    let filters = RouteFilters {
        difficulty: Some(Difficulty::Moderate),
        ..Default::default()
    };
    let first = recommend(catalog.all(), &filters);
    for _ in 0..5 {
        assert_eq!(recommend(catalog.all(), &filters), first);
    }
}

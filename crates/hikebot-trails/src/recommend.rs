//! Route filtering and scoring.
//!
//! Every route starts at a base score of 1.0 and earns or loses points for
//! how well it fits the filters. Hard limits (distance, elevation, drive
//! time, required tags, difficulty two levels away) exclude a route outright.

use hikebot_core::{Route, RouteFilters, RouteRecommendation, RouteTag};
use std::cmp::Ordering;

pub const DEFAULT_LIMIT: usize = 3;
pub const MAX_LIMIT: usize = 20;

const BASE_SCORE: f64 = 1.0;
const DIFFICULTY_MATCH_BONUS: f64 = 0.30;
const DIFFICULTY_NEAR_PENALTY: f64 = 0.20;
const TAG_BONUS: f64 = 0.10;
const DRIVE_WEIGHT: f64 = 0.20;
const DEFAULT_DRIVE_BUDGET_MIN: f64 = 240.0;
const DISTANCE_WEIGHT: f64 = 0.20;
const EXTRA_TAG_BONUS: f64 = 0.05;

/// Whether the route passes every hard limit in `filters`.
pub fn passes_filters(route: &Route, filters: &RouteFilters) -> bool {
    if let Some(max) = filters.max_distance_km {
        if route.distance_km > max {
            return false;
        }
    }
    if let Some(max) = filters.max_elevation_gain_m {
        if route.elevation_gain_m > max {
            return false;
        }
    }
    if let Some(max) = filters.max_drive_time_min {
        if route.drive_time_min > max {
            return false;
        }
    }
    if !filters.required_tags().iter().all(|t| route.has_tag(*t)) {
        return false;
    }
    if let Some(wanted) = filters.difficulty {
        if route.difficulty.steps_from(wanted) > 1 {
            return false;
        }
    }
    true
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Score a route that already passed [`passes_filters`].
pub fn score_route(route: &Route, filters: &RouteFilters) -> (f64, Vec<String>) {
    let mut score = BASE_SCORE;
    let mut reasons = Vec::new();

    if let Some(wanted) = filters.difficulty {
        match route.difficulty.steps_from(wanted) {
            0 => {
                score += DIFFICULTY_MATCH_BONUS;
                reasons.push(format!("Matches your {} difficulty preference", wanted));
            }
            _ => {
                score -= DIFFICULTY_NEAR_PENALTY;
                let direction = if route.difficulty > wanted {
                    "harder"
                } else {
                    "easier"
                };
                reasons.push(format!(
                    "Rated {}, a step {} than requested",
                    route.difficulty, direction
                ));
            }
        }
    }

    for tag in filters.required_tags() {
        score += TAG_BONUS;
        reasons.push(format!("Has the {} feature you asked for", tag.label()));
    }

    let budget = filters
        .max_drive_time_min
        .map(f64::from)
        .filter(|b| *b > 0.0)
        .unwrap_or(DEFAULT_DRIVE_BUDGET_MIN);
    let drive_bonus =
        (DRIVE_WEIGHT * (1.0 - f64::from(route.drive_time_min) / budget)).clamp(0.0, DRIVE_WEIGHT);
    score += drive_bonus;
    reasons.push(format!("About {} min drive", route.drive_time_min));

    if let Some(max) = filters.max_distance_km.filter(|m| *m > 0.0) {
        score += DISTANCE_WEIGHT * (route.distance_km / max).clamp(0.0, 1.0);
        reasons.push(format!(
            "{:.1} km of your {:.1} km distance budget",
            route.distance_km, max
        ));
    }

    let requested = filters.required_tags();
    for bonus in [RouteTag::Loop, RouteTag::Summit] {
        if route.has_tag(bonus) && !requested.contains(&bonus) {
            score += EXTRA_TAG_BONUS;
            reasons.push(match bonus {
                RouteTag::Loop => "Loop route, no car shuttle needed".to_string(),
                _ => "Tops out on a summit".to_string(),
            });
        }
    }

    (round3(score), reasons)
}

fn rank(a: &RouteRecommendation, b: &RouteRecommendation) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.route.drive_time_min.cmp(&b.route.drive_time_min))
        .then_with(|| a.route.id.cmp(&b.route.id))
}

/// Filter, score and rank `routes`, returning at most `filters.limit` results.
pub fn recommend(routes: &[Route], filters: &RouteFilters) -> Vec<RouteRecommendation> {
    let limit = filters
        .limit
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, MAX_LIMIT);

    let mut recs: Vec<RouteRecommendation> = routes
        .iter()
        .filter(|r| passes_filters(r, filters))
        .map(|route| {
            let (score, reasons) = score_route(route, filters);
            RouteRecommendation {
                route: route.clone(),
                score,
                reasons,
            }
        })
        .collect();

    recs.sort_by(rank);
    recs.truncate(limit);
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::fixture_routes;
    use hikebot_core::Difficulty;

    fn ids(recs: &[RouteRecommendation]) -> Vec<&str> {
        recs.iter().map(|r| r.route.id.as_str()).collect()
    }

    #[test]
    fn no_filters_ranks_by_drive_and_bonuses() {
        let recs = recommend(&fixture_routes(), &RouteFilters::default());
        assert_eq!(recs.len(), 3);
        // muir: 1 + 0.2*(1-35/240) + 0.05 loop
        assert_eq!(recs[0].route.id, "muir-woods-coastal");
        assert_eq!(recs[0].score, 1.221);
        assert!(recs.iter().all(|r| !r.reasons.is_empty()));
        assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn hard_limits_exclude_routes() {
        let filters = RouteFilters {
            max_distance_km: Some(16.0),
            max_drive_time_min: Some(120),
            need_dog_friendly: true,
            limit: Some(20),
            ..Default::default()
        };
        let recs = recommend(&fixture_routes(), &filters);
        assert_eq!(ids(&recs), vec!["muir-woods-coastal", "echo-mountain-loop"]);
        for rec in &recs {
            assert!(passes_filters(&rec.route, &filters));
        }
    }

    #[test]
    fn difficulty_two_levels_away_is_excluded() {
        let filters = RouteFilters {
            difficulty: Some(Difficulty::Easy),
            limit: Some(20),
            ..Default::default()
        };
        let recs = recommend(&fixture_routes(), &filters);
        assert!(recs.iter().all(|r| r.route.difficulty != Difficulty::Hard));
        assert_eq!(recs[0].route.id, "muir-woods-coastal");
        // exact match bonus vs one-level penalty
        let echo = recs.iter().find(|r| r.route.id == "echo-mountain-loop").unwrap();
        assert!(echo.score < recs[0].score);
        assert!(echo.reasons.iter().any(|r| r.contains("harder")));
    }

    #[test]
    fn distance_budget_rewards_longer_routes() {
        let filters = RouteFilters {
            max_distance_km: Some(31.0),
            need_water: true,
            ..Default::default()
        };
        let recs = recommend(&fixture_routes(), &filters);
        assert_eq!(ids(&recs), vec!["san-gorgonio-south-fork", "mt-baden-powell"]);
        assert!(recs[0]
            .reasons
            .iter()
            .any(|r| r.contains("water source")));
    }

    #[test]
    fn ties_break_on_drive_time_then_id() {
        let mut a = fixture_routes()[1].clone();
        a.id = "b-route".into();
        a.tags.clear();
        let mut b = a.clone();
        b.id = "a-route".into();
        let mut c = a.clone();
        c.id = "c-route".into();
        c.drive_time_min += 1;

        // identical scores except c drives longer
        let recs = recommend(&[a, b, c], &RouteFilters::default());
        assert_eq!(ids(&recs)[..2], ["a-route", "b-route"]);
    }

    #[test]
    fn limit_is_clamped() {
        let routes = fixture_routes();
        let zero = RouteFilters {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(recommend(&routes, &zero).len(), 1);

        let huge = RouteFilters {
            limit: Some(500),
            ..Default::default()
        };
        assert_eq!(recommend(&routes, &huge).len(), 5);
    }

    #[test]
    fn empty_when_nothing_fits() {
        let filters = RouteFilters {
            max_distance_km: Some(1.0),
            ..Default::default()
        };
        assert!(recommend(&fixture_routes(), &filters).is_empty());
    }
}

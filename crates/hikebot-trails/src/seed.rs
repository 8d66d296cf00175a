//! Built-in route fixtures and seed-file loading.

use hikebot_core::{Difficulty, HikeBotError, Result, Route, RouteTag};
use std::path::Path;

#[allow(clippy::too_many_arguments)]
fn route(
    id: &str,
    name: &str,
    location: &str,
    distance_km: f64,
    elevation_gain_m: u32,
    difficulty: Difficulty,
    drive_time_min: u32,
    tags: &[RouteTag],
    summary: &str,
    coords: (f64, f64),
) -> Route {
    Route {
        id: id.to_string(),
        name: name.to_string(),
        location: location.to_string(),
        distance_km,
        elevation_gain_m,
        difficulty,
        drive_time_min,
        tags: tags.to_vec(),
        summary: Some(summary.to_string()),
        gpx_url: Some(format!("https://example.com/gpx/{id}.gpx")),
        latitude: Some(coords.0),
        longitude: Some(coords.1),
    }
}

/// The five routes served when no other catalog source is available.
pub fn fixture_routes() -> Vec<Route> {
    use Difficulty::*;
    use RouteTag::*;

    vec![
        route(
            "mt-baden-powell",
            "Mount Baden-Powell",
            "Angeles National Forest, CA",
            15.3,
            915,
            Hard,
            110,
            &[Summit, WaterSource],
            "Switchback-heavy climb to a 9,400 ft summit with sweeping desert views.",
            (34.3509, -117.7603),
        ),
        route(
            "echo-mountain-loop",
            "Echo Mountain Loop",
            "San Gabriel Mountains, CA",
            10.1,
            550,
            Moderate,
            45,
            &[Loop, DogFriendly],
            "Well-shaded loop with canyon overlooks and mellow grades.",
            (34.2043, -118.1048),
        ),
        route(
            "san-gorgonio-south-fork",
            "San Gorgonio via South Fork",
            "San Bernardino National Forest, CA",
            30.0,
            1500,
            Hard,
            140,
            &[Camping, WaterSource, Summit],
            "Backpacking classic with reliable creek water and alpine meadows.",
            (34.0981, -116.8256),
        ),
        route(
            "muir-woods-coastal",
            "Muir Woods Coastal Route",
            "Marin County, CA",
            12.5,
            430,
            Easy,
            35,
            &[Loop, DogFriendly],
            "Redwood stroll that pops out to ocean cliffs before looping back.",
            (37.9026, -122.5720),
        ),
        route(
            "donner-ridge-traverse",
            "Donner Ridge Traverse",
            "Lake Tahoe, CA",
            18.7,
            760,
            Moderate,
            210,
            &[Camping, Loop],
            "Roller-coaster ridgeline with granite benches perfect for an overnight.",
            (39.3280, -120.3010),
        ),
    ]
}

/// Pacific Northwest classics used when a chat names a trail the catalog lacks.
pub fn planner_fixtures() -> Vec<Route> {
    use Difficulty::*;
    use RouteTag::*;

    vec![
        route(
            "mailbox-peak",
            "Mailbox Peak",
            "North Bend, WA",
            15.1,
            1219,
            Hard,
            50,
            &[Summit],
            "Relentlessly steep grind to a summit mailbox with big Cascade views.",
            (47.4665, -121.6749),
        ),
        route(
            "rattlesnake-ledge",
            "Rattlesnake Ledge",
            "North Bend, WA",
            6.4,
            353,
            Easy,
            40,
            &[WaterSource],
            "Popular, crowded climb to a rocky ledge above Rattlesnake Lake.",
            (47.4326, -121.7679),
        ),
        route(
            "skyline-trail-rainier",
            "Mount Rainier (Skyline Trail)",
            "Paradise, WA",
            9.0,
            518,
            Hard,
            150,
            &[Loop],
            "Glacier views and wildflower meadows on the flanks of Rainier.",
            (46.7861, -121.7350),
        ),
        route(
            "mount-si",
            "Mount Si",
            "North Bend, WA",
            12.0,
            960,
            Hard,
            40,
            &[Summit],
            "Classic forested climb ending on rocky viewpoints over the valley.",
            (47.4881, -121.7225),
        ),
        route(
            "lake-serene",
            "Lake Serene",
            "Gold Bar, WA",
            13.2,
            610,
            Moderate,
            70,
            &[WaterSource],
            "Waterfall, a long staircase and an alpine lake under Mount Index.",
            (47.7828, -121.5644),
        ),
    ]
}

/// Reads a JSON array of routes.
pub fn load_seed_file(path: &Path) -> Result<Vec<Route>> {
    let content = std::fs::read_to_string(path)?;
    let routes: Vec<Route> = serde_json::from_str(&content)?;
    if routes.is_empty() {
        return Err(HikeBotError::validation(format!(
            "seed file {} contains no routes",
            path.display()
        )));
    }
    Ok(routes)
}

use hikebot_core::{
    AltitudeBand, GearChecklist, GearRequest, HikeBotError, Result, Season, Terrain,
};

const BASE_ITEMS: [&str; 5] = [
    "Backpack",
    "Water",
    "Snacks",
    "Charged phone",
    "First-aid kit",
];

fn season_items(season: Season) -> &'static [&'static str] {
    match season {
        Season::Summer => &["Sun hat", "Sunscreen", "Sunglasses"],
        Season::Winter => &["Insulated jacket", "Warm base layer", "Gloves", "Beanie"],
        Season::Spring | Season::Fall => &["Rain shell", "Light fleece"],
    }
}

fn altitude_items(band: AltitudeBand) -> &'static [&'static str] {
    match band {
        AltitudeBand::High => &["Insulating layer", "Sun protection"],
        AltitudeBand::Mid => &["Wind layer"],
        AltitudeBand::Low => &[],
    }
}

fn terrain_items(terrain: Terrain) -> &'static [&'static str] {
    match terrain {
        Terrain::Snow => &["Microspikes", "Gaiters"],
        Terrain::Mud => &["Gaiters"],
        Terrain::Scramble => &["Helmet", "Grippy gloves"],
        Terrain::Dry => &[],
    }
}

fn push_unique(items: &mut Vec<String>, item: &str) {
    if !items.iter().any(|i| i == item) {
        items.push(item.to_string());
    }
}

/// Build a gear checklist with per-person water and calorie estimates.
pub fn build_checklist(req: &GearRequest) -> Result<GearChecklist> {
    if !req.hours.is_finite() || req.hours <= 0.0 {
        return Err(HikeBotError::validation("hours must be greater than zero"));
    }
    if req.group_size == 0 {
        return Err(HikeBotError::validation("group_size must be at least 1"));
    }

    let gain = req.elevation_gain_m.unwrap_or(0);
    let big_climb = gain > 800;

    let mut items = Vec::new();
    for item in BASE_ITEMS
        .iter()
        .chain(season_items(req.season))
        .chain(altitude_items(req.altitude_band))
        .chain(req.terrain.iter().flat_map(|t| terrain_items(*t)))
    {
        push_unique(&mut items, item);
    }
    if req.hours > 6.0 {
        push_unique(&mut items, "Headlamp");
    }
    if big_climb {
        push_unique(&mut items, "Trekking poles");
        push_unique(&mut items, "Electrolyte tablets");
    }
    if req.group_size >= 4 {
        push_unique(&mut items, "Group emergency shelter");
    }

    let per_hour = if req.season == Season::Summer { 0.75 } else { 0.5 };
    let mut water = per_hour * req.hours;
    if big_climb {
        water += 0.5;
    }
    let water_liters = (water * 10.0).round() / 10.0;

    let raw_kcal = 250.0 * req.hours + 50.0 * f64::from(gain) / 100.0;
    let calories_kcal = ((raw_kcal / 10.0).round() * 10.0) as u32;

    let mut notes = vec!["Water and calories are per person".to_string()];
    if req.group_size > 1 {
        notes.push(format!(
            "Group of {} needs about {:.1} L of water in total",
            req.group_size,
            water_liters * f64::from(req.group_size)
        ));
    }
    if let Some(distance) = req.distance_km {
        notes.push(format!("Planned distance {:.1} km", distance));
    }

    Ok(GearChecklist {
        items,
        water_liters,
        calories_kcal,
        notes: Some(notes.join(". ")),
    })
}

use hikebot_core::{Route, TrailsConfig};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

use crate::matching::best_match;
use crate::seed::{fixture_routes, load_seed_file, planner_fixtures};
use crate::waymarked::{parse_bbox, WaymarkedClient, DEFAULT_LIMIT, DEFAULT_THEME};

/// Minimum similarity for a catalog route to match a free-text name
pub const CATALOG_MATCH_THRESHOLD: f64 = 0.7;
/// Looser threshold used against the built-in planner fixtures
pub const FIXTURE_MATCH_THRESHOLD: f64 = 0.5;

const WAYMARKED_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    Waymarked,
    SeedFile,
    Fixtures,
}

/// Immutable set of routes the recommender and assistant work from.
#[derive(Debug, Clone)]
pub struct RouteCatalog {
    routes: Vec<Route>,
    index: HashMap<String, usize>,
    source: CatalogSource,
}

impl RouteCatalog {
    pub fn from_routes(routes: Vec<Route>, source: CatalogSource) -> Self {
        let mut index = HashMap::with_capacity(routes.len());
        for (i, route) in routes.iter().enumerate() {
            // first occurrence wins on duplicate ids
            index.entry(route.id.clone()).or_insert(i);
        }
        Self {
            routes,
            index,
            source,
        }
    }

    pub fn fixtures() -> Self {
        Self::from_routes(fixture_routes(), CatalogSource::Fixtures)
    }

    /// Waymarked Trails when configured and non-empty, then the seed file, then fixtures.
    pub async fn load(config: &TrailsConfig) -> Self {
        if let Some(routes) = Self::load_waymarked(config).await {
            info!(count = routes.len(), "Loaded routes from Waymarked Trails");
            return Self::from_routes(routes, CatalogSource::Waymarked);
        }

        if let Some(path) = &config.seed_path {
            match load_seed_file(path) {
                Ok(routes) => {
                    info!(count = routes.len(), path = %path.display(), "Loaded seed routes");
                    return Self::from_routes(routes, CatalogSource::SeedFile);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Ignoring seed file"),
            }
        }

        info!("Falling back to built-in fixture routes");
        Self::fixtures()
    }

    async fn load_waymarked(config: &TrailsConfig) -> Option<Vec<Route>> {
        let base_url = config.waymarked_url.as_deref()?;
        let bbox = config.waymarked_bbox.as_deref().and_then(parse_bbox);
        let limit = config.waymarked_limit.unwrap_or(DEFAULT_LIMIT);

        let client = match WaymarkedClient::new(base_url, WAYMARKED_TIMEOUT) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Waymarked Trails client unavailable");
                return None;
            }
        };

        match client.fetch_routes(Some(DEFAULT_THEME), bbox, Some(limit)).await {
            Ok(routes) if !routes.is_empty() => Some(routes),
            Ok(_) => {
                warn!("Waymarked Trails API returned no routes");
                None
            }
            Err(e) => {
                warn!(error = %e, "Waymarked Trails API unavailable");
                None
            }
        }
    }

    pub fn all(&self) -> &[Route] {
        &self.routes
    }

    pub fn get(&self, id: &str) -> Option<&Route> {
        self.index.get(id).map(|&i| &self.routes[i])
    }

    pub fn source(&self) -> CatalogSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Fuzzy lookup by name. Falls back to the planner fixtures with a looser threshold.
    pub fn find_by_name(&self, raw: &str) -> Option<Route> {
        let candidates = self.routes.iter().map(|r| (r.name.as_str(), r));
        if let Some((route, score)) = best_match(raw, candidates, CATALOG_MATCH_THRESHOLD) {
            info!(query = raw, matched = %route.name, score, "Catalog match");
            return Some(route.clone());
        }

        let fixtures = planner_fixtures();
        let candidates = fixtures.iter().map(|r| (r.name.as_str(), r));
        match best_match(raw, candidates, FIXTURE_MATCH_THRESHOLD) {
            Some((route, score)) => {
                info!(query = raw, matched = %route.name, score, "Fixture match");
                Some(route.clone())
            }
            None => None,
        }
    }

    /// First catalog route whose name appears verbatim in the (lowercased) text.
    pub fn first_named_in(&self, text: &str) -> Option<&Route> {
        let lowered = text.to_lowercase();
        self.routes
            .iter()
            .find(|r| lowered.contains(&r.name.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn lookup_by_id() {
        let catalog = RouteCatalog::fixtures();
        assert_eq!(catalog.len(), 5);
        assert_eq!(
            catalog.get("echo-mountain-loop").map(|r| r.name.as_str()),
            Some("Echo Mountain Loop")
        );
        assert!(catalog.get("nope").is_none());
    }

    #[test]
    fn fuzzy_name_lookup_prefers_catalog() {
        let catalog = RouteCatalog::fixtures();
        let hit = catalog.find_by_name("echo mountian loop").unwrap();
        assert_eq!(hit.id, "echo-mountain-loop");

        // not in the catalog, found among the planner fixtures
        let hit = catalog.find_by_name("mailbox").unwrap();
        assert_eq!(hit.id, "mailbox-peak");

        assert!(catalog.find_by_name("zzzz qqqq").is_none());
    }

    #[test]
    fn finds_route_named_in_text() {
        let catalog = RouteCatalog::fixtures();
        let hit = catalog.first_named_in("ok so muir woods coastal route at 8am?");
        assert_eq!(hit.map(|r| r.id.as_str()), Some("muir-woods-coastal"));
        assert!(catalog.first_named_in("anywhere works").is_none());
    }

    #[tokio::test]
    async fn load_without_sources_uses_fixtures() {
        let catalog = RouteCatalog::load(&TrailsConfig::default()).await;
        assert_eq!(catalog.source(), CatalogSource::Fixtures);
        assert_eq!(catalog.len(), 5);
    }

    #[tokio::test]
    async fn load_prefers_valid_seed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        std::fs::write(&path, serde_json::to_string(&fixture_routes()[..1]).unwrap()).unwrap();

        let config = TrailsConfig {
            seed_path: Some(path),
            ..Default::default()
        };
        let catalog = RouteCatalog::load(&config).await;
        assert_eq!(catalog.source(), CatalogSource::SeedFile);
        assert_eq!(catalog.len(), 1);

        let config = TrailsConfig {
            seed_path: Some(PathBuf::from("/definitely/missing.json")),
            ..Default::default()
        };
        assert_eq!(
            RouteCatalog::load(&config).await.source(),
            CatalogSource::Fixtures
        );
    }
}

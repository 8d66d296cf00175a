pub mod catalog;
pub mod gear;
pub mod hazards;
pub mod matching;
pub mod recommend;
pub mod seed;
pub mod waymarked;

pub use catalog::{CatalogSource, RouteCatalog};
pub use gear::build_checklist;
pub use hazards::check_hazards;
pub use matching::KeywordSet;
pub use recommend::{passes_filters, recommend, score_route};
pub use waymarked::{parse_bbox, WaymarkedClient};

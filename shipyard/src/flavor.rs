//! Flavor text for ship logs.
//!
//! Snippets are grouped by [`FlavorCategory`] and loaded once from a bundled
//! JSON resource. Every snippet may contain the [`SHIP_NAME_TOKEN`]
//! placeholder, replaced with the ship's name when a log is generated.
//!
//! A category missing from the resource is reported at load time and
//! otherwise ignored: draws from it return `None` and no log is written.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use rand::seq::IndexedRandom;
use tracing::{debug, error, warn};

use crate::model::{Log, Ship};

/// Placeholder replaced with the ship name.
pub const SHIP_NAME_TOKEN: &str = "{ship}";

const BUNDLED_FLAVOR_TEXT: &str = include_str!("../resources/flavor_text.json");

static BUNDLED: OnceLock<FlavorText> = OnceLock::new();

/// Named snippet lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlavorCategory {
    DryDock,
    DryDockFinish,
    Landing,
    LandingBroken,
    LandingCrashed,
    LaunchSite,
    LaunchSiteFinish,
    TransitShip,
}

impl FlavorCategory {
    pub const ALL: [FlavorCategory; 8] = [
        FlavorCategory::DryDock,
        FlavorCategory::DryDockFinish,
        FlavorCategory::Landing,
        FlavorCategory::LandingBroken,
        FlavorCategory::LandingCrashed,
        FlavorCategory::LaunchSite,
        FlavorCategory::LaunchSiteFinish,
        FlavorCategory::TransitShip,
    ];

    /// Key used in the JSON resource.
    pub fn key(&self) -> &'static str {
        match self {
            FlavorCategory::DryDock => "dry_dock_flavor",
            FlavorCategory::DryDockFinish => "dry_dock_finish_flavor",
            FlavorCategory::Landing => "landing_flavor",
            FlavorCategory::LandingBroken => "landing_broken_flavor",
            FlavorCategory::LandingCrashed => "landing_crashed_flavor",
            FlavorCategory::LaunchSite => "launch_site_flavor",
            FlavorCategory::LaunchSiteFinish => "launch_site_finish_flavor",
            FlavorCategory::TransitShip => "transit_ship_flavor",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl fmt::Display for FlavorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Categorized flavor snippets.
#[derive(Debug, Clone, Default)]
pub struct FlavorText {
    snippets: HashMap<FlavorCategory, Vec<String>>,
}

impl FlavorText {
    /// The snippets compiled into the crate, loaded on first use.
    pub fn bundled() -> &'static FlavorText {
        BUNDLED.get_or_init(|| match Self::from_json(BUNDLED_FLAVOR_TEXT) {
            Ok(flavor) => flavor,
            Err(e) => {
                error!(error = %e, "Bundled flavor text is malformed, ship logs will be empty");
                FlavorText::default()
            }
        })
    }

    /// Parses snippets from a JSON object of `category key -> [snippet]`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: HashMap<String, Vec<String>> = serde_json::from_str(json)?;

        let mut snippets = HashMap::new();
        for (key, list) in raw {
            match FlavorCategory::from_key(&key) {
                Some(category) => {
                    snippets.insert(category, list);
                }
                None => debug!(key = %key, "Ignoring unknown flavor category"),
            }
        }

        for category in FlavorCategory::ALL {
            if snippets.get(&category).map_or(true, |list| list.is_empty()) {
                warn!(category = %category, "Flavor category missing or empty");
            }
        }

        Ok(Self { snippets })
    }

    /// Returns true if at least one snippet exists for the category.
    pub fn has(&self, category: FlavorCategory) -> bool {
        self.snippets
            .get(&category)
            .is_some_and(|list| !list.is_empty())
    }

    /// Draws a uniformly random snippet from the category.
    pub fn get_flavor(&self, category: FlavorCategory) -> Option<&str> {
        self.snippets
            .get(&category)?
            .choose(&mut rand::rng())
            .map(String::as_str)
    }

    /// Draws a snippet, substitutes the ship name and wraps it in a new log.
    pub fn generate_ship_log(&self, ship: &Ship, category: FlavorCategory) -> Option<Log> {
        let snippet = self.get_flavor(category)?;
        Some(Log::new(snippet.replace(SHIP_NAME_TOKEN, &ship.name)))
    }
}

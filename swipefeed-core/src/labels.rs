//! Classification labels attached to every article

use serde::{Deserialize, Serialize};
use std::fmt;

/// Topical category inferred for an article
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Category {
    World,
    Politics,
    Business,
    Finance,
    Technology,
    Science,
    Health,
    Sports,
    Entertainment,
    #[default]
    Other,
}

impl Category {
    /// Keyword buckets in evaluation order (first match wins)
    pub const BUCKETS: [Category; 9] = [
        Category::World,
        Category::Politics,
        Category::Business,
        Category::Finance,
        Category::Technology,
        Category::Science,
        Category::Health,
        Category::Sports,
        Category::Entertainment,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::World => "World",
            Category::Politics => "Politics",
            Category::Business => "Business",
            Category::Finance => "Finance",
            Category::Technology => "Technology",
            Category::Science => "Science",
            Category::Health => "Health",
            Category::Sports => "Sports",
            Category::Entertainment => "Entertainment",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "world" => Ok(Category::World),
            "politics" => Ok(Category::Politics),
            "business" => Ok(Category::Business),
            "finance" => Ok(Category::Finance),
            "technology" | "tech" => Ok(Category::Technology),
            "science" => Ok(Category::Science),
            "health" => Ok(Category::Health),
            "sports" | "sport" => Ok(Category::Sports),
            "entertainment" => Ok(Category::Entertainment),
            "other" => Ok(Category::Other),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// Geographic region inferred for an article
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Region {
    #[serde(rename = "North America")]
    NorthAmerica,
    #[serde(rename = "South America")]
    SouthAmerica,
    Europe,
    Asia,
    Africa,
    Oceania,
    #[serde(rename = "Middle East")]
    MiddleEast,
    #[default]
    Global,
}

impl Region {
    pub fn label(&self) -> &'static str {
        match self {
            Region::NorthAmerica => "North America",
            Region::SouthAmerica => "South America",
            Region::Europe => "Europe",
            Region::Asia => "Asia",
            Region::Africa => "Africa",
            Region::Oceania => "Oceania",
            Region::MiddleEast => "Middle East",
            Region::Global => "Global",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "north america" => Ok(Region::NorthAmerica),
            "south america" => Ok(Region::SouthAmerica),
            "europe" => Ok(Region::Europe),
            "asia" => Ok(Region::Asia),
            "africa" => Ok(Region::Africa),
            "oceania" => Ok(Region::Oceania),
            "middle east" => Ok(Region::MiddleEast),
            "global" => Ok(Region::Global),
            _ => Err(format!("Unknown region: {}", s)),
        }
    }
}

//! Category and region inference tables
//!
//! The tables are plain data (`RuleTables`, serde-loadable) compiled once into
//! `ClassificationRules`. Evaluation is ordered and first-match-wins; ties are
//! not detected.

use regex::Regex;
use serde::{Deserialize, Serialize};
use swipefeed_core::{Category, Region};
use url::Url;

use crate::error::NewsError;

/// A keyword regex for one category bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryPattern {
    pub category: Category,
    pub pattern: String,
}

/// Publisher-specific override: link host + path fragment -> category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherPathRule {
    pub host: String,
    pub path: String,
    pub category: Category,
}

/// Feed-title substring hint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleHint {
    pub contains: String,
    pub category: Category,
}

/// Place name -> region, matched on word-ish boundaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionKeyword {
    pub keyword: String,
    pub region: Region,
}

/// Broader regex checked after the keyword table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionPattern {
    pub pattern: String,
    pub region: Region,
}

/// Uncompiled rule tables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTables {
    pub category_patterns: Vec<CategoryPattern>,
    #[serde(default)]
    pub publisher_paths: Vec<PublisherPathRule>,
    #[serde(default)]
    pub feed_title_hints: Vec<TitleHint>,
    pub region_keywords: Vec<RegionKeyword>,
    #[serde(default)]
    pub region_patterns: Vec<RegionPattern>,
}

const CATEGORY_PATTERNS: [(Category, &str); 9] = [
    (
        Category::World,
        r"\b(world|international|global|foreign|war|united nations|nato|diplomat\w*|refugees?|embass(y|ies)|ceasefire)\b",
    ),
    (
        Category::Politics,
        r"\b(politic\w*|elections?|congress|senate|parliament\w*|president\w*|prime minister|government|minister\w*|votes?|voters?|campaign\w*|democrat\w*|republican\w*|legislation|white house)\b",
    ),
    (
        Category::Business,
        r"\b(business\w*|compan(y|ies)|corporate|industry|mergers?|acquisitions?|ceo|startups?|retail\w*|earnings|layoffs?|trade)\b",
    ),
    (
        Category::Finance,
        r"\b(financ\w*|stocks?|markets?|econom\w*|banks?|banking|inflation|interest rates?|invest\w*|crypto\w*|bitcoin|nasdaq|dow jones|money)\b",
    ),
    (
        Category::Technology,
        r"\b(tech\w*|software|hardware|ai|artificial intelligence|computers?|computing|internet|cyber\w*|apps?|smartphones?|google|apple|microsoft|robot\w*|chips?|semiconductors?)\b",
    ),
    (
        Category::Science,
        r"\b(scien\w*|research\w*|study|space|nasa|climate|physics|biolog\w*|astronom\w*|planets?|species|fossils?)\b",
    ),
    (
        Category::Health,
        r"\b(health\w*|medic\w*|diseases?|hospitals?|covid\w*|vaccin\w*|virus\w*|cancer|doctors?|patients?|nhs)\b",
    ),
    (
        Category::Sports,
        r"\b(sports?|football|soccer|basketball|baseball|tennis|golf|cricket|olympic\w*|nba|nfl|fifa|championships?|tournaments?|league)\b",
    ),
    (
        Category::Entertainment,
        r"\b(entertainment|movies?|films?|music|celebrit\w*|tv|television|hollywood|oscars?|albums?|concerts?|streaming|netflix)\b",
    ),
];

const PUBLISHER_PATHS: [(&str, &str, Category); 24] = [
    ("bbc.", "/news/world", Category::World),
    ("bbc.", "/news/politics", Category::Politics),
    ("bbc.", "/news/uk-politics", Category::Politics),
    ("bbc.", "/news/business", Category::Business),
    ("bbc.", "/news/technology", Category::Technology),
    ("bbc.", "/news/science", Category::Science),
    ("bbc.", "/news/health", Category::Health),
    ("bbc.", "/sport/", Category::Sports),
    ("bbc.", "/news/entertainment", Category::Entertainment),
    ("theguardian.com", "/world/", Category::World),
    ("theguardian.com", "/politics/", Category::Politics),
    ("theguardian.com", "/business/", Category::Business),
    ("theguardian.com", "/money/", Category::Finance),
    ("theguardian.com", "/technology/", Category::Technology),
    ("theguardian.com", "/science/", Category::Science),
    ("theguardian.com", "/sport/", Category::Sports),
    ("theguardian.com", "/film/", Category::Entertainment),
    ("theguardian.com", "/culture/", Category::Entertainment),
    ("cnn.com", "/world/", Category::World),
    ("cnn.com", "/politics/", Category::Politics),
    ("cnn.com", "/business/", Category::Business),
    ("cnn.com", "/tech/", Category::Technology),
    ("cnn.com", "/health/", Category::Health),
    ("cnn.com", "/entertainment/", Category::Entertainment),
];

const FEED_TITLE_HINTS: [(&str, Category); 13] = [
    ("world", Category::World),
    ("politic", Category::Politics),
    ("business", Category::Business),
    ("money", Category::Finance),
    ("finance", Category::Finance),
    ("market", Category::Finance),
    ("tech", Category::Technology),
    ("science", Category::Science),
    ("health", Category::Health),
    ("sport", Category::Sports),
    ("espn", Category::Sports),
    ("entertainment", Category::Entertainment),
    ("culture", Category::Entertainment),
];

const REGION_KEYWORDS: &[(Region, &[&str])] = &[
    (
        Region::SouthAmerica,
        &[
            "south america", "south american", "latin america", "latin american", "brazil",
            "argentina", "chile", "colombia", "peru", "venezuela", "ecuador", "bolivia",
            "uruguay", "paraguay",
        ],
    ),
    (
        Region::NorthAmerica,
        &[
            "usa", "u.s.", "united states", "america", "american", "americans", "canada",
            "canadian", "mexico", "mexican", "washington", "new york", "california", "texas",
            "florida", "chicago", "los angeles", "toronto", "ottawa",
        ],
    ),
    (
        Region::Europe,
        &[
            "europe", "european", "eu", "uk", "britain", "british", "england", "london",
            "scotland", "wales", "ireland", "france", "french", "paris", "germany", "german",
            "berlin", "italy", "rome", "spain", "madrid", "netherlands", "belgium", "brussels",
            "sweden", "norway", "denmark", "finland", "poland", "ukraine", "kyiv", "russia",
            "moscow", "greece", "portugal", "switzerland", "austria",
        ],
    ),
    (
        Region::Asia,
        &[
            "asia", "asian", "china", "chinese", "beijing", "hong kong", "taiwan", "japan",
            "tokyo", "korea", "seoul", "india", "indian", "delhi", "mumbai", "pakistan",
            "bangladesh", "indonesia", "vietnam", "thailand", "philippines", "malaysia",
            "singapore", "afghanistan",
        ],
    ),
    (
        Region::Africa,
        &[
            "africa", "african", "nigeria", "kenya", "egypt", "ethiopia", "ghana", "sudan",
            "congo", "morocco", "algeria", "tunisia", "somalia", "uganda", "tanzania",
            "zimbabwe", "johannesburg", "cairo", "nairobi", "lagos",
        ],
    ),
    (
        Region::Oceania,
        &[
            "australia", "australian", "new zealand", "sydney", "melbourne", "fiji",
            "papua new guinea", "oceania",
        ],
    ),
];

const MIDDLE_EAST_PATTERN: &str = r"middle[\s-]east|\b(gaza|israel\w*|iran\w*|iraq\w*|syria\w*|saudi|lebanon|lebanese|yemen\w*|qatar\w*|palestin\w*|west bank|tehran|dubai)\b";

impl Default for RuleTables {
    fn default() -> Self {
        Self {
            category_patterns: CATEGORY_PATTERNS
                .iter()
                .map(|(category, pattern)| CategoryPattern {
                    category: *category,
                    pattern: pattern.to_string(),
                })
                .collect(),
            publisher_paths: PUBLISHER_PATHS
                .iter()
                .map(|(host, path, category)| PublisherPathRule {
                    host: host.to_string(),
                    path: path.to_string(),
                    category: *category,
                })
                .collect(),
            feed_title_hints: FEED_TITLE_HINTS
                .iter()
                .map(|(contains, category)| TitleHint {
                    contains: contains.to_string(),
                    category: *category,
                })
                .collect(),
            region_keywords: REGION_KEYWORDS
                .iter()
                .flat_map(|(region, keywords)| {
                    keywords.iter().map(move |keyword| RegionKeyword {
                        keyword: keyword.to_string(),
                        region: *region,
                    })
                })
                .collect(),
            region_patterns: vec![RegionPattern {
                pattern: MIDDLE_EAST_PATTERN.to_string(),
                region: Region::MiddleEast,
            }],
        }
    }
}

impl RuleTables {
    /// Parse tables from JSON (same shape as the serialized defaults)
    pub fn from_json(json: &str) -> Result<Self, NewsError> {
        serde_json::from_str(json).map_err(|e| NewsError::InvalidRule(e.to_string()))
    }

    pub fn compile(&self) -> Result<ClassificationRules, NewsError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| NewsError::InvalidRule(format!("{}: {}", pattern, e)))
        };

        let category_patterns = self
            .category_patterns
            .iter()
            .map(|p| Ok((compile(&p.pattern)?, p.category)))
            .collect::<Result<Vec<_>, NewsError>>()?;

        let region_keywords = self
            .region_keywords
            .iter()
            .map(|k| {
                let keyword = k.keyword.trim().to_lowercase();
                let pattern = format!(
                    r"(?:^|[^a-z0-9]){}(?:[^a-z0-9]|$)",
                    regex::escape(&keyword)
                );
                Ok((compile(&pattern)?, k.region))
            })
            .collect::<Result<Vec<_>, NewsError>>()?;

        let region_patterns = self
            .region_patterns
            .iter()
            .map(|p| Ok((compile(&p.pattern)?, p.region)))
            .collect::<Result<Vec<_>, NewsError>>()?;

        Ok(ClassificationRules {
            category_patterns,
            publisher_paths: self
                .publisher_paths
                .iter()
                .map(|r| (r.host.to_lowercase(), r.path.to_lowercase(), r.category))
                .collect(),
            feed_title_hints: self
                .feed_title_hints
                .iter()
                .map(|h| (h.contains.to_lowercase(), h.category))
                .collect(),
            region_keywords,
            region_patterns,
        })
    }
}

/// Inputs considered when inferring a category
#[derive(Debug, Clone, Default)]
pub struct CategoryInput<'a> {
    pub entry_categories: &'a [String],
    pub title: &'a str,
    /// Snippet, else summary
    pub snippet: &'a str,
    pub feed_title: &'a str,
    pub link: &'a str,
    pub feed_url: &'a str,
}

/// Compiled, ready-to-evaluate rules
#[derive(Debug, Clone)]
pub struct ClassificationRules {
    category_patterns: Vec<(Regex, Category)>,
    publisher_paths: Vec<(String, String, Category)>,
    feed_title_hints: Vec<(String, Category)>,
    region_keywords: Vec<(Regex, Region)>,
    region_patterns: Vec<(Regex, Region)>,
}

impl ClassificationRules {
    /// Compile the built-in tables
    pub fn builtin() -> Result<Self, NewsError> {
        RuleTables::default().compile()
    }

    pub fn classify_category(&self, input: &CategoryInput<'_>) -> Category {
        let haystack = format!(
            "{} {} {} {} {} {}",
            input.entry_categories.join(" "),
            input.title,
            input.snippet,
            input.feed_title,
            input.link,
            input.feed_url
        )
        .to_lowercase();

        if let Some((_, category)) = self
            .category_patterns
            .iter()
            .find(|(re, _)| re.is_match(&haystack))
        {
            return *category;
        }

        if let Some(category) = self.publisher_category(input.link) {
            return category;
        }

        let feed_title = input.feed_title.to_lowercase();
        self.feed_title_hints
            .iter()
            .find(|(hint, _)| feed_title.contains(hint.as_str()))
            .map(|(_, category)| *category)
            .unwrap_or(Category::Other)
    }

    fn publisher_category(&self, link: &str) -> Option<Category> {
        let url = Url::parse(link.trim()).ok()?;
        let host = url.host_str()?.to_lowercase();
        let path = url.path().to_lowercase();

        self.publisher_paths
            .iter()
            .find(|(rule_host, rule_path, _)| {
                host.contains(rule_host.as_str()) && path.contains(rule_path.as_str())
            })
            .map(|(_, _, category)| *category)
    }

    pub fn classify_region(&self, title: &str, description: &str) -> Region {
        let text = format!("{} {}", title, description).to_lowercase();

        self.region_keywords
            .iter()
            .chain(self.region_patterns.iter())
            .find(|(re, _)| re.is_match(&text))
            .map(|(_, region)| *region)
            .unwrap_or(Region::Global)
    }
}

//! Personalization engine
//!
//! Bucket-select: the page is split into a personalized share drawn from
//! articles matching the user's preferences and a remainder drawn from the
//! rest, both in recency order. A short matched pool is not backfilled, so a
//! page can come back shorter than `limit`.

use std::collections::HashSet;

use swipefeed_core::{Article, UserPreferenceState};

/// `round(limit * level / 100)`, halves rounding up
pub fn personalized_count(limit: usize, level: u8) -> usize {
    let level = usize::from(level.min(100));
    (limit * level + 50) / 100
}

/// Unseen articles in their existing (recency) order
pub fn recent_articles(articles: &[Article], seen_ids: &HashSet<String>, limit: usize) -> Vec<Article> {
    articles
        .iter()
        .filter(|a| !seen_ids.contains(&a.id))
        .take(limit)
        .cloned()
        .collect()
}

/// Mix matched and unmatched articles according to `level`
///
/// Level 0, or a user without any positive weight, gets the plain recency feed.
pub fn select_articles(
    articles: &[Article],
    preferences: &UserPreferenceState,
    level: u8,
    seen_ids: &HashSet<String>,
    limit: usize,
) -> Vec<Article> {
    if level == 0 || !preferences.has_preferences() {
        return recent_articles(articles, seen_ids, limit);
    }

    let (matched, unmatched): (Vec<&Article>, Vec<&Article>) = articles
        .iter()
        .filter(|a| !seen_ids.contains(&a.id))
        .partition(|a| preferences.matches(a));

    let personalized = personalized_count(limit, level);
    let random = limit - personalized;

    matched
        .into_iter()
        .take(personalized)
        .chain(unmatched.into_iter().take(random))
        .take(limit)
        .cloned()
        .collect()
}

/// Free-text search over title, description, category and region
///
/// Each query token longer than one character scores a point when it occurs
/// anywhere in the article text. Ties keep recency order.
pub fn search_articles(articles: &[Article], query: &str, limit: usize) -> Vec<Article> {
    let tokens: Vec<String> = query
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() > 1)
        .collect();
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, &Article)> = articles
        .iter()
        .filter_map(|article| {
            let text = article.search_text();
            let score = tokens.iter().filter(|t| text.contains(t.as_str())).count();
            (score > 0).then_some((score, article))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, article)| article.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use swipefeed_core::{Category, Enrichment, Region};

    fn article(id: &str, source: &str, category: Category) -> Article {
        Article {
            id: id.to_string(),
            title: format!("Story {}", id),
            url: Some(format!("https://example.com/{}", id)),
            source: source.to_string(),
            description: String::new(),
            image_url: None,
            published_at: None,
            category,
            region: Region::Global,
            enrichment: Enrichment::default(),
        }
    }

    fn prefers_source(source: &str, weight: u32) -> UserPreferenceState {
        UserPreferenceState {
            preferred_sources: BTreeMap::from([(source.to_string(), weight)]),
            ..UserPreferenceState::default()
        }
    }

    fn ids(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_personalized_count_rounding() {
        assert_eq!(personalized_count(10, 0), 0);
        assert_eq!(personalized_count(10, 100), 10);
        assert_eq!(personalized_count(5, 50), 3);
        assert_eq!(personalized_count(3, 33), 1);
        assert_eq!(personalized_count(20, 50), 10);
    }

    #[test]
    fn test_bbc_scenario_has_shortfall() {
        let pool = vec![
            article("cnn-1", "CNN", Category::World),
            article("bbc-1", "BBC", Category::World),
            article("npr-1", "NPR", Category::World),
            article("dw-1", "DW", Category::World),
        ];
        let prefs = prefers_source("BBC", 5);

        let result = select_articles(&pool, &prefs, 100, &HashSet::new(), 2);
        assert_eq!(ids(&result), vec!["bbc-1"]);
    }

    #[test]
    fn test_full_customization_draws_only_matches() {
        let pool = vec![
            article("a", "BBC", Category::World),
            article("b", "CNN", Category::World),
            article("c", "BBC", Category::Sports),
            article("d", "BBC", Category::Health),
        ];
        let prefs = prefers_source("BBC", 1);

        let result = select_articles(&pool, &prefs, 100, &HashSet::new(), 2);
        assert_eq!(ids(&result), vec!["a", "c"]);
    }

    #[test]
    fn test_level_zero_is_recency_order() {
        let pool = vec![
            article("a", "CNN", Category::World),
            article("b", "BBC", Category::World),
            article("c", "NPR", Category::World),
        ];
        let prefs = prefers_source("BBC", 3);

        let result = select_articles(&pool, &prefs, 0, &HashSet::new(), 10);
        assert_eq!(ids(&result), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cold_start_is_recency_order() {
        let pool = vec![
            article("a", "CNN", Category::World),
            article("b", "BBC", Category::World),
        ];
        let result = select_articles(&pool, &UserPreferenceState::default(), 100, &HashSet::new(), 1);
        assert_eq!(ids(&result), vec!["a"]);
    }

    #[test]
    fn test_half_mix_puts_matches_first() {
        let pool = vec![
            article("u1", "CNN", Category::Business),
            article("m1", "BBC", Category::Business),
            article("u2", "NPR", Category::Business),
            article("m2", "AP", Category::Sports),
            article("u3", "DW", Category::Business),
        ];
        let mut prefs = prefers_source("BBC", 2);
        prefs.preferred_categories.insert("Sports".to_string(), 1);

        let result = select_articles(&pool, &prefs, 50, &HashSet::new(), 4);
        assert_eq!(ids(&result), vec!["m1", "m2", "u1", "u2"]);
    }

    #[test]
    fn test_seen_articles_are_excluded() {
        let pool = vec![
            article("a", "BBC", Category::World),
            article("b", "BBC", Category::World),
            article("c", "CNN", Category::World),
        ];
        let seen: HashSet<String> = ["a".to_string()].into();

        let result = select_articles(&pool, &prefers_source("BBC", 1), 100, &seen, 5);
        assert_eq!(ids(&result), vec!["b"]);

        let result = recent_articles(&pool, &seen, 5);
        assert_eq!(ids(&result), vec!["b", "c"]);
    }

    #[test]
    fn test_zero_weight_does_not_match() {
        let pool = vec![article("a", "BBC", Category::World)];
        let prefs = prefers_source("BBC", 0);
        assert!(!prefs.has_preferences());
        // Falls back to recency rather than returning nothing
        assert_eq!(ids(&select_articles(&pool, &prefs, 100, &HashSet::new(), 1)), vec!["a"]);
    }

    #[test]
    fn test_search_scoring() {
        let mut title_only = article("title", "Wire", Category::Other);
        title_only.title = "Election results announced".to_string();
        let mut both = article("both", "Wire", Category::Other);
        both.title = "Election night".to_string();
        both.description = "Results came in late".to_string();
        let unrelated = article("none", "Wire", Category::Other);

        let pool = vec![title_only, unrelated, both];

        assert!(search_articles(&pool, "volcano", 10).is_empty());
        assert!(search_articles(&pool, "a I", 10).is_empty());

        let result = search_articles(&pool, "ELECTION results", 10);
        assert_eq!(ids(&result), vec!["title", "both"]);

        let result = search_articles(&pool, "election late", 10);
        assert_eq!(ids(&result), vec!["both", "title"]);

        assert_eq!(search_articles(&pool, "election", 1).len(), 1);
    }

    #[test]
    fn test_search_matches_labels() {
        let mut sports = article("s", "Wire", Category::Sports);
        sports.region = Region::Europe;
        let pool = vec![sports, article("o", "Wire", Category::Other)];

        assert_eq!(ids(&search_articles(&pool, "europe", 10)), vec!["s"]);
    }
}

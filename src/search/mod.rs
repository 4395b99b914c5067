use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::model::Recipe;

/// View ordering of the recipe list. The physical collection is newest-first,
/// so `EarlyLast` is the identity ordering.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum SortMode {
    #[default]
    EarlyLast,
    EarlyFirst,
    CookTimeLow,
    CookTimeHigh,
    ServingsLow,
    ServingsHigh,
}

/// The three sort buttons of the filter menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "camelCase")]
pub enum SortField {
    Date,
    CookTime,
    Servings,
}

impl SortMode {
    pub fn field(self) -> SortField {
        match self {
            SortMode::EarlyLast | SortMode::EarlyFirst => SortField::Date,
            SortMode::CookTimeLow | SortMode::CookTimeHigh => SortField::CookTime,
            SortMode::ServingsLow | SortMode::ServingsHigh => SortField::Servings,
        }
    }

    /// Pressing a field's button: switching to a new field picks its entry
    /// direction, pressing the active field flips direction.
    pub fn toggled(self, field: SortField) -> SortMode {
        match (field, self) {
            (SortField::Date, SortMode::EarlyLast) => SortMode::EarlyFirst,
            (SortField::Date, _) => SortMode::EarlyLast,
            (SortField::CookTime, SortMode::CookTimeLow) => SortMode::CookTimeHigh,
            (SortField::CookTime, _) => SortMode::CookTimeLow,
            (SortField::Servings, SortMode::ServingsHigh) => SortMode::ServingsLow,
            (SortField::Servings, _) => SortMode::ServingsHigh,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeQuery {
    pub search_text: String,
    pub sort: SortMode,
    pub tags: Vec<String>,
}

impl RecipeQuery {
    pub fn apply<'a>(&self, recipes: &'a [Recipe]) -> Vec<&'a Recipe> {
        visible_recipes(recipes, &self.search_text, self.sort, self.tags.as_slice())
    }

    pub fn has_filters(&self) -> bool {
        !self.tags.is_empty() || !normalize_search_text(&self.search_text).is_empty()
    }
}

/// Tag filter, then text filter, then sort. Never reorders or touches
/// `recipes` itself.
pub fn visible_recipes<'a, T>(
    recipes: &'a [Recipe],
    search_text: &str,
    sort: SortMode,
    tag_filters: &[T],
) -> Vec<&'a Recipe>
where
    T: AsRef<str>,
{
    let needle = normalize_search_text(search_text);
    let mut visible: Vec<&Recipe> = recipes
        .iter()
        .filter(|recipe| has_all_tags(recipe, tag_filters))
        .filter(|recipe| matches_text(recipe, &needle))
        .collect();
    sort_recipes(&mut visible, sort);
    tracing::debug!(
        total = recipes.len(),
        visible = visible.len(),
        %sort,
        "evaluated recipe query"
    );
    visible
}

/// Case-folds and strips every whitespace character.
pub fn normalize_search_text(text: &str) -> String {
    text.chars()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn has_all_tags<T: AsRef<str>>(recipe: &Recipe, tag_filters: &[T]) -> bool {
    tag_filters.iter().all(|tag| recipe.has_tag(tag.as_ref()))
}

fn matches_text(recipe: &Recipe, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    normalize_search_text(&recipe.title).contains(needle)
        || normalize_search_text(&recipe.description).contains(needle)
}

// Vec::sort_by is stable, so equal keys keep their filtered order.
fn sort_recipes(recipes: &mut [&Recipe], sort: SortMode) {
    match sort {
        SortMode::EarlyLast => {}
        SortMode::EarlyFirst => recipes.reverse(),
        SortMode::CookTimeLow => recipes.sort_by_key(|r| r.cook_time.total_minutes()),
        SortMode::CookTimeHigh => recipes.sort_by(|a, b| {
            b.cook_time
                .total_minutes()
                .cmp(&a.cook_time.total_minutes())
        }),
        SortMode::ServingsLow => recipes.sort_by_key(|r| servings_key(r)),
        SortMode::ServingsHigh => recipes.sort_by(|a, b| servings_key(b).cmp(&servings_key(a))),
    }
}

// Missing servings compare as zero.
fn servings_key(recipe: &Recipe) -> i64 {
    recipe.servings.unwrap_or(0)
}

/// Parses a free-form query line. `tag:<name>` adds a tag filter (underscores
/// stand for spaces), `sort:<mode>` picks the ordering, everything else is
/// search text.
pub fn parse_query(input: &str) -> RecipeQuery {
    let mut query = RecipeQuery::default();
    let mut text = Vec::new();
    for raw in input.split_whitespace() {
        if let Some(tag) = raw.strip_prefix("tag:") {
            let tag = tag.replace('_', " ");
            if !tag.is_empty() && !query.tags.contains(&tag) {
                query.tags.push(tag);
            }
            continue;
        }
        if let Some(mode) = raw.strip_prefix("sort:") {
            match SortMode::from_str(mode) {
                Ok(mode) => query.sort = mode,
                Err(_) => tracing::warn!(mode, "ignoring unknown sort mode in query"),
            }
            continue;
        }
        text.push(raw);
    }
    query.search_text = text.join(" ");
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CookTime;
    use strum::IntoEnumIterator;

    fn recipe(id: &str, title: &str, tags: &[&str]) -> Recipe {
        let mut recipe = Recipe::new(id);
        recipe.title = title.into();
        recipe.tags = tags.iter().map(|t| t.to_string()).collect();
        recipe
    }

    fn ids(recipes: &[&Recipe]) -> Vec<String> {
        recipes.iter().map(|r| r.id.clone()).collect()
    }

    const NO_TAGS: &[&str] = &[];

    #[test]
    fn search_matches_title_case_insensitively() {
        let recipes = vec![
            recipe("1", "Banana Bread", &[]),
            recipe("2", "Apple Pie", &[]),
        ];
        let visible = visible_recipes(&recipes, "banana", SortMode::EarlyLast, NO_TAGS);
        assert_eq!(ids(&visible), vec!["1"]);
    }

    #[test]
    fn search_ignores_whitespace_on_both_sides() {
        let mut soup = recipe("1", "Tomato Soup", &[]);
        soup.description = "Roasted   red  peppers".into();
        let recipes = vec![soup, recipe("2", "Toast", &[])];

        let by_title = visible_recipes(&recipes, " tomatos oup ", SortMode::EarlyLast, NO_TAGS);
        assert_eq!(ids(&by_title), vec!["1"]);

        let by_description = visible_recipes(&recipes, "REDPEP", SortMode::EarlyLast, NO_TAGS);
        assert_eq!(ids(&by_description), vec!["1"]);
    }

    #[test]
    fn empty_search_and_tags_keep_physical_order() {
        let recipes = vec![recipe("c", "C", &[]), recipe("a", "A", &[]), recipe("b", "B", &[])];
        let visible = visible_recipes(&recipes, "   ", SortMode::EarlyLast, NO_TAGS);
        assert_eq!(ids(&visible), vec!["c", "a", "b"]);
    }

    #[test]
    fn tag_filter_requires_every_tag() {
        let recipes = vec![
            recipe("1", "Pancakes", &["Breakfast", "Quick"]),
            recipe("2", "Omelette", &["Breakfast"]),
            recipe("3", "Brownies", &["Dessert", "Quick"]),
        ];
        let one = visible_recipes(&recipes, "", SortMode::EarlyLast, &["Breakfast"]);
        assert_eq!(ids(&one), vec!["1", "2"]);

        let both = visible_recipes(&recipes, "", SortMode::EarlyLast, &["Quick", "Breakfast"]);
        assert_eq!(ids(&both), vec!["1"]);
    }

    #[test]
    fn adding_a_tag_filter_never_grows_results() {
        let recipes = vec![
            recipe("1", "A", &["Lunch", "Vegan"]),
            recipe("2", "B", &["Lunch"]),
            recipe("3", "C", &["Vegan"]),
            recipe("4", "D", &[]),
        ];
        let mut filters: Vec<&str> = Vec::new();
        let mut previous =
            visible_recipes(&recipes, "", SortMode::EarlyLast, filters.as_slice()).len();
        for tag in ["Lunch", "Vegan", "Dessert"] {
            filters.push(tag);
            let visible = visible_recipes(&recipes, "", SortMode::EarlyLast, filters.as_slice());
            assert!(visible.len() <= previous);
            assert!(visible.iter().all(|r| r.has_tag(tag)));
            previous = visible.len();
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn early_first_reverses_physical_order() {
        let recipes = vec![recipe("new", "N", &[]), recipe("mid", "M", &[]), recipe("old", "O", &[])];
        let visible = visible_recipes(&recipes, "", SortMode::EarlyFirst, NO_TAGS);
        assert_eq!(ids(&visible), vec!["old", "mid", "new"]);
    }

    #[test]
    fn cook_time_sorts_by_total_minutes() {
        let mut quick = recipe("quick", "Q", &[]);
        quick.cook_time = CookTime::new(None, None, Some(20));
        let mut roast = recipe("roast", "R", &[]);
        roast.cook_time = CookTime::new(None, Some(2), Some(0));
        let mut brine = recipe("brine", "B", &[]);
        brine.cook_time = CookTime::new(Some(1), None, None);
        let untimed = recipe("untimed", "U", &[]);
        let recipes = vec![roast, untimed, brine, quick];

        let low = visible_recipes(&recipes, "", SortMode::CookTimeLow, NO_TAGS);
        assert_eq!(ids(&low), vec!["untimed", "quick", "roast", "brine"]);

        let high = visible_recipes(&recipes, "", SortMode::CookTimeHigh, NO_TAGS);
        assert_eq!(ids(&high), vec!["brine", "roast", "quick", "untimed"]);
    }

    #[test]
    fn servings_treat_missing_as_zero() {
        let mut four = recipe("four", "4", &[]);
        four.servings = Some(4);
        let mut two = recipe("two", "2", &[]);
        two.servings = Some(2);
        let none = recipe("none", "-", &[]);
        let recipes = vec![four, none, two];

        let low = visible_recipes(&recipes, "", SortMode::ServingsLow, NO_TAGS);
        assert_eq!(ids(&low), vec!["none", "two", "four"]);

        let high = visible_recipes(&recipes, "", SortMode::ServingsHigh, NO_TAGS);
        assert_eq!(ids(&high), vec!["four", "two", "none"]);
    }

    #[test]
    fn equal_keys_keep_relative_order_in_every_mode() {
        let recipes: Vec<Recipe> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|id| {
                let mut r = recipe(id, id, &[]);
                r.servings = Some(3);
                r.cook_time = CookTime::new(None, Some(1), None);
                r
            })
            .collect();
        for mode in SortMode::iter() {
            let visible = visible_recipes(&recipes, "", mode, NO_TAGS);
            let expected: Vec<String> = if mode == SortMode::EarlyFirst {
                vec!["d".into(), "c".into(), "b".into(), "a".into()]
            } else {
                vec!["a".into(), "b".into(), "c".into(), "d".into()]
            };
            assert_eq!(ids(&visible), expected, "mode {mode}");
        }
    }

    #[test]
    fn query_does_not_mutate_input() {
        let recipes = vec![recipe("1", "B", &[]), recipe("2", "A", &[])];
        let before = recipes.clone();
        let _ = visible_recipes(&recipes, "", SortMode::EarlyFirst, NO_TAGS);
        assert_eq!(recipes, before);
    }

    #[test]
    fn sort_mode_names_match_stored_values() {
        assert_eq!(SortMode::EarlyLast.to_string(), "earlyLast");
        assert_eq!(SortMode::from_str("servingsHigh").ok(), Some(SortMode::ServingsHigh));
        assert_eq!(
            serde_json::to_string(&SortMode::CookTimeLow).ok().as_deref(),
            Some("\"cookTimeLow\"")
        );
    }

    #[test]
    fn toggling_follows_filter_menu_cycle() {
        let date = SortField::Date;
        let cook = SortField::CookTime;
        let servings = SortField::Servings;
        assert_eq!(SortMode::EarlyLast.toggled(date), SortMode::EarlyFirst);
        assert_eq!(SortMode::EarlyFirst.toggled(date), SortMode::EarlyLast);
        assert_eq!(SortMode::CookTimeLow.toggled(date), SortMode::EarlyLast);

        assert_eq!(SortMode::EarlyLast.toggled(cook), SortMode::CookTimeLow);
        assert_eq!(SortMode::CookTimeLow.toggled(cook), SortMode::CookTimeHigh);
        assert_eq!(SortMode::CookTimeHigh.toggled(cook), SortMode::CookTimeLow);

        assert_eq!(SortMode::EarlyLast.toggled(servings), SortMode::ServingsHigh);
        assert_eq!(SortMode::ServingsHigh.toggled(servings), SortMode::ServingsLow);
        assert_eq!(SortMode::ServingsLow.toggled(servings), SortMode::ServingsHigh);
    }

    #[test]
    fn parse_query_splits_tags_sort_and_text() {
        let query = parse_query("tag:Gluten_Free banana sort:cookTimeHigh bread tag:Quick");
        assert_eq!(query.tags, vec!["Gluten Free".to_string(), "Quick".to_string()]);
        assert_eq!(query.sort, SortMode::CookTimeHigh);
        assert_eq!(query.search_text, "banana bread");
        assert!(query.has_filters());

        let plain = parse_query("sort:bogus");
        assert_eq!(plain.sort, SortMode::EarlyLast);
        assert!(!plain.has_filters());
    }
}

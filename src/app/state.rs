use std::sync::Arc;

use crate::catalog::RecipeCatalog;
use crate::config::tags::TagVocabulary;
use crate::editor::EditorSession;
use crate::ids::IdGenerator;
use crate::model::{Recipe, RecipeId};
use crate::search::{visible_recipes, RecipeQuery, SortField, SortMode};

/// One row of the recipe list, already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeSummary {
    pub id: RecipeId,
    pub title: String,
    pub tags: Vec<String>,
    pub added: String,
    pub cook_time: String,
    pub servings: Option<i64>,
    pub picture: String,
}

impl RecipeSummary {
    pub fn from_recipe(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id.clone(),
            title: recipe.title.clone(),
            tags: recipe.tags.clone(),
            added: format!("Recipe added: {}", recipe.date),
            cook_time: recipe.cook_time.to_string(),
            servings: recipe.servings,
            picture: recipe.picture_or_default().to_owned(),
        }
    }
}

/// Search text, sort mode, tag filters and the current selection. Holds ids
/// only; recipe data is always read from the catalog snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowseState {
    search_text: String,
    sort: SortMode,
    tag_filters: Vec<String>,
    selected: Option<RecipeId>,
}

impl BrowseState {
    pub fn new(sort: SortMode) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    pub fn from_query(query: RecipeQuery) -> Self {
        Self {
            search_text: query.search_text,
            sort: query.sort,
            tag_filters: query.tags,
            selected: None,
        }
    }

    pub fn query(&self) -> RecipeQuery {
        RecipeQuery {
            search_text: self.search_text.clone(),
            sort: self.sort,
            tags: self.tag_filters.clone(),
        }
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
    }

    pub fn sort(&self) -> SortMode {
        self.sort
    }

    pub fn set_sort(&mut self, sort: SortMode) {
        self.sort = sort;
    }

    pub fn toggle_sort(&mut self, field: SortField) -> SortMode {
        self.sort = self.sort.toggled(field);
        self.sort
    }

    pub fn tag_filters(&self) -> &[String] {
        &self.tag_filters
    }

    /// Adds `tag` to the active filters, or removes it if already active.
    /// Returns whether the tag is active afterwards.
    pub fn toggle_tag_filter(&mut self, tag: &str) -> bool {
        match self.tag_filters.iter().position(|t| t == tag) {
            Some(index) => {
                self.tag_filters.remove(index);
                false
            }
            None => {
                self.tag_filters.push(tag.to_owned());
                true
            }
        }
    }

    /// Resets sorting and tag filters. Search text is left alone.
    pub fn clear_filters(&mut self) {
        self.sort = SortMode::EarlyLast;
        self.tag_filters.clear();
    }

    pub fn visible<'a>(&self, recipes: &'a [Recipe]) -> Vec<&'a Recipe> {
        visible_recipes(recipes, &self.search_text, self.sort, self.tag_filters.as_slice())
    }

    pub fn summaries(&self, recipes: &[Recipe]) -> Vec<RecipeSummary> {
        self.visible(recipes)
            .into_iter()
            .map(RecipeSummary::from_recipe)
            .collect()
    }

    pub fn filter_chips(&self) -> Vec<String> {
        let mut chips = Vec::new();
        if self.sort != SortMode::EarlyLast {
            chips.push(format!("sort:{}", self.sort));
        }
        for tag in &self.tag_filters {
            chips.push(format!("tag:{tag}"));
        }
        chips
    }

    pub fn select(&mut self, id: impl Into<RecipeId>) {
        self.selected = Some(id.into());
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// The selected recipe as currently stored. A selection whose recipe has
    /// since been deleted resolves to `None`.
    pub fn selected_recipe(&self, catalog: &RecipeCatalog) -> Option<Recipe> {
        self.selected.as_deref().and_then(|id| catalog.get_by_id(id))
    }

    /// Opens an editor for a brand-new recipe and selects its id.
    pub fn start_new_recipe(
        &mut self,
        ids: Arc<dyn IdGenerator>,
        vocabulary: TagVocabulary,
    ) -> EditorSession {
        let session = EditorSession::create(ids, vocabulary);
        self.selected = Some(session.id().to_owned());
        session
    }

    pub fn edit_selected(
        &self,
        catalog: &RecipeCatalog,
        ids: Arc<dyn IdGenerator>,
        vocabulary: TagVocabulary,
    ) -> Option<EditorSession> {
        let id = self.selected.as_deref()?;
        Some(EditorSession::open(catalog, id, ids, vocabulary))
    }
}

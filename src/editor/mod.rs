use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::catalog::{CatalogError, RecipeCatalog};
use crate::config::tags::TagVocabulary;
use crate::ids::IdGenerator;
use crate::model::{CookTime, IngredientLine, Recipe, RecipeDate, RecipeId};

// Generator draws before falling back to a suffixed key.
const KEY_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngredientField {
    Amount,
    Ingredient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagToggle {
    Added,
    Removed,
    /// The tag is not part of the vocabulary; nothing changed.
    Ignored,
}

/// Draft state for editing exactly one recipe. Nothing here is persisted
/// until [`commit`](Self::commit) succeeds.
pub struct EditorSession {
    id: RecipeId,
    existing: bool,
    title: String,
    tags: Vec<String>,
    description: String,
    picture: Option<String>,
    ingredients: IndexMap<String, IngredientLine>,
    directions: IndexMap<String, String>,
    date: RecipeDate,
    cook_time: CookTime,
    servings: Option<i64>,
    retired_keys: HashSet<String>,
    ids: Arc<dyn IdGenerator>,
    vocabulary: TagVocabulary,
}

impl EditorSession {
    /// Starts a brand-new recipe with a freshly generated id.
    pub fn create(ids: Arc<dyn IdGenerator>, vocabulary: TagVocabulary) -> Self {
        let id = ids.next_id();
        Self::blank(id, ids, vocabulary)
    }

    /// Opens `id` for editing. When the catalog has no such recipe the session
    /// starts from defaults under that id.
    pub fn open(
        catalog: &RecipeCatalog,
        id: &str,
        ids: Arc<dyn IdGenerator>,
        vocabulary: TagVocabulary,
    ) -> Self {
        match catalog.get_by_id(id) {
            Some(recipe) => Self::from_recipe(recipe, ids, vocabulary),
            None => {
                tracing::debug!(id, "no stored recipe, starting a blank draft");
                Self::blank(id.to_owned(), ids, vocabulary)
            }
        }
    }

    fn blank(id: RecipeId, ids: Arc<dyn IdGenerator>, vocabulary: TagVocabulary) -> Self {
        let mut session = Self {
            id,
            existing: false,
            title: String::new(),
            tags: Vec::new(),
            description: String::new(),
            picture: None,
            ingredients: IndexMap::new(),
            directions: IndexMap::new(),
            date: RecipeDate::default(),
            cook_time: CookTime::default(),
            servings: None,
            retired_keys: HashSet::new(),
            ids,
            vocabulary,
        };
        session.add_ingredient();
        session.add_direction();
        session
    }

    fn from_recipe(recipe: Recipe, ids: Arc<dyn IdGenerator>, vocabulary: TagVocabulary) -> Self {
        Self {
            id: recipe.id,
            existing: true,
            title: recipe.title,
            tags: dedupe(recipe.tags),
            description: recipe.description,
            picture: recipe.picture,
            ingredients: recipe.ingredients,
            directions: recipe.directions,
            date: recipe.date,
            cook_time: recipe.cook_time,
            servings: recipe.servings,
            retired_keys: HashSet::new(),
            ids,
            vocabulary,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the session started from a recipe already in the catalog.
    pub fn is_existing(&self) -> bool {
        self.existing
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn picture(&self) -> Option<&str> {
        self.picture.as_deref()
    }

    pub fn set_picture(&mut self, picture: Option<String>) {
        self.picture = picture.filter(|uri| !uri.trim().is_empty());
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn toggle_tag(&mut self, tag: &str) -> TagToggle {
        if !self.vocabulary.contains(tag) {
            tracing::warn!(tag, "ignoring tag outside the vocabulary");
            return TagToggle::Ignored;
        }
        match self.tags.iter().position(|t| t == tag) {
            Some(index) => {
                self.tags.remove(index);
                TagToggle::Removed
            }
            None => {
                self.tags.push(tag.to_owned());
                TagToggle::Added
            }
        }
    }

    pub fn date(&self) -> RecipeDate {
        self.date
    }

    pub fn cook_time(&self) -> CookTime {
        self.cook_time
    }

    pub fn set_cook_time(&mut self, cook_time: CookTime) {
        self.cook_time = cook_time;
    }

    pub fn set_days(&mut self, days: Option<i64>) {
        self.cook_time.days = days;
    }

    pub fn set_hours(&mut self, hours: Option<i64>) {
        self.cook_time.hours = hours;
    }

    pub fn set_minutes(&mut self, minutes: Option<i64>) {
        self.cook_time.minutes = minutes;
    }

    pub fn servings(&self) -> Option<i64> {
        self.servings
    }

    pub fn set_servings(&mut self, servings: Option<i64>) {
        self.servings = servings;
    }

    pub fn ingredients(&self) -> &IndexMap<String, IngredientLine> {
        &self.ingredients
    }

    /// Appends an empty ingredient line and returns its key.
    pub fn add_ingredient(&mut self) -> String {
        let key = self.fresh_key();
        self.ingredients.insert(key.clone(), IngredientLine::default());
        key
    }

    pub fn update_ingredient(
        &mut self,
        key: &str,
        field: IngredientField,
        value: impl Into<String>,
    ) -> bool {
        let Some(line) = self.ingredients.get_mut(key) else {
            return false;
        };
        match field {
            IngredientField::Amount => line.amount = value.into(),
            IngredientField::Ingredient => line.ingredient = value.into(),
        }
        true
    }

    pub fn remove_ingredient(&mut self, key: &str) -> bool {
        let removed = self.ingredients.shift_remove(key).is_some();
        if removed {
            self.retired_keys.insert(key.to_owned());
        }
        removed
    }

    pub fn directions(&self) -> &IndexMap<String, String> {
        &self.directions
    }

    pub fn add_direction(&mut self) -> String {
        let key = self.fresh_key();
        self.directions.insert(key.clone(), String::new());
        key
    }

    pub fn update_direction(&mut self, key: &str, text: impl Into<String>) -> bool {
        match self.directions.get_mut(key) {
            Some(step) => {
                *step = text.into();
                true
            }
            None => false,
        }
    }

    pub fn remove_direction(&mut self, key: &str) -> bool {
        let removed = self.directions.shift_remove(key).is_some();
        if removed {
            self.retired_keys.insert(key.to_owned());
        }
        removed
    }

    /// Drops ingredient and direction lines with nothing typed into them.
    pub fn prune_blank_lines(&mut self) -> usize {
        let blank_ingredients: Vec<String> = self
            .ingredients
            .iter()
            .filter(|(_, line)| line.amount.trim().is_empty() && line.ingredient.trim().is_empty())
            .map(|(key, _)| key.clone())
            .collect();
        let blank_directions: Vec<String> = self
            .directions
            .iter()
            .filter(|(_, step)| step.trim().is_empty())
            .map(|(key, _)| key.clone())
            .collect();
        let removed = blank_ingredients.len() + blank_directions.len();
        for key in blank_ingredients {
            self.remove_ingredient(&key);
        }
        for key in blank_directions {
            self.remove_direction(&key);
        }
        removed
    }

    /// The recipe this draft would save as on `today`, with the creation date
    /// filled in if it was never set and cook time normalized.
    pub fn materialize(&self, today: RecipeDate) -> Recipe {
        let date = if self.date.is_set() { self.date } else { today };
        Recipe {
            id: self.id.clone(),
            title: self.title.clone(),
            tags: self.tags.clone(),
            description: self.description.clone(),
            picture: self.picture.clone(),
            ingredients: self.ingredients.clone(),
            directions: self.directions.clone(),
            date,
            cook_time: self.cook_time.normalized(),
            servings: self.servings,
        }
    }

    pub fn commit(&mut self, catalog: &RecipeCatalog) -> Result<Recipe, CatalogError> {
        self.commit_on(catalog, RecipeDate::today())
    }

    /// Saves the draft through the catalog. The draft only adopts the
    /// assigned date and normalized cook time once the write succeeded; on
    /// failure it is left as it was so the caller can retry.
    pub fn commit_on(
        &mut self,
        catalog: &RecipeCatalog,
        today: RecipeDate,
    ) -> Result<Recipe, CatalogError> {
        let recipe = self.materialize(today);
        let outcome = catalog.upsert(recipe.clone())?;
        self.date = recipe.date;
        self.cook_time = recipe.cook_time;
        self.existing = true;
        tracing::debug!(id = %recipe.id, ?outcome, "committed editor session");
        Ok(recipe)
    }

    fn fresh_key(&mut self) -> String {
        let mut candidate = self.ids.next_id();
        for _ in 0..KEY_ATTEMPTS {
            if !self.key_taken(&candidate) {
                return candidate;
            }
            candidate = self.ids.next_id();
        }
        tracing::warn!(%candidate, "id generator keeps repeating line keys, suffixing");
        let mut n = 1u64;
        loop {
            let suffixed = format!("{candidate}-{n}");
            if !self.key_taken(&suffixed) {
                return suffixed;
            }
            n += 1;
        }
    }

    fn key_taken(&self, key: &str) -> bool {
        self.retired_keys.contains(key)
            || self.ingredients.contains_key(key)
            || self.directions.contains_key(key)
    }
}

fn dedupe(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

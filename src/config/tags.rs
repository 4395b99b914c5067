use indexmap::IndexSet;

const DEFAULT_TAGS: [&str; 12] = [
    "Breakfast",
    "Lunch",
    "Dinner",
    "Dessert",
    "Snack",
    "Appetizer",
    "Side",
    "Drink",
    "Vegetarian",
    "Vegan",
    "Gluten Free",
    "Quick",
];

/// The fixed set of tags a recipe may carry, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagVocabulary {
    names: IndexSet<String>,
}

impl TagVocabulary {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names
            .into_iter()
            .map(Into::into)
            .map(|name: String| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .collect();
        Self { names }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.names.contains(tag)
    }

    /// Looks up a tag typed on a command line: case-insensitive, with `_`
    /// standing in for spaces. Returns the canonical spelling.
    pub fn resolve(&self, raw: &str) -> Option<&str> {
        let wanted = raw.trim().replace('_', " ");
        self.names
            .iter()
            .find(|name| name.eq_ignore_ascii_case(&wanted))
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for TagVocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_TAGS)
    }
}

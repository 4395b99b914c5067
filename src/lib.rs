pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod editor;
pub mod highlight;
pub mod ids;
pub mod model;
pub mod search;
pub mod storage;

pub use catalog::{CatalogError, CatalogEvent, RecipeCatalog};
pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use editor::EditorSession;
pub use model::{CookTime, IngredientLine, Recipe, RecipeDate};
pub use storage::{KeyValueStore, RecipeStore, StoreError};

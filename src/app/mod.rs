//! Browsing state that sits between the catalog and whatever front end
//! renders the recipe list.

pub mod state;

pub use state::{BrowseState, RecipeSummary};

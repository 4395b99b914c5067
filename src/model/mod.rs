use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};
use time::{Date, OffsetDateTime};

mod lenient;

/// Placeholder shown when a recipe has no picture of its own.
pub const DEFAULT_PICTURE: &str = "asset://fork-and-spoon.png";

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "April", "May", "June", "July", "Aug", "Sept", "Oct", "Nov", "Dec",
];

pub type RecipeId = String;

/// One persisted recipe. Field names on the wire are kept verbatim
/// (`Id`, `Title`, `Tags`, ...) so existing stored blobs stay readable.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Recipe {
    pub id: RecipeId,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub title: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub ingredients: IndexMap<String, IngredientLine>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub directions: IndexMap<String, String>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub date: RecipeDate,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub cook_time: CookTime,
    #[serde(default, deserialize_with = "lenient::count")]
    pub servings: Option<i64>,
}

impl Recipe {
    /// A blank recipe carrying only its identity.
    pub fn new(id: impl Into<RecipeId>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            tags: Vec::new(),
            description: String::new(),
            picture: None,
            ingredients: IndexMap::new(),
            directions: IndexMap::new(),
            date: RecipeDate::default(),
            cook_time: CookTime::default(),
            servings: None,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn picture_or_default(&self) -> &str {
        self.picture
            .as_deref()
            .filter(|uri| !uri.is_empty())
            .unwrap_or(DEFAULT_PICTURE)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientLine {
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub ingredient: String,
}

impl IngredientLine {
    pub fn new(amount: impl Into<String>, ingredient: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            ingredient: ingredient.into(),
        }
    }
}

/// Calendar date with a 0-based month. All components are `None` until the
/// recipe is first saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDate {
    #[serde(default, deserialize_with = "lenient::count")]
    pub day: Option<i64>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub month: Option<i64>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub year: Option<i64>,
}

impl RecipeDate {
    pub fn from_date(date: Date) -> Self {
        Self {
            day: Some(i64::from(date.day())),
            month: Some(i64::from(u8::from(date.month())) - 1),
            year: Some(i64::from(date.year())),
        }
    }

    /// Today's date in the local offset, falling back to UTC when the local
    /// offset cannot be determined.
    pub fn today() -> Self {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        Self::from_date(now.date())
    }

    pub fn is_set(&self) -> bool {
        self.day.is_some() || self.month.is_some() || self.year.is_some()
    }
}

impl fmt::Display for RecipeDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (Some(day), Some(month), Some(year)) = (self.day, self.month, self.year) else {
            return f.write_str("-");
        };
        match usize::try_from(month).ok().and_then(|m| MONTH_NAMES.get(m)) {
            Some(name) => write!(f, "{day} {name} {year}"),
            None => write!(f, "{day} {month} {year}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookTime {
    #[serde(default, deserialize_with = "lenient::count")]
    pub days: Option<i64>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub hours: Option<i64>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub minutes: Option<i64>,
}

impl CookTime {
    pub fn new(days: Option<i64>, hours: Option<i64>, minutes: Option<i64>) -> Self {
        Self {
            days,
            hours,
            minutes,
        }
    }

    /// Rolls minutes over into hours and then hours over into days, so a
    /// chained overflow settles in one pass. Missing components count as 0
    /// only when something rolls into them; negative ones are clamped to 0.
    pub fn normalized(self) -> Self {
        let mut out = Self {
            days: self.days.map(|d| d.max(0)),
            hours: self.hours.map(|h| h.max(0)),
            minutes: self.minutes.map(|m| m.max(0)),
        };
        if let Some(minutes) = out.minutes.filter(|m| *m >= 60) {
            out.hours = Some(out.hours.unwrap_or(0).saturating_add(minutes / 60));
            out.minutes = Some(minutes % 60);
        }
        if let Some(hours) = out.hours.filter(|h| *h >= 24) {
            out.days = Some(out.days.unwrap_or(0).saturating_add(hours / 24));
            out.hours = Some(hours % 24);
        }
        out
    }

    /// Saturates at `i64::MAX` instead of overflowing on absurd stored values.
    pub fn total_minutes(&self) -> i64 {
        self.days
            .unwrap_or(0)
            .saturating_mul(1440)
            .saturating_add(self.hours.unwrap_or(0).saturating_mul(60))
            .saturating_add(self.minutes.unwrap_or(0))
    }

    pub fn is_empty(&self) -> bool {
        self.total_minutes() == 0
    }
}

impl fmt::Display for CookTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [(self.days, 'd'), (self.hours, 'h'), (self.minutes, 'm')]
            .into_iter()
            .filter_map(|(value, unit)| value.filter(|v| *v != 0).map(|v| format!("{v}{unit}")))
            .collect();
        if parts.is_empty() {
            f.write_str("-")
        } else {
            f.write_str(&parts.join(" "))
        }
    }
}

use std::fmt::Write as _;
use std::io;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::app::{BrowseState, RecipeSummary};
use crate::catalog::RecipeCatalog;
use crate::config::tags::TagVocabulary;
use crate::config::AppConfig;
use crate::editor::{EditorSession, IngredientField};
use crate::highlight::{build_highlight_regex, mark_matches};
use crate::ids::IdGenerator;
use crate::model::Recipe;
use crate::search::{parse_query, SortMode};

const HIGHLIGHT_ON: &str = "\x1b[1m";
const HIGHLIGHT_OFF: &str = "\x1b[0m";

/// Everything a subcommand needs once config and storage are up.
pub struct CommandContext {
    pub config: Arc<AppConfig>,
    pub catalog: RecipeCatalog,
    pub vocabulary: TagVocabulary,
    pub ids: Arc<dyn IdGenerator>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Search text; `tag:<name>` and `sort:<mode>` tokens are recognised
    #[arg()]
    pub query: Vec<String>,
    /// Sort mode (earlyLast, earlyFirst, cookTimeLow, cookTimeHigh, servingsLow, servingsHigh)
    #[arg(long)]
    pub sort: Option<SortMode>,
    /// Only show recipes carrying this tag (repeatable, all must match)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Limit the number of recipes printed
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Recipe identifier
    pub id: String,
}

/// Field flags shared by `new` and `edit`.
#[derive(Args, Debug, Clone, Default)]
pub struct RecipeFields {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Tag from the configured vocabulary (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Ingredient line as "AMOUNT|NAME" (repeatable)
    #[arg(long = "ingredient")]
    pub ingredients: Vec<String>,
    /// Direction step (repeatable)
    #[arg(long = "direction")]
    pub directions: Vec<String>,
    #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
    pub days: Option<i64>,
    #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
    pub hours: Option<i64>,
    #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
    pub minutes: Option<i64>,
    #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
    pub servings: Option<i64>,
    /// Picture URI
    #[arg(long)]
    pub picture: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct NewArgs {
    #[command(flatten)]
    pub fields: RecipeFields,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Recipe identifier
    pub id: String,
    #[command(flatten)]
    pub fields: RecipeFields,
    /// Add the tag if missing, remove it if present (repeatable)
    #[arg(long = "toggle-tag")]
    pub toggle_tags: Vec<String>,
    /// Remove the ingredient line with this key (repeatable)
    #[arg(long = "remove-ingredient")]
    pub remove_ingredients: Vec<String>,
    /// Remove the direction step with this key (repeatable)
    #[arg(long = "remove-direction")]
    pub remove_directions: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Recipe identifier
    pub id: String,
    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub yes: bool,
}

pub fn list_recipes(ctx: &CommandContext, args: ListArgs) -> Result<()> {
    let highlight = atty::is(atty::Stream::Stdout);
    print!("{}", run_list(ctx, &args, highlight)?);
    Ok(())
}

fn run_list(ctx: &CommandContext, args: &ListArgs, highlight: bool) -> Result<String> {
    let raw_query = args.query.join(" ");
    let mut query = parse_query(&raw_query);
    let sort_in_query = raw_query
        .split_whitespace()
        .any(|token| token.starts_with("sort:"));
    query.sort = match args.sort {
        Some(sort) => sort,
        None if sort_in_query => query.sort,
        None => ctx.config.default_sort,
    };
    let mut tags = Vec::new();
    for raw in query.tags.iter().chain(args.tags.iter()) {
        let tag = resolve_tag(&ctx.vocabulary, raw)?;
        if !tags.iter().any(|existing| existing == tag) {
            tags.push(tag.to_owned());
        }
    }
    query.tags = tags;

    let state = BrowseState::from_query(query);
    let recipes = ctx.catalog.get_all();
    let limit = args.limit.unwrap_or(ctx.config.search.max_results);
    let summaries: Vec<RecipeSummary> = state.summaries(&recipes).into_iter().take(limit).collect();
    let regex = if highlight {
        build_highlight_regex(state.search_text())
    } else {
        None
    };
    Ok(format_summaries(&summaries, &state.filter_chips(), regex.as_ref()))
}

fn format_summaries(
    summaries: &[RecipeSummary],
    chips: &[String],
    highlight: Option<&regex::Regex>,
) -> String {
    let mut out = String::new();
    if !chips.is_empty() {
        let _ = writeln!(&mut out, "Filters: {}\n", chips.join(" "));
    }
    if summaries.is_empty() {
        out.push_str("No recipes found.\n");
        return out;
    }
    for summary in summaries {
        let title = match highlight {
            Some(regex) => mark_matches(&summary.title, regex, HIGHLIGHT_ON, HIGHLIGHT_OFF),
            None => summary.title.clone(),
        };
        let _ = writeln!(&mut out, "{}  ({})", display_title(&title), summary.id);
        let _ = writeln!(&mut out, "    {}", summary.added);
        let mut facts = format!("    cook time {}", summary.cook_time);
        if let Some(servings) = summary.servings {
            let _ = write!(&mut facts, " | serves {servings}");
        }
        let _ = writeln!(&mut out, "{facts}");
        if !summary.tags.is_empty() {
            let _ = writeln!(&mut out, "    tags    {}", format_tags(&summary.tags));
        }
        out.push('\n');
    }
    out
}

pub fn show_recipe(ctx: &CommandContext, args: ShowArgs) -> Result<()> {
    let recipe = find_recipe(&ctx.catalog, &args.id)?;
    print!("{}", format_recipe(&recipe));
    Ok(())
}

fn format_recipe(recipe: &Recipe) -> String {
    let mut out = String::new();
    let _ = writeln!(&mut out, "{}", display_title(&recipe.title));
    let _ = writeln!(&mut out, "Recipe added: {}", recipe.date);
    if !recipe.tags.is_empty() {
        let _ = writeln!(&mut out, "Tags: {}", recipe.tags.join(", "));
    }
    let _ = writeln!(&mut out, "Cook time: {}", recipe.cook_time);
    if let Some(servings) = recipe.servings {
        let _ = writeln!(&mut out, "Servings: {servings}");
    }
    let _ = writeln!(&mut out, "Picture: {}", recipe.picture_or_default());
    if !recipe.description.trim().is_empty() {
        let _ = writeln!(&mut out, "\n{}", recipe.description.trim());
    }
    out.push_str("\nIngredients\n");
    for (key, line) in &recipe.ingredients {
        let text = [line.amount.trim(), line.ingredient.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(&mut out, "  - {text}  [{key}]");
    }
    out.push_str("\nDirections\n");
    for (index, (key, step)) in recipe.directions.iter().enumerate() {
        let _ = writeln!(&mut out, "  {}. {}  [{key}]", index + 1, step.trim());
    }
    out
}

pub fn new_recipe(ctx: &CommandContext, args: NewArgs) -> Result<()> {
    let message = run_new(ctx, args)?;
    println!("{message}");
    Ok(())
}

fn run_new(ctx: &CommandContext, args: NewArgs) -> Result<String> {
    let title = args.fields.title.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        bail!("recipe title cannot be empty");
    }
    let mut session = EditorSession::create(Arc::clone(&ctx.ids), ctx.vocabulary.clone());
    apply_fields(ctx, &mut session, &args.fields)?;
    session.prune_blank_lines();
    let recipe = session.commit(&ctx.catalog).context("saving new recipe")?;
    Ok(format!("Created recipe '{}' ({})", recipe.title, recipe.id))
}

pub fn edit_recipe(ctx: &CommandContext, args: EditArgs) -> Result<()> {
    let message = run_edit(ctx, args)?;
    println!("{message}");
    Ok(())
}

fn run_edit(ctx: &CommandContext, args: EditArgs) -> Result<String> {
    find_recipe(&ctx.catalog, &args.id)?;
    let mut session = EditorSession::open(
        &ctx.catalog,
        &args.id,
        Arc::clone(&ctx.ids),
        ctx.vocabulary.clone(),
    );
    for key in &args.remove_ingredients {
        if !session.remove_ingredient(key) {
            bail!("recipe {} has no ingredient line {key}", args.id);
        }
    }
    for key in &args.remove_directions {
        if !session.remove_direction(key) {
            bail!("recipe {} has no direction step {key}", args.id);
        }
    }
    apply_fields(ctx, &mut session, &args.fields)?;
    for raw in &args.toggle_tags {
        let tag = resolve_tag(&ctx.vocabulary, raw)?;
        session.toggle_tag(tag);
    }
    let recipe = session
        .commit(&ctx.catalog)
        .with_context(|| format!("saving recipe {}", args.id))?;
    Ok(format!("Updated recipe '{}' ({})", recipe.title, recipe.id))
}

fn apply_fields(
    ctx: &CommandContext,
    session: &mut EditorSession,
    fields: &RecipeFields,
) -> Result<()> {
    if let Some(title) = &fields.title {
        session.set_title(title.trim());
    }
    if let Some(description) = &fields.description {
        session.set_description(description.as_str());
    }
    if let Some(picture) = &fields.picture {
        session.set_picture(Some(picture.clone()));
    }
    for raw in &fields.tags {
        let tag = resolve_tag(&ctx.vocabulary, raw)?;
        if !session.tags().iter().any(|existing| existing == tag) {
            session.toggle_tag(tag);
        }
    }
    for raw in &fields.ingredients {
        let (amount, name) = split_ingredient(raw);
        let key = next_blank_ingredient(session).unwrap_or_else(|| session.add_ingredient());
        session.update_ingredient(&key, IngredientField::Amount, amount);
        session.update_ingredient(&key, IngredientField::Ingredient, name);
    }
    for step in &fields.directions {
        let key = next_blank_direction(session).unwrap_or_else(|| session.add_direction());
        session.update_direction(&key, step.trim());
    }
    if fields.days.is_some() {
        session.set_days(fields.days);
    }
    if fields.hours.is_some() {
        session.set_hours(fields.hours);
    }
    if fields.minutes.is_some() {
        session.set_minutes(fields.minutes);
    }
    if fields.servings.is_some() {
        session.set_servings(fields.servings);
    }
    Ok(())
}

fn next_blank_ingredient(session: &EditorSession) -> Option<String> {
    session
        .ingredients()
        .iter()
        .find(|(_, line)| line.amount.is_empty() && line.ingredient.is_empty())
        .map(|(key, _)| key.clone())
}

fn next_blank_direction(session: &EditorSession) -> Option<String> {
    session
        .directions()
        .iter()
        .find(|(_, step)| step.is_empty())
        .map(|(key, _)| key.clone())
}

fn split_ingredient(raw: &str) -> (&str, &str) {
    match raw.split_once('|') {
        Some((amount, name)) => (amount.trim(), name.trim()),
        None => ("", raw.trim()),
    }
}

pub fn delete_recipe(ctx: &CommandContext, args: DeleteArgs) -> Result<()> {
    let yes = args.yes;
    let message = run_delete(ctx, &args.id, |title| {
        if yes {
            return Ok(true);
        }
        if !atty::is(atty::Stream::Stdin) {
            bail!("refusing to delete without confirmation; pass --yes");
        }
        let answer = prompt(&delete_prompt(title))?;
        Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES" | "Yes"))
    })?;
    println!("{message}");
    Ok(())
}

fn run_delete<F>(ctx: &CommandContext, id: &str, confirm: F) -> Result<String>
where
    F: FnOnce(&str) -> Result<bool>,
{
    let recipe = find_recipe(&ctx.catalog, id)?;
    if !confirm(&recipe.title)? {
        return Ok("Delete cancelled.".to_string());
    }
    ctx.catalog
        .delete(id)
        .with_context(|| format!("deleting recipe {id}"))?;
    Ok(format!("Deleted recipe '{}' ({id})", recipe.title))
}

fn delete_prompt(title: &str) -> String {
    format!("Are you sure? Delete recipe: {}? [y/N]", display_title(title))
}

pub fn list_tags(ctx: &CommandContext) -> Result<()> {
    print!("{}", format_tag_usage(&ctx.vocabulary, &ctx.catalog.get_all()));
    Ok(())
}

fn format_tag_usage(vocabulary: &TagVocabulary, recipes: &[Recipe]) -> String {
    let mut out = String::new();
    for tag in vocabulary.iter() {
        let count = recipes.iter().filter(|recipe| recipe.has_tag(tag)).count();
        let plural = if count == 1 { "" } else { "s" };
        let _ = writeln!(&mut out, "{tag}  ({count} recipe{plural})");
    }
    out
}

fn resolve_tag<'a>(vocabulary: &'a TagVocabulary, raw: &str) -> Result<&'a str> {
    match vocabulary.resolve(raw) {
        Some(tag) => Ok(tag),
        None => bail!(
            "unknown tag '{}' (known tags: {})",
            raw.trim(),
            vocabulary.iter().collect::<Vec<_>>().join(", ")
        ),
    }
}

fn find_recipe(catalog: &RecipeCatalog, id: &str) -> Result<Recipe> {
    match catalog.get_by_id(id) {
        Some(recipe) => Ok(recipe),
        None => bail!("recipe {id} not found"),
    }
}

fn display_title(title: &str) -> &str {
    if title.trim().is_empty() {
        "<untitled>"
    } else {
        title
    }
}

fn format_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| format!("#{}", tag.replace(' ', "_")))
        .collect::<Vec<_>>()
        .join(" ")
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    let mut stdout = io::stdout();
    write!(stdout, "{label} ")?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}

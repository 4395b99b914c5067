fn main() -> anyhow::Result<()> {
    recipe_box::cli::run()
}

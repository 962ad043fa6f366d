use anyhow::Result;
use coach_core::{AssistantStore, CoachConfig};

pub fn run(name: &str) -> Result<()> {
    let config = CoachConfig::load()?;
    let store = AssistantStore::load(&config.assistants_path())?;

    print!("{}", store.raw_template(name)?);

    Ok(())
}

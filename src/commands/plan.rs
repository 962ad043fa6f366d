use anyhow::Result;
use coach_core::Orchestrator;

use crate::utils::tui;

pub async fn run(orchestrator: &Orchestrator) -> Result<()> {
    let experts = orchestrator.config().expert_assistants.len();
    let spinner = tui::create_spinner(format!("Consulting {} experts", experts));
    let result = orchestrator.weekly_plan().await;
    spinner.finish_and_clear();

    println!("{}", result?);

    Ok(())
}

//! Fan-out to the expert assistants and merge their advice into a weekly plan.

use std::collections::BTreeMap;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tracing::{debug, error, info};

use crate::error::CoachResult;
use crate::gpt::TextGenerator;

const PLANNER_PREAMBLE: &str = "Aquí están las recomendaciones de los expertos para la semana:";

/// Ask every assistant in `names` the same `query` concurrently.
///
/// All names are checked before any request goes out. The first failure
/// aborts the batch; remaining requests are dropped. Results are keyed by
/// name, so iteration order never depends on completion order.
pub async fn assemble(
    generator: &dyn TextGenerator,
    names: &[String],
    query: &str,
) -> CoachResult<BTreeMap<String, String>> {
    generator
        .assistants()
        .require(names.iter().map(String::as_str))?;

    info!(experts = %names.join(", "), "Consulting experts in parallel");

    let mut pending: FuturesUnordered<_> = names
        .iter()
        .map(|name| async move { (name, generator.generate(name, query).await) })
        .collect();

    let mut responses = BTreeMap::new();
    while let Some((name, result)) = pending.next().await {
        match result {
            Ok(text) => {
                info!(expert = %name, "Response received");
                responses.insert(name.clone(), text);
            }
            Err(e) => {
                error!(expert = %name, error = %e, "Expert query failed");
                return Err(e);
            }
        }
    }

    Ok(responses)
}

/// Merge expert responses into the planner's input, ordered by expert name.
pub fn build_planner_prompt(responses: &BTreeMap<String, String>) -> String {
    let mut parts = vec![PLANNER_PREAMBLE.to_string()];
    for (name, response) in responses {
        let title = capitalize(name);
        parts.push(format!(
            "\n--- Recomendación de '{title}' ---\n{response}\n--- Fin Recomendación '{title}' ---"
        ));
    }
    parts.join("\n")
}

/// Consult the experts, then have the planner integrate their advice.
pub async fn weekly_plan(
    generator: &dyn TextGenerator,
    experts: &[String],
    planner: &str,
    query: &str,
) -> CoachResult<String> {
    generator.assistants().require(
        experts
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(planner)),
    )?;

    let responses = assemble(generator, experts, query).await?;
    let prompt = build_planner_prompt(&responses);
    debug!(prompt = %prompt, "Planner prompt");

    info!(assistant = planner, "Integrating recommendations");
    let plan = generator.generate(planner, &prompt).await?;
    info!("Weekly plan received");
    Ok(plan)
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoachError;
    use crate::testing::ScriptedGenerator;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_assemble_collects_every_expert() {
        let generator = ScriptedGenerator::new(["deporte", "nutri"])
            .respond("deporte", "Corre")
            .respond("nutri", "Come");

        let responses = assemble(&generator, &names(&["nutri", "deporte"]), "¿plan?")
            .await
            .unwrap();

        assert_eq!(
            responses.into_iter().collect::<Vec<_>>(),
            vec![
                ("deporte".to_string(), "Corre".to_string()),
                ("nutri".to_string(), "Come".to_string())
            ]
        );
        assert!(generator.calls().iter().all(|(_, query)| query == "¿plan?"));
    }

    #[tokio::test]
    async fn test_one_failure_fails_the_batch() {
        let generator = ScriptedGenerator::new(["deporte", "estres", "medico", "nutri"]).fail("medico");

        let err = assemble(
            &generator,
            &names(&["deporte", "estres", "medico", "nutri"]),
            "¿plan?",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CoachError::Generation { assistant, .. } if assistant == "medico"));
    }

    #[tokio::test]
    async fn test_missing_expert_makes_no_calls() {
        let generator = ScriptedGenerator::new(["deporte", "planner"]);

        let err = weekly_plan(&generator, &names(&["deporte", "nutri"]), "planner", "¿plan?")
            .await
            .unwrap_err();

        assert!(matches!(err, CoachError::MissingTemplates { names, .. } if names == vec!["nutri"]));
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_planner_makes_no_calls() {
        let generator = ScriptedGenerator::new(["deporte"]);

        let err = weekly_plan(&generator, &names(&["deporte"]), "planner", "¿plan?")
            .await
            .unwrap_err();

        assert!(matches!(err, CoachError::MissingTemplates { .. }));
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_weekly_plan_feeds_merged_prompt_to_planner() {
        let generator = ScriptedGenerator::new(["estres", "deporte", "planner"])
            .respond("estres", "Medita")
            .respond("deporte", "Corre")
            .respond("planner", "Plan final");

        let plan = weekly_plan(&generator, &names(&["estres", "deporte"]), "planner", "q")
            .await
            .unwrap();

        assert_eq!(plan, "Plan final");
        let calls = generator.calls();
        let (template, prompt) = calls.last().unwrap();
        assert_eq!(template, "planner");
        assert!(prompt.starts_with(PLANNER_PREAMBLE));
        let deporte = prompt.find("--- Recomendación de 'Deporte' ---").unwrap();
        let estres = prompt.find("--- Recomendación de 'Estres' ---").unwrap();
        assert!(deporte < estres);
    }

    #[test]
    fn test_planner_prompt_layout() {
        let responses = BTreeMap::from([("nutri".to_string(), "Come verduras".to_string())]);

        assert_eq!(
            build_planner_prompt(&responses),
            "Aquí están las recomendaciones de los expertos para la semana:\n\n\
             --- Recomendación de 'Nutri' ---\nCome verduras\n--- Fin Recomendación 'Nutri' ---"
        );
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("deporte"), "Deporte");
        assert_eq!(capitalize("ESTRES"), "Estres");
        assert_eq!(capitalize(""), "");
    }
}

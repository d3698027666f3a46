//! Scenario runner – execute scripted flows from YAML files.
//!
//! Steps run strictly one after another; no two scripts are ever in
//! flight against the target app at the same time.

use crate::commands::CommandRegistry;
use crate::context::AppContext;
use crate::probes;
use crate::types::*;

/// Load a scenario from a YAML string.
pub fn load_scenario(yaml: &str) -> Result<Scenario, String> {
    serde_yaml::from_str(yaml).map_err(|e| format!("failed to parse scenario YAML: {}", e))
}

/// Execute a scenario and return the overall result.
pub async fn run_scenario(
    scenario: &Scenario,
    ctx: &AppContext,
    registry: &CommandRegistry,
) -> ScenarioResult {
    let mut step_results = Vec::new();
    let mut overall = Status::Pass;

    for (i, step) in scenario.steps.iter().enumerate() {
        let result = match step {
            ScenarioStep::Call {
                call,
                args,
                expect_status,
            } => {
                let r = registry.execute(call, args.clone(), ctx).await;
                if r.status != *expect_status {
                    tracing::warn!(
                        step = i,
                        command = %call,
                        expected = ?expect_status,
                        actual = ?r.status,
                        "scenario step status mismatch"
                    );
                    overall = Status::Fail;
                }
                r
            }
            ScenarioStep::Probe { probe } => {
                let r = probes::run_probe(probe, ctx).await;
                if r.status != Status::Pass && r.status != Status::Skip {
                    overall = Status::Fail;
                }
                r
            }
        };
        step_results.push(result);
    }

    ScenarioResult {
        name: scenario.name.clone(),
        overall_status: overall,
        step_results,
    }
}

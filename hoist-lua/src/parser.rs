//! Workflow parser
//!
//! Evaluates a Lua workflow definition in the sandbox and converts the
//! resulting table into a `WorkflowDefinition`.

use anyhow::{Context, Result};
use hoist_core::domain::step::{StepAction, StepDefinition};
use hoist_core::domain::workflow::{ImageConfig, RegistryConfig, TriggerConfig, WorkflowDefinition};
use mlua::{Table, Value};

use crate::sandbox::create_sandbox;

/// Parse a workflow from Lua source code
///
/// # Errors
/// Returns an error if:
/// - The Lua source is invalid or does not return a table
/// - Required fields are missing (name, on, image, steps)
/// - No trigger is enabled, or the push allow-list is empty
/// - A step names an unknown action, or sets both/neither of `uses` and `run`
///
/// # Example
/// ```no_run
/// use hoist_lua::parser::parse_workflow;
///
/// let source = r#"
///     return workflow.define {
///         name = "Docker Image CI",
///         on = { push = { branches = { "main", "dev" } }, manual = true },
///         image = { name = "thunder", tag = "latest" },
///         steps = {
///             workflow.checkout(),
///             workflow.build(),
///             workflow.push(),
///         },
///     }
/// "#;
///
/// let workflow = parse_workflow(source)?;
/// assert_eq!(workflow.steps.len(), 3);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn parse_workflow(source: &str) -> Result<WorkflowDefinition> {
    let lua = create_sandbox().context("Failed to create workflow sandbox")?;

    let definition: Table = lua
        .load(source)
        .set_name("workflow")
        .eval()
        .context("Failed to evaluate workflow definition")?;

    let name: String = definition
        .get("name")
        .context("Workflow must have a 'name' field")?;

    let description: Option<String> = definition
        .get("description")
        .context("Field 'description' must be a string")?;

    let triggers = parse_triggers(&definition)?;
    let registry = parse_registry(&definition)?;
    let image = parse_image(&definition)?;
    let steps = parse_steps(&definition)?;

    Ok(WorkflowDefinition {
        name,
        description,
        triggers,
        registry,
        image,
        steps,
    })
}

/// Number of branches a push trigger allow-lists
const PUSH_BRANCH_COUNT: usize = 2;

/// Parse the 'on' table
fn parse_triggers(definition: &Table) -> Result<TriggerConfig> {
    let on: Table = definition
        .get("on")
        .context("Workflow must have an 'on' table declaring its triggers")?;

    let push_branches = match on.get::<Value>("push")? {
        Value::Nil => Vec::new(),
        Value::Table(push) => {
            let branches: Table = push
                .get("branches")
                .context("Trigger 'push' must have a 'branches' array")?;

            let mut names = Vec::new();
            for branch in branches.sequence_values::<String>() {
                names.push(branch.context("Failed to read push branch")?);
            }

            if names.len() != PUSH_BRANCH_COUNT {
                anyhow::bail!(
                    "Trigger 'push' must list exactly {} branches, found {}",
                    PUSH_BRANCH_COUNT,
                    names.len()
                );
            }
            if names[0] == names[1] {
                anyhow::bail!("Trigger 'push' lists branch '{}' twice", names[0]);
            }
            names
        }
        _ => anyhow::bail!("Trigger 'push' must be a table"),
    };

    let manual = match on.get::<Value>("manual")? {
        Value::Nil => false,
        Value::Boolean(enabled) => enabled,
        _ => anyhow::bail!("Trigger 'manual' must be a boolean"),
    };

    if push_branches.is_empty() && !manual {
        anyhow::bail!("Workflow must enable at least one trigger");
    }

    Ok(TriggerConfig {
        push_branches,
        manual,
    })
}

/// Parse the optional 'registry' table
fn parse_registry(definition: &Table) -> Result<RegistryConfig> {
    let defaults = RegistryConfig::default();

    let registry = match definition.get::<Value>("registry")? {
        Value::Nil => return Ok(defaults),
        Value::Table(table) => table,
        _ => anyhow::bail!("Field 'registry' must be a table"),
    };

    let host: Option<String> = registry
        .get("host")
        .context("Registry 'host' must be a string")?;
    let username: Option<String> = registry
        .get("username")
        .context("Registry 'username' must name a secret")?;
    let password: Option<String> = registry
        .get("password")
        .context("Registry 'password' must name a secret")?;

    Ok(RegistryConfig {
        host: host.unwrap_or(defaults.host),
        username_secret: username.unwrap_or(defaults.username_secret),
        password_secret: password.unwrap_or(defaults.password_secret),
    })
}

/// Parse the 'image' table
fn parse_image(definition: &Table) -> Result<ImageConfig> {
    let image: Table = definition
        .get("image")
        .context("Workflow must have an 'image' table")?;

    let name: String = image
        .get("name")
        .context("Image must have a 'name' field")?;
    let tag: String = image.get("tag").context("Image must have a 'tag' field")?;
    let repository: Option<String> = image
        .get("repository")
        .context("Image 'repository' must be a string")?;

    if name.trim().is_empty() {
        anyhow::bail!("Image 'name' cannot be empty");
    }
    if tag.trim().is_empty() {
        anyhow::bail!("Image 'tag' cannot be empty");
    }

    Ok(ImageConfig {
        name,
        repository,
        tag,
    })
}

/// Parse the 'steps' array, preserving declaration order
fn parse_steps(definition: &Table) -> Result<Vec<StepDefinition>> {
    let steps_table: Table = definition
        .get("steps")
        .context("Workflow must have a 'steps' field")?;

    let mut steps = Vec::new();

    for (idx, entry) in steps_table.sequence_values::<Table>().enumerate() {
        let step_table = entry.context("Failed to read step entry")?;
        let step = parse_step(&step_table).with_context(|| format!("Invalid step #{}", idx + 1))?;
        steps.push(step);
    }

    if steps.is_empty() {
        anyhow::bail!("Workflow must have at least one step");
    }

    Ok(steps)
}

fn parse_step(step: &Table) -> Result<StepDefinition> {
    let uses: Option<String> = step.get("uses").context("Step 'uses' must be a string")?;
    let run: Option<String> = step.get("run").context("Step 'run' must be a string")?;
    let name: Option<String> = step.get("name").context("Step 'name' must be a string")?;

    let action = match (uses, run) {
        (Some(_), Some(_)) => anyhow::bail!("Step cannot set both 'uses' and 'run'"),
        (None, None) => anyhow::bail!("Step must set either 'uses' or 'run'"),
        (None, Some(command)) => StepAction::Run { command },
        (Some(uses), None) => parse_action(&uses, step)?,
    };

    let name = name.unwrap_or_else(|| action.kind().to_string());

    Ok(StepDefinition { name, action })
}

fn parse_action(uses: &str, step: &Table) -> Result<StepAction> {
    let action = match uses {
        "checkout" => StepAction::Checkout {
            repository: step
                .get("repository")
                .context("Checkout 'repository' must be a string")?,
            reference: step.get("ref").context("Checkout 'ref' must be a string")?,
        },
        "setup-builder" => StepAction::SetupBuilder,
        "registry-login" => StepAction::RegistryLogin,
        "build" => {
            let context: Option<String> = step
                .get("context")
                .context("Build 'context' must be a string")?;
            let file: Option<String> = step.get("file").context("Build 'file' must be a string")?;
            StepAction::Build {
                context: context.unwrap_or_else(|| ".".to_string()),
                file: file.unwrap_or_else(|| "Dockerfile".to_string()),
            }
        }
        "tag" => StepAction::Tag,
        "push" => StepAction::Push,
        other => anyhow::bail!("Unknown step action '{}'", other),
    };

    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCKER_IMAGE_WORKFLOW: &str = r#"
        return workflow.define {
            name = "Docker Image CI",
            description = "Build and publish the bot image",
            on = {
                push = { branches = { "main", "dev" } },
                manual = true,
            },
            registry = {
                username = "DOCKER_USERNAME",
                password = "DOCKER_PASSWORD",
            },
            image = { name = "thunder", tag = "latest" },
            steps = {
                workflow.checkout(),
                workflow.setup_builder(),
                workflow.login(),
                workflow.build { name = "Build image" },
                workflow.tag(),
                workflow.push(),
            },
        }
    "#;

    #[test]
    fn test_parse_full_workflow() {
        let workflow = parse_workflow(DOCKER_IMAGE_WORKFLOW).unwrap();

        assert_eq!(workflow.name, "Docker Image CI");
        assert_eq!(
            workflow.description,
            Some("Build and publish the bot image".to_string())
        );
        assert_eq!(workflow.triggers.push_branches, vec!["main", "dev"]);
        assert!(workflow.triggers.manual);
        assert_eq!(workflow.registry.host, "docker.io");
        assert_eq!(workflow.registry.username_secret, "DOCKER_USERNAME");
        assert_eq!(workflow.registry.password_secret, "DOCKER_PASSWORD");
        assert_eq!(workflow.image.name, "thunder");
        assert_eq!(workflow.image.tag, "latest");
        assert_eq!(workflow.image.repository, None);

        let kinds: Vec<&str> = workflow.steps.iter().map(|s| s.action.kind()).collect();
        assert_eq!(
            kinds,
            vec!["checkout", "setup-builder", "registry-login", "build", "tag", "push"]
        );
        assert_eq!(workflow.steps[3].name, "Build image");
        assert_eq!(
            workflow.steps[3].action,
            StepAction::Build {
                context: ".".to_string(),
                file: "Dockerfile".to_string()
            }
        );
        assert_eq!(workflow.steps[0].name, "checkout");
    }

    #[test]
    fn test_parse_plain_tables_and_run_steps() {
        let source = r#"
            return {
                name = "plain",
                on = { manual = true },
                image = { name = "app", tag = "1.2.3", repository = "ghcr.io/acme/app" },
                steps = {
                    { uses = "checkout", ref = "release" },
                    { name = "Lint", run = "make lint" },
                },
            }
        "#;

        let workflow = parse_workflow(source).unwrap();
        assert!(workflow.triggers.push_branches.is_empty());
        assert!(workflow.triggers.manual);
        assert_eq!(
            workflow.image.repository,
            Some("ghcr.io/acme/app".to_string())
        );
        assert_eq!(
            workflow.steps[0].action,
            StepAction::Checkout {
                repository: None,
                reference: Some("release".to_string())
            }
        );
        assert_eq!(workflow.steps[1].name, "Lint");
        assert_eq!(
            workflow.steps[1].action,
            StepAction::Run {
                command: "make lint".to_string()
            }
        );
    }

    #[test]
    fn test_shipped_workflow() {
        let workflow = parse_workflow(include_str!("../../hoist.lua")).unwrap();

        assert_eq!(workflow.triggers.push_branches.len(), 2);
        assert!(workflow.triggers.manual);
        assert_eq!(workflow.image.tag, "latest");

        let kinds: Vec<&str> = workflow.steps.iter().map(|s| s.action.kind()).collect();
        assert_eq!(
            kinds,
            vec!["checkout", "setup-builder", "registry-login", "build", "tag", "push"]
        );
    }

    #[test]
    fn test_parse_missing_name() {
        let source = r#"
            return {
                on = { manual = true },
                image = { name = "app", tag = "latest" },
                steps = { { uses = "build" } },
            }
        "#;

        let err = parse_workflow(source).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_parse_requires_a_trigger() {
        let source = r#"
            return {
                name = "no triggers",
                on = {},
                image = { name = "app", tag = "latest" },
                steps = { { uses = "build" } },
            }
        "#;

        let err = parse_workflow(source).unwrap_err();
        assert!(err.to_string().contains("at least one trigger"));
    }

    #[test]
    fn test_parse_empty_branch_list() {
        let source = r#"
            return {
                name = "empty push",
                on = { push = { branches = {} } },
                image = { name = "app", tag = "latest" },
                steps = { { uses = "build" } },
            }
        "#;

        let err = parse_workflow(source).unwrap_err();
        assert!(err.to_string().contains("exactly 2 branches"));
    }

    #[test]
    fn test_parse_push_needs_two_distinct_branches() {
        let single = r#"
            return {
                name = "one branch",
                on = { push = { branches = { "main" } } },
                image = { name = "app", tag = "latest" },
                steps = { { uses = "build" } },
            }
        "#;
        let err = parse_workflow(single).unwrap_err();
        assert!(err.to_string().contains("found 1"));

        let three = single.replace(r#"{ "main" }"#, r#"{ "main", "dev", "qa" }"#);
        let err = parse_workflow(&three).unwrap_err();
        assert!(err.to_string().contains("found 3"));

        let duplicate = single.replace(r#"{ "main" }"#, r#"{ "main", "main" }"#);
        let err = parse_workflow(&duplicate).unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn test_parse_missing_tag() {
        let source = r#"
            return {
                name = "untagged",
                on = { manual = true },
                image = { name = "app" },
                steps = { { uses = "build" } },
            }
        "#;

        let err = parse_workflow(source).unwrap_err();
        assert!(err.to_string().contains("tag"));
    }

    #[test]
    fn test_parse_empty_steps() {
        let source = r#"
            return {
                name = "nothing",
                on = { manual = true },
                image = { name = "app", tag = "latest" },
                steps = {},
            }
        "#;

        let err = parse_workflow(source).unwrap_err();
        assert!(err.to_string().contains("at least one step"));
    }

    #[test]
    fn test_parse_unknown_action() {
        let source = r#"
            return {
                name = "bad",
                on = { manual = true },
                image = { name = "app", tag = "latest" },
                steps = { { uses = "deploy" } },
            }
        "#;

        let err = parse_workflow(source).unwrap_err();
        assert!(format!("{:#}", err).contains("Unknown step action 'deploy'"));
    }

    #[test]
    fn test_parse_step_with_uses_and_run() {
        let source = r#"
            return {
                name = "bad",
                on = { manual = true },
                image = { name = "app", tag = "latest" },
                steps = { { uses = "build", run = "make" } },
            }
        "#;

        let err = parse_workflow(source).unwrap_err();
        assert!(format!("{:#}", err).contains("both 'uses' and 'run'"));
    }

    #[test]
    fn test_parse_invalid_lua() {
        assert!(parse_workflow("this is not valid lua!!!").is_err());
    }

    #[test]
    fn test_parse_not_returning_table() {
        assert!(parse_workflow(r#"return "not a table""#).is_err());
    }
}

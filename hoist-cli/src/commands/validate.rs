//! Validate command handler

use anyhow::Result;
use colored::*;

use super::load_workflow;
use crate::config::Config;

/// Handle `hoist validate`
pub fn handle_validate(config: &Config) -> Result<i32> {
    let workflow = load_workflow(&config.workflow_path)?;

    println!("{}", "✓ Workflow is valid".green().bold());
    println!("  Name:     {}", workflow.name.bold());
    if let Some(description) = &workflow.description {
        println!("  About:    {}", description.dimmed());
    }

    let mut triggers = Vec::new();
    if !workflow.triggers.push_branches.is_empty() {
        triggers.push(format!("push [{}]", workflow.triggers.push_branches.join(", ")));
    }
    if workflow.triggers.manual {
        triggers.push("manual".to_string());
    }
    println!("  Triggers: {}", triggers.join(", ").cyan());

    println!(
        "  Registry: {} {}",
        workflow.registry.host,
        format!(
            "(secrets: {}, {})",
            workflow.registry.username_secret, workflow.registry.password_secret
        )
        .dimmed()
    );

    let username_placeholder = format!("${}", workflow.registry.username_secret);
    let reference = workflow
        .image
        .publish_reference(&workflow.registry, Some(username_placeholder.as_str()));
    println!("  Image:    {} → {}", workflow.image.name, reference.cyan());

    println!("  Steps:");
    for (idx, step) in workflow.steps.iter().enumerate() {
        println!(
            "    {}. {} {}",
            idx + 1,
            step.name,
            format!("({})", step.action.kind()).dimmed()
        );
    }

    Ok(0)
}

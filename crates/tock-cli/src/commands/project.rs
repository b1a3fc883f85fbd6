use tock_core::models::ProjectPatch;

use crate::cli::ProjectCommands;
use crate::commands::common::{format_project_lines, resolve_project, AppContext};
use crate::error::CliError;

pub async fn run_project(command: ProjectCommands, ctx: &AppContext) -> Result<(), CliError> {
    match command {
        ProjectCommands::Add {
            name,
            subtitle,
            color,
        } => {
            let project = ctx
                .store
                .create_project(&name, subtitle.as_deref(), color.as_deref())
                .await?;
            println!("{}", project.id);
            ctx.sync_after_change().await?;
        }
        ProjectCommands::List { json } => {
            let projects = ctx.store.list_projects().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&projects)?);
            } else if projects.is_empty() {
                println!("No projects yet. Create one with `tock project add <name>`.");
            } else {
                for line in format_project_lines(&projects) {
                    println!("{line}");
                }
            }
        }
        ProjectCommands::Edit {
            id,
            name,
            subtitle,
            color,
        } => {
            let project = resolve_project(&ctx.store, &id).await?;
            let patch = ProjectPatch {
                name,
                subtitle,
                color,
            };
            if patch.is_empty() {
                println!("Nothing to change");
                return Ok(());
            }
            let project = ctx.store.update_project(&project.id, &patch).await?;
            println!("{}", project.id);
            ctx.sync_after_change().await?;
        }
        ProjectCommands::Delete { id } => {
            let project = resolve_project(&ctx.store, &id).await?;
            let removed = ctx.store.delete_project(&project.id).await?;
            println!(
                "{} (with {} tasks, {} entries)",
                project.id, removed.tasks, removed.time_entries
            );
            ctx.sync_after_change().await?;
        }
    }
    Ok(())
}

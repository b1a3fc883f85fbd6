use crate::cli::TaskCommands;
use crate::commands::common::{
    format_task_lines, resolve_project, resolve_task, AppContext, NameIndex,
};
use crate::error::CliError;

pub async fn run_task(command: TaskCommands, ctx: &AppContext) -> Result<(), CliError> {
    match command {
        TaskCommands::Add { project, name } => {
            let project = resolve_project(&ctx.store, &project).await?;
            let task = ctx.store.create_task(&project.id, &name).await?;
            println!("{}", task.id);
            ctx.sync_after_change().await?;
        }
        TaskCommands::List { project, json } => {
            let tasks = match project {
                Some(query) => {
                    let project = resolve_project(&ctx.store, &query).await?;
                    ctx.store.list_tasks_by_project(&project.id).await?
                }
                None => ctx.store.list_tasks().await?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else {
                let projects = ctx.store.list_projects().await?;
                let names = NameIndex::new(&projects, &tasks);
                for line in format_task_lines(&tasks, &names) {
                    println!("{line}");
                }
            }
        }
        TaskCommands::Rename { id, name } => {
            let task = resolve_task(&ctx.store, &id).await?;
            let task = ctx.store.rename_task(&task.id, &name).await?;
            println!("{}", task.id);
            ctx.sync_after_change().await?;
        }
        TaskCommands::Delete { id } => {
            let task = resolve_task(&ctx.store, &id).await?;
            let removed = ctx.store.delete_task(&task.id).await?;
            println!("{} (with {} entries)", task.id, removed.time_entries);
            ctx.sync_after_change().await?;
        }
    }
    Ok(())
}

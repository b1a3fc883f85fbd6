use tock_core::models::TimeEntryPatch;
use tock_core::util::now_ms;

use crate::cli::LogCommands;
use crate::commands::common::{
    entry_to_list_item, format_entry_lines, parse_optional_time, parse_time, resolve_project,
    resolve_task, resolve_time_entry, AppContext, EntryListItem, NameIndex,
};
use crate::error::CliError;

pub async fn run_log(command: LogCommands, ctx: &AppContext) -> Result<(), CliError> {
    let now = now_ms();
    match command {
        LogCommands::List {
            from,
            to,
            project,
            task,
            json,
        } => {
            let from = parse_optional_time(from.as_deref(), now, false)?;
            let to = parse_optional_time(to.as_deref(), now, true)?;
            let mut entries = if let Some(task) = task {
                let task = resolve_task(&ctx.store, &task).await?;
                ctx.store.list_time_entries_by_task(&task.id).await?
            } else if let Some(project) = project {
                let project = resolve_project(&ctx.store, &project).await?;
                ctx.store.list_time_entries_by_project(&project.id).await?
            } else {
                ctx.store.list_time_entries_in_range(from, to).await?
            };
            entries.retain(|entry| {
                !from.is_some_and(|from| entry.start_time < from)
                    && !to.is_some_and(|to| entry.start_time > to)
            });
            entries.sort_by(|a, b| b.start_time.cmp(&a.start_time));

            let projects = ctx.store.list_projects().await?;
            let tasks = ctx.store.list_tasks().await?;
            let names = NameIndex::new(&projects, &tasks);
            if json {
                let items = entries
                    .iter()
                    .map(|entry| entry_to_list_item(entry, &names))
                    .collect::<Vec<EntryListItem>>();
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                for line in format_entry_lines(&entries, &names) {
                    println!("{line}");
                }
            }
        }
        LogCommands::Add {
            task,
            start,
            end,
            notes,
        } => {
            let task = resolve_task(&ctx.store, &task).await?;
            let start = parse_time(&start, now, false)?;
            let end = parse_time(&end, now, false)?;
            let entry = ctx
                .store
                .create_time_entry(&task.id, start, end, &notes)
                .await?;
            println!("{}", entry.id);
            ctx.sync_after_change().await?;
        }
        LogCommands::Edit {
            id,
            task,
            start,
            end,
            notes,
        } => {
            let entry = resolve_time_entry(&ctx.store, &id).await?;
            let mut patch = TimeEntryPatch {
                start_time: parse_optional_time(start.as_deref(), now, false)?,
                end_time: parse_optional_time(end.as_deref(), now, false)?,
                notes,
                ..TimeEntryPatch::default()
            };
            if let Some(task) = task {
                let task = resolve_task(&ctx.store, &task).await?;
                patch.project_id = Some(task.project_id);
                patch.task_id = Some(task.id);
            }
            let entry = ctx.store.update_time_entry(&entry.id, &patch).await?;
            println!("{}", entry.id);
            ctx.sync_after_change().await?;
        }
        LogCommands::Delete { id } => {
            let entry = resolve_time_entry(&ctx.store, &id).await?;
            ctx.store.delete_time_entry(&entry.id).await?;
            println!("{}", entry.id);
            ctx.sync_after_change().await?;
        }
    }
    Ok(())
}

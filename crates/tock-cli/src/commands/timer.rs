use tock_core::models::ActiveTimerSession;
use tock_core::timer::format_duration;
use tock_core::util::now_ms;

use crate::cli::TimerCommands;
use crate::commands::common::{resolve_project, resolve_task, AppContext, NameIndex};
use crate::error::CliError;

pub async fn run_timer(command: TimerCommands, ctx: &AppContext) -> Result<(), CliError> {
    match command {
        TimerCommands::Start { task } => {
            let timer = ctx.timer()?;
            let task = resolve_task(&ctx.store, &task).await?;
            let session = timer.start(&task.project_id, &task.id).await?;
            println!("{}", describe_session(ctx, &session, now_ms()).await?);
        }
        TimerCommands::Stop => {
            let Some(entry) = ctx.timer()?.stop().await? else {
                return Err(CliError::TimerIdle);
            };
            let duration = entry.duration_ms().map_or_else(String::new, format_duration);
            println!("{}  {duration}", entry.id);
        }
        TimerCommands::Status { json } => {
            let session = ctx.store.active_timer().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&session)?);
            } else if let Some(session) = session {
                println!("{}", describe_session(ctx, &session, now_ms()).await?);
            } else {
                println!("Idle");
            }
        }
        TimerCommands::Switch { task, project } => {
            let timer = ctx.timer()?;
            let session = if let Some(task) = task {
                let task = resolve_task(&ctx.store, &task).await?;
                timer.change_task(&task.id).await?
            } else if let Some(project) = project {
                let project = resolve_project(&ctx.store, &project).await?;
                timer.change_project(&project.id).await?
            } else {
                timer.current().await?
            };
            let session = session.ok_or(CliError::TimerIdle)?;
            println!("{}", describe_session(ctx, &session, now_ms()).await?);
        }
    }
    Ok(())
}

async fn describe_session(
    ctx: &AppContext,
    session: &ActiveTimerSession,
    now: i64,
) -> Result<String, CliError> {
    let projects = ctx.store.list_projects().await?;
    let tasks = ctx.store.list_tasks().await?;
    let names = NameIndex::new(&projects, &tasks);
    Ok(format!(
        "{}  {} / {}",
        format_duration(session.elapsed_ms(now)),
        names.project(&session.project_id),
        names.task(&session.task_id)
    ))
}

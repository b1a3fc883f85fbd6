use tock_core::reports::{summarize, GroupBy};
use tock_core::util::now_ms;

use crate::cli::ReportGroup;
use crate::commands::common::{
    format_local_time, format_report_lines, parse_optional_time, start_of_local_day, AppContext,
};
use crate::error::CliError;

impl From<ReportGroup> for GroupBy {
    fn from(value: ReportGroup) -> Self {
        match value {
            ReportGroup::Project => Self::Project,
            ReportGroup::Task => Self::Task,
            ReportGroup::Day => Self::Day,
        }
    }
}

pub async fn run_report(
    from: Option<&str>,
    to: Option<&str>,
    group_by: ReportGroup,
    as_json: bool,
    ctx: &AppContext,
) -> Result<(), CliError> {
    let now = now_ms();
    let from = parse_optional_time(from, now, false)?.unwrap_or_else(|| start_of_local_day(now));
    let to = parse_optional_time(to, now, true)?.unwrap_or(now);

    let entries = ctx
        .store
        .list_time_entries_in_range(Some(from), Some(to))
        .await?;
    let projects = ctx.store.list_projects().await?;
    let tasks = ctx.store.list_tasks().await?;
    let rows = summarize(&entries, &projects, &tasks, group_by.into());

    if as_json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{} .. {}", format_local_time(from), format_local_time(to));
    if rows.is_empty() {
        println!("No completed entries in range.");
        return Ok(());
    }
    for line in format_report_lines(&rows) {
        println!("{line}");
    }
    Ok(())
}

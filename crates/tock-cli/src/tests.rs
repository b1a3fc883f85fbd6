use chrono::{Local, NaiveDate, TimeZone};
use clap::Parser;
use tock_core::config::ClientConfig;
use tock_core::models::{Project, Task, TimeEntry};
use tock_core::reports::{GroupBy, ReportRow};

use crate::cli::{Cli, Commands, LogCommands, ReportGroup, TimerCommands};
use crate::commands::common::{
    entry_to_list_item, format_entry_lines, format_minutes, format_project_lines,
    format_report_lines, normalize_identifier, parse_time, resolve_by_prefix, short_id,
    start_of_local_day, NameIndex,
};
use crate::commands::config::format_config_lines;
use crate::error::CliError;

fn local_ms(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> i64 {
    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap();
    Local
        .from_local_datetime(&naive)
        .earliest()
        .unwrap()
        .timestamp_millis()
}

#[test]
fn normalize_identifier_trims_and_rejects_empty() {
    assert_eq!(normalize_identifier("  ABC ", "Task").unwrap(), "abc");
    assert!(matches!(
        normalize_identifier(" \t ", "Task"),
        Err(CliError::EmptyId { kind: "Task" })
    ));
}

#[test]
fn resolve_by_prefix_prefers_exact_then_unique_prefix() {
    let items = vec![
        "0190aaaa-0000-7000-8000-000000000001".to_string(),
        "0190aaaa-0000-7000-8000-000000000002".to_string(),
        "0190bbbb-0000-7000-8000-000000000003".to_string(),
    ];
    let id_of = |item: &String| item.clone();

    assert_eq!(
        resolve_by_prefix("0190BBBB", "Task", &items, id_of).unwrap(),
        items[2]
    );
    assert_eq!(
        resolve_by_prefix(&items[0], "Task", &items, id_of).unwrap(),
        items[0]
    );
    let error = resolve_by_prefix("0190aaaa", "Task", &items, id_of).unwrap_err();
    assert!(error.to_string().contains("ambiguous"));
    assert!(matches!(
        resolve_by_prefix("ffff", "Task", &items, id_of),
        Err(CliError::NotFound { .. })
    ));
}

#[test]
fn short_id_keeps_thirteen_chars() {
    assert_eq!(short_id("0190aaaa-0000-7000-8000-000000000001"), "0190aaaa-0000");
    assert_eq!(short_id("abc"), "abc");
}

#[test]
fn parse_time_accepts_supported_forms() {
    let now = 1_704_099_600_000;
    assert_eq!(parse_time("now", now, false).unwrap(), now);
    assert_eq!(
        parse_time("2024-01-01T09:00:00.000Z", now, false).unwrap(),
        1_704_099_600_000
    );
    assert_eq!(
        parse_time("2024-03-05 14:30", now, false).unwrap(),
        local_ms(2024, 3, 5, 14, 30)
    );
    assert_eq!(
        parse_time("2024-03-05", now, false).unwrap(),
        local_ms(2024, 3, 5, 0, 0)
    );
    assert_eq!(
        parse_time("2024-03-05", now, true).unwrap(),
        local_ms(2024, 3, 5, 23, 59) + 59_999
    );
    assert!(matches!(
        parse_time("yesterday-ish", now, false),
        Err(CliError::InvalidTime(_))
    ));
}

#[test]
fn start_of_local_day_is_midnight() {
    let afternoon = local_ms(2024, 6, 10, 15, 45);
    assert_eq!(start_of_local_day(afternoon), local_ms(2024, 6, 10, 0, 0));
}

#[test]
fn format_minutes_pads() {
    assert_eq!(format_minutes(0), "0h 00m");
    assert_eq!(format_minutes(91), "1h 31m");
}

#[test]
fn project_lines_include_subtitle_when_present() {
    let plain = Project::new("Web");
    let detailed = Project::new("Ops").with_subtitle("on call");
    let lines = format_project_lines(&[plain.clone(), detailed]);
    assert!(lines[0].starts_with(&short_id(&plain.id.as_str())));
    assert!(lines[0].ends_with("#0d9488  Web"));
    assert!(lines[1].ends_with("Ops  (on call)"));
}

#[test]
fn entry_lines_show_duration_and_names() {
    let project = Project::new("Web");
    let task = Task::new(project.id, "Build");
    let mut entry = TimeEntry::completed(project.id, task.id, 0, 3_723_000);
    entry.notes = "deploy".to_string();
    let mut running = TimeEntry::completed(project.id, task.id, 0, 0);
    running.end_time = None;
    let names = NameIndex::new(&[project], &[task]);

    let lines = format_entry_lines(&[entry.clone(), running], &names);
    assert!(lines[0].contains("1:02:03"));
    assert!(lines[0].contains("Web / Build"));
    assert!(lines[0].ends_with("- deploy"));
    assert!(lines[1].contains("running"));

    let item = entry_to_list_item(&entry, &names);
    assert_eq!(item.duration.as_deref(), Some("1:02:03"));
    assert_eq!(item.task, "Build");
}

#[test]
fn unknown_names_render_as_question_marks() {
    let entry = TimeEntry::completed(
        tock_core::models::ProjectId::new(),
        tock_core::models::TaskId::new(),
        0,
        60_000,
    );
    let names = NameIndex::new(&[], &[]);
    assert!(format_entry_lines(&[entry], &names)[0].contains("? / ?"));
}

#[test]
fn report_lines_end_with_total() {
    let rows = vec![
        ReportRow {
            key: "a".to_string(),
            label: "Build".to_string(),
            project_name: Some("Web".to_string()),
            total_minutes: 90,
            entries: 2,
        },
        ReportRow {
            key: "b".to_string(),
            label: "Deploy".to_string(),
            project_name: Some("Ops".to_string()),
            total_minutes: 15,
            entries: 1,
        },
    ];
    let lines = format_report_lines(&rows);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("Web / Build"));
    assert_eq!(lines[2], "   1h 45m  total");
}

#[test]
fn config_lines_mark_missing_url() {
    let lines = format_config_lines(&ClientConfig::default());
    assert!(lines[0].ends_with("(not set)"));
    assert!(lines[1].ends_with("10"));
}

#[test]
fn report_group_maps_to_core_grouping() {
    assert_eq!(GroupBy::from(ReportGroup::Day), GroupBy::Day);
    assert_eq!(GroupBy::from(ReportGroup::Task), GroupBy::Task);
}

#[test]
fn cli_parses_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["tock", "timer", "switch", "--project", "0190", "--offline"])
        .unwrap();
    assert!(cli.offline);
    assert!(matches!(
        cli.command,
        Commands::Timer {
            command: TimerCommands::Switch {
                task: None,
                project: Some(_),
            }
        }
    ));
    assert!(Cli::try_parse_from(["tock", "timer", "switch"]).is_err());
    assert!(Cli::try_parse_from(["tock", "sync", "--push-only", "--pull-only"]).is_err());
}

#[test]
fn log_list_accepts_one_owner_filter() {
    let cli = Cli::try_parse_from(["tock", "log", "list", "--task", "0190", "--json"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Log {
            command: LogCommands::List {
                task: Some(_),
                project: None,
                json: true,
                ..
            }
        }
    ));
    assert!(
        Cli::try_parse_from(["tock", "log", "list", "--task", "a", "--project", "b"]).is_err()
    );
}

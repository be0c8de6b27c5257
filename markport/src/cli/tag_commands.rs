// src/cli/tag_commands.rs
use crate::cli::error::CliResult;
use crate::cli::import_commands::print_json;
use crate::domain::owner::Owner;
use crate::infrastructure::di::ServiceContainer;
use crossterm::style::Stylize;

pub fn merge_tags(owner: &Owner, services: &ServiceContainer) -> CliResult<()> {
    let report = services.tag_service.merge_duplicate_tags(owner)?;

    if report.merged == 0 {
        eprintln!("No case-variant tags found");
    } else {
        for detail in &report.details {
            eprintln!(
                "  {} <- {} ({} bookmark(s))",
                detail.canonical.as_str().green(),
                detail.merged.join(", ").yellow(),
                detail.bookmarks_updated
            );
        }
    }

    print_json(&report)
}

use anyhow::{Result, bail};
use chrono::{DateTime, Local, TimeZone};
use horizon_models::Project;
use horizon_storage::Storage;

pub fn format_timestamp(timestamp: Option<i64>) -> String {
    let Some(ts) = timestamp else {
        return "-".to_string();
    };

    let datetime: DateTime<Local> = match Local.timestamp_millis_opt(ts).single() {
        Some(dt) => dt,
        None => return "-".to_string(),
    };

    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Single-line preview of `input`, cut to `max_len` characters.
pub fn preview_text(input: &str, max_len: usize) -> String {
    let flattened = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.chars().count() <= max_len {
        return flattened;
    }
    let mut preview: String = flattened.chars().take(max_len).collect();
    preview.push('…');
    preview
}

pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Load a project by full id or unique prefix.
pub fn resolve_project(storage: &Storage, id: &str) -> Result<Project> {
    let Some(resolved) = storage.projects.resolve_id(id)? else {
        bail!("Project not found: {id}");
    };
    match storage.projects.get(&resolved)? {
        Some(project) => Ok(project),
        None => bail!("Project not found: {id}"),
    }
}

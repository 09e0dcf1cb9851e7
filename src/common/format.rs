// Display helpers shared by front ends rendering envelopes.
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Good,
    Bad,
    Pending,
    Info,
    Muted,
    Neutral,
}

/// Last segment of a fully qualified resource path.
pub fn resource_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

pub fn status_tone(status: &str) -> Tone {
    let s = status.to_lowercase();
    if s.contains("ready") || s.contains("active") {
        Tone::Good
    } else if s.contains("error") || s.contains("failed") {
        Tone::Bad
    } else if s.contains("pending") || s.contains("creating") {
        Tone::Pending
    } else {
        Tone::Muted
    }
}

pub fn severity_tone(severity: &str) -> Tone {
    match severity.to_lowercase().as_str() {
        "error" | "critical" | "alert" | "emergency" => Tone::Bad,
        "warning" => Tone::Pending,
        "info" | "notice" => Tone::Info,
        "debug" => Tone::Muted,
        _ => Tone::Neutral,
    }
}

/// `1500m` -> `1.5 cores`, `2` -> `2 cores`.
pub fn format_cpu(cpu: &str) -> String {
    if cpu.is_empty() {
        return "Unknown".into();
    }
    match cpu.strip_suffix('m').map(str::parse::<f64>) {
        Some(Ok(milli)) => format!("{:.1} cores", milli / 1000.0),
        _ => format!("{} cores", cpu),
    }
}

pub fn format_memory(memory: &str) -> String {
    if memory.is_empty() {
        "Unknown".into()
    } else if memory.ends_with("Mi") || memory.ends_with("Gi") {
        memory.to_string()
    } else {
        format!("{}Mi", memory)
    }
}

pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".into();
    }
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

/// 6-30 chars, lowercase letter first, no trailing hyphen, not the placeholder.
pub fn validate_project_id(project_id: &str) -> bool {
    if project_id.is_empty() || project_id == crate::config::PLACEHOLDER_PROJECT {
        return false;
    }
    let bytes = project_id.as_bytes();
    if !(6..=30).contains(&bytes.len()) {
        return false;
    }
    let first_ok = bytes[0].is_ascii_lowercase();
    let last = bytes[bytes.len() - 1];
    let last_ok = last.is_ascii_lowercase() || last.is_ascii_digit();
    let body_ok = bytes
        .iter()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-');
    first_ok && last_ok && body_ok
}

pub fn validate_image_name(image: &str) -> bool {
    if image.is_empty() {
        return false;
    }
    if image.starts_with("gcr.io/") && image.split('/').count() >= 3 {
        return true;
    }
    image.contains('/') && image.contains(':')
}

/// Parses `KEY=VALUE` lines; blank lines and lines without `=` are skipped.
pub fn parse_env_vars(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .filter_map(|line| line.trim().split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

pub fn format_permission_members(members: &[String]) -> String {
    let count = |prefix: &str| members.iter().filter(|m| m.starts_with(prefix)).count();
    let parts: Vec<String> = [
        ("Users", count("user:")),
        ("Service Accounts", count("serviceAccount:")),
        ("Groups", count("group:")),
        ("Domains", count("domain:")),
    ]
    .iter()
    .filter(|(_, n)| *n > 0)
    .map(|(label, n)| format!("{}: {}", label, n))
    .collect();

    if parts.is_empty() {
        "None".into()
    } else {
        parts.join(", ")
    }
}

pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if r#"<>:"/\|?*"#.contains(c) { '_' } else { c })
        .collect();
    let trimmed = replaced.trim_matches(|c| c == '.' || c == ' ');
    if trimmed.is_empty() {
        "unnamed".into()
    } else {
        trimmed.to_string()
    }
}

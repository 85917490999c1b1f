pub mod rtype;

pub use rtype::RecordType;

/// Lowercase a domain name and make it fully qualified.
pub fn normalize_name(name: &str) -> String {
    let trimmed = name.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return ".".to_string();
    }
    let mut normalized = trimmed.to_ascii_lowercase();
    normalized.push('.');
    normalized
}

/// Parent of a fully qualified name, `None` for the root.
pub fn parent_name(name: &str) -> Option<String> {
    let normalized = normalize_name(name);
    if normalized == "." {
        return None;
    }
    match normalized.split_once('.') {
        Some((_, rest)) if !rest.is_empty() => Some(rest.to_string()),
        _ => Some(".".to_string()),
    }
}

/// Check whether `name` is `ancestor` or lies below it.
pub fn is_subdomain(name: &str, ancestor: &str) -> bool {
    let name = normalize_name(name);
    let ancestor = normalize_name(ancestor);
    if ancestor == "." {
        return true;
    }
    name == ancestor || name.ends_with(&format!(".{}", ancestor))
}

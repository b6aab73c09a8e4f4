// Heuristic issue annotation for confirmed findings.

const SUSPICIOUS_DIRS: &[&str] = &[
    "/.git",
    "/.svn",
    "/.hg",
    "/backup",
    "/backups",
    "/.env",
    "/config",
    "/configs",
    "/admin",
    "/phpmyadmin",
    "/wp-admin",
    "/server-status",
    "/.idea",
    "/.vscode",
];

const BACKUP_EXTENSIONS: &[&str] = &[".zip", ".tar", ".tar.gz", ".tgz", ".bak", ".old", ".rar"];

const ADMIN_AREAS: &[&str] = &["/admin", "/wp-admin", "/phpmyadmin"];

/// Annotate a confirmed finding with notable issues.
pub fn analyze(path: &str, status: u16, body_snippet: &str) -> Vec<String> {
    let mut issues = Vec::new();
    let body = body_snippet.to_lowercase();
    let path_low = path.to_lowercase();

    if status == 200 {
        if body.contains("index of /")
            || (body.contains("parent directory") && body.contains("<title>index of"))
        {
            issues.push("Directory listing enabled".to_string());
        }
        if SUSPICIOUS_DIRS.iter().any(|d| path_low.starts_with(d)) {
            issues.push("Sensitive path potentially exposed".to_string());
        }
        if body.contains("phpinfo()") || body.contains("<h1>php info") {
            issues.push("phpinfo exposed".to_string());
        }
    }

    if (status == 401 || status == 403) && ADMIN_AREAS.iter().any(|a| path_low.contains(a)) {
        issues.push("Restricted admin area (authorization required)".to_string());
    }

    if BACKUP_EXTENSIONS.iter().any(|ext| path_low.ends_with(ext)) {
        issues.push("Backup/archive file exposed".to_string());
    }

    issues
}

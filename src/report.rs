// Report rendering.
// Turns an audit into an HTML status grid and a short terminal summary.

use crate::health::{AuditReport, CheckKey, RepoKind, RepoRecord, Verdict};

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Repository health</title>
<style>
body { font-family: sans-serif; font-size: 13px; }
table { border-collapse: collapse; margin-bottom: 2em; }
th, td { border: 1px solid #ddd; padding: 2px 6px; white-space: nowrap; }
td.check { text-align: center; }
td.check a { display: block; text-decoration: none; color: inherit; }
.pass { background: #c3e6cb; }
.fail { background: #f5c6cb; }
.unknown, .na { background: #e2e3e5; }
.alert { background: #f8d7da; border: 1px solid #f5c6cb; padding: 0.5em 1em; }
</style>
</head>
<body>
"#;

const PAGE_TAIL: &str = "</body>\n</html>\n";

/// Minimal escaping for text and attribute values.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Full HTML page: error alert, pipelines table, core tools table.
pub fn render_html(report: &AuditReport, web_base: &str) -> String {
    let mut html = String::from(PAGE_HEAD);
    html.push_str(&format!(
        "<h1>Repository health: {}</h1>\n",
        escape(&report.org)
    ));

    if !report.errors.is_empty() {
        html.push_str("<div class=\"alert\">\n<p>Some fixes failed:</p>\n<ul>\n");
        for error in &report.errors {
            html.push_str(&format!("<li><code>{}</code></li>\n", escape(error)));
        }
        html.push_str("</ul>\n</div>\n");
    }

    html.push_str("<h2>Pipelines</h2>\n");
    html.push_str(&render_table(
        &report.pipelines,
        RepoKind::Pipeline,
        &report.org,
        web_base,
    ));
    html.push_str("<h2>Core repos</h2>\n");
    html.push_str(&render_table(
        &report.core_tools,
        RepoKind::CoreTool,
        &report.org,
        web_base,
    ));

    html.push_str(PAGE_TAIL);
    html
}

fn render_table(records: &[RepoRecord], kind: RepoKind, org: &str, web_base: &str) -> String {
    let keys = kind.check_keys();
    let mut html = String::from("<table>\n<thead>\n");
    html.push_str(&header_rows(&keys));
    html.push_str("</thead>\n<tbody>\n");

    for record in records {
        html.push_str(&format!("<tr>\n<td>{}</td>\n", escape(&record.name)));
        let repo_url = format!("{}/{}/{}", web_base.trim_end_matches('/'), org, record.name);
        for &key in &keys {
            html.push_str(&cell(record, key, &repo_url));
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody>\n</table>\n");
    html
}

/// Two header rows: grouped checks share one spanning heading above their own names.
fn header_rows(keys: &[CheckKey]) -> String {
    let mut groups = String::from("<tr>\n<th rowspan=\"2\">Name</th>\n");
    let mut names = String::from("<tr>\n");

    let mut i = 0;
    while i < keys.len() {
        let key = keys[i];
        match key.group() {
            Some(group) => {
                let span = keys[i..]
                    .iter()
                    .take_while(|k| k.group().as_deref() == Some(group.as_str()))
                    .count();
                groups.push_str(&format!(
                    "<th colspan=\"{}\">{}</th>\n",
                    span,
                    escape(&group)
                ));
                for k in &keys[i..i + span] {
                    names.push_str(&heading(*k));
                }
                i += span;
            }
            None => {
                groups.push_str(&format!(
                    "<th rowspan=\"2\" title=\"{}\">{}</th>\n",
                    escape(&key.description()),
                    escape(&key.name())
                ));
                i += 1;
            }
        }
    }

    groups.push_str("</tr>\n");
    names.push_str("</tr>\n");
    groups + &names
}

fn heading(key: CheckKey) -> String {
    let name = key.name();
    // Drop the branch prefix that the group heading already shows.
    let short = name.split_once(": ").map(|(_, rule)| rule).unwrap_or(&name);
    format!(
        "<th title=\"{}\">{}</th>\n",
        escape(&key.description()),
        escape(short)
    )
}

fn cell(record: &RepoRecord, key: CheckKey, repo_url: &str) -> String {
    let verdict = record.verdict(key);
    let (class, mark) = match &verdict {
        Verdict::Pass => ("pass", "&#10003;"),
        Verdict::Fail => ("fail", "&#10007;"),
        Verdict::NotApplicable(_) => ("na", "&#10007;"),
        Verdict::Unknown => ("unknown", "?"),
    };
    let mut title = format!("{}: {}", record.name, key.description());
    match &verdict {
        Verdict::NotApplicable(reason) => title.push_str(&format!(" (n/a: {})", reason)),
        Verdict::Unknown => title.push_str(" (no data)"),
        _ => {}
    }
    format!(
        "<td class=\"check {}\" title=\"{}\"><a href=\"{}{}\" target=\"_blank\">{}</a></td>\n",
        class,
        escape(&title),
        escape(repo_url),
        key.settings_path(),
        mark
    )
}

/// Plain-text summary: one line per repository with any failing check.
pub fn summary(report: &AuditReport) -> String {
    let mut out = String::new();
    let mut failing = 0;

    for record in report.records() {
        let failed: Vec<String> = record
            .verdicts
            .iter()
            .filter(|(_, v)| v.is_fail())
            .map(|(k, _)| k.name())
            .collect();
        let unknown = record
            .verdicts
            .values()
            .filter(|v| **v == Verdict::Unknown)
            .count();
        if failed.is_empty() && unknown == 0 {
            continue;
        }
        failing += 1;
        out.push_str(&format!("{:<24}", record.name));
        if !failed.is_empty() {
            out.push_str(&format!(" {} {}", Verdict::Fail.symbol(), failed.join(", ")));
        }
        if unknown > 0 {
            out.push_str(&format!(" ({} {})", unknown, Verdict::Unknown.symbol()));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "{} pipelines, {} core repos, {} need attention, {} fixes applied\n",
        report.pipelines.len(),
        report.core_tools.len(),
        failing,
        report.writes
    ));
    for error in &report.errors {
        out.push_str(&format!("error: {}\n", error));
    }
    out
}

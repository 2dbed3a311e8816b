//! Static HTML overview of both catalogs.

use super::catalog::Catalogs;
use crate::config::relative_archive_path;
use crate::model::{CatalogEntry, Category};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::fmt::Write;

/// Bytes that cannot appear raw in a URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const STYLE: &str = "body{font-family:sans-serif;padding:2em}\
input{width:100%;padding:.5em;margin-bottom:1em;box-sizing:border-box}\
table{border-collapse:collapse;width:100%;margin-bottom:2em}\
th,td{border:1px solid #ccc;padding:.4em .6em;text-align:left}\
th{background:#f3f3f3}\
table.extensions tbody tr{background:#e7fce7}\
table.addons tbody tr{background:#fdf3d8}";

const FILTER_SCRIPT: &str = "function filterRows(q){q=q.toLowerCase();\
for(const row of document.querySelectorAll('tbody tr'))\
row.style.display=row.textContent.toLowerCase().includes(q)?'':'none';}";

/// Escapes text for use in HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Renders `index.html`: one table per category, rows in catalog order.
pub fn render_dashboard(catalogs: &Catalogs) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Add-on Repository</title>\n");
    let _ = writeln!(html, "<style>{STYLE}</style>");
    html.push_str("</head>\n<body>\n<h1>Add-ons &amp; Extensions</h1>\n");
    html.push_str(
        "<input type=\"search\" placeholder=\"Filter\" oninput=\"filterRows(this.value)\">\n",
    );

    // Extensions are listed after legacy add-ons.
    for category in Category::ALL {
        render_table(&mut html, category, &catalogs.get(category).data);
    }

    let _ = writeln!(html, "<script>{FILTER_SCRIPT}</script>");
    html.push_str("</body>\n</html>\n");
    html
}

fn render_table(html: &mut String, category: Category, entries: &[CatalogEntry]) {
    let _ = writeln!(
        html,
        "<h2>{} <small>({})</small></h2>",
        category.title(),
        entries.len()
    );
    let _ = writeln!(html, "<table class=\"{}\">", category.dir_name());
    html.push_str(
        "<thead><tr><th>ID</th><th>Version</th><th>Min. Blender</th><th>Download</th></tr></thead>\n",
    );
    html.push_str("<tbody>\n");
    for entry in entries {
        let file_name = utf8_percent_encode(file_name_of(entry), PATH_SEGMENT).to_string();
        let href = relative_archive_path(category, &file_name);
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td><a href=\"{}\">Download</a></td></tr>",
            escape_html(&entry.id),
            escape_html(&entry.version),
            escape_html(&entry.blender_version_min),
            escape_html(&href),
        );
    }
    html.push_str("</tbody>\n</table>\n");
}

/// Archive file name, taken from the last segment of `archive_url`.
fn file_name_of(entry: &CatalogEntry) -> &str {
    entry
        .archive_url
        .rsplit('/')
        .next()
        .unwrap_or(&entry.archive_url)
}

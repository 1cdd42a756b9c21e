//! HTML Report Rendering
//!
//! Renders ranked cars as a standalone HTML table, used both for the
//! `ranked_{profile}.html` export and as the email body.
//! - Rows scoring above `HIGHLIGHT_ABOVE` are highlighted
//! - All listing text is escaped

use crate::types::CarRow;
use chrono::Utc;

/// Rows with a score strictly above this are highlighted
pub const HIGHLIGHT_ABOVE: f64 = 24.0;

const COLUMNS: &[&str] = &[
    "Make", "Model", "Price", "Mileage", "Year", "Power", "Score", "Grade", "Listing", "Image",
];

pub fn render_table_html(rows: &[CarRow], title: &str) -> String {
    let mut html = String::new();
    html.push_str("<html>\n<body>\n");
    html.push_str(&format!("<h2>{}</h2>\n", escape_html(title)));
    html.push_str(&format!(
        "<p>Generated: {}</p>\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("<table border=\"1\" cellspacing=\"0\" cellpadding=\"5\">\n  <tr>\n");
    for column in COLUMNS {
        html.push_str(&format!("    <th>{}</th>\n", column));
    }
    html.push_str("  </tr>\n");

    for row in rows {
        html.push_str(&render_row(row));
    }

    html.push_str("</table>\n</body>\n</html>\n");
    html
}

fn render_row(row: &CarRow) -> String {
    let style = if row.score > HIGHLIGHT_ABOVE {
        "background-color: yellow;"
    } else {
        ""
    };
    let image = match &row.img_url {
        Some(src) if !src.is_empty() => format!(
            "<img src=\"{}\" class=\"table-img\" alt=\"car image\">",
            escape_html(src)
        ),
        _ => String::new(),
    };

    let cells = [
        escape_html(&row.brand),
        escape_html(&row.model),
        optional(row.price),
        optional(row.mileage),
        optional(row.year),
        row.power.map(|kw| format!("{} kW", kw)).unwrap_or_default(),
        format!("{:.1}", row.score),
        row.grade.label().to_string(),
        format!("<a href=\"{}\">Link</a>", escape_html(&row.url)),
        image,
    ];

    let mut html = format!("  <tr style=\"{}\">\n", style);
    for cell in cells {
        html.push_str(&format!("    <td>{}</td>\n", cell));
    }
    html.push_str("  </tr>\n");
    html
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

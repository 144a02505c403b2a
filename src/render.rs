// src/render.rs
use crate::out_models::{DashboardView, ForecastPanel, GraphElement};

pub fn render_dashboard_markdown(v: &DashboardView) -> String {
    let mut md = String::new();
    md.push_str("# Opinion Dashboard\n\n");
    md.push_str(&format!("_{}_\n\n", v.last_update.trim()));

    if !v.has_data {
        md.push_str("No data available.\n");
        return md;
    }

    md.push_str(&format!("Posts: {}\n\n", v.post_count));

    if !v.sentiment.is_empty() {
        md.push_str("## Sentiment Distribution\n");
        for b in &v.sentiment {
            md.push_str(&format!("- {}: {}\n", b.label, b.count));
        }
        md.push('\n');
    }

    let words: Vec<String> = v
        .graph
        .iter()
        .filter_map(|e| match e {
            GraphElement::Node { data, .. } => Some(match &data.sentiment {
                Some(s) => format!("- **{}** ({}, {})", data.label, data.freq, s),
                None => format!("- **{}** ({})", data.label, data.freq),
            }),
            _ => None,
        })
        .collect();
    if !words.is_empty() {
        md.push_str("## Top Words\n");
        for w in words.iter().take(10) {
            md.push_str(w);
            md.push('\n');
        }
        md.push('\n');
    }

    md.push_str("## Forecast\n");
    match &v.forecast {
        ForecastPanel::Ready(c) => {
            md.push_str(&format!("{}\n", c.title));
            if let (Some(seen), Some(last)) = (c.history.last(), c.predicted.last()) {
                md.push_str(&format!(
                    "- last observed {}: {:.2}\n- end of horizon {}: {:.2}\n",
                    seen.x.format("%Y-%m-%d %H:%M"),
                    seen.y,
                    last.x.format("%Y-%m-%d %H:%M"),
                    last.y
                ));
            }
        }
        ForecastPanel::Unavailable { title, .. } => md.push_str(&format!("{}\n", title)),
    }

    md
}

//! Plain-text views of workflow state. Markdown markers are printed as-is.

use std::fmt::Write as _;

use client_core::{chat::ChatTurn, reducer::WorkflowState};
use serde_json::Value;
use shared::{
    domain::{capitalize, ProductsByStore, SelectedProducts, Status, StatusKind},
    protocol::AnalysisResult,
};

const LISTING_NAME_WIDTH: usize = 50;

pub fn status_line(status: &Status) -> String {
    let tag = match status.kind {
        StatusKind::Info => "info",
        StatusKind::Warning => "warn",
        StatusKind::Error => "error",
        StatusKind::Success => "ok",
    };
    format!("[{tag}] {}", status.text)
}

pub fn listings(products: &ProductsByStore, selected: &SelectedProducts) -> String {
    if products.is_empty_result() {
        return "No products to display. Please search for products first.".to_string();
    }

    let mut out = String::new();
    for (store, items) in products.iter().filter(|(_, items)| !items.is_empty()) {
        let _ = writeln!(out, "{} Products ({} found)", capitalize(store), items.len());
        let chosen = selected.get(store).map(|p| p.id.as_str());
        for (i, product) in items.iter().enumerate() {
            let marker = if chosen == Some(product.id.as_str()) { "*" } else { " " };
            let _ = writeln!(
                out,
                " {marker} {:>2}. {}  {}  ⭐{:.1} ({} reviews)",
                i + 1,
                product.short_name(LISTING_NAME_WIDTH),
                product.display_price(),
                product.rating,
                product.review_count
            );
            if !product.specifications.is_empty() {
                let specs = product
                    .specifications
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join(" | ");
                let _ = writeln!(out, "        {specs}");
            }
        }
    }
    out.trim_end().to_string()
}

pub fn selection(selected: &SelectedProducts) -> String {
    if selected.is_empty() {
        return "Nothing selected yet.".to_string();
    }
    let mut out = String::from("Selected Products for Analysis");
    for (store, product) in selected.iter() {
        let _ = write!(
            out,
            "\n  {}: {}  {} • ⭐ {:.1}",
            store.to_uppercase(),
            product.name,
            product.display_price(),
            product.rating
        );
    }
    out
}

pub fn report(result: &AnalysisResult, selected: &SelectedProducts) -> String {
    let report = &result.report;
    let mut out = String::from("Review Analysis Results\n");
    let total_reviews = report
        .total_reviews
        .unwrap_or(result.extract_data.total_reviews);
    let _ = write!(out, "Total reviews: {total_reviews}");
    if let Some(seconds) = result.extract_data.extraction_time_seconds {
        let _ = write!(out, "   Processing time: {seconds}s");
    }
    out.push('\n');

    if let Some(summary) = report.overall_summary.as_deref().filter(|s| !s.is_empty()) {
        let _ = write!(out, "\nExecutive Summary\n  {summary}\n");
    }

    if !report.sentiment_analysis.is_empty() {
        out.push_str("\nSentiment Analysis\n");
        for (store, data) in &report.sentiment_analysis {
            let _ = writeln!(
                out,
                "  {:<10} {:.1}/5  {}  ({}% positive • {}% neutral • {}% negative)",
                capitalize(store),
                data.average_rating,
                data.sentiment_label.as_deref().unwrap_or("Unknown"),
                data.positive_percentage,
                data.neutral_percentage,
                data.negative_percentage
            );
        }
    }

    if !report.pros_cons.is_empty() {
        out.push_str("\nTop Pros\n");
        for pro in &report.pros_cons.pros {
            let _ = writeln!(out, "  + {pro}");
        }
        out.push_str("Top Cons\n");
        for con in &report.pros_cons.cons {
            let _ = writeln!(out, "  - {con}");
        }
    }

    if !report.common_themes.is_empty() {
        out.push_str("\nCommon Themes\n");
        for theme in &report.common_themes {
            let _ = writeln!(
                out,
                "  {} [{}] {}",
                theme.theme.as_deref().unwrap_or("Unknown"),
                theme.frequency.as_deref().unwrap_or("Unknown"),
                theme.description.as_deref().unwrap_or_default()
            );
        }
    }

    if selected.len() > 1 {
        let comparisons: Vec<_> = report
            .product_comparison
            .iter()
            .filter_map(|(category, details)| {
                let summary = details.get("summary").and_then(Value::as_str)?;
                Some((category_title(category), summary))
            })
            .collect();
        if !comparisons.is_empty() {
            out.push_str("\nProduct Comparison\n");
            for (title, summary) in comparisons {
                let _ = writeln!(out, "  {title}: {summary}");
            }
        }
    }

    if !report.key_insights.is_empty() {
        out.push_str("\nKey Insights\n");
        for insight in &report.key_insights {
            let _ = writeln!(out, "  • {insight}");
        }
    }

    let recs = &report.recommendations;
    if !recs.is_empty() {
        out.push_str("\nRecommendations\n");
        if let Some(best) = &recs.best_overall {
            let _ = writeln!(out, "  Best overall: {best}");
        }
        if let Some(value) = &recs.best_value {
            let _ = writeln!(out, "  Best value: {value}");
        }
        if let Some(considerations) = &recs.considerations {
            let _ = writeln!(out, "  Considerations: {considerations}");
        }
    }

    out.trim_end().to_string()
}

/// `battery_life` -> `Battery Life`
fn category_title(category: &str) -> String {
    category
        .split('_')
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn turn(turn: &ChatTurn) -> String {
    let reply = turn.assistant.as_deref().unwrap_or("Thinking...");
    format!(
        "[{}] you: {}\nassistant: {}",
        turn.asked_at.format("%H:%M:%S"),
        turn.user,
        reply
    )
}

pub fn statuses(state: &WorkflowState) -> String {
    let mut lines = vec![format!(
        "session {}  stage {:?}{}",
        state.session_id,
        state.stage,
        if state.loading { "  (busy)" } else { "" }
    )];
    if let Some(status) = &state.search_status {
        lines.push(format!("search:   {}", status_line(status)));
    }
    if let Some(status) = &state.analysis_status {
        lines.push(format!("analysis: {}", status_line(status)));
    }
    lines.join("\n")
}

//! Output formatting. Everything here returns strings; `commands` does the printing.
//!
//! Text output is rendered from the templates in [`super::templates`]. Each public
//! `render_*` picks colour from the terminal; the `_internal` variants take it
//! explicitly so tests can render plain.

use super::styles::ATTRHOST_THEME;
use super::templates::{NEXT_TEMPLATE, SUMMARY_TEMPLATE, VERDICT_TEMPLATE, VIEW_TEMPLATE};
use attrhostapp::counters::Counters;
use attrhostapp::model::AttributeId;
use attrhostapp::tree::{find_in_display_order, FindOptions};
use attrhostapp::validation::{GateReason, SaveVerdict};
use attrhostapp::{AttributeTree, HintType, Validity};
use outstanding::{render, render_with_color, ThemeChoice};
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

/// One attribute as the CLI shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub index: usize,
    pub id: AttributeId,
    pub path: String,
    pub text: String,
    pub viewed: bool,
    pub validity: Validity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub hint: HintType,
}

#[derive(Serialize)]
struct SummaryJson<'a> {
    attributes: usize,
    unviewed: usize,
    invalid: usize,
    items: &'a [Row],
}

/// Every attribute in tab order.
pub fn tab_order(tree: &AttributeTree) -> Vec<AttributeId> {
    let options = FindOptions {
        stop_at_first: false,
        ..FindOptions::default()
    };
    find_in_display_order(tree, None, options, |_| true)
        .into_iter()
        .filter_map(|g| g.target())
        .collect()
}

/// Names from the root down, e.g. `Invoice/Line/Qty`.
pub fn path_label(tree: &AttributeTree, id: &AttributeId) -> String {
    tree.path_to(id)
        .map(|g| {
            g.iter()
                .filter_map(|id| tree.get(id))
                .map(|n| n.name.as_str())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}

pub fn rows(tree: &AttributeTree) -> Vec<Row> {
    tab_order(tree)
        .into_iter()
        .enumerate()
        .filter_map(|(i, id)| {
            let node = tree.get(&id)?;
            Some(Row {
                index: i + 1,
                id,
                path: path_label(tree, &id),
                text: node.text.clone(),
                viewed: node.viewed,
                validity: node.validity,
                message: node.validation_message.clone(),
                hint: node.hint_type,
            })
        })
        .collect()
}

#[derive(Serialize)]
struct StatusPart {
    separator: &'static str,
    text: String,
    style: &'static str,
}

/// A row laid out for the `row_line` macro.
#[derive(Serialize)]
struct RowLine {
    index: String,
    path: String,
    padding: String,
    text: String,
    status: Vec<StatusPart>,
}

#[derive(Serialize)]
struct SummaryData {
    attributes: usize,
    unviewed: usize,
    invalid: usize,
    rows: Vec<RowLine>,
}

#[derive(Serialize)]
struct NextData {
    row: Option<RowLine>,
    message: String,
}

#[derive(Serialize)]
struct Label {
    index: String,
    path: String,
}

#[derive(Serialize)]
struct VerdictData {
    verdict: &'static str,
    reason: &'static str,
    question: &'static str,
    labels: Vec<Label>,
}

#[derive(Serialize)]
struct ViewData {
    marked: usize,
    unviewed: usize,
    all_viewed: bool,
}

fn status(row: &Row) -> Vec<StatusPart> {
    let message = row.message.as_deref().unwrap_or("");
    let mut parts: Vec<(String, &'static str)> = Vec::new();
    match row.validity {
        Validity::Invalid => parts.push((format!("invalid: {}", message), "problem")),
        Validity::Warning => parts.push((format!("warning: {}", message), "warning")),
        Validity::Valid => {}
    }
    match row.hint {
        HintType::Direct => parts.push(("hint".into(), "muted")),
        HintType::Indirect => parts.push(("indirect hint".into(), "muted")),
        HintType::None => {}
    }
    if !row.viewed {
        parts.push(("unviewed".into(), "warning"));
    }
    parts
        .into_iter()
        .enumerate()
        .map(|(i, (text, style))| StatusPart {
            separator: if i == 0 { "  " } else { ", " },
            text,
            style,
        })
        .collect()
}

fn row_line(row: &Row, path_width: usize) -> RowLine {
    let pad = path_width.saturating_sub(row.path.width());
    RowLine {
        index: format!("{:>3}", row.index),
        path: row.path.clone(),
        padding: " ".repeat(pad),
        text: row.text.clone(),
        status: status(row),
    }
}

fn render_template<T: Serialize>(template: &str, data: &T, use_color: Option<bool>) -> String {
    let theme = ThemeChoice::from(&*ATTRHOST_THEME);
    let output = match use_color {
        Some(c) => render_with_color(template, data, theme, c),
        None => render(template, data, theme),
    };
    output.unwrap_or_else(|e| format!("Render error: {}\n", e))
}

pub fn render_summary(counters: Counters, rows: &[Row]) -> String {
    render_summary_internal(counters, rows, None)
}

fn render_summary_internal(counters: Counters, rows: &[Row], use_color: Option<bool>) -> String {
    let width = rows.iter().map(|r| r.path.width()).max().unwrap_or(0);
    let data = SummaryData {
        attributes: rows.len(),
        unviewed: counters.unviewed(),
        invalid: counters.invalid(),
        rows: rows.iter().map(|r| row_line(r, width)).collect(),
    };
    render_template(SUMMARY_TEMPLATE.as_str(), &data, use_color)
}

pub fn render_summary_json(counters: Counters, rows: &[Row]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&SummaryJson {
        attributes: rows.len(),
        unviewed: counters.unviewed(),
        invalid: counters.invalid(),
        items: rows,
    })
}

/// `what` names the search, e.g. "unviewed attribute".
pub fn render_next(found: Option<&Row>, what: &str) -> String {
    render_next_internal(found, what, None)
}

fn render_next_internal(found: Option<&Row>, what: &str, use_color: Option<bool>) -> String {
    let data = NextData {
        row: found.map(|r| row_line(r, r.path.width())),
        message: format!("No {} found", what),
    };
    render_template(NEXT_TEMPLATE.as_str(), &data, use_color)
}

fn reason_label(reason: GateReason) -> &'static str {
    match reason {
        GateReason::Invalid => "invalid",
        GateReason::Unviewed => "unviewed",
    }
}

pub fn render_verdict(verdict: &SaveVerdict, rows: &[Row]) -> String {
    render_verdict_internal(verdict, rows, None)
}

fn render_verdict_internal(verdict: &SaveVerdict, rows: &[Row], use_color: Option<bool>) -> String {
    let label = |id: &AttributeId| {
        rows.iter()
            .find(|r| r.id == *id)
            .map(|r| Label {
                index: r.index.to_string(),
                path: r.path.clone(),
            })
            .unwrap_or_else(|| Label {
                index: id.to_string(),
                path: String::new(),
            })
    };
    let data = match verdict {
        SaveVerdict::Allowed => VerdictData {
            verdict: "allowed",
            reason: "",
            question: "",
            labels: Vec::new(),
        },
        SaveVerdict::Prompt {
            reason,
            attributes,
            per_field,
        } => VerdictData {
            verdict: "prompt",
            reason: reason_label(*reason),
            question: if *per_field {
                "one question each"
            } else {
                "one question for all"
            },
            labels: attributes.iter().map(label).collect(),
        },
        SaveVerdict::Refused { reason, first } => VerdictData {
            verdict: "refused",
            reason: reason_label(*reason),
            question: "",
            labels: vec![label(first)],
        },
    };
    render_template(VERDICT_TEMPLATE, &data, use_color)
}

pub fn render_view(marked: usize, counters: Counters, all_viewed: bool) -> String {
    render_view_internal(marked, counters, all_viewed, None)
}

fn render_view_internal(
    marked: usize,
    counters: Counters,
    all_viewed: bool,
    use_color: Option<bool>,
) -> String {
    let data = ViewData {
        marked,
        unviewed: counters.unviewed(),
        all_viewed,
    };
    render_template(VIEW_TEMPLATE, &data, use_color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use attrhostapp::AttributeNode;

    fn sample() -> AttributeTree {
        let mut tree = AttributeTree::new();
        let invoice = tree.insert_root(AttributeNode::new("Invoice", "INV-1")).unwrap();
        let mut qty = AttributeNode::new("Qty", "200");
        qty.validity = Validity::Invalid;
        qty.validation_message = Some("too many".into());
        qty.viewed = true;
        tree.insert_child(invoice, qty).unwrap();
        tree.assign_positional_display_order();
        tree
    }

    #[test]
    fn test_rows_in_tab_order_with_paths() {
        let rows = rows(&sample());
        let labels: Vec<_> = rows.iter().map(|r| (r.index, r.path.as_str())).collect();
        assert_eq!(labels, vec![(1, "Invoice"), (2, "Invoice/Qty")]);
    }

    #[test]
    fn test_summary_lists_status() {
        let tree = sample();
        let out = render_summary_internal(Counters::recount(&tree), &rows(&tree), Some(false));
        assert_eq!(
            out,
            "Summary:  2 attributes, 1 unviewed, 1 invalid\n\
             \x20 1  Invoice      INV-1  unviewed\n\
             \x20 2  Invoice/Qty  200  invalid: too many\n"
        );
    }

    #[test]
    fn test_status_parts_are_joined() {
        let mut row = rows(&sample()).remove(1);
        row.viewed = false;
        row.hint = HintType::Indirect;
        let out = render_next_internal(Some(&row), "attribute", Some(false));
        assert_eq!(
            out,
            "  2  Invoice/Qty  200  invalid: too many, indirect hint, unviewed\n"
        );
    }

    #[test]
    fn test_summary_json_shape() {
        let tree = sample();
        let json = render_summary_json(Counters::recount(&tree), &rows(&tree)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["attributes"], 2);
        assert_eq!(value["items"][1]["message"], "too many");
        assert!(value["items"][0].get("message").is_none());
    }

    #[test]
    fn test_next_when_nothing_found() {
        assert_eq!(
            render_next_internal(None, "invalid attribute", Some(false)),
            "No invalid attribute found\n"
        );
    }

    #[test]
    fn test_refused_verdict_names_first_attribute() {
        let tree = sample();
        let rows = rows(&tree);
        let verdict = SaveVerdict::Refused {
            reason: GateReason::Invalid,
            first: rows[1].id,
        };
        assert_eq!(
            render_verdict_internal(&verdict, &rows, Some(false)),
            "Save refused: first invalid attribute is 2 Invoice/Qty\n"
        );
    }

    #[test]
    fn test_prompt_verdict_lists_attributes() {
        let tree = sample();
        let rows = rows(&tree);
        let verdict = SaveVerdict::Prompt {
            reason: GateReason::Unviewed,
            attributes: vec![rows[0].id],
            per_field: false,
        };
        assert_eq!(
            render_verdict_internal(&verdict, &rows, Some(false)),
            "Save needs confirmation: 1 unviewed attribute(s), one question for all\n  1 Invoice\n"
        );
        assert_eq!(
            render_verdict_internal(&SaveVerdict::Allowed, &rows, Some(false)),
            "Save allowed\n"
        );
    }

    #[test]
    fn test_view_reports_none_left() {
        let tree = sample();
        let counters = Counters::recount(&tree);
        assert_eq!(
            render_view_internal(2, counters, false, Some(false)),
            "Marked 2 attribute(s) viewed, 1 unviewed left\n"
        );
        let out = render_view_internal(1, counters, true, Some(false));
        assert!(out.ends_with("unviewed left\nEvery attribute has been viewed\n"));
    }

    #[test]
    fn test_color_output_uses_known_styles() {
        let tree = sample();
        let out = render_summary_internal(Counters::recount(&tree), &rows(&tree), Some(true));
        assert!(out.contains("Invoice/Qty"));
        assert!(!out.contains("(!?)"));
    }
}

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use moneyudi_core::reports::PeriodSummary;
use moneyudi_core::utils::format::format_tx_time;
use moneyudi_core::utils::{format_idr, truncate_string};

use crate::app::{App, ReportsView};
use crate::ui::render::signed_amount;
use crate::ui::styles;

const BAR_WIDTH: usize = 20;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    match app.reports_view {
        ReportsView::Summary => render_summary(frame, app, area),
        ReportsView::History => render_history(frame, app, area),
    }
}

fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let Some(summary) = app.period_summary() else {
        let block = Block::default()
            .title(" Reports ")
            .borders(Borders::ALL)
            .border_style(styles::border_style(true));
        let paragraph = Paragraph::new(Line::from(Span::styled(
            " This period cannot be shown. Check the cutoff day in Settings.",
            styles::error_style(),
        )))
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(5)])
        .split(area);

    render_totals(frame, app, &summary, chunks[0]);
    render_breakdown(frame, &summary, chunks[1]);
}

fn render_totals(frame: &mut Frame, app: &App, summary: &PeriodSummary<'_>, area: Rect) {
    let net_style = if summary.net < Decimal::ZERO {
        styles::error_style()
    } else {
        styles::success_style()
    };

    let biggest = match summary.biggest_expense {
        Some(tx) => format!(
            "{} {} ({})",
            format_idr(tx.amount),
            app.category_name(tx.category_id.as_deref()),
            format_tx_time(&tx.date)
        ),
        None => "-".to_string(),
    };

    let lines = vec![
        Line::from(vec![
            Span::styled(" Expense  ", styles::muted_style()),
            Span::styled(format_idr(summary.total_expense), styles::error_style()),
            Span::styled("    Income  ", styles::muted_style()),
            Span::styled(format_idr(summary.total_income), styles::success_style()),
        ]),
        Line::from(vec![
            Span::styled(" Net      ", styles::muted_style()),
            Span::styled(format_idr(summary.net), net_style),
            Span::styled(
                format!("    {} transactions", summary.transactions.len()),
                styles::muted_style(),
            ),
        ]),
        Line::from(vec![
            Span::styled(" Biggest  ", styles::muted_style()),
            Span::raw(biggest),
        ]),
        Line::from(Span::styled(
            " [m] mode  ←/→ period  [t] today  [h] history",
            styles::muted_style(),
        )),
    ];

    let title = format!(
        " {}: {} ",
        app.report_mode.title(),
        app.report_mode.label(&summary.range)
    );
    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Share of `amount` in `total` as a bar of `BAR_WIDTH` cells
fn share_bar(amount: Decimal, total: Decimal) -> (String, u32) {
    if total <= Decimal::ZERO {
        return (String::new(), 0);
    }
    let ratio = (amount / total).to_f64().unwrap_or(0.0).clamp(0.0, 1.0);
    let filled = (ratio * BAR_WIDTH as f64).round() as usize;
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled));
    (bar, (ratio * 100.0).round() as u32)
}

fn render_breakdown(frame: &mut Frame, summary: &PeriodSummary<'_>, area: Rect) {
    let block = Block::default()
        .title(" Spending by category ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    if summary.by_category.is_empty() {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            " No expenses in this period.",
            styles::muted_style(),
        )))
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let lines: Vec<Line> = summary
        .by_category
        .iter()
        .map(|row| {
            let (bar, pct) = share_bar(row.amount, summary.total_expense);
            Line::from(vec![
                Span::raw(format!(
                    " {:<24}",
                    truncate_string(&format!("{} {}", row.icon, row.name), 24)
                )),
                Span::styled(bar, styles::highlight_style()),
                Span::styled(format!(" {:>3}% ", pct), styles::muted_style()),
                Span::styled(format_idr(row.amount), styles::error_style()),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_history(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area);

    let filter = &app.history_filter;
    let category = match filter.category_id.as_deref() {
        Some(id) => app.category_name(Some(id)),
        None => "any".to_string(),
    };
    let date = |d: Option<chrono::NaiveDate>| {
        d.map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    let filter_line = Line::from(vec![
        Span::styled(" [/] ", styles::help_key_style()),
        Span::raw(if filter.query.is_empty() {
            "-".to_string()
        } else {
            filter.query.clone()
        }),
        Span::styled("  [c] ", styles::help_key_style()),
        Span::raw(category),
        Span::styled("  [f] ", styles::help_key_style()),
        Span::raw(date(filter.from)),
        Span::styled("  [t] ", styles::help_key_style()),
        Span::raw(date(filter.to)),
        Span::styled("  [x] clear", styles::muted_style()),
    ]);
    let filter_block = Block::default()
        .title(" Filters ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(Paragraph::new(filter_line).block(filter_block), chunks[0]);

    let rows = app.history();
    let title = if filter.is_active() {
        format!(" Matching transactions ({}) ", rows.len())
    } else {
        format!(" Recent transactions ({}) ", rows.len())
    };
    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .map(|(i, tx)| {
            let category = app.category_name(tx.category_id.as_deref());
            let line = Line::from(vec![
                Span::styled(format!("{}  ", format_tx_time(&tx.date)), styles::muted_style()),
                Span::raw(format!("{:<22}", truncate_string(&category, 22))),
                Span::styled(
                    format!("{:>16}", signed_amount(tx.kind, tx.amount)),
                    styles::amount_style(tx.kind),
                ),
                Span::styled(
                    format!("  {}", truncate_string(tx.note_text(), 30)),
                    styles::muted_style(),
                ),
            ]);
            let style = if i == app.history_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            ListItem::new(line).style(style)
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.history_selection));
    frame.render_stateful_widget(List::new(items).block(block), chunks[1], &mut state);
}

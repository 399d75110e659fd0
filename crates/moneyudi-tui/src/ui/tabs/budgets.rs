use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph},
    Frame,
};

use moneyudi_core::period::ReportMode;
use moneyudi_core::utils::{format_idr, truncate_string};

use crate::app::App;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    render_list(frame, app, chunks[0]);
    render_detail(frame, app, chunks[1]);
}

fn render_list(frame: &mut Frame, app: &App, area: Rect) {
    let overview = app.budget_overview();
    let period = app
        .current_period()
        .map(|range| ReportMode::Custom.label(&range))
        .unwrap_or_default();

    let items: Vec<ListItem> = overview
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let limit = if row.limit.is_zero() {
                "no limit".to_string()
            } else {
                format_idr(row.limit)
            };
            let line = Line::from(vec![
                Span::raw(format!(
                    "{:<22}",
                    truncate_string(&row.category.display_name(), 22)
                )),
                Span::styled(
                    format!("{:>14}", format_idr(row.spent)),
                    styles::budget_style(row.percent, row.warning),
                ),
                Span::styled(format!(" / {:<14}", limit), styles::muted_style()),
                Span::styled(
                    format!("{:>4}%", row.percent),
                    styles::budget_style(row.percent, row.warning),
                ),
            ]);
            let style = if i == app.budget_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            ListItem::new(line).style(style)
        })
        .collect();

    let block = Block::default()
        .title(format!(" Budgets {} ", period))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    if items.is_empty() {
        let hint = Paragraph::new(Line::from(Span::styled(
            " No expense categories yet. Add one in Settings.",
            styles::muted_style(),
        )))
        .block(block);
        frame.render_widget(hint, area);
        return;
    }

    let mut state = ListState::default();
    state.select(Some(app.budget_selection));
    frame.render_stateful_widget(List::new(items).block(block), area, &mut state);
}

fn render_detail(frame: &mut Frame, app: &App, area: Rect) {
    let overview = app.budget_overview();
    let Some(row) = overview.get(app.budget_selection) else {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(styles::border_style(false));
        frame.render_widget(block, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(4)])
        .split(area);

    let style = styles::budget_style(row.percent, row.warning);
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(format!(" {} ", row.category.display_name()))
                .title_style(styles::title_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(false)),
        )
        .gauge_style(style)
        .percent(u16::from(row.percent));
    frame.render_widget(gauge, chunks[0]);

    let remaining = row.limit - row.spent;
    let mut lines = vec![
        Line::from(vec![
            Span::styled(" Spent      ", styles::muted_style()),
            Span::styled(format_idr(row.spent), style),
        ]),
        Line::from(vec![
            Span::styled(" Limit      ", styles::muted_style()),
            Span::raw(format_idr(row.limit)),
        ]),
    ];
    if !row.limit.is_zero() {
        let (label, remaining_style) = if remaining.is_sign_negative() {
            (" Over by    ", styles::error_style())
        } else {
            (" Remaining  ", styles::success_style())
        };
        lines.push(Line::from(vec![
            Span::styled(label, styles::muted_style()),
            Span::styled(format_idr(remaining.abs()), remaining_style),
        ]));
    }
    if row.warning {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            " Over 80% of this budget is used",
            styles::highlight_style(),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " [Enter] set the monthly limit",
        styles::muted_style(),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(Paragraph::new(lines).block(block), chunks[1]);
}

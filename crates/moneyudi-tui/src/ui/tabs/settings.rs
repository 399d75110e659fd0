use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use moneyudi_core::period::{CutoffOverflow, ReportMode};

use crate::app::App;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(5)])
        .split(area);

    render_billing(frame, app, chunks[0]);
    render_categories(frame, app, chunks[1]);
}

fn render_billing(frame: &mut Frame, app: &App, area: Rect) {
    let period = app
        .current_period()
        .map(|range| ReportMode::Custom.label(&range))
        .unwrap_or_else(|| "-".to_string());
    let overflow = match app.config.cutoff_overflow {
        CutoffOverflow::RollForward => "roll into next month",
        CutoffOverflow::Clamp => "use last day of month",
    };

    let lines = vec![
        Line::from(vec![
            Span::styled(" Cutoff day      ", styles::muted_style()),
            Span::styled(app.ledger.cutoff_day().to_string(), styles::highlight_style()),
            Span::styled("   [c] change", styles::muted_style()),
        ]),
        Line::from(vec![
            Span::styled(" Current period  ", styles::muted_style()),
            Span::raw(period),
        ]),
        Line::from(vec![
            Span::styled(" Short months    ", styles::muted_style()),
            Span::raw(overflow),
            Span::styled("   [o] toggle", styles::muted_style()),
        ]),
        Line::from(vec![
            Span::styled(" Signed in as    ", styles::muted_style()),
            Span::raw(app.session.email().unwrap_or("-").to_string()),
            Span::styled("   [L] sign out", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .title(" Billing ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_categories(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .ledger
        .categories
        .iter()
        .enumerate()
        .map(|(i, category)| {
            let line = Line::from(vec![
                Span::raw(format!("{:<28}", category.display_name())),
                Span::styled(category.scope.label(), styles::muted_style()),
            ]);
            let style = if i == app.category_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            ListItem::new(line).style(style)
        })
        .collect();

    let block = Block::default()
        .title(format!(" Categories ({}) ", items.len()))
        .title_style(styles::title_style())
        .title_bottom(Line::from(Span::styled(
            " [n]ew  [e]dit  [i]con  [s]cope  [d]elete ",
            styles::muted_style(),
        )))
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let mut state = ListState::default();
    state.select(Some(app.category_selection));
    frame.render_stateful_widget(List::new(items).block(block), area, &mut state);
}

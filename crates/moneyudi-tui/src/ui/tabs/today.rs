use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use moneyudi_core::utils::format::format_tx_time;
use moneyudi_core::utils::{format_idr, truncate_string};

use crate::app::App;
use crate::ui::render::signed_amount;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(5)])
        .split(chunks[0]);

    render_totals(frame, app, left[0]);
    render_transactions(frame, app, left[1]);
    render_vocab(frame, app, chunks[1]);
}

fn render_totals(frame: &mut Frame, app: &App, area: Rect) {
    let summary = app.today_summary();
    let lines = vec![
        Line::from(vec![
            Span::styled(" Spent   ", styles::muted_style()),
            Span::styled(format_idr(summary.expense.total), styles::error_style()),
            Span::styled(
                format!("  ({} transactions)", summary.expense.count),
                styles::muted_style(),
            ),
        ]),
        Line::from(vec![
            Span::styled(" Earned  ", styles::muted_style()),
            Span::styled(format_idr(summary.income.total), styles::success_style()),
            Span::styled(
                format!("  ({} transactions)", summary.income.count),
                styles::muted_style(),
            ),
        ]),
    ];

    let title = format!(" Today, {} ", app.today().format("%A %d %B"));
    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_transactions(frame: &mut Frame, app: &App, area: Rect) {
    let summary = app.today_summary();
    let rows = summary.latest();

    let block = Block::default()
        .title(format!(" Latest ({}) ", summary.transactions.len()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    if rows.is_empty() {
        let hint = Paragraph::new(Line::from(Span::styled(
            " Nothing recorded today. Press [a] to add.",
            styles::muted_style(),
        )))
        .block(block);
        frame.render_widget(hint, area);
        return;
    }

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
                    format!("  {}", truncate_string(tx.note_text(), 24)),
                    styles::muted_style(),
                ),
            ]);
            let style = if i == app.today_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            ListItem::new(line).style(style)
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.today_selection));
    frame.render_stateful_widget(List::new(items).block(block), area, &mut state);
}

fn render_vocab(frame: &mut Frame, app: &App, area: Rect) {
    let panel = &app.vocab_panel;
    let block = Block::default()
        .title(" Word of the hour ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    let Some(ref cached) = panel.card else {
        let text = if panel.loading {
            " Loading a new word..."
        } else {
            " No word yet. Press [v] to fetch one."
        };
        let paragraph =
            Paragraph::new(Line::from(Span::styled(text, styles::muted_style()))).block(block);
        frame.render_widget(paragraph, area);
        return;
    };

    let card = &cached.data;
    let mut lines = vec![Line::from(Span::styled(
        format!(" {}", card.word),
        styles::highlight_style(),
    ))];
    if let Some(ref phonetic) = card.phonetic {
        lines.push(Line::from(Span::styled(format!(" {}", phonetic), styles::muted_style())));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::raw(format!(" {}", card.meaning_translated))));
    if card.meaning_translated != card.meaning_source {
        lines.push(Line::from(Span::styled(
            format!(" {}", card.meaning_source),
            styles::muted_style(),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!(" \"{}\"", card.example),
        styles::list_item_style(),
    )));
    lines.push(Line::from(""));

    let footer = match panel.minutes_until_refresh_at(Utc::now()) {
        Some(0) | None => " Refreshing soon".to_string(),
        Some(minutes) => format!(" New word in {} min", minutes),
    };
    lines.push(Line::from(Span::styled(footer, styles::muted_style())));

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

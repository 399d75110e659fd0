use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use moneyudi_core::cache::CachedData;
use moneyudi_core::models::TxKind;

use crate::app::{App, AppState, Editor, LoginStep, Tab, TxField};

use super::styles;
use super::tabs::{budgets, reports, settings, today};

const LOGO: [&str; 2] = ["   ╔╦╗┌─┐┌┐┌┌─┐┬ ┬╦ ╦┌┬┐┬", "   ║║║│ ││││├┤ └┬┘╚╦╝ │││"];

/// Widest toast before wrapping
const TOAST_WIDTH: u16 = 44;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Tabs
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    render_main_content(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::LoggingIn => render_login_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::ConfirmingDelete => render_delete_overlay(frame, app),
        AppState::Editing => render_editor_overlay(frame, app),
        AppState::Normal | AppState::Quitting => {}
    }

    render_toasts(frame, app);
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  MoneYudi";
    let help_hint = "[?] Help";
    let account = app.session.email().unwrap_or("");

    let used = title.len() + account.chars().count() + help_hint.len() + 6;
    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat((area.width as usize).saturating_sub(used))),
        Span::styled(account, styles::muted_style()),
        Span::raw("   "),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let tabs = [Tab::Today, Tab::Reports, Tab::Budgets, Tab::Settings];

    let mut spans = vec![Span::raw(" ")];
    for (i, tab) in tabs.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        let label = format!("[{}] {}", i + 1, tab.title());
        if *tab == app.current_tab {
            spans.push(Span::styled(label, styles::tab_style(true)));
        } else {
            spans.push(Span::styled(label, styles::muted_style()));
        }
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.current_tab {
        Tab::Today => today::render(frame, app, area),
        Tab::Reports => reports::render(frame, app, area),
        Tab::Budgets => budgets::render(frame, app, area),
        Tab::Settings => settings::render(frame, app, area),
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let left_text = if app.loading {
        " Syncing... ".to_string()
    } else {
        match app.synced_at {
            Some(at) => format!(" Updated {} ", CachedData::at((), at).age_display_at(Utc::now())),
            None => " Not synced ".to_string(),
        }
    };

    let shortcuts = match app.current_tab {
        Tab::Today => "[a]dd | [d]elete | [v]ocab | [u]pdate | [q]uit",
        Tab::Reports => "[m]ode | ←/→ period | [h]istory | [u]pdate | [q]uit",
        Tab::Budgets => "Enter edit | [u]pdate | [q]uit",
        Tab::Settings => "[c]utoff | [n]ew | [e]dit | [d]elete | [L]ogout | [q]uit",
    };
    let right_text = format!(" {} ", shortcuts);

    let padding = (area.width as usize)
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding)),
        Span::styled(right_text, styles::muted_style()),
    ]);

    frame.render_widget(
        Paragraph::new(status_line).style(styles::status_bar_style()),
        area,
    );
}

fn logo_lines() -> Vec<Line<'static>> {
    LOGO.iter()
        .map(|l| Line::from(Span::styled(*l, styles::title_style())))
        .collect()
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(54, 33, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();
    lines.push(Line::from(Span::styled(
        format!("              version {}", env!("CARGO_PKG_VERSION")),
        styles::muted_style(),
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(" Navigation", styles::highlight_style())));
    lines.push(help_line("1-4", "Switch tabs"));
    lines.push(help_line("Tab", "Next tab"));
    lines.push(help_line("↑/↓", "Move selection"));
    lines.push(help_line("u", "Reload from server"));
    lines.push(help_line("q", "Quit"));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(" Today", styles::highlight_style())));
    lines.push(help_line("a", "Add income or expense"));
    lines.push(help_line("d", "Delete selected"));
    lines.push(help_line("v", "New vocabulary word"));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(" Reports", styles::highlight_style())));
    lines.push(help_line("m", "Daily/weekly/monthly/cutoff"));
    lines.push(help_line("←/→", "Previous/next period"));
    lines.push(help_line("h", "Toggle history"));
    lines.push(help_line("/ c f t x", "Search, category, from, to, clear"));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(" Budgets & Settings", styles::highlight_style())));
    lines.push(help_line("Enter", "Edit budget amount"));
    lines.push(help_line("c", "Billing cutoff day"));
    lines.push(help_line("o", "Short-month cutoff handling"));
    lines.push(help_line("n e i s", "New, rename, icon, scope"));
    lines.push(help_line("L", "Sign out"));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("       Press ", styles::muted_style()),
        Span::styled("?", styles::help_key_style()),
        Span::styled(" or ", styles::muted_style()),
        Span::styled("Esc", styles::help_key_style()),
        Span::styled(" to close", styles::muted_style()),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn input_line(label: &str, value: &str, focused: bool) -> Line<'static> {
    let style = if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let cursor = if focused { "▌" } else { "" };
    Line::from(vec![
        Span::styled(format!("  {:<9}[", label), styles::muted_style()),
        Span::styled(format!("{:<24}{}", value, cursor), style),
        Span::styled("]", styles::muted_style()),
    ])
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let height = if app.login_error.is_some() { 13 } else { 11 };
    let area = centered_rect_fixed(50, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();
    lines.push(Line::from(""));

    match app.login_step {
        LoginStep::Email => {
            lines.push(input_line("Email:", &app.login_email, true));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "  Enter sends a sign-in code. Esc quits.",
                styles::muted_style(),
            )));
        }
        LoginStep::Code => {
            lines.push(input_line("Email:", &app.login_email, false));
            lines.push(input_line("Code:", &app.login_code, true));
            lines.push(Line::from(Span::styled(
                "  Check your inbox. Esc changes the email.",
                styles::muted_style(),
            )));
        }
    }

    if app.login_busy {
        lines.push(Line::from(Span::styled("  Please wait...", styles::highlight_style())));
    }

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("  {}", error), styles::error_style())));
    }

    let block = Block::default()
        .title(" Sign in ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_editor_overlay(frame: &mut Frame, app: &App) {
    let Some(ref editor) = app.editor else {
        return;
    };

    let mut lines = vec![Line::from("")];
    match editor {
        Editor::Transaction(form) => {
            lines.push(input_line("Amount:", &form.amount, form.field == TxField::Amount));

            let kind_focused = form.field == TxField::Kind;
            let kind_style = styles::amount_style(form.kind);
            lines.push(Line::from(vec![
                Span::styled("  Type:    ", styles::muted_style()),
                Span::styled(
                    if kind_focused { "◀ " } else { "  " },
                    styles::muted_style(),
                ),
                Span::styled(form.kind.to_string(), kind_style),
                Span::styled(
                    if kind_focused { " ▶" } else { "" },
                    styles::muted_style(),
                ),
            ]));

            let category_focused = form.field == TxField::Category;
            let category = match form.category_id.as_deref() {
                Some(id) => app.category_name(Some(id)),
                None => "(none)".to_string(),
            };
            lines.push(Line::from(vec![
                Span::styled("  Category:", styles::muted_style()),
                Span::styled(
                    if category_focused { "◀ " } else { "  " },
                    styles::muted_style(),
                ),
                Span::styled(category, styles::list_item_style()),
                Span::styled(
                    if category_focused { " ▶" } else { "" },
                    styles::muted_style(),
                ),
            ]));

            lines.push(input_line("Note:", &form.note, form.field == TxField::Note));
            lines.push(input_line("When:", &form.date, form.field == TxField::Date));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "  Tab next field, ←/→ change, Enter save",
                styles::muted_style(),
            )));
        }
        Editor::NewCategory(form) => {
            lines.push(input_line("Name:", &form.name, true));
            lines.push(Line::from(vec![
                Span::styled("  Icon:     ◀ ", styles::muted_style()),
                Span::raw(form.icon()),
                Span::styled(" ▶", styles::muted_style()),
            ]));
            lines.push(Line::from(vec![
                Span::styled("  Used for: ", styles::muted_style()),
                Span::styled(form.scope.label(), styles::highlight_style()),
            ]));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "  ←/→ icon, Tab scope, Enter save",
                styles::muted_style(),
            )));
        }
        Editor::RenameCategory { name, .. } => lines.push(input_line("Name:", name, true)),
        Editor::BudgetAmount { category_id, input } => {
            lines.push(Line::from(Span::styled(
                format!("  {}", app.category_name(Some(category_id.as_str()))),
                styles::highlight_style(),
            )));
            lines.push(input_line("Amount:", input, true));
            lines.push(Line::from(Span::styled(
                "  0 removes the limit",
                styles::muted_style(),
            )));
        }
        Editor::CutoffDay(input) => lines.push(input_line("Day:", input, true)),
        Editor::HistoryQuery(input) => lines.push(input_line("Search:", input, true)),
        Editor::HistoryFrom(input) | Editor::HistoryTo(input) => {
            lines.push(input_line("Date:", input, true))
        }
    }

    let height = lines.len() as u16 + 3;
    let area = centered_rect_fixed(52, height, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(format!(" {} ", editor.title()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_confirm(frame: &mut Frame, title: &str, question: String) {
    let area = centered_rect_fixed(50, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(format!("  {}", question), styles::list_item_style())),
        Line::from(""),
        Line::from(vec![
            Span::raw("          "),
            Span::styled("[y]", styles::help_key_style()),
            Span::styled(" Yes    ", styles::help_desc_style()),
            Span::styled("[n]", styles::help_key_style()),
            Span::styled(" No", styles::help_desc_style()),
        ]),
    ];

    let block = Block::default()
        .title(format!(" {} ", title))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_quit_overlay(frame: &mut Frame) {
    render_confirm(frame, "Quit", "Quit MoneYudi?".to_string());
}

fn render_delete_overlay(frame: &mut Frame, app: &App) {
    let label = app.pending_delete_label().unwrap_or_default();
    render_confirm(frame, "Delete", format!("Delete {}?", label));
}

/// Stack of toasts in the top-right corner, newest at the bottom
fn render_toasts(frame: &mut Frame, app: &App) {
    let full = frame.area();
    let width = TOAST_WIDTH.min(full.width);
    let x = full.x + full.width.saturating_sub(width + 1);
    let mut y = full.y + 1;

    for toast in app.notifications.active() {
        if y + 3 > full.y + full.height {
            break;
        }
        let area = Rect::new(x, y, width, 3);
        frame.render_widget(Clear, area);
        let style = styles::toast_style(toast.kind);
        let block = Block::default().borders(Borders::ALL).border_style(style);
        let text = Line::from(vec![
            Span::styled(format!("{} ", toast.kind.icon()), style),
            Span::styled(toast.message.clone(), styles::list_item_style()),
        ]);
        frame.render_widget(
            Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
            area,
        );
        y += 3;
    }
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

/// Signed amount for list rows, e.g. `-Rp 25.000`
pub fn signed_amount(kind: TxKind, amount: rust_decimal::Decimal) -> String {
    let formatted = moneyudi_core::utils::format_idr(amount);
    match kind {
        TxKind::Expense => format!("-{}", formatted),
        TxKind::Income => format!("+{}", formatted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_signed_amount() {
        assert_eq!(signed_amount(TxKind::Expense, Decimal::from(25_000)), "-Rp 25.000");
        assert_eq!(signed_amount(TxKind::Income, Decimal::from(1_500_000)), "+Rp 1.500.000");
    }

    #[test]
    fn test_centered_rect_fits_small_area() {
        let area = Rect::new(0, 0, 30, 8);
        let r = centered_rect_fixed(50, 10, area);
        assert_eq!(r, Rect::new(0, 0, 30, 8));
    }
}

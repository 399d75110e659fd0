//! Keyboard input handling for the TUI.
//!
//! Translates key events into application state changes. Overlays
//! (login, help, confirmations, editors) capture all keys while open.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use moneyudi_core::models::category::CATEGORY_ICONS;
use moneyudi_core::models::CategoryScope;

use crate::app::{
    can_add_char, App, AppState, CategoryForm, Editor, LoginStep, PendingDelete, ReportsView,
    Tab, TxField, MAX_CODE_LENGTH, MAX_EMAIL_LENGTH, PAGE_SCROLL_SIZE,
};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::LoggingIn => return Ok(handle_login_input(app, key)),
        AppState::Editing => {
            handle_editor_input(app, key);
            return Ok(false);
        }
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            return Ok(false);
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return Ok(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::ConfirmingDelete => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_delete(),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_delete(),
                _ => {}
            }
            return Ok(false);
        }
        AppState::Quitting => return Ok(true),
        AppState::Normal => {}
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
            return Ok(false);
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
            return Ok(false);
        }
        KeyCode::Char('1') => app.current_tab = Tab::Today,
        KeyCode::Char('2') => app.current_tab = Tab::Reports,
        KeyCode::Char('3') => app.current_tab = Tab::Budgets,
        KeyCode::Char('4') => app.current_tab = Tab::Settings,
        KeyCode::Tab => app.current_tab = app.current_tab.next(),
        KeyCode::BackTab => app.current_tab = app.current_tab.prev(),
        KeyCode::Char('u') => app.refresh_ledger(),
        _ => match app.current_tab {
            Tab::Today => handle_today_input(app, key),
            Tab::Reports => handle_reports_input(app, key),
            Tab::Budgets => handle_budgets_input(app, key),
            Tab::Settings => handle_settings_input(app, key),
        },
    }

    Ok(false)
}

/// Returns true if the app should quit
fn handle_login_input(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => match app.login_step {
            LoginStep::Email => {
                app.state = AppState::Quitting;
                return true;
            }
            LoginStep::Code => {
                app.login_step = LoginStep::Email;
                app.login_code.clear();
                app.login_error = None;
            }
        },
        KeyCode::Enter if !app.login_busy => match app.login_step {
            LoginStep::Email => app.send_login_code(),
            LoginStep::Code => app.verify_login_code(),
        },
        KeyCode::Backspace => {
            match app.login_step {
                LoginStep::Email => app.login_email.pop(),
                LoginStep::Code => app.login_code.pop(),
            };
        }
        KeyCode::Char(c) => match app.login_step {
            LoginStep::Email => {
                if can_add_char(app.login_email.len(), c, MAX_EMAIL_LENGTH) {
                    app.login_email.push(c);
                }
            }
            LoginStep::Code => {
                if can_add_char(app.login_code.len(), c, MAX_CODE_LENGTH) && !c.is_whitespace() {
                    app.login_code.push(c);
                }
            }
        },
        _ => {}
    }
    false
}

fn handle_editor_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_editor(),
        KeyCode::Enter => app.submit_editor(),
        KeyCode::Tab | KeyCode::Down => move_field(app, true),
        KeyCode::BackTab | KeyCode::Up => move_field(app, false),
        KeyCode::Left => cycle_choice(app, false),
        KeyCode::Right => cycle_choice(app, true),
        KeyCode::Backspace => {
            if let Some((text, _)) = app.editor.as_mut().and_then(Editor::text_mut) {
                text.pop();
            }
        }
        KeyCode::Char(' ') if on_choice_field(app) => cycle_choice(app, true),
        KeyCode::Char(c) => {
            if let Some((text, max)) = app.editor.as_mut().and_then(Editor::text_mut) {
                if can_add_char(text.chars().count(), c, max) {
                    text.push(c);
                }
            }
        }
        _ => {}
    }
}

fn on_choice_field(app: &App) -> bool {
    matches!(
        app.editor,
        Some(Editor::Transaction(ref form)) if matches!(form.field, TxField::Kind | TxField::Category)
    )
}

fn move_field(app: &mut App, forward: bool) {
    match app.editor.as_mut() {
        Some(Editor::Transaction(form)) => {
            form.field = if forward {
                form.field.next()
            } else {
                form.field.prev()
            };
        }
        Some(Editor::NewCategory(form)) => {
            form.scope = form.scope.next();
        }
        _ => {}
    }
}

fn cycle_choice(app: &mut App, forward: bool) {
    if matches!(app.editor, Some(Editor::Transaction(_))) {
        app.cycle_form_choice(forward);
    } else if let Some(Editor::NewCategory(form)) = app.editor.as_mut() {
        let len = CATEGORY_ICONS.len();
        form.icon = if forward {
            (form.icon + 1) % len
        } else {
            (form.icon + len - 1) % len
        };
    }
}

fn move_selection(selection: &mut usize, len: usize, key: KeyCode) {
    let max_index = len.saturating_sub(1);
    match key {
        KeyCode::Up | KeyCode::Char('k') => *selection = selection.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => *selection = (*selection + 1).min(max_index),
        KeyCode::PageUp => *selection = selection.saturating_sub(PAGE_SCROLL_SIZE),
        KeyCode::PageDown => *selection = (*selection + PAGE_SCROLL_SIZE).min(max_index),
        KeyCode::Home => *selection = 0,
        KeyCode::End => *selection = max_index,
        _ => {}
    }
}

fn handle_today_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('a') | KeyCode::Enter => app.open_transaction_form(),
        KeyCode::Char('d') | KeyCode::Delete => {
            let id = app
                .today_summary()
                .latest()
                .get(app.today_selection)
                .map(|tx| tx.id.clone());
            if let Some(id) = id {
                app.request_delete(PendingDelete::Transaction(id));
            }
        }
        KeyCode::Char('v') => app.refresh_vocab(),
        KeyCode::Left => app.current_tab = app.current_tab.prev(),
        KeyCode::Right => app.current_tab = app.current_tab.next(),
        code => {
            let len = app.today_summary().latest().len();
            move_selection(&mut app.today_selection, len, code);
        }
    }
}

fn handle_reports_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('h') => {
            app.reports_view = match app.reports_view {
                ReportsView::Summary => ReportsView::History,
                ReportsView::History => ReportsView::Summary,
            };
            return;
        }
        KeyCode::Char('m') => {
            app.report_mode = app.report_mode.next();
            app.report_date = app.today();
            return;
        }
        KeyCode::Left => {
            app.report_date = app.report_mode.step(app.report_date, false);
            return;
        }
        KeyCode::Right => {
            app.report_date = app.report_mode.step(app.report_date, true);
            return;
        }
        KeyCode::Char('t') if app.reports_view == ReportsView::Summary => {
            app.report_date = app.today();
            return;
        }
        _ => {}
    }

    if app.reports_view != ReportsView::History {
        return;
    }

    match key.code {
        KeyCode::Char('/') => {
            let query = app.history_filter.query.clone();
            app.open_editor(Editor::HistoryQuery(query));
        }
        KeyCode::Char('c') => app.cycle_history_category(),
        KeyCode::Char('f') => {
            let from = date_input(app.history_filter.from);
            app.open_editor(Editor::HistoryFrom(from));
        }
        KeyCode::Char('t') => {
            let to = date_input(app.history_filter.to);
            app.open_editor(Editor::HistoryTo(to));
        }
        KeyCode::Char('x') => {
            app.history_filter.clear();
            app.history_selection = 0;
        }
        KeyCode::Char('d') | KeyCode::Delete => {
            let id = app.history().get(app.history_selection).map(|tx| tx.id.clone());
            if let Some(id) = id {
                app.request_delete(PendingDelete::Transaction(id));
            }
        }
        code => {
            let len = app.history().len();
            move_selection(&mut app.history_selection, len, code);
        }
    }
}

fn date_input(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn handle_budgets_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter | KeyCode::Char('e') => {
            let target = app
                .budget_overview()
                .get(app.budget_selection)
                .map(|row| (row.category.id.clone(), row.limit));
            if let Some((category_id, limit)) = target {
                let input = if limit.is_zero() {
                    String::new()
                } else {
                    limit.trunc().to_string()
                };
                app.open_editor(Editor::BudgetAmount { category_id, input });
            }
        }
        KeyCode::Left => app.current_tab = app.current_tab.prev(),
        KeyCode::Right => app.current_tab = app.current_tab.next(),
        code => {
            let len = app.budget_overview().len();
            move_selection(&mut app.budget_selection, len, code);
        }
    }
}

fn handle_settings_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('c') => {
            let current = app.ledger.cutoff_day().to_string();
            app.open_editor(Editor::CutoffDay(current));
        }
        KeyCode::Char('o') => app.toggle_cutoff_overflow(),
        KeyCode::Char('n') => app.open_editor(Editor::NewCategory(CategoryForm {
            name: String::new(),
            icon: 0,
            scope: CategoryScope::Expense,
        })),
        KeyCode::Char('e') | KeyCode::Enter => {
            if let Some(category) = app.selected_category() {
                let editor = Editor::RenameCategory {
                    id: category.id.clone(),
                    name: category.name.clone(),
                };
                app.open_editor(editor);
            }
        }
        KeyCode::Char('i') => app.cycle_selected_category_icon(),
        KeyCode::Char('s') => app.cycle_selected_category_scope(),
        KeyCode::Char('d') | KeyCode::Delete => {
            if let Some(category) = app.selected_category() {
                let id = category.id.clone();
                app.request_delete(PendingDelete::Category(id));
            }
        }
        KeyCode::Char('L') => app.logout(),
        KeyCode::Left => app.current_tab = app.current_tab.prev(),
        KeyCode::Right => app.current_tab = app.current_tab.next(),
        code => {
            let len = app.ledger.categories.len();
            move_selection(&mut app.category_selection, len, code);
        }
    }
}

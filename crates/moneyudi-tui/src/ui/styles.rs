use ratatui::style::{Color, Modifier, Style};

use moneyudi_core::models::TxKind;
use moneyudi_core::notify::NotificationKind;

// Color palette
pub const PRIMARY: Color = Color::Rgb(64, 128, 192);
pub const INCOME: Color = Color::Rgb(96, 176, 96);
pub const ACCENT: Color = Color::Rgb(192, 160, 64);
pub const EXPENSE: Color = Color::Rgb(208, 80, 80);
pub const MUTED: Color = Color::Rgb(128, 128, 128);
pub const HIGHLIGHT: Color = Color::Rgb(48, 48, 64);

pub fn title_style() -> Style {
    Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
}

pub fn selected_style() -> Style {
    Style::default().bg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

pub fn list_item_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn muted_style() -> Style {
    Style::default().fg(MUTED)
}

pub fn highlight_style() -> Style {
    Style::default().fg(ACCENT)
}

pub fn success_style() -> Style {
    Style::default().fg(INCOME)
}

pub fn error_style() -> Style {
    Style::default().fg(EXPENSE)
}

pub fn amount_style(kind: TxKind) -> Style {
    match kind {
        TxKind::Expense => error_style(),
        TxKind::Income => success_style(),
    }
}

/// Gauge color: warning at 80% of the budget, over budget past 100%
pub fn budget_style(percent: u8, warning: bool) -> Style {
    if percent >= 100 {
        error_style()
    } else if warning {
        highlight_style()
    } else {
        success_style()
    }
}

pub fn toast_style(kind: NotificationKind) -> Style {
    match kind {
        NotificationKind::Success => success_style(),
        NotificationKind::Error => error_style(),
        NotificationKind::Info => Style::default().fg(PRIMARY),
    }
}

pub fn tab_style(selected: bool) -> Style {
    if selected {
        Style::default()
            .fg(PRIMARY)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
        Style::default().fg(Color::White)
    }
}

pub fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(PRIMARY)
    } else {
        Style::default().fg(MUTED)
    }
}

pub fn status_bar_style() -> Style {
    Style::default().bg(Color::Rgb(32, 32, 40)).fg(Color::White)
}

pub fn help_key_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn help_desc_style() -> Style {
    Style::default().fg(Color::White)
}

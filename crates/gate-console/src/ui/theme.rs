use ratatui::style::{Color, Modifier, Style};
use timing_protocol::RaceStatus;

use crate::stream::ConnectionState;
use crate::view::CellSource;

#[derive(Clone, Copy)]
pub(crate) enum ValueStyle {
    Normal,
    Important,
    Dim,
}

pub(crate) struct Theme {
    border: Color,
    title: Color,
    text: Color,
    dim: Color,
    accent: Color,
    highlight_fg: Color,
    highlight_bg: Color,
    warn: Color,
    ok: Color,
    error: Color,
}

impl Theme {
    pub(crate) fn dark() -> Self {
        Self {
            border: Color::DarkGray,
            title: Color::Blue,
            text: Color::White,
            dim: Color::Gray,
            accent: Color::Cyan,
            highlight_fg: Color::White,
            highlight_bg: Color::DarkGray,
            warn: Color::Yellow,
            ok: Color::Green,
            error: Color::Red,
        }
    }

    pub(crate) fn block<'a>(&self, title: &'a str) -> ratatui::widgets::Block<'a> {
        ratatui::widgets::Block::default()
            .title(ratatui::text::Span::styled(
                title,
                Style::default()
                    .fg(self.title)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(ratatui::widgets::Borders::ALL)
            .border_style(Style::default().fg(self.border))
    }

    pub(crate) fn highlight_style(&self) -> Style {
        Style::default()
            .fg(self.highlight_fg)
            .bg(self.highlight_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn help_style(&self) -> Style {
        Style::default().fg(self.dim)
    }

    pub(crate) fn warn_style(&self) -> Style {
        Style::default().fg(self.warn).add_modifier(Modifier::BOLD)
    }

    pub(crate) fn error_style(&self) -> Style {
        Style::default().fg(self.error).add_modifier(Modifier::BOLD)
    }

    pub(crate) fn key_style(&self) -> Style {
        Style::default().fg(self.dim)
    }

    pub(crate) fn value_style(&self, level: ValueStyle) -> Style {
        match level {
            ValueStyle::Normal => Style::default().fg(self.text),
            ValueStyle::Important => Style::default()
                .fg(self.accent)
                .add_modifier(Modifier::BOLD),
            ValueStyle::Dim => Style::default().fg(self.dim),
        }
    }

    pub(crate) fn connection_style(&self, state: ConnectionState) -> Style {
        let color = match state {
            ConnectionState::Connected => self.ok,
            ConnectionState::Connecting => self.warn,
            ConnectionState::Disconnected => self.dim,
            ConnectionState::Error => self.error,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    pub(crate) fn race_status_style(&self, status: RaceStatus) -> Style {
        match status {
            RaceStatus::Running => Style::default().fg(self.ok).add_modifier(Modifier::BOLD),
            RaceStatus::Unofficial => Style::default().fg(self.warn),
            RaceStatus::Cancelled => Style::default().fg(self.error),
            RaceStatus::Official => Style::default().fg(self.text),
            _ => Style::default().fg(self.dim),
        }
    }

    /// Pending writes and staged previews must never look like confirmed data.
    pub(crate) fn cell_style(&self, source: CellSource, focused: bool) -> Style {
        let style = match source {
            CellSource::Confirmed if focused => self.highlight_style(),
            CellSource::Confirmed => Style::default().fg(self.text),
            CellSource::Pending => Style::default()
                .fg(self.warn)
                .add_modifier(Modifier::ITALIC),
            CellSource::Preview => Style::default()
                .fg(self.accent)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        };
        if focused {
            style.bg(self.highlight_bg)
        } else {
            style
        }
    }
}

use crate::memory::value::Value;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, Borders},
};

/// Bordered pane block, highlighted when focused
pub(crate) fn pane_block(title: &str, is_focused: bool) -> Block<'_> {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style)
}

/// Format a value with its type's color
pub(crate) fn value_span(value: &Value) -> Span<'static> {
    match value {
        Value::Int(n) => Span::styled(n.to_string(), Style::default().fg(DEFAULT_THEME.number)),
        Value::Float(v) | Value::Vector(v) => Span::styled(
            format!("{:.3}", v),
            Style::default().fg(DEFAULT_THEME.number),
        ),
        Value::Boolean(_) => Span::styled(
            value.is_truthy().to_string(),
            Style::default().fg(DEFAULT_THEME.opcode),
        ),
        Value::Object(0) => Span::styled("null", Style::default().fg(DEFAULT_THEME.muted)),
        Value::Object(id) => Span::styled(
            format!("#{}", id),
            Style::default().fg(DEFAULT_THEME.highlight),
        ),
        other => Span::styled(
            format!("0x{:08x}", other.bits()),
            Style::default()
                .fg(DEFAULT_THEME.error)
                .add_modifier(Modifier::DIM),
        ),
    }
}

/// Type tag shown next to a value
pub(crate) fn type_span(value: &Value) -> Span<'static> {
    Span::styled(
        format!("{:<7}", value.data_type().name()),
        Style::default().fg(DEFAULT_THEME.data_type),
    )
}

/// Clamp a scroll offset so the last page stays full
pub(crate) fn clamp_scroll(offset: usize, total: usize, visible: usize) -> usize {
    offset.min(total.saturating_sub(visible))
}

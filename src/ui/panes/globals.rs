use super::utils::{clamp_scroll, pane_block, type_span, value_span};
use crate::memory::value::Variable;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

/// Render global variables, skipping the null variable in slot 0
pub fn render_globals_pane(
    frame: &mut Frame,
    area: Rect,
    variables: &[Variable],
    is_focused: bool,
    scroll: &mut usize,
) {
    let globals = variables.get(1..).unwrap_or_default();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    *scroll = clamp_scroll(*scroll, globals.len(), visible_height);

    let mut items: Vec<ListItem> = globals
        .iter()
        .enumerate()
        .skip(*scroll)
        .take(visible_height)
        .map(|(index, variable)| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:>4} ", index + 1),
                    Style::default().fg(DEFAULT_THEME.muted),
                ),
                Span::styled(
                    format!("{:<24} ", variable.name),
                    Style::default().fg(DEFAULT_THEME.fg),
                ),
                type_span(&variable.value),
                Span::raw(" "),
                value_span(&variable.value),
            ]))
        })
        .collect();

    if globals.is_empty() {
        items.push(
            ListItem::new("(no globals)").style(Style::default().fg(DEFAULT_THEME.muted)),
        );
    }

    let title = format!(" Globals ({}) ", globals.len());
    frame.render_widget(List::new(items).block(pane_block(&title, is_focused)), area);
}

//! Stack pane rendering
//!
//! Shows the operand stack of the selected task, top first, followed by the
//! task's locals (parameters marked). With no task selected it shows the
//! engine's main stack.

use super::utils::{clamp_scroll, pane_block, type_span, value_span};
use crate::interpreter::task::Task;
use crate::memory::stack::Stack;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

fn header(text: String) -> ListItem<'static> {
    ListItem::new(Line::from(vec![
        Span::styled("▸ ", Style::default().fg(DEFAULT_THEME.highlight)),
        Span::styled(
            text,
            Style::default()
                .fg(DEFAULT_THEME.script)
                .add_modifier(Modifier::BOLD),
        ),
    ]))
}

fn stack_items(stack: &Stack, items: &mut Vec<ListItem<'static>>) {
    if stack.is_empty() {
        items.push(ListItem::new("  (empty)").style(Style::default().fg(DEFAULT_THEME.muted)));
        return;
    }
    for (depth, value) in stack.values().iter().rev().enumerate() {
        items.push(ListItem::new(Line::from(vec![
            Span::styled(
                format!("  [{:>2}] ", depth),
                Style::default().fg(DEFAULT_THEME.muted),
            ),
            type_span(value),
            Span::raw(" "),
            value_span(value),
        ])));
    }
}

/// Render the stack pane
pub fn render_stack_pane(
    frame: &mut Frame,
    area: Rect,
    task: Option<&Task>,
    main_stack: &Stack,
    parameter_count: usize,
    is_focused: bool,
    scroll: &mut usize,
) {
    let mut items = Vec::new();

    match task {
        Some(task) => {
            items.push(header(format!(
                "Stack of task {} ({}/{})",
                task.id,
                task.stack.count(),
                crate::interpreter::constants::STACK_SIZE
            )));
            stack_items(&task.stack, &mut items);

            items.push(header(format!("Locals of {}", task.name)));
            if task.locals.is_empty() {
                items.push(
                    ListItem::new("  (none)").style(Style::default().fg(DEFAULT_THEME.muted)),
                );
            }
            for (index, local) in task.locals.iter().enumerate() {
                let kind = if index < parameter_count { "param" } else { "local" };
                items.push(ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("  {} ", kind),
                        Style::default().fg(DEFAULT_THEME.muted),
                    ),
                    Span::styled(
                        format!("{:<16} ", local.name),
                        Style::default().fg(DEFAULT_THEME.fg),
                    ),
                    type_span(&local.value),
                    Span::raw(" "),
                    value_span(&local.value),
                ])));
            }
        }
        None => {
            items.push(header(format!("Main stack ({})", main_stack.count())));
            stack_items(main_stack, &mut items);
        }
    }

    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    *scroll = clamp_scroll(*scroll, items.len(), visible_height);
    let visible: Vec<ListItem> = items.into_iter().skip(*scroll).collect();

    frame.render_widget(List::new(visible).block(pane_block(" Stack ", is_focused)), area);
}

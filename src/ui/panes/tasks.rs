use super::utils::{clamp_scroll, pane_block};
use crate::interpreter::task::Task;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

fn state_style(task: &Task) -> Style {
    match task.state_name() {
        "stopped" => Style::default().fg(DEFAULT_THEME.error),
        "waiting" | "sleeping" => Style::default().fg(DEFAULT_THEME.muted),
        "in handler" => Style::default().fg(DEFAULT_THEME.highlight),
        _ => Style::default().fg(DEFAULT_THEME.ok),
    }
}

/// Render the task list; `selected` indexes into `tasks`
pub fn render_tasks_pane<'a>(
    frame: &mut Frame,
    area: Rect,
    tasks: impl ExactSizeIterator<Item = &'a Task>,
    selected: usize,
    is_focused: bool,
) {
    let block = pane_block(" Tasks ", is_focused);
    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    let total = tasks.len();
    let offset = clamp_scroll(
        selected.saturating_sub(visible_height.saturating_sub(1)),
        total,
        visible_height,
    );

    let mut items: Vec<ListItem> = tasks
        .enumerate()
        .skip(offset)
        .take(visible_height)
        .map(|(index, task)| {
            let mut spans = vec![
                Span::styled(
                    format!("{:>4} ", task.id),
                    Style::default().fg(DEFAULT_THEME.muted),
                ),
                Span::styled(
                    format!("{:<24} ", task.name),
                    Style::default().fg(DEFAULT_THEME.script),
                ),
                Span::styled(
                    format!("@{:<6} ", task.instruction_address),
                    Style::default().fg(DEFAULT_THEME.number),
                ),
                Span::styled(task.state_name(), state_style(task)),
            ];
            if task.is_waiting() {
                spans.push(Span::styled(
                    format!(" on {}", task.waiting_task_id),
                    Style::default().fg(DEFAULT_THEME.muted),
                ));
            }

            let mut line = Line::from(spans);
            if index == selected {
                line = line.style(
                    Style::default()
                        .bg(DEFAULT_THEME.current_line_bg)
                        .add_modifier(Modifier::BOLD),
                );
            }
            ListItem::new(line)
        })
        .collect();

    if total == 0 {
        items.push(
            ListItem::new("(no tasks)").style(Style::default().fg(DEFAULT_THEME.muted)),
        );
    }

    frame.render_widget(List::new(items).block(block), area);
}

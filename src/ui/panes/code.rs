//! Code pane rendering
//!
//! Shows the disassembly listing of every script. The instruction the selected
//! task will run next is highlighted and kept at a fixed row while stepping;
//! other tasks' instruction pointers get a dimmer marker.

use super::utils::pane_block;
use crate::disasm::ListingLine;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Scroll state for the code pane
pub struct CodeScrollState {
    pub offset: usize,
    /// Visual row the current instruction is pinned to (None = center it)
    pub target_line_row: Option<usize>,
}

impl CodeScrollState {
    pub fn new() -> Self {
        CodeScrollState {
            offset: 0,
            target_line_row: None,
        }
    }
}

impl Default for CodeScrollState {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a rendered instruction into a highlighted mnemonic and its operand
fn highlight_instruction(text: &str) -> Vec<Span<'static>> {
    let (mnemonic, operand) = match text.split_once(' ') {
        Some((mnemonic, operand)) => (mnemonic, Some(operand)),
        None => (text, None),
    };

    let mut spans = vec![Span::styled(
        format!("{:<10}", mnemonic),
        Style::default()
            .fg(DEFAULT_THEME.opcode)
            .add_modifier(Modifier::BOLD),
    )];

    if let Some(operand) = operand {
        let style = if operand.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
            Style::default().fg(DEFAULT_THEME.number)
        } else {
            Style::default().fg(DEFAULT_THEME.name)
        };
        spans.push(Span::styled(operand.to_string(), style));
    }
    spans
}

fn listing_line(line: &ListingLine, is_current: bool, is_other_task: bool) -> Line<'static> {
    match line {
        ListingLine::Begin(signature) => Line::from(Span::styled(
            format!("begin {}", signature),
            Style::default()
                .fg(DEFAULT_THEME.script)
                .add_modifier(Modifier::BOLD),
        )),
        ListingLine::Local(name) => Line::from(vec![
            Span::styled("      local ", Style::default().fg(DEFAULT_THEME.muted)),
            Span::styled(name.clone(), Style::default().fg(DEFAULT_THEME.fg)),
        ]),
        ListingLine::Label(label) => Line::from(Span::styled(
            format!("{}:", label),
            Style::default().fg(DEFAULT_THEME.label),
        )),
        ListingLine::Instruction { address, text } => {
            let (marker, number_style) = if is_current {
                (
                    Span::styled("▶ ", Style::default().fg(DEFAULT_THEME.highlight)),
                    Style::default()
                        .fg(DEFAULT_THEME.highlight)
                        .add_modifier(Modifier::BOLD),
                )
            } else if is_other_task {
                (
                    Span::styled("▷ ", Style::default().fg(DEFAULT_THEME.muted)),
                    Style::default().fg(DEFAULT_THEME.muted),
                )
            } else {
                (Span::raw("  "), Style::default().fg(DEFAULT_THEME.muted))
            };

            let mut spans = vec![marker, Span::styled(format!("{:5} ", address), number_style)];
            spans.extend(highlight_instruction(text));

            if is_current {
                for span in &mut spans {
                    span.style = span.style.bg(DEFAULT_THEME.current_line_bg);
                }
            }
            Line::from(spans)
        }
        ListingLine::Blank => Line::default(),
    }
}

/// Render the code pane
pub fn render_code_pane(
    frame: &mut Frame,
    area: Rect,
    listing: &[ListingLine],
    current_address: Option<u32>,
    other_addresses: &[u32],
    is_focused: bool,
    scroll_state: &mut CodeScrollState,
) {
    let title = match current_address {
        Some(address) => format!(" Code @ {} ", address),
        None => " Code ".to_string(),
    };
    let block = pane_block(&title, is_focused);

    let total_lines = listing.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;

    let target_row = scroll_state
        .target_line_row
        .unwrap_or(visible_height / 2)
        .min(visible_height.saturating_sub(1));
    scroll_state.target_line_row = Some(target_row);

    let current_index = current_address
        .and_then(|address| listing.iter().position(|line| line.address() == Some(address)));

    if let Some(index) = current_index {
        scroll_state.offset = index.saturating_sub(target_row);
    }
    scroll_state.offset = scroll_state
        .offset
        .min(total_lines.saturating_sub(visible_height));

    let visible_lines: Vec<Line> = listing
        .iter()
        .enumerate()
        .skip(scroll_state.offset)
        .take(visible_height)
        .map(|(index, line)| {
            let is_current = current_index == Some(index);
            let is_other_task = line
                .address()
                .is_some_and(|address| other_addresses.contains(&address));
            listing_line(line, is_current, is_other_task)
        })
        .collect();

    let paragraph = Paragraph::new(visible_lines).block(block);
    frame.render_widget(paragraph, area);
}

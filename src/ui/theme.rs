use ratatui::style::Color;

/// Colors shared by every pane
pub struct Theme {
    pub fg: Color,
    pub accent: Color,    // Blue
    pub highlight: Color, // Orange, the instruction about to run
    pub muted: Color,     // Grey
    pub ok: Color,        // Green
    pub error: Color,     // Red
    pub opcode: Color,
    pub name: Color,
    pub number: Color,
    pub border_focused: Color,
    pub border_normal: Color,
    pub current_line_bg: Color,
    pub script: Color,
    pub label: Color,
    pub data_type: Color,
}

pub const DEFAULT_THEME: Theme = Theme {
    fg: Color::Rgb(205, 214, 244),
    accent: Color::Rgb(137, 180, 250),
    highlight: Color::Rgb(250, 179, 135),
    muted: Color::Rgb(108, 112, 134),
    ok: Color::Rgb(166, 227, 161),
    error: Color::Rgb(243, 139, 168),
    opcode: Color::Rgb(203, 166, 247),         // Mauve for mnemonics
    name: Color::Rgb(245, 194, 231),           // Pink for variable and script names
    number: Color::Rgb(250, 179, 135),         // Orange for numbers
    border_focused: Color::Rgb(249, 226, 175), // Yellow border for focus
    border_normal: Color::Rgb(108, 112, 134),
    current_line_bg: Color::Rgb(50, 50, 70),
    script: Color::Rgb(249, 226, 175),         // Yellow for script headers
    label: Color::Rgb(180, 165, 120),          // Muted yellow for jump labels
    data_type: Color::Rgb(148, 226, 213),      // Teal for type tags
};

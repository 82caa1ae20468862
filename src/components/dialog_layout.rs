use ratatui::prelude::Rect;

/// Dialog area split into content and an optional instructions strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogLayout {
    pub content_area: Rect,
    pub instructions_area: Option<Rect>,
}

/// Reserve room at the bottom of `area` for the wrapped instructions text
pub fn split_dialog_area(
    area: Rect,
    show_instructions: bool,
    instructions: Option<&str>,
) -> DialogLayout {
    if !show_instructions {
        return DialogLayout {
            content_area: area,
            instructions_area: None,
        };
    }
    let wrap_width = area.width.saturating_sub(4).max(10) as usize;
    let lines = textwrap::wrap(instructions.unwrap_or_default(), wrap_width).len() as u16;
    let strip = (lines.max(1) + 2).min(area.height);
    DialogLayout {
        content_area: Rect {
            height: area.height - strip,
            ..area
        },
        instructions_area: Some(Rect {
            y: area.y + area.height - strip,
            height: strip,
            ..area
        }),
    }
}

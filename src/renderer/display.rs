use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

use super::cell::CellData;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum DisplayMode {
    Ascii,
    Rgb,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Rgb => DisplayMode::Ascii,
            DisplayMode::Ascii => DisplayMode::Rgb,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DisplayMode::Rgb => "rgb",
            DisplayMode::Ascii => "ascii",
        }
    }
}

/// Darkest to brightest.
const ASCII_CHARS: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

pub fn ascii_for(cell: &CellData) -> char {
    let idx = (cell.luma() as usize * (ASCII_CHARS.len() - 1)) / 255;
    ASCII_CHARS[idx]
}

/// Paints processed cells into a ratatui area, centered when smaller than it.
pub struct FrameView<'a> {
    cells: &'a [CellData],
    width: usize,
    mode: DisplayMode,
}

impl<'a> FrameView<'a> {
    pub fn new(cells: &'a [CellData], width: usize, mode: DisplayMode) -> Self {
        Self { cells, width, mode }
    }
}

impl Widget for FrameView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.width == 0 || self.cells.is_empty() {
            return;
        }

        let content_width = self.width as u16;
        let content_height = (self.cells.len() / self.width) as u16;
        let offset_x = area.width.saturating_sub(content_width) / 2;
        let offset_y = area.height.saturating_sub(content_height) / 2;

        for (i, cell) in self.cells.iter().enumerate() {
            let x = (i % self.width) as u16 + offset_x;
            let y = (i / self.width) as u16 + offset_y;
            if x >= area.width || y >= area.height {
                continue;
            }

            let target = buf.get_mut(area.x + x, area.y + y);
            match self.mode {
                DisplayMode::Rgb => {
                    target
                        .set_char(cell.char)
                        .set_fg(Color::Rgb(cell.fg.0, cell.fg.1, cell.fg.2))
                        .set_bg(Color::Rgb(cell.bg.0, cell.bg.1, cell.bg.2));
                }
                DisplayMode::Ascii => {
                    target.set_char(ascii_for(cell)).set_fg(Color::Reset).set_bg(Color::Reset);
                }
            }
        }
    }
}

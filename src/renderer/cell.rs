/// One terminal cell: a glyph with truecolor foreground and background.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CellData {
    pub char: char,
    pub fg: (u8, u8, u8), // RGB
    pub bg: (u8, u8, u8), // RGB
}

impl CellData {
    /// Perceived brightness of the foreground, 0-255.
    pub fn luma(&self) -> u8 {
        ((self.fg.0 as u32 * 299 + self.fg.1 as u32 * 587 + self.fg.2 as u32 * 114) / 1000) as u8
    }
}

impl Default for CellData {
    fn default() -> Self {
        Self {
            char: ' ',
            fg: (0, 0, 0),
            bg: (0, 0, 0),
        }
    }
}

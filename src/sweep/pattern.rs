//! Decorative glyphs carved permanently into the board.
//!
//! A glyph is a small dot matrix where `X` marks a filled sub-cell and `.` an
//! empty one. Every filled sub-cell of the stamped pattern becomes a permanent
//! cell: open from the start, never mined, never flagged.

use crate::{
    error::ConfigurationError,
    sweep::grid::{Board, Coordinate},
};
use tracing::debug;

/// Gap, in cells, between neighbouring glyphs unless configured otherwise.
pub(crate) const DEFAULT_SPACING: usize = 1;

static DIGITS: [[&str; 5]; 10] = [
    ["XXX", "X.X", "X.X", "X.X", "XXX"],
    [".X.", "XX.", ".X.", ".X.", "XXX"],
    ["XXX", "..X", "XXX", "X..", "XXX"],
    ["XXX", "..X", "XXX", "..X", "XXX"],
    ["X.X", "X.X", "XXX", "..X", "..X"],
    ["XXX", "X..", "XXX", "..X", "XXX"],
    ["XXX", "X..", "XXX", "X.X", "XXX"],
    ["XXX", "..X", "..X", "..X", "..X"],
    ["XXX", "X.X", "XXX", "X.X", "XXX"],
    ["XXX", "X.X", "XXX", "..X", "XXX"],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Glyph {
    rows: &'static [&'static str],
}

impl Glyph {
    pub(crate) fn for_char(c: char) -> Result<Self, ConfigurationError> {
        let digit = c
            .to_digit(10)
            .ok_or(ConfigurationError::UnknownGlyph(c))?;
        Ok(Self {
            rows: &DIGITS[digit as usize],
        })
    }

    pub(crate) fn width(&self) -> usize {
        self.rows.iter().map(|row| row.len()).max().unwrap_or(0)
    }

    pub(crate) fn height(&self) -> usize {
        self.rows.len()
    }

    /// Offsets of the filled sub-cells, relative to the glyph's top-left corner.
    fn filled(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.rows.iter().enumerate().flat_map(|(dr, row)| {
            row.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'X')
                .map(move |(dc, _)| (dr, dc))
        })
    }
}

/// An ordered run of glyphs laid out left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Pattern {
    glyphs: Vec<Glyph>,
    spacing: usize,
}

impl Pattern {
    pub(crate) fn new(text: &str, spacing: usize) -> Result<Self, ConfigurationError> {
        let glyphs = text.chars().map(Glyph::for_char).collect::<Result<_, _>>()?;
        let pattern = Self { glyphs, spacing };
        pattern
            .checked_width()
            .ok_or(ConfigurationError::SpacingTooLarge { spacing })?;
        Ok(pattern)
    }

    /// The classic "404".
    pub(crate) fn not_found() -> Self {
        Self {
            glyphs: [4, 0, 4]
                .iter()
                .map(|&digit| Glyph {
                    rows: &DIGITS[digit],
                })
                .collect(),
            spacing: DEFAULT_SPACING,
        }
    }

    fn checked_width(&self) -> Option<usize> {
        let glyphs = self.glyphs.iter().map(Glyph::width).sum::<usize>();
        self.glyphs
            .len()
            .saturating_sub(1)
            .checked_mul(self.spacing)?
            .checked_add(glyphs)
    }

    /// Total width in cells, gaps included. Saturates for spacings no board could hold.
    pub(crate) fn width(&self) -> usize {
        self.checked_width().unwrap_or(usize::MAX)
    }

    pub(crate) fn height(&self) -> usize {
        self.glyphs.iter().map(Glyph::height).max().unwrap_or(0)
    }

    /// Offsets of every filled sub-cell in the whole pattern.
    fn filled(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.glyphs
            .iter()
            .scan(0usize, move |cursor, glyph| {
                let start = *cursor;
                // saturates only past the last glyph, since the total width fits
                *cursor = start
                    .saturating_add(glyph.width())
                    .saturating_add(self.spacing);
                Some((start, glyph))
            })
            .flat_map(|(start, glyph)| glyph.filled().map(move |(dr, dc)| (dr, start + dc)))
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::not_found()
    }
}

/// Centres `pattern` on `board` and marks its filled cells permanent. Returns how many cells were
/// stamped.
///
/// Must run before mines are placed.
pub(crate) fn stamp(board: &mut Board, pattern: &Pattern) -> Result<usize, ConfigurationError> {
    let (height, width) = (pattern.height(), pattern.width());
    let (rows, columns) = (board.rows(), board.columns());
    if height > rows || width > columns {
        return Err(ConfigurationError::PatternTooLarge {
            pattern_rows: height,
            pattern_columns: width,
            rows,
            columns,
        });
    }

    let start_row = (rows - height) / 2;
    let start_column = (columns - width) / 2;

    let mut stamped = 0;
    for (dr, dc) in pattern.filled() {
        let cell = &mut board[(start_row + dr, start_column + dc)];
        debug_assert!(!cell.mine, "pattern stamped after mine placement");
        if !cell.permanent {
            cell.permanent = true;
            cell.open = true;
            cell.flagged = false;
            cell.adjacent_mines = 0;
            stamped += 1;
        }
    }

    debug!(stamped, start_row, start_column, "stamped permanent pattern");
    Ok(stamped)
}

use crate::sweep::Coordinate;

/// Reasons a game cannot be set up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum ConfigurationError {
    #[error("board must have at least one row and one column, got {rows}x{columns}")]
    EmptyBoard { rows: usize, columns: usize },

    #[error("no glyph is defined for {0:?}")]
    UnknownGlyph(char),

    #[error("glyph spacing of {spacing} cells is too large to lay out")]
    SpacingTooLarge { spacing: usize },

    #[error(
        "pattern of {pattern_rows}x{pattern_columns} cells does not fit on a {rows}x{columns} board"
    )]
    PatternTooLarge {
        pattern_rows: usize,
        pattern_columns: usize,
        rows: usize,
        columns: usize,
    },

    #[error("number of mines ({mines}) is greater than the number of placeable cells: {capacity}")]
    TooManyMines { mines: usize, capacity: usize },
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("invalid game configuration")]
    Configuration(#[from] ConfigurationError),

    #[error("no cell at coordinate: {0:?}")]
    CellOutOfBounds(Coordinate),

    #[error("failed to draw to terminal")]
    DrawToTerminal(#[source] std::io::Error),

    #[error("failed to get input event")]
    GetEvent(#[source] std::sync::mpsc::RecvError),

    #[error("failed to get ctrlc handler")]
    SetHandler(#[source] ctrlc::Error),

    #[error("failed to get stdout in raw mode")]
    GetStdoutInRawMode(#[source] std::io::Error),

    #[error("failed to get alternate screen for mouse terminal")]
    GetAlternateScreenForMouseTerminal(#[source] std::io::Error),

    #[error("failed to create terminal object")]
    CreateTerminal(#[source] std::io::Error),

    #[error("a {rows}x{columns} board is too large to lay out")]
    GridTooLarge { rows: usize, columns: usize },

    #[error("failed to convert usize to u16")]
    ConvertUsizeToU16(#[source] std::num::TryFromIntError),
}

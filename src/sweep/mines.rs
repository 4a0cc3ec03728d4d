use crate::{error::ConfigurationError, sweep::grid::Board};
use rand::Rng;
use tracing::debug;

/// The number of cells a mine may still go on: neither permanent nor already mined.
pub(crate) fn capacity(board: &Board) -> usize {
    board
        .iter()
        .filter(|(_, cell)| !cell.permanent && !cell.mine)
        .count()
}

/// Scatters `mines` mines uniformly over the cells that can take one, by redrawing random cells
/// until enough distinct eligible ones have been hit.
///
/// The request is checked against [`capacity`] first, so the loop always terminates.
pub(crate) fn place<R>(
    board: &mut Board,
    mines: usize,
    rng: &mut R,
) -> Result<usize, ConfigurationError>
where
    R: Rng + ?Sized,
{
    let capacity = capacity(board);
    if mines > capacity {
        return Err(ConfigurationError::TooManyMines { mines, capacity });
    }

    let (rows, columns) = (board.rows(), board.columns());
    let mut placed = 0;
    while placed < mines {
        let cell = &mut board[(rng.gen_range(0..rows), rng.gen_range(0..columns))];
        if cell.mine || cell.permanent {
            continue;
        }
        cell.mine = true;
        placed += 1;
    }

    debug!(placed, capacity, "placed mines");
    Ok(placed)
}

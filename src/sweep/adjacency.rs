use crate::sweep::grid::Board;

/// Stores, in every non-mine cell, how many of its neighbours hold a mine.
///
/// Runs once, after mines are placed and before the first reveal. Permanent cells keep a count of
/// zero.
pub(crate) fn compute(board: &mut Board) {
    for index in 0..board.len() {
        let coordinate = board.coordinate(index);
        if board[coordinate].mine || board[coordinate].permanent {
            continue;
        }

        let adjacent_mines = board
            .neighbors(coordinate)
            .fold(0, |total, neighbor| total + u8::from(board[neighbor].mine));
        assert!(adjacent_mines <= 8);

        board[coordinate].adjacent_mines = adjacent_mines;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::{
        grid::Coordinate,
        mines,
        pattern::{self, Pattern},
    };
    use rand::{rngs::StdRng, SeedableRng};

    fn board_with_mines(rows: usize, columns: usize, mines: &[Coordinate]) -> Board {
        let mut board = Board::new(rows, columns).unwrap();
        for &coordinate in mines {
            board[coordinate].mine = true;
        }
        compute(&mut board);
        board
    }

    #[test]
    fn counts_a_single_mine() {
        let board = board_with_mines(3, 3, &[(1, 1)]);
        for (coordinate, cell) in board.iter() {
            if coordinate != (1, 1) {
                assert_eq!(cell.adjacent_mines, 1, "at {coordinate:?}");
            }
        }
    }

    #[test]
    fn counts_up_to_eight() {
        let ring = [
            (0, 0),
            (0, 1),
            (0, 2),
            (1, 0),
            (1, 2),
            (2, 0),
            (2, 1),
            (2, 2),
        ];
        let board = board_with_mines(3, 3, &ring);
        assert_eq!(board[(1, 1)].adjacent_mines, 8);
    }

    #[test]
    fn edges_are_clipped() {
        let board = board_with_mines(2, 4, &[(0, 3), (1, 3)]);
        assert_eq!(board[(0, 0)].adjacent_mines, 0);
        assert_eq!(board[(1, 1)].adjacent_mines, 0);
        assert_eq!(board[(0, 2)].adjacent_mines, 2);
        assert_eq!(board[(1, 2)].adjacent_mines, 2);
    }

    #[test]
    fn is_idempotent() {
        let mut board = board_with_mines(4, 4, &[(0, 0), (3, 3), (1, 2)]);
        let before = board.clone();
        compute(&mut board);
        assert_eq!(board, before);
    }

    #[test]
    fn matches_a_brute_force_count_on_random_boards() {
        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut board = Board::new(9, 15).unwrap();
            pattern::stamp(&mut board, &Pattern::not_found()).unwrap();
            mines::place(&mut board, 30, &mut rng).unwrap();
            compute(&mut board);

            for (coordinate @ (row, column), cell) in board.iter() {
                if cell.mine || cell.permanent {
                    continue;
                }
                let mut expected = 0;
                for r in row.saturating_sub(1)..=(row + 1).min(board.rows() - 1) {
                    for c in column.saturating_sub(1)..=(column + 1).min(board.columns() - 1) {
                        if (r, c) != coordinate && board[(r, c)].mine {
                            expected += 1;
                        }
                    }
                }
                assert_eq!(cell.adjacent_mines, expected, "seed {seed} at {coordinate:?}");
            }
        }
    }

    #[test]
    fn permanent_cells_stay_at_zero() {
        let mut board = Board::new(5, 11).unwrap();
        pattern::stamp(&mut board, &Pattern::not_found()).unwrap();
        let capacity = mines::capacity(&board);
        mines::place(&mut board, capacity, &mut StdRng::seed_from_u64(9)).unwrap();
        compute(&mut board);
        assert!(board
            .iter()
            .filter(|(_, cell)| cell.permanent)
            .all(|(_, cell)| cell.adjacent_mines == 0));
    }
}

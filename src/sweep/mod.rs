mod adjacency;
mod grid;
mod mines;
mod pattern;

pub(crate) use grid::{Board, Cell, Coordinate};
pub(crate) use pattern::Pattern;

use crate::error::Error;
use bit_set::BitSet;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};
use tracing::{debug, info};

/// Everything needed to set up a game. Fixed for the lifetime of a session; every restart reuses
/// it.
#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub(crate) struct Config {
    pub(crate) rows: usize,
    pub(crate) columns: usize,
    pub(crate) mines: usize,
    #[builder(default)]
    pub(crate) pattern: Pattern,
    #[builder(default)]
    pub(crate) seed: Option<u64>,
}

impl Config {
    /// A generator for mine placement: reproducible when a seed was given, fresh otherwise.
    pub(crate) fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Playing,
    Exploded,
    Won,
}

/// What a single [`Game::open`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Nothing changed: the game is over, or the cell was off the board, open, flagged or
    /// permanent.
    Noop,
    /// Exactly one numbered cell opened.
    Opened,
    /// A zero cell opened and the cascade opened its neighbours.
    Cascaded,
    Exploded,
    Won,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reveal {
    pub(crate) outcome: Outcome,
    // newly opened cells grouped by breadth-first layer; the first wave is the opened cell itself
    pub(crate) waves: Vec<Vec<Coordinate>>,
    // every other mine, filled in only when the move exploded
    pub(crate) exposed_mines: Vec<Coordinate>,
}

impl Reveal {
    fn noop() -> Self {
        Self {
            outcome: Outcome::Noop,
            waves: Vec::new(),
            exposed_mines: Vec::new(),
        }
    }
}

pub(crate) struct Game {
    board: Board,
    // the total number of mines
    mines: usize,
    // number of cells carved out by the pattern
    permanent: usize,
    // non-permanent cells opened so far, the exploded mine included
    opened: usize,
    flagged: usize,
    status: Status,
    started: Instant,
    finished: Option<Instant>,
}

impl Game {
    /// Builds a fresh game: stamp the pattern, place the mines, then count neighbours.
    pub(crate) fn new<R>(config: &Config, rng: &mut R) -> Result<Self, Error>
    where
        R: Rng + ?Sized,
    {
        let mut board = Board::new(config.rows, config.columns)?;
        let permanent = pattern::stamp(&mut board, &config.pattern)?;
        let mines = mines::place(&mut board, config.mines, rng)?;
        adjacency::compute(&mut board);

        info!(
            rows = config.rows,
            columns = config.columns,
            mines,
            permanent,
            "new game"
        );
        Ok(Self::from_board(board, permanent, mines))
    }

    fn from_board(board: Board, permanent: usize, mines: usize) -> Self {
        Self {
            board,
            mines,
            permanent,
            opened: 0,
            flagged: 0,
            status: Status::Playing,
            started: Instant::now(),
            finished: None,
        }
    }

    pub(crate) fn board(&self) -> &Board {
        &self.board
    }

    pub(crate) fn mines(&self) -> usize {
        self.mines
    }

    pub(crate) fn flagged(&self) -> usize {
        self.flagged
    }

    pub(crate) fn is_over(&self) -> bool {
        self.status != Status::Playing
    }

    pub(crate) fn exploded(&self) -> bool {
        self.status == Status::Exploded
    }

    pub(crate) fn won(&self) -> bool {
        self.status == Status::Won
    }

    /// Cells the player has to open to win.
    pub(crate) fn openable(&self) -> usize {
        self.board.len() - self.permanent - self.mines
    }

    /// Time since the game started, frozen once it is over.
    pub(crate) fn elapsed(&self) -> Duration {
        self.finished
            .unwrap_or_else(Instant::now)
            .duration_since(self.started)
    }

    fn finish(&mut self, status: Status) {
        self.status = status;
        self.finished = Some(Instant::now());
        info!(?status, elapsed = ?self.elapsed(), opened = self.opened, "game over");
    }

    /// Opens the cell at `coordinate`, cascading through zero cells, and reports what happened.
    pub(crate) fn open(&mut self, coordinate: Coordinate) -> Reveal {
        if self.is_over() || !self.board.contains(coordinate) {
            return Reveal::noop();
        }

        let cell = &mut self.board[coordinate];
        if cell.open || cell.flagged || cell.permanent {
            return Reveal::noop();
        }
        cell.open = true;
        let Cell {
            mine,
            adjacent_mines,
            ..
        } = *cell;
        self.opened += 1;

        if mine {
            self.finish(Status::Exploded);
            let exposed_mines = self
                .board
                .iter()
                .filter(|&(other, cell)| cell.mine && other != coordinate)
                .map(|(other, _)| other)
                .collect();
            return Reveal {
                outcome: Outcome::Exploded,
                waves: vec![vec![coordinate]],
                exposed_mines,
            };
        }

        let waves = if adjacent_mines == 0 {
            self.cascade(coordinate)
        } else {
            vec![vec![coordinate]]
        };

        let outcome = if self.opened == self.openable() {
            self.finish(Status::Won);
            Outcome::Won
        } else if waves.len() > 1 {
            Outcome::Cascaded
        } else {
            Outcome::Opened
        };
        debug!(?coordinate, ?outcome, waves = waves.len(), "opened");

        Reveal {
            outcome,
            waves,
            exposed_mines: Vec::new(),
        }
    }

    /// Breadth-first flood from an already opened zero cell. Opens every closed, unflagged,
    /// non-permanent, mine-free neighbour; zero-valued ones keep the flood going.
    fn cascade(&mut self, origin: Coordinate) -> Vec<Vec<Coordinate>> {
        let mut waves = vec![vec![origin]];
        let mut seen = BitSet::with_capacity(self.board.len());
        let mut coordinates = VecDeque::from([(origin, 0)]);

        while let Some((coordinate, depth)) = coordinates.pop_front() {
            if !seen.insert(self.board.index_of(coordinate)) {
                continue;
            }
            if self.board[coordinate].adjacent_mines > 0 {
                continue;
            }

            for neighbor in self.board.neighbors(coordinate) {
                let cell = &mut self.board[neighbor];
                if cell.open || cell.flagged || cell.permanent || cell.mine {
                    continue;
                }
                cell.open = true;
                self.opened += 1;

                if waves.len() == depth + 1 {
                    waves.push(Vec::new());
                }
                waves[depth + 1].push(neighbor);

                if cell.adjacent_mines == 0 {
                    coordinates.push_back((neighbor, depth + 1));
                }
            }
        }

        waves
    }

    /// Flips the flag on a closed cell and returns whether it is now flagged.
    ///
    /// Open and permanent cells, off-board coordinates and finished games are left alone.
    pub(crate) fn toggle_flag(&mut self, coordinate: Coordinate) -> bool {
        if !self.board.contains(coordinate) {
            return false;
        }

        let over = self.is_over();
        let cell = &mut self.board[coordinate];
        if over || cell.open || cell.permanent {
            return cell.flagged;
        }

        cell.flagged = !cell.flagged;
        let flagged = cell.flagged;
        if flagged {
            self.flagged += 1;
        } else {
            self.flagged -= 1;
        }
        debug!(?coordinate, flagged, total = self.flagged, "toggled flag");
        flagged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rows: usize, columns: usize, mines: usize, pattern: &str) -> Config {
        Config::builder()
            .rows(rows)
            .columns(columns)
            .mines(mines)
            .pattern(Pattern::new(pattern, pattern::DEFAULT_SPACING).unwrap())
            .seed(Some(1234))
            .build()
    }

    /// A game with mines exactly where asked.
    fn rigged(rows: usize, columns: usize, pattern: &str, mines: &[Coordinate]) -> Game {
        let config = config(rows, columns, 0, pattern);
        let mut board = Board::new(rows, columns).unwrap();
        let permanent = pattern::stamp(&mut board, &config.pattern).unwrap();
        for &coordinate in mines {
            assert!(!board[coordinate].permanent);
            board[coordinate].mine = true;
        }
        adjacency::compute(&mut board);
        Game::from_board(board, permanent, mines.len())
    }

    fn opened(reveal: &Reveal) -> impl Iterator<Item = Coordinate> + '_ {
        reveal.waves.iter().flatten().copied()
    }

    fn open_cells(game: &Game) -> BitSet {
        game.board()
            .iter()
            .enumerate()
            .filter(|(_, (_, cell))| cell.open && !cell.permanent)
            .map(|(i, _)| i)
            .collect()
    }

    /// Depth-first flood over the same layout, for comparison with the breadth-first cascade.
    fn reference_flood(board: &Board, origin: Coordinate) -> BitSet {
        let mut opened = BitSet::new();
        let mut stack = vec![origin];
        opened.insert(board.index_of(origin));
        while let Some(coordinate) = stack.pop() {
            if board[coordinate].adjacent_mines > 0 {
                continue;
            }
            for neighbor in board.neighbors(coordinate) {
                let cell = &board[neighbor];
                if cell.mine || cell.permanent || cell.flagged || cell.open {
                    continue;
                }
                if opened.insert(board.index_of(neighbor)) {
                    stack.push(neighbor);
                }
            }
        }
        opened
    }

    #[test]
    fn setup_places_every_mine_off_the_pattern() {
        let mut rng = config(9, 15, 10, "404").rng();
        for _ in 0..20 {
            let game = Game::new(&config(9, 15, 10, "404"), &mut rng).unwrap();
            let board = game.board();
            assert_eq!(board.iter().filter(|(_, c)| c.mine).count(), 10);
            assert_eq!(board.iter().filter(|(_, c)| c.permanent).count(), 30);
            assert!(board.iter().all(|(_, c)| !(c.mine && c.permanent)));
            assert_eq!(game.openable(), 9 * 15 - 30 - 10);
            assert!(!game.is_over());
        }
    }

    #[test]
    fn too_many_mines_fails_at_setup() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = Game::new(&config(5, 11, 26, "404"), &mut rng);
        assert!(matches!(
            result,
            Err(Error::Configuration(
                crate::error::ConfigurationError::TooManyMines {
                    mines: 26,
                    capacity: 25
                }
            ))
        ));
    }

    #[test]
    fn board_too_small_for_pattern_fails_at_setup() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = Game::new(&config(4, 30, 1, "404"), &mut rng);
        assert!(matches!(
            result,
            Err(Error::Configuration(
                crate::error::ConfigurationError::PatternTooLarge { .. }
            ))
        ));
    }

    #[test]
    fn cascade_from_a_corner_wins_a_one_mine_board() {
        let mut game = rigged(5, 5, "", &[(4, 4)]);
        assert_eq!(game.board()[(0, 0)].adjacent_mines, 0);

        let reveal = game.open((0, 0));
        assert_eq!(reveal.outcome, Outcome::Won);
        assert_eq!(opened(&reveal).count(), 24);
        assert_eq!(game.opened, 24);
        assert!(game.won());
        assert!(!game.exploded());
        assert!(!game.board()[(4, 4)].open);
    }

    #[test]
    fn waves_follow_breadth_first_layers() {
        let mut game = rigged(5, 5, "", &[(4, 4)]);
        let reveal = game.open((0, 0));

        assert_eq!(reveal.waves[0], vec![(0, 0)]);
        for (depth, wave) in reveal.waves.iter().enumerate().skip(1) {
            for &(row, column) in wave {
                // every cell of a wave is one step further out than the previous wave
                assert_eq!(row.max(column), depth, "{:?} in wave {depth}", (row, column));
            }
        }

        let mut all = opened(&reveal).collect::<Vec<_>>();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total, "a cell was opened twice");
    }

    #[test]
    fn single_mine_board_explodes() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut game = Game::new(&config(1, 1, 1, ""), &mut rng).unwrap();
        let reveal = game.open((0, 0));
        assert_eq!(reveal.outcome, Outcome::Exploded);
        assert!(game.exploded());
        assert!(!game.won());
        assert!(reveal.exposed_mines.is_empty());
    }

    #[test]
    fn exploding_exposes_every_other_mine_and_freezes_the_game() {
        let mut game = rigged(4, 4, "", &[(0, 0), (3, 3), (0, 3)]);
        let reveal = game.open((3, 3));
        assert_eq!(reveal.outcome, Outcome::Exploded);
        assert_eq!(reveal.exposed_mines, vec![(0, 0), (0, 3)]);
        assert!(game.board()[(3, 3)].open);
        assert!(!game.board()[(0, 0)].open);

        let before = game.board().clone();
        let opened = game.opened;
        assert_eq!(game.open((1, 1)), Reveal::noop());
        assert!(!game.toggle_flag((2, 0)));
        assert_eq!(game.board(), &before);
        assert_eq!(game.opened, opened);
        assert_eq!(game.flagged(), 0);
        assert!(game.exploded());
    }

    #[test]
    fn winning_freezes_the_game() {
        let mut game = rigged(1, 3, "", &[(0, 0), (0, 2)]);
        assert!(game.toggle_flag((0, 2)));
        assert_eq!(game.open((0, 1)).outcome, Outcome::Won);

        let before = game.board().clone();
        assert_eq!(game.open((0, 0)), Reveal::noop());
        assert!(!game.toggle_flag((0, 0)));
        // an existing flag stays put
        assert!(game.toggle_flag((0, 2)));
        assert_eq!(game.board(), &before);
        assert_eq!(game.opened, 1);
        assert_eq!(game.flagged(), 1);
        assert!(game.won());
        assert!(!game.exploded());
    }

    #[test]
    fn opening_a_permanent_cell_is_a_noop() {
        let mut game = rigged(9, 15, "404", &[(0, 0)]);
        let before = game.board().clone();
        assert_eq!(game.open((2, 2)), Reveal::noop());
        assert!(!game.toggle_flag((2, 2)));
        assert_eq!(game.board(), &before);
        assert_eq!(game.opened, 0);
        assert_eq!(game.flagged(), 0);
    }

    #[test]
    fn off_board_requests_are_noops() {
        let mut game = rigged(3, 3, "", &[(0, 0)]);
        assert_eq!(game.open((3, 0)), Reveal::noop());
        assert_eq!(game.open((0, 3)), Reveal::noop());
        assert!(!game.toggle_flag((7, 7)));
        assert!(!game.is_over());
    }

    #[test]
    fn open_and_flagged_cells_are_not_reopened() {
        let mut game = rigged(4, 4, "", &[(0, 0), (0, 3)]);
        assert_eq!(game.open((3, 1)).outcome, Outcome::Cascaded);
        let opened = game.opened;
        assert_eq!(opened, 12);
        assert_eq!(game.open((3, 1)), Reveal::noop());
        assert_eq!(game.open((1, 1)), Reveal::noop());
        assert_eq!(game.opened, opened);

        let mut game = rigged(3, 3, "", &[(0, 0)]);
        assert!(game.toggle_flag((1, 1)));
        assert_eq!(game.open((1, 1)), Reveal::noop());
        assert!(!game.board()[(1, 1)].open);
    }

    #[test]
    fn numbered_cell_opens_alone() {
        let mut game = rigged(3, 3, "", &[(0, 0)]);
        let reveal = game.open((1, 1));
        assert_eq!(reveal.outcome, Outcome::Opened);
        assert_eq!(reveal.waves, vec![vec![(1, 1)]]);
        assert_eq!(game.opened, 1);
    }

    #[test]
    fn cascade_stops_at_flags_and_the_pattern() {
        // a flag on the only bridge between the two halves holds the cascade back
        let mut game = rigged(1, 5, "", &[]);
        assert!(game.toggle_flag((0, 2)));
        let reveal = game.open((0, 0));
        assert_eq!(reveal.outcome, Outcome::Cascaded);
        assert_eq!(opened(&reveal).collect::<Vec<_>>(), vec![(0, 0), (0, 1)]);
        assert!(!game.board()[(0, 3)].open);

        let mut game = rigged(7, 9, "44", &[]);
        game.open((0, 0));
        assert!(game.won());
        assert_eq!(game.opened, game.openable());
    }

    #[test]
    fn cascade_matches_a_reference_flood() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..50 {
            let mut game = Game::new(&config(9, 15, 12, "404"), &mut rng).unwrap();
            let Some((origin, _)) = game
                .board()
                .iter()
                .find(|(_, c)| !c.mine && !c.permanent && c.adjacent_mines == 0)
            else {
                continue;
            };

            let expected = reference_flood(game.board(), origin);
            let reveal = game.open(origin);
            assert_eq!(open_cells(&game), expected);

            let returned = opened(&reveal)
                .map(|c| game.board().index_of(c))
                .collect::<BitSet>();
            assert_eq!(returned, expected);
            assert_eq!(opened(&reveal).count(), expected.len());
            assert_eq!(game.opened, expected.len());
        }
    }

    #[test]
    fn won_exactly_when_every_safe_cell_is_open() {
        let mut rng = StdRng::seed_from_u64(2024);
        for _ in 0..20 {
            let mut game = Game::new(&config(9, 15, 10, "404"), &mut rng).unwrap();
            let safe = game
                .board()
                .iter()
                .filter(|(_, c)| !c.mine && !c.permanent)
                .map(|(coordinate, _)| coordinate)
                .collect::<Vec<_>>();

            for coordinate in safe {
                game.open(coordinate);
                assert!(!game.exploded());
                assert_eq!(game.won(), game.opened == game.openable());
            }
            assert!(game.won());
            assert_eq!(game.status, Status::Won);
        }
    }

    #[test]
    fn win_ignores_flags() {
        let mut game = rigged(2, 2, "", &[(0, 0)]);
        // flag a safe cell and leave the mine unflagged
        assert!(game.toggle_flag((1, 1)));
        game.open((0, 1));
        game.open((1, 0));
        assert!(!game.won());
        assert!(!game.toggle_flag((1, 1)));
        assert_eq!(game.open((1, 1)).outcome, Outcome::Won);
    }

    #[test]
    fn flag_twice_is_a_net_noop() {
        let mut game = rigged(3, 3, "", &[(0, 0)]);
        assert!(game.toggle_flag((2, 2)));
        assert_eq!(game.flagged(), 1);
        assert!(!game.toggle_flag((2, 2)));
        assert_eq!(game.flagged(), 0);
        assert!(!game.board()[(2, 2)].flagged);
    }

    #[test]
    fn flag_count_is_not_capped_by_mines() {
        let mut game = rigged(3, 3, "", &[(0, 0)]);
        for coordinate in [(0, 1), (1, 1), (2, 2)] {
            assert!(game.toggle_flag(coordinate));
        }
        assert_eq!(game.flagged(), 3);
        assert!(game.flagged() > game.mines());
    }

    #[test]
    fn open_cells_cannot_be_flagged() {
        let mut game = rigged(3, 3, "", &[(0, 0)]);
        game.open((1, 1));
        assert!(!game.toggle_flag((1, 1)));
        assert_eq!(game.flagged(), 0);
    }

    #[test]
    fn elapsed_freezes_once_the_game_is_over() {
        let mut game = rigged(1, 2, "", &[(0, 0)]);
        game.open((0, 1));
        assert!(game.won());
        let frozen = game.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(game.elapsed(), frozen);
    }

    #[test]
    fn seeded_configs_repeat_their_layouts() {
        let config = config(9, 15, 10, "404");
        let first = Game::new(&config, &mut config.rng()).unwrap();
        let second = Game::new(&config, &mut config.rng()).unwrap();
        assert_eq!(first.board(), second.board());
    }
}

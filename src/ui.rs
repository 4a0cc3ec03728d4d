use crate::{
    error::Error,
    events::{self, Event, Events},
    sweep::{Cell, Config, Coordinate, Game, Outcome, Reveal},
};
use bit_set::BitSet;
use num_traits::ToPrimitive;
use rand::rngs::StdRng;
use ratatui::{
    backend::TermionBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, BorderType, Borders, Clear, Gauge, List, ListItem, Paragraph},
    Frame, Terminal,
};
use std::{
    collections::VecDeque,
    fmt, io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use termion::{
    event::{Event as TermEvent, Key, MouseButton, MouseEvent},
    input::MouseTerminal,
    raw::IntoRawMode,
    screen::IntoAlternateScreen,
};
use tracing::info;

fn centered_rect(width: u16, height: u16, r: Rect) -> Rect {
    let Rect {
        width: grid_width,
        height: grid_height,
        ..
    } = r;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length((grid_height / 2).saturating_sub(height / 2)),
                Constraint::Length(height),
                Constraint::Length((grid_height / 2).saturating_sub(height / 2)),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Length((grid_width / 2).saturating_sub(width / 2)),
                Constraint::Length(width),
                Constraint::Length((grid_width / 2).saturating_sub(width / 2)),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn align_strings_to_char(strings: &[&str], c: char) -> Vec<String> {
    let (firsts, rests): (Vec<_>, Vec<_>) = strings
        .iter()
        .map(|&s| s.split_at(s.find(c).unwrap_or(s.len())))
        .unzip();
    let max_firsts = firsts.iter().map(|&f| f.len()).max().unwrap_or(0);
    let max_rests = rests.iter().map(|&r| r.len()).max().unwrap_or(0);
    firsts
        .into_iter()
        .zip(rests)
        .map(|(first, rest)| format!("{first:>max_firsts$}{rest:<max_rests$}"))
        .collect()
}

#[derive(typed_builder::TypedBuilder)]
pub(crate) struct Ui {
    config: Config,
    cell_width: usize,
    cell_height: usize,
    events: events::Config,
}

const BOMB: &str = "💣";
const FLAG: &str = "⛳";
const CLOCK: &str = "⏱";

// the blue of the permanent "404" tiles
const PATTERN_BLUE: Color = Color::Rgb(52, 107, 245);

fn number_color(adjacent_mines: u8) -> Color {
    match adjacent_mines {
        1 => Color::LightBlue,
        2 => Color::LightGreen,
        3 => Color::Yellow,
        4 => Color::Magenta,
        5 => Color::LightRed,
        6 => Color::Cyan,
        7 => Color::White,
        _ => Color::LightMagenta,
    }
}

struct App {
    config: Config,
    rng: StdRng,
    game: Game,
    active_column: usize,
    active_row: usize,
    // cascade waves not drawn yet, one is uncovered per tick
    pending: VecDeque<Vec<Coordinate>>,
    // open in the game but still drawn closed
    veiled: BitSet,
    // mines shown after an explosion
    exposed: BitSet,
    // where each cell landed on screen during the last draw, in board order
    cell_rects: Vec<Rect>,
}

struct CellView<'app> {
    app: &'app App,
    cell: &'app Cell,
    coordinate: Coordinate,
}

impl<'app> CellView<'app> {
    fn new(app: &'app App, coordinate: Coordinate) -> Result<Self, Error> {
        let cell = app
            .game
            .board()
            .get(coordinate)
            .ok_or(Error::CellOutOfBounds(coordinate))?;
        Ok(Self {
            app,
            cell,
            coordinate,
        })
    }

    fn index(&self) -> usize {
        self.app.game.board().index_of(self.coordinate)
    }

    fn is_active(&self) -> bool {
        self.app.active() == self.coordinate
    }

    fn is_exposed(&self) -> bool {
        self.cell.open && !self.app.veiled.contains(self.index())
    }

    fn shows_mine(&self) -> bool {
        self.cell.mine
            && (self.is_exposed()
                || (self.app.game.exploded() && self.app.exposed.contains(self.index())))
    }

    fn block(&self) -> Block {
        Block::default()
            .borders(Borders::ALL)
            .style(
                Style::default()
                    .bg(Color::Black)
                    .fg(if self.is_active() {
                        Color::Cyan
                    } else if self.shows_mine() {
                        Color::LightRed
                    } else if self.cell.permanent {
                        PATTERN_BLUE
                    } else {
                        Color::White
                    })
                    .add_modifier(if self.is_active() {
                        Modifier::BOLD
                    } else {
                        Modifier::empty()
                    }),
            )
            .border_type(BorderType::Rounded)
    }

    fn text_style(&self) -> Style {
        if self.cell.permanent {
            return Style::default().fg(Color::White).bg(PATTERN_BLUE);
        }

        Style::default()
            .fg(if self.shows_mine() {
                Color::LightYellow
            } else if self.is_exposed() {
                number_color(self.cell.adjacent_mines)
            } else {
                Color::Black
            })
            .bg(if self.shows_mine() && self.is_exposed() {
                Color::Red
            } else if self.is_exposed() || self.shows_mine() {
                Color::Black
            } else if self.is_active() {
                Color::Cyan
            } else {
                Color::White
            })
    }
}

impl fmt::Display for CellView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cell.permanent {
            write!(f, " ")
        } else if self.cell.flagged {
            write!(f, "{FLAG}")
        } else if self.shows_mine() {
            write!(f, "{BOMB}")
        } else if self.is_exposed() && self.cell.adjacent_mines > 0 {
            write!(f, "{}", self.cell.adjacent_mines)
        } else {
            write!(f, " ")
        }
    }
}

impl App {
    fn new(config: Config) -> Result<Self, Error> {
        let mut rng = config.rng();
        let game = Game::new(&config, &mut rng)?;
        Ok(Self {
            config,
            rng,
            game,
            active_column: 0,
            active_row: 0,
            pending: VecDeque::new(),
            veiled: BitSet::new(),
            exposed: BitSet::new(),
            cell_rects: Vec::new(),
        })
    }

    /// Throws the current game away and deals a new one from the same configuration.
    fn restart(&mut self) -> Result<(), Error> {
        self.game = Game::new(&self.config, &mut self.rng)?;
        self.pending.clear();
        self.veiled.clear();
        self.exposed.clear();
        info!("restarted");
        Ok(())
    }

    fn up(&mut self) {
        if let Some(active_row) = self.active_row.checked_sub(1) {
            self.active_row = active_row;
        }
    }

    fn down(&mut self) {
        self.active_row += usize::from(self.active_row < self.game.board().rows() - 1);
    }

    fn left(&mut self) {
        if let Some(active_column) = self.active_column.checked_sub(1) {
            self.active_column = active_column;
        }
    }

    fn right(&mut self) {
        self.active_column += usize::from(self.active_column < self.game.board().columns() - 1);
    }

    fn select(&mut self, (row, column): Coordinate) {
        self.active_row = row;
        self.active_column = column;
    }

    fn cell(&self, coordinate: Coordinate) -> Result<CellView, Error> {
        CellView::new(self, coordinate)
    }

    fn active(&self) -> Coordinate {
        (self.active_row, self.active_column)
    }

    /// Opens a cell and queues everything past the first wave for the following ticks.
    fn open(&mut self, coordinate: Coordinate) {
        let Reveal {
            outcome,
            waves,
            exposed_mines,
        } = self.game.open(coordinate);

        let board = self.game.board();
        for wave in waves.into_iter().skip(1) {
            for &cell in &wave {
                self.veiled.insert(board.index_of(cell));
            }
            self.pending.push_back(wave);
        }

        if outcome == Outcome::Exploded {
            self.exposed
                .extend(exposed_mines.into_iter().map(|mine| board.index_of(mine)));
        }
    }

    fn flag(&mut self, coordinate: Coordinate) {
        self.game.toggle_flag(coordinate);
    }

    /// Uncovers the next pending wave.
    fn tick(&mut self) {
        if let Some(wave) = self.pending.pop_front() {
            let board = self.game.board();
            for cell in wave {
                self.veiled.remove(board.index_of(cell));
            }
        }
    }

    fn settled(&self) -> bool {
        self.pending.is_empty()
    }

    /// The cell under a 1-based terminal position, as reported by mouse events.
    fn cell_at(&self, x: u16, y: u16) -> Option<Coordinate> {
        let (x, y) = (x.checked_sub(1)?, y.checked_sub(1)?);
        self.cell_rects
            .iter()
            .position(|rect| rect.x <= x && x < rect.right() && rect.y <= y && y < rect.bottom())
            .map(|index| self.game.board().coordinate(index))
    }
}

/// Fixed screen geometry of the board, derived once from the configuration.
struct Geometry {
    cell_width: usize,
    cell_height: usize,
    grid_width: u16,
    grid_height: u16,
    row_constraints: Vec<Constraint>,
    col_constraints: Vec<Constraint>,
}

impl Geometry {
    fn new(
        rows: usize,
        columns: usize,
        cell_width: usize,
        cell_height: usize,
    ) -> Result<Self, Error> {
        let padding = 1;
        let to_u16 = |value: usize| u16::try_from(value).map_err(Error::ConvertUsizeToU16);
        // cells plus the surrounding border, before narrowing to terminal units
        let extent = |cells: usize, size: usize| {
            cells
                .checked_mul(size)
                .and_then(|inner| inner.checked_add(2 * padding))
                .ok_or(Error::GridTooLarge { rows, columns })
        };

        Ok(Self {
            cell_width,
            cell_height,
            grid_width: to_u16(extent(columns, cell_width)?)?,
            grid_height: to_u16(extent(rows, cell_height)?)?,
            row_constraints: vec![Constraint::Length(to_u16(cell_height)?); rows],
            col_constraints: vec![Constraint::Length(to_u16(cell_width)?); columns],
        })
    }

    /// Centre-aligned text block filling one cell.
    fn cell_text(&self, label: String) -> String {
        let single_row_text = format!(
            "{:^length$}",
            label,
            length = self.cell_width.saturating_sub(2)
        );
        let pad_line = " ".repeat(self.cell_width);

        // the text line and the top and bottom borders are not eligible for padding
        let num_pad_lines = self.cell_height.saturating_sub(3);

        std::iter::repeat(pad_line.clone())
            .take(num_pad_lines / 2)
            .chain(std::iter::once(single_row_text))
            .chain(std::iter::repeat(pad_line).take(num_pad_lines / 2))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn titled_block(title: &str, color: Color) -> Block {
    Block::default().borders(Borders::ALL).title(Span::styled(
        title,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

/// Mine count, flag gauge and clock.
fn draw_hud(frame: &mut Frame, game: &Game, area: Rect) {
    let rects = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    let mines = game.mines();
    let flagged = game.flagged();
    // flags are informational: more flags than mines just tops the gauge out
    let flag_ratio = if mines == 0 {
        0.0
    } else {
        (flagged.to_f64().unwrap_or(0.0) / mines.to_f64().unwrap_or(1.0)).min(1.0)
    };

    frame.render_widget(
        Paragraph::new(mines.to_string())
            .block(titled_block(BOMB, Color::LightYellow))
            .alignment(Alignment::Center),
        rects[0],
    );
    frame.render_widget(
        Gauge::default()
            .block(titled_block(FLAG, Color::LightMagenta))
            .gauge_style(
                Style::default()
                    .fg(Color::White)
                    .bg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
            .label(flagged.to_string())
            .ratio(flag_ratio),
        rects[1],
    );
    frame.render_widget(
        Paragraph::new(format!("{} s", game.elapsed().as_secs()))
            .block(titled_block(CLOCK, Color::LightCyan))
            .alignment(Alignment::Center),
        rects[2],
    );
}

/// Draws every cell into `area` and returns the screen rectangle of each, in board order.
fn draw_board(frame: &mut Frame, app: &App, geometry: &Geometry, area: Rect) -> Vec<Rect> {
    frame.render_widget(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
        area,
    );

    let row_rects = Layout::default()
        .direction(Direction::Vertical)
        .vertical_margin(1)
        .constraints(geometry.row_constraints.clone())
        .split(area);

    let mut cell_rects =
        Vec::with_capacity(geometry.row_constraints.len() * geometry.col_constraints.len());
    for (r, row_rect) in row_rects.iter().enumerate() {
        let col_rects = Layout::default()
            .direction(Direction::Horizontal)
            .horizontal_margin(1)
            .constraints(geometry.col_constraints.clone())
            .split(*row_rect);

        for (c, cell_rect) in col_rects.iter().enumerate() {
            cell_rects.push(*cell_rect);
            let Ok(cell) = app.cell((r, c)) else {
                continue;
            };
            frame.render_widget(
                Paragraph::new(geometry.cell_text(cell.to_string()))
                    .block(cell.block())
                    .style(cell.text_style()),
                *cell_rect,
            );
        }
    }
    cell_rects
}

/// The closing message, once the last wave of the final move is on screen.
fn draw_banner(frame: &mut Frame, game: &Game, area: Rect) {
    let won = game.won();
    let (message, color) = if won {
        (
            "Congratulations!\nThe page is not found,\nbut the winner is!\n[r] play again",
            Color::LightGreen,
        )
    } else {
        (
            "The page is not found,\nbut the mine is!\n\n[r] play again",
            Color::Magenta,
        )
    };

    let area = centered_rect(30, 6, area);
    frame.render_widget(Clear, area); // this clears out the background
    frame.render_widget(
        Paragraph::new(message)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Thick)
                    .border_style(Style::default().fg(color).add_modifier(Modifier::BOLD))
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .alignment(Alignment::Center),
        area,
    );
}

fn draw(frame: &mut Frame, app: &mut App, geometry: &Geometry) {
    let terminal_rect = frame.size();
    let Geometry {
        grid_width,
        grid_height,
        ..
    } = *geometry;

    frame.render_widget(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                "404 · Page Not Found",
                Style::default()
                    .fg(Color::LightYellow)
                    .add_modifier(Modifier::BOLD),
            ))
            .border_type(BorderType::Rounded),
        terminal_rect,
    );

    let inner_rect = Layout::default()
        .direction(Direction::Vertical)
        .vertical_margin(1)
        .horizontal_margin(1)
        .constraints(vec![Constraint::Min(grid_height)])
        .split(terminal_rect)[0];

    let horizontal_pad = terminal_rect
        .width
        .checked_sub(grid_width)
        .unwrap_or(terminal_rect.width)
        / 2;
    let column_rect = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Min(horizontal_pad),
            Constraint::Length(grid_width),
            Constraint::Min(horizontal_pad.saturating_sub(1)),
        ])
        .split(inner_rect)[1];

    let vertical_pad = inner_rect
        .height
        .checked_sub(grid_height)
        .unwrap_or(inner_rect.height)
        / 2;
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Min(vertical_pad),
            Constraint::Length(grid_height),
            Constraint::Min(vertical_pad),
        ])
        .split(column_rect);

    let hud_rect = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Min(vertical_pad.saturating_sub(3)),
            Constraint::Length(3),
        ])
        .split(sections[0])[1];
    draw_hud(frame, &app.game, hud_rect);

    let help_text = List::new(
        align_strings_to_char(
            &[
                "movement: hjkl / ← ↓ ↑ →",
                "open tile: spacebar / left click",
                "flag tile: f / right click",
                "new game: r",
                "quit: q",
            ],
            ':',
        )
        .into_iter()
        .map(|line| format!("{:^width$}", line, width = usize::from(grid_width)))
        .map(ListItem::new)
        .collect::<Vec<_>>(),
    );
    frame.render_widget(help_text, sections[2]);

    app.cell_rects = draw_board(frame, app, geometry, sections[1]);

    if app.game.is_over() && app.settled() {
        draw_banner(frame, &app.game, sections[1]);
    }
}

impl Ui {
    pub(crate) fn run(self) -> Result<(), Error> {
        let events = Events::with_config(self.events);
        let geometry = Geometry::new(
            self.config.rows,
            self.config.columns,
            self.cell_width,
            self.cell_height,
        )?;

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        ctrlc::set_handler(move || {
            running_clone.store(false, Ordering::SeqCst);
        })
        .map_err(Error::SetHandler)?;

        // a bad configuration is reported before the terminal is taken over
        let mut app = App::new(self.config)?;

        let stdout = io::stdout()
            .into_raw_mode()
            .map_err(Error::GetStdoutInRawMode)?
            .into_alternate_screen()
            .map_err(Error::GetAlternateScreenForMouseTerminal)?;
        let mouse_terminal = MouseTerminal::from(stdout);
        let backend = TermionBackend::new(mouse_terminal);
        let mut terminal = Terminal::new(backend).map_err(Error::CreateTerminal)?;

        while running.load(Ordering::SeqCst) {
            terminal
                .draw(|frame| draw(frame, &mut app, &geometry))
                .map_err(Error::DrawToTerminal)?;

            match events.next().map_err(Error::GetEvent)? {
                Event::Tick => app.tick(),
                Event::Input(TermEvent::Key(key)) => match key {
                    // movement using arrow keys or vim movement keys
                    Key::Up | Key::Char('k') => app.up(),
                    Key::Down | Key::Char('j') => app.down(),
                    Key::Left | Key::Char('h') => app.left(),
                    Key::Right | Key::Char('l') => app.right(),
                    Key::Char('f') => app.flag(app.active()),
                    Key::Char(' ') | Key::Char('\n') => app.open(app.active()),
                    Key::Char('r') => app.restart()?,
                    Key::Char('q') | Key::Ctrl('c') => break,
                    _ => {}
                },
                Event::Input(TermEvent::Mouse(MouseEvent::Press(button, x, y))) => {
                    if let Some(coordinate) = app.cell_at(x, y) {
                        app.select(coordinate);
                        match button {
                            MouseButton::Left => app.open(coordinate),
                            MouseButton::Right => app.flag(coordinate),
                            _ => {}
                        }
                    }
                }
                Event::Input(_) => {}
            }
        }

        Ok(())
    }
}

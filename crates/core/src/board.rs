//! Word-search grids for board-game questions.
//!
//! [`generate`] hides the normalized answer along one straight line (any of
//! the eight compass directions) and fills the rest with random letters.
//! [`GridSelection`] models the drag gesture used to pick letters back out.

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::Serialize;

const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

//
// ─── DIRECTIONS ────────────────────────────────────────────────────────────────
//

/// Unit step between consecutive letters of a placed word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    East,
    South,
    SouthEast,
    SouthWest,
    West,
    North,
    NorthWest,
    NorthEast,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::East,
        Direction::South,
        Direction::SouthEast,
        Direction::SouthWest,
        Direction::West,
        Direction::North,
        Direction::NorthWest,
        Direction::NorthEast,
    ];

    /// `(row delta, column delta)`
    #[must_use]
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::East => (0, 1),
            Direction::South => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::SouthWest => (1, -1),
            Direction::West => (0, -1),
            Direction::North => (-1, 0),
            Direction::NorthWest => (-1, -1),
            Direction::NorthEast => (-1, 1),
        }
    }
}

/// Where the answer was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub row: usize,
    pub col: usize,
    pub direction: Direction,
    pub word: String,
}

//
// ─── GRID ──────────────────────────────────────────────────────────────────────
//

/// Square grid of uppercase letters, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardGrid {
    size: usize,
    cells: Vec<char>,
    placement: Option<Placement>,
}

impl BoardGrid {
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// `None` when the answer could not be placed and the grid is pure noise.
    #[must_use]
    pub fn placement(&self) -> Option<&Placement> {
        self.placement.as_ref()
    }

    #[must_use]
    pub fn letter(&self, row: usize, col: usize) -> Option<char> {
        if row >= self.size || col >= self.size {
            return None;
        }
        self.cells.get(row * self.size + col).copied()
    }

    /// Letter at a flat row-major index.
    #[must_use]
    pub fn letter_at(&self, index: usize) -> Option<char> {
        self.cells.get(index).copied()
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.size.max(1))
            .map(|row| row.iter().collect())
            .collect()
    }

    fn coords(&self, index: usize) -> (usize, usize) {
        (index / self.size, index % self.size)
    }

    /// Whether two flat indices touch, diagonals included.
    #[must_use]
    pub fn are_adjacent(&self, a: usize, b: usize) -> bool {
        if a == b || a >= self.cells.len() || b >= self.cells.len() {
            return false;
        }
        let (ar, ac) = self.coords(a);
        let (br, bc) = self.coords(b);
        ar.abs_diff(br) <= 1 && ac.abs_diff(bc) <= 1
    }

    /// Flat indices of the placed answer, first letter first. Empty when unplaced.
    #[must_use]
    pub fn answer_cells(&self) -> Vec<usize> {
        self.placement
            .as_ref()
            .and_then(|p| {
                line_cells(self.size, p.row, p.col, p.direction, p.word.chars().count())
            })
            .map(|cells| cells.into_iter().map(|(r, c)| r * self.size + c).collect())
            .unwrap_or_default()
    }

    /// Scan every straight line for `word` (letters only, case-insensitive).
    #[must_use]
    pub fn contains_word(&self, word: &str) -> bool {
        let word = letters_only(word);
        if word.is_empty() {
            return false;
        }
        let letters: Vec<char> = word.chars().collect();
        (0..self.size).any(|row| {
            (0..self.size).any(|col| {
                Direction::ALL
                    .iter()
                    .any(|dir| self.matches_at(&letters, row, col, *dir))
            })
        })
    }

    fn matches_at(&self, letters: &[char], row: usize, col: usize, dir: Direction) -> bool {
        let Some(cells) = line_cells(self.size, row, col, dir, letters.len()) else {
            return false;
        };
        cells
            .iter()
            .zip(letters)
            .all(|(&(r, c), &ch)| self.letter(r, c) == Some(ch))
    }
}

//
// ─── GENERATION ────────────────────────────────────────────────────────────────
//

/// Uppercase, ASCII letters only.
#[must_use]
pub fn letters_only(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_uppercase)
        .filter(char::is_ascii_alphabetic)
        .collect()
}

/// Generate a grid with the thread-local RNG.
#[must_use]
pub fn generate(answer: &str, size: usize) -> BoardGrid {
    generate_with(answer, size, &mut rand::rng())
}

/// Generate a grid hiding `answer`, drawing randomness from `rng`.
///
/// An empty answer, or one longer than the grid can hold, yields a grid of
/// random letters with no placement.
pub fn generate_with<R: Rng + ?Sized>(answer: &str, size: usize, rng: &mut R) -> BoardGrid {
    let word = letters_only(answer);
    let mut slots: Vec<Option<char>> = vec![None; size * size];

    let placement = if word.is_empty() || word.len() > size * size {
        None
    } else {
        place_word(&mut slots, size, &word, rng)
    };

    let cells = slots
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| random_letter(rng)))
        .collect();

    BoardGrid {
        size,
        cells,
        placement,
    }
}

fn place_word<R: Rng + ?Sized>(
    slots: &mut [Option<char>],
    size: usize,
    word: &str,
    rng: &mut R,
) -> Option<Placement> {
    let len = word.chars().count();
    let mut directions = Direction::ALL;
    directions.shuffle(rng);

    for direction in directions {
        let starts: Vec<(usize, usize)> = (0..size)
            .flat_map(|row| (0..size).map(move |col| (row, col)))
            .filter(|&(row, col)| line_cells(size, row, col, direction, len).is_some())
            .collect();

        if let Some(&(row, col)) = starts.choose(rng) {
            write_line(slots, size, word, row, col, direction);
            return Some(Placement {
                row,
                col,
                direction,
                word: word.to_owned(),
            });
        }
    }

    // Horizontal fallback; unreachable for square grids but kept for odd sizes.
    if len <= size && size > 0 {
        let row = rng.random_range(0..size);
        let col = rng.random_range(0..=size - len);
        write_line(slots, size, word, row, col, Direction::East);
        return Some(Placement {
            row,
            col,
            direction: Direction::East,
            word: word.to_owned(),
        });
    }

    None
}

fn write_line(
    slots: &mut [Option<char>],
    size: usize,
    word: &str,
    row: usize,
    col: usize,
    direction: Direction,
) {
    let len = word.chars().count();
    if let Some(cells) = line_cells(size, row, col, direction, len) {
        for ((r, c), ch) in cells.into_iter().zip(word.chars()) {
            slots[r * size + c] = Some(ch);
        }
    }
}

/// Cells covered by a line of `len` starting at `(row, col)`, or `None` if it leaves the grid.
fn line_cells(
    size: usize,
    row: usize,
    col: usize,
    direction: Direction,
    len: usize,
) -> Option<Vec<(usize, usize)>> {
    if len == 0 || row >= size || col >= size {
        return None;
    }
    let (dr, dc) = direction.delta();
    let steps = isize::try_from(len - 1).ok()?;
    let end_row = isize::try_from(row).ok()? + dr * steps;
    let end_col = isize::try_from(col).ok()? + dc * steps;
    let limit = isize::try_from(size).ok()?;
    if !(0..limit).contains(&end_row) || !(0..limit).contains(&end_col) {
        return None;
    }

    let mut out = Vec::with_capacity(len);
    let (mut r, mut c) = (isize::try_from(row).ok()?, isize::try_from(col).ok()?);
    for _ in 0..len {
        out.push((usize::try_from(r).ok()?, usize::try_from(c).ok()?));
        r += dr;
        c += dc;
    }
    Some(out)
}

fn random_letter<R: Rng + ?Sized>(rng: &mut R) -> char {
    char::from(ALPHABET[rng.random_range(0..ALPHABET.len())])
}

//
// ─── SELECTION ─────────────────────────────────────────────────────────────────
//

/// Drag-based letter selection over a [`BoardGrid`].
///
/// A press starts a new path, entering a cell extends it when that cell is
/// unselected and touches the last one, and release commits the letters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridSelection {
    cells: Vec<usize>,
    dragging: bool,
    committed: Option<String>,
}

impl GridSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, grid: &BoardGrid, index: usize) {
        self.committed = None;
        if index >= grid.cell_count() {
            self.cells.clear();
            self.dragging = false;
            return;
        }
        self.cells = vec![index];
        self.dragging = true;
    }

    /// Returns true when the cell was added to the path.
    pub fn enter(&mut self, grid: &BoardGrid, index: usize) -> bool {
        if !self.dragging || self.cells.contains(&index) {
            return false;
        }
        let Some(&last) = self.cells.last() else {
            return false;
        };
        if !grid.are_adjacent(last, index) {
            return false;
        }
        self.cells.push(index);
        true
    }

    /// End the drag and commit the selected letters. No-op outside a drag.
    pub fn release(&mut self, grid: &BoardGrid) -> Option<&str> {
        if !self.dragging {
            return self.committed.as_deref();
        }
        self.dragging = false;
        let word: String = self
            .cells
            .iter()
            .filter_map(|&i| grid.letter_at(i))
            .collect();
        self.committed = Some(word);
        self.committed.as_deref()
    }

    #[must_use]
    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    #[must_use]
    pub fn committed(&self) -> Option<&str> {
        self.committed.as_deref()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn dragging_over_answer_cells_spells_the_answer() {
        let mut rng = StdRng::seed_from_u64(7);
        let grid = generate_with("Nucleus", 10, &mut rng);
        let path = grid.answer_cells();
        assert_eq!(path.len(), 7);

        let mut selection = GridSelection::new();
        selection.press(&grid, path[0]);
        for &cell in &path[1..] {
            assert!(selection.enter(&grid, cell));
        }
        assert_eq!(selection.release(&grid), Some("NUCLEUS"));
    }

    #[test]
    fn answer_is_always_hidden_in_a_line() {
        let words = ["Nucleus", "cell", "photo-syn", "ATOM", "ab", "x"];
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            for word in words {
                let grid = generate_with(word, 10, &mut rng);
                assert!(grid.contains_word(word), "seed {seed} lost {word}");
                assert!(grid.placement().is_some());
            }
        }
    }

    #[test]
    fn every_cell_is_an_uppercase_letter() {
        let mut rng = StdRng::seed_from_u64(7);
        let grid = generate_with("Nucleus", 10, &mut rng);
        assert_eq!(grid.cell_count(), 100);
        assert!(grid.rows().iter().all(|r| r.chars().all(|c| c.is_ascii_uppercase())));
        assert_eq!(grid.rows().len(), 10);
    }

    #[test]
    fn word_that_fills_a_full_line_is_placed() {
        let mut rng = StdRng::seed_from_u64(3);
        let grid = generate_with("abcdefghij", 10, &mut rng);
        assert!(grid.contains_word("ABCDEFGHIJ"));
    }

    #[test]
    fn unplaceable_answers_fall_back_to_noise() {
        let mut rng = StdRng::seed_from_u64(1);
        let empty = generate_with("1234 !!", 10, &mut rng);
        assert!(empty.placement().is_none());
        assert_eq!(empty.cell_count(), 100);

        let too_long = generate_with("abcdefghijk", 10, &mut rng);
        assert!(too_long.placement().is_none());
    }

    #[test]
    fn placement_records_the_written_line() {
        let mut rng = StdRng::seed_from_u64(11);
        let grid = generate_with("quark", 8, &mut rng);
        let placement = grid.placement().unwrap();
        let (dr, dc) = placement.direction.delta();
        for (i, ch) in placement.word.chars().enumerate() {
            let step = isize::try_from(i).unwrap();
            let r = usize::try_from(isize::try_from(placement.row).unwrap() + dr * step).unwrap();
            let c = usize::try_from(isize::try_from(placement.col).unwrap() + dc * step).unwrap();
            assert_eq!(grid.letter(r, c), Some(ch));
        }
    }

    #[test]
    fn selection_follows_adjacent_cells_and_commits_on_release() {
        let mut rng = StdRng::seed_from_u64(5);
        let grid = generate_with("cat", 10, &mut rng);
        let mut selection = GridSelection::new();

        selection.press(&grid, 0);
        assert!(selection.enter(&grid, 1));
        assert!(!selection.enter(&grid, 1), "cells are not selected twice");
        assert!(!selection.enter(&grid, 5), "non-adjacent cells are ignored");
        assert!(selection.enter(&grid, 12));

        let expected: String = [0, 1, 12]
            .iter()
            .map(|&i| grid.letter_at(i).unwrap())
            .collect();
        assert_eq!(selection.release(&grid), Some(expected.as_str()));
        assert!(!selection.is_dragging());
        assert!(!selection.enter(&grid, 13), "no extension after release");

        selection.press(&grid, 50);
        assert_eq!(selection.committed(), None);
    }

    #[test]
    fn row_wrap_is_not_adjacent() {
        let mut rng = StdRng::seed_from_u64(9);
        let grid = generate_with("cat", 10, &mut rng);
        assert!(!grid.are_adjacent(9, 10));
        assert!(grid.are_adjacent(9, 18));
    }
}

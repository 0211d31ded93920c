use quiz_core::board::{self, BoardGrid, GridSelection};
use quiz_core::model::{PresentationMode, Question};
use rand::Rng;

/// Per-question capture state, chosen once from the quiz's presentation mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    /// Prompt shown directly; typed text or option selection.
    Normal,
    /// Prompt hidden behind a card that must be flipped first.
    Card { flipped: bool },
    /// Word search over a generated grid; drag selection becomes the answer.
    Board {
        grid: BoardGrid,
        selection: GridSelection,
    },
}

impl Presentation {
    /// Build the capture state for `question`. Grids are generated here and
    /// nowhere else, once per question.
    pub fn for_question<R: Rng + ?Sized>(
        mode: PresentationMode,
        question: &Question,
        grid_size: usize,
        rng: &mut R,
    ) -> Self {
        match mode {
            PresentationMode::Normal => Self::Normal,
            PresentationMode::CardGame => Self::Card { flipped: false },
            PresentationMode::BoardGame if question.is_identification() => Self::Board {
                grid: board::generate_with(question.expected_answer(), grid_size, rng),
                selection: GridSelection::new(),
            },
            // option questions keep regular selection on the board
            PresentationMode::BoardGame => Self::Normal,
        }
    }

    #[must_use]
    pub fn grid(&self) -> Option<&BoardGrid> {
        match self {
            Self::Board { grid, .. } => Some(grid),
            _ => None,
        }
    }

    #[must_use]
    pub fn selection(&self) -> Option<&GridSelection> {
        match self {
            Self::Board { selection, .. } => Some(selection),
            _ => None,
        }
    }

    /// False only for an unflipped card.
    #[must_use]
    pub fn is_revealed(&self) -> bool {
        !matches!(self, Self::Card { flipped: false })
    }
}

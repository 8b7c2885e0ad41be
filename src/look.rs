//! Empty-width assertions and the character context they are decided by.

use bitflags::bitflags;

use crate::charset;

/// What sits on one side of a position in the subject.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Start or end of the subject.
    Edge,
    Word,
    LineTerminator,
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Edge,
        Category::Word,
        Category::LineTerminator,
        Category::Other,
    ];

    /// Categories a consumed character can belong to.
    pub const CHARS: [Category; 3] = [Category::Word, Category::LineTerminator, Category::Other];

    pub fn of(c: char) -> Category {
        if charset::word().test(c) {
            Category::Word
        } else if charset::line_terminators().test(c) {
            Category::LineTerminator
        } else {
            Category::Other
        }
    }

    /// Category of the character ending just before `pos`.
    pub fn before(subject: &str, pos: usize) -> Category {
        subject[..pos]
            .chars()
            .next_back()
            .map_or(Category::Edge, Category::of)
    }

    /// Category of the character starting at `pos`.
    pub fn after(subject: &str, pos: usize) -> Category {
        subject[pos..]
            .chars()
            .next()
            .map_or(Category::Edge, Category::of)
    }

    pub fn set(self) -> Categories {
        match self {
            Category::Edge => Categories::EDGE,
            Category::Word => Categories::WORD,
            Category::LineTerminator => Categories::LINE_TERMINATOR,
            Category::Other => Categories::OTHER,
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Code points belonging to a character category. Empty for `Edge`.
    pub fn members(self) -> charset::CharSet {
        match self {
            Category::Edge => charset::CharSet::empty(),
            Category::Word => charset::word().clone(),
            Category::LineTerminator => charset::line_terminators().clone(),
            Category::Other => charset::word()
                .union(charset::line_terminators())
                .complement(),
        }
    }

    fn is_word(self) -> bool {
        self == Category::Word
    }
}

bitflags! {
    /// A set of `Category` values.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Categories: u8 {
        const EDGE = 1 << 0;
        const WORD = 1 << 1;
        const LINE_TERMINATOR = 1 << 2;
        const OTHER = 1 << 3;
    }
}

impl Categories {
    pub fn includes(self, category: Category) -> bool {
        self.contains(category.set())
    }
}

/// An empty-width assertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Look {
    /// `\b`
    WordBoundary,
    /// `\B`
    NotWordBoundary,
    /// `^` without multiline.
    TextStart,
    /// `$` without multiline.
    TextEnd,
    /// `^` with multiline.
    LineStart,
    /// `$` with multiline.
    LineEnd,
}

impl Look {
    /// Decides the assertion from the categories on either side.
    pub fn holds(self, before: Category, after: Category) -> bool {
        match self {
            Look::WordBoundary => before.is_word() != after.is_word(),
            Look::NotWordBoundary => before.is_word() == after.is_word(),
            Look::TextStart => before == Category::Edge,
            Look::TextEnd => after == Category::Edge,
            Look::LineStart => matches!(before, Category::Edge | Category::LineTerminator),
            Look::LineEnd => matches!(after, Category::Edge | Category::LineTerminator),
        }
    }

    pub fn holds_at(self, subject: &str, pos: usize) -> bool {
        self.holds(Category::before(subject, pos), Category::after(subject, pos))
    }
}

/// Inline style accumulated while walking a paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StyleFlags {
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
    pub underline: bool,
    pub code: bool,
}

impl StyleFlags {
    /// The style for a verbatim run delimited by `mark`. Unknown marks leave
    /// the style unchanged.
    pub fn with_mark(self, mark: char) -> Self {
        match mark {
            '*' => StyleFlags { bold: true, ..self },
            '_' => StyleFlags {
                italic: true,
                ..self
            },
            '~' => StyleFlags {
                strike: true,
                ..self
            },
            '`' => StyleFlags { code: true, ..self },
            _ => self,
        }
    }

    pub fn underlined(self) -> Self {
        StyleFlags {
            underline: true,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Visual weight of a section heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadingTier {
    pub font_size: u16,
    pub bold: bool,
    pub italic: bool,
    pub color: Rgb,
    /// Vertical padding above and below the heading, in pixels.
    pub padding: u16,
}

const HEADING_TIERS: [HeadingTier; 4] = [
    HeadingTier {
        font_size: 32,
        bold: true,
        italic: false,
        color: Rgb(0x22, 0x22, 0x22),
        padding: 20,
    },
    HeadingTier {
        font_size: 24,
        bold: true,
        italic: false,
        color: Rgb(0x33, 0x33, 0x33),
        padding: 15,
    },
    HeadingTier {
        font_size: 20,
        bold: false,
        italic: true,
        color: Rgb(0x44, 0x44, 0x44),
        padding: 10,
    },
    HeadingTier {
        font_size: 16,
        bold: false,
        italic: false,
        color: Rgb(0x66, 0x66, 0x66),
        padding: 5,
    },
];

impl HeadingTier {
    /// Level 1 is the heaviest tier; 4 and deeper share the last one.
    pub fn for_level(level: u8) -> HeadingTier {
        let index = usize::from(level.max(1) - 1).min(HEADING_TIERS.len() - 1);
        HEADING_TIERS[index]
    }
}

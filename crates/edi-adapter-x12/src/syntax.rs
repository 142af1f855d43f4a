//! X12 delimiter discovery and byte-level reading
//!
//! X12 declares its delimiters inside the ISA segment itself: the byte after
//! `ISA` is the element separator, ISA16 is the component separator and the
//! byte following ISA16 terminates the segment.

/// Number of data elements in an ISA segment
pub const ISA_ELEMENT_COUNT: usize = 16;

/// Length of a fixed-width ISA segment including its terminator
pub const ISA_LENGTH: usize = 106;

/// Separators used for parsing X12
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Separators {
    /// Element separator (commonly `*`)
    pub element: u8,
    /// Component separator, ISA16 (commonly `>` or `:`)
    pub component: u8,
    /// Segment terminator (commonly `~`)
    pub segment: u8,
}

impl Default for Separators {
    fn default() -> Self {
        Self {
            element: b'*',
            component: b'>',
            segment: b'~',
        }
    }
}

impl Separators {
    /// Discover separators from the start of an ISA segment.
    ///
    /// Counts element separators instead of relying on fixed offsets, so
    /// unpadded headers are accepted as well as the standard 106-byte form.
    pub fn from_isa(data: &[u8]) -> Option<Self> {
        if data.len() < 4 || &data[0..3] != b"ISA" {
            return None;
        }

        let element = data[3];
        if element.is_ascii_alphanumeric() || element.is_ascii_whitespace() {
            return None;
        }

        let mut seen = 0;
        for (idx, &byte) in data.iter().enumerate().skip(3) {
            if byte == element {
                seen += 1;
                if seen == ISA_ELEMENT_COUNT {
                    let component = *data.get(idx + 1)?;
                    let segment = *data.get(idx + 2)?;
                    if component == element || segment == element || component == segment {
                        return None;
                    }
                    return Some(Self {
                        element,
                        component,
                        segment,
                    });
                }
            }
        }

        None
    }

    /// Check if a byte is a delimiter
    pub fn is_delimiter(&self, byte: u8) -> bool {
        byte == self.element || byte == self.component || byte == self.segment
    }
}

/// A buffer for reading X12 data
pub struct SyntaxBuffer<'a> {
    /// The underlying data buffer
    pub data: &'a [u8],
    /// Current position in the buffer
    pub pos: usize,
    /// The separators used for parsing
    pub separators: Separators,
}

impl<'a> SyntaxBuffer<'a> {
    /// Create a new syntax buffer with explicit separators
    pub fn with_separators(data: &'a [u8], separators: Separators) -> Self {
        Self {
            data,
            pos: 0,
            separators,
        }
    }

    /// Get current position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Check if we've reached the end
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Peek at the next byte without consuming it
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Read the next byte
    pub fn next_byte(&mut self) -> Option<u8> {
        let byte = self.data.get(self.pos).copied();
        if byte.is_some() {
            self.pos += 1;
        }
        byte
    }

    /// Read until the given delimiter set; returns the value and the
    /// delimiter that ended it (`None` at end of input)
    pub fn read_until(&mut self, component_aware: bool) -> (Vec<u8>, Option<u8>) {
        let mut result = Vec::new();

        while let Some(byte) = self.peek() {
            self.pos += 1;
            if byte == self.separators.element
                || byte == self.separators.segment
                || (component_aware && byte == self.separators.component)
            {
                return (result, Some(byte));
            }
            result.push(byte);
        }

        (result, None)
    }

    /// Read a segment tag (2-3 uppercase letters or digits, starting with a letter)
    pub fn read_tag(&mut self) -> Option<String> {
        let start = self.pos;
        let mut end = start;
        while end < self.data.len() && !self.separators.is_delimiter(self.data[end]) {
            end += 1;
        }

        let tag = &self.data[start..end];
        let valid = (2..=3).contains(&tag.len())
            && tag[0].is_ascii_uppercase()
            && tag
                .iter()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
        if !valid {
            return None;
        }

        self.pos = end;
        Some(String::from_utf8_lossy(tag).into_owned())
    }

    /// Skip line breaks and padding between segments
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() && b != self.separators.segment {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Get line and column for current position
    pub fn line_column(&self) -> (usize, usize) {
        let mut line = 1;
        let mut col = 1;

        for &byte in &self.data[..self.pos.min(self.data.len())] {
            if byte == b'\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }

        (line, col)
    }
}

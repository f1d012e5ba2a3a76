use std::fmt;

#[derive(Clone, Debug, Default, PartialEq, PartialOrd, Eq, Hash)]
pub struct Position {
    /// number of bytes seen since the begining of the input
    pub offset: usize,
    /// line number, starting at 1
    pub line: usize,
    /// number of chars seen since the begining of the line, starting at 1
    pub column: usize,
}

impl Position {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Position {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Clone, Debug, Default, PartialEq, PartialOrd, Eq, Hash)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_line_and_column() {
        let span = Span::new(Position::new(0, 1, 1), Position::new(7, 2, 3));
        assert_eq!("1:1-2:3", span.to_string());
    }
}

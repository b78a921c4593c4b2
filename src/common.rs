//! Source positions and statement identities

use serde::{Deserialize, Serialize};

/// Half-open byte range into a verification source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both operands, e.g. a whole loop from its
    /// invariant brace to its closing `end`
    pub fn join(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Convert to a miette span for diagnostic labels
    pub fn source_span(&self) -> miette::SourceSpan {
        (self.start, self.end.saturating_sub(self.start)).into()
    }
}

/// Identity of one resolved statement; keys the pre/post annotations that
/// become the proof outline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StmtId(u32);

/// Issues statement identities during resolution
#[derive(Default)]
pub struct StmtIds {
    next: u32,
}

impl StmtIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> StmtId {
        self.next += 1;
        StmtId(self.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_covers_the_whole_statement() {
        // `{ inv: I[q] }` at 12..25 joined with the closing `end` at 60..63
        let inv = Span::new(12, 25);
        let end_kw = Span::new(60, 63);
        assert_eq!(inv.join(end_kw), Span::new(12, 63));
        // insensitive to operand order
        assert_eq!(end_kw.join(inv), Span::new(12, 63));
    }

    #[test]
    fn test_source_span_offset_and_length() {
        // a two-byte qubit name like `q1`
        let ident = Span::new(7, 9);
        let converted = ident.source_span();
        assert_eq!(converted.offset(), 7);
        assert_eq!(converted.len(), 2);
    }

    #[test]
    fn test_statement_ids_are_distinct() {
        let mut ids = StmtIds::new();
        let a = ids.fresh();
        let b = ids.fresh();
        assert_ne!(a, b);
    }
}

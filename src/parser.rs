//! The top-level entry point tying the input stream, tokenizer, and tree builder together.

use crate::input_stream::InputStream;
use crate::reader::Readable;
use crate::trees::{TreeConstructionDispatcher, TreeSink};
use crate::{ParseOutcome, ParserConfig, Tokenizer};

/// Errors a [`Parser`] run can fail with.
///
/// This is distinct from [`crate::Error`]: `Error` is the WHATWG parse-error taxonomy, which
/// never aborts parsing (the spec requires the parser to recover and continue). `ParserError`
/// covers the much smaller set of conditions that actually stop a [`Parser`] from finishing.
///
/// `S` is the error type of a [`TreeSink`] passed to [`Parser::parse_str_with_sink`] or
/// [`Parser::parse_bytes_with_sink`]; callers that only use the sink-less `parse_str`/`parse_bytes`
/// never produce a [`ParserError::Sink`] and can ignore the parameter, which is why it defaults to
/// [`std::convert::Infallible`].
#[derive(Debug, thiserror::Error)]
pub enum ParserError<E, S = std::convert::Infallible> {
    /// The caller's [`Reader`](crate::Reader) implementation returned an error.
    #[error("reader error: {0}")]
    Reader(#[source] E),
    /// No bytes were supplied to parse.
    #[error("no input was supplied to parse")]
    EmptyInput,
    /// A [`TreeSink`] call failed while replaying the finished tree into it.
    #[error("tree sink error: {0}")]
    Sink(S),
}

/// Drives a full parse: sniffs the input's encoding, tokenizes, and constructs a tree.
///
/// ```
/// use html5loom::{Parser, ParserConfig};
///
/// let outcome = Parser::new(ParserConfig::new()).parse_str("<title>hi</title>").unwrap();
/// assert!(!outcome.quirks_mode);
/// ```
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a parser with the given configuration.
    #[must_use]
    pub fn new(config: ParserConfig) -> Self {
        Parser { config }
    }

    /// Parse an already-decoded string as a full HTML document.
    ///
    /// This is the common case for embedders that already have text (e.g. from a `fetch()`
    /// response whose `Content-Type` charset has already been applied upstream).
    pub fn parse_str(&self, input: &str) -> Result<ParseOutcome, ParserError<crate::Never>> {
        if input.is_empty() {
            log::debug!("parsing empty input, producing an empty document");
        }
        let tokenizer = Tokenizer::new(input);
        let dispatcher = TreeConstructionDispatcher::new(tokenizer).with_config(&self.config);
        dispatcher.run().map_err(ParserError::Reader)
    }

    /// Parse raw bytes as a full HTML document, sniffing the character encoding first.
    ///
    /// `transport_encoding` should be the charset from an out-of-band source such as a
    /// `Content-Type` header, if one is available.
    pub fn parse_bytes(
        &self,
        bytes: &[u8],
        transport_encoding: Option<&str>,
    ) -> Result<ParseOutcome, ParserError<crate::Never>> {
        if bytes.is_empty() {
            return Err(ParserError::EmptyInput);
        }

        let input_stream = InputStream::sniff(bytes, transport_encoding);
        log::debug!(
            "decoded input as {} (confidence: {:?})",
            input_stream.encoding().name(),
            input_stream.confidence(),
        );

        let tokenizer = Tokenizer::new(input_stream.to_reader());
        let dispatcher = TreeConstructionDispatcher::new(tokenizer).with_config(&self.config);
        dispatcher.run().map_err(ParserError::Reader)
    }

    /// Parse an already-decoded string and replay the resulting tree into `sink`.
    ///
    /// Equivalent to calling [`Self::parse_str`] and then
    /// [`ParsedTree::drive_sink`](crate::ParsedTree::drive_sink) on `outcome.tree`, except that a
    /// sink failure is folded into the same error type as the parse itself.
    pub fn parse_str_with_sink<S: TreeSink>(
        &self,
        input: &str,
        sink: &mut S,
    ) -> Result<ParseOutcome, ParserError<crate::Never, S::Error>> {
        let outcome = self.parse_str(input).map_err(|err| match err {
            ParserError::Reader(e) => ParserError::Reader(e),
            ParserError::EmptyInput => ParserError::EmptyInput,
            ParserError::Sink(never) => match never {},
        })?;
        outcome.tree.drive_sink(sink).map_err(ParserError::Sink)?;
        Ok(outcome)
    }

    /// Parse raw bytes, sniffing the character encoding first, and replay the resulting tree into
    /// `sink`.
    ///
    /// See [`Self::parse_str_with_sink`] for how sink errors are reported.
    pub fn parse_bytes_with_sink<S: TreeSink>(
        &self,
        bytes: &[u8],
        transport_encoding: Option<&str>,
        sink: &mut S,
    ) -> Result<ParseOutcome, ParserError<crate::Never, S::Error>> {
        let outcome = self.parse_bytes(bytes, transport_encoding).map_err(|err| match err {
            ParserError::Reader(e) => ParserError::Reader(e),
            ParserError::EmptyInput => ParserError::EmptyInput,
            ParserError::Sink(never) => match never {},
        })?;
        outcome.tree.drive_sink(sink).map_err(ParserError::Sink)?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_trivial_document() {
        let parser = Parser::new(ParserConfig::new());
        let outcome = parser.parse_str("<!doctype html><title>hi</title>").unwrap();
        assert!(!outcome.quirks_mode);
        assert!(outcome.node_count > 0);
    }

    #[test]
    fn missing_doctype_triggers_quirks_mode() {
        let parser = Parser::new(ParserConfig::new());
        let outcome = parser.parse_str("<p>hi</p>").unwrap();
        assert!(outcome.quirks_mode);
    }

    #[test]
    fn rejects_empty_byte_input() {
        let parser = Parser::new(ParserConfig::new());
        assert!(matches!(parser.parse_bytes(b"", None), Err(ParserError::EmptyInput)));
    }

    #[test]
    fn sniffs_and_parses_non_utf8_bytes() {
        let parser = Parser::new(ParserConfig::new());
        let bytes = b"<meta charset=windows-1252><p>caf\xE9</p>".to_vec();
        assert!(parser.parse_bytes(&bytes, None).is_ok());
    }
}

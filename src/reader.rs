use std::io::BufRead;

use crate::Never;

/// An object that provides characters to the tokenizer.
///
/// See [`crate::Tokenizer::new`] for more information.
pub trait Reader {
    /// The error this reader can fail with, e.g. an I/O error for a reader backed by a file or
    /// socket. Readers that can never fail, such as [`StringReader`], use [`Never`].
    type Error: std::fmt::Debug;

    /// Return a new character from the input stream.
    ///
    /// Newlines have to be normalized as described in [Preprocessing the input
    /// stream](https://html.spec.whatwg.org/#preprocessing-the-input-stream), however error
    /// emission is done within the tokenizer.
    fn read_char(&mut self) -> Result<Option<char>, Self::Error>;

    /// Attempt to read an entire string at once, either case-insensitively or not.
    ///
    /// `case_sensitive=false` means that characters of the input stream should be compared while
    /// ignoring ASCII-casing.
    ///
    /// It can be assumed that this function is never called with a string that contains `\r` or
    /// `\n`.
    ///
    /// If the next characters equal to `s`, this function consumes the respective characters from
    /// the input stream and returns `true`. If not, it does nothing and returns `false`.
    fn try_read_string(&mut self, s: &str, case_sensitive: bool) -> Result<bool, Self::Error>;
}

/// An object that can be converted into a [`crate::Reader`].
///
/// For example, any utf8-string can be converted into a `StringReader`, such that
/// `Tokenizer::new("mystring")` and `Tokenizer::new(&String::new("foo"))` work.
pub trait Readable<'a> {
    /// The reader type to which this type should be converted.
    type Reader: Reader + 'a;

    /// Convert self to some sort of reader.
    fn to_reader(self) -> Self::Reader;
}

impl<'a, R: 'a + Reader> Readable<'a> for R {
    type Reader = Self;

    fn to_reader(self) -> Self::Reader {
        self
    }
}

/// A helper struct to seek forwards and backwards in strings. Used by the tokenizer to read HTML
/// from strings.
pub struct StringReader<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> StringReader<'a> {
    fn new(input: &'a str) -> Self {
        StringReader { input, pos: 0 }
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos..)?.chars().next()
    }
}

impl<'a> Reader for StringReader<'a> {
    type Error = Never;

    fn read_char(&mut self) -> Result<Option<char>, Never> {
        let mut r1 = match self.peek_char() {
            Some(x) => x,
            None => {
                self.pos += 1;
                return Ok(None);
            }
        };

        self.pos += r1.len_utf8();

        if r1 == '\r' {
            r1 = '\n';
            let r2 = self.peek_char();
            if r2 == Some('\n') {
                self.pos += r2.map(char::len_utf8).unwrap_or(0);
            }
        }

        Ok(Some(r1))
    }

    fn try_read_string(&mut self, s1: &str, case_sensitive: bool) -> Result<bool, Never> {
        // we do not need to call validate_char here because `s` hopefully does not contain invalid
        // characters

        if let Some(s2) = self.input.get(self.pos..self.pos + s1.len()) {
            if s1 == s2 || (!case_sensitive && s1.eq_ignore_ascii_case(s2)) {
                self.pos += s1.len();
                return Ok(true);
            }
        }

        Ok(false)
    }
}

impl<'a> Readable<'a> for &'a str {
    type Reader = StringReader<'a>;

    fn to_reader(self) -> Self::Reader {
        StringReader::new(self)
    }
}

impl<'a> Readable<'a> for &'a String {
    type Reader = StringReader<'a>;

    fn to_reader(self) -> Self::Reader {
        StringReader::new(self.as_str())
    }
}

/// A reader that pulls characters from any [`std::io::BufRead`], such as an open [`std::fs::File`]
/// or a [`std::io::Stdin`] lock.
///
/// Unlike [`StringReader`], this reader's `Error` is [`std::io::Error`]: reading from an open file
/// or socket can fail in ways a borrowed string never can.
pub struct BufReadReader<R: BufRead> {
    inner: R,
    to_reconsume: Vec<char>,
}

impl<R: BufRead> BufReadReader<R> {
    /// Wrap an existing [`std::io::BufRead`] for use with [`crate::Tokenizer::new`].
    pub fn new(inner: R) -> Self {
        BufReadReader {
            inner,
            to_reconsume: Vec::new(),
        }
    }

    fn read_char_from_inner(&mut self) -> Result<Option<char>, std::io::Error> {
        if let Some(c) = self.to_reconsume.pop() {
            return Ok(Some(c));
        }

        // UTF-8 code points are at most 4 bytes; read one byte at a time and grow the buffer
        // until it decodes, rather than assuming a fixed width up front.
        let mut buf = [0u8; 4];
        let mut len = 0;

        loop {
            let read = {
                let available = match self.inner.fill_buf() {
                    Ok(buf) => buf,
                    Err(e) => return Err(e),
                };
                if available.is_empty() {
                    return if len == 0 {
                        Ok(None)
                    } else {
                        Err(std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            "truncated utf-8 sequence at end of input",
                        ))
                    };
                }
                let n = available.len().min(1);
                buf[len] = available[0];
                len += 1;
                n
            };
            self.inner.consume(read);

            match std::str::from_utf8(&buf[..len]) {
                Ok(s) => return Ok(s.chars().next()),
                Err(e) if e.error_len().is_some() => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "invalid utf-8 in input",
                    ));
                }
                Err(_) => {
                    if len == buf.len() {
                        return Err(std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            "invalid utf-8 in input",
                        ));
                    }
                    // incomplete sequence so far, read another byte
                }
            }
        }
    }
}

impl<R: BufRead> Reader for BufReadReader<R> {
    type Error = std::io::Error;

    fn read_char(&mut self) -> Result<Option<char>, std::io::Error> {
        let mut r1 = match self.read_char_from_inner()? {
            Some(c) => c,
            None => return Ok(None),
        };

        if r1 == '\r' {
            r1 = '\n';
            match self.read_char_from_inner()? {
                Some('\n') => {}
                Some(other) => self.to_reconsume.push(other),
                None => {}
            }
        }

        Ok(Some(r1))
    }

    fn try_read_string(&mut self, s: &str, case_sensitive: bool) -> Result<bool, std::io::Error> {
        debug_assert!(!s.contains(['\r', '\n']));

        let mut consumed = Vec::new();
        for expected in s.chars() {
            match self.read_char()? {
                Some(c) if c == expected => consumed.push(c),
                Some(c)
                    if !case_sensitive
                        && c.to_ascii_lowercase() == expected.to_ascii_lowercase() =>
                {
                    consumed.push(c);
                }
                Some(c) => {
                    self.to_reconsume.push(c);
                    for c in consumed.into_iter().rev() {
                        self.to_reconsume.push(c);
                    }
                    return Ok(false);
                }
                None => {
                    for c in consumed.into_iter().rev() {
                        self.to_reconsume.push(c);
                    }
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_reader_reads_chars() {
        let mut reader = StringReader::new("ab");
        assert_eq!(reader.read_char().unwrap(), Some('a'));
        assert_eq!(reader.read_char().unwrap(), Some('b'));
        assert_eq!(reader.read_char().unwrap(), None);
    }

    #[test]
    fn buf_read_reader_reads_chars() {
        let mut reader = BufReadReader::new("héllo".as_bytes());
        let mut s = String::new();
        while let Some(c) = reader.read_char().unwrap() {
            s.push(c);
        }
        assert_eq!(s, "héllo");
    }

    #[test]
    fn buf_read_reader_try_read_string_is_case_insensitive() {
        let mut reader = BufReadReader::new("DOCTYPE html".as_bytes());
        assert!(reader.try_read_string("doctype", false).unwrap());
    }
}

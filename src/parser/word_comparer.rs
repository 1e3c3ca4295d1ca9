use crate::parser::FilterParser;

/// Case-insensitive keyword or operator matcher at the parser cursor.
#[derive(Debug, Default)]
pub struct WordComparer {
    pub length: usize,
    pub word: Vec<char>,
    whitespace_postfix: bool,
    optional_postfix: Vec<char>,
}

impl WordComparer {
    pub fn new(word: &str) -> Self {
        let word: Vec<char> = word.to_uppercase().chars().collect();
        Self {
            length: word.len(),
            word,
            whitespace_postfix: false,
            optional_postfix: vec![],
        }
    }

    pub fn reach_eof(&self, parser: &FilterParser) -> bool {
        parser.position + self.length >= parser.length
    }

    pub fn is_block_delimiter(ch: char) -> bool {
        ch.is_whitespace()
    }

    pub fn compare(&self, parser: &FilterParser) -> bool {
        let mut position = 0;
        while position < self.length {
            if (parser.position + position) >= parser.length ||
                self.word[position] != parser.text_v[parser.position + position].to_ascii_uppercase() {
                return false;
            }
            position += 1;
        }

        // keywords and operators always need something after them
        if self.reach_eof(parser) {
            return false;
        }

        if !self.whitespace_postfix && self.optional_postfix.is_empty() {
            return true;
        }

        let next = parser.text_v[parser.position + position];

        if self.whitespace_postfix && Self::is_block_delimiter(next) {
            return true;
        }

        self.optional_postfix.contains(&next)
    }

    pub fn with_whitespace_postfix(mut self) -> Self { self.whitespace_postfix = true; self }
    pub fn with_optional_postfix(mut self, value: char) -> Self { self.optional_postfix.push(value); self }
}

//! Command-line tokenizer.
//!
//! Words are separated by spaces. A word that starts with `'` runs to the
//! next `'` and may contain spaces. A trailing standalone `&` asks for a
//! background job and is not part of the argument vector.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLine {
    pub argv: Vec<String>,
    pub background: bool,
}

pub fn parse_line(input: &str) -> ParsedLine {
    let line = input.trim_end_matches(['\n', '\r']);
    let mut argv = Vec::new();
    let mut rest = line.trim_start_matches(' ');

    while !rest.is_empty() {
        let (word, remainder) = if let Some(quoted) = rest.strip_prefix('\'') {
            // an unterminated quote runs to the end of the line
            match quoted.find('\'') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            }
        } else {
            match rest.find(' ') {
                Some(end) => (&rest[..end], &rest[end..]),
                None => (rest, ""),
            }
        };
        argv.push(word.to_string());
        rest = remainder.trim_start_matches(' ');
    }

    let background = argv.last().is_some_and(|last| last == "&");
    if background {
        argv.pop();
    }
    ParsedLine { argv, background }
}

// prompt
// > human collaborator for the naming step, a blocking call per question
use crate::comm::SnRst;
use crate::error::Error;
use std::io::{BufRead, Write};

pub const DEF_SERIES_NAME: &str = "Untitled";

pub trait NamingPrompt {
    /// Picks a series from `known` (already in display order) or takes a new
    /// name. `None` when the user cancels.
    fn ask_series_name(&mut self, known: &[String]) -> SnRst<Option<String>>;

    /// Confirms a part number, pre-filled with `default`. `None` when the
    /// user cancels.
    fn ask_part_number(&mut self, default: u64) -> SnRst<Option<u64>>;
}

//
// console
//

pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        ConsolePrompt { input, output }
    }

    // None on EOF
    fn read_answer(&mut self) -> SnRst<Option<String>> {
        let mut line = String::new();

        let n = self
            .input
            .read_line(&mut line)
            .map_err(|e| Error::IoError(format!("failed to read prompt answer, e={}", e)))?;

        if n == 0 {
            return Ok(None);
        }

        Ok(Some(line.trim().to_string()))
    }

    fn say(&mut self, text: &str) -> SnRst<()> {
        write!(self.output, "{}", text)
            .and_then(|_| self.output.flush())
            .map_err(|e| Error::IoError(format!("failed to write prompt, e={}", e)))
    }
}

impl<R: BufRead, W: Write> NamingPrompt for ConsolePrompt<R, W> {
    fn ask_series_name(&mut self, known: &[String]) -> SnRst<Option<String>> {
        let mut text = String::from("Series Name:\n");
        for (i, name) in known.iter().enumerate() {
            text.push_str(&format!("  [{}] {}\n", i + 1, name));
        }
        text.push_str(&format!("(index or new name, empty for {}) > ", DEF_SERIES_NAME));
        self.say(&text)?;

        let answer = match self.read_answer()? {
            Some(a) => a,
            None => return Ok(None),
        };

        if answer.is_empty() {
            return Ok(Some(DEF_SERIES_NAME.to_string()));
        }

        if let Ok(idx) = answer.parse::<usize>() {
            if idx >= 1 && idx <= known.len() {
                return Ok(Some(known[idx - 1].clone()));
            }
        }

        Ok(Some(answer))
    }

    fn ask_part_number(&mut self, default: u64) -> SnRst<Option<u64>> {
        loop {
            self.say(&format!("Part Number [{}] > ", default))?;

            let answer = match self.read_answer()? {
                Some(a) => a,
                None => return Ok(None),
            };

            if answer.is_empty() {
                return Ok(Some(default));
            }

            match answer.parse::<u64>() {
                Ok(n) => return Ok(Some(n)),
                Err(_) => self.say(&format!("not a part number: {}\n", answer))?,
            }
        }
    }
}

use colored::Colorize;
use std::io::{self, BufRead, Write};

pub const DUPLICATES_WARNING: &str =
    "Running all tests at once might create lots of duplicates. Do you want to continue (y/n): ";

/// Ask a yes/no question until a recognizable answer comes back.
///
/// `y`/`yes` confirm and `n`/`no` decline, case-insensitively. End of input
/// counts as declining.
pub fn confirm<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> io::Result<bool> {
    loop {
        write!(out, "{}", question.yellow())?;
        out.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            writeln!(out)?;
            return decline(out);
        }

        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return decline(out),
            _ => writeln!(out, "{}", "You must answer 'yes'/'y' or 'no'/'n'.".red())?,
        }
    }
}

fn decline<W: Write>(out: &mut W) -> io::Result<bool> {
    writeln!(out, "{}", "Quitting...".red())?;
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ask(answers: &str) -> (bool, String) {
        let mut input = Cursor::new(answers.to_string());
        let mut out = Vec::new();
        let accepted = confirm(&mut input, &mut out, "continue? ").unwrap();
        (accepted, String::from_utf8(out).unwrap())
    }

    #[test]
    fn accepts_yes_variants() {
        assert!(ask("y\n").0);
        assert!(ask("YES\n").0);
        assert!(ask("  Yes  \n").0);
    }

    #[test]
    fn declines_with_message() {
        let (accepted, out) = ask("no\n");
        assert!(!accepted);
        assert!(out.contains("Quitting..."));
    }

    #[test]
    fn asks_again_on_unrecognized_answer() {
        let (accepted, out) = ask("maybe\n\ny\n");
        assert!(accepted);
        assert_eq!(out.matches("You must answer").count(), 2);
        assert_eq!(out.matches("continue? ").count(), 3);
    }

    #[test]
    fn end_of_input_declines() {
        let (accepted, _) = ask("");
        assert!(!accepted);
    }
}

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::Program;

pub const PROGRAM_FILE_PATH: &str = "data/program_file.txt";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// A token that is not exactly two hex digits.
    InvalidToken(String),
    /// A `// JOB` card without a usable priority.
    InvalidJobCard(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::InvalidToken(token) => {
                write!(f, "Invalid program token {:?}: expected two hex digits", token)
            }
            ParseError::InvalidJobCard(card) => write!(f, "Invalid JOB control card: {}", card),
        }
    }
}

impl std::error::Error for ParseError {}

/// Splits program text into its two-digit hex tokens, upper-cased.
pub fn tokenize_program(program: &str) -> Result<Vec<String>, ParseError> {
    program
        .split_whitespace()
        .map(|token| {
            if token.len() == 2 && token.chars().all(|c| c.is_ascii_hexdigit()) {
                Ok(token.to_ascii_uppercase())
            } else {
                Err(ParseError::InvalidToken(token.to_string()))
            }
        })
        .collect()
}

pub fn parse_program(program: &str) -> Result<Vec<u8>, ParseError> {
    tokenize_program(program)?
        .iter()
        .map(|token| u8::from_str_radix(token, 16).map_err(|_| ParseError::InvalidToken(token.clone())))
        .collect()
}

/// Renders bytes the way the display collaborator shows them.
pub fn format_program(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{:02X}", byte))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reads a program file made of `// JOB <priority>` cards, hex byte lines
/// and `// END` cards.
pub fn load_program_file<P: AsRef<Path>>(path: P) -> std::io::Result<Vec<Program>> {
    let file = File::open(path)?;
    read_programs(BufReader::new(file))
}

pub fn read_programs<R: BufRead>(reader: R) -> std::io::Result<Vec<Program>> {
    let mut programs = Vec::new();
    let mut text = String::new();
    let mut priority = None;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();

        if let Some(card) = line.strip_prefix("// JOB") {
            priority = parse_job(card).map_err(invalid_data)?;
            text.clear();
        } else if line.starts_with("// END") {
            let bytes = parse_program(&text).map_err(invalid_data)?;
            programs.push(Program::new(text.trim().to_string(), bytes, priority));

            text.clear();
            priority = None;
        } else if !line.is_empty() && !line.starts_with("//") {
            text.push_str(line);
            text.push(' ');
        }
    }

    Ok(programs)
}

/// Parses the JOB control card. An empty card means default priority.
fn parse_job(control_card: &str) -> Result<Option<u32>, ParseError> {
    match control_card.split_ascii_whitespace().next() {
        None => Ok(None),
        Some(value) => u32::from_str_radix(value, 16)
            .map(Some)
            .map_err(|_| ParseError::InvalidJobCard(control_card.trim().to_string())),
    }
}

fn invalid_data(err: ParseError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_valid_program() {
        let program = "A9 A9 A2 01 EC 13 00 AC 0B 00 8D 14 00 EE 0B 00
             D0 F5 00 00";
        let tokens = tokenize_program(program).unwrap();
        assert_eq!(
            tokens,
            vec![
                "A9", "A9", "A2", "01", "EC", "13", "00", "AC", "0B", "00", "8D", "14", "00", "EE", "0B",
                "00", "D0", "F5", "00", "00"
            ]
        );
    }

    #[test]
    fn test_parse_program_accepts_lower_case() {
        assert_eq!(parse_program("a9 0f\t00").unwrap(), vec![0xA9, 0x0F, 0x00]);
    }

    #[test]
    fn test_parse_program_rejects_malformed_tokens() {
        assert_eq!(
            parse_program("A9 1"),
            Err(ParseError::InvalidToken("1".to_string()))
        );
        assert_eq!(
            parse_program("A9 G1"),
            Err(ParseError::InvalidToken("G1".to_string()))
        );
        assert_eq!(
            parse_program("A901"),
            Err(ParseError::InvalidToken("A901".to_string()))
        );
    }

    #[test]
    fn test_format_program() {
        assert_eq!(format_program(&[0xA9, 0x01, 0x00]), "A9 01 00");
    }

    #[test]
    fn test_parse_job_line() {
        assert_eq!(parse_job(" 1A"), Ok(Some(26)));
        assert_eq!(parse_job(""), Ok(None));
    }

    #[test]
    fn test_parse_job_not_hex() {
        assert!(matches!(parse_job(" NOT HEX"), Err(ParseError::InvalidJobCard(_))));
    }

    #[test]
    fn test_read_programs() {
        let file = "// JOB 2\nA9 01\n00\n// END\n// JOB\nEA 00\n// END\n";
        let programs = read_programs(file.as_bytes()).unwrap();

        assert_eq!(programs.len(), 2);
        assert_eq!(programs[0].priority, Some(2));
        assert_eq!(programs[0].bytes, vec![0xA9, 0x01, 0x00]);
        assert_eq!(programs[1].priority, None);
        assert_eq!(programs[1].text, "EA 00");
    }

    #[test]
    fn test_read_programs_rejects_bad_bytes() {
        let file = "// JOB 1\nA9 XYZ\n// END\n";
        let err = read_programs(file.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}

/// The text output collaborator the kernel writes to.
pub trait Console {
    fn put_text(&mut self, text: &str);

    /// Shows a system message on its own line, then restores whatever was
    /// on the input line.
    fn put_system_text(&mut self, text: &str);

    fn advance_line(&mut self);

    fn clear_screen(&mut self);
}

/// Keeps every completed line in memory, optionally echoing them to stdout.
#[derive(Default)]
pub struct BufferedConsole {
    lines: Vec<String>,
    current_line: String,
    echo: bool,
}

impl BufferedConsole {
    pub fn new() -> BufferedConsole {
        BufferedConsole::default()
    }

    pub fn echoing() -> BufferedConsole {
        BufferedConsole {
            echo: true,
            ..BufferedConsole::default()
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn current_line(&self) -> &str {
        &self.current_line
    }

    /// Completed lines plus the in-progress one, joined by newlines.
    pub fn output(&self) -> String {
        let mut output = self.lines.join("\n");
        if !self.current_line.is_empty() {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&self.current_line);
        }
        output
    }

    fn push_line(&mut self, line: String) {
        if self.echo {
            println!("{}", line);
        }
        self.lines.push(line);
    }
}

impl Console for BufferedConsole {
    fn put_text(&mut self, text: &str) {
        let mut parts = text.split('\n');
        if let Some(first) = parts.next() {
            self.current_line.push_str(first);
        }
        for part in parts {
            self.advance_line();
            self.current_line.push_str(part);
        }
    }

    fn put_system_text(&mut self, text: &str) {
        let pending = std::mem::take(&mut self.current_line);
        self.push_line(text.to_string());
        self.current_line = pending;
    }

    fn advance_line(&mut self) {
        let line = std::mem::take(&mut self.current_line);
        self.push_line(line);
    }

    fn clear_screen(&mut self) {
        self.lines.clear();
        self.current_line.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_put_text_and_advance_line() {
        let mut console = BufferedConsole::new();
        console.put_text("hello ");
        console.put_text("world");
        console.advance_line();
        console.put_text("a\nb");

        assert_eq!(console.lines(), &["hello world".to_string(), "a".to_string()]);
        assert_eq!(console.current_line(), "b");
        assert_eq!(console.output(), "hello world\na\nb");
    }

    #[test]
    fn test_console_put_system_text_restores_input_line() {
        let mut console = BufferedConsole::new();
        console.put_text("lo");
        console.put_system_text("Process created with PID 0");

        assert_eq!(console.lines(), &["Process created with PID 0".to_string()]);
        assert_eq!(console.current_line(), "lo");
    }

    #[test]
    fn test_console_clear_screen() {
        let mut console = BufferedConsole::new();
        console.put_text("x");
        console.advance_line();
        console.clear_screen();
        assert_eq!(console.output(), "");
    }
}

/// A program as handed to the kernel: its source text, the parsed bytes and
/// an optional priority.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    pub text: String,
    pub bytes: Vec<u8>,
    pub priority: Option<u32>,
}

impl Program {
    pub fn new(text: String, bytes: Vec<u8>, priority: Option<u32>) -> Program {
        Program { text, bytes, priority }
    }
}

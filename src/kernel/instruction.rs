use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Break,
    LoadAccConstant,
    LoadAccMemory,
    StoreAcc,
    AddWithCarry,
    LoadXConstant,
    LoadXMemory,
    LoadYConstant,
    LoadYMemory,
    NoOperation,
    CompareX,
    BranchNotEqual,
    Increment,
    SystemCall,
}

#[derive(Debug, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub code: u8,
    pub mnemonic: &'static str,
    pub arg_count: usize,
    pub operation: Operation,
}

const fn op(code: u8, mnemonic: &'static str, arg_count: usize, operation: Operation) -> OpcodeInfo {
    OpcodeInfo {
        code,
        mnemonic,
        arg_count,
        operation,
    }
}

pub static OPCODE_TABLE: [OpcodeInfo; 14] = [
    op(0x00, "BRK", 0, Operation::Break),
    op(0xA9, "LDA", 1, Operation::LoadAccConstant),
    op(0xAD, "LDA", 2, Operation::LoadAccMemory),
    op(0x8D, "STA", 2, Operation::StoreAcc),
    op(0x6D, "ADC", 2, Operation::AddWithCarry),
    op(0xA2, "LDX", 1, Operation::LoadXConstant),
    op(0xAE, "LDX", 2, Operation::LoadXMemory),
    op(0xA0, "LDY", 1, Operation::LoadYConstant),
    op(0xAC, "LDY", 2, Operation::LoadYMemory),
    op(0xEA, "NOP", 0, Operation::NoOperation),
    op(0xEC, "CPX", 2, Operation::CompareX),
    op(0xD0, "BNE", 1, Operation::BranchNotEqual),
    op(0xEE, "INC", 2, Operation::Increment),
    op(0xFF, "SYS", 0, Operation::SystemCall),
];

pub fn lookup(code: u8) -> Option<&'static OpcodeInfo> {
    OPCODE_TABLE.iter().find(|info| info.code == code)
}

pub struct DecodedInstruction {
    pub info: &'static OpcodeInfo,
    args: [u8; 2],
}

impl DecodedInstruction {
    pub fn new(info: &'static OpcodeInfo) -> DecodedInstruction {
        DecodedInstruction { info, args: [0; 2] }
    }

    pub fn set_arg(&mut self, idx: usize, value: u8) {
        self.args[idx] = value;
    }

    pub fn constant(&self) -> u8 {
        self.args[0]
    }

    /// Two-byte operands are little-endian.
    pub fn address(&self) -> usize {
        u16::from_le_bytes(self.args) as usize
    }
}

impl fmt::Display for DecodedInstruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02X} {}", self.info.code, self.info.mnemonic)?;
        match self.info.arg_count {
            1 => write!(f, " #${:02X}", self.constant()),
            2 => write!(f, " ${:04X}", self.address()),
            _ => Ok(()),
        }
    }
}

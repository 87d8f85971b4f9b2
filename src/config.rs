//! Emulator configuration.

/// How to resolve behaviors where the documented architecture and shipping
/// silicon disagree.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum QuirkMode {
    /// Follow observed hardware, quirks included.
    #[default]
    HardwareCompatible,
    /// Follow the documented / IEEE behavior.
    Strict,
}

/// Operand-size attribute of the surrounding code segment; selects the 14- or
/// 28-byte environment image layout.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum OperandSize {
    Bits16,
    #[default]
    Bits32,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FpuConfig {
    pub quirk_mode: QuirkMode,
    pub operand_size: OperandSize,
}

/// Options for writing values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecOptions {
    /// Always use the generic writer, even when a compiled writer is available.
    pub disable_compiled_writer: bool,
}

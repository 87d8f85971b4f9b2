use flexi_logger::{
    Cleanup, Criterion, Duplicate, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming,
    WriteMode, detailed_format,
};

/// Initialize file logging for a host embedding the unit.
///
/// `spec` is a `flexi_logger` level spec such as `"info"` or
/// `"x87_emulator=trace"`. Keep the returned [`LoggerHandle`] alive to the
/// very end of the program so buffered log lines are flushed out.
#[must_use = "dropping the handle stops the logger"]
pub fn init(spec: &str) -> Result<LoggerHandle, FlexiLoggerError> {
    Logger::try_with_str(spec)?
        .log_to_file(
            FileSpec::default()
                .directory("logs")
                .basename("x87")
                .suffix("log"),
        )
        .rotate(
            Criterion::Size(10_000_000), // 10 MB
            Naming::Numbers,
            Cleanup::KeepLogFiles(3),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .duplicate_to_stderr(Duplicate::Warn)
        .format_for_files(detailed_format)
        .start()
}

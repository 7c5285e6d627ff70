//! Basic logger usage example
//!
//! Demonstrates file and console logging, scoped level overrides, exception
//! capture and call instrumentation.
//!
//! Run with: cargo run --example basic_usage

use master_logger::prelude::*;
use master_logger::{critical, info};

fn parse_port(raw: &str) -> std::result::Result<u16, std::num::ParseIntError> {
    raw.trim().parse()
}

fn main() -> Result<()> {
    println!("=== Master Logger - Basic Usage Example ===\n");

    let logger = MasterLogger::with_level("logs/basic_usage.log", Severity::Info)?;
    logger.setup_colored_console_logging(ConsoleLoggingConfig::new().colors(ColorMode::Always))?;

    println!("1. Logging at different levels (DEBUG is below the threshold):");
    logger.debug("This is a debug message (hidden)");
    logger.info("This is an info message");
    logger.warning("This is a warning message");
    logger.error("This is an error message");
    critical!(logger, "Disk {} is {}% full", "/var", 97);

    println!("\n2. Temporarily lowering the threshold:");
    {
        let _debug = logger.temporary_log_level("DEBUG")?;
        logger.debug("Debug message (visible inside the override)");
    }
    logger.debug("Debug message (hidden again)");

    println!("\n3. Named loggers share the same sinks:");
    let db = logger.get_logger("db");
    info!(db, "Connected to {} in {} ms", "primary", 12);

    println!("\n4. Exceptions:");
    if let Err(e) = parse_port("80a") {
        logger.log_exception("Invalid port in configuration", &e);
    }
    logger.log_exception_at(Severity::Warning, "Nothing to report", None);

    println!("\n5. Call instrumentation:");
    let parse = logger.log_function_call().wrap("parse_port", parse_port);
    let _ = parse.try_call("8080");
    let _ = parse.try_call("eighty");

    logger.flush()?;
    println!("\nLog file written to {}", logger.file_path().display());
    println!("\n=== Example completed successfully! ===");

    Ok(())
}

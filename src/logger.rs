use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};

/// Initializes the logging system.
///
/// Uses `log4rs.yaml` when present; otherwise falls back to a console
/// appender at info level. Call once at the beginning of execution.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    if std::path::Path::new("log4rs.yaml").exists() {
        log4rs::init_file("log4rs.yaml", Default::default())?;
        return Ok(());
    }
    let stdout = ConsoleAppender::builder().build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))?;
    log4rs::init_config(config)?;
    Ok(())
}

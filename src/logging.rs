use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use crate::config::General;
use crate::errors::LoggingError;

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {l:<5} {t} - {m}{n}";

/// Sets up log4rs with a file appender and, if configured, a console appender
///
/// # Arguments
///
/// * 'general' - general section of the configuration
pub fn setup_logger(general: &General) -> Result<(), LoggingError> {
    let file = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build(&general.log_path)
        .map_err(|e| LoggingError(format!("log file {}: {}", general.log_path, e)))?;

    let mut builder = Config::builder()
        .appender(Appender::builder().build("file", Box::new(file)));
    let mut root = Root::builder().appender("file");

    if general.log_to_stdout {
        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build();
        builder = builder.appender(Appender::builder().build("stdout", Box::new(stdout)));
        root = root.appender("stdout");
    }

    let config = builder
        .build(root.build(general.log_level))
        .map_err(|e| LoggingError(e.to_string()))?;

    log4rs::init_config(config).map_err(|e| LoggingError(e.to_string()))?;

    Ok(())
}

use std::{
    error::Error,
    fmt,
    fs::{read_dir, remove_file, rename, File},
    io,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Mutex as StdMutex,
    thread,
};

use flate2::{write::GzEncoder, Compression};

use log4rs::{
    append::{
        console::ConsoleAppender,
        rolling_file::{
            policy::compound::{roll::Roll, trigger::Trigger, CompoundPolicy},
            LogFile,
            RollingFileAppender,
        },
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::{Filter, Response},
};

use log::*;

use chrono::prelude::*;

use serde::{Deserialize, Serialize};

const FILE_SIZE_LIMIT: u64 = 50_000_000;
const PATTERN: &str = "[{d(%H:%M:%S)} {l}]: {m}\n";

/// Logging settings, usually read as part of the library configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// The maximum level recorded, such as `"info"` or `"trace"`.
    pub level: String,
    /// The directory rolling log files are written to. No log files are written if this is
    /// `None`.
    pub directory: Option<PathBuf>,
}

impl LogConfig {
    /// Parses the configured level, falling back to `info` for unrecognized names.
    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(&self.level).unwrap_or(LevelFilter::Info)
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            #[cfg(debug_assertions)]
            level: "debug".to_owned(),
            #[cfg(not(debug_assertions))]
            level: "info".to_owned(),
            directory: Some(PathBuf::from("logs")),
        }
    }
}

/// Configures the log4rs crate to replicate the logging style of official minecraft servers.
///
/// Debug and trace records are only accepted from modules whose path starts with
/// `crate_filter`. Messages are in the form `[HH:MM:SS Level]: message`.
///
/// If a log directory is configured, logs will be recorded there in the form
/// `yyyy-mm-dd-#.log.gz`, rolled over when the file grows too large or a new day starts.
pub fn init_logger(crate_filter: &str, config: &LogConfig) -> Result<(), Box<dyn Error>> {
    let console = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();

    let mut builder = Config::builder().appender(
        Appender::builder()
            .filter(Box::new(CrateFilter::new(crate_filter)))
            .build("console", Box::new(console)),
    );
    let mut root = Root::builder().appender("console");

    if let Some(directory) = &config.directory {
        let logfile = RollingFileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build(
                directory.join("latest.log"),
                Box::new(CompoundPolicy::new(
                    Box::new(CustomLogTrigger::new(FILE_SIZE_LIMIT)),
                    Box::new(CustomLogRoller::new(directory)),
                )),
            )?;

        builder = builder.appender(
            Appender::builder()
                .filter(Box::new(CrateFilter::new(crate_filter)))
                .build("logfile", Box::new(logfile)),
        );
        root = root.appender("logfile");
    }

    let config = builder.build(root.build(config.level_filter()))?;
    log4rs::init_config(config)?;

    Ok(())
}

/// This should be called directly before the main process exits. This function simply compresses
/// the current log file in the given log directory.
pub fn cleanup(directory: &Path) {
    // There's no reason to handle an error here
    let _ = CustomLogRoller::new(directory).roll_threaded(&directory.join("latest.log"), false);
}

// Only allow debug logging from our crate
struct CrateFilter {
    filter: String,
}

impl CrateFilter {
    pub fn new(filter: &str) -> Self {
        CrateFilter {
            filter: filter.to_owned(),
        }
    }

    fn accepts(&self, level: Level, module_path: Option<&str>) -> bool {
        if level != Level::Debug && level != Level::Trace {
            return true;
        }

        match module_path {
            Some(path) => path.starts_with(&self.filter),
            None => false,
        }
    }
}

impl Filter for CrateFilter {
    fn filter(&self, record: &Record) -> Response {
        if self.accepts(record.level(), record.module_path()) {
            Response::Neutral
        } else {
            Response::Reject
        }
    }
}

impl fmt::Debug for CrateFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "CrateFilter({})", self.filter)
    }
}

// Custom implementation for the rollover trigger, activates when the log file gets too large or a
// new day starts
struct CustomLogTrigger {
    last_day: StdMutex<u32>,
    max_size: u64,
}

impl CustomLogTrigger {
    pub fn new(max_size: u64) -> Self {
        CustomLogTrigger {
            last_day: StdMutex::new(Local::now().ordinal()),
            max_size,
        }
    }
}

impl fmt::Debug for CustomLogTrigger {
    fn fmt(&self, _f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        Ok(())
    }
}

impl Trigger for CustomLogTrigger {
    fn trigger(&self, file: &LogFile) -> Result<bool, Box<dyn Error + Sync + Send>> {
        if let Ok(mut guard) = self.last_day.lock() {
            let current_day = Local::now().ordinal();
            if current_day != *guard {
                *guard = current_day;
                return Ok(true);
            }
        }

        Ok(file.len_estimate() > self.max_size)
    }
}

struct CustomLogRoller {
    directory: PathBuf,
    name_info: StdMutex<(u32, u32)>, // current day, log count for today
}

impl CustomLogRoller {
    pub fn new(directory: &Path) -> Self {
        let mut max_index = 0;

        if let Ok(paths) = read_dir(directory) {
            let today = format!("{}", Local::now().format("%Y-%m-%d"));

            // Find the logs that match today's date and determine the highest index
            for path in paths
                .flatten()
                .flat_map(|entry| entry.file_name().into_string())
                .filter(|name| name.starts_with(&today))
            {
                if let Some(index) = index_from_path(&path) {
                    if index > max_index {
                        max_index = index;
                    }
                }
            }
        }

        CustomLogRoller {
            directory: directory.to_owned(),
            name_info: StdMutex::new((Local::now().ordinal(), max_index)),
        }
    }

    pub fn roll_threaded(
        &self,
        file: &Path,
        threaded: bool,
    ) -> Result<(), Box<dyn Error + Sync + Send>>
    {
        let mut guard = self
            .name_info
            .lock()
            .map_err(|_| "Log roller mutex poisoned")?;

        // Check to make sure the log name info is still accurate
        let local_datetime = Local::now();
        if local_datetime.ordinal() != guard.0 {
            guard.0 = local_datetime.ordinal();
            guard.1 = 1;
        } else {
            guard.1 += 1;
        }

        // Rename the file in case it's large and will take a while to compress
        let log = self.directory.join("latest-tmp.log");
        rename(file, &log)?;

        let output = self.directory.join(format!(
            "{}-{}.log.gz",
            local_datetime.format("%Y-%m-%d"),
            guard.1
        ));

        if threaded {
            thread::spawn(move || {
                try_compress_log(&log, &output);
            });
        } else {
            try_compress_log(&log, &output);
        }

        Ok(())
    }
}

impl Roll for CustomLogRoller {
    fn roll(&self, file: &Path) -> Result<(), Box<dyn Error + Sync + Send>> {
        self.roll_threaded(file, true)
    }
}

impl fmt::Debug for CustomLogRoller {
    fn fmt(&self, _f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        Ok(())
    }
}

// Logs are named {date}-{index}.log.gz
fn index_from_path(path: &str) -> Option<u32> {
    let dash_index = path.rfind('-')?;
    let dot_index = path.find('.')?;
    if dash_index + 1 < dot_index {
        path[dash_index + 1 .. dot_index].parse::<u32>().ok()
    } else {
        None
    }
}

// Attempts compress_log and prints an error if it fails
fn try_compress_log(input_path: &Path, output_path: &Path) {
    if compress_log(input_path, output_path).is_err() {
        error!("Failed to compress log file");
    }
}

// Takes the source file and compresses it, writing to the output path. Removes the source when
// done.
fn compress_log(input_path: &Path, output_path: &Path) -> Result<(), io::Error> {
    let mut input = File::open(input_path)?;
    let mut output = GzEncoder::new(File::create(output_path)?, Compression::default());
    io::copy(&mut input, &mut output)?;
    drop(output.finish()?);
    drop(input); // This needs to occur before file deletion on some OS's
    remove_file(input_path)
}

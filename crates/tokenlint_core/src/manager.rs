//! Work distribution across files.
//!
//! The [`Manager`] expands the command line arguments into one
//! [`FileChecker`] per file and runs them, either one after the other or on a
//! pool of worker threads. Parallel results are collected completely and then
//! replayed in file order, so the output does not depend on scheduling.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tokenlint_plugin::{CheckRegistry, Violation};
use tokenlint_source::ProcessorOptions;
use tracing::{debug, info, warn};

use crate::checker::FileChecker;
use crate::config::LinterConfig;
use crate::error::LinterError;
use crate::file_finder::{FileFinder, is_using_stdin};
use crate::style_guide::StyleGuide;

/// How long a worker may take to stop during forced cleanup.
const FORCE_CLEANUP_TIMEOUT: Duration = Duration::from_millis(200);

/// OS errors after which a failed parallel run is retried serially.
#[cfg(unix)]
const SERIAL_RETRY_ERRNOS: [i32; 2] = [
    // Resource exhaustion while setting up the pool.
    libc::ENOSPC,
    // Thread creation refused by the system.
    libc::EAGAIN,
];

/// Messages on the work queue.
#[derive(Debug)]
pub enum WorkMessage {
    /// A file to check.
    Check(Box<FileChecker>),
    /// No more work follows.
    EndOfWork,
}

/// Messages on the results queue.
#[derive(Debug)]
pub enum ResultMessage {
    /// The findings of one file.
    Batch {
        filename: String,
        results: Vec<Violation>,
    },
    /// A worker has stopped.
    Done,
}

/// Facts about the process that decide whether parallel checking is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionEnvironment {
    /// Worker threads can be spawned at all.
    pub parallel_supported: bool,
    /// The platform is one the worker pool is used on.
    pub platform_compatible: bool,
    /// Standard input is among the files.
    pub using_stdin: bool,
    /// The run is restricted to a diff.
    pub diff: bool,
    /// Number of available execution units, when known.
    pub available_parallelism: Option<usize>,
}

impl ExecutionEnvironment {
    /// Inspects the current process.
    pub fn detect(arguments: &[String], diff: bool) -> Self {
        Self {
            parallel_supported: cfg!(not(target_family = "wasm")),
            platform_compatible: cfg!(not(windows)),
            using_stdin: is_using_stdin(arguments),
            diff,
            available_parallelism: thread::available_parallelism().ok().map(|n| n.get()),
        }
    }
}

/// Decides how many jobs to run with.
///
/// Returns 0 for a serial run. Every reason to reject parallelism is logged
/// as a warning.
pub fn determine_worker_count(jobs: &str, environment: &ExecutionEnvironment) -> usize {
    if !environment.parallel_supported {
        warn!("Worker threads are not available. Ignoring --jobs arguments.");
        return 0;
    }

    if !environment.platform_compatible {
        warn!("The --jobs option is not available on this platform. Ignoring --jobs arguments.");
        return 0;
    }

    if environment.using_stdin {
        warn!(
            "The --jobs option is not compatible with supplying input using - . \
             Ignoring --jobs arguments."
        );
        return 0;
    }

    if environment.diff {
        warn!(
            "The --diff option was specified with --jobs but they are not compatible. \
             Ignoring --jobs arguments."
        );
        return 0;
    }

    if jobs == "auto" {
        return environment.available_parallelism.unwrap_or(0);
    }

    let is_number = !jobs.is_empty() && jobs.chars().all(|c| c.is_ascii_digit());
    match jobs.parse::<usize>() {
        Ok(0) if is_number => {
            warn!("The --jobs option was set to 0. Running checks serially.");
            0
        }
        Ok(count) if is_number => count,
        _ => {
            warn!(
                "\"{}\" is not a valid parameter to --jobs. Must be one of \"auto\" or a \
                 numerical value, e.g., 4.",
                jobs
            );
            0
        }
    }
}

/// Reports whether a failed parallel run may be retried serially.
pub fn is_serial_retry(err: &io::Error) -> bool {
    match err.raw_os_error() {
        Some(code) => is_retry_errno(code),
        None => matches!(
            err.kind(),
            io::ErrorKind::StorageFull | io::ErrorKind::WouldBlock
        ),
    }
}

#[cfg(unix)]
fn is_retry_errno(code: i32) -> bool {
    SERIAL_RETRY_ERRNOS.contains(&code)
}

#[cfg(not(unix))]
fn is_retry_errno(code: i32) -> bool {
    matches!(
        io::Error::from_raw_os_error(code).kind(),
        io::ErrorKind::StorageFull | io::ErrorKind::WouldBlock
    )
}

type Task = Box<dyn FnOnce() + Send + 'static>;
type ThreadSpawner = fn(String, Task) -> io::Result<JoinHandle<()>>;

fn spawn_named(name: String, task: Task) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name(name).spawn(task)
}

/// Runs the checks of every file and hands the findings to the style guide.
pub struct Manager {
    style_guide: Arc<Mutex<StyleGuide>>,
    registry: Arc<CheckRegistry>,
    processor_options: ProcessorOptions,
    arguments: Vec<String>,
    file_finder: FileFinder,
    jobs: usize,
    checkers: Vec<FileChecker>,
    filenames: Vec<String>,
    ran_parallel: bool,
    spawner: ThreadSpawner,
}

impl Manager {
    /// Creates a manager for the current process.
    pub fn new(
        style_guide: Arc<Mutex<StyleGuide>>,
        arguments: Vec<String>,
        registry: Arc<CheckRegistry>,
        config: &LinterConfig,
    ) -> Result<Self, LinterError> {
        let environment = ExecutionEnvironment::detect(&arguments, config.diff);
        Self::with_environment(style_guide, arguments, registry, config, &environment)
    }

    /// Creates a manager for an explicit execution environment.
    pub fn with_environment(
        style_guide: Arc<Mutex<StyleGuide>>,
        arguments: Vec<String>,
        registry: Arc<CheckRegistry>,
        config: &LinterConfig,
        environment: &ExecutionEnvironment,
    ) -> Result<Self, LinterError> {
        let file_finder = FileFinder::new(&config.exclude, &config.filename)?;
        let jobs = determine_worker_count(&config.jobs, environment);

        Ok(Self {
            style_guide,
            registry,
            processor_options: config.processor_options(),
            arguments,
            file_finder,
            jobs,
            checkers: Vec::new(),
            filenames: Vec::new(),
            ran_parallel: false,
            spawner: spawn_named,
        })
    }

    /// Number of jobs the run uses; 0 and 1 mean serial.
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Files being checked, in report order.
    pub fn filenames(&self) -> &[String] {
        &self.filenames
    }

    /// Whether the last run used the worker pool.
    pub fn ran_parallel(&self) -> bool {
        self.ran_parallel
    }

    /// Creates a checker for every file named by the arguments.
    pub fn start(&mut self) {
        info!("Making checkers");
        self.make_checkers();
    }

    fn make_checkers(&mut self) {
        let files = self.file_finder.discover_files(&self.arguments);
        self.checkers = files
            .iter()
            .map(|filename| {
                FileChecker::new(
                    filename.as_str(),
                    Arc::clone(&self.registry),
                    &self.processor_options,
                )
            })
            .collect();
        self.filenames = files;
    }

    /// Runs all checkers.
    ///
    /// More than one job uses the worker pool. If the pool cannot be set up
    /// because of a transient OS error, the run falls back to serial.
    pub fn run(&mut self) -> Result<(), LinterError> {
        if self.jobs > 1 {
            self.run_with_fallback(Self::run_parallel)
        } else {
            self.run_serial();
            Ok(())
        }
    }

    fn run_with_fallback(
        &mut self,
        attempt: impl FnOnce(&mut Self) -> Result<(), LinterError>,
    ) -> Result<(), LinterError> {
        match attempt(self) {
            Err(LinterError::Io(err)) if is_serial_retry(&err) => {
                warn!("Running in serial after OS error: {}", err);
                self.ran_parallel = false;
                self.run_serial();
                Ok(())
            }
            other => other,
        }
    }

    fn run_serial(&mut self) {
        for checker in &mut self.checkers {
            checker.run_checks(None);
        }
    }

    fn run_parallel(&mut self) -> Result<(), LinterError> {
        let workers = self.jobs.saturating_sub(1).max(1);
        let (work_tx, work_rx) = crossbeam_channel::unbounded::<WorkMessage>();
        let (results_tx, results_rx) = crossbeam_channel::unbounded::<ResultMessage>();

        info!("Starting {} worker threads", workers);
        let mut handles = Vec::with_capacity(workers + 1);
        for index in 0..workers {
            let worker_rx = work_rx.clone();
            let worker_tx = results_tx.clone();
            let task: Task = Box::new(move || run_checks_from_queue(&worker_rx, &worker_tx));
            match (self.spawner)(format!("tklint-worker-{index}"), task) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    force_cleanup(handles, &work_tx, &work_rx, &results_rx);
                    return Err(err.into());
                }
            }
        }
        // Workers hold the only senders from here on.
        drop(results_tx);

        let reporter_rx = results_rx.clone();
        let filenames = self.filenames.clone();
        let style_guide = Arc::clone(&self.style_guide);
        let task: Task = Box::new(move || {
            report_after_parallel(&reporter_rx, &filenames, workers, &style_guide)
        });
        let reporter = match (self.spawner)("tklint-reporter".to_string(), task) {
            Ok(handle) => handle,
            Err(err) => {
                force_cleanup(handles, &work_tx, &work_rx, &results_rx);
                return Err(err.into());
            }
        };
        info!("Started thread to report errors");
        self.ran_parallel = true;

        info!("Populating work queue");
        for checker in self.checkers.drain(..) {
            if work_tx.send(WorkMessage::Check(Box::new(checker))).is_err() {
                break;
            }
        }
        for _ in 0..workers {
            let _ = work_tx.send(WorkMessage::EndOfWork);
        }

        let mut failure = None;
        for handle in handles {
            if handle.join().is_err() {
                failure.get_or_insert_with(|| LinterError::internal("worker thread panicked"));
            }
        }
        if reporter.join().is_err() {
            failure.get_or_insert_with(|| LinterError::internal("reporter thread panicked"));
        }
        failure.map_or(Ok(()), Err)
    }

    /// Hands the findings of a serial run to the style guide.
    ///
    /// Files are reported in order, and the findings of each file sorted by
    /// position. A parallel run has already reported everything.
    pub fn report(&mut self) {
        if self.ran_parallel {
            return;
        }

        let mut style_guide = self.style_guide.lock();
        for checker in &mut self.checkers {
            let mut results = checker.take_results();
            results.sort_by_key(Violation::sort_key);
            for violation in results {
                style_guide.handle_error(violation);
            }
        }
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("arguments", &self.arguments)
            .field("jobs", &self.jobs)
            .field("filenames", &self.filenames)
            .field("ran_parallel", &self.ran_parallel)
            .finish_non_exhaustive()
    }
}

/// Sends `Done` when a worker stops, also when it unwinds.
struct DoneGuard<'a>(&'a Sender<ResultMessage>);

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        let _ = self.0.send(ResultMessage::Done);
    }
}

fn run_checks_from_queue(work: &Receiver<WorkMessage>, results: &Sender<ResultMessage>) {
    let _done = DoneGuard(results);
    info!("Running checks in parallel");
    for message in work.iter() {
        match message {
            WorkMessage::Check(mut checker) => {
                debug!("Running checker for file \"{}\"", checker.filename());
                checker.run_checks(Some(results));
            }
            WorkMessage::EndOfWork => break,
        }
    }
}

fn report_after_parallel(
    results: &Receiver<ResultMessage>,
    filenames: &[String],
    workers: usize,
    style_guide: &Mutex<StyleGuide>,
) {
    let mut final_results: HashMap<String, Vec<Violation>> = HashMap::new();
    let mut seen_done = 0;
    info!("Retrieving results");
    while seen_done < workers {
        match results.recv() {
            Ok(ResultMessage::Batch { filename, results }) => {
                if final_results.insert(filename.clone(), results).is_some() {
                    debug!("Received results for \"{}\" more than once", filename);
                }
            }
            Ok(ResultMessage::Done) => seen_done += 1,
            Err(_) => break,
        }
    }

    let mut style_guide = style_guide.lock();
    for filename in filenames {
        let mut results = final_results.get(filename).cloned().unwrap_or_default();
        results.sort_by_key(Violation::sort_key);
        for violation in results {
            style_guide.handle_error(violation);
        }
    }
}

/// Stops whatever was started of the pool without waiting indefinitely.
fn force_cleanup(
    handles: Vec<JoinHandle<()>>,
    work_tx: &Sender<WorkMessage>,
    work_rx: &Receiver<WorkMessage>,
    results_rx: &Receiver<ResultMessage>,
) {
    while work_rx.try_recv().is_ok() {}
    for _ in &handles {
        let _ = work_tx.send(WorkMessage::EndOfWork);
    }

    for handle in handles {
        let deadline = Instant::now() + FORCE_CLEANUP_TIMEOUT;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if handle.is_finished() {
            let _ = handle.join();
        } else {
            warn!(
                "Worker {} did not stop in time",
                handle.thread().name().unwrap_or("<unnamed>")
            );
        }
    }

    while results_rx.try_recv().is_ok() {}
}

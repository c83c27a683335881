//! Scripted parsing engines

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use parking_lot::Mutex;
use tu_tracker::{EngineError, EngineOutput, ParsingEngine, TranslationUnit, UpdateInput};

/// Engine whose dependency lists and failures are set by the test.
#[derive(Default)]
pub struct ScriptedEngine {
    dependencies: Mutex<HashMap<PathBuf, Vec<PathBuf>>>,
    missing: Mutex<HashSet<PathBuf>>,
    failing: Mutex<HashSet<PathBuf>>,
    analyses: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_dependencies(&self, file: &Path, dependencies: &[&Path]) {
        self.dependencies.lock().insert(
            file.to_path_buf(),
            dependencies.iter().map(|path| path.to_path_buf()).collect(),
        );
    }

    pub fn set_missing(&self, file: &Path, missing: bool) {
        let mut set = self.missing.lock();
        if missing {
            set.insert(file.to_path_buf());
        } else {
            set.remove(file);
        }
    }

    pub fn set_failing(&self, file: &Path, failing: bool) {
        let mut set = self.failing.lock();
        if failing {
            set.insert(file.to_path_buf());
        } else {
            set.remove(file);
        }
    }

    pub fn analyses(&self) -> usize {
        self.analyses.load(Ordering::SeqCst)
    }
}

impl ParsingEngine for ScriptedEngine {
    fn analyze(&self, input: &UpdateInput) -> Result<EngineOutput, EngineError> {
        self.analyses.fetch_add(1, Ordering::SeqCst);
        if self.missing.lock().contains(&input.file_path) {
            return Err(EngineError::FileMissing {
                path: input.file_path.clone(),
            });
        }
        if self.failing.lock().contains(&input.file_path) {
            return Err(EngineError::Failed {
                message: format!("scripted failure for {}", input.file_path.display()),
            });
        }

        let mut depended_on_file_paths = HashSet::from([input.file_path.clone()]);
        if let Some(extra) = self.dependencies.lock().get(&input.file_path) {
            depended_on_file_paths.extend(extra.iter().cloned());
        }
        Ok(EngineOutput {
            translation_unit: TranslationUnit::new(
                input.file_path.clone(),
                input.command_line_arguments.clone(),
            ),
            depended_on_file_paths,
        })
    }
}

/// Engine that, once armed, blocks every analysis until the test releases it.
pub struct GatedEngine {
    armed: AtomicBool,
    missing: AtomicBool,
    started: Mutex<Sender<PathBuf>>,
    release: Mutex<Receiver<()>>,
}

/// Test side of a [`GatedEngine`]
pub struct Gate {
    pub started: Receiver<PathBuf>,
    release: Sender<()>,
}

impl Gate {
    /// Wait until an analysis is blocked inside the engine
    pub fn wait_started(&self) -> PathBuf {
        self.started.recv().expect("Engine went away")
    }

    pub fn release(&self) {
        self.release.send(()).expect("Engine went away");
    }
}

impl GatedEngine {
    pub fn new() -> (Arc<Self>, Gate) {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let engine = Arc::new(Self {
            armed: AtomicBool::new(false),
            missing: AtomicBool::new(false),
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
        });
        let gate = Gate {
            started: started_rx,
            release: release_tx,
        };
        (engine, gate)
    }

    pub fn arm(&self, armed: bool) {
        self.armed.store(armed, Ordering::SeqCst);
    }

    /// Report the main file as missing once released
    pub fn set_missing(&self, missing: bool) {
        self.missing.store(missing, Ordering::SeqCst);
    }
}

impl ParsingEngine for GatedEngine {
    fn analyze(&self, input: &UpdateInput) -> Result<EngineOutput, EngineError> {
        if self.armed.load(Ordering::SeqCst) {
            let _ = self.started.lock().send(input.file_path.clone());
            let _ = self.release.lock().recv();
        }
        if self.missing.load(Ordering::SeqCst) {
            return Err(EngineError::FileMissing {
                path: input.file_path.clone(),
            });
        }
        Ok(EngineOutput {
            translation_unit: TranslationUnit::new(input.file_path.clone(), ()),
            depended_on_file_paths: HashSet::from([input.file_path.clone()]),
        })
    }
}

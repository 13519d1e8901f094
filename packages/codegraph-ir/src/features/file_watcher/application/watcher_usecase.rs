//! File Watcher UseCase: the thin application-layer entry point that wires
//! a `WatchConfig` + `BatchHandler` into a running `infrastructure::FileWatcher`
//! per root path.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::features::file_watcher::infrastructure::FileWatcher;
use crate::features::file_watcher::ports::{BatchHandler, WatchConfig};

/// File Watcher UseCase Trait
pub trait FileWatcherUseCase: Send + Sync {
    fn watch(&self, path: &PathBuf) -> Result<(), String>;
    fn unwatch(&self, path: &PathBuf) -> Result<(), String>;
}

/// Holds one running `FileWatcher` per watched root, keyed by path.
pub struct FileWatcherUseCaseImpl {
    handler: Arc<Mutex<dyn BatchHandler>>,
    config_template: WatchConfig,
    active: Mutex<HashMap<PathBuf, FileWatcher>>,
}

impl FileWatcherUseCaseImpl {
    pub fn new(handler: Arc<Mutex<dyn BatchHandler>>, config_template: WatchConfig) -> Self {
        Self {
            handler,
            config_template,
            active: Mutex::new(HashMap::new()),
        }
    }
}

impl FileWatcherUseCase for FileWatcherUseCaseImpl {
    fn watch(&self, path: &PathBuf) -> Result<(), String> {
        let mut active = self.active.lock();
        if active.contains_key(path) {
            return Ok(());
        }

        let mut config = self.config_template.clone();
        config.root_path = path.clone();

        let mut watcher = FileWatcher::new(config, self.handler.clone())?;
        watcher.start()?;
        active.insert(path.clone(), watcher);
        Ok(())
    }

    fn unwatch(&self, path: &PathBuf) -> Result<(), String> {
        let mut active = self.active.lock();
        if let Some(mut watcher) = active.remove(path) {
            watcher.stop()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::file_watcher::ports::ChangeBatch;

    struct NullHandler;
    impl BatchHandler for NullHandler {
        fn handle_batch(&mut self, _batch: ChangeBatch) -> Result<(), String> {
            Ok(())
        }
        fn handle_error(&mut self, _error: String) {}
    }

    #[test]
    fn test_watch_unwatch_missing_root_path_errors() {
        let usecase = FileWatcherUseCaseImpl::new(Arc::new(Mutex::new(NullHandler)), WatchConfig::default());
        let missing = PathBuf::from("/nonexistent/path/for/test");
        assert!(usecase.watch(&missing).is_err());
    }

    #[test]
    fn test_unwatch_unknown_path_is_ok() {
        let usecase = FileWatcherUseCaseImpl::new(Arc::new(Mutex::new(NullHandler)), WatchConfig::default());
        assert!(usecase.unwatch(&PathBuf::from("/never/watched")).is_ok());
    }
}

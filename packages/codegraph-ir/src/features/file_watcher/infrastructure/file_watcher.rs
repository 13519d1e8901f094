//! FileWatcher - cross-platform file system monitoring built on `notify`,
//! feeding a two-map coalescer (spec §4.7) instead of a flat debounce map.

use crate::features::file_watcher::coalescer::{ChangeKind, Coalescer};
use crate::features::file_watcher::ports::{BatchHandler, FileChangeEvent, WatchConfig};
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Minimum tick interval for checking whether a batch is due; quiet
/// intervals shorter than this are still honored, just with coarser
/// granularity.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct FileWatcher {
    config: WatchConfig,
    handler: Arc<Mutex<dyn BatchHandler>>,
    watcher: Option<RecommendedWatcher>,
    event_tx: Option<Sender<Event>>,
    event_rx: Option<Receiver<Event>>,
    processor_thread: Option<thread::JoinHandle<()>>,
    running: Arc<Mutex<bool>>,
}

impl FileWatcher {
    pub fn new(config: WatchConfig, handler: Arc<Mutex<dyn BatchHandler>>) -> Result<Self, String> {
        if !config.root_path.exists() {
            return Err(format!("Root path does not exist: {}", config.root_path.display()));
        }
        if !config.root_path.is_dir() {
            return Err(format!("Root path is not a directory: {}", config.root_path.display()));
        }

        let (event_tx, event_rx) = channel();

        Ok(Self {
            config,
            handler,
            watcher: None,
            event_tx: Some(event_tx),
            event_rx: Some(event_rx),
            processor_thread: None,
            running: Arc::new(Mutex::new(false)),
        })
    }

    pub fn start(&mut self) -> Result<(), String> {
        if *self.running.lock() {
            return Err("Watcher already running".to_string());
        }

        if self.event_rx.is_none() {
            let (tx, rx) = channel();
            self.event_tx = Some(tx);
            self.event_rx = Some(rx);
        }

        let event_tx = self.event_tx.as_ref().ok_or("Event transmitter not available")?.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    let _ = event_tx.send(event);
                }
                Err(e) => {
                    eprintln!("File watcher error: {:?}", e);
                }
            },
            NotifyConfig::default(),
        )
        .map_err(|e| format!("Failed to create watcher: {}", e))?;

        let mode = if self.config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        watcher
            .watch(&self.config.root_path, mode)
            .map_err(|e| format!("Failed to watch path: {}", e))?;

        self.watcher = Some(watcher);

        let event_rx = self.event_rx.take().ok_or("Event receiver not available")?;
        let handler = self.handler.clone();
        let config = self.config.clone();
        let running = self.running.clone();

        *running.lock() = true;

        let processor_thread = thread::spawn(move || {
            Self::process_events(event_rx, handler, config, running);
        });

        self.processor_thread = Some(processor_thread);

        Ok(())
    }

    /// Stops the watcher, guaranteeing the coalescer's pending state is
    /// flushed exactly once (spec §4.7).
    pub fn stop(&mut self) -> Result<(), String> {
        if !*self.running.lock() {
            return Ok(());
        }

        *self.running.lock() = false;
        self.watcher = None;

        if let Some(thread) = self.processor_thread.take() {
            thread.join().map_err(|_| "Failed to join processor thread".to_string())?;
        }

        Ok(())
    }

    fn process_events(
        event_rx: Receiver<Event>,
        handler: Arc<Mutex<dyn BatchHandler>>,
        config: WatchConfig,
        running: Arc<Mutex<bool>>,
    ) {
        let mut coalescer = Coalescer::new(config.quiet_interval, config.max_batch_size);

        while *running.lock() {
            match event_rx.recv_timeout(POLL_INTERVAL) {
                Ok(event) => {
                    if let Some(change_event) = Self::convert_event(&event, &config) {
                        let path = change_event.path().clone();
                        let kind = match change_event {
                            FileChangeEvent::Deleted(_) => ChangeKind::Deleted,
                            FileChangeEvent::Created(_) | FileChangeEvent::Modified(_) => ChangeKind::Modified,
                        };
                        coalescer.add_change(path, kind);
                    }
                }
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
            }

            if let Some(batch) = coalescer.ready_batch() {
                if let Err(e) = handler.lock().handle_batch(batch) {
                    handler.lock().handle_error(format!("Batch handling error: {}", e));
                }
            }
        }

        if !coalescer.is_empty() {
            let batch = coalescer.flush();
            if let Err(e) = handler.lock().handle_batch(batch) {
                handler.lock().handle_error(format!("Final flush error: {}", e));
            }
        }
    }

    fn convert_event(event: &Event, config: &WatchConfig) -> Option<FileChangeEvent> {
        if event.paths.is_empty() {
            return None;
        }

        let path = &event.paths[0];

        if Self::should_ignore(path, &config.ignore_patterns) {
            return None;
        }

        if !config.extensions.is_empty() {
            match path.extension().and_then(|e| e.to_str()) {
                Some(ext_str) if config.extensions.iter().any(|e| e == ext_str) => {}
                _ => return None,
            }
        }

        use notify::event::ModifyKind;

        match event.kind {
            EventKind::Create(_) => Some(FileChangeEvent::Created(path.clone())),
            EventKind::Modify(ModifyKind::Data(_)) => Some(FileChangeEvent::Modified(path.clone())),
            EventKind::Modify(ModifyKind::Any) | EventKind::Any => {
                if path.exists() {
                    Some(FileChangeEvent::Modified(path.clone()))
                } else {
                    Some(FileChangeEvent::Deleted(path.clone()))
                }
            }
            EventKind::Remove(_) => Some(FileChangeEvent::Deleted(path.clone())),
            _ => None,
        }
    }

    fn should_ignore(path: &Path, ignore_patterns: &[String]) -> bool {
        let path_str = match path.to_str() {
            Some(s) => s,
            None => return false,
        };

        for pattern in ignore_patterns {
            if pattern.contains("**") {
                for part in pattern.split("**") {
                    let part_trimmed = part.trim_matches('/');
                    if !part_trimmed.is_empty()
                        && (path_str.contains(&format!("/{}/", part_trimmed))
                            || path_str.ends_with(&format!("/{}", part_trimmed))
                            || path_str.starts_with(&format!("{}/", part_trimmed)))
                    {
                        return true;
                    }
                }
            } else if path_str.contains(pattern) {
                return true;
            }
        }

        false
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_ignore_basic() {
        let ignore_patterns = vec!["**/__pycache__/**".to_string()];
        let ignored_path = PathBuf::from("/home/user/project/__pycache__/test.pyc");
        assert!(FileWatcher::should_ignore(&ignored_path, &ignore_patterns));

        let not_ignored_path = PathBuf::from("/home/user/project/test.py");
        assert!(!FileWatcher::should_ignore(&not_ignored_path, &ignore_patterns));
    }

    #[test]
    fn test_should_ignore_multiple_patterns() {
        let ignore_patterns = vec![
            "**/__pycache__/**".to_string(),
            "**/node_modules/**".to_string(),
            "**/target/**".to_string(),
        ];

        assert!(FileWatcher::should_ignore(
            &PathBuf::from("/project/__pycache__/file.pyc"),
            &ignore_patterns
        ));
        assert!(FileWatcher::should_ignore(
            &PathBuf::from("/project/node_modules/package/index.js"),
            &ignore_patterns
        ));
        assert!(!FileWatcher::should_ignore(&PathBuf::from("/project/src/main.rs"), &ignore_patterns));
    }
}

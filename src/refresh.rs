//! One refresh cycle: fetch the table text, parse it, keep the result.
//!
//! A [`Refresher`] holds the last successfully parsed [`Snapshot`]. A failed
//! refresh leaves that snapshot in place. Refreshes do not nest: asking for
//! one while another is running fails with [`RefreshError::InProgress`].

use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::parser::{ParseError, RecordParser};
use crate::pipeline::{RecordPipeline, RecordView};
use crate::record::ConnectionRecord;
use crate::source::{SourceError, TableSource};

/// Errors that abort a refresh.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("A refresh is already in progress")]
    InProgress,

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// The records from one successful refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub records: Vec<ConnectionRecord>,
    pub taken_at: DateTime<Local>,
}

impl Snapshot {
    /// Run `pipeline` over this snapshot's records.
    pub fn view(&self, pipeline: &RecordPipeline) -> RecordView<'_> {
        pipeline.run(&self.records)
    }
}

/// Clears the in-progress flag on every exit path.
struct InProgressGuard<'a>(&'a AtomicBool);

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives refresh cycles against a [`TableSource`].
pub struct Refresher<S> {
    source: S,
    parser: RecordParser,
    in_progress: AtomicBool,
    latest: RwLock<Option<Arc<Snapshot>>>,
}

impl<S: TableSource> Refresher<S> {
    pub fn new(source: S, parser: RecordParser) -> Self {
        Self {
            source,
            parser,
            in_progress: AtomicBool::new(false),
            latest: RwLock::new(None),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch and parse a fresh table.
    ///
    /// On success the new snapshot replaces the held one and is returned.
    /// On failure the held snapshot is untouched.
    pub fn refresh(&self) -> Result<Arc<Snapshot>, RefreshError> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Refresh requested while one is still running");
            return Err(RefreshError::InProgress);
        }
        let _guard = InProgressGuard(&self.in_progress);

        debug!("Refreshing from {}", self.source.name());
        let result = self
            .source
            .fetch()
            .map_err(RefreshError::from)
            .and_then(|text| self.parser.parse(&text).map_err(RefreshError::from));

        match result {
            Ok(records) => {
                info!("Parsed {} connection records", records.len());
                let snapshot = Arc::new(Snapshot {
                    records,
                    taken_at: Local::now(),
                });
                if let Ok(mut latest) = self.latest.write() {
                    *latest = Some(Arc::clone(&snapshot));
                }
                Ok(snapshot)
            }
            Err(e) => {
                warn!("Refresh failed, keeping previous records: {}", e);
                Err(e)
            }
        }
    }

    /// The last successfully parsed snapshot, if any.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.latest.read().ok().and_then(|latest| (*latest).clone())
    }

    /// Whether a refresh is currently running.
    pub fn is_refreshing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterCriteria;
    use crate::parser::tests::{row, table};
    use crate::source::TextSource;
    use std::sync::Mutex;
    use std::sync::mpsc;
    use std::thread;

    /// Returns queued results in order, one per fetch.
    struct ScriptedSource {
        results: Mutex<Vec<Result<String, SourceError>>>,
    }

    impl ScriptedSource {
        fn new(mut results: Vec<Result<String, SourceError>>) -> Self {
            results.reverse();
            Self {
                results: Mutex::new(results),
            }
        }
    }

    impl TableSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        fn fetch(&self) -> Result<String, SourceError> {
            self.results
                .lock()
                .unwrap()
                .pop()
                .expect("no scripted result left")
        }
    }

    /// Blocks inside `fetch` until released.
    struct BlockingSource {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
        text: String,
    }

    impl TableSource for BlockingSource {
        fn name(&self) -> &str {
            "blocking"
        }

        fn fetch(&self) -> Result<String, SourceError> {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            Ok(self.text.clone())
        }
    }

    fn sample_table() -> String {
        table(&[
            row("tcp", "0.0.0.0:80", "0.0.0.0:*", "LISTEN", "10/nginx"),
            row("tcp", "127.0.0.1:22", "0.0.0.0:*", "LISTEN", "1234/sshd"),
            row("tcp", "10.0.0.5:22", "10.0.0.9:51000", "CLOSE_WAIT", "1234/sshd"),
        ])
    }

    #[test]
    fn test_refresh_parses_and_stores() {
        let refresher = Refresher::new(TextSource::new(sample_table()), RecordParser::default());
        assert_eq!(refresher.source().name(), "text");
        assert!(refresher.latest().is_none());

        let snapshot = refresher.refresh().unwrap();
        assert_eq!(snapshot.records.len(), 3);
        assert_eq!(refresher.latest().unwrap(), snapshot);
        assert!(!refresher.is_refreshing());

        let view = snapshot.view(&RecordPipeline::new(FilterCriteria::default()));
        let ports: Vec<u16> = view.iter().map(|r| r.local_port).collect();
        assert_eq!(ports, vec![22, 80]);
        assert_eq!(view.count, 2);
    }

    #[test]
    fn test_refresh_is_deterministic() {
        let refresher = Refresher::new(TextSource::new(sample_table()), RecordParser::default());
        let first = refresher.refresh().unwrap();
        let second = refresher.refresh().unwrap();
        assert_eq!(first.records, second.records);
    }

    #[test]
    fn test_command_failure_keeps_previous_snapshot() {
        let source = ScriptedSource::new(vec![
            Ok(sample_table()),
            Err(SourceError::CommandFailed {
                status: Some(1),
                output: "permission denied".to_string(),
            }),
        ]);
        let refresher = Refresher::new(source, RecordParser::default());

        let good = refresher.refresh().unwrap();
        match refresher.refresh() {
            Err(RefreshError::Source(SourceError::CommandFailed { status, output })) => {
                assert_eq!(status, Some(1));
                assert_eq!(output, "permission denied");
            }
            other => panic!("expected command failure, got {:?}", other),
        }

        assert_eq!(refresher.latest().unwrap(), good);
        assert!(!refresher.is_refreshing());
    }

    #[test]
    fn test_malformed_input_keeps_previous_snapshot() {
        let bad = table(&[row("tcp", "0.0.0.0:http", "0.0.0.0:*", "LISTEN", "-")]);
        let source = ScriptedSource::new(vec![Ok(sample_table()), Ok(bad)]);
        let refresher = Refresher::new(source, RecordParser::default());

        let good = refresher.refresh().unwrap();
        assert!(matches!(
            refresher.refresh(),
            Err(RefreshError::Parse(ParseError::MalformedInput { line: 3, .. }))
        ));
        assert_eq!(refresher.latest().unwrap(), good);
    }

    #[test]
    fn test_failure_before_any_success_leaves_nothing() {
        let source = ScriptedSource::new(vec![Err(SourceError::CommandFailed {
            status: Some(1),
            output: "permission denied".to_string(),
        })]);
        let refresher = Refresher::new(source, RecordParser::default());

        assert!(refresher.refresh().is_err());
        assert!(refresher.latest().is_none());
    }

    #[test]
    fn test_concurrent_refresh_rejected() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let refresher = Arc::new(Refresher::new(
            BlockingSource {
                entered: Mutex::new(entered_tx),
                release: Mutex::new(release_rx),
                text: sample_table(),
            },
            RecordParser::default(),
        ));

        let background = {
            let refresher = Arc::clone(&refresher);
            thread::spawn(move || refresher.refresh())
        };

        // Wait until the first refresh is inside fetch
        entered_rx.recv().unwrap();
        assert!(refresher.is_refreshing());
        assert!(matches!(refresher.refresh(), Err(RefreshError::InProgress)));

        release_tx.send(()).unwrap();
        let snapshot = background.join().unwrap().unwrap();
        assert_eq!(snapshot.records.len(), 3);
        assert!(!refresher.is_refreshing());
    }
}

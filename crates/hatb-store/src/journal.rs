//! JSON Lines journal store.
//!
//! Every committed [`JournalEvent`] is appended as one line to
//! `<data_dir>/journal.jsonl` and fsynced before it is applied in memory.
//! Opening a store replays the journal from the start.
//!
//! Recovery rules:
//! - A corrupt final line is an interrupted write: it is truncated away
//! - A corrupt line followed by valid ones is reported as [`StoreError::Corrupt`]
//! - Signals left `CLAIMED` stay claimed and are logged, never re-dispatched

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::ledger::{JournalEvent, Ledger, LedgerBackend};

const JOURNAL_FILE: &str = "journal.jsonl";

/// Byte sink under the journal. `File` in production.
trait JournalFile: Write + Send {
    /// Make written bytes durable.
    fn sync(&mut self) -> io::Result<()>;

    /// Cut the journal back to `len` bytes.
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl JournalFile for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)?;
        self.sync_data()
    }
}

/// Append-only writer for the journal file.
///
/// Each event is one unbuffered `write_all` followed by a sync. A failed
/// append is cut back off the file so the event never reaches disk; if the
/// cut itself fails the writer refuses every later append.
struct JournalWriter {
    file: Box<dyn JournalFile>,
    /// Length of the journal up to the last durable event.
    len: u64,
    poisoned: bool,
    events_written: u64,
}

impl JournalWriter {
    fn open(path: &Path) -> StoreResult<Self> {
        // Append mode, never truncates.
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();
        Ok(Self::new(Box::new(file), len))
    }

    fn new(file: Box<dyn JournalFile>, len: u64) -> Self {
        Self {
            file,
            len,
            poisoned: false,
            events_written: 0,
        }
    }

    fn append(&mut self, event: &JournalEvent) -> StoreResult<()> {
        if self.poisoned {
            return Err(StoreError::Unavailable(
                "journal write failed and could not be rolled back; reopen the store".to_string(),
            ));
        }

        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let written = self
            .file
            .write_all(&line)
            .and_then(|()| self.file.sync());
        if let Err(e) = written {
            if let Err(rollback) = self.file.truncate(self.len) {
                error!(error = %rollback, len = self.len, "Journal rollback failed, refusing further writes");
                self.poisoned = true;
            } else {
                warn!(error = %e, "Journal append failed, rolled back");
            }
            return Err(e.into());
        }

        self.len += line.len() as u64;
        self.events_written += 1;
        Ok(())
    }
}

struct Inner {
    ledger: Ledger,
    writer: JournalWriter,
}

/// Durable store backed by a JSON Lines event journal.
pub struct JournalStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl JournalStore {
    /// Open (or create) the journal under `data_dir` and replay it.
    pub fn open(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(JOURNAL_FILE);

        let ledger = if path.exists() {
            replay(&path)?
        } else {
            Ledger::new()
        };

        let counts = ledger.state_counts();
        info!(
            path = %path.display(),
            signals = counts.total(),
            new = counts.new,
            processed = counts.processed,
            failed = counts.failed,
            "Opened journal store"
        );

        let stale = ledger.claimed_ids();
        if !stale.is_empty() {
            warn!(
                count = stale.len(),
                ids = ?stale,
                "Signals left CLAIMED by an interrupted run; they will not be retried"
            );
        }

        let writer = JournalWriter::open(&path)?;
        Ok(Self::from_parts(path, ledger, writer))
    }

    fn from_parts(path: PathBuf, ledger: Ledger, writer: JournalWriter) -> Self {
        Self {
            path,
            inner: Mutex::new(Inner { ledger, writer }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerBackend for JournalStore {
    fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&self.inner.lock().ledger)
    }

    fn commit(
        &self,
        prepare: impl FnOnce(&Ledger) -> StoreResult<Option<JournalEvent>>,
    ) -> StoreResult<Option<JournalEvent>> {
        let mut inner = self.inner.lock();
        let Some(event) = prepare(&inner.ledger)? else {
            return Ok(None);
        };
        inner.writer.append(&event)?;
        inner.ledger.apply(&event)?;
        debug!(events = inner.writer.events_written, "Journal event committed");
        Ok(Some(event))
    }
}

/// Rebuild a ledger from the journal at `path`.
fn replay(path: &Path) -> StoreResult<Ledger> {
    let mut ledger = Ledger::new();
    let reader = BufReader::new(File::open(path)?);

    // Byte offset just past the last good line, and the first bad line seen.
    let mut good_len: u64 = 0;
    let mut bad: Option<(usize, String)> = None;

    for (idx, line) in reader.split(b'\n').enumerate() {
        let line_no = idx + 1;
        let bytes = line?;
        if let Some((bad_line, reason)) = bad.take() {
            if bytes.iter().all(u8::is_ascii_whitespace) {
                bad = Some((bad_line, reason));
                continue;
            }
            return Err(StoreError::Corrupt {
                line: bad_line,
                reason,
            });
        }
        if bytes.iter().all(u8::is_ascii_whitespace) {
            good_len += bytes.len() as u64 + 1;
            continue;
        }
        match serde_json::from_slice::<JournalEvent>(&bytes) {
            Ok(event) => {
                ledger.apply(&event).map_err(|e| StoreError::Corrupt {
                    line: line_no,
                    reason: e.to_string(),
                })?;
                good_len += bytes.len() as u64 + 1;
            }
            Err(e) => bad = Some((line_no, e.to_string())),
        }
    }

    if let Some((line, reason)) = bad {
        warn!(line, %reason, "Truncating partial trailing journal line");
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(good_len)?;
        file.sync_data()?;
    } else {
        // A final line without a newline was fully parsed; terminate it so the
        // next append starts on its own line.
        let len = std::fs::metadata(path)?.len();
        if len > 0 && len < good_len {
            let mut file = OpenOptions::new().append(true).open(path)?;
            file.write_all(b"\n")?;
            file.sync_data()?;
        }
    }

    Ok(ledger)
}

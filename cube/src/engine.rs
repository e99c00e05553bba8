use std::error::Error;
use std::fmt;
use std::io;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, PoisonError};
use std::thread::{self, JoinHandle};

use rayon::prelude::*;
use tracing::{info, warn};

use slater::{SlaterError, SlaterEvaluator, SlaterSet};

use crate::grid::Cube;

/// Rejections raised before a pass is dispatched.
///
/// Once a pass is running no error crosses the completion boundary:
/// numerical anomalies land in the grid as-is and are only counted in the
/// [`PassSummary`].
#[derive(Debug)]
pub enum CubeError {
    /// The requested molecular orbital does not exist.
    OrbitalIndexOutOfRange { index: usize, num_mos: usize },
    /// The basis set failed validation during normalization.
    Basis(SlaterError),
    /// The pass worker thread could not be started.
    Spawn(io::Error),
}

impl fmt::Display for CubeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CubeError::OrbitalIndexOutOfRange { index, num_mos } => write!(
                f,
                "molecular orbital index {} outside the valid range 1..={}",
                index, num_mos
            ),
            CubeError::Basis(e) => write!(f, "basis set rejected: {}", e),
            CubeError::Spawn(e) => write!(f, "could not start the pass worker: {}", e),
        }
    }
}

impl Error for CubeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CubeError::Basis(e) => Some(e),
            CubeError::Spawn(e) => Some(e),
            CubeError::OrbitalIndexOutOfRange { .. } => None,
        }
    }
}

impl From<SlaterError> for CubeError {
    fn from(e: SlaterError) -> Self {
        CubeError::Basis(e)
    }
}

#[derive(Debug, Clone, Copy)]
enum PassMode {
    /// 0-based coefficient column.
    Orbital(usize),
    Density,
}

/// Aggregate status of a finished pass, delivered once with completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    /// Cells in the target grid.
    pub points: usize,
    /// Cells actually written; smaller than `points` only when cancelled.
    pub written: usize,
    /// Written cells holding NaN or infinite values.
    pub non_finite: usize,
    pub cancelled: bool,
}

/// Handle to an in-flight evaluation pass.
///
/// Dropping the handle detaches the pass: it still runs to completion and
/// releases the grid lock on its own.
#[derive(Debug)]
pub struct PassHandle {
    done: Receiver<PassSummary>,
    cancel: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl PassHandle {
    /// Ask the pass to stop early.
    ///
    /// Tasks that have not run yet leave their cells untouched; the grid
    /// lock is still released and completion still fires, with
    /// [`PassSummary::cancelled`] set.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Block until the pass completes and return its summary.
    pub fn wait(mut self) -> PassSummary {
        match self.done.recv() {
            Ok(summary) => {
                if let Some(worker) = self.worker.take() {
                    let _ = worker.join();
                }
                summary
            }
            Err(_) => {
                // The worker died without reporting; re-raise its panic
                // here instead of inventing a summary. The grid lock was
                // already released during unwinding.
                let worker = self.worker.take().expect("worker joined twice");
                match worker.join() {
                    Err(payload) => panic::resume_unwind(payload),
                    Ok(()) => unreachable!("worker exited without a summary"),
                }
            }
        }
    }
}

/// Asynchronously fill `cube` with the amplitude of molecular orbital
/// `mo_index` (1-based, the quantum-chemistry convention).
///
/// An index outside `1..=num_mos` is rejected here, before any work is
/// dispatched or any cell is touched. Otherwise the basis is normalized
/// (also synchronously, so shape errors surface on the caller) and a pass
/// worker is started; the call returns without blocking. The worker takes
/// the cube's write lock for the whole pass, queueing behind any earlier
/// pass over the same cube, and sends one [`PassSummary`] when every cell
/// is done.
pub fn compute_orbital(
    set: &Arc<SlaterSet>,
    cube: &Arc<Cube>,
    mo_index: usize,
) -> Result<PassHandle, CubeError> {
    let num_mos = set.num_mos();
    if mo_index < 1 || mo_index > num_mos {
        return Err(CubeError::OrbitalIndexOutOfRange {
            index: mo_index,
            num_mos,
        });
    }
    set.evaluator()?;
    dispatch(set.clone(), cube.clone(), PassMode::Orbital(mo_index - 1))
}

/// Asynchronously fill `cube` with the total electron density.
///
/// Same dispatch shape as [`compute_orbital`]; each task accumulates the
/// density-matrix weighted quadratic form over all basis-function pairs.
pub fn compute_density(
    set: &Arc<SlaterSet>,
    cube: &Arc<Cube>,
) -> Result<PassHandle, CubeError> {
    set.evaluator()?;
    dispatch(set.clone(), cube.clone(), PassMode::Density)
}

fn dispatch(
    set: Arc<SlaterSet>,
    cube: Arc<Cube>,
    mode: PassMode,
) -> Result<PassHandle, CubeError> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    let (tx, done) = mpsc::channel();

    let worker = thread::Builder::new()
        .name("cube-pass".into())
        .spawn(move || {
            // Normalization already ran on the dispatching thread; this
            // only fetches the memoized state.
            let eval = set.evaluator().expect("basis validated before dispatch");
            let mut guard = cube.lock().write().unwrap_or_else(PoisonError::into_inner);
            info!("evaluating {} grid points", guard.len());
            let summary = fill(eval, &cube, guard.as_mut_slice(), mode, &flag);
            drop(guard);
            if summary.non_finite > 0 {
                warn!(
                    "{} of {} grid values are not finite",
                    summary.non_finite, summary.points
                );
            }
            let _ = tx.send(summary);
        })
        .map_err(CubeError::Spawn)?;

    Ok(PassHandle {
        done,
        cancel,
        worker: Some(worker),
    })
}

/// Run one task per cell over the locked slice. Tasks are independent and
/// each writes a distinct index, so the pool can schedule them in any
/// order and in parallel.
fn fill(
    eval: &SlaterEvaluator,
    cube: &Cube,
    data: &mut [f64],
    mode: PassMode,
    cancel: &AtomicBool,
) -> PassSummary {
    let points = data.len();
    let (written, non_finite) = data
        .par_iter_mut()
        .enumerate()
        .map(|(index, cell)| {
            if cancel.load(Ordering::Relaxed) {
                return (0usize, 0usize);
            }
            let pos = cube.position(index);
            let value = match mode {
                PassMode::Orbital(mo) => eval.orbital(&pos, mo),
                PassMode::Density => eval.density(&pos),
            };
            *cell = value;
            (1, usize::from(!value.is_finite()))
        })
        .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1));

    PassSummary {
        points,
        written,
        non_finite,
        cancelled: written < points,
    }
}

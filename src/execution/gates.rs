//! Pre-run confirmation gates
//!
//! Both gates belong to the surrounding environment, not to the
//! orchestrator: it honors their veto but does not own their UI.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::warn;

/// Confirms overwriting build artifacts that already exist on disk
pub trait OverwritePrompt: Send + Sync {
    /// Present the artifacts that would be overwritten. Returning false
    /// cancels the run before anything is touched.
    fn confirm_overwrite(&self, candidates: &[PathBuf]) -> bool;
}

/// Guards against building while the editing environment has unsaved work
pub trait UnsavedWorkGuard: Send + Sync {
    /// Offer to save outstanding work. Returning false vetoes the run.
    fn confirm_save_if_needed(&self) -> bool;
}

/// Accepts every overwrite. For non-interactive runs (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl OverwritePrompt for AutoConfirm {
    fn confirm_overwrite(&self, candidates: &[PathBuf]) -> bool {
        for path in candidates {
            warn!("overwriting existing build at {}", path.display());
        }
        true
    }
}

/// Asks on stdin with a y/N prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinPrompt;

impl OverwritePrompt for StdinPrompt {
    fn confirm_overwrite(&self, candidates: &[PathBuf]) -> bool {
        println!("The following builds will be overwritten:");
        for path in candidates {
            println!("  {}", path.display());
        }
        print!("Continue? [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes"),
            Err(_) => false,
        }
    }
}

/// Stand-in guard for environments with nothing to save
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUnsavedWork;

impl UnsavedWorkGuard for NoUnsavedWork {
    fn confirm_save_if_needed(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_confirm_always_accepts() {
        let prompt = AutoConfirm;
        assert!(prompt.confirm_overwrite(&[]));
        assert!(prompt.confirm_overwrite(&[PathBuf::from("/out/Game.exe")]));
    }

    #[test]
    fn test_no_unsaved_work_never_vetoes() {
        assert!(NoUnsavedWork.confirm_save_if_needed());
    }
}

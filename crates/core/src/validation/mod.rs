mod rules;

pub use rules::{parse_delay, parse_flag, parse_template_ref, validate_account_id, validate_log_level};

/// Shortest digit string accepted as a recipient.
pub const MIN_RECIPIENT_DIGITS: usize = 8;

/// Collects rule violations so callers can report all of them at once.
#[derive(Debug, Default)]
pub struct Violations {
    errs: Vec<String>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: impl Into<String>) {
        self.errs.push(err.into());
    }

    /// Records the error of `res` and hands back its value, if any.
    pub fn check<T>(&mut self, res: Result<T, String>) -> Option<T> {
        match res {
            Ok(v) => Some(v),
            Err(e) => {
                self.errs.push(e);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errs.is_empty()
    }

    pub fn into_result(self) -> Result<(), Vec<String>> {
        if self.errs.is_empty() {
            Ok(())
        } else {
            Err(self.errs)
        }
    }
}

pub mod runner;

pub use runner::{
    verify_bound, CheckOutcome, CheckRunner, RunError, RunPhase, CHECK_CRASHED_TAG,
    UNSATISFIED_FILE_TAG,
};

pub mod config;
pub mod coverage;
pub mod executor;

pub use config::{
    exec_fn, state_test_fn, EventConfig, EventOf, ExecFn, FilterFn, Logger, PlanGeneratorFn,
    RunOptions, StateOf, StateTestFn, TestError, TestModelOptions,
};
pub use coverage::{
    CoverageError, CoverageReportEntry, CoverageStatus, Criterion, TestModelCoverage, VisitCount,
};
pub use executor::{ExecError, PathResult, PlanReport, StepResult, TestModel};

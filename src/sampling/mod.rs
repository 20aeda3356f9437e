//! The `SamplingRecorder` contract (§4.3): a sum type over `LiveSampler` and `FileSampler`
//! dispatched by the `IntervalReporter`, per the "nested recorder variants" design note (§9)
//! rather than an inheritance hierarchy.

pub mod file;
pub mod live;

pub use file::FileSampler;
pub use live::LiveSampler;

/// The outcome of one `advance_to` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The clock (or input timeline) reached the requested deadline; carries the observed "now".
    ReachedDeadline(u64),
    /// The source is exhausted (file EOF) or has been told to stop; no further samples will come.
    Terminated,
}

/// Either sampling source, unified behind `advance_to`.
pub enum SamplingRecorder {
    Live(LiveSampler),
    File(FileSampler),
}

impl SamplingRecorder {
    pub fn advance_to(&mut self, deadline: u64) -> AdvanceOutcome {
        match self {
            SamplingRecorder::Live(sampler) => sampler.advance_to(deadline),
            SamplingRecorder::File(sampler) => sampler.advance_to(deadline),
        }
    }

    /// Cooperatively stops the sampler. A no-op for `FileSampler`, which has no background
    /// thread to join.
    pub fn terminate(&mut self) {
        if let SamplingRecorder::Live(sampler) = self {
            sampler.terminate();
        }
    }
}

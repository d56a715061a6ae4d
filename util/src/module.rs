//! Control stage interface
//!
//! The path, orientation and rotation rate stages all follow the same
//! lifecycle: they are initialised from their parameter section, then run
//! once per sample, producing an output for the next stage down and a status
//! report for telemetry.

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// A cascade stage.
pub trait State {
    /// Parameters the stage is initialised from
    type InitData;
    /// Returned when the parameters are rejected.
    type InitError;

    /// The sample the stage runs on.
    type InputData;
    /// The stage's command to the stage below, typically `Option<f64>`.
    type OutputData;
    type StatusReport;
    /// Returned when a sample can't be processed. The stage keeps its state.
    type ProcError;

    /// Validate the parameters and reset the stage to a disabled state.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError>;

    /// Run the stage on one sample.
    ///
    /// A disabled stage still updates its filters, so that enabling it later
    /// doesn't start from stale estimates.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}

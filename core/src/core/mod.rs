pub mod control;
pub mod flow_data;
pub mod handler;
pub mod step;

pub use control::{FlowControl, FlowOutcome};
pub use flow_data::FlowData;
pub use handler::Handler;
pub use step::StepDef;

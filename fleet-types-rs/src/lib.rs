pub mod diagnosis;
pub mod records;
pub mod request;
pub mod severity;

pub use diagnosis::{AgentOutput, FinalDiagnosis};
pub use records::{ComponentHealth, CostAggregate, MaintenanceRecord, Occurrence, Vehicle};
pub use request::OccurrenceRequest;
pub use severity::{ParseSeverityError, Severity};

pub mod capture;
pub mod interviewer;
pub mod project;
pub mod report;
pub mod session;
pub mod timer;

/// Represents commands that the core logic (`SessionOrchestrator`) issues to
/// the runtime.
///
/// This enum is the primary API for decoupling the orchestrator's
/// decision-making from the runtime's execution of side effects (printing or
/// speaking a question, announcing the end of the interview).
#[derive(Debug, Clone)]
pub enum Command {
    /// Command the runtime to present the given question to the candidate.
    PresentQuestion(String),
    /// Command indicating the interview is complete, with a final message.
    SessionComplete(String),
}

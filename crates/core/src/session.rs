use crate::capture::AnswerCapture;
use crate::interviewer::{
    generic_questions, AnswerEvaluation, Evaluator, QuestionSource, ReportSynthesizer,
};
use crate::project::{self, Project};
use crate::report::{self, Report, Score};
use crate::timer::{TimerController, TimerExpired};
use crate::Command;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Resumes shorter than this are rejected at initialization.
pub const MIN_RESUME_CHARS: usize = 50;

/// Fuzzy score at or above which a "new" question from the source is treated
/// as a repeat of one already asked. Exact matches are caught separately;
/// this only guards against lightly reworded resubmissions.
const REPEAT_MATCH_THRESHOLD: i64 = 160;

const NEUTRAL_EVALUATION_REASONING: &str =
    "Answer recorded; automated evaluation was unavailable for this question.";
const COMPLETION_MESSAGE: &str = "Your interview has been completed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    AwaitingAnswer,
    Evaluating,
    Advancing,
    Completed,
}

/// The scored record of one question/answer exchange. Created exactly once
/// per answered question and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub question: String,
    pub answer: String,
    pub score: Score,
    pub reasoning: String,
    pub project_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("resume text is too short ({got} characters, minimum {MIN_RESUME_CHARS})")]
    ResumeTooShort { got: usize },
    #[error("the interview has already started")]
    AlreadyStarted,
    #[error("the interview is not complete yet")]
    NotComplete,
}

/// Ordered record of every question posed so far, with fuzzy repeat
/// detection so the source cannot sneak a reworded duplicate past the
/// exact-match check.
pub struct AskedQuestions {
    texts: Vec<String>,
    matcher: SkimMatcherV2,
}

impl std::fmt::Debug for AskedQuestions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AskedQuestions")
            .field("texts", &self.texts)
            .finish_non_exhaustive()
    }
}

impl AskedQuestions {
    fn new() -> Self {
        Self {
            texts: Vec::new(),
            matcher: SkimMatcherV2::default(),
        }
    }

    fn record(&mut self, question: &str) {
        let question = question.trim();
        if !question.is_empty() && !self.contains(question) {
            self.texts.push(question.to_string());
        }
    }

    pub fn contains(&self, question: &str) -> bool {
        let normalized = question.trim().to_lowercase();
        self.texts.iter().any(|t| t.to_lowercase() == normalized)
    }

    pub fn is_repeat(&self, question: &str) -> bool {
        if self.contains(question) {
            return true;
        }
        let candidate = question.trim().to_lowercase();
        self.texts.iter().any(|asked| {
            self.matcher
                .fuzzy_match(&candidate, &asked.to_lowercase())
                .unwrap_or(0)
                >= REPEAT_MATCH_THRESHOLD
        })
    }

    pub fn as_slice(&self) -> &[String] {
        &self.texts
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

/// The full state of one candidate's interview run. Mutated only by
/// [`SessionOrchestrator`].
#[derive(Debug)]
pub struct Session {
    resume_text: String,
    projects: Vec<Project>,
    current_project_index: usize,
    questions_asked_for_project: usize,
    max_questions_per_project: usize,
    asked_questions: AskedQuestions,
    current_question: Option<String>,
    evaluations: Vec<Evaluation>,
    state: SessionState,
}

impl Session {
    /// Builds a fresh session. The resume must carry enough text to interview
    /// against; a missing project list degrades to the placeholder project
    /// instead of failing.
    pub fn new(
        resume_text: impl Into<String>,
        projects: Vec<Project>,
    ) -> Result<Self, SessionError> {
        let resume_text = resume_text.into();
        let got = resume_text.trim().chars().count();
        if got < MIN_RESUME_CHARS {
            return Err(SessionError::ResumeTooShort { got });
        }

        let projects = project::ensure_projects(projects);
        let max_questions_per_project = project::questions_per_project(projects.len());

        Ok(Self {
            resume_text,
            projects,
            current_project_index: 0,
            questions_asked_for_project: 0,
            max_questions_per_project,
            asked_questions: AskedQuestions::new(),
            current_question: None,
            evaluations: Vec::new(),
            state: SessionState::NotStarted,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn current_project(&self) -> Option<&Project> {
        self.projects.get(self.current_project_index)
    }

    pub fn current_question(&self) -> Option<&str> {
        self.current_question.as_deref()
    }

    pub fn evaluations(&self) -> &[Evaluation] {
        &self.evaluations
    }

    pub fn asked_questions(&self) -> &[String] {
        self.asked_questions.as_slice()
    }

    pub fn max_questions_per_project(&self) -> usize {
        self.max_questions_per_project
    }

    /// Upper bound on questions for the whole interview.
    pub fn total_question_budget(&self) -> usize {
        self.max_questions_per_project * self.projects.len()
    }

    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }
}

/// Result of a submit attempt.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The answer was recorded. `next_question` is `None` when this submit
    /// finished the interview.
    Recorded {
        evaluation: Evaluation,
        next_question: Option<String>,
    },
    /// No answer was awaited (duplicate submit, stale timer, finished
    /// interview). Nothing was recorded.
    Ignored,
}

/// Sole authority over session state transitions.
///
/// Coordinates the countdown timer, the answer capture stream, and the three
/// capability calls into one serialized question -> answer -> evaluation ->
/// next-question sequence. Both the manual submit and the timer expiry funnel
/// into [`submit_answer`](Self::submit_answer); the state machine transition
/// out of `AwaitingAnswer` happens before the first suspension point, so
/// whichever caller gets there first wins and the loser is a no-op.
pub struct SessionOrchestrator {
    session: Session,
    questions: Arc<dyn QuestionSource>,
    evaluator: Arc<dyn Evaluator>,
    synthesizer: Arc<dyn ReportSynthesizer>,
    capture: Arc<dyn AnswerCapture>,
    timer: TimerController,
    timer_tx: mpsc::Sender<TimerExpired>,
    command_tx: mpsc::Sender<Command>,
    answer_budget: Duration,
}

impl SessionOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: Session,
        questions: Arc<dyn QuestionSource>,
        evaluator: Arc<dyn Evaluator>,
        synthesizer: Arc<dyn ReportSynthesizer>,
        capture: Arc<dyn AnswerCapture>,
        command_tx: mpsc::Sender<Command>,
        timer_tx: mpsc::Sender<TimerExpired>,
        answer_budget: Duration,
    ) -> Self {
        Self {
            session,
            questions,
            evaluator,
            synthesizer,
            capture,
            timer: TimerController::new(),
            timer_tx,
            command_tx,
            answer_budget,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn current_question(&self) -> Option<&str> {
        self.session.current_question()
    }

    pub fn time_remaining_seconds(&self) -> u64 {
        self.timer.remaining_seconds()
    }

    pub fn is_completed(&self) -> bool {
        self.session.is_completed()
    }

    pub fn evaluations(&self) -> &[Evaluation] {
        self.session.evaluations()
    }

    /// Asks the source for the opening question and moves to
    /// `AwaitingAnswer`. A failing or empty source degrades to a generic
    /// project-named question; starting never blocks on question quality.
    pub async fn start_interview(&mut self) -> Result<Option<String>, SessionError> {
        if self.session.state != SessionState::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }

        match self.request_question(true).await {
            Some(question) => {
                self.present_question(question.clone()).await;
                Ok(Some(question))
            }
            None => {
                // Unreachable while the generic pool is non-empty, but the
                // contract is a clean completion rather than a stuck session.
                self.complete().await;
                Ok(None)
            }
        }
    }

    /// Records exactly one evaluation for the active question and advances
    /// the interview. Late or duplicate calls are no-ops.
    pub async fn submit_answer(&mut self, answer: &str) -> SubmitOutcome {
        if self.session.state != SessionState::AwaitingAnswer {
            tracing::debug!(state = ?self.session.state, "ignoring submit: no answer awaited");
            return SubmitOutcome::Ignored;
        }
        // Gate further submits before the first suspension point, then tear
        // down the per-question resources regardless of who triggered us.
        self.session.state = SessionState::Evaluating;
        self.timer.cancel();
        let _ = self.capture.stop();

        let question = self.session.current_question.take().unwrap_or_default();
        let project_name = self
            .session
            .current_project()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| project::PLACEHOLDER_PROJECT_NAME.to_string());

        let scored = match self.evaluator.score_answer(&question, answer).await {
            Ok(scored) => scored,
            Err(error) => {
                tracing::warn!(%error, "evaluator failed; recording neutral evaluation");
                AnswerEvaluation {
                    score: Score::Medium,
                    reasoning: NEUTRAL_EVALUATION_REASONING.to_string(),
                }
            }
        };

        let evaluation = Evaluation {
            question,
            answer: answer.to_string(),
            score: scored.score,
            reasoning: scored.reasoning,
            project_name,
        };
        self.session.evaluations.push(evaluation.clone());

        self.session.state = SessionState::Advancing;
        self.session.questions_asked_for_project += 1;

        match self.advance().await {
            Some(question) => {
                self.present_question(question.clone()).await;
                SubmitOutcome::Recorded {
                    evaluation,
                    next_question: Some(question),
                }
            }
            None => {
                self.complete().await;
                SubmitOutcome::Recorded {
                    evaluation,
                    next_question: None,
                }
            }
        }
    }

    /// Timer-expiry entry point. Carries whatever transcript was captured so
    /// far (possibly empty) through the same path as a manual submit. Stale
    /// generations - a timer cancelled by a submit that won the race - are
    /// dropped.
    pub async fn handle_timeout(&mut self, expired: TimerExpired) -> SubmitOutcome {
        if !self.timer.is_current(expired.generation) {
            tracing::debug!(
                generation = expired.generation,
                "dropping stale timer expiry"
            );
            return SubmitOutcome::Ignored;
        }
        let answer = self.capture.transcript();
        tracing::info!("answer time expired; auto-submitting captured transcript");
        self.submit_answer(&answer).await
    }

    /// Builds the final report. Requires a completed interview; callable any
    /// number of times without touching session state. A failing synthesizer
    /// degrades to deterministic assembly.
    pub async fn generate_report(&self) -> Result<Report, SessionError> {
        if self.session.state != SessionState::Completed {
            return Err(SessionError::NotComplete);
        }
        let evaluations = self.session.evaluations();
        match self.synthesizer.build_report(evaluations).await {
            Ok(report) => Ok(report),
            Err(error) => {
                tracing::warn!(%error, "report synthesizer failed; assembling deterministic report");
                Ok(report::assemble_report(evaluations))
            }
        }
    }

    /// Transition decision rule after an evaluation is appended: stay in the
    /// current project while under quota, otherwise move through the
    /// remaining projects until one yields a question, otherwise finish. An
    /// empty or repeated question ends the current project early; the quota
    /// is a target, not a guarantee.
    async fn advance(&mut self) -> Option<String> {
        if self.session.questions_asked_for_project < self.session.max_questions_per_project {
            if let Some(question) = self.request_question(false).await {
                return Some(question);
            }
            tracing::debug!(
                project = self.session.current_project().map(|p| p.name.as_str()),
                "question source dried up before quota; moving on"
            );
        }

        while self.session.current_project_index + 1 < self.session.projects.len() {
            self.session.current_project_index += 1;
            self.session.questions_asked_for_project = 0;
            if let Some(question) = self.request_question(false).await {
                return Some(question);
            }
        }
        None
    }

    /// One call to the question source with the full degradation policy: an
    /// outright failure falls back to the generic pool, an empty or repeated
    /// reply means "no more questions here" (except at interview start,
    /// where it also degrades to the pool).
    async fn request_question(&mut self, fallback_on_empty: bool) -> Option<String> {
        let project = self.session.current_project()?.clone();
        let reply = self
            .questions
            .next_question(
                &self.session.resume_text,
                &project,
                self.session.asked_questions.as_slice(),
            )
            .await;

        match reply {
            Ok(Some(question)) => {
                let question = question.trim().to_string();
                if question.is_empty() || self.session.asked_questions.is_repeat(&question) {
                    tracing::debug!(
                        project = %project.name,
                        "question source returned an empty or repeated question"
                    );
                    if fallback_on_empty {
                        self.generic_question(&project)
                    } else {
                        None
                    }
                } else {
                    Some(question)
                }
            }
            Ok(None) => {
                if fallback_on_empty {
                    self.generic_question(&project)
                } else {
                    None
                }
            }
            Err(error) => {
                tracing::warn!(%error, project = %project.name, "question source failed; using generic question");
                self.generic_question(&project)
            }
        }
    }

    fn generic_question(&self, project: &Project) -> Option<String> {
        generic_questions(project)
            .into_iter()
            .find(|q| !self.session.asked_questions.is_repeat(q))
    }

    async fn present_question(&mut self, question: String) {
        self.session.asked_questions.record(&question);
        self.session.current_question = Some(question.clone());
        self.session.state = SessionState::AwaitingAnswer;
        self.capture.start();
        let generation = self.timer.start(self.answer_budget, self.timer_tx.clone());
        tracing::info!(
            project = self.session.current_project().map(|p| p.name.as_str()),
            asked = self.session.asked_questions.len(),
            generation,
            "presenting question"
        );
        if let Err(error) = self
            .command_tx
            .send(Command::PresentQuestion(question))
            .await
        {
            tracing::warn!(%error, "runtime dropped the command channel");
        }
    }

    async fn complete(&mut self) {
        self.timer.cancel();
        let _ = self.capture.stop();
        self.session.current_question = None;
        self.session.state = SessionState::Completed;
        tracing::info!(
            evaluations = self.session.evaluations.len(),
            "interview complete"
        );
        if let Err(error) = self
            .command_tx
            .send(Command::SessionComplete(COMPLETION_MESSAGE.to_string()))
            .await
        {
            tracing::warn!(%error, "runtime dropped the command channel");
        }
    }
}

use std::time::Duration;

use exam_core::model::{NavDirection, QuestionId, SubmitTrigger};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{info, warn};

use super::controller::AttemptController;
use super::view::AttemptView;

const COMMAND_BUFFER: usize = 64;

/// User input delivered to a running attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptCommand {
    Answer { question: QuestionId, option: String },
    AnswerCurrent(String),
    ToggleFlag(QuestionId),
    ToggleCurrentFlag,
    Navigate(NavDirection),
    JumpTo(usize),
    Submit,
}

/// UI-side handle to a running attempt.
#[derive(Clone)]
pub struct AttemptHandle {
    commands: mpsc::Sender<AttemptCommand>,
    views: watch::Receiver<AttemptView>,
}

impl AttemptHandle {
    /// Queue a command. Returns false once the runner has finished.
    pub async fn send(&self, command: AttemptCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn view(&self) -> AttemptView {
        self.views.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AttemptView> {
        self.views.clone()
    }
}

/// Drives one attempt on a single task.
///
/// Clock ticks and user commands are handled strictly one at a time, so every
/// submit request, whether from the clock or the student, passes through the
/// same gate. The runner ends when the attempt is submitted or when every
/// handle is dropped.
pub struct AttemptRunner {
    controller: AttemptController,
    tick_every: Duration,
    commands: mpsc::Receiver<AttemptCommand>,
    views: watch::Sender<AttemptView>,
}

impl AttemptRunner {
    #[must_use]
    pub fn new(controller: AttemptController, tick_every: Duration) -> (Self, AttemptHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (view_tx, view_rx) = watch::channel(controller.view());
        let runner = Self {
            controller,
            tick_every,
            commands: command_rx,
            views: view_tx,
        };
        let handle = AttemptHandle {
            commands: command_tx,
            views: view_rx,
        };
        (runner, handle)
    }

    /// Run until the attempt is submitted or abandoned, then hand the
    /// controller back.
    pub async fn run(mut self) -> AttemptController {
        let mut ticker = time::interval_at(Instant::now() + self.tick_every, self.tick_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        while !self.controller.phase().is_terminal() {
            tokio::select! {
                biased;
                _ = ticker.tick() => {
                    if self.controller.tick_clock() {
                        info!(
                            test_id = %self.controller.test().id(),
                            "time is up; submitting attempt"
                        );
                        self.submit(SubmitTrigger::Expiry).await;
                    }
                }
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        info!(
                            test_id = %self.controller.test().id(),
                            phase = %self.controller.phase(),
                            "attempt abandoned before submission"
                        );
                        break;
                    };
                    self.apply(command).await;
                }
            }
            self.views.send_replace(self.controller.view());
        }

        self.controller
    }

    async fn apply(&mut self, command: AttemptCommand) {
        match command {
            AttemptCommand::Answer { question, option } => {
                self.controller.answer(&question, &option);
            }
            AttemptCommand::AnswerCurrent(option) => {
                self.controller.answer_current(&option);
            }
            AttemptCommand::ToggleFlag(question) => {
                self.controller.toggle_flag(&question);
            }
            AttemptCommand::ToggleCurrentFlag => {
                self.controller.toggle_current_flag();
            }
            AttemptCommand::Navigate(direction) => {
                self.controller.navigate(direction);
            }
            AttemptCommand::JumpTo(index) => {
                self.controller.jump_to(index);
            }
            AttemptCommand::Submit => self.submit(SubmitTrigger::Manual).await,
        }
    }

    /// Pass the gate, publish `Submitting`, then wait for the store.
    async fn submit(&mut self, trigger: SubmitTrigger) {
        let Some(pending) = self.controller.begin_submission(trigger) else {
            return;
        };
        self.views.send_replace(self.controller.view());

        let result = self.controller.deliver(&pending).await;
        if let Err(err) = self.controller.finish_submission(pending, result) {
            warn!(%trigger, error = %err, "submission failed");
        }
    }
}

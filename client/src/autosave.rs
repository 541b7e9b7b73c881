//! Debounced autosave worker around a [`DraftSession`].
//!
//! Every edit restarts the quiet-period timer; only the last one schedules
//! a save. Publish and unpublish skip the timer. Errors from debounced saves
//! stay inside the worker and only show up in the status channel.

use std::time::Duration;

use blogdesk_shared::ArticleState;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::Instant,
};

use crate::{
    draft::{DraftSession, FormEdit, Phase},
    error::ClientError,
};

type Ack = oneshot::Sender<Result<(), ClientError>>;

enum Command {
    Edit(FormEdit),
    SetState(ArticleState, Ack),
    Flush(Ack),
}

/// What the worker last reported.
#[derive(Debug, Clone, PartialEq)]
pub struct AutosaveStatus {
    /// Phase of the session after the last operation.
    pub phase: Phase,
    /// Server id, once the article exists.
    pub article_id: Option<String>,
    /// An edit is waiting for the quiet period to end.
    pub pending: bool,
    /// Save cycles run so far, successful or not.
    pub cycles: u64,
    /// Message of the last failed save, cleared by a successful one.
    pub last_error: Option<String>,
}

/// Handle to a running autosave worker.
pub struct Autosave {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<AutosaveStatus>,
    task: JoinHandle<()>,
}

impl Autosave {
    /// Moves `session` into a worker task.
    pub fn spawn(session: DraftSession, delay: Duration) -> Self {
        let (commands, receiver) = mpsc::channel::<Command>(128);
        let (status_tx, status) = watch::channel(AutosaveStatus {
            phase: session.phase(),
            article_id: session.article_id().map(str::to_string),
            pending: false,
            cycles: 0,
            last_error: None,
        });
        let task = tokio::spawn(run_worker(session, delay, receiver, status_tx));
        Self {
            commands,
            status,
            task,
        }
    }

    /// Receiver of status updates.
    pub fn status(&self) -> watch::Receiver<AutosaveStatus> {
        self.status.clone()
    }

    /// Applies an edit and restarts the debounce timer.
    pub async fn edit(&self, edit: FormEdit) -> Result<(), ClientError> {
        self.commands
            .send(Command::Edit(edit))
            .await
            .map_err(|_| closed())
    }

    /// Publishes right away and waits for the save cycle.
    pub async fn publish(&self) -> Result<(), ClientError> {
        self.request(|ack| Command::SetState(ArticleState::Published, ack))
            .await
    }

    /// Moves back to draft right away and waits for the save cycle.
    pub async fn unpublish(&self) -> Result<(), ClientError> {
        self.request(|ack| Command::SetState(ArticleState::Draft, ack))
            .await
    }

    /// Runs a save cycle now instead of waiting for the timer.
    pub async fn flush(&self) -> Result<(), ClientError> {
        self.request(Command::Flush).await
    }

    async fn request(&self, command: impl FnOnce(Ack) -> Command) -> Result<(), ClientError> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(command(ack))
            .await
            .map_err(|_| closed())?;
        done.await.map_err(|_| closed())?
    }

    /// Stops the worker. A pending debounced save is abandoned; the session
    /// is dropped, which writes the local draft one last time.
    pub async fn close(self) {
        let Self {
            commands,
            task,
            ..
        } = self;
        drop(commands);
        if let Err(err) = task.await {
            tracing::error!("autosave worker ended abnormally: {err}");
        }
    }
}

fn closed() -> ClientError {
    ClientError::Unsupported("autosave session is closed".to_string())
}

async fn run_worker(
    mut session: DraftSession,
    delay: Duration,
    mut receiver: mpsc::Receiver<Command>,
    status: watch::Sender<AutosaveStatus>,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        let command = match deadline {
            Some(at) => tokio::select! {
                command = receiver.recv() => command,
                _ = tokio::time::sleep_until(at) => {
                    deadline = None;
                    if let Err(err) = run_cycle(&mut session, &status).await {
                        tracing::warn!("autosave failed: {err}");
                    }
                    continue;
                },
            },
            None => receiver.recv().await,
        };
        let Some(command) = command else {
            break;
        };

        match command {
            Command::Edit(edit) => {
                session.apply(edit);
                deadline = Some(Instant::now() + delay);
                status.send_modify(|current| current.pending = true);
            },
            Command::SetState(state, ack) => {
                deadline = None;
                let result = match state {
                    ArticleState::Published => session.publish().await,
                    ArticleState::Draft => session.unpublish().await,
                };
                report(&session, &status, result.as_ref().err());
                let _ = ack.send(result);
            },
            Command::Flush(ack) => {
                deadline = None;
                let _ = ack.send(run_cycle(&mut session, &status).await);
            },
        }
    }

    if deadline.is_some() {
        tracing::debug!("autosave closed with an unsaved edit; kept in local draft");
    }
    drop(session);
}

async fn run_cycle(
    session: &mut DraftSession,
    status: &watch::Sender<AutosaveStatus>,
) -> Result<(), ClientError> {
    status.send_modify(|current| current.phase = Phase::Saving);
    let result = session.save(None).await;
    report(session, status, result.as_ref().err());
    result
}

fn report(session: &DraftSession, status: &watch::Sender<AutosaveStatus>, error: Option<&ClientError>) {
    status.send_modify(|current| {
        current.phase = session.phase();
        current.article_id = session.article_id().map(str::to_string);
        current.pending = false;
        current.cycles += 1;
        current.last_error = error.map(ClientError::save_notice);
    });
}

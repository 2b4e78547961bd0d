use std::future::Future;

use chrono::Utc;
use parking_lot::Mutex;

use crate::{
    api::Api,
    collection::{Collection, Record},
    model::{NewNote, NewTask, Note, NoteChanges, RowId, Summary, Task, TaskChanges, User, UserId},
    session::SessionStore,
    Error, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Changes live in memory only and are lost with the session.
    Guest,
    Authenticated(UserId),
}

impl Mode {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Mode::Guest => None,
            Mode::Authenticated(user_id) => Some(*user_id),
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Mode::Guest)
    }
}

struct State {
    mode: Mode,
    /// Bumped on every mode switch; completions from an older epoch are dropped.
    epoch: u64,
    notes: Collection<Note>,
    tasks: Collection<Task>,
    last_local_id: RowId,
}

impl State {
    fn switch(&mut self, mode: Mode) {
        self.mode = mode;
        self.epoch += 1;
        self.notes.clear();
        self.tasks.clear();
    }

    /// Epoch millis, bumped past the previous id when two creates share a millisecond.
    fn next_local_id(&mut self) -> RowId {
        let now = Utc::now().timestamp_millis();
        self.last_local_id = now.max(self.last_local_id + 1);
        self.last_local_id
    }
}

trait Cached: Record + Send + 'static {
    const KIND: &'static str;

    fn collection(state: &mut State) -> &mut Collection<Self>;
}

impl Cached for Note {
    const KIND: &'static str = "note";

    fn collection(state: &mut State) -> &mut Collection<Self> {
        &mut state.notes
    }
}

impl Cached for Task {
    const KIND: &'static str = "task";

    fn collection(state: &mut State) -> &mut Collection<Self> {
        &mut state.tasks
    }
}

/// Session-scoped cache of the current user's notes and tasks.
///
/// As a guest every change stays in memory. Once authenticated every change is applied
/// optimistically, sent to the server, then either replaced by the server's row or undone.
/// The state lock is never held across a request, so unrelated changes may be in flight together.
pub struct DataSync<A, S> {
    api: A,
    session: S,
    state: Mutex<State>,
}

impl<A: Api, S: SessionStore> DataSync<A, S> {
    pub fn new(api: A, session: S) -> Self {
        Self {
            api,
            session,
            state: Mutex::new(State {
                mode: Mode::Guest,
                epoch: 0,
                notes: Collection::default(),
                tasks: Collection::default(),
                last_local_id: 0,
            }),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Picks the mode from the persisted session and loads the user's rows if there is one.
    pub async fn start(&self) -> Result<Mode> {
        let mode = match self.session.load()? {
            Some(user_id) => Mode::Authenticated(user_id),
            None => Mode::Guest,
        };

        self.state.lock().switch(mode);
        if !mode.is_guest() {
            self.load().await;
        }

        Ok(mode)
    }

    pub async fn signup(&self, full_name: &str, email: &str, password: &str) -> Result<()> {
        self.api.signup(full_name, email, password).await
    }

    /// Guest rows are discarded, not uploaded.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserId> {
        let user_id = self.api.login(email, password).await?;
        self.session.save(user_id)?;
        self.state.lock().switch(Mode::Authenticated(user_id));
        tracing::info!(user_id, "signed in");

        self.load().await;
        Ok(user_id)
    }

    pub fn logout(&self) -> Result<()> {
        self.state.lock().switch(Mode::Guest);
        self.session.clear()?;
        tracing::info!("signed out");
        Ok(())
    }

    /// Replaces both collections with the server's. Guests have nothing to reload.
    pub async fn reload(&self) -> Result<()> {
        let (user_id, epoch) = {
            let state = self.state.lock();
            match state.mode {
                Mode::Guest => return Ok(()),
                Mode::Authenticated(user_id) => (user_id, state.epoch),
            }
        };

        let (notes, tasks) = tokio::try_join!(self.api.fetch_notes(user_id), self.api.fetch_tasks(user_id))?;

        let mut state = self.state.lock();
        if state.epoch != epoch {
            tracing::debug!(user_id, "discarding rows loaded for a previous session");
            return Ok(());
        }
        tracing::debug!(user_id, notes = notes.len(), tasks = tasks.len(), "rows loaded");
        state.notes.replace_all(notes);
        state.tasks.replace_all(tasks);
        Ok(())
    }

    /// [`Self::reload`] whose failure leaves the cache as it was.
    async fn load(&self) {
        if let Err(error) = self.reload().await {
            tracing::error!("failed to load notes and tasks: {error}");
        }
    }

    pub fn mode(&self) -> Mode {
        self.state.lock().mode
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.rows().to_vec()
    }

    pub fn notes(&self) -> Vec<Note> {
        self.state.lock().notes.rows().to_vec()
    }

    pub async fn summary(&self) -> Result<Summary> {
        let user_id = {
            let state = self.state.lock();
            match state.mode {
                Mode::Guest => return Ok(Summary::from_tasks(state.tasks.rows(), Utc::now())),
                Mode::Authenticated(user_id) => user_id,
            }
        };
        self.api.summary(user_id).await
    }

    pub async fn profile(&self) -> Result<User> {
        let user_id = self.mode().user_id().ok_or(Error::NotAuthenticated)?;
        self.api.user(user_id).await
    }

    pub async fn reset_password(&self, old_password: &str, new_password: &str) -> Result<()> {
        let user_id = self.mode().user_id().ok_or(Error::NotAuthenticated)?;
        self.api.reset_password(user_id, old_password, new_password).await
    }

    pub async fn create_task(&self, task: NewTask) -> Result<Task> {
        if task.title.trim().is_empty() {
            return Err(Error::Invalid("Title is required".into()));
        }
        let id = self.state.lock().next_local_id();

        self.apply(
            id,
            |tasks: &mut Collection<Task>, user_id| {
                let row = task.into_task(id, user_id, Utc::now());
                tasks.push_back(row.clone());
                Ok(row)
            },
            |draft| async move { self.api.create_task(&draft).await.map(Some) },
        )
        .await
    }

    pub async fn update_task(&self, id: RowId, changes: TaskChanges) -> Result<Task> {
        if changes.is_empty() {
            return Err(Error::Invalid("No valid fields to update".into()));
        }
        let body = &changes;

        self.apply(
            id,
            |tasks: &mut Collection<Task>, _| tasks.update(id, |task| changes.apply(task)).ok_or_else(task_not_found),
            |_| async move { self.api.update_task(id, body).await.map(Some) },
        )
        .await
    }

    pub async fn toggle_task_complete(&self, id: RowId) -> Result<Task> {
        self.apply(
            id,
            |tasks: &mut Collection<Task>, _| {
                tasks
                    .update(id, |task| task.completed = !task.completed)
                    .ok_or_else(task_not_found)
            },
            |task| async move {
                let changes = TaskChanges {
                    completed: Some(task.completed),
                    ..Default::default()
                };
                self.api.update_task(id, &changes).await.map(Some)
            },
        )
        .await
    }

    pub async fn toggle_task_pin(&self, id: RowId) -> Result<Task> {
        self.apply(
            id,
            |tasks: &mut Collection<Task>, _| {
                tasks
                    .update(id, |task| task.is_pinned = !task.is_pinned)
                    .ok_or_else(task_not_found)
            },
            |task| async move {
                let changes = TaskChanges {
                    is_pinned: Some(task.is_pinned),
                    ..Default::default()
                };
                self.api.update_task(id, &changes).await.map(Some)
            },
        )
        .await
    }

    /// Returns the removed row.
    pub async fn delete_task(&self, id: RowId) -> Result<Task> {
        self.apply(
            id,
            |tasks: &mut Collection<Task>, _| tasks.remove(id).ok_or_else(task_not_found),
            |_| async move { already_gone(self.api.delete_task(id).await) },
        )
        .await
    }

    pub async fn create_note(&self, note: NewNote) -> Result<Note> {
        if note.title.trim().is_empty() && note.content.trim().is_empty() {
            return Err(Error::Invalid("Note is empty".into()));
        }
        let id = self.state.lock().next_local_id();

        self.apply(
            id,
            |notes: &mut Collection<Note>, user_id| {
                let row = note.into_note(id, user_id, Utc::now());
                notes.push_front(row.clone());
                Ok(row)
            },
            |draft| async move { self.api.create_note(&draft).await.map(Some) },
        )
        .await
    }

    pub async fn update_note(&self, id: RowId, changes: NoteChanges) -> Result<Note> {
        if changes.is_empty() {
            return Err(Error::Invalid("No valid fields to update".into()));
        }
        let body = &changes;

        self.apply(
            id,
            |notes: &mut Collection<Note>, _| notes.update(id, |note| changes.apply(note)).ok_or_else(note_not_found),
            |_| async move { self.api.update_note(id, body).await.map(Some) },
        )
        .await
    }

    pub async fn toggle_note_pin(&self, id: RowId) -> Result<Note> {
        self.apply(
            id,
            |notes: &mut Collection<Note>, _| {
                notes
                    .update(id, |note| note.is_pinned = !note.is_pinned)
                    .ok_or_else(note_not_found)
            },
            |note| async move {
                let changes = NoteChanges {
                    is_pinned: Some(note.is_pinned),
                    ..Default::default()
                };
                self.api.update_note(id, &changes).await.map(Some)
            },
        )
        .await
    }

    pub async fn delete_note(&self, id: RowId) -> Result<Note> {
        self.apply(
            id,
            |notes: &mut Collection<Note>, _| notes.remove(id).ok_or_else(note_not_found),
            |_| async move { already_gone(self.api.delete_note(id).await) },
        )
        .await
    }

    /// Runs `local` against the cache, then `remote` when authenticated.
    ///
    /// `remote` receives the optimistic row and answers with the server's row, or `None` once
    /// the row no longer exists. Failures restore the last known-good state of `id`.
    /// Placeholders whose create is still in flight are refused.
    async fn apply<T, L, R, F>(&self, id: RowId, local: L, remote: R) -> Result<T>
    where
        T: Cached,
        L: FnOnce(&mut Collection<T>, Option<UserId>) -> Result<T>,
        R: FnOnce(T) -> F,
        F: Future<Output = Result<Option<T>>>,
    {
        let (row, epoch) = {
            let mut state = self.state.lock();
            let (mode, epoch) = (state.mode, state.epoch);
            let collection = T::collection(&mut *state);

            if !mode.is_guest() && collection.is_creating(id) {
                return Err(Error::Invalid(format!("The {} is still being saved", T::KIND)));
            }

            let snapshot = collection.snapshot(id);
            let row = local(collection, mode.user_id())?;
            if mode.is_guest() {
                return Ok(row);
            }

            collection.track(id, snapshot);
            (row, epoch)
        };

        let outcome = remote(row.clone()).await;

        let mut state = self.state.lock();
        if state.epoch != epoch {
            tracing::debug!(kind = T::KIND, id, "discarding result from a previous session");
            return outcome.map(|confirmed| confirmed.unwrap_or(row));
        }

        let collection = T::collection(&mut *state);
        match outcome {
            Ok(confirmed) => {
                collection.commit(id, confirmed.clone());
                Ok(confirmed.unwrap_or(row))
            }
            Err(error) => {
                collection.rollback(id);
                tracing::error!(kind = T::KIND, id, "change rolled back: {error}");
                Err(error)
            }
        }
    }
}

fn task_not_found() -> Error {
    Error::NotFound("Task not found".into())
}

fn note_not_found() -> Error {
    Error::NotFound("Note not found".into())
}

/// A delete answered with "not found" has the outcome the caller asked for.
fn already_gone<T>(result: Result<()>) -> Result<Option<T>> {
    match result {
        Ok(()) => Ok(None),
        Err(error) if error.is_not_found() => {
            tracing::debug!("row was already deleted: {error}");
            Ok(None)
        }
        Err(error) => Err(error),
    }
}

//! This module keeps the displayed task list in sync with the server
//!
//! A [`Provider`] is the single owner of everything the UI displays: the tasks fetched from the server, where they live on the server,
//! which parents are collapsed, and the resulting rows.
//! Network requests run in background tasks; their results are applied by the provider itself, so that the displayed state is always
//! replaced as a whole and never modified while being read.
//!
//! The UI can either call the provider directly, or move it into its own task with [`Provider::spawn`] and send it [`Command`]s.

use std::future::Future;
use std::sync::Arc;

use chrono::Local;
use tokio::sync::{mpsc, watch};

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::href_index::HrefIndex;
use crate::item::TaskId;
use crate::resource::Resource;
use crate::task::{Task, TaskFields};
use crate::traits::DavTransport;
use crate::tree::{self, CollapseState, RenderRow, TreePolicy};

pub mod sync_progress;
use sync_progress::{FeedbackReceiver, FeedbackSender, SyncEvent, SyncProgress};

type FetchOutcome = Result<Vec<u8>>;

/// Whether a listing request is in flight.
///
/// Failures are reported with a [`SyncEvent::Failed`] and the provider goes straight back to `Idle`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Syncing,
}

/// The outcome of a command that touches several tasks
#[derive(Debug, Default)]
pub struct MutationReport {
    pub succeeded: Vec<TaskId>,
    pub failures: Vec<(TaskId, Error)>,
}

impl MutationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}


/// Keeps a local view of a CalDAV task collection, and pushes local changes to it
pub struct Provider<T: DavTransport> {
    transport: Arc<T>,
    collection: Resource,
    cache: Option<Cache>,
    policy: TreePolicy,

    state: SyncState,
    /// Whether no task list has been loaded yet. The first load collapses every parent
    first_load: bool,
    tasks: Vec<Task>,
    href_index: HrefIndex,
    collapsed: CollapseState,
    rows: Vec<RenderRow>,

    fetch_sender: mpsc::UnboundedSender<FetchOutcome>,
    fetch_receiver: mpsc::UnboundedReceiver<FetchOutcome>,
    feedback: FeedbackSender,
    rows_sender: watch::Sender<Vec<RenderRow>>,
    rows_receiver: watch::Receiver<Vec<RenderRow>>,
}

impl<T: DavTransport> Provider<T> {
    /// Create a provider. This does not start a connection
    pub fn new(transport: T, collection: Resource) -> Self {
        let (fetch_sender, fetch_receiver) = mpsc::unbounded_channel();
        let (feedback, _) = sync_progress::feedback_channel();
        let (rows_sender, rows_receiver) = watch::channel(Vec::new());
        Self {
            transport: Arc::new(transport),
            collection,
            cache: None,
            policy: TreePolicy::default(),
            state: SyncState::Idle,
            first_load: true,
            tasks: Vec::new(),
            href_index: HrefIndex::new(),
            collapsed: CollapseState::new(),
            rows: Vec::new(),
            fetch_sender,
            fetch_receiver,
            feedback,
            rows_sender,
            rows_receiver,
        }
    }

    /// Keep a copy of every fetched listing in this cache
    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_policy(mut self, policy: TreePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> SyncState { self.state }
    pub fn rows(&self) -> &[RenderRow] { &self.rows }
    pub fn tasks(&self) -> &[Task] { &self.tasks }
    pub fn href_index(&self) -> &HrefIndex { &self.href_index }
    pub fn collapse_state(&self) -> &CollapseState { &self.collapsed }
    pub fn collection(&self) -> &Resource { &self.collection }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    /// Listen to status changes ("Connecting...", errors, etc.)
    pub fn subscribe_status(&self) -> FeedbackReceiver {
        self.feedback.subscribe()
    }

    /// Listen to changes of the displayed rows
    pub fn subscribe_rows(&self) -> watch::Receiver<Vec<RenderRow>> {
        self.rows_receiver.clone()
    }

    fn progress(&self) -> SyncProgress {
        SyncProgress::new_with_feedback_channel(self.feedback.clone())
    }

    /// Display the listing saved by a previous run, if any.
    ///
    /// Returns whether something has been loaded
    pub fn load_cached(&mut self) -> Result<bool> {
        let payload = match self.cache.as_ref().map(|cache| cache.load()).transpose()?.flatten() {
            None => return Ok(false),
            Some(payload) => payload,
        };
        self.apply_payload(payload, false)?;
        log::info!("Loaded {} tasks from the cache", self.tasks.len());
        Ok(true)
    }


    /// Start fetching the task list in the background.
    ///
    /// This does nothing (and returns `false`) if a sync is already running: the request is dropped, not queued.
    /// The result is applied by [`Self::wait_for_sync`] (or by the command loop, see [`Self::spawn`]).
    ///
    /// This must be called from within a Tokio runtime.
    pub fn sync_now(&mut self) -> bool {
        if self.state == SyncState::Syncing {
            log::debug!("A sync is already running, ignoring this request");
            return false;
        }
        self.state = SyncState::Syncing;
        self.progress().feedback(SyncEvent::Connecting);

        let transport = Arc::clone(&self.transport);
        let collection = self.collection.clone();
        let sender = self.fetch_sender.clone();
        tokio::spawn(async move {
            let outcome = transport.fetch(&collection).await;
            // The provider may have been dropped in the meantime
            let _ = sender.send(outcome);
        });
        true
    }

    /// Wait for the running sync (if any) to finish, and apply its result
    pub async fn wait_for_sync(&mut self) -> Result<()> {
        if self.state != SyncState::Syncing {
            return Ok(());
        }
        match self.fetch_receiver.recv().await {
            Some(outcome) => self.finish_sync(outcome),
            None => {
                self.state = SyncState::Idle;
                Err(Error::Network("the sync worker has stopped".to_string()))
            },
        }
    }

    /// Fetch the task list, and wait for it to be displayed
    pub async fn sync(&mut self) -> Result<()> {
        self.sync_now();
        self.wait_for_sync().await
    }

    fn finish_sync(&mut self, outcome: FetchOutcome) -> Result<()> {
        self.state = SyncState::Idle;
        let mut progress = self.progress();

        match outcome.and_then(|payload| self.apply_payload(payload, true)) {
            Ok(()) => {
                progress.info(&format!("Sync ended, {} tasks", self.tasks.len()));
                progress.feedback(SyncEvent::Synced{ at: Local::now() });
                Ok(())
            },
            Err(err) => {
                // The previous rows stay displayed
                progress.error(&format!("Sync failed: {}", err));
                Err(err)
            },
        }
    }

    /// Replace the whole displayed state with the content of a listing
    fn apply_payload(&mut self, payload: Vec<u8>, save_to_cache: bool) -> Result<()> {
        let responses = crate::multistatus::parse(&payload)?;
        let href_index = HrefIndex::build(&responses, self.collection.url());
        let mut tasks = crate::ical::decode_responses(&responses);
        for task in tasks.iter_mut() {
            task.set_server_location(href_index.get(task.id()).cloned());
        }
        log::debug!("Decoded {} tasks, {} known locations", tasks.len(), href_index.len());

        if save_to_cache {
            if let Some(cache) = &self.cache {
                if let Err(err) = cache.save(&payload) {
                    log::warn!("Unable to save the cache to {:?}: {}", cache.path(), err);
                }
            }
        }

        self.tasks = tasks;
        self.href_index = href_index;
        if self.first_load {
            self.collapsed.collapse_all(tree::parent_ids(&self.tasks, self.policy));
            self.first_load = false;
        }
        self.render();
        Ok(())
    }

    fn render(&mut self) {
        let rows = tree::reconcile(&self.tasks, &self.collapsed, self.policy);
        self.rows = rows.clone();
        // We keep a receiver, this cannot fail
        let _ = self.rows_sender.send(rows);
    }


    /// Show or hide the children of a task. This does not involve the server.
    ///
    /// Returns whether the task is now collapsed
    pub fn toggle_collapse(&mut self, id: &TaskId) -> bool {
        let collapsed = self.collapsed.toggle(id);
        self.render();
        collapsed
    }

    /// Create a task on the server, then start a sync
    pub async fn add_task(&mut self, fields: TaskFields) -> Result<TaskId> {
        self.validate(&fields)?;
        let result = self.submit_create(fields).await;
        self.resync_after_change();
        result
    }

    /// Update a task on the server, then start a sync
    pub async fn edit_task(&mut self, id: &TaskId, fields: TaskFields) -> Result<()> {
        self.validate(&fields)?;
        let result = self.submit_update(id, fields).await;
        self.resync_after_change();
        result
    }

    /// Delete tasks from the server, then start a sync.
    ///
    /// Only these very tasks are deleted. Their children (if any) will show up as top-level tasks after the sync
    pub async fn delete_tasks(&mut self, ids: &[TaskId]) -> MutationReport {
        let report = self.submit_delete(ids).await;
        self.resync_after_change();
        report
    }

    fn resync_after_change(&mut self) {
        if self.sync_now() == false {
            log::debug!("A sync started before this change is still running, the change may only be displayed after the next sync");
        }
    }

    fn validate(&self, fields: &TaskFields) -> Result<()> {
        fields.validate().map_err(|err| {
            self.progress().error(&err.to_string());
            err
        })
    }

    /// Upload a new task. It is created at a location derived from its ID
    pub async fn submit_create(&mut self, fields: TaskFields) -> Result<TaskId> {
        fields.validate()?;
        let task = Task::new(fields);
        let id = task.id().clone();
        let item = self.collection.with_url(self.collection.item_url(&id));

        self.push(&task, item).await.map_err(|err| {
            self.progress().error(&format!("Failed to add task to server: {}", err));
            err
        })?;
        Ok(id)
    }

    /// Upload a modified version of a known task
    pub async fn submit_update(&mut self, id: &TaskId, fields: TaskFields) -> Result<()> {
        fields.validate()?;
        let result = match self.task(id).cloned() {
            None => Err(Error::Lookup(id.clone())),
            Some(mut task) => {
                task.apply(fields);
                match self.href_index.locate(id) {
                    Err(err) => Err(err),
                    Ok(url) => {
                        let item = self.collection.with_url(url.clone());
                        self.push(&task, item).await
                    },
                }
            },
        };

        result.map_err(|err| {
            self.progress().error(&format!("Failed to update task {}: {}", id, err));
            err
        })
    }

    /// Delete tasks from the server. A failure does not prevent the other tasks from being deleted
    pub async fn submit_delete(&mut self, ids: &[TaskId]) -> MutationReport {
        let mut progress = self.progress();
        let mut report = MutationReport::default();

        for id in ids {
            let result = match self.href_index.locate(id) {
                Err(err) => Err(err),
                Ok(url) => {
                    let item = self.collection.with_url(url.clone());
                    let transport = Arc::clone(&self.transport);
                    in_background(async move { transport.delete(&item).await }).await
                },
            };

            match result {
                Ok(()) => {
                    progress.debug(&format!("Deleted task {}", id));
                    report.succeeded.push(id.clone());
                },
                Err(err) => {
                    progress.error(&format!("Failed to delete task {}: {}", id, err));
                    report.failures.push((id.clone(), err));
                },
            }
        }
        report
    }

    async fn push(&self, task: &Task, item: Resource) -> Result<()> {
        let ical = crate::ical::build_from(task);
        let transport = Arc::clone(&self.transport);
        in_background(async move { transport.put(&item, ical).await }).await
    }


    /// Move this provider into a background task, that executes the commands it receives in order.
    pub fn spawn(self) -> ProviderHandle {
        let (commands, receiver) = mpsc::unbounded_channel();
        let handle = ProviderHandle {
            commands,
            feedback: self.feedback.clone(),
            rows: self.subscribe_rows(),
        };
        tokio::spawn(self.run(receiver));
        handle
    }

    /// Execute commands until every sender is dropped.
    ///
    /// Listings requested by a command are applied as soon as they arrive, in between commands.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    None => break,
                    Some(command) => self.handle(command).await,
                },
                Some(outcome) = self.fetch_receiver.recv() => {
                    // Errors have already been reported
                    let _ = self.finish_sync(outcome);
                },
            }
        }
        log::debug!("Command channel closed, stopping");
    }

    async fn handle(&mut self, command: Command) {
        log::debug!("Handling {:?}", command);
        match command {
            Command::SyncNow => { self.sync_now(); },
            Command::ToggleCollapse(id) => { self.toggle_collapse(&id); },
            Command::AddTask(fields) => { let _ = self.add_task(fields).await; },
            Command::EditTask(id, fields) => { let _ = self.edit_task(&id, fields).await; },
            Command::DeleteTasks(ids) => { self.delete_tasks(&ids).await; },
        }
    }
}

/// Run a network request on a Tokio worker
async fn in_background<F>(request: F) -> Result<()>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    match tokio::spawn(request).await {
        Ok(result) => result,
        Err(err) => Err(Error::Network(format!("request aborted: {}", err))),
    }
}


/// What the UI can ask a spawned [`Provider`]
#[derive(Clone, Debug)]
pub enum Command {
    AddTask(TaskFields),
    EditTask(TaskId, TaskFields),
    DeleteTasks(Vec<TaskId>),
    ToggleCollapse(TaskId),
    SyncNow,
}

/// The UI side of a spawned [`Provider`]
#[derive(Clone, Debug)]
pub struct ProviderHandle {
    commands: mpsc::UnboundedSender<Command>,
    feedback: FeedbackSender,
    rows: watch::Receiver<Vec<RenderRow>>,
}

impl ProviderHandle {
    /// Queue a command. Returns `false` if the provider has stopped
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn sync_now(&self) -> bool {
        self.send(Command::SyncNow)
    }

    pub fn subscribe_status(&self) -> FeedbackReceiver {
        self.feedback.subscribe()
    }

    pub fn subscribe_rows(&self) -> watch::Receiver<Vec<RenderRow>> {
        self.rows.clone()
    }
}

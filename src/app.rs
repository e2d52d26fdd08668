use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use std::path::PathBuf;
use std::time::Instant;

use crate::config::AppConfig;
use crate::odm::monitor::{StatusMonitor, StatusUpdate};
use crate::odm::{OdmClient, TaskInfo, TaskStatus};
use crate::processing::{Preset, ProcessingOptions};

/// Oldest log lines are dropped past this
const MAX_LOG_LINES: usize = 500;

/// Seconds before a status message clears
const STATUS_MESSAGE_SECONDS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Tasks,
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Help,
    Confirm,
}

/// Destructive action waiting for y/n
#[derive(Debug, Clone, PartialEq)]
pub enum PendingAction {
    Stop(String),
    Delete(String),
}

pub struct App {
    pub section: Section,
    pub popup: Popup,

    pub config: AppConfig,
    client: OdmClient,
    pub connected: bool,

    // Task list (top section)
    pub tasks: Vec<TaskInfo>,
    pub selected_task: usize,

    // Watched task (status box)
    pub current_task: Option<String>,
    monitor: Option<StatusMonitor>,
    pub status_line: Option<String>,
    /// Some while the watched task is running
    pub progress: Option<u16>,

    // Processing options shown in the info line
    pub preset: Preset,
    pub options: ProcessingOptions,

    // Running narrative of actions and outcomes
    pub log_lines: Vec<String>,
    pub log_scroll: usize,

    pub pending_action: Option<PendingAction>,

    // Status message (shown in info line, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,
}

impl App {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let client = OdmClient::from_config(&config)?;
        let preset = config.default_preset.parse().unwrap_or(Preset::Default);
        let mut options = ProcessingOptions::default();
        preset.apply(&mut options);

        let mut app = Self {
            section: Section::Tasks,
            popup: Popup::None,

            config,
            client,
            connected: false,

            tasks: Vec::new(),
            selected_task: 0,

            current_task: None,
            monitor: None,
            status_line: None,
            progress: None,

            preset,
            options,

            log_lines: Vec::new(),
            log_scroll: 0,

            pending_action: None,

            status_message: None,
            status_message_time: None,
        };

        app.check_connection().await;
        if app.connected {
            app.refresh().await;
        }
        app.log(format!("✓ Applied {} preset configuration", app.preset));

        Ok(app)
    }

    /// Append to the activity log
    pub fn log(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!("{}", line);
        self.log_lines.push(line);
        if self.log_lines.len() > MAX_LOG_LINES {
            let excess = self.log_lines.len() - MAX_LOG_LINES;
            self.log_lines.drain(..excess);
        }
        self.log_scroll = 0;
    }

    /// Set a status message (auto-clears after 3 seconds)
    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    pub fn selected(&self) -> Option<&TaskInfo> {
        self.tasks.get(self.selected_task)
    }

    pub fn is_watching(&self) -> bool {
        self.monitor.is_some()
    }

    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Handle popups first
        if self.popup != Popup::None {
            return self.handle_popup_key(key).await;
        }

        // Handle normal key input
        self.handle_normal_key(key).await
    }

    async fn handle_normal_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Tab | KeyCode::BackTab => {
                self.section = match self.section {
                    Section::Tasks => Section::Log,
                    Section::Log => Section::Tasks,
                };
            }

            KeyCode::Char('j') | KeyCode::Down => self.move_down(),
            KeyCode::Char('k') | KeyCode::Up => self.move_up(),

            // Watch the selected task
            KeyCode::Enter | KeyCode::Char(' ') => {
                if self.section == Section::Tasks {
                    self.select_task();
                }
            }

            KeyCode::Char('s') => self.ask(PendingAction::Stop),
            KeyCode::Char('d') | KeyCode::Delete => self.ask(PendingAction::Delete),

            KeyCode::Char('o') => self.download_selected().await,

            KeyCode::Char('p') => self.cycle_preset(),

            KeyCode::Char('c') => {
                self.check_connection().await;
            }

            KeyCode::Char('R') | KeyCode::Char('r') => {
                self.refresh().await;
                self.set_status(format!("{} tasks", self.tasks.len()));
            }

            // Help (? or h)
            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,

            _ => {}
        }
        Ok(())
    }

    async fn handle_popup_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.popup {
            Popup::Help => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::Enter | KeyCode::Char('q')) {
                    self.popup = Popup::None;
                }
            }
            Popup::Confirm => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    self.popup = Popup::None;
                    self.confirm_action().await;
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    self.popup = Popup::None;
                    self.pending_action = None;
                }
                _ => {}
            },
            Popup::None => {}
        }
        Ok(())
    }

    fn move_down(&mut self) {
        match self.section {
            Section::Tasks => {
                if !self.tasks.is_empty() {
                    self.selected_task = (self.selected_task + 1) % self.tasks.len();
                }
            }
            Section::Log => {
                self.log_scroll = self.log_scroll.saturating_sub(1);
            }
        }
    }

    fn move_up(&mut self) {
        match self.section {
            Section::Tasks => {
                if !self.tasks.is_empty() {
                    self.selected_task = self.selected_task.checked_sub(1).unwrap_or(self.tasks.len() - 1);
                }
            }
            Section::Log => {
                if self.log_scroll + 1 < self.log_lines.len() {
                    self.log_scroll += 1;
                }
            }
        }
    }

    pub async fn check_connection(&mut self) {
        self.connected = self.client.test_connection().await;
        if self.connected {
            self.log(format!("Connected to ODM server at {}", self.client.base_url()));
        } else {
            self.log(format!("✗ Failed to connect to ODM server at {}", self.client.base_url()));
            self.set_status("Not connected (c to retry)");
        }
    }

    /// Reload the task list, keeping the selection on the same UUID when possible
    pub async fn refresh(&mut self) {
        let selected_uuid = self.selected().map(|t| t.uuid.clone());
        self.tasks = self.client.get_tasks().await;

        self.selected_task = selected_uuid
            .and_then(|uuid| self.tasks.iter().position(|t| t.uuid == uuid))
            .unwrap_or(0);

        let watched = self.monitor.as_ref().map(|m| m.uuid().to_string());
        if let Some(uuid) = watched {
            if !self.tasks.iter().any(|t| t.uuid == uuid) {
                self.log(format!("Task {} is no longer on the server, polling stopped", uuid));
                self.clear_watched();
            }
        }
    }

    /// Start polling the selected task, replacing any previous poller
    pub fn select_task(&mut self) {
        let Some(uuid) = self.selected().map(|t| t.uuid.clone()) else {
            return;
        };

        // Dropping the old monitor aborts its polling task
        self.monitor = Some(StatusMonitor::start(self.client.clone(), uuid.clone()));
        self.current_task = Some(uuid.clone());
        self.status_line = None;
        self.progress = None;
        self.set_status(format!("Watching {}", uuid));
    }

    fn stop_watching(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.stop();
        }
    }

    fn clear_watched(&mut self) {
        self.stop_watching();
        self.current_task = None;
        self.status_line = None;
        self.progress = None;
    }

    fn ask(&mut self, action: fn(String) -> PendingAction) {
        let Some(task) = self.selected() else {
            self.set_status("No task selected");
            return;
        };
        let uuid = task.uuid.clone();
        let pending = action(uuid.clone());
        let question = match pending {
            PendingAction::Stop(_) => format!("Stop task {}? (y/n)", uuid),
            PendingAction::Delete(_) => format!("Delete task {} and all its data? (y/n)", uuid),
        };
        self.pending_action = Some(pending);
        self.set_status(question);
        self.popup = Popup::Confirm;
    }

    async fn confirm_action(&mut self) {
        match self.pending_action.take() {
            Some(PendingAction::Stop(uuid)) => {
                if self.client.cancel_task(&uuid).await {
                    self.log(format!("✓ Task {} stopped successfully", uuid));
                    let watched = self.current_task.as_deref() == Some(uuid.as_str());
                    if watched {
                        self.stop_watching();
                        self.progress = None;
                    }
                    self.refresh().await;
                    if watched {
                        self.status_line = self
                            .tasks
                            .iter()
                            .find(|t| t.uuid == uuid)
                            .map(TaskInfo::status_line);
                    }
                } else {
                    self.log(format!("✗ Failed to stop task {}", uuid));
                }
            }
            Some(PendingAction::Delete(uuid)) => {
                if self.client.delete_task(&uuid).await {
                    self.log(format!("✓ Task {} deleted successfully", uuid));
                    if self.current_task.as_deref() == Some(uuid.as_str()) {
                        self.clear_watched();
                    }
                    self.refresh().await;
                } else {
                    self.log(format!("✗ Failed to delete task {}", uuid));
                }
            }
            None => {}
        }
    }

    async fn download_selected(&mut self) {
        let Some(uuid) = self.selected().map(|t| t.uuid.clone()) else {
            self.set_status("No task selected");
            return;
        };
        let output = PathBuf::from(format!("{}.zip", uuid));
        self.log(format!("Downloading results to {}...", output.display()));
        if self.client.download_results(&uuid, &output).await {
            self.log("Download completed!");
        } else {
            self.log("Download failed.");
        }
    }

    fn cycle_preset(&mut self) {
        self.preset = self.preset.next();
        if self.preset.apply(&mut self.options) {
            self.log(format!("✓ Applied {} preset configuration", self.preset));
        } else {
            self.set_status("Custom preset: options unchanged");
        }
    }

    /// Drain status updates from the poller
    fn apply_update(&mut self, update: StatusUpdate) {
        let info = match update {
            StatusUpdate::Snapshot(info) => info,
            StatusUpdate::Unavailable => {
                self.set_status("Task status unavailable");
                return;
            }
        };

        self.status_line = Some(info.status_line());
        match info.status {
            TaskStatus::Running => self.progress = Some(info.percent()),
            status if status.is_terminal() => self.progress = None,
            _ => {}
        }

        if let Some(task) = self.tasks.iter_mut().find(|t| t.uuid == info.uuid) {
            *task = info.clone();
        }

        if info.status.is_terminal() {
            let message = match info.status {
                TaskStatus::Completed => "✓ Processing completed successfully!".to_string(),
                TaskStatus::Failed => format!(
                    "✗ Processing failed! {}",
                    info.error_message.as_deref().unwrap_or("")
                ),
                _ => format!("Task {} was canceled", info.uuid),
            };
            self.log(message.trim_end().to_string());
            if self.config.notifications {
                let _ = crate::notify("odm-frontend", &info.status_line());
            }
            self.stop_watching();
        }
    }

    pub fn tick(&mut self) {
        // Checked before draining so no update sent before exit is lost
        let finished = self.monitor.as_ref().is_some_and(StatusMonitor::is_finished);

        let mut updates = Vec::new();
        if let Some(monitor) = self.monitor.as_mut() {
            while let Some(update) = monitor.try_next() {
                updates.push(update);
            }
        }
        for update in updates {
            self.apply_update(update);
        }
        if finished {
            self.stop_watching();
        }

        // Clear status message after 3 seconds
        if let Some(time) = self.status_message_time {
            if time.elapsed().as_secs() >= STATUS_MESSAGE_SECONDS {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }
}

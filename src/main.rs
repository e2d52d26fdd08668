mod app;
mod config;
mod gcp;
mod odm;
mod processing;
mod project;
mod ui;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::{App, Popup};
use config::AppConfig;
use gcp::{GcpList, GcpPoint};
use odm::monitor::{StatusMonitor, StatusUpdate};
use odm::results::{self, ProductSelection};
use odm::{OdmClient, TaskStatus};
use processing::Preset;
use project::ProjectFile;

#[derive(Parser, Debug)]
#[command(name = "odm-frontend")]
#[command(version = "0.1.0")]
#[command(about = "Stage drone imagery, submit it to NodeODM and collect the results")]
struct Args {
    /// NodeODM URL for this run (does not change the saved setting)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Access token for this run (does not change the saved setting)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save the server URL (and --token), then test the connection
    Connect { server: String },

    /// Check that the NodeODM server responds
    Test,

    /// List tasks on the server
    Tasks,

    /// Show the status of one task
    Info { uuid: String },

    /// Upload images and start processing
    Submit {
        /// Task name
        #[arg(short, long)]
        name: String,

        /// Processing preset (defaults to the configured one)
        #[arg(short, long, conflicts_with = "project")]
        preset: Option<String>,

        /// Take images, options and server settings from a project file
        #[arg(long)]
        project: Option<PathBuf>,

        /// GCP file uploaded alongside the images
        #[arg(long)]
        gcp: Option<PathBuf>,

        /// Return right after the task is created
        #[arg(long)]
        no_watch: bool,

        images: Vec<PathBuf>,
    },

    /// Poll a task every 3 seconds until it finishes
    Watch { uuid: String },

    /// Cancel a running task
    Cancel { uuid: String },

    /// Remove a task and all its data from the server
    Remove { uuid: String },

    /// Download all.zip of a task
    Download { uuid: String, output: PathBuf },

    /// Download, extract and copy out the products of a completed task
    Import {
        uuid: String,

        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        #[arg(long)]
        skip_orthophoto: bool,

        #[arg(long)]
        skip_dsm: bool,

        #[arg(long)]
        skip_dtm: bool,

        #[arg(long)]
        skip_point_cloud: bool,
    },

    /// Show the processing presets
    Presets,

    /// Create or inspect project files
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },

    /// Check and edit GCP files
    Gcp {
        #[command(subcommand)]
        command: GcpCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ProjectCommand {
    /// Write a new project file
    New {
        output: PathBuf,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long, default_value = "Default")]
        preset: String,

        #[arg(required = true)]
        images: Vec<PathBuf>,
    },

    /// Print a project file and the options it resolves to
    Show { path: PathBuf },
}

#[derive(Subcommand, Debug)]
enum GcpCommand {
    /// Parse a GCP file and report every rejected line
    Check { file: PathBuf },

    /// Append a point (creates the file if needed)
    #[command(allow_negative_numbers = true)]
    Add {
        file: PathBuf,
        #[command(flatten)]
        point: PointArgs,

        /// Projection for a new file
        #[arg(long)]
        projection: Option<String>,

        /// Rewrite the file even if some of its lines do not parse (they are dropped)
        #[arg(long)]
        force: bool,
    },

    /// Replace the values of a point, keeping its ID
    #[command(allow_negative_numbers = true)]
    Edit {
        file: PathBuf,
        id: usize,
        #[command(flatten)]
        point: PointArgs,

        #[arg(long)]
        force: bool,
    },

    /// Remove a point by ID; remaining points are renumbered
    Remove {
        file: PathBuf,
        id: usize,

        #[arg(long)]
        force: bool,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct PointArgs {
    world_x: f64,
    world_y: f64,
    world_z: f64,
    image_x: f64,
    image_y: f64,
    image: String,
    label: Option<String>,
}

impl PointArgs {
    fn to_point(&self) -> Result<GcpPoint> {
        let point = GcpPoint::checked(
            [self.world_x, self.world_y, self.world_z],
            [self.image_x, self.image_y],
            &self.image,
            self.label.as_deref(),
        )?;
        Ok(point)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (stderr keeps the TUI and piped output clean)
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = AppConfig::load()?;
    if let Some(url) = &args.url {
        config.base_url = config::normalize_url(url);
    }
    if let Some(token) = &args.token {
        config.token = token.clone();
    }

    let Some(command) = args.command else {
        return run_tui(config).await;
    };

    match command {
        Command::Connect { server } => {
            let token = args.token.clone().unwrap_or_default();
            connect(&mut config, &server, &token).await
        }
        Command::Test => test_connection(&config).await,
        Command::Tasks => list_tasks(&config).await,
        Command::Info { uuid } => task_info(&config, &uuid).await,
        Command::Submit {
            name,
            preset,
            project,
            gcp,
            no_watch,
            images,
        } => {
            let request = SubmitRequest {
                name,
                preset,
                project,
                gcp,
                images,
            };
            let uuid = submit(&mut config, request).await?;
            if no_watch {
                Ok(())
            } else {
                watch(&config, &uuid).await
            }
        }
        Command::Watch { uuid } => watch(&config, &uuid).await,
        Command::Cancel { uuid } => {
            let client = OdmClient::from_config(&config)?;
            if !client.cancel_task(&uuid).await {
                bail!("Failed to stop task {}", uuid);
            }
            println!("✓ Task {} stopped", uuid);
            Ok(())
        }
        Command::Remove { uuid } => {
            let client = OdmClient::from_config(&config)?;
            if !client.delete_task(&uuid).await {
                bail!("Failed to delete task {}", uuid);
            }
            println!("✓ Task {} deleted", uuid);
            Ok(())
        }
        Command::Download { uuid, output } => {
            let client = OdmClient::from_config(&config)?;
            println!("Downloading results to {}...", output.display());
            if !client.download_results(&uuid, &output).await {
                bail!("Download failed");
            }
            println!("Download completed!");
            Ok(())
        }
        Command::Import {
            uuid,
            out,
            skip_orthophoto,
            skip_dsm,
            skip_dtm,
            skip_point_cloud,
        } => {
            let selection = ProductSelection {
                orthophoto: !skip_orthophoto,
                dsm: !skip_dsm,
                dtm: !skip_dtm,
                point_cloud: !skip_point_cloud,
            };
            import(&config, &uuid, selection, &out).await
        }
        Command::Presets => {
            print_presets();
            Ok(())
        }
        Command::Project { command } => project_command(&config, command),
        Command::Gcp { command } => gcp_command(command),
    }
}

async fn connect(config: &mut AppConfig, server: &str, token: &str) -> Result<()> {
    if server.trim().is_empty() {
        bail!("Please enter a URL for the ODM server");
    }
    config.set_credentials(server, token)?;
    test_connection(config).await
}

async fn test_connection(config: &AppConfig) -> Result<()> {
    let client = OdmClient::from_config(config)?;
    if client.test_connection().await {
        println!("Successfully connected to ODM server at {}", client.base_url());
        Ok(())
    } else {
        bail!(
            "Failed to connect to ODM server at {}. Check that the URL is correct \
             (e.g. http://localhost:3000), the server is running and no firewall blocks it",
            client.base_url()
        )
    }
}

async fn list_tasks(config: &AppConfig) -> Result<()> {
    let client = OdmClient::from_config(config)?;
    let tasks = client.get_tasks().await;
    if tasks.is_empty() {
        println!("No tasks on {}", client.base_url());
    }
    for task in &tasks {
        println!("{}", task.list_line());
    }
    Ok(())
}

async fn task_info(config: &AppConfig, uuid: &str) -> Result<()> {
    let client = OdmClient::from_config(config)?;
    let info = client
        .get_task_info(uuid)
        .await
        .with_context(|| format!("Could not get information for task {}", uuid))?;

    println!("{}", info.status_line());
    println!("  uuid:   {}", info.uuid);
    println!("  code:   {}", info.status.code());
    if let Some(count) = info.images_count {
        println!("  images: {}", count);
    }
    if let Some(message) = &info.error_message {
        println!("  error:  {}", message);
    }
    Ok(())
}

struct SubmitRequest {
    name: String,
    preset: Option<String>,
    project: Option<PathBuf>,
    gcp: Option<PathBuf>,
    images: Vec<PathBuf>,
}

async fn submit(config: &mut AppConfig, request: SubmitRequest) -> Result<String> {
    let (mut images, options) = match &request.project {
        Some(path) => {
            let project = ProjectFile::load(path)?;
            for missing in project.missing_images() {
                eprintln!("⚠ Image not found: {}", missing.display());
            }
            if project.apply_settings(config)? {
                tracing::info!("Using server settings from project '{}'", project.name);
            }
            let mut images = project.images.clone();
            images.extend(request.images.iter().cloned());
            (images, project.effective_options())
        }
        None => {
            let preset_name = request.preset.as_deref().unwrap_or(&config.default_preset);
            let preset: Preset = preset_name.parse()?;
            let mut options = processing::ProcessingOptions::default();
            preset.apply(&mut options);
            (request.images.clone(), options)
        }
    };

    if images.is_empty() {
        bail!("Please add images first");
    }

    if let Some(gcp_path) = &request.gcp {
        let parsed = gcp::load(gcp_path)?;
        for error in &parsed.errors {
            eprintln!("⚠ {}", error);
        }
        if parsed.list.is_empty() {
            bail!("No valid GCP points were found in {}", gcp_path.display());
        }
        println!(
            "Attaching {} GCP points (projection {})",
            parsed.list.len(),
            parsed.list.projection_or_default()
        );
        images.push(gcp_path.clone());
    }

    let client = OdmClient::from_config(config)?;
    println!("Creating task \"{}\" with {} files...", request.name, images.len());
    let task = client
        .create_task(&images, &options.to_task_options(), Some(&request.name))
        .await
        .context(
            "Failed to create task. Check that the NodeODM server is running, \
             the images are valid drone photos and the server has enough resources",
        )?;

    println!("Task \"{}\" created successfully! Task ID: {}", request.name, task.uuid);
    Ok(task.uuid)
}

async fn watch(config: &AppConfig, uuid: &str) -> Result<()> {
    let client = OdmClient::from_config(config)?;
    let mut monitor = StatusMonitor::start(client, uuid);
    let mut last = None;

    while let Some(update) = monitor.next().await {
        match update {
            StatusUpdate::Snapshot(info) => {
                let line = info.status_line();
                if last.as_deref() != Some(line.as_str()) {
                    println!("{}", line);
                    last = Some(line);
                }
                if info.status.is_terminal() {
                    if config.notifications {
                        let _ = notify("odm-frontend", &info.status_line());
                    }
                    return match info.status {
                        TaskStatus::Completed => {
                            println!("✓ Processing completed successfully!");
                            Ok(())
                        }
                        TaskStatus::Failed => bail!(
                            "Processing failed: {}",
                            info.error_message.as_deref().unwrap_or("no details from server")
                        ),
                        _ => bail!("Task {} was canceled", uuid),
                    };
                }
            }
            StatusUpdate::Unavailable => {
                tracing::warn!("Status of {} unavailable, retrying", uuid);
            }
        }
    }
    Ok(())
}

async fn import(config: &AppConfig, uuid: &str, selection: ProductSelection, out: &Path) -> Result<()> {
    let client = OdmClient::from_config(config)?;
    let report = results::import_results(&client, uuid, selection, out).await?;

    for (product, path) in &report.imported {
        println!("✓ {} imported: {}", product.label(), path.display());
    }
    for product in &report.missing {
        if *product == results::Product::Dtm {
            println!("DTM file not found - make sure DTM generation was enabled during processing");
            println!("Available result directories: {:?}", report.available_dirs);
        } else {
            println!("{} not found in results", product.label());
        }
    }

    if report.imported.is_empty() {
        bail!("No valid result files found to import");
    }
    println!("Imported {} products to {}", report.imported.len(), out.display());
    Ok(())
}

fn print_presets() {
    for preset in Preset::ALL {
        match preset.options() {
            Some(options) => {
                println!("{}", preset);
                for line in options.summary() {
                    println!("  {}", line);
                }
            }
            None => println!("{}\n  keeps the current options", preset),
        }
    }
}

fn project_command(config: &AppConfig, command: ProjectCommand) -> Result<()> {
    match command {
        ProjectCommand::New {
            output,
            name,
            preset,
            images,
        } => {
            let preset: Preset = preset.parse()?;
            let project = ProjectFile::new(name.as_deref(), preset, images, config);
            project.save(&output)?;
            println!("Project saved to {}", output.display());
            Ok(())
        }
        ProjectCommand::Show { path } => {
            let project = ProjectFile::load(&path)?;
            println!("Project \"{}\" ({} preset)", project.name, project.preset);
            println!("Server: {}", project.odm_settings.base_url);
            println!("Images ({}):", project.images.len());
            let missing = project.missing_images();
            for image in &project.images {
                let marker = if missing.contains(&image.as_path()) { "⚠" } else { " " };
                println!("  {} {}", marker, image.display());
            }
            println!("Options:");
            for line in project.effective_options().summary() {
                println!("  {}", line);
            }
            Ok(())
        }
    }
}

fn gcp_command(command: GcpCommand) -> Result<()> {
    match command {
        GcpCommand::Check { file } => {
            let parsed = gcp::load(&file)?;
            for error in &parsed.errors {
                println!("✗ {}", error);
            }
            for point in parsed.list.points() {
                println!("{}", point);
            }
            if parsed.list.is_empty() {
                bail!("No valid GCP points were found in the file");
            }
            println!(
                "Loaded {} GCP points (Projection: {})",
                parsed.list.len(),
                parsed.list.projection_or_default()
            );
            Ok(())
        }
        GcpCommand::Add {
            file,
            point,
            projection,
            force,
        } => {
            let id = gcp_add(&file, point.to_point()?, projection.as_deref(), force)?;
            println!("GCP point {} added", id);
            Ok(())
        }
        GcpCommand::Edit { file, id, point, force } => {
            let previous = gcp_edit(&file, id, point.to_point()?, force)?;
            println!("GCP point {} updated (was {})", id, previous);
            Ok(())
        }
        GcpCommand::Remove { file, id, force } => {
            let remaining = gcp_remove(&file, id, force)?;
            println!("GCP point {} deleted, {} remaining", id, remaining);
            Ok(())
        }
    }
}

/// Load a GCP file that is about to be rewritten
///
/// Rewriting drops every line that did not parse, so that needs `force`.
fn load_for_edit(file: &Path, force: bool) -> Result<GcpList> {
    let parsed = gcp::load(file)?;
    if !parsed.errors.is_empty() {
        for error in &parsed.errors {
            eprintln!("✗ {}", error);
        }
        if !force {
            bail!(
                "{} has {} unreadable lines that would be lost; fix them or pass --force",
                file.display(),
                parsed.errors.len()
            );
        }
    }
    Ok(parsed.list)
}

fn gcp_add(file: &Path, point: GcpPoint, projection: Option<&str>, force: bool) -> Result<usize> {
    let mut list = if file.exists() {
        load_for_edit(file, force)?
    } else {
        match projection {
            Some(projection) => GcpList::with_projection(projection),
            None => GcpList::new(),
        }
    };
    let id = list.push(point);
    gcp::save(&list, file)?;
    Ok(id)
}

/// Returns the point as it was before the edit
fn gcp_edit(file: &Path, id: usize, point: GcpPoint, force: bool) -> Result<GcpPoint> {
    let mut list = load_for_edit(file, force)?;
    let previous = list
        .get(id)
        .cloned()
        .with_context(|| format!("No GCP point {} in {}", id, file.display()))?;
    list.update(id, point);
    gcp::save(&list, file)?;
    Ok(previous)
}

/// Returns the number of points left
fn gcp_remove(file: &Path, id: usize, force: bool) -> Result<usize> {
    let mut list = load_for_edit(file, force)?;
    if list.remove(id).is_none() {
        bail!("No GCP point {} in {}", id, file.display());
    }
    gcp::save(&list, file)?;
    Ok(list.len())
}

async fn run_tui(config: AppConfig) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state
    let mut app = App::new(config).await?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') if app.popup == Popup::None => return Ok(()),
                        KeyCode::Char('c') if key.modifiers.contains(event::KeyModifiers::CONTROL) => {
                            return Ok(())
                        }
                        _ => {
                            // Handle key and catch any errors to prevent crashes
                            if let Err(e) = app.handle_key(key).await {
                                app.log(format!("✗ {}", e));
                            }
                        }
                    }
                }
            }
        }

        app.tick();
    }
}

pub fn notify(summary: &str, body: &str) -> Result<()> {
    notify_rust::Notification::new()
        .summary(summary)
        .body(body)
        .icon("image-x-generic")
        .show()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odm::testutil::{spawn_stub, StubResponse};

    fn point(x: f64, image: &str, label: Option<&str>) -> GcpPoint {
        GcpPoint::new([x, 2.0, 3.0], [4.0, 5.0], image, label)
    }

    fn config_for(url: String) -> AppConfig {
        AppConfig {
            base_url: url,
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_preset_conflicts_with_project() {
        let with_both = Args::try_parse_from([
            "odm-frontend", "submit", "--name", "Survey", "--project", "survey.odm", "--preset", "Default",
        ]);
        assert!(with_both.is_err());

        let project_only = Args::try_parse_from([
            "odm-frontend", "submit", "--name", "Survey", "--project", "survey.odm", "extra.jpg",
        ]);
        assert!(project_only.is_ok());
    }

    #[test]
    fn test_gcp_edit_accepts_negative_coordinates() {
        let args = Args::try_parse_from([
            "odm-frontend", "gcp", "edit", "gcp_list.txt", "2", "-122.5", "45.25", "-3", "10", "20", "IMG_1.jpg",
        ])
        .unwrap();
        match args.command {
            Some(Command::Gcp {
                command: GcpCommand::Edit { id, point, force, .. },
            }) => {
                assert_eq!(id, 2);
                assert_eq!(point.world_x, -122.5);
                assert_eq!(point.world_z, -3.0);
                assert_eq!(point.label, None);
                assert!(!force);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_point_args_reject_whitespace() {
        let args = PointArgs {
            world_x: 1.0,
            world_y: 2.0,
            world_z: 3.0,
            image_x: 4.0,
            image_y: 5.0,
            image: "IMG_0525.jpg".to_string(),
            label: Some("North corner".to_string()),
        };
        assert!(args.to_point().is_err());
    }

    #[test]
    fn test_gcp_add_creates_file_with_projection() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("gcp_list.txt");

        assert_eq!(gcp_add(&file, point(1.0, "a.jpg", Some("GCP01")), Some("EPSG:32612"), false).unwrap(), 1);
        assert_eq!(gcp_add(&file, point(2.0, "b.jpg", None), Some("EPSG:4326"), false).unwrap(), 2);

        let content = std::fs::read_to_string(&file).unwrap();
        assert_eq!(content.lines().next(), Some("EPSG:32612"));
        let parsed = gcp::load(&file).unwrap();
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.list.len(), 2);
        assert_eq!(parsed.list.get(2).unwrap().filename, "b.jpg");
    }

    #[test]
    fn test_gcp_rewrite_keeps_unreadable_lines_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("gcp_list.txt");
        let original = "EPSG:4326\n1 2 3 4 5 a.jpg\n544256.7 5320919.9 5 IMG_0525.jpg\n";
        std::fs::write(&file, original).unwrap();

        assert!(gcp_add(&file, point(9.0, "c.jpg", None), None, false).is_err());
        assert!(gcp_edit(&file, 1, point(9.0, "c.jpg", None), false).is_err());
        assert!(gcp_remove(&file, 1, false).is_err());
        assert_eq!(std::fs::read_to_string(&file).unwrap(), original);

        assert_eq!(gcp_add(&file, point(9.0, "c.jpg", None), None, true).unwrap(), 2);
        assert!(!std::fs::read_to_string(&file).unwrap().contains("IMG_0525.jpg"));
    }

    #[test]
    fn test_gcp_edit_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("gcp_list.txt");
        for (x, image) in [(1.0, "a.jpg"), (2.0, "b.jpg"), (3.0, "c.jpg")] {
            gcp_add(&file, point(x, image, None), None, false).unwrap();
        }

        let previous = gcp_edit(&file, 2, point(20.0, "b2.jpg", Some("moved")), false).unwrap();
        assert_eq!(previous.filename, "b.jpg");
        let list = gcp::load(&file).unwrap().list;
        let edited = list.get(2).unwrap();
        assert_eq!(edited.id, 2);
        assert_eq!(edited.world_x, 20.0);
        assert_eq!(edited.label.as_deref(), Some("moved"));
        assert!(gcp_edit(&file, 7, point(0.0, "x.jpg", None), false).is_err());

        assert_eq!(gcp_remove(&file, 1, false).unwrap(), 2);
        let list = gcp::load(&file).unwrap().list;
        assert_eq!(list.get(1).unwrap().filename, "b2.jpg");
        assert!(gcp_remove(&file, 5, false).is_err());
    }

    #[tokio::test]
    async fn test_submit_merges_project_images_and_attaches_gcp() {
        let dir = tempfile::tempdir().unwrap();
        let from_project = dir.path().join("IMG_0001.jpg");
        let extra = dir.path().join("IMG_0002.jpg");
        let gcp_file = dir.path().join("gcp_list.txt");
        std::fs::write(&from_project, b"first").unwrap();
        std::fs::write(&extra, b"second").unwrap();
        std::fs::write(&gcp_file, "EPSG:32612\n1 2 3 4 5 IMG_0001.jpg GCP01\n").unwrap();

        let project = dir.path().join("survey.odm");
        let project_json = serde_json::json!({
            "name": "Survey",
            "preset": "Fast Orthophoto",
            "images": [from_project],
        });
        std::fs::write(&project, project_json.to_string()).unwrap();

        let url = spawn_stub(|req| {
            let ok = req.path() == "/task/new"
                && req.body.matches("name=\"images\"").count() == 3
                && req.body.contains("filename=\"IMG_0001.jpg\"")
                && req.body.contains("filename=\"IMG_0002.jpg\"")
                && req.body.contains("filename=\"gcp_list.txt\"")
                && req.body.contains(r#"{"name":"feature-quality","value":"low"}"#);
            if ok {
                StubResponse::json(r#"{"uuid":"task-1"}"#)
            } else {
                StubResponse::status(400, "unexpected upload")
            }
        })
        .await;

        let mut config = config_for(url);
        let request = SubmitRequest {
            name: "Survey".to_string(),
            preset: None,
            project: Some(project),
            gcp: Some(gcp_file),
            images: vec![extra],
        };
        assert_eq!(submit(&mut config, request).await.unwrap(), "task-1");
    }

    #[tokio::test]
    async fn test_submit_rejects_gcp_file_without_points() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("IMG_0001.jpg");
        let gcp_file = dir.path().join("gcp_list.txt");
        std::fs::write(&image, b"first").unwrap();
        std::fs::write(&gcp_file, "EPSG:4326\nGCP01 544256.7 5320919.9 5\n").unwrap();

        let url = spawn_stub(|_| StubResponse::json(r#"{"uuid":"task-1"}"#)).await;
        let mut config = config_for(url);

        let request = SubmitRequest {
            name: "Survey".to_string(),
            preset: Some("Default".to_string()),
            project: None,
            gcp: Some(gcp_file),
            images: vec![image],
        };
        assert!(submit(&mut config, request).await.is_err());

        let empty = SubmitRequest {
            name: "Survey".to_string(),
            preset: None,
            project: None,
            gcp: None,
            images: Vec::new(),
        };
        assert!(submit(&mut config, empty).await.is_err());
    }
}

//! Terminal sandbox — the attendance app's pages simulated on a
//! [`HeadlessPage`], driven by typed commands.
//!
//! The sandbox stands in for the host application: it lays out each page's
//! elements, follows redirects, and decides whether the start page asks for
//! the tour (the server's check is approximated by the local completion flag).

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::overlay::{HeadlessPage, ModalView, PageSurface, Rect, Viewport};
use crate::tour::cursor::PersistedCursor;
use crate::tour::events::{AttendancePayload, DomainEvent, EventKind};
use crate::tour::host::{StartOutcome, TourHost};
use crate::tour::navigation::Page;

// ── Page layouts ────────────────────────────────────────────────────

/// Populate `page` with the elements of the page at its current path.
pub fn lay_out(page: &HeadlessPage) {
    let path = page.path();
    let width = page.viewport().width;

    let nav = page.add_element(&["nav", ".navbar"], None, Rect::new(0.0, 0.0, width, 60.0));
    let links = page.add_element(&[".nav-links"], Some(nav), Rect::new(10.0, 0.0, width, 40.0));
    for (i, href) in ["/dashboard/", "/class_management/", "/add_student/", "/"]
        .iter()
        .enumerate()
    {
        let selector = format!(".nav-links a[href='{href}']");
        page.add_element(
            &[selector.as_str()],
            Some(links),
            Rect::new(10.0, 10.0 + i as f64 * 130.0, 120.0, 40.0),
        );
    }

    if Page::ClassManagement.matches_path(&path) {
        let tabs = page.add_element(&[".nav-tabs"], None, Rect::new(90.0, 0.0, width, 50.0));
        page.add_element(&[".nav-tab[data-tab='create']"], Some(tabs), Rect::new(95.0, 10.0, 140.0, 40.0));
        page.add_element(&[".nav-tab[data-tab='session']"], Some(tabs), Rect::new(95.0, 160.0, 140.0, 40.0));
        page.add_element(&["#create-class-form"], None, Rect::new(160.0, 0.0, width, 500.0));
    } else if Page::AddStudent.matches_path(&path) {
        page.add_element(&[".cam", "#video"], None, Rect::new(120.0, 0.0, width, 480.0));
        page.add_element(&["#start"], None, Rect::new(620.0, 20.0, 160.0, 44.0));
        page.add_element(&["#add-student-form"], None, Rect::new(700.0, 0.0, width, 600.0));
    } else if Page::Home.matches_path(&path) {
        page.add_element(&["#sessionSelect"], None, Rect::new(100.0, 20.0, 300.0, 44.0));
        page.add_element(&[".cam", "#video"], None, Rect::new(170.0, 0.0, width, 480.0));
        page.add_element(&["#start"], None, Rect::new(670.0, 20.0, 160.0, 44.0));
        page.add_element(&["#takeAttendance"], None, Rect::new(670.0, 200.0, 180.0, 44.0));
    } else if Page::Dashboard.matches_path(&path) {
        page.add_element(&[".dashboard-stats"], None, Rect::new(100.0, 0.0, width, 300.0));
    }
}

// ── Commands ────────────────────────────────────────────────────────

/// One line typed into the sandbox.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Next,
    Previous,
    Skip,
    /// Restart; `keep` resumes saved progress instead of clearing it.
    Start { keep: bool },
    Teardown,
    Goto(String),
    Click(String),
    Emit(DomainEvent),
    TestStudentAdded,
    Width(f64),
    Status,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let cmd = match word {
            "next" | "n" => Self::Next,
            "prev" | "previous" | "p" => Self::Previous,
            "skip" | "close" | "x" => Self::Skip,
            "start" => Self::Start {
                keep: rest == "--keep",
            },
            "teardown" => Self::Teardown,
            "goto" | "go" => {
                if rest.is_empty() {
                    return Err("usage: goto <path>".to_string());
                }
                Self::Goto(rest.to_string())
            }
            "click" => {
                if rest.is_empty() {
                    return Err("usage: click <selector>".to_string());
                }
                Self::Click(rest.to_string())
            }
            "emit" => Self::Emit(parse_event(rest)?),
            "test-student" => Self::TestStudentAdded,
            "width" => Self::Width(
                rest.parse()
                    .map_err(|_| format!("not a width in pixels: {rest:?}"))?,
            ),
            "status" | "s" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(format!("unknown command: {other} (try `help`)")),
        };
        Ok(cmd)
    }
}

/// `emit <event> [text]`: the text is the student name for `studentAdded`
/// and the result message for `attendanceTaken`.
fn parse_event(args: &str) -> Result<DomainEvent, String> {
    let (name, text) = match args.split_once(char::is_whitespace) {
        Some((name, text)) => (name, Some(text.trim().to_string())),
        None => (args, None),
    };
    let kind = EventKind::ALL
        .into_iter()
        .find(|k| k.as_str() == name)
        .ok_or_else(|| {
            let names: Vec<&str> = EventKind::ALL.iter().map(|k| k.as_str()).collect();
            format!("unknown event {name:?}; expected one of {}", names.join(", "))
        })?;
    let event = match kind {
        EventKind::ClassCreated => DomainEvent::ClassCreated,
        EventKind::StudentAdded => DomainEvent::StudentAdded {
            student_name: text,
            student_id: None,
        },
        EventKind::SessionCreated => DomainEvent::SessionCreated,
        EventKind::SessionSelected => DomainEvent::SessionSelected,
        EventKind::CameraStarted => DomainEvent::CameraStarted,
        EventKind::AttendanceTaken => DomainEvent::AttendanceTaken(match text {
            Some(message) => AttendancePayload::from_message(message),
            None => AttendancePayload::default(),
        }),
    };
    Ok(event)
}

pub const HELP: &str = "\
commands:
  next | prev | skip        drive the modal buttons (skip also closes)
  start [--keep]            restart the tour (clears progress unless --keep)
  teardown                  remove the tour from the page
  goto <path>               load another page, e.g. goto /class_management/
  click <selector>          click an element on the page
  emit <event> [text]       dispatch classCreated, studentAdded [name],
                            sessionCreated, sessionSelected, cameraStarted,
                            attendanceTaken [message]
  test-student              dispatch the test studentAdded event
  width <px>                resize the viewport
  status                    print the session status as JSON
  quit";

// ── Sandbox ─────────────────────────────────────────────────────────

/// A simulated browser tab running the tour.
pub struct Sandbox {
    page: Arc<HeadlessPage>,
    host: Arc<TourHost>,
}

impl Sandbox {
    /// `page` must be the surface `host` was built with.
    pub fn new(page: Arc<HeadlessPage>, host: Arc<TourHost>) -> Self {
        Self { page, host }
    }

    pub fn page(&self) -> &Arc<HeadlessPage> {
        &self.page
    }

    pub fn host(&self) -> &Arc<TourHost> {
        &self.host
    }

    /// Load `path` as a full page navigation.
    pub async fn goto(&self, path: &str) -> bool {
        self.page.navigate(path);
        lay_out(&self.page);
        tracing::info!(path, "Page loaded");
        let server_requests_tour = {
            let cursor = PersistedCursor::new(self.host.deps().store.clone());
            !cursor.load_completion_flag()
        };
        self.host.page_loaded(server_requests_tour).await
    }

    /// Start the tour, following a redirect to the start page if needed.
    pub async fn start(&self, force_clear: bool) -> StartOutcome {
        let outcome = self.host.start(force_clear).await;
        if let StartOutcome::Redirect(ref path) = outcome {
            self.goto(path).await;
        }
        outcome
    }

    /// Run one command. Returns the text to show, or `None` to quit.
    pub async fn execute(&self, command: Command) -> Option<String> {
        let note = match command {
            Command::Quit => return None,
            Command::Help => return Some(HELP.to_string()),
            Command::Status => {
                let status = self.host.status().await;
                return Some(serde_json::to_string_pretty(&status).unwrap_or_default());
            }
            Command::Next => {
                if !self.host.advance().await {
                    return Some("no tour on this page".to_string());
                }
                None
            }
            Command::Previous => {
                if let Some(controller) = self.host.controller().await {
                    controller.previous().await;
                }
                None
            }
            Command::Skip => {
                if let Some(controller) = self.host.controller().await {
                    controller.skip().await;
                }
                None
            }
            Command::Start { keep } => Some(format!("{:?}", self.start(!keep).await)),
            Command::Teardown => {
                self.host.teardown().await;
                None
            }
            Command::Goto(path) => {
                self.goto(&path).await;
                None
            }
            Command::Click(selector) => self.click(&selector).await,
            Command::Emit(event) => {
                let listeners = self.host.publish(event);
                Some(format!("dispatched to {listeners} listener(s)"))
            }
            Command::TestStudentAdded => {
                self.host.simulate_student_added();
                None
            }
            Command::Width(width) => {
                let height = self.page.viewport().height;
                self.page.set_viewport(Viewport { width, height });
                None
            }
        };
        let mut out = render_page(&self.page);
        if let Some(note) = note {
            out = format!("{note}\n{out}");
        }
        Some(out)
    }

    /// Clicking a navigation link loads its page; anything else is handed to
    /// the tour.
    async fn click(&self, selector: &str) -> Option<String> {
        if self.page.query(selector).is_none() {
            return Some(format!("nothing matches {selector:?} on {}", self.page.path()));
        }
        if let Some(controller) = self.host.controller().await {
            controller.element_clicked(selector).await;
        }
        let href = selector
            .strip_prefix(".nav-links a[href='")
            .and_then(|rest| rest.strip_suffix("']"));
        if let Some(href) = href {
            self.goto(href).await;
        }
        None
    }
}

/// Draw the overlay (or its absence) as text.
pub fn render_page(page: &HeadlessPage) -> String {
    let path = page.path();
    match page.overlay() {
        None => format!("[{path}] no tour overlay"),
        Some(modal) if !modal.visible => format!("[{path}] overlay hidden, page is interactive"),
        Some(modal) => format!("[{path}]\n{}", render_modal(&modal)),
    }
}

fn render_modal(modal: &ModalView) -> String {
    let mut buttons = Vec::new();
    if modal.skip_visible {
        buttons.push("[Skip]".to_string());
    }
    if modal.previous_visible {
        buttons.push("[Previous]".to_string());
    }
    if let Some(ref label) = modal.next_label {
        buttons.push(format!("[{label}]"));
    }
    let filled = (modal.progress.percent() / 10.0).round() as usize;
    let bar = format!("{}{}", "#".repeat(filled), ".".repeat(10 - filled.min(10)));
    format!(
        "┌ {title}\n│ {body}\n│ {bar} {progress}  ({placement:?})\n└ {buttons}",
        title = modal.title,
        body = modal.body,
        progress = modal.progress.label(),
        placement = modal.placement,
        buttons = buttons.join(" "),
    )
}

// ── HTTP ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GotoRequest {
    path: String,
}

/// POST /api/sandbox/goto
///
/// Lets HTTP clients follow a start redirect in the simulated tab.
async fn goto(State(sandbox): State<Arc<Sandbox>>, Json(req): Json<GotoRequest>) -> impl IntoResponse {
    let launched = sandbox.goto(&req.path).await;
    Json(serde_json::json!({ "path": req.path, "tour_launched": launched }))
}

/// Routes that only make sense against the simulated tab.
pub fn sandbox_routes(sandbox: Arc<Sandbox>) -> Router {
    Router::new()
        .route("/api/sandbox/goto", post(goto))
        .with_state(sandbox)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TourConfig;
    use crate::store::MemoryStore;
    use crate::tour::catalog::StepCatalog;
    use crate::tour::controller::TourDeps;
    use crate::tour::events::EventBus;
    use crate::tour::notify::NoopNotifier;

    fn sandbox(path: &str) -> Sandbox {
        let page = Arc::new(HeadlessPage::new(
            path,
            Viewport {
                width: 1280.0,
                height: 800.0,
            },
        ));
        let host = Arc::new(TourHost::new(TourDeps {
            store: Arc::new(MemoryStore::new()),
            bus: EventBus::new(),
            surface: page.clone(),
            notifier: Arc::new(NoopNotifier),
            catalog: Arc::new(StepCatalog::attendance_tour()),
            config: TourConfig::default(),
        }));
        Sandbox::new(page, host)
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("next").unwrap(), Command::Next);
        assert_eq!(Command::parse("  start --keep ").unwrap(), Command::Start { keep: true });
        assert_eq!(
            Command::parse("goto /class_management/").unwrap(),
            Command::Goto("/class_management/".to_string())
        );
        assert_eq!(
            Command::parse("click .nav-tab[data-tab='create']").unwrap(),
            Command::Click(".nav-tab[data-tab='create']".to_string())
        );
        assert_eq!(Command::parse("width 390").unwrap(), Command::Width(390.0));
        assert!(Command::parse("goto").is_err());
        assert!(Command::parse("dance").is_err());
    }

    #[test]
    fn parses_events_with_text() {
        let cmd = Command::parse("emit attendanceTaken Attendance taken: Alice (On time - 10:30:15)").unwrap();
        let Command::Emit(DomainEvent::AttendanceTaken(ref payload)) = cmd else {
            panic!("expected attendance event, got {cmd:?}");
        };
        assert_eq!(payload.recognized_subject(), "Alice");

        assert_eq!(
            Command::parse("emit classCreated").unwrap(),
            Command::Emit(DomainEvent::ClassCreated)
        );
        assert!(Command::parse("emit classDeleted").is_err());
    }

    #[test]
    fn layouts_provide_tour_targets() {
        let catalog = StepCatalog::attendance_tour();
        let page = HeadlessPage::new(
            "/",
            Viewport {
                width: 1280.0,
                height: 800.0,
            },
        );
        for path in ["/dashboard/", "/class_management/", "/add_student/", "/"] {
            page.navigate(path);
            lay_out(&page);
            for step in catalog.iter().filter(|s| s.page.matches_path(path)) {
                if let Some(ref target) = step.target {
                    assert!(page.query(target).is_some(), "{target} missing on {path}");
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn clicking_nav_link_follows_it_and_auto_advances() {
        let sandbox = sandbox("/dashboard/");
        assert!(sandbox.goto("/dashboard/").await);
        sandbox.execute(Command::Next).await;
        assert_eq!(sandbox.host().status().await.step, Some(1));

        sandbox
            .execute(Command::Click(".nav-links a[href='/class_management/']".to_string()))
            .await;
        assert_eq!(sandbox.page().path(), "/class_management/");
        assert_eq!(sandbox.host().status().await.step, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn start_off_start_page_lands_on_dashboard() {
        let sandbox = sandbox("/add_student/");
        lay_out(sandbox.page());
        let outcome = sandbox.start(true).await;
        assert_eq!(outcome, StartOutcome::Redirect("/dashboard/".to_string()));
        assert_eq!(sandbox.page().path(), "/dashboard/");
        assert_eq!(sandbox.host().status().await.step, Some(0));
    }
}

//! services/console/src/bin/console.rs
//!
//! Line-oriented console front end. Reads commands from stdin, drives the
//! forms and stores, and prints toasts as they appear.

use console_lib::{
    config::Config,
    error::ConsoleError,
    forms::RegistrationForm,
    session::SessionManagerHandle,
    state::AppState,
    stores::{department_name, project_name, summarize, ReviewDecision},
};
use hr_console_core::domain::{NotificationFilter, Visibility};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

const HELP: &str = "\
Commands:
  login <email> <password>
  register <email> <password> <confirm> <phone> <full name>
  logout | status | hide | show
  notifications [all|unread] | read <id> | unread <id> | delete <id> | read-all | open <id>
  employees | departments | projects | dashboard
  documents <employee id>
  requests | accept <request id> | decline <request id>
  help | quit";

#[tokio::main]
async fn main() -> Result<(), ConsoleError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded. Starting console...");

    // --- 2. Build the Shared AppState ---
    let state = AppState::from_config(config).await?;

    // --- 3. Start the Session Manager ---
    let (visibility, visibility_rx) = watch::channel(Visibility::Visible);
    let mut session = state.start_session(visibility_rx);

    // --- 4. Command Loop ---
    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut toasts_seen = 0;
    while let Some(line) = lines.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            continue;
        };
        if command == "quit" || command == "exit" {
            break;
        }
        run_command(&state, &session, &visibility, command, args).await;

        let shown = state.toasts.shown().await;
        for (region, text) in shown.iter().skip(toasts_seen) {
            println!("[toast:{:?}] {}", region, text);
        }
        toasts_seen = shown.len();
    }

    session.shutdown().await;
    info!("Console stopped");
    Ok(())
}

fn parse_id(args: &[&str]) -> Option<i64> {
    args.first().and_then(|raw| raw.parse().ok())
}

async fn run_command(
    state: &AppState,
    session: &SessionManagerHandle,
    visibility: &watch::Sender<Visibility>,
    command: &str,
    args: &[&str],
) {
    match (command, args) {
        ("help", _) => println!("{}", HELP),
        ("login", [email, password]) => {
            let before = session.snapshot().events_processed;
            match state.forms.login(email, password).await {
                Ok(()) => {
                    session.wait_for(|s| s.events_processed > before).await;
                    println!("Signed in as {}", email);
                }
                Err(e) => println!("Login failed: {}", e),
            }
        }
        ("register", [email, password, confirm, phone, name @ ..]) if !name.is_empty() => {
            let form = RegistrationForm {
                name: name.join(" "),
                email: email.to_string(),
                phone: phone.to_string(),
                password: password.to_string(),
                confirm_password: confirm.to_string(),
            };
            match state.forms.register(&form).await {
                Ok(user) => println!("Registered {} ({})", user.email, user.id),
                Err(e) => println!("Registration failed: {}", e),
            }
        }
        ("logout", _) => {
            let before = session.snapshot().events_processed;
            match state.forms.sign_out().await {
                Ok(()) => {
                    session.wait_for(|s| s.events_processed > before).await;
                }
                Err(e) => println!("Logout failed: {}", e),
            }
        }
        ("hide", _) => {
            visibility.send_replace(Visibility::Hidden);
        }
        ("show", _) => {
            visibility.send_replace(Visibility::Visible);
        }
        ("status", _) => {
            let snapshot = session.snapshot();
            let who = snapshot
                .session
                .as_ref()
                .map(|s| s.user.email.clone())
                .unwrap_or_else(|| "-".to_string());
            println!("{:?} (user: {})", snapshot.state, who);
            if let Some(error) = snapshot.last_error {
                println!("last error: {}", error);
            }
        }
        ("notifications", rest) => {
            let filter = match rest.first() {
                Some(&"unread") => NotificationFilter::Unread,
                _ => NotificationFilter::All,
            };
            let center = state.notifications.lock().await;
            println!("{} unread", center.unread_count());
            for n in center.filter(filter) {
                let mark = if n.is_read { ' ' } else { '*' };
                println!(
                    "{} #{} [{}] {} -> {} ({})",
                    mark, n.id, n.category, n.message, n.target_link, n.created_at
                );
            }
        }
        ("read" | "unread" | "delete" | "open", rest) => {
            let Some(id) = parse_id(rest) else {
                println!("Usage: {} <id>", command);
                return;
            };
            let mut center = state.notifications.lock().await;
            let result = match command {
                "read" => center.mark_read(id),
                "unread" => center.mark_unread(id),
                "delete" => center.delete(id),
                _ => match center.open(id) {
                    Ok(Some(link)) => {
                        println!("Navigate to {}", link);
                        Ok(())
                    }
                    Ok(None) => {
                        println!("No notification #{}", id);
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
            };
            if let Err(e) = result {
                println!("Notification update failed: {}", e);
            }
        }
        ("read-all", _) => {
            if let Err(e) = state.notifications.lock().await.mark_all_read() {
                println!("Notification update failed: {}", e);
            }
        }
        ("employees", _) => {
            let mut employees = state.employees.lock().await;
            let mut departments = state.departments.lock().await;
            let mut projects = state.projects.lock().await;
            employees.fetch().await;
            departments.fetch().await;
            projects.fetch().await;
            if let Some(error) = employees.error() {
                println!("Error: {}", error);
            }
            for e in employees.items() {
                println!(
                    "#{} {} <{}> {} / {} / {}",
                    e.id,
                    e.full_name(),
                    e.email,
                    e.position,
                    department_name(e, departments.items()).unwrap_or("-"),
                    project_name(e, projects.items()).unwrap_or("-"),
                );
            }
        }
        ("departments", _) => {
            let mut departments = state.departments.lock().await;
            departments.fetch().await;
            if let Some(error) = departments.error() {
                println!("Error: {}", error);
            }
            for d in departments.items() {
                println!("#{} {} {}", d.id, d.name, d.description.as_deref().unwrap_or(""));
            }
        }
        ("projects", _) => {
            let mut projects = state.projects.lock().await;
            projects.fetch().await;
            if let Some(error) = projects.error() {
                println!("Error: {}", error);
            }
            for p in projects.items() {
                println!("#{} {} [{}]", p.id, p.name, p.status.label());
            }
        }
        ("documents", rest) => {
            let Some(employee_id) = parse_id(rest) else {
                println!("Usage: documents <employee id>");
                return;
            };
            let mut documents = state.documents.lock().await;
            documents.fetch_by_employee(employee_id).await;
            if let Some(error) = documents.error() {
                println!("Error: {}", error);
            }
            let labels = documents.custom_labels(employee_id).await;
            println!("Labels: {}", labels.join(", "));
            for d in documents.items() {
                let url = d.document_url.as_deref().unwrap_or("(no file)");
                println!("#{} {} {}", d.id, d.document_type, url);
            }
        }
        ("requests", _) => {
            let mut requests = state.requests.lock().await;
            requests.fetch().await;
            if let Some(error) = requests.error() {
                println!("Error: {}", error);
            }
            for r in requests.items() {
                println!("{} employee #{} {} {:?}", r.id, r.employee_id, r.kind, r.status);
            }
        }
        ("accept" | "decline", [raw_id]) => {
            let Ok(id) = Uuid::parse_str(raw_id) else {
                println!("Not a request id: {}", raw_id);
                return;
            };
            let Some(reviewer) = session.snapshot().session.map(|s| s.user.id.to_string()) else {
                println!("Sign in to review requests");
                return;
            };
            let decision = if command == "accept" {
                ReviewDecision::Accept
            } else {
                ReviewDecision::Decline
            };
            let mut requests = state.requests.lock().await;
            requests.update_status(id, decision, &reviewer).await;
            if let Some(error) = requests.error() {
                println!("Error: {}", error);
            }
        }
        ("dashboard", _) => {
            let mut employees = state.employees.lock().await;
            let mut departments = state.departments.lock().await;
            let mut projects = state.projects.lock().await;
            employees.fetch().await;
            departments.fetch().await;
            projects.fetch().await;
            let summary = summarize(employees.items(), departments.items(), projects.items());
            println!(
                "{} employees, {} departments, {} projects, average pay {:.2}",
                summary.total_employees,
                summary.total_departments,
                summary.total_projects,
                summary.average_base_pay
            );
            for (name, count) in &summary.headcount_by_department {
                println!("  {}: {}", name, count);
            }
            for (status, count) in &summary.projects_by_status {
                println!("  {}: {}", status.label(), count);
            }
        }
        _ => println!("Unknown command. Type `help` for the list."),
    }
}

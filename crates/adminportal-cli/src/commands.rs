//! Interactive shell commands.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, warn};

use adminportal_core::forms::{
    EmailStatus, LoginViewModel, PasswordResetFlow, RegisterViewModel, ResetStep,
};
use adminportal_core::models::{FeedbackKind, TicketCategory, TicketPriority};
use adminportal_core::support::{FeedbackViewModel, SupportViewModel};
use adminportal_core::utils::{format_ticket_date, truncate_string};
use adminportal_core::validation::{FieldErrors, PasswordStrength, OTP_LENGTH};
use adminportal_core::{
    guard, ApiClient, Config, Navigation, Route, Scope, SessionStore, SupportApi,
};

use crate::prompt::{ask, ask_password, confirm, read_line};

const HELP: &str = "\
Commands:
  login              Sign in
  logout             Sign out
  register           Create an account
  reset              Reset a forgotten password
  status             Show the current session
  open <path>        Check whether a page may be visited
  support            Open a support ticket
  feedback           Send feedback
  tickets            List your support tickets
  help               Show this help
  quit               Exit";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Login,
    Logout,
    Register,
    Reset,
    Status,
    Open(String),
    Support,
    Feedback,
    Tickets,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let name = parts.next()?;
        Some(match name.to_ascii_lowercase().as_str() {
            "login" => Command::Login,
            "logout" => Command::Logout,
            "register" => Command::Register,
            "reset" => Command::Reset,
            "status" => Command::Status,
            "open" => Command::Open(parts.next().unwrap_or("/").to_string()),
            "support" => Command::Support,
            "feedback" => Command::Feedback,
            "tickets" => Command::Tickets,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        })
    }
}

pub struct Shell {
    client: Arc<ApiClient>,
    store: SessionStore,
    config: Config,
}

impl Shell {
    pub fn new(client: Arc<ApiClient>, store: SessionStore, config: Config) -> Self {
        Self {
            client,
            store,
            config,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("Type 'help' for a list of commands.");
        loop {
            let prompt = match self.store.user() {
                Some(user) => format!("adminportal ({})> ", user.initials()),
                None => "adminportal> ".to_string(),
            };
            let Some(line) = read_line(&prompt)? else {
                println!();
                return Ok(());
            };
            let Some(command) = Command::parse(&line) else {
                continue;
            };

            match command {
                Command::Login => self.login().await?,
                Command::Logout => self.logout().await,
                Command::Register => self.register().await?,
                Command::Reset => self.reset().await?,
                Command::Status => self.status(),
                Command::Open(path) => self.open(&path),
                Command::Support => self.support().await?,
                Command::Feedback => self.feedback().await?,
                Command::Tickets => self.tickets().await,
                Command::Help => println!("{}", HELP),
                Command::Quit => return Ok(()),
                Command::Unknown(name) => println!("Unknown command '{}'. Type 'help'.", name),
            }
        }
    }

    fn require_sign_in(&self, route: Route) -> bool {
        match guard(&route, self.store.session()) {
            Navigation::Allow => true,
            _ => {
                println!("Please log in first.");
                false
            }
        }
    }

    async fn login(&mut self) -> Result<()> {
        if self.store.is_authenticated() {
            println!("Already signed in. Use 'logout' first.");
            return Ok(());
        }

        let mut vm = LoginViewModel::with_email(self.config.last_email.clone().unwrap_or_default());
        let email = ask("Email", Some(&vm.form().email))?;
        vm.set_email(email.clone());
        vm.set_password(ask_password("Password")?);
        vm.set_remember_me(confirm("Remember me", false)?);

        if vm.submit(&mut self.store).await {
            if let Some(user) = self.store.user() {
                println!("Welcome, {}!", user.display_name);
            }
            self.config.last_email = Some(email.trim().to_string());
            if let Err(e) = self.config.save() {
                warn!(error = %e, "Failed to save config");
            }
        } else {
            print_errors(vm.errors());
        }
        Ok(())
    }

    async fn logout(&mut self) {
        if !self.store.is_authenticated() {
            println!("Not signed in.");
            return;
        }
        self.store.logout().await;
        println!("Signed out.");
    }

    async fn register(&mut self) -> Result<()> {
        let mut vm = RegisterViewModel::new(self.client.clone());

        vm.set_first_name(ask("First name", None)?);
        vm.set_last_name(ask("Last name", None)?);

        vm.set_email(ask("Email", None)?, Instant::now());
        if let Some(deadline) = vm.email_check_deadline() {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
            vm.poll_email_check(Instant::now()).await;
        }
        match vm.email_status() {
            EmailStatus::Taken => {
                println!("That email is already registered. Try 'login' or 'reset'.");
                return Ok(());
            }
            EmailStatus::Available => println!("  Email is available."),
            _ => {}
        }

        vm.set_username(ask("Username", None)?);
        vm.set_password(ask_password("Password")?);
        let strength = vm.password_strength();
        println!("  Strength: {}", strength.label.as_str());
        if let Some(hint) = missing_criteria(&strength) {
            println!("  {}", hint);
        }
        vm.set_password_confirm(ask_password("Confirm password")?);
        vm.set_subscribe_newsletter(confirm("Subscribe to the newsletter", false)?);
        vm.set_agree_to_terms(confirm("I agree to the terms of service (see /terms)", false)?);

        match vm.submit().await {
            Some(result) => {
                println!("{}", result.message);
                println!("You can now log in as {}.", result.user.email);
            }
            None => print_errors(vm.errors()),
        }
        Ok(())
    }

    async fn reset(&mut self) -> Result<()> {
        let mut flow = PasswordResetFlow::new(self.client.clone());

        loop {
            flow.tick(Instant::now());
            match flow.step().clone() {
                ResetStep::CollectingEmail => {
                    let default = self.config.last_email.clone();
                    let email = ask("Email", default.as_deref())?;
                    if email.is_empty() {
                        return Ok(());
                    }
                    flow.forgot().set_email(email);
                    if flow.submit_email(Instant::now()).await {
                        if let Some(message) = flow.forgot().sent_message() {
                            println!("{}", message);
                        }
                    } else {
                        let forgot = flow.forgot();
                        match forgot.email_error().or(forgot.error()) {
                            Some(error) => println!("{}", error),
                            None => println!("Something went wrong. Please try again."),
                        }
                        if !confirm("Try again", true)? {
                            return Ok(());
                        }
                    }
                }
                ResetStep::AwaitingOtp { email } => {
                    let Some(otp) = flow.otp() else {
                        return Ok(());
                    };
                    let hint = if otp.can_resend() {
                        "'resend' for a new code".to_string()
                    } else {
                        format!("resend in {}", otp.countdown_display())
                    };
                    let label = format!(
                        "{}-digit code sent to {} ({}, 'back' to change email): ",
                        OTP_LENGTH, email, hint
                    );
                    let Some(answer) = read_line(&label)? else {
                        return Ok(());
                    };
                    match answer.trim() {
                        "back" => flow.back(Instant::now()),
                        "resend" => {
                            if flow.resend(Instant::now()).await {
                                println!("A new code is on its way.");
                            } else if let Some(error) = flow.otp().and_then(|o| o.error()) {
                                println!("{}", error);
                            } else {
                                println!("Please wait before requesting another code.");
                            }
                        }
                        "" => return Ok(()),
                        code => enter_code(&mut flow, code).await,
                    }
                }
                ResetStep::CollectingNewPassword { .. } => {
                    let Some(reset) = flow.reset() else {
                        return Ok(());
                    };
                    reset.set_password(ask_password("New password")?);
                    let strength = reset.password_strength();
                    println!("  Strength: {}", strength.label.as_str());
                    reset.set_password_confirm(ask_password("Confirm new password")?);

                    if !flow.submit_new_password().await {
                        if let Some(reset) = flow.reset() {
                            print_errors(reset.errors());
                        }
                    }
                }
                ResetStep::Done => {
                    println!("Password changed. You can now log in.");
                    return Ok(());
                }
                ResetStep::Failed { message } => {
                    println!("{}", message);
                    if !confirm("Start over", true)? {
                        return Ok(());
                    }
                    flow.restart();
                }
            }
        }
    }

    fn status(&self) {
        let session = self.store.session();
        match &session.user {
            Some(user) if session.is_authenticated => {
                println!("Signed in as {} <{}> ({})", user.display_name, user.email, user.role);
                let remembered = self.store.storage().token_scope() == Some(Scope::Durable);
                println!("Remembered on this device: {}", if remembered { "yes" } else { "no" });
            }
            _ => println!("Not signed in."),
        }
        if let Some(error) = &session.error {
            println!("Last error: {}", error);
        }
        println!("API: {}", self.config.base_url());
    }

    fn open(&self, path: &str) {
        let route = Route::parse(path);
        match guard(&route, self.store.session()) {
            Navigation::Allow => println!("{} -> allowed", route),
            Navigation::Pending => println!("{} -> waiting for session", route),
            Navigation::Redirect { to, from: Some(from) } => {
                println!("{} -> redirect to {} (return to {})", route, to, from)
            }
            Navigation::Redirect { to, from: None } => println!("{} -> redirect to {}", route, to),
        }
    }

    async fn support(&mut self) -> Result<()> {
        if !self.require_sign_in(Route::Support) {
            return Ok(());
        }
        let mut vm = SupportViewModel::new(self.client.clone());
        {
            let form = vm.form_mut();
            form.subject = ask("Subject", None)?;
            form.description = ask("Description", None)?;
            let priority = ask("Priority (low/medium/high/urgent)", Some("medium"))?;
            form.priority = TicketPriority::parse(&priority).unwrap_or_default();
            let category = ask("Category (technical/account/feature/general)", Some("general"))?;
            form.category = TicketCategory::parse(&category).unwrap_or_default();
            form.attachments = parse_attachments(&ask("Attachments (comma-separated paths)", None)?);
        }

        match vm.submit().await {
            Some(Some(ticket)) => println!("Ticket {} created.", ticket.id),
            Some(None) => println!("Support request sent."),
            None => print_errors(vm.errors()),
        }
        Ok(())
    }

    async fn feedback(&mut self) -> Result<()> {
        if !self.require_sign_in(Route::Feedback) {
            return Ok(());
        }
        let mut vm = FeedbackViewModel::new(self.client.clone());
        {
            let form = vm.form_mut();
            let kinds: Vec<&str> = FeedbackKind::ALL.iter().map(|k| k.as_str()).collect();
            let kind = ask(&format!("Type ({})", kinds.join("/")), Some("general"))?;
            form.kind = FeedbackKind::parse(&kind).unwrap_or_default();
            form.title = ask("Title", None)?;
            form.description = ask("Description", None)?;
            form.rating = loop {
                let answer = ask("Rating 1-5 (blank to skip)", None)?;
                match parse_rating(&answer) {
                    Ok(rating) => break rating,
                    Err(message) => println!("  {}", message),
                }
            };
            form.is_anonymous = confirm("Submit anonymously", false)?;
            form.attachments = parse_attachments(&ask("Attachments (comma-separated paths)", None)?);
        }

        match vm.submit().await {
            Some(_) => println!("Thank you for your feedback!"),
            None => print_errors(vm.errors()),
        }
        Ok(())
    }

    async fn tickets(&self) {
        if !self.require_sign_in(Route::Support) {
            return;
        }
        let tickets = self.client.list_tickets().await;
        if tickets.is_empty() {
            println!("No tickets.");
            return;
        }
        for ticket in tickets {
            let opened = ticket.created_at.as_deref().map(format_ticket_date).unwrap_or_default();
            println!(
                "{:<10} {:<8} {:<40} {}",
                truncate_string(&ticket.id, 10),
                ticket.priority.label(),
                truncate_string(&ticket.title, 40),
                opened
            );
        }
    }
}

async fn enter_code(flow: &mut PasswordResetFlow, code: &str) {
    match flow.paste_code(code).await {
        Ok(true) => println!("Code verified."),
        Ok(false) => {
            let message = flow
                .otp()
                .and_then(|o| o.error().map(ToString::to_string))
                .unwrap_or_else(|| "Invalid or expired code".to_string());
            debug!(%message, "Code rejected");
            println!("{}", message);
        }
        Err(e) => println!("{}", e),
    }
}

/// The unmet strength criteria, or `None` once every one is met.
fn missing_criteria(strength: &PasswordStrength) -> Option<String> {
    (strength.score < 5).then(|| format!("Missing: {}", strength.feedback.join(", ")))
}

/// Blank skips the rating. Range checks are left to the form validator.
fn parse_rating(raw: &str) -> Result<Option<u8>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u8>()
        .map(Some)
        .map_err(|_| format!("'{}' is not a rating. Enter a number from 1 to 5.", raw))
}

fn parse_attachments(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn print_errors(errors: &FieldErrors) {
    if errors.is_empty() {
        println!("Something went wrong. Please try again.");
        return;
    }
    for (field, message) in errors.iter() {
        println!("  {}: {}", field, message);
    }
}
